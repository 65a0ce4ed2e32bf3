use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    /// Numeric view of the cell. `None` for blanks and text that is not a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(value) => Some(*value),
            CellValue::Text(text) => text.trim().parse::<f64>().ok(),
            CellValue::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        }
    }

    pub fn as_label(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(value) if value.is_nan() => None,
            CellValue::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                Some(format!("{}", *value as i64))
            }
            CellValue::Number(value) => Some(value.to_string()),
            CellValue::Text(text) => Some(text.clone()),
            CellValue::Bool(flag) => Some(flag.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Id,
    CreatedAt,
    Organization,
    Code,
    ConsentAssessment,
    ConsentPersonalData,
    AgeGroup,
    AgeGroupInput,
    ReasoningSum,
    ReasoningCoherence,
    ReasoningSpeech,
    ReasoningIndependence,
    SimilaritySum,
    Attention1Rings,
    Attention1Errors,
    Attention2Rings,
    Attention2Errors,
    Attention3Rings,
    Attention3Errors,
    Attention4Rings,
    Attention4Errors,
    Attention5Rings,
    Attention5Errors,
    MissingDetailsSum,
    Labyrinth1Time,
    Labyrinth1Errors,
    Labyrinth1Reached,
    Labyrinth2Time,
    Labyrinth2Errors,
    Labyrinth2Reached,
    Labyrinth3Time,
    Labyrinth3Errors,
    Labyrinth3Reached,
    Labyrinth4Time,
    Labyrinth4Errors,
    Labyrinth4Reached,
    Labyrinth5Time,
    Labyrinth5Errors,
    Labyrinth5Reached,
    ArtistV1,
    ArtistV2,
    ArtistV3Photo,
    EmotionTest,
    Planning,
    Cooperation,
    Reflection,
    Notes,
}

impl Field {
    pub const COUNT: usize = 47;

    pub fn id(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::CreatedAt => "created-at",
            Field::Organization => "organization",
            Field::Code => "code",
            Field::ConsentAssessment => "consent-assessment",
            Field::ConsentPersonalData => "consent-personal-data",
            Field::AgeGroup => "age",
            Field::AgeGroupInput => "age-input",
            Field::ReasoningSum => "reasoning-sum",
            Field::ReasoningCoherence => "reasoning-coherence",
            Field::ReasoningSpeech => "reasoning-speech",
            Field::ReasoningIndependence => "reasoning-independence",
            Field::SimilaritySum => "similarity-sum",
            Field::Attention1Rings => "attention1-rings",
            Field::Attention1Errors => "attention1-errors",
            Field::Attention2Rings => "attention2-rings",
            Field::Attention2Errors => "attention2-errors",
            Field::Attention3Rings => "attention3-rings",
            Field::Attention3Errors => "attention3-errors",
            Field::Attention4Rings => "attention4-rings",
            Field::Attention4Errors => "attention4-errors",
            Field::Attention5Rings => "attention5-rings",
            Field::Attention5Errors => "attention5-errors",
            Field::MissingDetailsSum => "missing-details-sum",
            Field::Labyrinth1Time => "labyrinth1-time",
            Field::Labyrinth1Errors => "labyrinth1-errors",
            Field::Labyrinth1Reached => "labyrinth1-reached",
            Field::Labyrinth2Time => "labyrinth2-time",
            Field::Labyrinth2Errors => "labyrinth2-errors",
            Field::Labyrinth2Reached => "labyrinth2-reached",
            Field::Labyrinth3Time => "labyrinth3-time",
            Field::Labyrinth3Errors => "labyrinth3-errors",
            Field::Labyrinth3Reached => "labyrinth3-reached",
            Field::Labyrinth4Time => "labyrinth4-time",
            Field::Labyrinth4Errors => "labyrinth4-errors",
            Field::Labyrinth4Reached => "labyrinth4-reached",
            Field::Labyrinth5Time => "labyrinth5-time",
            Field::Labyrinth5Errors => "labyrinth5-errors",
            Field::Labyrinth5Reached => "labyrinth5-reached",
            Field::ArtistV1 => "artist-v1",
            Field::ArtistV2 => "artist-v2",
            Field::ArtistV3Photo => "artist-v3-photo",
            Field::EmotionTest => "emotion-identification",
            Field::Planning => "planning",
            Field::Cooperation => "cooperation",
            Field::Reflection => "reflection",
            Field::Notes => "notes",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One child's row under the canonical schema. Fields absent from the upload read as `Empty`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    values: Vec<CellValue>,
}

impl Default for NormalizedRecord {
    fn default() -> Self {
        Self {
            values: vec![CellValue::Empty; Field::COUNT],
        }
    }
}

impl NormalizedRecord {
    pub fn get(&self, field: Field) -> &CellValue {
        &self.values[field.index()]
    }

    pub fn set(&mut self, field: Field, value: CellValue) {
        self.values[field.index()] = value;
    }

    pub fn with(mut self, field: Field, value: CellValue) -> Self {
        self.set(field, value);
        self
    }

    pub fn number(&self, field: Field) -> Option<f64> {
        self.get(field).as_f64()
    }

    pub fn label(&self, field: Field) -> Option<String> {
        self.get(field).as_label()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    BelowNormative,
    Normative,
    AboveNormative,
}

impl Level {
    pub const ORDERED: [Level; 3] = [
        Level::BelowNormative,
        Level::Normative,
        Level::AboveNormative,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Level::BelowNormative => "below-normative",
            Level::Normative => "normative",
            Level::AboveNormative => "above-normative",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: NormalizedRecord,
    pub labyrinths: [u8; 5],
    pub analytic_synthetic: f64,
    pub attention: [f64; 5],
    pub mean_attention: f64,
    pub attention_quality: f64,
    pub coherence: Option<f64>,
    pub speech_form: Option<f64>,
    pub reasoning_independence: Option<f64>,
    pub readiness: Option<f64>,
    pub logical_generalization: Option<f64>,
    pub perception: Option<f64>,
    pub cognitive_development: Option<f64>,
    pub imagination: Option<f64>,
    pub emotion_identification: Option<f64>,
    pub planning: Option<f64>,
    pub cooperation: Option<f64>,
    pub reflection: Option<f64>,
    pub emotional_social_intelligence: Option<f64>,
    pub cognitive_level: Option<Level>,
    pub imagination_level: Option<Level>,
    pub emotional_social_level: Option<Level>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategorizedMetric {
    CognitiveDevelopment,
    Imagination,
    EmotionalSocialIntelligence,
}

impl CategorizedMetric {
    pub const ALL: [CategorizedMetric; 3] = [
        CategorizedMetric::CognitiveDevelopment,
        CategorizedMetric::Imagination,
        CategorizedMetric::EmotionalSocialIntelligence,
    ];

    pub fn title(self) -> &'static str {
        match self {
            CategorizedMetric::CognitiveDevelopment => "Cognitive development",
            CategorizedMetric::Imagination => "Imagination",
            CategorizedMetric::EmotionalSocialIntelligence => "Emotional-social intelligence",
        }
    }

    pub fn level(self, scored: &ScoredRecord) -> Option<Level> {
        match self {
            CategorizedMetric::CognitiveDevelopment => scored.cognitive_level,
            CategorizedMetric::Imagination => scored.imagination_level,
            CategorizedMetric::EmotionalSocialIntelligence => scored.emotional_social_level,
        }
    }
}

/// Indicators reported in the median table, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedMetric {
    CognitiveDevelopment,
    Readiness,
    LogicalGeneralization,
    Perception,
    AttentionQuality,
    AnalyticSynthetic,
    Coherence,
    SpeechForm,
    ReasoningIndependence,
    Imagination,
    EmotionalSocialIntelligence,
    EmotionIdentification,
    Planning,
    Cooperation,
    Reflection,
}

impl TrackedMetric {
    pub const ALL: [TrackedMetric; 15] = [
        TrackedMetric::CognitiveDevelopment,
        TrackedMetric::Readiness,
        TrackedMetric::LogicalGeneralization,
        TrackedMetric::Perception,
        TrackedMetric::AttentionQuality,
        TrackedMetric::AnalyticSynthetic,
        TrackedMetric::Coherence,
        TrackedMetric::SpeechForm,
        TrackedMetric::ReasoningIndependence,
        TrackedMetric::Imagination,
        TrackedMetric::EmotionalSocialIntelligence,
        TrackedMetric::EmotionIdentification,
        TrackedMetric::Planning,
        TrackedMetric::Cooperation,
        TrackedMetric::Reflection,
    ];

    pub fn title(self) -> &'static str {
        match self {
            TrackedMetric::CognitiveDevelopment => "Cognitive development",
            TrackedMetric::Readiness => "Readiness for learning activity",
            TrackedMetric::LogicalGeneralization => "Logical generalization",
            TrackedMetric::Perception => "Perception",
            TrackedMetric::AttentionQuality => "Attention quality",
            TrackedMetric::AnalyticSynthetic => "Analytic-synthetic",
            TrackedMetric::Coherence => "Coherence",
            TrackedMetric::SpeechForm => "Speech form",
            TrackedMetric::ReasoningIndependence => "Reasoning independence",
            TrackedMetric::Imagination => "Imagination",
            TrackedMetric::EmotionalSocialIntelligence => "Emotional-social intelligence",
            TrackedMetric::EmotionIdentification => "Emotion identification",
            TrackedMetric::Planning => "Planning",
            TrackedMetric::Cooperation => "Cooperation",
            TrackedMetric::Reflection => "Reflection",
        }
    }

    pub fn value(self, scored: &ScoredRecord) -> Option<f64> {
        match self {
            TrackedMetric::CognitiveDevelopment => scored.cognitive_development,
            TrackedMetric::Readiness => scored.readiness,
            TrackedMetric::LogicalGeneralization => scored.logical_generalization,
            TrackedMetric::Perception => scored.perception,
            TrackedMetric::AttentionQuality => Some(scored.attention_quality),
            TrackedMetric::AnalyticSynthetic => Some(scored.analytic_synthetic),
            TrackedMetric::Coherence => scored.coherence,
            TrackedMetric::SpeechForm => scored.speech_form,
            TrackedMetric::ReasoningIndependence => scored.reasoning_independence,
            TrackedMetric::Imagination => scored.imagination,
            TrackedMetric::EmotionalSocialIntelligence => scored.emotional_social_intelligence,
            TrackedMetric::EmotionIdentification => scored.emotion_identification,
            TrackedMetric::Planning => scored.planning,
            TrackedMetric::Cooperation => scored.cooperation,
            TrackedMetric::Reflection => scored.reflection,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceId {
    pub site: String,
    pub assessment: String,
}

impl SourceId {
    pub fn output_filename(&self) -> String {
        format!("Analytics_{}-{}.xlsx", self.site, self.assessment)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelRow {
    pub level: Level,
    pub count: usize,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelDistribution {
    pub metric: CategorizedMetric,
    pub total: usize,
    pub rows: Vec<LevelRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedianRow {
    pub indicator: &'static str,
    pub median: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeRow {
    pub age_group: String,
    pub count: usize,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TownRow {
    pub town: String,
    pub organizations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTables {
    pub ages: Vec<AgeRow>,
    pub medians: Vec<MedianRow>,
    pub levels: Vec<LevelDistribution>,
    pub towns: Vec<TownRow>,
}
