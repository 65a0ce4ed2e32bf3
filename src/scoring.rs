use crate::levels::categorize;
use crate::models::{CellValue, Field, NormalizedRecord, ScoredRecord};

/// Time limits of the five mazes, in the units of the raw time field (seconds).
pub const LABYRINTH_LIMITS: [f64; 5] = [35.0, 35.0, 50.0, 65.0, 125.0];

pub const NOT_REACHED: &str = "Нет";

const LABYRINTH_FIELDS: [(Field, Field, Field); 5] = [
    (Field::Labyrinth1Time, Field::Labyrinth1Errors, Field::Labyrinth1Reached),
    (Field::Labyrinth2Time, Field::Labyrinth2Errors, Field::Labyrinth2Reached),
    (Field::Labyrinth3Time, Field::Labyrinth3Errors, Field::Labyrinth3Reached),
    (Field::Labyrinth4Time, Field::Labyrinth4Errors, Field::Labyrinth4Reached),
    (Field::Labyrinth5Time, Field::Labyrinth5Errors, Field::Labyrinth5Reached),
];

const ATTENTION_FIELDS: [(Field, Field); 5] = [
    (Field::Attention1Rings, Field::Attention1Errors),
    (Field::Attention2Rings, Field::Attention2Errors),
    (Field::Attention3Rings, Field::Attention3Errors),
    (Field::Attention4Rings, Field::Attention4Errors),
    (Field::Attention5Rings, Field::Attention5Errors),
];

const MAX_LABYRINTH_POINTS: f64 = 3.0;
const ATTENTION_CEILING: f64 = 6.0;
const CRITERION_MAX: f64 = 5.0;
const REASONING_MAX: f64 = 18.0;
const SIMILARITY_MAX: f64 = 16.0;
const MISSING_DETAILS_MAX: f64 = 11.0;
const ARTIST_SCALE_MAX: f64 = 3.0;
const EMOTION_TEST_MAX: f64 = 8.0;
const OBSERVATION_MAX: f64 = 4.0;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Numeric value of a cell, or zero when it is blank or does not parse.
pub fn number_or_zero(cell: &CellValue) -> f64 {
    cell.as_f64().filter(|value| !value.is_nan()).unwrap_or(0.0)
}

/// Numeric value of a cell for ratio formulas: blanks stay undefined,
/// anything else that does not parse counts as zero.
pub fn lenient_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Empty => None,
        CellValue::Number(value) if value.is_nan() => None,
        CellValue::Text(text) if text.trim().is_empty() => None,
        other => Some(other.as_f64().unwrap_or(0.0)),
    }
}

/// Points for one maze: 0 to 3 depending on errors, zero when the time is
/// missing, over the limit, or the goal was not reached.
pub fn labyrinth_score(
    time: Option<f64>,
    errors: Option<f64>,
    reached: Option<&str>,
    limit: f64,
) -> u8 {
    let Some(time) = time.filter(|time| !time.is_nan()) else {
        return 0;
    };
    let errors = errors
        .filter(|errors| errors.is_finite())
        .map(|errors| errors.trunc() as i64)
        .unwrap_or(0);

    if reached.is_some_and(|answer| answer.trim() == NOT_REACHED) {
        return 0;
    }
    if time > limit {
        return 0;
    }
    match errors {
        0 => 3,
        1 => 2,
        2..=5 => 1,
        _ => 0,
    }
}

pub fn attention_index(rings: f64, errors: f64) -> f64 {
    0.5 * rings - (2.8 * errors) / 60.0
}

pub fn attention_quality(mean_attention: f64) -> f64 {
    if mean_attention >= ATTENTION_CEILING {
        1.0
    } else {
        round2(mean_attention / ATTENTION_CEILING)
    }
}

fn mean_of(values: &[Option<f64>]) -> Option<f64> {
    let mut sum = 0.0;
    for value in values {
        sum += (*value)?;
    }
    Some(sum / values.len() as f64)
}

fn ratio(record: &NormalizedRecord, field: Field, max: f64) -> Option<f64> {
    lenient_number(record.get(field)).map(|value| round2(value / max))
}

pub fn score_record(record: NormalizedRecord) -> ScoredRecord {
    let mut labyrinths = [0u8; 5];
    for (slot, ((time, errors, reached), limit)) in labyrinths
        .iter_mut()
        .zip(LABYRINTH_FIELDS.iter().zip(LABYRINTH_LIMITS))
    {
        *slot = labyrinth_score(
            record.number(*time),
            record.number(*errors),
            record.get(*reached).as_text(),
            limit,
        );
    }
    let labyrinth_mean = labyrinths.iter().map(|points| f64::from(*points)).sum::<f64>() / 5.0;
    let analytic_synthetic = round2(labyrinth_mean / MAX_LABYRINTH_POINTS);

    let mut attention = [0.0f64; 5];
    for (slot, (rings, errors)) in attention.iter_mut().zip(ATTENTION_FIELDS) {
        *slot = attention_index(
            number_or_zero(record.get(rings)),
            number_or_zero(record.get(errors)),
        );
    }
    let mean_attention = attention.iter().sum::<f64>() / 5.0;
    let attention_quality = attention_quality(mean_attention);

    let coherence = ratio(&record, Field::ReasoningCoherence, CRITERION_MAX);
    let speech_form = ratio(&record, Field::ReasoningSpeech, CRITERION_MAX);
    let reasoning_independence = ratio(&record, Field::ReasoningIndependence, CRITERION_MAX);

    let reasoning_sum = lenient_number(record.get(Field::ReasoningSum));
    let readiness = reasoning_sum
        .zip(mean_of(&[coherence, speech_form, reasoning_independence]))
        .map(|(sum, criteria)| round2((sum / REASONING_MAX + criteria) / 2.0));
    let logical_generalization = ratio(&record, Field::SimilaritySum, SIMILARITY_MAX);
    let perception = ratio(&record, Field::MissingDetailsSum, MISSING_DETAILS_MAX);

    let cognitive_development = mean_of(&[
        readiness,
        Some(attention_quality),
        Some(analytic_synthetic),
        logical_generalization,
        perception,
    ])
    .map(round2);

    let imagination = mean_of(&[
        lenient_number(record.get(Field::ArtistV1)).map(|v1| v1 / ARTIST_SCALE_MAX),
        lenient_number(record.get(Field::ArtistV2)).map(|v2| v2 / ARTIST_SCALE_MAX),
    ])
    .map(round2);

    let emotion_identification = ratio(&record, Field::EmotionTest, EMOTION_TEST_MAX);
    let planning = ratio(&record, Field::Planning, OBSERVATION_MAX);
    let cooperation = ratio(&record, Field::Cooperation, OBSERVATION_MAX);
    let reflection = ratio(&record, Field::Reflection, OBSERVATION_MAX);
    let emotional_social_intelligence = emotion_identification
        .zip(mean_of(&[planning, cooperation, reflection]))
        .map(|(emotion, joint)| round2((emotion + joint) / 2.0));

    ScoredRecord {
        record,
        labyrinths,
        analytic_synthetic,
        attention,
        mean_attention,
        attention_quality,
        coherence,
        speech_form,
        reasoning_independence,
        readiness,
        logical_generalization,
        perception,
        cognitive_development,
        imagination,
        emotion_identification,
        planning,
        cooperation,
        reflection,
        emotional_social_intelligence,
        cognitive_level: categorize(cognitive_development),
        imagination_level: categorize(imagination),
        emotional_social_level: categorize(emotional_social_intelligence),
    }
}

pub fn score_all(records: Vec<NormalizedRecord>) -> Vec<ScoredRecord> {
    records.into_iter().map(score_record).collect()
}
