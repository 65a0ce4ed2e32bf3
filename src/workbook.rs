use rust_xlsxwriter::{
    Chart, ChartDataLabel, ChartLegendPosition, ChartType, Format, FormatAlign, FormatBorder,
    Workbook, Worksheet, XlsxError,
};
use tracing::debug;

use crate::models::{
    CategorizedMetric, Field, Level, LevelDistribution, ScoredRecord, SummaryTables,
};

pub const AGE_SHEET: &str = "AgeGroups";
pub const MEDIAN_SHEET: &str = "Medians";
pub const TOWN_SHEET: &str = "Towns";
pub const EXPORT_SHEET: &str = "NormalizedMetrics";

pub fn level_sheet_name(metric: CategorizedMetric) -> &'static str {
    match metric {
        CategorizedMetric::CognitiveDevelopment => "CognitiveDevelopment",
        CategorizedMetric::Imagination => "Imagination",
        CategorizedMetric::EmotionalSocialIntelligence => "EmotionalSocialIntelligence",
    }
}

/// Sheet names in workbook order.
pub fn sheet_names() -> Vec<&'static str> {
    let mut names = vec![AGE_SHEET, MEDIAN_SHEET];
    names.extend(CategorizedMetric::ALL.iter().map(|metric| level_sheet_name(*metric)));
    names.push(TOWN_SHEET);
    names.push(EXPORT_SHEET);
    names
}

struct Formats {
    header: Format,
    number: Format,
    percent: Format,
    total: Format,
}

impl Formats {
    fn new() -> Self {
        let header = Format::new()
            .set_bold()
            .set_background_color("#D9E1F2")
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin);
        Self {
            total: header.clone(),
            header,
            number: Format::new().set_num_format("0.00").set_align(FormatAlign::Center),
            percent: Format::new().set_num_format("0.0%").set_align(FormatAlign::Center),
        }
    }
}

enum ColumnValue {
    Text(fn(&ScoredRecord) -> Option<String>),
    Number(fn(&ScoredRecord) -> Option<f64>),
}

/// One column of the per-child export sheet.
struct ExportColumn {
    title: &'static str,
    value: ColumnValue,
}

impl ExportColumn {
    fn text(title: &'static str, value: fn(&ScoredRecord) -> Option<String>) -> Self {
        Self {
            title,
            value: ColumnValue::Text(value),
        }
    }

    fn number(title: &'static str, value: fn(&ScoredRecord) -> Option<f64>) -> Self {
        Self {
            title,
            value: ColumnValue::Number(value),
        }
    }
}

fn level_label(level: Option<Level>) -> Option<String> {
    level.map(|level| level.label().to_string())
}

fn export_columns() -> Vec<ExportColumn> {
    vec![
        ExportColumn::text("Code", |s| s.record.label(Field::Code)),
        ExportColumn::text("Age group", |s| s.record.label(Field::AgeGroup)),
        ExportColumn::number("Coherence", |s| s.coherence),
        ExportColumn::number("Speech form", |s| s.speech_form),
        ExportColumn::number("Reasoning independence", |s| s.reasoning_independence),
        ExportColumn::number("Analytic-synthetic", |s| Some(s.analytic_synthetic)),
        ExportColumn::number("Attention quality", |s| Some(s.attention_quality)),
        ExportColumn::number("Readiness for learning activity", |s| s.readiness),
        ExportColumn::number("Logical generalization", |s| s.logical_generalization),
        ExportColumn::number("Perception", |s| s.perception),
        ExportColumn::number("Active attention", |s| Some(s.attention_quality)),
        ExportColumn::number("Analytic synthesis", |s| Some(s.analytic_synthetic)),
        ExportColumn::number("Imagination", |s| s.imagination),
        ExportColumn::number("Emotion identification", |s| s.emotion_identification),
        ExportColumn::number("Planning", |s| s.planning),
        ExportColumn::number("Cooperation", |s| s.cooperation),
        ExportColumn::number("Reflection", |s| s.reflection),
        ExportColumn::number("Cognitive development", |s| s.cognitive_development),
        ExportColumn::number("Emotional-social intelligence", |s| {
            s.emotional_social_intelligence
        }),
        ExportColumn::text("Cognitive development level", |s| level_label(s.cognitive_level)),
        ExportColumn::text("Imagination level", |s| level_label(s.imagination_level)),
        ExportColumn::text("Emotional-social intelligence level", |s| {
            level_label(s.emotional_social_level)
        }),
    ]
}

pub fn export_headers() -> Vec<&'static str> {
    export_columns().iter().map(|column| column.title).collect()
}

fn write_headers(
    sheet: &mut Worksheet,
    headers: &[&str],
    format: &Format,
) -> Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, format)?;
    }
    Ok(())
}

fn write_optional_number(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<f64>,
    format: &Format,
) -> Result<(), XlsxError> {
    if let Some(value) = value.filter(|value| value.is_finite()) {
        sheet.write_number_with_format(row, col, value, format)?;
    }
    Ok(())
}

/// Renders the whole report into an in-memory `.xlsx` file.
pub fn build_workbook(
    scored: &[ScoredRecord],
    tables: &SummaryTables,
) -> Result<Vec<u8>, XlsxError> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();

    write_age_sheet(&mut workbook, tables, &formats)?;
    write_median_sheet(&mut workbook, tables, &formats)?;
    for distribution in &tables.levels {
        write_level_sheet(&mut workbook, distribution, &formats)?;
    }
    write_town_sheet(&mut workbook, tables, &formats)?;
    write_export_sheet(&mut workbook, scored, &formats)?;

    let bytes = workbook.save_to_buffer()?;
    debug!(bytes = bytes.len(), "workbook rendered");
    Ok(bytes)
}

fn write_age_sheet(
    workbook: &mut Workbook,
    tables: &SummaryTables,
    formats: &Formats,
) -> Result<(), XlsxError> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(AGE_SHEET)?;
    write_headers(sheet, &["Age group", "Children", "Children, %"], &formats.header)?;
    sheet.set_column_width(0, 24)?;
    for (index, row) in tables.ages.iter().enumerate() {
        let r = index as u32 + 1;
        sheet.write_string(r, 0, &row.age_group)?;
        sheet.write_number(r, 1, row.count as f64)?;
        sheet.write_number_with_format(r, 2, row.share, &formats.percent)?;
    }

    if !tables.ages.is_empty() {
        let last = tables.ages.len() as u32;
        let mut chart = Chart::new(ChartType::Pie);
        chart
            .add_series()
            .set_name("Age groups")
            .set_categories((AGE_SHEET, 1, 0, last, 0))
            .set_values((AGE_SHEET, 1, 1, last, 1))
            .set_data_label(ChartDataLabel::new().show_percentage().show_category_name());
        chart.title().set_name("Children by age group");
        sheet.insert_chart(1, 4, &chart)?;
    }
    Ok(())
}

fn write_median_sheet(
    workbook: &mut Workbook,
    tables: &SummaryTables,
    formats: &Formats,
) -> Result<(), XlsxError> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(MEDIAN_SHEET)?;
    write_headers(sheet, &["Indicator", "Median"], &formats.header)?;
    sheet.set_column_width(0, 32)?;
    for (index, row) in tables.medians.iter().enumerate() {
        let r = index as u32 + 1;
        sheet.write_string(r, 0, row.indicator)?;
        write_optional_number(sheet, r, 1, row.median, &formats.number)?;
    }

    let last = tables.medians.len() as u32;
    let mut chart = Chart::new(ChartType::Radar);
    chart
        .add_series()
        .set_name("Median values")
        .set_categories((MEDIAN_SHEET, 1, 0, last, 0))
        .set_values((MEDIAN_SHEET, 1, 1, last, 1));
    chart.title().set_name("Median indicator values");
    sheet.insert_chart(1, 4, &chart)?;
    Ok(())
}

fn write_level_sheet(
    workbook: &mut Workbook,
    distribution: &LevelDistribution,
    formats: &Formats,
) -> Result<(), XlsxError> {
    let sheet_name = level_sheet_name(distribution.metric);
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;
    write_headers(sheet, &["Level", "Children", "Share"], &formats.header)?;
    sheet.set_column_width(0, 20)?;
    sheet.set_column_width(1, 12)?;
    sheet.set_column_width(2, 12)?;
    for (index, row) in distribution.rows.iter().enumerate() {
        let r = index as u32 + 1;
        sheet.write_string(r, 0, row.level.label())?;
        sheet.write_number(r, 1, row.count as f64)?;
        sheet.write_number_with_format(r, 2, row.share, &formats.percent)?;
    }

    let last = distribution.rows.len() as u32;
    let mut chart = Chart::new(ChartType::Column);
    chart
        .add_series()
        .set_name(distribution.metric.title())
        .set_categories((sheet_name, 1, 0, last, 0))
        .set_values((sheet_name, 1, 2, last, 2))
        .set_data_label(ChartDataLabel::new().show_value());
    chart
        .title()
        .set_name(&format!("Level distribution (%): {}", distribution.metric.title()));
    chart.y_axis().set_num_format("0%");
    chart.legend().set_position(ChartLegendPosition::Bottom);
    sheet.insert_chart(1, 4, &chart)?;
    Ok(())
}

fn write_town_sheet(
    workbook: &mut Workbook,
    tables: &SummaryTables,
    formats: &Formats,
) -> Result<(), XlsxError> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(TOWN_SHEET)?;
    write_headers(sheet, &["Town", "Organizations"], &formats.header)?;
    sheet.set_column_width(0, 28)?;
    for (index, row) in tables.towns.iter().enumerate() {
        let r = index as u32 + 1;
        if index + 1 == tables.towns.len() {
            sheet.write_string_with_format(r, 0, &row.town, &formats.total)?;
            sheet.write_number_with_format(r, 1, row.organizations as f64, &formats.total)?;
        } else {
            sheet.write_string(r, 0, &row.town)?;
            sheet.write_number(r, 1, row.organizations as f64)?;
        }
    }
    Ok(())
}

fn write_export_sheet(
    workbook: &mut Workbook,
    scored: &[ScoredRecord],
    formats: &Formats,
) -> Result<(), XlsxError> {
    let columns = export_columns();
    let sheet = workbook.add_worksheet();
    sheet.set_name(EXPORT_SHEET)?;
    write_headers(sheet, &export_headers(), &formats.header)?;

    for (index, record) in scored.iter().enumerate() {
        let r = index as u32 + 1;
        for (col, column) in columns.iter().enumerate() {
            let c = col as u16;
            match column.value {
                ColumnValue::Text(value) => {
                    if let Some(text) = value(record) {
                        sheet.write_string(r, c, &text)?;
                    }
                }
                ColumnValue::Number(value) => {
                    write_optional_number(sheet, r, c, value(record), &formats.number)?;
                }
            }
        }
    }

    for (col, column) in columns.iter().enumerate() {
        let width = match column.value {
            ColumnValue::Text(_) => 18,
            ColumnValue::Number(_) => 12,
        };
        sheet.set_column_width(col as u16, width)?;
    }
    Ok(())
}
