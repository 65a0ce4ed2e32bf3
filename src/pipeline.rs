use tracing::info;

use crate::aggregate::summarize;
use crate::columns::{normalize, parse_filename};
use crate::error::Result;
use crate::ingest::read_table;
use crate::models::{ScoredRecord, SourceId, SummaryTables};
use crate::scoring::score_all;
use crate::workbook::build_workbook;

#[derive(Debug, Clone)]
pub struct Analysis {
    pub source: SourceId,
    pub scored: Vec<ScoredRecord>,
    pub tables: SummaryTables,
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub workbook: Vec<u8>,
    pub filename: String,
}

/// Validates the filename, then reads, normalizes, scores and aggregates the upload.
pub fn analyze(bytes: &[u8], filename: &str) -> Result<Analysis> {
    let source = parse_filename(filename)?;
    let table = read_table(bytes, filename)?;
    let records = normalize(&table)?;
    let scored = score_all(records);
    let tables = summarize(&scored);

    info!(
        site = %source.site,
        assessment = %source.assessment,
        children = scored.len(),
        "analysis complete"
    );
    Ok(Analysis {
        source,
        scored,
        tables,
    })
}

pub fn process(bytes: &[u8], filename: &str) -> Result<ProcessOutput> {
    let analysis = analyze(bytes, filename)?;
    let workbook = build_workbook(&analysis.scored, &analysis.tables)?;
    Ok(ProcessOutput {
        workbook,
        filename: analysis.source.output_filename(),
    })
}


#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use pretty_assertions::assert_eq;

    use super::fixtures::questionnaire_xlsx;
    use super::*;
    use crate::error::PipelineError;
    use crate::models::{CategorizedMetric, Level};
    use crate::workbook::{sheet_names, EXPORT_SHEET};

    fn sheet_values(bytes: &[u8]) -> Vec<Vec<Vec<Data>>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).unwrap();
        sheet_names()
            .into_iter()
            .map(|name| {
                workbook
                    .worksheet_range(name)
                    .unwrap()
                    .rows()
                    .map(|row| row.to_vec())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn analyze_scores_every_child() {
        let analysis = analyze(&questionnaire_xlsx(), "5-31-Razvitie.xlsx").unwrap();

        assert_eq!(analysis.source.site, "5");
        assert_eq!(analysis.source.assessment, "31");
        assert_eq!(analysis.scored.len(), 3);

        let first = &analysis.scored[0];
        assert_eq!(first.labyrinths[0], 3);
        assert_eq!(first.readiness, Some(0.65));
        let third = &analysis.scored[2];
        assert_eq!(third.labyrinths[0], 0);
        assert_eq!(third.readiness, None);
        assert_eq!(third.cognitive_level, None);
        assert_eq!(third.emotional_social_level, Some(Level::BelowNormative));
    }

    #[test]
    fn analyze_builds_summary_tables() {
        let analysis = analyze(&questionnaire_xlsx(), "5-31-Razvitie.xlsx").unwrap();
        let tables = &analysis.tables;

        let ages: Vec<(&str, usize)> = tables
            .ages
            .iter()
            .map(|row| (row.age_group.as_str(), row.count))
            .collect();
        assert_eq!(ages, vec![("5-6 лет", 2), ("6-7 лет", 1)]);

        let towns: Vec<(&str, usize)> = tables
            .towns
            .iter()
            .map(|row| (row.town.as_str(), row.organizations))
            .collect();
        assert_eq!(towns, vec![("г.Москва", 1), ("г.Тверь", 1), ("Total", 2)]);

        let cognitive = tables
            .levels
            .iter()
            .find(|table| table.metric == CategorizedMetric::CognitiveDevelopment)
            .unwrap();
        let counted: usize = cognitive.rows.iter().map(|row| row.count).sum();
        assert_eq!(cognitive.total, 3);
        assert_eq!(counted, 2);
    }

    #[test]
    fn process_names_output_after_site_and_assessment() {
        let output = process(&questionnaire_xlsx(), "5-31-Razvitie.xlsx").unwrap();
        assert_eq!(output.filename, "Analytics_5-31.xlsx");
        assert!(!output.workbook.is_empty());
    }

    #[test]
    fn process_rejects_bad_filename_before_reading() {
        let err = process(b"irrelevant", "bad.xlsx").unwrap_err();
        assert!(matches!(err, PipelineError::FilenameFormat { .. }));
    }

    #[test]
    fn process_reports_unreadable_workbook() {
        let err = process(b"irrelevant", "5-31.xlsx").unwrap_err();
        assert!(matches!(err, PipelineError::Read(_)));
    }

    #[test]
    fn rerun_produces_identical_cells() {
        let input = questionnaire_xlsx();
        let first = process(&input, "5-31-Razvitie.xlsx").unwrap();
        let second = process(&input, "5-31-Razvitie.xlsx").unwrap();

        assert_eq!(sheet_values(&first.workbook), sheet_values(&second.workbook));
    }

    #[test]
    fn export_sheet_lists_children_in_input_order() {
        let output = process(&questionnaire_xlsx(), "5-31-Razvitie.xlsx").unwrap();
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(output.workbook)).unwrap();
        let range = workbook.worksheet_range(EXPORT_SHEET).unwrap();
        let codes: Vec<Data> = range.rows().skip(1).map(|row| row[0].clone()).collect();
        assert_eq!(
            codes,
            vec![
                Data::String("K-1".to_string()),
                Data::String("K-2".to_string()),
                Data::String("K-3".to_string()),
            ]
        );
    }
}
