use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{SourceId, SummaryTables};

#[derive(Serialize)]
struct JsonSummary<'a> {
    source: &'a SourceId,
    children: usize,
    generated_on: NaiveDate,
    #[serde(flatten)]
    tables: &'a SummaryTables,
}

pub fn build_json(
    source: &SourceId,
    children: usize,
    generated_on: NaiveDate,
    tables: &SummaryTables,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonSummary {
        source,
        children,
        generated_on,
        tables,
    })
}

fn percent(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

pub fn build_markdown(
    source: &SourceId,
    children: usize,
    generated_on: NaiveDate,
    tables: &SummaryTables,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Diagnostic Analytics Report");
    let _ = writeln!(
        output,
        "Site {}, assessment {}: {} children (generated {})",
        source.site, source.assessment, children, generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Age Groups");

    if tables.ages.is_empty() {
        let _ = writeln!(output, "No age groups recorded.");
    } else {
        for row in &tables.ages {
            let _ = writeln!(
                output,
                "- {}: {} children ({})",
                row.age_group,
                row.count,
                percent(row.share)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Medians");
    for row in &tables.medians {
        match row.median {
            Some(value) => {
                let _ = writeln!(output, "- {}: {:.2}", row.indicator, value);
            }
            None => {
                let _ = writeln!(output, "- {}: n/a", row.indicator);
            }
        }
    }

    for distribution in &tables.levels {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Levels: {}", distribution.metric.title());
        for row in &distribution.rows {
            let _ = writeln!(
                output,
                "- {}: {} children ({})",
                row.level,
                row.count,
                percent(row.share)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Organizations by Town");
    for row in &tables.towns {
        let _ = writeln!(output, "- {}: {}", row.town, row.organizations);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AgeRow, CategorizedMetric, Level, LevelDistribution, LevelRow, MedianRow, TownRow,
    };

    fn source() -> SourceId {
        SourceId {
            site: "5".to_string(),
            assessment: "31".to_string(),
        }
    }

    fn tables() -> SummaryTables {
        SummaryTables {
            ages: vec![AgeRow {
                age_group: "5-6 лет".to_string(),
                count: 2,
                share: 1.0,
            }],
            medians: vec![
                MedianRow {
                    indicator: "Perception",
                    median: Some(0.5),
                },
                MedianRow {
                    indicator: "Planning",
                    median: None,
                },
            ],
            levels: vec![LevelDistribution {
                metric: CategorizedMetric::Imagination,
                total: 2,
                rows: vec![LevelRow {
                    level: Level::Normative,
                    count: 1,
                    share: 0.5,
                }],
            }],
            towns: vec![
                TownRow {
                    town: "г.Клин".to_string(),
                    organizations: 1,
                },
                TownRow {
                    town: "Total".to_string(),
                    organizations: 1,
                },
            ],
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 2).unwrap()
    }

    #[test]
    fn markdown_lists_every_table() {
        let report = build_markdown(&source(), 2, date(), &tables());

        assert!(report.contains("Site 5, assessment 31: 2 children (generated 2026-02-02)"));
        assert!(report.contains("- 5-6 лет: 2 children (100.0%)"));
        assert!(report.contains("- Perception: 0.50"));
        assert!(report.contains("- Planning: n/a"));
        assert!(report.contains("## Levels: Imagination"));
        assert!(report.contains("- normative: 1 children (50.0%)"));
        assert!(report.contains("- Total: 1"));
    }

    #[test]
    fn markdown_handles_missing_ages() {
        let mut tables = tables();
        tables.ages.clear();
        let report = build_markdown(&source(), 0, date(), &tables);
        assert!(report.contains("No age groups recorded."));
    }

    #[test]
    fn json_flattens_tables() {
        let json = build_json(&source(), 2, date(), &tables()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["source"]["site"], "5");
        assert_eq!(value["children"], 2);
        assert_eq!(value["generated_on"], "2026-02-02");
        assert_eq!(value["levels"][0]["metric"], "imagination");
        assert_eq!(value["levels"][0]["rows"][0]["level"], "normative");
        assert_eq!(value["medians"][1]["median"], serde_json::Value::Null);
    }
}
