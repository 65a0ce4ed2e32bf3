use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::columns::{extract_town, town_sort_key, TOTAL_LABEL};
use crate::models::{
    AgeRow, CategorizedMetric, Field, Level, LevelDistribution, LevelRow, MedianRow,
    ScoredRecord, SummaryTables, TownRow, TrackedMetric,
};
use crate::scoring::round2;

const UNPARSED_AGE: u32 = 999;

pub fn summarize(scored: &[ScoredRecord]) -> SummaryTables {
    SummaryTables {
        ages: age_distribution(scored),
        medians: median_table(scored),
        levels: CategorizedMetric::ALL
            .iter()
            .map(|metric| level_distribution(scored, *metric))
            .collect(),
        towns: town_summary(scored),
    }
}

/// Counts per level in fixed order. Records without a level stay in the denominator.
pub fn level_distribution(scored: &[ScoredRecord], metric: CategorizedMetric) -> LevelDistribution {
    let total = scored.len();
    let rows = Level::ORDERED
        .iter()
        .map(|level| {
            let count = scored
                .iter()
                .filter(|record| metric.level(record) == Some(*level))
                .count();
            LevelRow {
                level: *level,
                count,
                share: share_of(count, total),
            }
        })
        .collect();

    LevelDistribution {
        metric,
        total,
        rows,
    }
}

pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        Some(values[n / 2])
    } else {
        Some((values[n / 2 - 1] + values[n / 2]) / 2.0)
    }
}

/// Median of each tracked indicator over the records where it is defined.
pub fn median_table(scored: &[ScoredRecord]) -> Vec<MedianRow> {
    TrackedMetric::ALL
        .iter()
        .map(|metric| {
            let mut values: Vec<f64> = scored
                .iter()
                .filter_map(|record| metric.value(record))
                .filter(|value| !value.is_nan())
                .collect();
            MedianRow {
                indicator: metric.title(),
                median: median(&mut values).map(round2),
            }
        })
        .collect()
}

pub fn age_sort_key(label: &str) -> u32 {
    label
        .split('-')
        .next()
        .and_then(|head| head.split_whitespace().next())
        .and_then(|token| token.parse::<u32>().ok())
        .unwrap_or(UNPARSED_AGE)
}

pub fn age_distribution(scored: &[ScoredRecord]) -> Vec<AgeRow> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for record in scored {
        let Some(label) = record.record.label(Field::AgeGroup) else {
            continue;
        };
        let entry = counts.entry(label.clone()).or_insert_with(|| {
            order.push(label);
            0
        });
        *entry += 1;
    }

    let total: usize = counts.values().sum();
    let mut rows: Vec<AgeRow> = order
        .into_iter()
        .map(|age_group| {
            let count = counts[&age_group];
            AgeRow {
                age_group,
                count,
                share: share_of(count, total),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows.sort_by_key(|row| age_sort_key(&row.age_group));
    rows
}

/// Distinct organizations per town, in town order, followed by a total row.
pub fn town_summary(scored: &[ScoredRecord]) -> Vec<TownRow> {
    let mut towns: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for record in scored {
        let Some(organization) = record.record.label(Field::Organization) else {
            continue;
        };
        if let Some(town) = extract_town(&organization) {
            towns.entry(town).or_default().insert(organization);
        }
    }

    let mut rows: Vec<TownRow> = towns
        .into_iter()
        .map(|(town, organizations)| TownRow {
            town,
            organizations: organizations.len(),
        })
        .filter(|row| row.organizations > 0)
        .collect();
    rows.sort_by_cached_key(|row| town_sort_key(Some(row.town.as_str())));

    let total = rows.iter().map(|row| row.organizations).sum();
    rows.push(TownRow {
        town: TOTAL_LABEL.to_string(),
        organizations: total,
    });
    rows
}

fn share_of(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}
