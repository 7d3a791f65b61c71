//! Read-side grouping of scored results into per-day averages.

use crate::model::{SourceTrend, TestResult, TrendPoint};
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Default)]
struct Bucket {
    sum: f64,
    count: usize,
}

fn points(buckets: BTreeMap<NaiveDate, Bucket>) -> Vec<TrendPoint> {
    buckets
        .into_iter()
        .map(|(date, b)| TrendPoint {
            date,
            mean_score: b.sum / b.count as f64,
            count: b.count,
        })
        .collect()
}

/// One series per source, sources sorted by name, dates ascending (UTC).
/// Days without results produce no point.
pub fn aggregate_by_source(results: &[TestResult]) -> Vec<SourceTrend> {
    let mut by_source: BTreeMap<&str, BTreeMap<NaiveDate, Bucket>> = BTreeMap::new();
    for r in results {
        let b = by_source
            .entry(r.source.as_str())
            .or_default()
            .entry(r.created_at.date_naive())
            .or_default();
        b.sum += r.score;
        b.count += 1;
    }

    by_source
        .into_iter()
        .map(|(source, buckets)| SourceTrend {
            source: source.to_string(),
            points: points(buckets),
        })
        .collect()
}

/// All sources pooled into a single daily series.
pub fn aggregate_overall(results: &[TestResult]) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    for r in results {
        let b = buckets.entry(r.created_at.date_naive()).or_default();
        b.sum += r.score;
        b.count += 1;
    }
    points(buckets)
}
