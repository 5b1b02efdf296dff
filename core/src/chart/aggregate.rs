use crate::chart::color::SeriesColor;
use crate::model::TransactionRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Window shown when there are no transactions at all.
pub const FALLBACK_WINDOW_MS: i64 = 12 * 60 * 60 * 1000;
/// Smallest x-span used for padding and ticks, so a lone timestamp still
/// gets a non-degenerate domain.
pub const MIN_SPAN_MS: i64 = 60 * 60 * 1000;
pub const Y_DOMAIN: [i64; 2] = [0, 16];
const TICK_COUNT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub timestamp_ms: i64,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub user_name: String,
    pub color: SeriesColor,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartDomain {
    pub x: [i64; 2],
    pub y: [i64; 2],
}

/// Chart-ready view of a transaction log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub series: Vec<ChartSeries>,
    pub domain: ChartDomain,
    pub ticks: Vec<i64>,
}

impl ChartView {
    pub fn series_for(&self, user_name: &str) -> Option<&ChartSeries> {
        self.series.iter().find(|series| series.user_name == user_name)
    }
}

/// Converts a transaction log into per-user cumulative series.
///
/// The output depends only on the set of records (and on `now` when the set
/// is empty): records are ordered by timestamp with user name, user id and
/// count as tie-breakers, so any permutation of the same rows yields the
/// same view. Series appear in order of each user's first transaction.
/// Two rows for one user at the same instant collapse into one point
/// carrying the higher count, keeping every series strictly ascending.
pub fn aggregate(records: &[TransactionRecord], now: DateTime<Utc>) -> ChartView {
    let mut sorted: Vec<&TransactionRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.user_name.cmp(&b.user_name))
            .then_with(|| a.user_id.cmp(&b.user_id))
            .then_with(|| a.cumulative_count.cmp(&b.cumulative_count))
    });

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut grouped: Vec<(&str, Vec<ChartPoint>)> = Vec::new();
    for &record in &sorted {
        let slot = *index.entry(record.user_name.as_str()).or_insert_with(|| {
            grouped.push((record.user_name.as_str(), Vec::new()));
            grouped.len() - 1
        });
        let point = ChartPoint {
            timestamp_ms: record.timestamp.timestamp_millis(),
            value: record.cumulative_count,
        };
        let points = &mut grouped[slot].1;
        match points.last_mut() {
            Some(last) if last.timestamp_ms == point.timestamp_ms => {
                last.value = last.value.max(point.value);
            }
            _ => points.push(point),
        }
    }

    let user_count = grouped.len();
    let series = grouped
        .into_iter()
        .enumerate()
        .map(|(position, (user_name, points))| ChartSeries {
            user_name: user_name.to_string(),
            color: SeriesColor::evenly_spaced(position, user_count),
            points,
        })
        .collect();

    let (domain, ticks) = match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) => {
            let min = first.timestamp.timestamp_millis();
            let max = last.timestamp.timestamp_millis();
            let span = (max - min).max(MIN_SPAN_MS);
            let pad = span / 10;
            (
                ChartDomain {
                    x: [min - pad, max + pad],
                    y: Y_DOMAIN,
                },
                ticks(min, max, span),
            )
        }
        _ => {
            let max = now.timestamp_millis();
            let min = max - FALLBACK_WINDOW_MS;
            (
                ChartDomain {
                    x: [min, max],
                    y: Y_DOMAIN,
                },
                ticks(min, max, FALLBACK_WINDOW_MS),
            )
        }
    };

    ChartView {
        series,
        domain,
        ticks,
    }
}

/// Evenly spaced ticks from the interval boundary at or below `min` up to `max`.
fn ticks(min: i64, max: i64, span: i64) -> Vec<i64> {
    let interval = ((span + TICK_COUNT - 1) / TICK_COUNT).max(1);
    let mut tick = min.div_euclid(interval) * interval;
    let mut out = Vec::new();
    while tick <= max {
        out.push(tick);
        tick += interval;
    }
    out
}
