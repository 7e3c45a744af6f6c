//! Timeframe bucketing of raw performance samples for the congestion chart.
//!
//! The chart must always receive one point per label, so a zero-sample
//! response produces zero-valued buckets instead of failing. An upstream
//! error still propagates; partial bucket sets are never returned.

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::error::ServiceError;
use crate::models::{Config, HistoryBucket, HistoryResult, PerformanceSample, Timeframe};
use crate::network::derive::{congestion_from_tps, round1};
use crate::rpc::PerformanceSource;

const WEEK_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTH_LABELS: [&str; 4] = ["Week 1", "Week 2", "Week 3", "Week 4"];

/// Fetch and bucket history for one timeframe.
pub async fn history(
    source: &dyn PerformanceSource,
    timeframe: Timeframe,
    config: &Config,
) -> Result<HistoryResult, ServiceError> {
    let samples = source.recent_samples(timeframe.sample_count()).await?;
    Ok(bucketize(
        &samples,
        timeframe,
        Utc::now(),
        config.max_practical_tps,
    ))
}

/// The fixed, ordered label list for a timeframe. Day labels are the 3-hour
/// marks over the last 24 hours, chronological, derived from `now`.
pub fn timeframe_labels(timeframe: Timeframe, now: DateTime<Utc>) -> Vec<String> {
    match timeframe {
        Timeframe::Day => {
            let mut labels: Vec<String> = (1..=8i64)
                .map(|step| format!("{}:00", (now - Duration::hours(3 * step)).hour()))
                .collect();
            labels.reverse();
            labels
        }
        Timeframe::Week => WEEK_LABELS.iter().map(|s| s.to_string()).collect(),
        Timeframe::Month => MONTH_LABELS.iter().map(|s| s.to_string()).collect(),
    }
}

#[derive(Default)]
struct BucketAcc {
    congestion: f64,
    tps: f64,
    block_time: f64,
    fee: f64,
    count: usize,
}

/// Distribute samples across the timeframe's labels by proportional index
/// and average the derived metrics per bucket.
pub fn bucketize(
    samples: &[PerformanceSample],
    timeframe: Timeframe,
    now: DateTime<Utc>,
    max_practical_tps: f64,
) -> HistoryResult {
    let labels = timeframe_labels(timeframe, now);
    let mut accs: Vec<BucketAcc> = (0..labels.len()).map(|_| BucketAcc::default()).collect();

    for (index, sample) in samples.iter().enumerate() {
        let tps = if sample.sample_period_secs > 0.0 {
            sample.num_transactions as f64 / sample.sample_period_secs
        } else {
            0.0
        };
        let congestion = congestion_from_tps(tps, max_practical_tps);
        let block_time = if sample.num_slots > 0 {
            sample.sample_period_secs * 1000.0 / sample.num_slots as f64
        } else {
            0.0
        };

        let bucket = index * labels.len() / samples.len();
        let acc = &mut accs[bucket];
        acc.congestion += congestion as f64;
        acc.tps += tps;
        acc.block_time += block_time;
        acc.fee += sample_fee(congestion);
        acc.count += 1;
    }

    let data: Vec<HistoryBucket> = labels
        .into_iter()
        .zip(accs)
        .map(|(day, acc)| {
            if acc.count == 0 {
                return HistoryBucket {
                    day,
                    congestion: 0,
                    tps: 0,
                    block_time: 0,
                    fee: 0.0,
                };
            }
            let n = acc.count as f64;
            HistoryBucket {
                day,
                congestion: (acc.congestion / n).round() as u8,
                tps: (acc.tps / n).round() as u64,
                block_time: (acc.block_time / n).round() as u64,
                fee: round6(acc.fee / n),
            }
        })
        .collect();

    // Series aggregates over the bucket-level congestion values, zero buckets
    // included, so the headline numbers match what the chart shows.
    let congestion_values: Vec<u8> = data.iter().map(|b| b.congestion).collect();
    let avg_congestion = if congestion_values.is_empty() {
        0.0
    } else {
        round1(
            congestion_values.iter().map(|&c| c as f64).sum::<f64>()
                / congestion_values.len() as f64,
        )
    };
    let peak_congestion = congestion_values.iter().copied().max().unwrap_or(0);
    let low_congestion = congestion_values.iter().copied().min().unwrap_or(0);

    HistoryResult {
        timeframe,
        data,
        avg_congestion,
        peak_congestion,
        low_congestion,
    }
}

/// Per-sample fee proxy for charting, one step below the live
/// recommendation tiers.
fn sample_fee(congestion: u8) -> f64 {
    if congestion < 30 {
        0.0
    } else if congestion < 60 {
        0.00002
    } else if congestion < 80 {
        0.00005
    } else {
        0.0001
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 27, 12, 0, 0).unwrap()
    }

    fn sample(num_transactions: u64) -> PerformanceSample {
        PerformanceSample {
            num_transactions,
            num_failed_transactions: 0,
            sample_period_secs: 1.0,
            num_slots: 2,
        }
    }

    #[test]
    fn every_label_appears_exactly_once_for_each_timeframe() {
        for (timeframe, expected) in [
            (Timeframe::Day, 8),
            (Timeframe::Week, 7),
            (Timeframe::Month, 4),
        ] {
            let result = bucketize(&[sample(1000); 10], timeframe, fixed_now(), 4000.0);
            assert_eq!(result.data.len(), expected);

            let mut labels: Vec<&str> = result.data.iter().map(|b| b.day.as_str()).collect();
            labels.sort();
            labels.dedup();
            assert_eq!(labels.len(), expected);
        }
    }

    #[test]
    fn day_labels_are_chronological_three_hour_marks() {
        let labels = timeframe_labels(Timeframe::Day, fixed_now());
        assert_eq!(
            labels,
            vec!["12:00", "15:00", "18:00", "21:00", "0:00", "3:00", "6:00", "9:00"]
        );
    }

    #[test]
    fn zero_samples_yield_zero_shaped_week() {
        let result = bucketize(&[], Timeframe::Week, fixed_now(), 4000.0);

        assert_eq!(result.data.len(), 7);
        let labels: Vec<&str> = result.data.iter().map(|b| b.day.as_str()).collect();
        assert_eq!(labels, WEEK_LABELS.to_vec());
        for bucket in &result.data {
            assert_eq!(bucket.congestion, 0);
            assert_eq!(bucket.tps, 0);
            assert_eq!(bucket.block_time, 0);
            assert_eq!(bucket.fee, 0.0);
        }
        assert_eq!(result.avg_congestion, 0.0);
        assert_eq!(result.peak_congestion, 0);
        assert_eq!(result.low_congestion, 0);
    }

    #[test]
    fn week_distributes_one_sample_per_day() {
        let samples: Vec<PerformanceSample> =
            (1..=7).map(|i| sample(i * 400)).collect();
        let result = bucketize(&samples, Timeframe::Week, fixed_now(), 4000.0);

        // Sample i has tps 400*i, congestion 10*i.
        for (i, bucket) in result.data.iter().enumerate() {
            assert_eq!(bucket.tps, (i as u64 + 1) * 400);
            assert_eq!(bucket.congestion, (i as u8 + 1) * 10);
        }
        assert_eq!(result.peak_congestion, 70);
        assert_eq!(result.low_congestion, 10);
        assert_eq!(result.avg_congestion, 40.0);
    }

    #[test]
    fn buckets_average_their_samples() {
        // 8 samples over 4 month buckets: two per bucket.
        let samples: Vec<PerformanceSample> = vec![
            sample(1000),
            sample(3000), // Week 1: avg tps 2000, congestion (25+75)/2 = 50
            sample(2000),
            sample(2000),
            sample(0),
            sample(4000),
            sample(4000),
            sample(4000),
        ];
        let result = bucketize(&samples, Timeframe::Month, fixed_now(), 4000.0);

        assert_eq!(result.data[0].tps, 2000);
        assert_eq!(result.data[0].congestion, 50);
        assert_eq!(result.data[1].congestion, 50);
        assert_eq!(result.data[3].congestion, 100);
        assert_eq!(result.data[3].fee, 0.0001);
    }

    #[test]
    fn sample_fee_tiers() {
        assert_eq!(sample_fee(10), 0.0);
        assert_eq!(sample_fee(45), 0.00002);
        assert_eq!(sample_fee(70), 0.00005);
        assert_eq!(sample_fee(90), 0.0001);
    }
}
