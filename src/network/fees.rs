//! Tiered priority-fee recommendation.
//!
//! Requires a current snapshot: with no successful poll yet the recommender
//! fails typed rather than assuming a quiet network.

use tracing::debug;

use crate::error::ServiceError;
use crate::models::{FeePriority, FeeQuote, NetworkSnapshot};

/// Protocol base fee in SOL, constant per signature.
const BASE_FEE: &str = "0.000005";
const BASE_FEE_SOL: f64 = 0.000005;

/// Priority fee tiers indexed by congestion row × urgency column.
/// Rows: <30, <60, <80, ≥80. Columns: standard, fast, urgent.
const FEE_TIERS: [[&str; 3]; 4] = [
    ["0", "0.00001", "0.00003"],
    ["0.00002", "0.00005", "0.0001"],
    ["0.00005", "0.0001", "0.0002"],
    ["0.0001", "0.0002", "0.0004"],
];

/// Compute a fee quote from the current snapshot plus caller preferences.
/// An override > 0 wins verbatim over the tier table.
pub fn recommend(
    snapshot: Option<&NetworkSnapshot>,
    tx_type: &str,
    priority: FeePriority,
    override_fee: Option<&str>,
) -> Result<FeeQuote, ServiceError> {
    let snapshot = snapshot.ok_or(ServiceError::SnapshotUnavailable)?;
    let congestion = snapshot.congestion_percentage;

    let priority_fee = match override_fee {
        Some(raw) if raw.parse::<f64>().map(|v| v > 0.0).unwrap_or(false) => raw.to_string(),
        _ => FEE_TIERS[congestion_row(congestion)][priority_column(priority)].to_string(),
    };

    let fee_value: f64 = priority_fee.parse().unwrap_or(0.0);
    let total_fee = format!("{:.6}", BASE_FEE_SOL + fee_value);
    let estimated_time = estimated_time(congestion, fee_value);

    debug!(
        tx_type,
        congestion,
        priority = ?priority,
        priority_fee = %priority_fee,
        "fee recommendation computed"
    );

    Ok(FeeQuote {
        base_fee: BASE_FEE.to_string(),
        priority_fee,
        total_fee,
        estimated_time,
    })
}

fn congestion_row(congestion: u8) -> usize {
    if congestion < 30 {
        0
    } else if congestion < 60 {
        1
    } else if congestion < 80 {
        2
    } else {
        3
    }
}

fn priority_column(priority: FeePriority) -> usize {
    match priority {
        FeePriority::Standard => 0,
        FeePriority::Fast => 1,
        FeePriority::Urgent => 2,
    }
}

/// Confirmation estimate keyed off the congestion tier and the *resulting*
/// priority fee, so a user-supplied override shifts the estimate.
fn estimated_time(congestion: u8, priority_fee: f64) -> String {
    let seconds = if congestion < 30 {
        0.3
    } else if congestion < 60 {
        if priority_fee >= 0.00005 {
            0.5
        } else {
            0.8
        }
    } else if congestion < 80 {
        if priority_fee >= 0.0001 {
            0.8
        } else {
            1.5
        }
    } else if priority_fee >= 0.0002 {
        1.2
    } else {
        2.5
    };
    format!("~{:.1}s", seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Config, PerformanceSample};
    use crate::network::derive::derive_snapshot;

    fn snapshot_at(congestion_tps: u64) -> NetworkSnapshot {
        let samples = [PerformanceSample {
            num_transactions: congestion_tps,
            num_failed_transactions: 0,
            sample_period_secs: 1.0,
            num_slots: 2,
        }];
        derive_snapshot(&samples, 1, 1950, &Config::default()).unwrap()
    }

    #[test]
    fn missing_snapshot_is_typed_failure() {
        let err = recommend(None, "transfer", FeePriority::Standard, None).unwrap_err();
        assert_eq!(err, ServiceError::SnapshotUnavailable);
    }

    #[test]
    fn override_wins_regardless_of_tier() {
        // 100% congestion would otherwise pick the very-high row.
        let snapshot = snapshot_at(4000);
        let quote = recommend(
            Some(&snapshot),
            "swap",
            FeePriority::Standard,
            Some("0.00042"),
        )
        .unwrap();

        assert_eq!(quote.priority_fee, "0.00042");
        assert_eq!(quote.total_fee, "0.000425");
        // Override above the very-high threshold gets the fast estimate.
        assert_eq!(quote.estimated_time, "~1.2s");
    }

    #[test]
    fn non_positive_override_falls_back_to_tiers() {
        let snapshot = snapshot_at(2000); // congestion 50, medium row
        for override_fee in [Some("0"), Some("-1"), Some("abc"), None] {
            let quote =
                recommend(Some(&snapshot), "transfer", FeePriority::Fast, override_fee).unwrap();
            assert_eq!(quote.priority_fee, "0.00005");
        }
    }

    #[test]
    fn tier_table_covers_all_rows_and_columns() {
        // congestion per row: 0 → low, 2000 → medium(50), 2800 → high(70), 4000 → very high
        let cases = [
            (0u64, ["0", "0.00001", "0.00003"]),
            (2000, ["0.00002", "0.00005", "0.0001"]),
            (2800, ["0.00005", "0.0001", "0.0002"]),
            (4000, ["0.0001", "0.0002", "0.0004"]),
        ];

        for (tps, row) in cases {
            let snapshot = snapshot_at(tps);
            for (priority, expected) in [
                (FeePriority::Standard, row[0]),
                (FeePriority::Fast, row[1]),
                (FeePriority::Urgent, row[2]),
            ] {
                let quote = recommend(Some(&snapshot), "transfer", priority, None).unwrap();
                assert_eq!(quote.priority_fee, expected);
                assert_eq!(quote.base_fee, BASE_FEE);
            }
        }
    }

    #[test]
    fn estimate_depends_on_resulting_fee() {
        // Medium congestion: 0.00005 and above is the fast path.
        assert_eq!(estimated_time(50, 0.00005), "~0.5s");
        assert_eq!(estimated_time(50, 0.00002), "~0.8s");
        // High congestion.
        assert_eq!(estimated_time(70, 0.0001), "~0.8s");
        assert_eq!(estimated_time(70, 0.00005), "~1.5s");
        // Very high congestion.
        assert_eq!(estimated_time(90, 0.0002), "~1.2s");
        assert_eq!(estimated_time(90, 0.0001), "~2.5s");
        // Quiet network confirms fast regardless of fee.
        assert_eq!(estimated_time(10, 0.0), "~0.3s");
    }

    #[test]
    fn total_fee_is_base_plus_priority_six_decimals() {
        let snapshot = snapshot_at(2000);
        let quote = recommend(Some(&snapshot), "transfer", FeePriority::Urgent, None).unwrap();
        assert_eq!(quote.priority_fee, "0.0001");
        assert_eq!(quote.total_fee, "0.000105");
    }
}
