//! Snapshot derivation: raw performance counters → normalized metrics.
//!
//! Pure and deterministic; identical input always yields an identical
//! snapshot. Any upstream failure aborts derivation — a partial snapshot is
//! never produced.

use crate::error::ServiceError;
use crate::models::{
    Config, ConfirmationStatus, CongestionStatus, NetworkSnapshot, PerformanceSample,
    PriorityFeeStatus,
};

/// Confirmation latency in seconds on a quiet network.
const BASE_CONFIRMATION_SECS: f64 = 0.4;

/// Derive the current snapshot from one batch of raw counters.
///
/// Congestion is a simplified proxy: observed TPS relative to the configured
/// practical ceiling, not a true capacity model.
pub fn derive_snapshot(
    samples: &[PerformanceSample],
    slot: u64,
    validator_count: usize,
    config: &Config,
) -> Result<NetworkSnapshot, ServiceError> {
    if samples.is_empty() {
        return Err(ServiceError::InsufficientData);
    }

    let mut tps_sum = 0.0;
    let mut block_time_sum = 0.0;
    let mut total_tx: u64 = 0;
    let mut failed_tx: u64 = 0;

    for sample in samples {
        if sample.sample_period_secs > 0.0 {
            tps_sum += sample.num_transactions as f64 / sample.sample_period_secs;
            // A sample with zero slots contributes no block time.
            if sample.num_slots > 0 {
                block_time_sum += sample.sample_period_secs * 1000.0 / sample.num_slots as f64;
            }
        }
        total_tx += sample.num_transactions;
        failed_tx += sample.num_failed_transactions;
    }

    let count = samples.len() as f64;
    let tps = (tps_sum / count).round() as u64;
    let block_time_ms = (block_time_sum / count).round() as u64;

    let congestion_percentage = congestion_from_tps(tps as f64, config.max_practical_tps);
    let congestion_status = CongestionStatus::from_percentage(congestion_percentage);

    let (avg_confirmation_time, confirmation_status) = confirmation_estimate(congestion_percentage);
    let (recommended_priority_fee, priority_fee_status) = recommended_fee(congestion_percentage);

    let failed_tx_percentage = if total_tx > 0 {
        round1(failed_tx as f64 / total_tx as f64 * 100.0)
    } else {
        0.0
    };

    let baseline = &config.baseline;

    Ok(NetworkSnapshot {
        congestion_percentage,
        congestion_status,
        avg_confirmation_time,
        confirmation_status,
        recommended_priority_fee,
        priority_fee_status,
        tps,
        block_time_ms,
        failed_tx_percentage,
        validator_count,
        tps_change: percent_change(tps as f64, baseline.tps),
        block_time_change: percent_change(block_time_ms as f64, baseline.block_time_ms),
        failed_tx_change: percent_change(failed_tx_percentage, baseline.failed_tx_pct),
        validator_count_change: percent_change(validator_count as f64, baseline.validator_count),
        current_slot: format_slot(slot),
    })
}

/// Observed TPS mapped onto [0, 100] against the practical ceiling.
pub fn congestion_from_tps(tps: f64, max_practical_tps: f64) -> u8 {
    if max_practical_tps <= 0.0 {
        return 0;
    }
    ((tps / max_practical_tps * 100.0).round() as u64).min(100) as u8
}

fn confirmation_estimate(congestion: u8) -> (String, ConfirmationStatus) {
    let (multiplier, status) = if congestion < 30 {
        (1.0, ConfirmationStatus::FasterThanUsual)
    } else if congestion < 60 {
        (1.5, ConfirmationStatus::Normal)
    } else if congestion < 80 {
        (2.5, ConfirmationStatus::SlowerThanUsual)
    } else {
        (4.0, ConfirmationStatus::VerySlow)
    };
    (format!("{:.1}", BASE_CONFIRMATION_SECS * multiplier), status)
}

fn recommended_fee(congestion: u8) -> (String, PriorityFeeStatus) {
    let (fee, status) = if congestion < 30 {
        ("0", PriorityFeeStatus::None)
    } else if congestion < 60 {
        ("0.00005", PriorityFeeStatus::Low)
    } else if congestion < 80 {
        ("0.0001", PriorityFeeStatus::Medium)
    } else {
        ("0.0002", PriorityFeeStatus::High)
    };
    (fee.to_string(), status)
}

/// Percentage delta vs. a fixed baseline, one decimal place. A zero baseline
/// yields 0 to avoid the divide, not as a "no change" claim.
pub(crate) fn percent_change(current: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        return 0.0;
    }
    round1((current - baseline) / baseline * 100.0)
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Thousands-separated slot number for display.
pub fn format_slot(slot: u64) -> String {
    let digits = slot.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
