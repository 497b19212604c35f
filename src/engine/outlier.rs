//! Validation of amounts and price bounds, and robust range detection.

use crate::domain::SummaryPosition;
use thiserror::Error;
use tracing::warn;

/// Prices outside this range are treated as unreasonable for the pair.
pub const MIN_REASONABLE_PRICE: f64 = 100.0;
pub const MAX_REASONABLE_PRICE: f64 = 100_000.0;

/// Per-token amount ceilings.
pub const MAX_WETH_AMOUNT: f64 = 1e6;
pub const MAX_USDT_AMOUNT: f64 = 1e12;

/// Absolute guard band against corrupt data that happens to land inside the
/// reasonable range parameters.
pub const MIN_PRICE_THRESHOLD: f64 = 1e-10;
pub const MAX_PRICE_THRESHOLD: f64 = 1e10;

#[derive(Debug, Error)]
pub enum OutlierError {
    #[error("no valid price data found in positions")]
    NoPriceData,
    #[error("no reasonable price range found in positions")]
    NoReasonableRange,
}

/// Validate a single amount against its ceiling. An absent amount is
/// vacuously valid; only out-of-range present values are rejected.
pub fn validate_amount(value: Option<f64>, ceiling: f64) -> bool {
    match value {
        None => true,
        Some(v) => !(v.is_nan() || v.is_infinite() || v < 0.0 || v > ceiling),
    }
}

/// Validate both tracked-token amounts against their respective ceilings.
pub fn validate_amounts(amount_weth: Option<f64>, amount_usdt: Option<f64>) -> bool {
    validate_amount(amount_weth, MAX_WETH_AMOUNT) && validate_amount(amount_usdt, MAX_USDT_AMOUNT)
}

/// Validate a summary position's price bounds and amounts.
///
/// Bounds must be ordered, inside the reasonable range, and inside the
/// absolute guard band.
pub fn validate_position(
    position: &SummaryPosition,
    min_reasonable: f64,
    max_reasonable: f64,
) -> bool {
    let lower = position.price_lower;
    let upper = position.price_upper;

    if lower.is_nan() || upper.is_nan() {
        return false;
    }
    if lower < min_reasonable || upper > max_reasonable {
        return false;
    }
    if lower >= upper {
        return false;
    }
    if lower < MIN_PRICE_THRESHOLD || upper > MAX_PRICE_THRESHOLD {
        return false;
    }

    validate_amounts(Some(position.amount_weth), Some(position.amount_usdt))
}

/// Partition positions into (valid, invalid), preserving input order within
/// each partition. Every rejection is logged, never raised.
pub fn filter_valid(
    positions: Vec<SummaryPosition>,
    min_reasonable: f64,
    max_reasonable: f64,
) -> (Vec<SummaryPosition>, Vec<SummaryPosition>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for position in positions {
        if validate_position(&position, min_reasonable, max_reasonable) {
            valid.push(position);
        } else {
            warn!(
                "Filtered out position {} with invalid prices: lower={}, upper={}",
                position.nft_id, position.price_lower, position.price_upper
            );
            invalid.push(position);
        }
    }

    if !invalid.is_empty() {
        warn!(
            "Filtered out {} invalid positions, keeping {} valid positions",
            invalid.len(),
            valid.len()
        );
    }

    (valid, invalid)
}

/// Robust global price range via percentile trimming.
///
/// Takes the 5th percentile of the lower bounds and the 95th percentile of
/// the upper bounds to suppress extreme outliers without discarding them
/// from aggregation. Falls back to the medians, then to the in-band min/max,
/// when the chosen values escape the absolute guard band.
pub fn robust_price_range(positions: &[SummaryPosition]) -> Result<(f64, f64), OutlierError> {
    let mut lowers: Vec<f64> = positions
        .iter()
        .map(|p| p.price_lower)
        .filter(|p| *p > 0.0)
        .collect();
    let mut uppers: Vec<f64> = positions
        .iter()
        .map(|p| p.price_upper)
        .filter(|p| *p > 0.0)
        .collect();

    if lowers.is_empty() || uppers.is_empty() {
        return Err(OutlierError::NoPriceData);
    }

    lowers.sort_by(f64::total_cmp);
    uppers.sort_by(f64::total_cmp);

    let lower_idx = (lowers.len() as f64 * 0.05) as usize;
    let upper_idx = ((uppers.len() as f64 * 0.95) as usize).min(uppers.len() - 1);

    let mut min_price = lowers[lower_idx];
    let mut max_price = uppers[upper_idx];

    if min_price < MIN_PRICE_THRESHOLD || max_price > MAX_PRICE_THRESHOLD {
        let median_lower = lowers[lowers.len() / 2];
        let median_upper = uppers[uppers.len() / 2];

        if median_lower >= MIN_PRICE_THRESHOLD && median_upper <= MAX_PRICE_THRESHOLD {
            min_price = median_lower;
            max_price = median_upper;
        } else {
            let in_band = |p: &&f64| **p >= MIN_PRICE_THRESHOLD && **p <= MAX_PRICE_THRESHOLD;
            let reasonable_lower = lowers.iter().filter(in_band).copied().next();
            let reasonable_upper = uppers.iter().filter(in_band).copied().last();

            match (reasonable_lower, reasonable_upper) {
                (Some(lo), Some(hi)) => {
                    min_price = lo;
                    max_price = hi;
                }
                _ => return Err(OutlierError::NoReasonableRange),
            }
        }
    }

    Ok((min_price, max_price))
}
