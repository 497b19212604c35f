//! Normalization of raw call records into positions and summaries.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::datasource::CallRecord;
use crate::domain::{
    normalize_address, LiquidityDelta, Position, SummaryPosition, USDT_ADDRESS, USDT_DECIMALS,
    WETH_ADDRESS, WETH_DECIMALS,
};
use crate::engine::outlier::{
    validate_amounts, validate_position, MAX_REASONABLE_PRICE, MIN_REASONABLE_PRICE,
};
use crate::engine::ticks::{price_from_tick, price_with_decimals};

// Argument slots in the mint call's params struct.
const ARG_TOKEN0: u32 = 0;
const ARG_TOKEN1: u32 = 1;
const ARG_TICK_LOWER: u32 = 3;
const ARG_TICK_UPPER: u32 = 4;

// Positional fallback slots in the mint return list
// (tokenId, liquidity, amount0, amount1).
const MINT_RETURN_AMOUNT0: usize = 2;
const MINT_RETURN_AMOUNT1: usize = 3;

// Positional fallback slots in the increase/decrease return list
// (liquidity, amount0, amount1).
const DELTA_RETURN_AMOUNT0: usize = 1;
const DELTA_RETURN_AMOUNT1: usize = 2;

/// Extract a position from a mint call record, or None when the record does
/// not describe a tracked-pair mint with all required fields.
///
/// Amounts are recovered from the return values by name first, then by the
/// fixed positional fallback slots.
pub fn extract_position(record: &CallRecord) -> Option<Position> {
    if record.arguments.len() < 2 {
        return None;
    }

    let mut token0 = None;
    let mut token1 = None;
    for argument in record.arguments.iter().take(2) {
        match argument.index {
            Some(ARG_TOKEN0) => {
                token0 = argument.value.as_address().map(normalize_address);
            }
            Some(ARG_TOKEN1) => {
                token1 = argument.value.as_address().map(normalize_address);
            }
            _ => {}
        }
    }
    let token0 = token0?;
    let token1 = token1?;

    // Either token may occupy either slot, but both must be present.
    let has_weth = token0 == WETH_ADDRESS || token1 == WETH_ADDRESS;
    let has_usdt = token0 == USDT_ADDRESS || token1 == USDT_ADDRESS;
    if !(has_weth && has_usdt) {
        return None;
    }

    let tick_lower = record
        .argument_at(ARG_TICK_LOWER)
        .and_then(|a| a.value.as_big_integer())
        .and_then(|v| i32::try_from(v).ok());
    let tick_upper = record
        .argument_at(ARG_TICK_UPPER)
        .and_then(|a| a.value.as_big_integer())
        .and_then(|v| i32::try_from(v).ok());

    let nft_id = record
        .return_named("tokenId")
        .and_then(|r| r.value.as_big_integer())
        .and_then(|v| u64::try_from(v).ok());

    let mut amount0 = record
        .return_named("amount0")
        .and_then(|r| r.value.as_big_integer());
    let mut amount1 = record
        .return_named("amount1")
        .and_then(|r| r.value.as_big_integer());

    if amount0.is_none() || amount1.is_none() {
        for (i, ret) in record.returns.iter().enumerate() {
            if let Some(value) = ret.value.as_big_integer() {
                if i == MINT_RETURN_AMOUNT0 && amount0.is_none() {
                    amount0 = Some(value);
                } else if i == MINT_RETURN_AMOUNT1 && amount1.is_none() {
                    amount1 = Some(value);
                }
            }
        }
    }

    let (tick_lower, tick_upper, nft_id) = (tick_lower?, tick_upper?, nft_id?);
    let timestamp = record.timestamp()?;

    let is_weth_token0 = token0 == WETH_ADDRESS;
    let (decimals0, decimals1) = if is_weth_token0 {
        (WETH_DECIMALS, USDT_DECIMALS)
    } else {
        (USDT_DECIMALS, WETH_DECIMALS)
    };

    let amount0_adjusted = amount0.map(|a| a as f64 / 10_f64.powi(decimals0));
    let amount1_adjusted = amount1.map(|a| a as f64 / 10_f64.powi(decimals1));

    let (amount_weth, amount_usdt) = if is_weth_token0 {
        (amount0_adjusted, amount1_adjusted)
    } else {
        (amount1_adjusted, amount0_adjusted)
    };

    Some(Position {
        nft_id,
        tick_lower,
        tick_upper,
        timestamp,
        token0,
        token1,
        price_lower: price_from_tick(tick_lower),
        price_upper: price_from_tick(tick_upper),
        price_lower_adjusted: price_with_decimals(tick_lower, decimals0, decimals1),
        price_upper_adjusted: price_with_decimals(tick_upper, decimals0, decimals1),
        amount0,
        amount1,
        amount_weth,
        amount_usdt,
    })
}

/// Extract positions from a batch of mint call records, skipping malformed
/// records silently.
pub fn extract_positions(records: &[CallRecord]) -> Vec<Position> {
    let positions: Vec<Position> = records.iter().filter_map(extract_position).collect();
    debug!(
        "Extracted {} positions from {} mint call records",
        positions.len(),
        records.len()
    );
    positions
}

/// Fold increase/decrease-liquidity calls into per-identifier net deltas.
///
/// Every matching call increments the identifier's count regardless of
/// direction; amounts add on increase and subtract on decrease.
pub fn fold_liquidity_deltas(records: &[CallRecord]) -> HashMap<u64, LiquidityDelta> {
    let mut deltas: HashMap<u64, LiquidityDelta> = HashMap::new();

    for record in records {
        let is_decrease = match record.signature_name() {
            Some("increaseLiquidity") => false,
            Some("decreaseLiquidity") => true,
            _ => continue,
        };

        let Some(nft_id) = record
            .argument_at(0)
            .and_then(|a| a.value.as_big_integer())
            .and_then(|v| u64::try_from(v).ok())
        else {
            continue;
        };

        let mut amount0 = record
            .return_named("amount0")
            .and_then(|r| r.value.as_big_integer());
        let mut amount1 = record
            .return_named("amount1")
            .and_then(|r| r.value.as_big_integer());

        if amount0.is_none() || amount1.is_none() {
            for (i, ret) in record.returns.iter().enumerate() {
                if let Some(value) = ret.value.as_big_integer() {
                    if i == DELTA_RETURN_AMOUNT0 && amount0.is_none() {
                        amount0 = Some(value);
                    } else if i == DELTA_RETURN_AMOUNT1 && amount1.is_none() {
                        amount1 = Some(value);
                    }
                }
            }
        }

        let entry = deltas.entry(nft_id).or_default();
        entry.count += 1;
        let sign: i128 = if is_decrease { -1 } else { 1 };
        if let Some(a0) = amount0 {
            entry.total_amount0 += sign * a0;
        }
        if let Some(a1) = amount1 {
            entry.total_amount1 += sign * a1;
        }
    }

    deltas
}

/// Merge mint positions with their net liquidity deltas into the final
/// summary set, dropping entries whose final amounts or price bounds fail
/// validation.
///
/// Price bounds are copied from the mint, never recomputed from deltas.
pub fn build_summary(
    positions: &[Position],
    deltas: &HashMap<u64, LiquidityDelta>,
) -> Vec<SummaryPosition> {
    let mut summary = Vec::new();

    for position in positions {
        let delta = deltas.get(&position.nft_id).copied().unwrap_or_default();

        let (decimals0, decimals1) = if position.is_weth_token0() {
            (WETH_DECIMALS, USDT_DECIMALS)
        } else {
            (USDT_DECIMALS, WETH_DECIMALS)
        };

        let total_amount0 = position.amount0.unwrap_or(0) + delta.total_amount0;
        let total_amount1 = position.amount1.unwrap_or(0) + delta.total_amount1;

        let total0_adjusted = total_amount0 as f64 / 10_f64.powi(decimals0);
        let total1_adjusted = total_amount1 as f64 / 10_f64.powi(decimals1);

        let (amount_weth, amount_usdt) = if position.is_weth_token0() {
            (total0_adjusted, total1_adjusted)
        } else {
            (total1_adjusted, total0_adjusted)
        };

        if !validate_amounts(Some(amount_weth), Some(amount_usdt)) {
            warn!(
                "Filtering out position {} with invalid final amounts: weth={}, usdt={}",
                position.nft_id, amount_weth, amount_usdt
            );
            continue;
        }

        let item = SummaryPosition {
            nft_id: position.nft_id,
            create_time: position.timestamp,
            number_of_positions: 1 + delta.count,
            price_lower: position.price_lower_adjusted,
            price_upper: position.price_upper_adjusted,
            amount_weth,
            amount_usdt,
        };

        if !validate_position(&item, MIN_REASONABLE_PRICE, MAX_REASONABLE_PRICE) {
            warn!(
                "Filtering out position {} with invalid prices in final summary: lower={}, upper={}",
                item.nft_id, item.price_lower, item.price_upper
            );
            continue;
        }

        summary.push(item);
    }

    summary
}
