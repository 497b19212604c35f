//! Partitioning of a price range into bins and proportional distribution of
//! position liquidity across them.

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{PriceBin, SummaryPosition};
use crate::engine::outlier::{self, OutlierError};

#[derive(Debug, Error)]
pub enum BinningError {
    #[error("no positions provided")]
    NoPositions,
    #[error("no valid positions after filtering")]
    NoValidPositions,
    #[error("min_price {min} must be less than max_price {max}")]
    InvalidRange { min: f64, max: f64 },
    #[error(transparent)]
    Range(#[from] OutlierError),
}

/// Partition `[min_price, max_price)` into `num_bins` contiguous equal-width
/// bins.
pub fn build_bins(
    min_price: f64,
    max_price: f64,
    num_bins: usize,
) -> Result<Vec<PriceBin>, BinningError> {
    if min_price >= max_price {
        return Err(BinningError::InvalidRange {
            min: min_price,
            max: max_price,
        });
    }

    let bin_size = (max_price - min_price) / num_bins as f64;
    let bins = (0..num_bins)
        .map(|i| {
            PriceBin::new(
                i,
                min_price + i as f64 * bin_size,
                min_price + (i + 1) as f64 * bin_size,
            )
        })
        .collect();

    Ok(bins)
}

/// Length of the intersection of two intervals; zero for disjoint or
/// touching-only intervals.
pub fn overlap_length(a_lower: f64, a_upper: f64, b_lower: f64, b_upper: f64) -> f64 {
    (a_upper.min(b_upper) - a_lower.max(b_lower)).max(0.0)
}

/// Distribute a position's amounts across every bin its range overlaps,
/// proportionally to the overlap length.
///
/// A degenerate range contributes nothing. Each touched bin counts the
/// position once, however small the overlap.
pub fn distribute(position: &SummaryPosition, bins: &mut [PriceBin]) {
    let range = position.price_upper - position.price_lower;
    if range <= 0.0 {
        return;
    }

    for bin in bins.iter_mut() {
        let overlap = overlap_length(
            position.price_lower,
            position.price_upper,
            bin.price_lower,
            bin.price_upper,
        );
        if overlap > 0.0 {
            let proportion = overlap / range;
            bin.amount_weth += position.amount_weth * proportion;
            bin.amount_usdt += position.amount_usdt * proportion;
            bin.count_nfts += 1;
        }
    }
}

/// Full binning run: filter positions, detect the robust range, build bins,
/// and distribute every valid position into them.
///
/// Fails rather than returning an empty or partial result when no positions
/// are supplied, filtering leaves nothing, or range detection fails.
pub fn aggregate(
    positions: Vec<SummaryPosition>,
    num_bins: usize,
    min_reasonable: f64,
    max_reasonable: f64,
) -> Result<Vec<PriceBin>, BinningError> {
    if positions.is_empty() {
        return Err(BinningError::NoPositions);
    }

    let (valid, _invalid) = outlier::filter_valid(positions, min_reasonable, max_reasonable);
    if valid.is_empty() {
        return Err(BinningError::NoValidPositions);
    }

    let (min_price, max_price) = outlier::robust_price_range(&valid)?;
    debug!("Detected price range [{}, {}]", min_price, max_price);

    let mut bins = build_bins(min_price, max_price, num_bins)?;
    for position in &valid {
        distribute(position, &mut bins);
    }

    info!(
        "Distributed {} positions across {} bins",
        valid.len(),
        bins.len()
    );
    Ok(bins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::outlier::{MAX_REASONABLE_PRICE, MIN_REASONABLE_PRICE};
    use chrono::Utc;

    fn summary(nft_id: u64, lower: f64, upper: f64, weth: f64, usdt: f64) -> SummaryPosition {
        SummaryPosition {
            nft_id,
            create_time: Utc::now(),
            number_of_positions: 1,
            price_lower: lower,
            price_upper: upper,
            amount_weth: weth,
            amount_usdt: usdt,
        }
    }

    #[test]
    fn test_build_bins_equal_width_contiguous() {
        let bins = build_bins(1000.0, 2000.0, 4).unwrap();
        assert_eq!(bins.len(), 4);
        for (i, bin) in bins.iter().enumerate() {
            assert_eq!(bin.bin_index, i);
            assert!((bin.price_upper - bin.price_lower - 250.0).abs() < 1e-9);
        }
        for pair in bins.windows(2) {
            assert_eq!(pair[0].price_upper, pair[1].price_lower);
        }
        assert_eq!(bins[0].price_lower, 1000.0);
        assert_eq!(bins[3].price_upper, 2000.0);
    }

    #[test]
    fn test_build_bins_rejects_inverted_range() {
        assert!(matches!(
            build_bins(2000.0, 1000.0, 4),
            Err(BinningError::InvalidRange { .. })
        ));
        assert!(matches!(
            build_bins(1000.0, 1000.0, 4),
            Err(BinningError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_overlap_length_symmetric() {
        assert_eq!(overlap_length(1.0, 5.0, 3.0, 8.0), 2.0);
        assert_eq!(overlap_length(3.0, 8.0, 1.0, 5.0), 2.0);
    }

    #[test]
    fn test_overlap_length_disjoint_and_touching() {
        assert_eq!(overlap_length(1.0, 2.0, 3.0, 4.0), 0.0);
        assert_eq!(overlap_length(1.0, 2.0, 2.0, 3.0), 0.0);
    }

    #[test]
    fn test_distribute_fully_inside_one_bin() {
        let mut bins = build_bins(1000.0, 2000.0, 4).unwrap();
        // [1300, 1400] sits entirely inside bin 1 ([1250, 1500)).
        let position = summary(1, 1300.0, 1400.0, 4.0, 8000.0);
        distribute(&position, &mut bins);

        assert!((bins[1].amount_weth - 4.0).abs() < 1e-9);
        assert!((bins[1].amount_usdt - 8000.0).abs() < 1e-9);
        assert_eq!(bins[1].count_nfts, 1);

        for i in [0, 2, 3] {
            assert_eq!(bins[i].amount_weth, 0.0);
            assert_eq!(bins[i].amount_usdt, 0.0);
            assert_eq!(bins[i].count_nfts, 0);
        }
    }

    #[test]
    fn test_distribute_split_across_two_bins_proportionally() {
        let mut bins = build_bins(1000.0, 2000.0, 4).unwrap();
        // [1200, 1450] overlaps bin 0 ([1000, 1250)) by 50 and bin 1
        // ([1250, 1500)) by 200.
        let position = summary(1, 1200.0, 1450.0, 10.0, 1000.0);
        distribute(&position, &mut bins);

        let total_weth = bins[0].amount_weth + bins[1].amount_weth;
        let total_usdt = bins[0].amount_usdt + bins[1].amount_usdt;
        assert!((total_weth - 10.0).abs() < 1e-9);
        assert!((total_usdt - 1000.0).abs() < 1e-9);

        // Proportions 50:200 = 1:4.
        assert!((bins[0].amount_weth - 2.0).abs() < 1e-9);
        assert!((bins[1].amount_weth - 8.0).abs() < 1e-9);

        assert_eq!(bins[0].count_nfts, 1);
        assert_eq!(bins[1].count_nfts, 1);
        assert_eq!(bins[2].count_nfts, 0);
    }

    #[test]
    fn test_distribute_degenerate_range_contributes_nothing() {
        let mut bins = build_bins(1000.0, 2000.0, 4).unwrap();
        let position = summary(1, 1300.0, 1300.0, 5.0, 5.0);
        distribute(&position, &mut bins);
        for bin in &bins {
            assert_eq!(bin.amount_weth, 0.0);
            assert_eq!(bin.count_nfts, 0);
        }
    }

    #[test]
    fn test_distribute_counts_once_per_touched_bin() {
        let mut bins = build_bins(1000.0, 2000.0, 4).unwrap();
        // Spans every bin; each one counts the position once.
        let position = summary(1, 900.0, 2100.0, 12.0, 0.0);
        distribute(&position, &mut bins);
        for bin in &bins {
            assert_eq!(bin.count_nfts, 1);
        }
        let total: f64 = bins.iter().map(|b| b.amount_weth).sum();
        // Only the overlapping 1000 of the 1200-wide range lands in bins.
        assert!((total - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_empty_input_fails() {
        assert!(matches!(
            aggregate(vec![], 4, MIN_REASONABLE_PRICE, MAX_REASONABLE_PRICE),
            Err(BinningError::NoPositions)
        ));
    }

    #[test]
    fn test_aggregate_nothing_valid_fails() {
        let positions = vec![summary(1, 10.0, 20.0, 1.0, 1.0)];
        assert!(matches!(
            aggregate(positions, 4, MIN_REASONABLE_PRICE, MAX_REASONABLE_PRICE),
            Err(BinningError::NoValidPositions)
        ));
    }

    #[test]
    fn test_aggregate_distributes_valid_positions() {
        let positions = vec![
            summary(1, 1000.0, 1100.0, 1.0, 1000.0),
            summary(2, 1050.0, 1150.0, 2.0, 2000.0),
            summary(3, 2000.0, 2100.0, 3.0, 3000.0),
        ];
        let bins = aggregate(positions, 2, MIN_REASONABLE_PRICE, MAX_REASONABLE_PRICE).unwrap();
        assert_eq!(bins.len(), 2);

        // Range [1000, 2100] split at 1550: the two low positions land in
        // bin 0, the high one in bin 1.
        assert_eq!(bins[0].count_nfts, 2);
        assert_eq!(bins[1].count_nfts, 1);
        assert!((bins[0].amount_weth - 3.0).abs() < 1e-9);
        assert!((bins[1].amount_weth - 3.0).abs() < 1e-9);
    }
}
