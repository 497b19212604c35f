//! Tracked token pair constants.

/// WETH contract address on Ethereum mainnet.
pub const WETH_ADDRESS: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";

/// USDT contract address on Ethereum mainnet.
pub const USDT_ADDRESS: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";

pub const WETH_DECIMALS: i32 = 18;
pub const USDT_DECIMALS: i32 = 6;

/// Normalize an address to lowercase for comparison.
pub fn normalize_address(address: &str) -> String {
    address.to_ascii_lowercase()
}
