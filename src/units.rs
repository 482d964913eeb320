// Convert between human amounts/prices and veil's integer wire units.
// veil quotes prices in ticks (0..=num_ticks) and share amounts in
// "veil shares", i.e. wei-denominated amounts divided by num_ticks.

use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Result, VeilError};

/// Tick count used by binary (yes/no) markets, which report no `num_ticks`.
pub const BINARY_NUM_TICKS: u64 = 10_000;

pub const ETHER_DECIMALS: u32 = 18;

fn ten_18() -> Decimal {
    Decimal::from(1_000_000_000_000_000_000u64)
}

fn ticks(num_ticks: Option<u64>) -> Result<Decimal> {
    match num_ticks.unwrap_or(BINARY_NUM_TICKS) {
        0 => Err(VeilError::InvalidNumber("market has num_ticks = 0".to_string())),
        n => Ok(Decimal::from(n)),
    }
}

fn overflow(value: impl std::fmt::Display) -> VeilError {
    VeilError::InvalidNumber(format!("{} overflows", value))
}

fn round_to_integer(value: Decimal) -> Result<u128> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_u128()
        .ok_or_else(|| VeilError::InvalidNumber(format!("{} is not a non-negative integer", value)))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s.trim()).map_err(|e| VeilError::InvalidNumber(format!("{}: {}", s, e)))
}

/// Price in ETH (between 0 and 1) of a veil tick price.
pub fn veil_price_to_eth(veil_price: u128, num_ticks: Option<u64>) -> Result<Decimal> {
    let price = Decimal::from_u128(veil_price)
        .ok_or_else(|| VeilError::InvalidNumber(veil_price.to_string()))?;
    price.checked_div(ticks(num_ticks)?).ok_or_else(|| overflow(veil_price))
}

/// Tick price for a price in ETH, rounded half-to-even.
pub fn eth_to_veil_price(eth_price: Decimal, num_ticks: Option<u64>) -> Result<u128> {
    let scaled = eth_price
        .checked_mul(ticks(num_ticks)?)
        .ok_or_else(|| overflow(eth_price))?;
    round_to_integer(scaled)
}

/// Number of shares (1 = one full share) represented by `veil_shares`.
pub fn veil_shares_to_amount(veil_shares: u128, num_ticks: Option<u64>) -> Result<Decimal> {
    let shares = Decimal::from_u128(veil_shares)
        .ok_or_else(|| VeilError::InvalidNumber(veil_shares.to_string()))?;
    (shares / ten_18())
        .checked_mul(ticks(num_ticks)?)
        .ok_or_else(|| overflow(veil_shares))
}

/// veil shares for a number of shares. For binary markets one share is
/// 1e14 veil shares.
pub fn amount_to_veil_shares(amount: Decimal, num_ticks: Option<u64>) -> Result<u128> {
    let num_ticks = ticks(num_ticks)?;
    let scaled = amount.checked_mul(ten_18()).ok_or_else(|| overflow(amount))?;
    round_to_integer(scaled.checked_div(num_ticks).ok_or_else(|| overflow(amount))?)
}

/// Whole-unit value of a base-unit (e.g. wei) amount.
pub fn from_base_unit_amount(amount: u128, decimals: u32) -> Result<Decimal> {
    let signed = i128::try_from(amount).map_err(|_| VeilError::InvalidNumber(amount.to_string()))?;
    Decimal::try_from_i128_with_scale(signed, decimals)
        .map_err(|e| VeilError::InvalidNumber(format!("{}: {}", amount, e)))
}

/// Base-unit (e.g. wei) amount of a whole-unit value.
pub fn to_base_unit_amount(amount: Decimal, decimals: u32) -> Result<u128> {
    let factor = Decimal::try_from_i128_with_scale(10i128.pow(decimals), 0)
        .map_err(|e| VeilError::InvalidNumber(format!("10^{}: {}", decimals, e)))?;
    let scaled = amount.checked_mul(factor).ok_or_else(|| overflow(amount))?;
    round_to_integer(scaled)
}
