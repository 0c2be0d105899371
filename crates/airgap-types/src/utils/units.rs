//! Unit conversion between display amounts and base units.
//!
//! Amounts are entered in the chain's native unit (e.g. "0.1" ETH) and fees in
//! Gwei. Internally everything is carried in the smallest unit; conversion only
//! happens at this boundary.

use super::formatting::format_token_amount;
use alloy_primitives::{utils::parse_units, U256};

/// Decimal places of Gwei relative to wei.
pub const GWEI_DECIMALS: u8 = 9;

/// Parses a non-negative decimal string into base units.
///
/// Unlike a plain unit parser this rejects input with more fractional digits
/// than `decimals` instead of silently truncating it.
///
/// # Arguments
///
/// * `amount` - Decimal string such as "0.1" or "21"
/// * `decimals` - Decimal places of the unit the amount is written in
///
/// # Errors
///
/// Returns a description of the problem for empty, negative, non-numeric,
/// over-precise, or overflowing input.
pub fn parse_native_amount(amount: &str, decimals: u8) -> Result<U256, String> {
	let trimmed = amount.trim();
	if trimmed.is_empty() {
		return Err("amount is empty".to_string());
	}
	if trimmed.starts_with('-') {
		return Err(format!("amount '{}' is negative", trimmed));
	}

	let (integer, fraction) = match trimmed.split_once('.') {
		Some((integer, fraction)) => (integer, Some(fraction)),
		None => (trimmed, None),
	};
	let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
	if !digits_only(integer) || !fraction.map(digits_only).unwrap_or(true) {
		return Err(format!("amount '{}' is not a decimal number", trimmed));
	}
	if integer.is_empty() && fraction.map(str::is_empty).unwrap_or(true) {
		return Err(format!("amount '{}' has no digits", trimmed));
	}
	if let Some(fraction) = fraction {
		if fraction.is_empty() {
			return Err(format!("amount '{}' ends with a decimal point", trimmed));
		}
		if fraction.len() > decimals as usize {
			return Err(format!(
				"amount '{}' has more than {} decimal places",
				trimmed, decimals
			));
		}
	}

	let normalized = if integer.is_empty() {
		format!("0{}", trimmed)
	} else {
		trimmed.to_string()
	};
	parse_units(&normalized, decimals)
		.map(|parsed| parsed.get_absolute())
		.map_err(|e| format!("amount '{}' is out of range: {}", trimmed, e))
}

/// Parses a Gwei amount into wei.
pub fn parse_gwei(amount: &str) -> Result<u128, String> {
	let wei = parse_native_amount(amount, GWEI_DECIMALS)?;
	u128::try_from(wei).map_err(|_| format!("fee '{}' gwei is out of range", amount.trim()))
}

/// Formats a wei amount as Gwei for display.
pub fn format_gwei(wei: u128) -> String {
	format_token_amount(&wei.to_string(), GWEI_DECIMALS)
}
