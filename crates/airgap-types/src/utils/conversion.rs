//! Conversion utilities for wire and user-entered values.
//!
//! Addresses, hex byte strings, and numeric quantities arrive as strings from
//! forms and from the transport payload. These helpers turn them into typed
//! values and report what was wrong when they cannot.

use super::formatting::without_0x_prefix;
use alloy_primitives::{hex, Address, Bytes, U256};
use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_PATTERN: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address pattern is valid"));

/// Parses a `0x`-prefixed, 40 hex digit address.
///
/// Mixed case is accepted without checksum enforcement.
///
/// # Errors
///
/// Returns a description of the problem if the string is not a well-formed address.
pub fn parse_address(value: &str) -> Result<Address, String> {
	let trimmed = value.trim();
	if !ADDRESS_PATTERN.is_match(trimmed) {
		return Err(format!(
			"'{}' is not a 0x-prefixed 20-byte hex address",
			trimmed
		));
	}
	trimmed
		.parse::<Address>()
		.map_err(|e| format!("'{}' is not a valid address: {}", trimmed, e))
}

/// Compares two address strings case-insensitively.
pub fn addresses_match(a: &str, b: &str) -> bool {
	a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Parses a hex byte string. An empty string or bare `0x` yields empty bytes.
pub fn parse_hex_bytes(value: &str) -> Result<Bytes, String> {
	let digits = without_0x_prefix(value.trim());
	hex::decode(digits)
		.map(Bytes::from)
		.map_err(|e| format!("'{}' is not valid hex data: {}", value, e))
}

/// Parses a numeric quantity written as decimal or `0x` hex.
pub fn parse_quantity(value: &str) -> Result<U256, String> {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		return Err("empty quantity".to_string());
	}
	let parsed = match trimmed
		.strip_prefix("0x")
		.or_else(|| trimmed.strip_prefix("0X"))
	{
		Some(hex_digits) if !hex_digits.is_empty() => U256::from_str_radix(hex_digits, 16),
		Some(_) => return Err(format!("'{}' has no hex digits", trimmed)),
		None => U256::from_str_radix(trimmed, 10),
	};
	parsed.map_err(|e| format!("'{}' is not a valid quantity: {}", trimmed, e))
}
