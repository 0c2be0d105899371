//! String formatting utilities.
//!
//! Hex prefix management, base-unit amount rendering, and hash truncation for
//! the confirmation screens on both sides of the airgap.

/// Shortens a transaction hash for display.
///
/// Keeps the first 10 characters (the `0x` prefix plus 8 hex digits) and the
/// last 8, joined by an ellipsis. Short inputs are returned unchanged.
pub fn truncate_hash(hash: &str) -> String {
	if hash.len() <= 18 || !hash.is_ascii() {
		return hash.to_string();
	}
	format!("{}...{}", &hash[..10], &hash[hash.len() - 8..])
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.starts_with("0x") || hex_str.starts_with("0X") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Formats a base-unit amount with decimal places for display.
///
/// # Arguments
///
/// * `amount` - The raw amount in base units as a decimal string
/// * `decimals` - The number of decimal places of the unit being displayed
///
/// # Returns
///
/// A formatted string such as "0.1" or "21", with trailing zeros removed.
pub fn format_token_amount(amount: &str, decimals: u8) -> String {
	if decimals == 0 {
		return amount.to_string();
	}

	let places = decimals as usize;
	let (integer_part, fraction_part) = if amount.len() <= places {
		("0".to_string(), format!("{:0>width$}", amount, width = places))
	} else {
		let split = amount.len() - places;
		(amount[..split].to_string(), amount[split..].to_string())
	};

	let fraction = fraction_part.trim_end_matches('0');
	if fraction.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, fraction)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_hash() {
		let hash = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
		assert_eq!(truncate_hash(hash), "0x88df0164...a713944b");
		assert_eq!(truncate_hash("0x1234"), "0x1234");
	}

	#[test]
	fn test_prefix_helpers() {
		assert_eq!(with_0x_prefix("deadbeef"), "0xdeadbeef");
		assert_eq!(with_0x_prefix("0xdeadbeef"), "0xdeadbeef");
		assert_eq!(without_0x_prefix("0Xdeadbeef"), "deadbeef");
		assert_eq!(without_0x_prefix("deadbeef"), "deadbeef");
	}

	#[test]
	fn test_format_native_amounts() {
		assert_eq!(format_token_amount("100000000000000000", 18), "0.1");
		assert_eq!(format_token_amount("1000000000000000000", 18), "1");
		assert_eq!(format_token_amount("0", 18), "0");
	}

	#[test]
	fn test_format_gwei_amounts() {
		assert_eq!(format_token_amount("1500000000", 9), "1.5");
		assert_eq!(format_token_amount("10000000000", 9), "10");
		assert_eq!(format_token_amount("1", 9), "0.000000001");
	}
}
