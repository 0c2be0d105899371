//! Utility functions for common type conversions and transformations.
//!
//! This module provides helpers for validating user-entered addresses and
//! amounts, converting between display units and base units, and formatting
//! hashes for display.

pub mod conversion;
pub mod formatting;
pub mod units;

pub use conversion::{addresses_match, parse_address, parse_hex_bytes, parse_quantity};
pub use formatting::{format_token_amount, truncate_hash, with_0x_prefix, without_0x_prefix};
pub use units::{format_gwei, parse_gwei, parse_native_amount, GWEI_DECIMALS};
