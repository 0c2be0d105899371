//! Common types module for the airgap transaction pipeline.
//!
//! This module defines the data types shared by the offline signer and the
//! online broadcaster: the static chain registry, the unsigned transaction
//! model with its fee forms, the transport payload, and the broadcast result
//! records. Keeping them in one crate guarantees both sides of the airgap
//! agree on the exact shape of what crosses it.

/// Static registry of supported chains.
pub mod chains;
/// Broadcast and fee estimation result types.
pub mod delivery;
/// Network configuration types for the online broadcaster.
pub mod networks;
/// Signed transaction payload carried across the airgap.
pub mod payload;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secure string handling for keys and passwords.
pub mod secret_string;
/// Unsigned transaction model and its wire representation.
pub mod transaction;
/// Utility functions for common type conversions.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use alloy_primitives::{Address, Bytes, Signature, B256, U256};
pub use chains::{
	chain_name, explorer_tx_url, get_chain, is_supported_chain, native_symbol, supported_chains,
	ChainDescriptor,
};
pub use delivery::{BroadcastResult, BroadcastStatus, FeeEstimate, TransactionHash};
pub use networks::{NetworkConfig, NetworksConfig};
pub use payload::SignedTransactionPayload;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use transaction::{
	DynamicFee, FeeSpec, FeeSpecError, TransactionError, TransactionObject, UnsignedTransaction,
};
pub use utils::{
	addresses_match, format_gwei, format_token_amount, parse_address, parse_gwei,
	parse_native_amount, truncate_hash, with_0x_prefix, without_0x_prefix,
};
pub use validation::*;
