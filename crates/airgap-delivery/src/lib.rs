//! Broadcast gateway for the online side of the airgap.
//!
//! This module wraps the chain RPC client the broadcaster needs: reading the
//! sender's nonce, reading gas price and base fee for fee suggestions, and
//! submitting an already signed raw transaction. Nothing here signs; the
//! offline device has done that before the bytes arrive.

use airgap_types::{
	with_0x_prefix, without_0x_prefix, Address, Bytes, ConfigSchema, ImplementationRegistry,
	NetworksConfig, TransactionHash,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when the node rejects a raw transaction.
	#[error("Broadcast failed: {0}")]
	BroadcastFailed(String),
	/// Error that occurs when no provider is configured for a chain.
	#[error("No provider available for chain {0}")]
	NoProviderAvailable(u64),
}

/// Trait defining the interface for chain clients used by the broadcaster.
///
/// One implementation may serve several chains; every call names the chain
/// it targets.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Returns the configuration schema for this delivery implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Gets the next nonce for an address, from the latest block.
	async fn get_nonce(&self, address: &Address, chain_id: u64) -> Result<u64, DeliveryError>;

	/// Gets the network's current gas price in wei.
	async fn get_gas_price(&self, chain_id: u64) -> Result<u128, DeliveryError>;

	/// Gets the latest block's base fee in wei, if the chain exposes one.
	async fn get_base_fee(&self, chain_id: u64) -> Result<Option<u128>, DeliveryError>;

	/// Submits signed transaction bytes and returns the hash reported by the node.
	async fn send_raw_transaction(
		&self,
		signed: &[u8],
		chain_id: u64,
	) -> Result<TransactionHash, DeliveryError>;

	/// Submits a hex-encoded signed transaction, with or without `0x`.
	async fn broadcast_transaction(
		&self,
		serialized: &str,
		chain_id: u64,
	) -> Result<TransactionHash, DeliveryError> {
		let bytes = hex::decode(without_0x_prefix(serialized)).map_err(|e| {
			DeliveryError::BroadcastFailed(format!(
				"Invalid serialized transaction {}: {}",
				with_0x_prefix(serialized),
				e
			))
		})?;
		self.send_raw_transaction(&bytes, chain_id).await
	}
}

/// Type alias for delivery factory functions.
pub type DeliveryFactory =
	fn(&toml::Value, &NetworksConfig) -> Result<Box<dyn DeliveryInterface>, DeliveryError>;

/// Registry trait for delivery implementations.
pub trait DeliveryRegistry: ImplementationRegistry<Factory = DeliveryFactory> {}

/// Get all registered delivery implementations.
pub fn get_all_implementations() -> Vec<(&'static str, DeliveryFactory)> {
	use implementations::evm::alloy;

	vec![(alloy::Registry::NAME, alloy::Registry::factory())]
}

/// Service that routes delivery calls to the provider for each chain.
pub struct DeliveryService {
	/// Map of chain IDs to their corresponding delivery providers.
	providers: HashMap<u64, Arc<dyn DeliveryInterface>>,
}

impl DeliveryService {
	/// Creates a new DeliveryService with the specified providers.
	pub fn new(providers: HashMap<u64, Arc<dyn DeliveryInterface>>) -> Self {
		Self { providers }
	}

	/// Registers one implementation for every chain it was configured with.
	pub fn from_implementation(
		implementation: Arc<dyn DeliveryInterface>,
		chain_ids: impl IntoIterator<Item = u64>,
	) -> Self {
		let providers = chain_ids
			.into_iter()
			.map(|chain_id| (chain_id, implementation.clone()))
			.collect();
		Self { providers }
	}

	/// Returns true if a provider is configured for the chain.
	pub fn supports(&self, chain_id: u64) -> bool {
		self.providers.contains_key(&chain_id)
	}

	/// Chain ids with a configured provider, ascending.
	pub fn chain_ids(&self) -> Vec<u64> {
		let mut ids: Vec<u64> = self.providers.keys().copied().collect();
		ids.sort_unstable();
		ids
	}

	fn provider(&self, chain_id: u64) -> Result<&Arc<dyn DeliveryInterface>, DeliveryError> {
		self.providers
			.get(&chain_id)
			.ok_or(DeliveryError::NoProviderAvailable(chain_id))
	}

	/// Submits signed transaction bytes to the chain's provider.
	///
	/// Transport errors are surfaced as [`DeliveryError::BroadcastFailed`]
	/// with the original message. There are no retries.
	pub async fn submit(
		&self,
		chain_id: u64,
		signed: &Bytes,
	) -> Result<TransactionHash, DeliveryError> {
		let provider = self.provider(chain_id)?;
		match provider.send_raw_transaction(signed, chain_id).await {
			Ok(hash) => Ok(hash),
			Err(DeliveryError::Network(message)) => Err(DeliveryError::BroadcastFailed(message)),
			Err(e) => Err(e),
		}
	}

	/// Gets the nonce for an address on a specific chain.
	pub async fn get_nonce(&self, chain_id: u64, address: &Address) -> Result<u64, DeliveryError> {
		self.provider(chain_id)?.get_nonce(address, chain_id).await
	}

	/// Gets the gas price on a specific chain.
	pub async fn get_gas_price(&self, chain_id: u64) -> Result<u128, DeliveryError> {
		self.provider(chain_id)?.get_gas_price(chain_id).await
	}

	/// Gets the latest base fee on a specific chain.
	pub async fn get_base_fee(&self, chain_id: u64) -> Result<Option<u128>, DeliveryError> {
		self.provider(chain_id)?.get_base_fee(chain_id).await
	}
}
