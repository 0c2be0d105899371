//! Alloy-backed chain client for the broadcaster.
//!
//! One HTTP provider per configured network. The providers never hold a
//! wallet: transactions arrive already signed from the offline device.

use crate::{DeliveryError, DeliveryInterface};
use airgap_types::{
	ConfigSchema, Field, FieldType, NetworksConfig, Schema, TransactionHash, ValidationError,
};
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::Address;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;
use std::collections::HashMap;

/// Alloy-based EVM delivery implementation.
pub struct AlloyDelivery {
	/// Alloy providers for each supported network.
	providers: HashMap<u64, DynProvider>,
}

impl AlloyDelivery {
	/// Creates HTTP providers for the given networks.
	///
	/// Every id must have an entry in `networks` with a parseable RPC URL.
	pub fn new(network_ids: &[u64], networks: &NetworksConfig) -> Result<Self, DeliveryError> {
		if network_ids.is_empty() {
			return Err(DeliveryError::Network(
				"At least one network_id must be specified".to_string(),
			));
		}

		let mut providers = HashMap::new();
		for network_id in network_ids {
			let network = networks.get(network_id).ok_or_else(|| {
				DeliveryError::Network(format!("Network {} not found in configuration", network_id))
			})?;

			let url = network.rpc_url.parse().map_err(|e| {
				DeliveryError::Network(format!("Invalid RPC URL for network {}: {}", network_id, e))
			})?;

			let provider = ProviderBuilder::new().connect_http(url).erased();
			tracing::debug!(chain_id = network_id, rpc_url = %network.rpc_url, "Configured provider");
			providers.insert(*network_id, provider);
		}

		Ok(Self { providers })
	}

	/// Gets the provider for a specific chain ID.
	fn get_provider(&self, chain_id: u64) -> Result<&DynProvider, DeliveryError> {
		self.providers
			.get(&chain_id)
			.ok_or(DeliveryError::NoProviderAvailable(chain_id))
	}

	/// Chain ids this instance has providers for.
	pub fn network_ids(&self) -> Vec<u64> {
		let mut ids: Vec<u64> = self.providers.keys().copied().collect();
		ids.sort_unstable();
		ids
	}
}

/// Configuration schema for the Alloy delivery provider.
pub struct AlloyDeliverySchema;

impl AlloyDeliverySchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		AlloyDeliverySchema.validate(config)
	}
}

impl ConfigSchema for AlloyDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new(
				"network_ids",
				FieldType::Array(Box::new(FieldType::Integer {
					min: Some(1),
					max: None,
				})),
			)
			.with_validator(|value| match value.as_array() {
				Some(arr) if arr.is_empty() => Err("network_ids cannot be empty".to_string()),
				Some(_) => Ok(()),
				None => Err("network_ids must be an array".to_string()),
			})],
			vec![],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyDeliverySchema)
	}

	async fn get_nonce(&self, address: &Address, chain_id: u64) -> Result<u64, DeliveryError> {
		self.get_provider(chain_id)?
			.get_transaction_count(*address)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get nonce: {}", e)))
	}

	async fn get_gas_price(&self, chain_id: u64) -> Result<u128, DeliveryError> {
		self.get_provider(chain_id)?
			.get_gas_price()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get gas price: {}", e)))
	}

	async fn get_base_fee(&self, chain_id: u64) -> Result<Option<u128>, DeliveryError> {
		let block = self
			.get_provider(chain_id)?
			.get_block_by_number(BlockNumberOrTag::Latest)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get latest block: {}", e)))?
			.ok_or_else(|| {
				DeliveryError::Network(format!("Latest block not available on chain {}", chain_id))
			})?;

		Ok(block.header.base_fee_per_gas.map(u128::from))
	}

	async fn send_raw_transaction(
		&self,
		signed: &[u8],
		chain_id: u64,
	) -> Result<TransactionHash, DeliveryError> {
		let pending = self
			.get_provider(chain_id)?
			.send_raw_transaction(signed)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to send transaction: {}", e)))?;

		let tx_hash = TransactionHash(*pending.tx_hash());
		tracing::info!(tx_hash = %tx_hash, chain_id = chain_id, "Submitted transaction");

		Ok(tx_hash)
	}
}

/// Factory function to create an HTTP-based delivery provider from configuration.
///
/// # Parameters
/// - `config`: TOML table with `network_ids`, the chains to serve
/// - `networks`: network configuration holding each chain's RPC URL
pub fn create_http_delivery(
	config: &toml::Value,
	networks: &NetworksConfig,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	AlloyDeliverySchema::validate_config(config)
		.map_err(|e| DeliveryError::Network(format!("Invalid configuration: {}", e)))?;

	let network_ids = config
		.get("network_ids")
		.and_then(|v| v.as_array())
		.map(|arr| {
			arr.iter()
				.filter_map(|v| v.as_integer().map(|i| i as u64))
				.collect::<Vec<_>>()
		})
		.ok_or_else(|| DeliveryError::Network("network_ids is required".to_string()))?;

	Ok(Box::new(AlloyDelivery::new(&network_ids, networks)?))
}

/// Registry for the HTTP/Alloy delivery implementation.
pub struct Registry;

impl airgap_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
	type Factory = crate::DeliveryFactory;

	fn factory() -> Self::Factory {
		create_http_delivery
	}
}

impl crate::DeliveryRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use airgap_types::NetworkConfig;

	fn networks() -> NetworksConfig {
		NetworksConfig::from([(
			11155111,
			NetworkConfig {
				rpc_url: "https://rpc.sepolia.org".to_string(),
			},
		)])
	}

	#[test]
	fn test_schema_requires_network_ids() {
		let empty: toml::Value = toml::from_str("network_ids = []").unwrap();
		assert!(AlloyDeliverySchema::validate_config(&empty).is_err());

		let missing: toml::Value = toml::from_str("").unwrap();
		assert!(matches!(
			AlloyDeliverySchema::validate_config(&missing),
			Err(ValidationError::MissingField(_))
		));

		let zero: toml::Value = toml::from_str("network_ids = [0]").unwrap();
		assert!(AlloyDeliverySchema::validate_config(&zero).is_err());
	}

	#[tokio::test]
	async fn test_factory_builds_provider_per_network() {
		let config: toml::Value = toml::from_str("network_ids = [11155111]").unwrap();
		let delivery = AlloyDelivery::new(&[11155111], &networks()).unwrap();
		assert_eq!(delivery.network_ids(), vec![11155111]);
		assert!(create_http_delivery(&config, &networks()).is_ok());
	}

	#[tokio::test]
	async fn test_unconfigured_network_is_rejected() {
		let config: toml::Value = toml::from_str("network_ids = [1]").unwrap();
		match create_http_delivery(&config, &networks()) {
			Err(DeliveryError::Network(msg)) => assert!(msg.contains("not found")),
			other => panic!("expected network error, got {:?}", other.map(|_| ())),
		}
	}

	#[tokio::test]
	async fn test_invalid_rpc_url_is_rejected() {
		let networks = NetworksConfig::from([(
			1,
			NetworkConfig {
				rpc_url: "not a url".to_string(),
			},
		)]);
		assert!(matches!(
			AlloyDelivery::new(&[1], &networks),
			Err(DeliveryError::Network(msg)) if msg.contains("Invalid RPC URL")
		));
	}

	#[tokio::test]
	async fn test_unknown_chain_has_no_provider() {
		let delivery = AlloyDelivery::new(&[11155111], &networks()).unwrap();
		assert!(matches!(
			delivery.get_gas_price(1).await,
			Err(DeliveryError::NoProviderAvailable(1))
		));
	}
}
