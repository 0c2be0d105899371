//! Wiring of the offline signer and the online broadcaster.
//!
//! Both sides are composed from configuration and factory maps, so the
//! binary decides which account and delivery implementations exist while
//! the config decides which one is used.

pub mod broadcaster;
pub mod signer;

use crate::builder::{BuilderDefaults, TransactionBuilder};
use crate::fees::FeePolicyResolver;
use crate::AirgapError;
use airgap_account::{AccountError, AccountInterface, AccountService};
use airgap_config::Config;
use airgap_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use airgap_types::NetworksConfig;
use broadcaster::Broadcaster;
use signer::OfflineSigner;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory functions for every implementation the binary knows about.
pub struct AirgapFactories<AF, DF> {
	pub account_factories: HashMap<String, AF>,
	pub delivery_factories: HashMap<String, DF>,
}

/// Builds the pipeline components from configuration.
pub struct EngineBuilder {
	config: Config,
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn builder_defaults(&self) -> BuilderDefaults {
		self.config.fees.into()
	}

	/// Creates the offline signer from the `[signer]` section.
	pub async fn build_signer<AF, DF>(
		&self,
		factories: &AirgapFactories<AF, DF>,
	) -> Result<OfflineSigner, AirgapError>
	where
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
	{
		let signer_config = self.config.signer.as_ref().ok_or_else(|| {
			AirgapError::Config("No [signer] section configured".to_string())
		})?;

		let mut account_impls = HashMap::new();
		for (name, config) in &signer_config.implementations {
			let Some(factory) = factories.account_factories.get(name) else {
				tracing::warn!(component = "account", implementation = %name, "Unknown implementation, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					// Validate the configuration using the implementation's schema
					if let Err(e) = implementation.config_schema().validate(config) {
						tracing::error!(
							component = "account",
							implementation = %name,
							error = %e,
							"Invalid configuration for account implementation"
						);
						return Err(AirgapError::Config(format!(
							"Invalid configuration for account implementation '{}': {}",
							name, e
						)));
					}
					let is_primary = &signer_config.primary == name;
					tracing::info!(component = "account", implementation = %name, enabled = %is_primary, "Loaded");
					account_impls.insert(name.clone(), implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "account",
						implementation = %name,
						error = %e,
						"Failed to create account implementation"
					);
					return Err(AirgapError::Config(format!(
						"Failed to create account implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let primary = signer_config.primary.as_str();
		let account = account_impls.remove(primary).ok_or_else(|| {
			AirgapError::Config(format!(
				"Primary account '{}' failed to load or has invalid configuration",
				primary
			))
		})?;
		let account = Arc::new(AccountService::new(account));

		let address = account.get_address().await.map_err(|e| {
			tracing::error!(component = "account", error = %e, "Failed to get signer address");
			AirgapError::Config(format!("Failed to get signer address: {}", e))
		})?;
		tracing::info!(component = "account", address = %address, "Signer ready");

		Ok(OfflineSigner::new(
			account,
			TransactionBuilder::new(self.builder_defaults()),
			self.config.broadcaster.url.clone(),
		))
	}

	/// Creates the delivery service from the `[delivery]` section.
	///
	/// The primary implementation serves every chain listed in its
	/// `network_ids`.
	pub fn build_delivery<AF, DF>(
		&self,
		factories: &AirgapFactories<AF, DF>,
	) -> Result<Arc<DeliveryService>, AirgapError>
	where
		DF: Fn(&toml::Value, &NetworksConfig) -> Result<Box<dyn DeliveryInterface>, DeliveryError>,
	{
		let delivery_config = self.config.delivery.as_ref().ok_or_else(|| {
			AirgapError::Config("No [delivery] section configured".to_string())
		})?;

		let name = delivery_config.primary.as_str();
		let config = delivery_config.implementations.get(name).ok_or_else(|| {
			AirgapError::Config(format!("Primary delivery '{}' is not configured", name))
		})?;
		let factory = factories.delivery_factories.get(name).ok_or_else(|| {
			AirgapError::Config(format!("Unknown delivery implementation '{}'", name))
		})?;

		let implementation: Arc<dyn DeliveryInterface> = match factory(config, &self.config.networks) {
			Ok(implementation) => Arc::from(implementation),
			Err(e) => {
				tracing::error!(
					component = "delivery",
					implementation = %name,
					error = %e,
					"Failed to create delivery implementation"
				);
				return Err(AirgapError::Config(format!(
					"Failed to create delivery implementation '{}': {}",
					name, e
				)));
			},
		};
		implementation.config_schema().validate(config).map_err(|e| {
			tracing::error!(
				component = "delivery",
				implementation = %name,
				error = %e,
				"Invalid configuration for delivery implementation"
			);
			AirgapError::Config(format!(
				"Invalid configuration for delivery implementation '{}': {}",
				name, e
			))
		})?;

		let network_ids = network_ids(config).ok_or_else(|| {
			AirgapError::Config(format!(
				"Delivery implementation '{}' missing network_ids configuration",
				name
			))
		})?;
		for network_id in &network_ids {
			tracing::info!(component = "delivery", implementation = %name, network_id = %network_id, "Loaded");
		}

		Ok(Arc::new(DeliveryService::from_implementation(
			implementation,
			network_ids,
		)))
	}

	pub fn build_broadcaster<AF, DF>(
		&self,
		factories: &AirgapFactories<AF, DF>,
	) -> Result<Broadcaster, AirgapError>
	where
		DF: Fn(&toml::Value, &NetworksConfig) -> Result<Box<dyn DeliveryInterface>, DeliveryError>,
	{
		Ok(Broadcaster::new(self.build_delivery(factories)?))
	}

	pub fn build_fee_resolver(&self, delivery: Arc<DeliveryService>) -> FeePolicyResolver {
		FeePolicyResolver::new(delivery, self.config.fees.default_priority_fee)
	}
}

fn network_ids(config: &toml::Value) -> Option<Vec<u64>> {
	config
		.get("network_ids")?
		.as_array()?
		.iter()
		.map(|value| value.as_integer().and_then(|id| u64::try_from(id).ok()))
		.collect()
}
