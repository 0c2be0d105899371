//! Configuration module for the airgap transaction pipeline.
//!
//! One TOML file describes both sides of the airgap. The offline device only
//! needs a `[signer]` section; the online device needs `[delivery]` and
//! `[networks]`. Shared defaults for building transactions live in `[fees]`.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

pub use loader::ConfigLoader;

use airgap_types::{
	is_supported_chain, networks::deserialize_networks, parse_gwei, NetworksConfig,
};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Handoff page of the hosted broadcaster.
pub const DEFAULT_BROADCASTER_URL: &str = "https://fredrikcarlssn.github.io/Airgapped-signer/#/";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Signing account for the offline device.
	pub signer: Option<SignerConfig>,
	/// Where signed payloads are handed off to.
	#[serde(default)]
	pub broadcaster: BroadcasterConfig,
	/// Chain client implementations for the online device.
	pub delivery: Option<DeliveryConfig>,
	/// RPC endpoints keyed by chain id.
	#[serde(default, deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	/// Defaults applied when building transactions.
	#[serde(default)]
	pub fees: FeesConfig,
}

/// Configuration for signing accounts.
#[derive(Debug, Clone, Deserialize)]
pub struct SignerConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for chain client implementations.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of delivery implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the handoff to the broadcaster.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcasterConfig {
	/// Base URL the encoded payload is appended to.
	#[serde(default = "default_broadcaster_url")]
	pub url: String,
}

impl Default for BroadcasterConfig {
	fn default() -> Self {
		Self {
			url: default_broadcaster_url(),
		}
	}
}

fn default_broadcaster_url() -> String {
	DEFAULT_BROADCASTER_URL.to_string()
}

/// Transaction building defaults. Fee values are held in wei.
///
/// In TOML the fees are written as Gwei strings, e.g.
/// `default_gas_price_gwei = "10"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FeesConfig {
	/// Legacy gas price used when the user supplies none.
	#[serde(
		rename = "default_gas_price_gwei",
		default = "default_gas_price",
		deserialize_with = "deserialize_gwei"
	)]
	pub default_gas_price: u128,
	/// Priority fee suggested on top of the base fee.
	#[serde(
		rename = "default_priority_fee_gwei",
		default = "default_priority_fee",
		deserialize_with = "deserialize_gwei"
	)]
	pub default_priority_fee: u128,
	/// Gas limit used when the user supplies none.
	#[serde(default = "default_gas_limit")]
	pub default_gas_limit: u64,
}

impl Default for FeesConfig {
	fn default() -> Self {
		Self {
			default_gas_price: default_gas_price(),
			default_priority_fee: default_priority_fee(),
			default_gas_limit: default_gas_limit(),
		}
	}
}

/// 10 Gwei.
fn default_gas_price() -> u128 {
	10_000_000_000
}

/// 1.5 Gwei.
fn default_priority_fee() -> u128 {
	1_500_000_000
}

/// Gas used by a plain value transfer.
fn default_gas_limit() -> u64 {
	21_000
}

/// Accepts a Gwei amount as a decimal string or a TOML integer.
fn deserialize_gwei<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Gwei {
		Text(String),
		Whole(u64),
	}

	let text = match Gwei::deserialize(deserializer)? {
		Gwei::Text(s) => s,
		Gwei::Whole(n) => n.to_string(),
	};
	parse_gwei(&text).map_err(serde::de::Error::custom)
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)))
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates cross-section consistency after parsing.
	///
	/// - The primary signer and delivery implementations must be configured
	/// - Every network must be a registry chain with a non-empty RPC URL
	/// - The broadcaster URL must be http(s)
	/// - The default gas limit must be positive
	fn validate(&self) -> Result<(), ConfigError> {
		if let Some(signer) = &self.signer {
			validate_primary("signer", &signer.primary, &signer.implementations)?;
		}

		if let Some(delivery) = &self.delivery {
			validate_primary("delivery", &delivery.primary, &delivery.implementations)?;
			if self.networks.is_empty() {
				return Err(ConfigError::Validation(
					"Delivery requires at least one network".into(),
				));
			}
		}

		for (chain_id, network) in &self.networks {
			if !is_supported_chain(*chain_id) {
				return Err(ConfigError::Validation(format!(
					"Network {} is not a supported chain",
					chain_id
				)));
			}
			if network.rpc_url.trim().is_empty() {
				return Err(ConfigError::Validation(format!(
					"Network {} must have an rpc_url",
					chain_id
				)));
			}
		}

		let url = self.broadcaster.url.as_str();
		if !(url.starts_with("https://") || url.starts_with("http://")) {
			return Err(ConfigError::Validation(format!(
				"Broadcaster url must be http(s): {}",
				url
			)));
		}

		if self.fees.default_gas_limit == 0 {
			return Err(ConfigError::Validation(
				"default_gas_limit must be greater than 0".into(),
			));
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses a TOML string, resolving environment variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Config::from_resolved_str(&resolve_env_vars(s)?)
	}
}

impl Config {
	/// Parses text whose environment variables were already substituted.
	///
	/// Substitution runs once per file; values taken from the environment
	/// are never expanded again.
	pub(crate) fn from_resolved_str(resolved: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const OFFLINE_CONFIG: &str = r#"
[signer]
primary = "local"
[signer.implementations.local]
private_key = "${AIRGAP_TEST_KEY:-0x4646464646464646464646464646464646464646464646464646464646464646}"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("AIRGAP_TEST_HOST", "localhost");
		std::env::set_var("AIRGAP_TEST_PORT", "8545");

		let input = "rpc_url = \"http://${AIRGAP_TEST_HOST}:${AIRGAP_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "rpc_url = \"http://localhost:8545\"");

		std::env::remove_var("AIRGAP_TEST_HOST");
		std::env::remove_var("AIRGAP_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${AIRGAP_MISSING_VAR:-default_value}\"";
		assert_eq!(
			resolve_env_vars(input).unwrap(),
			"value = \"default_value\""
		);
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${AIRGAP_UNSET_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("AIRGAP_UNSET_VAR"));
	}

	#[test]
	fn test_offline_config_uses_defaults() {
		let config: Config = OFFLINE_CONFIG.parse().unwrap();
		let signer = config.signer.unwrap();
		assert_eq!(signer.primary, "local");
		assert!(config.delivery.is_none());
		assert_eq!(config.broadcaster.url, DEFAULT_BROADCASTER_URL);
		assert_eq!(config.fees, FeesConfig::default());
		assert_eq!(config.fees.default_priority_fee, 1_500_000_000);
	}

	#[test]
	fn test_online_config() {
		let config: Config = r#"
[delivery]
primary = "evm_alloy"
[delivery.implementations.evm_alloy]
network_ids = [11155111]

[networks.11155111]
rpc_url = "https://rpc.sepolia.org"

[fees]
default_gas_price_gwei = "2.5"
default_priority_fee_gwei = 2
default_gas_limit = 50000
"#
		.parse()
		.unwrap();

		assert!(config.signer.is_none());
		assert_eq!(config.networks.len(), 1);
		assert_eq!(config.fees.default_gas_price, 2_500_000_000);
		assert_eq!(config.fees.default_priority_fee, 2_000_000_000);
		assert_eq!(config.fees.default_gas_limit, 50_000);
	}

	#[test]
	fn test_unsupported_network_rejected() {
		let result: Result<Config, _> = r#"
[networks.999999]
rpc_url = "http://localhost:8545"
"#
		.parse();
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("not a supported chain"));
	}

	#[test]
	fn test_primary_must_exist() {
		let result: Result<Config, _> = r#"
[signer]
primary = "hardware"
[signer.implementations.local]
private_key = "0x01"
"#
		.parse();
		assert!(result.unwrap_err().to_string().contains("Primary signer"));
	}

	#[test]
	fn test_delivery_requires_networks() {
		let result: Result<Config, _> = r#"
[delivery]
primary = "evm_alloy"
[delivery.implementations.evm_alloy]
network_ids = [1]
"#
		.parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_invalid_fee_is_parse_error() {
		let result: Result<Config, _> = "[fees]\ndefault_gas_price_gwei = \"-1\"".parse();
		assert!(matches!(result, Err(ConfigError::Parse(_))));

		let result: Result<Config, _> = "[fees]\ndefault_gas_limit = 0".parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_broadcaster_url_scheme() {
		let result: Result<Config, _> = "[broadcaster]\nurl = \"ftp://example.com\"".parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}
}
