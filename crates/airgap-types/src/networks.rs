//! Network configuration types for the online broadcaster.
//!
//! Only the online side talks to networks; each configured network needs an
//! RPC endpoint. Chain metadata itself lives in the static chain registry.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Configuration for a single network.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// HTTP(S) JSON-RPC endpoint.
	pub rpc_url: String,
}

/// Networks keyed by chain id.
pub type NetworksConfig = HashMap<u64, NetworkConfig>;

/// Deserializes networks whose chain ids are TOML string keys.
///
/// # Errors
///
/// Returns a deserialization error if a key is not a valid u64.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	string_map
		.into_iter()
		.map(|(key, value)| {
			key.parse::<u64>()
				.map(|chain_id| (chain_id, value))
				.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Deserialize)]
	struct Wrapper {
		#[serde(deserialize_with = "deserialize_networks")]
		networks: NetworksConfig,
	}

	#[test]
	fn test_string_keys_become_chain_ids() {
		let parsed: Wrapper = toml::from_str(
			r#"
			[networks.11155111]
			rpc_url = "https://rpc.sepolia.org"
			"#,
		)
		.unwrap();
		assert_eq!(
			parsed.networks[&11155111].rpc_url,
			"https://rpc.sepolia.org"
		);
	}

	#[test]
	fn test_non_numeric_key_is_rejected() {
		let parsed: Result<Wrapper, _> = toml::from_str(
			r#"
			[networks.sepolia]
			rpc_url = "https://rpc.sepolia.org"
			"#,
		);
		assert!(parsed.is_err());
	}
}
