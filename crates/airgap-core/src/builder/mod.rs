//! Transaction builder.
//!
//! Turns the strings a user typed into a validated [`UnsignedTransaction`].
//! Amounts are entered in the chain's native unit and fees in Gwei; both are
//! converted to wei here. Building is pure: no network access, no clock.

use crate::AirgapError;
use airgap_config::FeesConfig;
use airgap_delivery::DeliveryService;
use airgap_types::{
	get_chain, parse_address, parse_gwei, parse_native_amount, utils::parse_hex_bytes, Address,
	Bytes, FeeSpec, UnsignedTransaction, U256,
};
use serde::Deserialize;

/// Raw user input for a transaction, as entered in a form.
///
/// Optional fields treat an empty or whitespace-only string the same as
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
	/// Recipient address.
	pub to: String,
	/// Amount in the native unit, e.g. "0.1". Empty means zero.
	#[serde(default)]
	pub amount: String,
	pub gas_limit: Option<String>,
	/// Legacy gas price in Gwei.
	pub gas_price: Option<String>,
	/// EIP-1559 fee cap in Gwei.
	pub max_fee_per_gas: Option<String>,
	/// EIP-1559 tip in Gwei.
	pub max_priority_fee_per_gas: Option<String>,
	/// Calldata as `0x` hex.
	pub data: Option<String>,
	pub nonce: Option<String>,
}

/// Which side of the airgap is building the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerRole {
	/// The offline device has no network, so the nonce must be entered.
	Offline,
	/// The online device may read the nonce from the network.
	Online,
}

/// Values used when the user leaves a field empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderDefaults {
	pub gas_limit: u64,
	/// Legacy gas price in wei.
	pub gas_price: u128,
}

impl Default for BuilderDefaults {
	fn default() -> Self {
		FeesConfig::default().into()
	}
}

impl From<FeesConfig> for BuilderDefaults {
	fn from(fees: FeesConfig) -> Self {
		Self {
			gas_limit: fees.default_gas_limit,
			gas_price: fees.default_gas_price,
		}
	}
}

fn non_empty(field: &Option<String>) -> Option<&str> {
	field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Builds unsigned transactions from user input.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
	defaults: BuilderDefaults,
}

impl TransactionBuilder {
	pub fn new(defaults: BuilderDefaults) -> Self {
		Self { defaults }
	}

	/// Validates `input` and assembles an unsigned transaction.
	///
	/// A missing nonce is always [`AirgapError::MissingNonce`] here; online
	/// callers without one use [`TransactionBuilder::build_with_network_nonce`].
	pub fn build(
		&self,
		input: &TransactionInput,
		chain_id: u64,
		from: Address,
		role: SignerRole,
	) -> Result<UnsignedTransaction, AirgapError> {
		let (tx, nonce) = self.assemble(input, chain_id, from)?;
		match (nonce, role) {
			(Some(nonce), _) => Ok(UnsignedTransaction { nonce, ..tx }),
			(None, SignerRole::Offline) => Err(AirgapError::MissingNonce(
				"offline signing requires an explicit nonce".to_string(),
			)),
			(None, SignerRole::Online) => Err(AirgapError::MissingNonce(
				"no nonce supplied; read it from the network first".to_string(),
			)),
		}
	}

	/// Builds for the online role, reading the nonce from the network when
	/// the input has none.
	///
	/// Every field is validated before the network is contacted.
	pub async fn build_with_network_nonce(
		&self,
		input: &TransactionInput,
		chain_id: u64,
		from: Address,
		delivery: &DeliveryService,
	) -> Result<UnsignedTransaction, AirgapError> {
		let (tx, nonce) = self.assemble(input, chain_id, from)?;
		let nonce = match nonce {
			Some(nonce) => nonce,
			None => delivery.get_nonce(chain_id, &from).await.map_err(|e| {
				AirgapError::MissingNonce(format!("Failed to read nonce from network: {}", e))
			})?,
		};
		tracing::debug!(chain_id, nonce, "Resolved nonce");
		Ok(UnsignedTransaction { nonce, ..tx })
	}

	/// Validates every field; the returned transaction carries nonce 0 until
	/// the caller applies the parsed nonce.
	fn assemble(
		&self,
		input: &TransactionInput,
		chain_id: u64,
		from: Address,
	) -> Result<(UnsignedTransaction, Option<u64>), AirgapError> {
		let chain = get_chain(chain_id).ok_or(AirgapError::UnsupportedChain(chain_id))?;

		let to = parse_address(&input.to).map_err(AirgapError::InvalidAddress)?;

		let value = match input.amount.trim() {
			"" => U256::ZERO,
			amount => parse_native_amount(amount, chain.native_decimals)
				.map_err(AirgapError::InvalidAmount)?,
		};

		let gas_limit = match non_empty(&input.gas_limit) {
			Some(raw) => match raw.parse::<u64>() {
				Ok(limit) if limit > 0 => limit,
				_ => {
					return Err(AirgapError::InvalidAmount(format!(
						"gas limit '{}' must be a positive integer",
						raw
					)))
				},
			},
			None => self.defaults.gas_limit,
		};

		let fee = self.fee_spec(input)?;

		let data = match non_empty(&input.data) {
			Some(raw) => parse_hex_bytes(raw).map_err(AirgapError::InvalidData)?,
			None => Bytes::new(),
		};

		let nonce = non_empty(&input.nonce)
			.map(|raw| {
				raw.parse::<u64>().map_err(|_| {
					AirgapError::InvalidAmount(format!("nonce '{}' must be a non-negative integer", raw))
				})
			})
			.transpose()?;

		let tx = UnsignedTransaction {
			from,
			to,
			value,
			gas_limit,
			data,
			nonce: 0,
			chain_id,
			fee,
		};
		Ok((tx, nonce))
	}

	fn fee_spec(&self, input: &TransactionInput) -> Result<FeeSpec, AirgapError> {
		let gwei = |raw: &str, field: &str| {
			parse_gwei(raw).map_err(|e| AirgapError::InvalidFeeSpec(format!("{}: {}", field, e)))
		};
		let gas_price = non_empty(&input.gas_price);

		match (
			non_empty(&input.max_fee_per_gas),
			non_empty(&input.max_priority_fee_per_gas),
		) {
			(Some(_), Some(_)) if gas_price.is_some() => Err(AirgapError::InvalidFeeSpec(
				"gas price cannot be combined with maxFeePerGas/maxPriorityFeePerGas".to_string(),
			)),
			(Some(max), Some(priority)) => Ok(FeeSpec::dynamic(
				gwei(max, "maxFeePerGas")?,
				gwei(priority, "maxPriorityFeePerGas")?,
			)?),
			(max, priority) => {
				if max.is_some() || priority.is_some() {
					tracing::warn!("Incomplete EIP-1559 fee pair, using legacy gas price");
				}
				let gas_price = match gas_price {
					Some(raw) => gwei(raw, "gasPrice")?,
					None => self.defaults.gas_price,
				};
				Ok(FeeSpec::legacy(gas_price))
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{FakeDelivery, SENDER};
	use std::sync::Arc;

	const RECIPIENT: &str = "0x3535353535353535353535353535353535353535";

	fn input() -> TransactionInput {
		TransactionInput {
			to: RECIPIENT.to_string(),
			amount: "0.1".to_string(),
			nonce: Some("9".to_string()),
			..Default::default()
		}
	}

	fn build(input: &TransactionInput) -> Result<UnsignedTransaction, AirgapError> {
		TransactionBuilder::default().build(input, 11155111, SENDER, SignerRole::Offline)
	}

	#[test]
	fn test_defaults_applied() {
		let tx = build(&input()).unwrap();
		assert_eq!(tx.value, U256::from(100_000_000_000_000_000u128));
		assert_eq!(tx.gas_limit, 21_000);
		assert_eq!(tx.fee, FeeSpec::legacy(10_000_000_000));
		assert!(tx.data.is_empty());
		assert_eq!(tx.nonce, 9);
		assert_eq!(tx.from, SENDER);
	}

	#[test]
	fn test_empty_amount_is_zero() {
		let tx = build(&TransactionInput {
			amount: String::new(),
			..input()
		})
		.unwrap();
		assert_eq!(tx.value, U256::ZERO);
	}

	#[test]
	fn test_invalid_amounts() {
		for amount in ["-1", "abc", "0.0000000000000000001", "1.2.3"] {
			let result = build(&TransactionInput {
				amount: amount.to_string(),
				..input()
			});
			assert!(
				matches!(result, Err(AirgapError::InvalidAmount(_))),
				"amount {:?} should be rejected",
				amount
			);
		}
	}

	#[test]
	fn test_invalid_recipient() {
		for to in ["", "0x1234", "3535353535353535353535353535353535353535", "0xZZ35353535353535353535353535353535353535"] {
			let result = build(&TransactionInput {
				to: to.to_string(),
				..input()
			});
			assert!(matches!(result, Err(AirgapError::InvalidAddress(_))));
		}
	}

	#[test]
	fn test_zero_gas_limit_rejected() {
		let result = build(&TransactionInput {
			gas_limit: Some("0".to_string()),
			..input()
		});
		assert!(matches!(result, Err(AirgapError::InvalidAmount(_))));
	}

	#[test]
	fn test_dynamic_fee_from_gwei() {
		let tx = build(&TransactionInput {
			max_fee_per_gas: Some("30".to_string()),
			max_priority_fee_per_gas: Some("1.5".to_string()),
			..input()
		})
		.unwrap();
		assert_eq!(
			tx.fee,
			FeeSpec::dynamic(30_000_000_000, 1_500_000_000).unwrap()
		);
	}

	#[test]
	fn test_priority_above_max_rejected() {
		let result = build(&TransactionInput {
			max_fee_per_gas: Some("1".to_string()),
			max_priority_fee_per_gas: Some("2".to_string()),
			..input()
		});
		assert!(matches!(result, Err(AirgapError::InvalidFeeSpec(_))));
	}

	#[test]
	fn test_both_fee_forms_rejected() {
		let result = build(&TransactionInput {
			gas_price: Some("20".to_string()),
			max_fee_per_gas: Some("30".to_string()),
			max_priority_fee_per_gas: Some("1".to_string()),
			..input()
		});
		assert!(matches!(result, Err(AirgapError::InvalidFeeSpec(_))));
	}

	#[test]
	fn test_half_dynamic_pair_falls_back_to_legacy() {
		let tx = build(&TransactionInput {
			gas_price: Some("20".to_string()),
			max_fee_per_gas: Some("30".to_string()),
			..input()
		})
		.unwrap();
		assert_eq!(tx.fee, FeeSpec::legacy(20_000_000_000));
	}

	#[test]
	fn test_data_parsing() {
		let tx = build(&TransactionInput {
			data: Some("0xdeadbeef".to_string()),
			..input()
		})
		.unwrap();
		assert_eq!(&tx.data[..], &[0xde, 0xad, 0xbe, 0xef]);

		let result = build(&TransactionInput {
			data: Some("0xabc".to_string()),
			..input()
		});
		assert!(matches!(result, Err(AirgapError::InvalidData(_))));
	}

	#[test]
	fn test_offline_requires_nonce() {
		let result = build(&TransactionInput {
			nonce: Some("  ".to_string()),
			..input()
		});
		assert!(matches!(result, Err(AirgapError::MissingNonce(_))));
	}

	#[test]
	fn test_unsupported_chain() {
		let result =
			TransactionBuilder::default().build(&input(), 999_999, SENDER, SignerRole::Offline);
		assert!(matches!(result, Err(AirgapError::UnsupportedChain(999_999))));
	}

	#[test]
	fn test_configured_defaults() {
		let builder = TransactionBuilder::new(BuilderDefaults {
			gas_limit: 50_000,
			gas_price: 1,
		});
		let tx = builder
			.build(&input(), 1, SENDER, SignerRole::Online)
			.unwrap();
		assert_eq!(tx.gas_limit, 50_000);
		assert_eq!(tx.fee, FeeSpec::legacy(1));
	}

	#[tokio::test]
	async fn test_online_reads_nonce_from_network() {
		let fake = Arc::new(FakeDelivery::default());
		let delivery = DeliveryService::from_implementation(fake.clone(), [11155111]);
		let tx = TransactionBuilder::default()
			.build_with_network_nonce(
				&TransactionInput {
					nonce: None,
					..input()
				},
				11155111,
				SENDER,
				&delivery,
			)
			.await
			.unwrap();
		assert_eq!(tx.nonce, FakeDelivery::NONCE);
	}

	#[tokio::test]
	async fn test_online_validates_before_network() {
		let fake = Arc::new(FakeDelivery::default());
		let delivery = DeliveryService::from_implementation(fake.clone(), [11155111]);
		let result = TransactionBuilder::default()
			.build_with_network_nonce(
				&TransactionInput {
					to: "bad".to_string(),
					nonce: None,
					..input()
				},
				11155111,
				SENDER,
				&delivery,
			)
			.await;
		assert!(matches!(result, Err(AirgapError::InvalidAddress(_))));
		assert_eq!(fake.calls(), 0);
	}
}
