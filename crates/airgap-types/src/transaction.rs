//! Unsigned transaction model.
//!
//! `UnsignedTransaction` is the fully validated, typed form that the codec
//! encodes and the signer signs. `TransactionObject` is its JSON-safe wire
//! form carried inside the transport payload, with every numeric field as a
//! string. Conversion from the wire form re-applies the same invariants the
//! builder enforces, so a payload can never smuggle in a transaction the
//! builder would have refused.

use crate::utils::{parse_address, parse_hex_bytes, parse_quantity};
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a fee specification violates its invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeeSpecError {
	/// The priority fee may never exceed the fee cap.
	#[error("maxPriorityFeePerGas ({priority}) exceeds maxFeePerGas ({max})")]
	PriorityExceedsMax { max: u128, priority: u128 },
	/// Both fee forms, neither, or half of the dynamic pair were supplied.
	#[error("{0}")]
	Ambiguous(String),
}

/// Errors raised converting a wire `TransactionObject` into a typed transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
	/// An address field is malformed.
	#[error("Invalid {field} address: {message}")]
	InvalidAddress { field: &'static str, message: String },
	/// A numeric field is malformed or out of range.
	#[error("Invalid {field}: {message}")]
	InvalidQuantity { field: &'static str, message: String },
	/// The calldata is not valid hex.
	#[error("Invalid data: {0}")]
	InvalidData(String),
	/// The fee fields do not form a valid fee specification.
	#[error("Invalid fee specification: {0}")]
	InvalidFeeSpec(#[from] FeeSpecError),
	/// A field required for signing is absent.
	#[error("Missing required field: {0}")]
	MissingField(&'static str),
}

/// EIP-1559 fee pair, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicFee {
	max_fee_per_gas: u128,
	max_priority_fee_per_gas: u128,
}

impl DynamicFee {
	/// Creates a dynamic fee, rejecting a priority fee above the cap.
	pub fn new(max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Result<Self, FeeSpecError> {
		if max_priority_fee_per_gas > max_fee_per_gas {
			return Err(FeeSpecError::PriorityExceedsMax {
				max: max_fee_per_gas,
				priority: max_priority_fee_per_gas,
			});
		}
		Ok(Self {
			max_fee_per_gas,
			max_priority_fee_per_gas,
		})
	}

	/// Maximum total fee per gas in wei.
	pub fn max_fee_per_gas(&self) -> u128 {
		self.max_fee_per_gas
	}

	/// Maximum priority fee per gas in wei.
	pub fn max_priority_fee_per_gas(&self) -> u128 {
		self.max_priority_fee_per_gas
	}
}

/// Fee form of a transaction. Selects the serialization layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSpec {
	/// Single gas price per unit, encoded as an EIP-155 legacy transaction.
	Legacy { gas_price: u128 },
	/// Base plus priority fee, encoded as an EIP-2718 type 2 transaction.
	Dynamic(DynamicFee),
}

impl FeeSpec {
	/// Legacy fee with the given gas price in wei.
	pub fn legacy(gas_price: u128) -> Self {
		FeeSpec::Legacy { gas_price }
	}

	/// Dynamic fee, validated.
	pub fn dynamic(max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Result<Self, FeeSpecError> {
		DynamicFee::new(max_fee_per_gas, max_priority_fee_per_gas).map(FeeSpec::Dynamic)
	}

	/// Returns true for the EIP-1559 form.
	pub fn is_dynamic(&self) -> bool {
		matches!(self, FeeSpec::Dynamic(_))
	}

	/// Upper bound on the price paid per unit of gas.
	pub fn max_price_per_gas(&self) -> u128 {
		match self {
			FeeSpec::Legacy { gas_price } => *gas_price,
			FeeSpec::Dynamic(fee) => fee.max_fee_per_gas(),
		}
	}
}

/// A fully validated transaction ready to be encoded and signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
	/// Sender; not part of the signed bytes but recovered from the signature.
	pub from: Address,
	/// Recipient. Contract creation is not supported.
	pub to: Address,
	/// Amount in the smallest native unit.
	pub value: U256,
	/// Gas limit, always greater than zero.
	pub gas_limit: u64,
	/// Calldata, possibly empty.
	pub data: Bytes,
	pub nonce: u64,
	/// EIP-155 chain id, always greater than zero.
	pub chain_id: u64,
	pub fee: FeeSpec,
}

impl UnsignedTransaction {
	/// Worst-case cost of the transaction: value plus gas limit times max price.
	pub fn max_cost(&self) -> U256 {
		let gas_cost =
			U256::from(self.gas_limit).saturating_mul(U256::from(self.fee.max_price_per_gas()));
		self.value.saturating_add(gas_cost)
	}

	/// Converts into the JSON-safe wire form.
	pub fn to_object(&self) -> TransactionObject {
		let (gas_price, max_fee_per_gas, max_priority_fee_per_gas) = match self.fee {
			FeeSpec::Legacy { gas_price } => (Some(gas_price.to_string()), None, None),
			FeeSpec::Dynamic(fee) => (
				None,
				Some(fee.max_fee_per_gas().to_string()),
				Some(fee.max_priority_fee_per_gas().to_string()),
			),
		};
		TransactionObject {
			from: self.from.to_checksum(None),
			to: self.to.to_checksum(None),
			value: self.value.to_string(),
			gas_limit: self.gas_limit.to_string(),
			chain_id: self.chain_id.to_string(),
			data: self.data.to_string(),
			nonce: Some(self.nonce.to_string()),
			gas_price,
			max_fee_per_gas,
			max_priority_fee_per_gas,
		}
	}
}

/// Wire form of a transaction as carried in the transport payload.
///
/// Numeric fields are decimal or `0x` hex strings in the smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionObject {
	pub from: String,
	pub to: String,
	pub value: String,
	pub gas_limit: String,
	pub chain_id: String,
	#[serde(default = "empty_data")]
	pub data: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_price: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_fee_per_gas: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_priority_fee_per_gas: Option<String>,
}

fn empty_data() -> String {
	"0x".to_string()
}

fn quantity<T: TryFrom<U256>>(field: &'static str, value: &str) -> Result<T, TransactionError> {
	let parsed = parse_quantity(value)
		.map_err(|message| TransactionError::InvalidQuantity { field, message })?;
	T::try_from(parsed).map_err(|_| TransactionError::InvalidQuantity {
		field,
		message: format!("'{}' is out of range", value),
	})
}

impl TryFrom<&TransactionObject> for UnsignedTransaction {
	type Error = TransactionError;

	fn try_from(object: &TransactionObject) -> Result<Self, Self::Error> {
		let from = parse_address(&object.from)
			.map_err(|message| TransactionError::InvalidAddress { field: "from", message })?;
		let to = parse_address(&object.to)
			.map_err(|message| TransactionError::InvalidAddress { field: "to", message })?;
		let value = parse_quantity(&object.value).map_err(|message| {
			TransactionError::InvalidQuantity {
				field: "value",
				message,
			}
		})?;
		let gas_limit: u64 = quantity("gasLimit", &object.gas_limit)?;
		if gas_limit == 0 {
			return Err(TransactionError::InvalidQuantity {
				field: "gasLimit",
				message: "gas limit must be greater than zero".to_string(),
			});
		}
		let chain_id: u64 = quantity("chainId", &object.chain_id)?;
		if chain_id == 0 {
			return Err(TransactionError::InvalidQuantity {
				field: "chainId",
				message: "chain id must be greater than zero".to_string(),
			});
		}
		let data = parse_hex_bytes(&object.data).map_err(TransactionError::InvalidData)?;
		let nonce: u64 = match object.nonce.as_deref() {
			Some(nonce) => quantity("nonce", nonce)?,
			None => return Err(TransactionError::MissingField("nonce")),
		};

		let fee = match (
			object.gas_price.as_deref(),
			object.max_fee_per_gas.as_deref(),
			object.max_priority_fee_per_gas.as_deref(),
		) {
			(Some(gas_price), None, None) => FeeSpec::legacy(quantity("gasPrice", gas_price)?),
			(None, Some(max), Some(priority)) => FeeSpec::dynamic(
				quantity("maxFeePerGas", max)?,
				quantity("maxPriorityFeePerGas", priority)?,
			)?,
			(None, None, None) => {
				return Err(FeeSpecError::Ambiguous("no fee fields supplied".to_string()).into())
			},
			_ => {
				return Err(FeeSpecError::Ambiguous(
					"exactly one of gasPrice or the maxFeePerGas/maxPriorityFeePerGas pair is required"
						.to_string(),
				)
				.into())
			},
		};

		Ok(UnsignedTransaction {
			from,
			to,
			value,
			gas_limit,
			data,
			nonce,
			chain_id,
			fee,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_object() -> TransactionObject {
		TransactionObject {
			from: "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".to_string(),
			to: "0x3535353535353535353535353535353535353535".to_string(),
			value: "100000000000000000".to_string(),
			gas_limit: "21000".to_string(),
			chain_id: "11155111".to_string(),
			data: "0x".to_string(),
			nonce: Some("3".to_string()),
			gas_price: None,
			max_fee_per_gas: Some("30000000000".to_string()),
			max_priority_fee_per_gas: Some("1500000000".to_string()),
		}
	}

	#[test]
	fn test_dynamic_fee_rejects_priority_above_max() {
		assert_eq!(
			DynamicFee::new(1, 2),
			Err(FeeSpecError::PriorityExceedsMax { max: 1, priority: 2 })
		);
		assert!(DynamicFee::new(2, 2).is_ok());
	}

	#[test]
	fn test_object_conversion_preserves_fields() {
		let object = sample_object();
		let tx = UnsignedTransaction::try_from(&object).unwrap();
		assert_eq!(tx.nonce, 3);
		assert_eq!(tx.chain_id, 11155111);
		assert!(tx.fee.is_dynamic());

		let wire = tx.to_object();
		assert_eq!(wire.value, object.value);
		assert_eq!(wire.max_fee_per_gas, object.max_fee_per_gas);
		assert_eq!(wire.gas_price, None);
		assert_eq!(UnsignedTransaction::try_from(&wire).unwrap(), tx);
	}

	#[test]
	fn test_object_accepts_hex_quantities() {
		let mut object = sample_object();
		object.gas_limit = "0x5208".to_string();
		object.nonce = Some("0x0".to_string());
		let tx = UnsignedTransaction::try_from(&object).unwrap();
		assert_eq!(tx.gas_limit, 21000);
		assert_eq!(tx.nonce, 0);
	}

	#[test]
	fn test_object_rejects_both_fee_forms() {
		let mut object = sample_object();
		object.gas_price = Some("1".to_string());
		assert!(matches!(
			UnsignedTransaction::try_from(&object),
			Err(TransactionError::InvalidFeeSpec(FeeSpecError::Ambiguous(_)))
		));
	}

	#[test]
	fn test_object_rejects_missing_fee_and_nonce() {
		let mut object = sample_object();
		object.max_fee_per_gas = None;
		object.max_priority_fee_per_gas = None;
		assert!(matches!(
			UnsignedTransaction::try_from(&object),
			Err(TransactionError::InvalidFeeSpec(_))
		));

		let mut object = sample_object();
		object.nonce = None;
		assert_eq!(
			UnsignedTransaction::try_from(&object),
			Err(TransactionError::MissingField("nonce"))
		);
	}

	#[test]
	fn test_object_rejects_zero_gas_limit() {
		let mut object = sample_object();
		object.gas_limit = "0".to_string();
		assert!(matches!(
			UnsignedTransaction::try_from(&object),
			Err(TransactionError::InvalidQuantity { field: "gasLimit", .. })
		));
	}

	#[test]
	fn test_max_cost() {
		let tx = UnsignedTransaction::try_from(&sample_object()).unwrap();
		let expected =
			U256::from(100_000_000_000_000_000u64) + U256::from(21000u64 * 30_000_000_000u64);
		assert_eq!(tx.max_cost(), expected);
	}
}
