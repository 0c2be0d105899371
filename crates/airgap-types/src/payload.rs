//! Signed transaction payload carried across the airgap.
//!
//! The payload is created once, on the offline device, when signing succeeds.
//! It carries the wire form of the transaction for display, the signed
//! canonical encoding that is actually broadcast, and optionally the raw
//! signature and signing hash so the receiver can cross-check them.

use crate::transaction::TransactionObject;
use alloy_primitives::{Bytes, Signature, B256};
use serde::{Deserialize, Serialize};

/// Payload handed from the offline signer to the online broadcaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransactionPayload {
	/// Wire form of the transaction the signer approved.
	pub transaction: TransactionObject,
	/// Signed canonical encoding, the exact bytes submitted to the network.
	pub serialized_transaction: Bytes,
	/// Raw signature over the signing hash, 65 bytes `r || s || v`.
	#[serde(default, skip_serializing_if = "Option::is_none", with = "signature_hex")]
	pub signature: Option<Signature>,
	/// Keccak-256 of the unsigned encoding.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hash: Option<B256>,
}

/// Serde helpers to (de)serialize a signature as a 65-byte hex string.
///
/// The recovery byte is written as 27/28 and accepted as 0/1 or 27/28.
pub mod signature_hex {
	use crate::utils::parse_hex_bytes;
	use alloy_primitives::{Signature, U256};
	use serde::{de::Error, Deserialize, Deserializer, Serializer};

	/// Encodes a signature as `0x` + r (32) + s (32) + v (1).
	pub fn to_hex(signature: &Signature) -> String {
		let mut raw = Vec::with_capacity(65);
		raw.extend_from_slice(&signature.r().to_be_bytes::<32>());
		raw.extend_from_slice(&signature.s().to_be_bytes::<32>());
		raw.push(27 + signature.v() as u8);
		format!("0x{}", hex::encode(raw))
	}

	/// Parses 65 raw bytes into a signature, normalizing the recovery byte.
	pub fn from_slice(raw: &[u8]) -> Result<Signature, String> {
		if raw.len() != 65 {
			return Err(format!("signature must be 65 bytes, got {}", raw.len()));
		}
		let y_parity = match raw[64] {
			0 | 27 => false,
			1 | 28 => true,
			v => return Err(format!("invalid recovery byte {}", v)),
		};
		Ok(Signature::new(
			U256::from_be_slice(&raw[..32]),
			U256::from_be_slice(&raw[32..64]),
			y_parity,
		))
	}

	pub fn serialize<S>(value: &Option<Signature>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(signature) => serializer.serialize_str(&to_hex(signature)),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Signature>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value: Option<String> = Option::deserialize(deserializer)?;
		match value {
			Some(s) => {
				let raw = parse_hex_bytes(&s).map_err(D::Error::custom)?;
				from_slice(&raw).map(Some).map_err(D::Error::custom)
			},
			None => Ok(None),
		}
	}
}
