//! URL-safe transport encoding of the signed payload.
//!
//! The payload travels as JSON percent-encoded with the same character set
//! browsers use for `encodeURIComponent`, appended to the broadcaster URL as
//! its fragment. Parsing accepts either the bare fragment or the full URL.

use crate::{canonical, CodecError};
use airgap_types::{SignedTransactionPayload, TransactionObject, UnsignedTransaction};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

/// Literal that selects the built-in demonstration payload.
pub const DEMO_PAYLOAD: &str = "demo";

/// Separator between the broadcaster URL and the encoded payload.
const FRAGMENT_MARKER: &str = "#/";

/// Characters left unescaped by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'!')
	.remove(b'~')
	.remove(b'*')
	.remove(b'\'')
	.remove(b'(')
	.remove(b')');

const DEMO_ADDRESS: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

/// Serializes and percent-encodes a payload.
pub fn encode_payload(payload: &SignedTransactionPayload) -> Result<String, CodecError> {
	let json = serde_json::to_string(payload)
		.map_err(|e| CodecError::MalformedPayload(format!("Failed to serialize payload: {}", e)))?;
	Ok(utf8_percent_encode(&json, URI_COMPONENT).to_string())
}

/// Builds the handoff URL: the broadcaster URL followed by the encoded payload.
pub fn handoff_url(
	broadcaster_url: &str,
	payload: &SignedTransactionPayload,
) -> Result<String, CodecError> {
	let encoded = encode_payload(payload)?;
	if broadcaster_url.ends_with(FRAGMENT_MARKER) {
		Ok(format!("{}{}", broadcaster_url, encoded))
	} else {
		Ok(format!(
			"{}{}{}",
			broadcaster_url.trim_end_matches('#'),
			FRAGMENT_MARKER,
			encoded
		))
	}
}

/// Returns true when the input selects the demonstration payload.
pub fn is_demo_input(input: &str) -> bool {
	extract_fragment(input) == DEMO_PAYLOAD
}

/// Parses a payload from a fragment or a full handoff URL.
///
/// The literal `demo` yields [`demo_payload`] without further parsing.
///
/// # Errors
///
/// Returns [`CodecError::MalformedPayload`] for invalid percent-encoding,
/// invalid JSON, a missing `transaction` or `serializedTransaction` field, or
/// field values of the wrong shape.
pub fn parse_payload(input: &str) -> Result<SignedTransactionPayload, CodecError> {
	if is_demo_input(input) {
		debug!("Using demonstration payload");
		return Ok(demo_payload());
	}

	let fragment = extract_fragment(input);
	if fragment.is_empty() {
		return Err(CodecError::MalformedPayload("payload is empty".to_string()));
	}
	let json = percent_decode_str(fragment)
		.decode_utf8()
		.map_err(|e| CodecError::MalformedPayload(format!("invalid percent-encoding: {}", e)))?;
	let value: serde_json::Value = serde_json::from_str(&json)
		.map_err(|e| CodecError::MalformedPayload(format!("invalid JSON: {}", e)))?;

	for field in ["transaction", "serializedTransaction"] {
		if value.get(field).map_or(true, |v| v.is_null()) {
			return Err(CodecError::MalformedPayload(format!(
				"missing required field '{}'",
				field
			)));
		}
	}

	let payload: SignedTransactionPayload = serde_json::from_value(value)
		.map_err(|e| CodecError::MalformedPayload(format!("invalid payload: {}", e)))?;
	if payload.serialized_transaction.is_empty() {
		return Err(CodecError::MalformedPayload(
			"serializedTransaction is empty".to_string(),
		));
	}
	Ok(payload)
}

/// The fixed demonstration payload.
///
/// A Sepolia transfer of 0.1 ETH at a legacy 10 Gwei gas price. It carries
/// only the unsigned encoding and no signature, so it can be inspected but
/// never broadcast.
pub fn demo_payload() -> SignedTransactionPayload {
	let transaction = TransactionObject {
		from: DEMO_ADDRESS.to_string(),
		to: DEMO_ADDRESS.to_string(),
		value: "100000000000000000".to_string(),
		gas_limit: "21000".to_string(),
		chain_id: "11155111".to_string(),
		data: "0x".to_string(),
		nonce: Some("0".to_string()),
		gas_price: Some("10000000000".to_string()),
		max_fee_per_gas: None,
		max_priority_fee_per_gas: None,
	};
	let serialized_transaction = UnsignedTransaction::try_from(&transaction)
		.map(|tx| canonical::encode_unsigned(&tx))
		.unwrap_or_default();
	SignedTransactionPayload {
		transaction,
		serialized_transaction,
		signature: None,
		hash: None,
	}
}

fn extract_fragment(input: &str) -> &str {
	let trimmed = input.trim();
	match trimmed.rsplit_once(FRAGMENT_MARKER) {
		Some((_, fragment)) => fragment,
		None => trimmed.strip_prefix('#').unwrap_or(trimmed),
	}
}
