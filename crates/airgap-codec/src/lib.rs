//! Canonical encoding, signature binding, and transport codec.
//!
//! This crate owns every byte that crosses the airgap. The canonical module
//! produces the exact bytes that are hashed and signed, the binding module
//! attaches a signature using the chain's replay-protection convention, the
//! verify module recovers the signer from those bytes, and the transport
//! module wraps the result into a URL-safe payload.

use airgap_types::FeeSpecError;
use thiserror::Error;

pub mod binding;
pub mod canonical;
pub mod transport;
pub mod verify;

pub use binding::{bind, bind_raw};
pub use canonical::{
	decode_signed, decode_unsigned, encode_signed, encode_unsigned, signing_hash,
	transaction_hash, tx_type, DecodedTransaction,
};
pub use transport::{
	demo_payload, encode_payload, handoff_url, is_demo_input, parse_payload, DEMO_PAYLOAD,
};
pub use verify::{recover_signer, verify, verify_signed_transaction};

/// Errors that can occur while encoding, decoding, or verifying transactions.
#[derive(Debug, Error)]
pub enum CodecError {
	#[error("Empty transaction bytes")]
	Empty,
	#[error("RLP error: {0}")]
	Rlp(#[from] alloy_rlp::Error),
	#[error("Unsupported transaction type 0x{0:02x}")]
	UnsupportedType(u8),
	#[error("Unexpected trailing bytes after {0}")]
	TrailingBytes(&'static str),
	#[error("Contract creation is not supported")]
	ContractCreation,
	#[error("Non-empty access lists are not supported")]
	NonEmptyAccessList,
	#[error("Legacy transaction without EIP-155 replay protection")]
	MissingReplayProtection,
	#[error("Invalid {field}: {message}")]
	InvalidField {
		field: &'static str,
		message: String,
	},
	#[error("Invalid fee specification: {0}")]
	InvalidFeeSpec(#[from] FeeSpecError),
	#[error("Invalid signature: {0}")]
	InvalidSignature(String),
	#[error("Signature mismatch: claimed sender {claimed}, recovered {recovered}")]
	SignatureMismatch { claimed: String, recovered: String },
	#[error("Malformed payload: {0}")]
	MalformedPayload(String),
}
