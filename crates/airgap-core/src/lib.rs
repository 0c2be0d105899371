//! Core pipeline for airgapped transaction signing and broadcasting.
//!
//! This module ties the lower crates together. On the offline device the
//! [`OfflineSigner`] builds a transaction from user input, signs it through
//! the account, binds the signature and produces the transport payload. On
//! the online device the [`Broadcaster`] parses that payload, verifies it end
//! to end and submits the signed bytes through the delivery layer, with at
//! most one broadcast in flight per session.

use airgap_account::AccountError;
use airgap_codec::CodecError;
use airgap_types::{FeeSpecError, TransactionError};
use thiserror::Error;

pub mod builder;
pub mod engine;
pub mod fees;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::{BuilderDefaults, SignerRole, TransactionBuilder, TransactionInput};
pub use engine::broadcaster::{Broadcaster, TransactionDetails, VerifiedTransaction};
pub use engine::signer::OfflineSigner;
pub use engine::{AirgapFactories, EngineBuilder};
pub use fees::{suggested_fee_spec, FeePolicyResolver};
pub use state::{BroadcastSession, BroadcastStateError, BroadcastTicket};

/// Errors surfaced to the user by the pipeline.
#[derive(Debug, Error)]
pub enum AirgapError {
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	#[error("Invalid data: {0}")]
	InvalidData(String),
	#[error("Invalid fee specification: {0}")]
	InvalidFeeSpec(String),
	#[error("Missing nonce: {0}")]
	MissingNonce(String),
	#[error("Malformed payload: {0}")]
	MalformedPayload(String),
	/// The built-in demonstration payload was given to a broadcast.
	#[error("The demo payload can be inspected but not broadcast")]
	DemoPayload,
	#[error("Unsupported chain: {0}")]
	UnsupportedChain(u64),
	#[error("Fee estimation failed: {0}")]
	FeeEstimationFailed(String),
	/// The signature recovers to a different address than the claimed sender.
	#[error("Signature mismatch: claimed {claimed}, recovered {recovered}")]
	SignatureMismatch { claimed: String, recovered: String },
	#[error("Broadcast failed: {0}")]
	BroadcastFailed(String),
	/// A broadcast for this session is still awaiting the network.
	#[error("A broadcast is already in progress")]
	BroadcastInFlight,
	#[error("Account error: {0}")]
	Account(String),
	#[error("Configuration error: {0}")]
	Config(String),
}

impl From<CodecError> for AirgapError {
	fn from(err: CodecError) -> Self {
		match err {
			CodecError::SignatureMismatch { claimed, recovered } => {
				AirgapError::SignatureMismatch { claimed, recovered }
			},
			CodecError::InvalidFeeSpec(e) => AirgapError::InvalidFeeSpec(e.to_string()),
			CodecError::MalformedPayload(message) => AirgapError::MalformedPayload(message),
			other => AirgapError::MalformedPayload(other.to_string()),
		}
	}
}

impl From<TransactionError> for AirgapError {
	fn from(err: TransactionError) -> Self {
		match err {
			TransactionError::InvalidAddress { .. } => AirgapError::InvalidAddress(err.to_string()),
			TransactionError::InvalidFeeSpec(e) => AirgapError::InvalidFeeSpec(e.to_string()),
			other => AirgapError::MalformedPayload(other.to_string()),
		}
	}
}

impl From<FeeSpecError> for AirgapError {
	fn from(err: FeeSpecError) -> Self {
		AirgapError::InvalidFeeSpec(err.to_string())
	}
}

impl From<AccountError> for AirgapError {
	fn from(err: AccountError) -> Self {
		AirgapError::Account(err.to_string())
	}
}

impl From<BroadcastStateError> for AirgapError {
	fn from(err: BroadcastStateError) -> Self {
		match err {
			BroadcastStateError::InFlight => AirgapError::BroadcastInFlight,
			other => AirgapError::BroadcastFailed(other.to_string()),
		}
	}
}
