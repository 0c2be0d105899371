//! Broadcast and fee estimation types.
//!
//! This module defines the records the online side produces: transaction
//! hashes returned by the network, the status of a broadcast attempt, and the
//! advisory fee estimate shown before signing.

use crate::utils::{format_gwei, truncate_hash};
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash of a transaction accepted by a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub B256);

impl TransactionHash {
	/// Shortened form for confirmation screens.
	pub fn short(&self) -> String {
		truncate_hash(&self.to_string())
	}
}

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<B256> for TransactionHash {
	fn from(hash: B256) -> Self {
		Self(hash)
	}
}

/// Status of a broadcast attempt within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastStatus {
	/// Nothing submitted yet, or reset after a failure.
	Idle,
	/// Submitted and awaiting the network's answer.
	Pending,
	/// Accepted by the network.
	Success,
	/// Rejected by the network or the transport failed.
	Error,
}

impl fmt::Display for BroadcastStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BroadcastStatus::Idle => write!(f, "idle"),
			BroadcastStatus::Pending => write!(f, "pending"),
			BroadcastStatus::Success => write!(f, "success"),
			BroadcastStatus::Error => write!(f, "error"),
		}
	}
}

/// Outcome of a broadcast as surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResult {
	pub status: BroadcastStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transaction_hash: Option<TransactionHash>,
	/// Underlying transport or node message on failure.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error_detail: Option<String>,
}

impl BroadcastResult {
	pub fn pending() -> Self {
		Self {
			status: BroadcastStatus::Pending,
			transaction_hash: None,
			error_detail: None,
		}
	}

	pub fn success(hash: TransactionHash) -> Self {
		Self {
			status: BroadcastStatus::Success,
			transaction_hash: Some(hash),
			error_detail: None,
		}
	}

	pub fn failure(detail: impl Into<String>) -> Self {
		Self {
			status: BroadcastStatus::Error,
			transaction_hash: None,
			error_detail: Some(detail.into()),
		}
	}
}

/// Advisory fee estimate for a chain, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
	pub chain_id: u64,
	/// Latest block base fee, or the node's gas price when the block has none.
	pub base_fee: u128,
	pub priority_fee: u128,
	/// `base_fee + priority_fee`.
	pub total_fee: u128,
}

impl FeeEstimate {
	/// Builds an estimate, saturating the total on overflow.
	pub fn new(chain_id: u64, base_fee: u128, priority_fee: u128) -> Self {
		Self {
			chain_id,
			base_fee,
			priority_fee,
			total_fee: base_fee.saturating_add(priority_fee),
		}
	}
}

impl fmt::Display for FeeEstimate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"base {} gwei + priority {} gwei = {} gwei",
			format_gwei(self.base_fee),
			format_gwei(self.priority_fee),
			format_gwei(self.total_fee)
		)
	}
}
