//! Online broadcast flow.
//!
//! A payload goes through [`Broadcaster::prepare`], which parses and verifies
//! it, before [`Broadcaster::broadcast`] will submit it. The only way to get a
//! [`VerifiedTransaction`] is through `prepare`.

use crate::state::BroadcastSession;
use crate::AirgapError;
use airgap_codec::{
	decode_signed, is_demo_input, parse_payload, verify_signed_transaction, DecodedTransaction,
};
use airgap_delivery::{DeliveryError, DeliveryService};
use airgap_types::{
	chain_name, explorer_tx_url, format_gwei, format_token_amount, get_chain,
	is_supported_chain, native_symbol, truncate_hash, BroadcastResult, FeeSpec,
	SignedTransactionPayload, UnsignedTransaction, B256, U256,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// A payload whose signed bytes were decoded and checked against every
/// claim the payload makes.
#[derive(Debug, Clone)]
pub struct VerifiedTransaction {
	payload: SignedTransactionPayload,
	decoded: DecodedTransaction,
}

impl VerifiedTransaction {
	pub fn payload(&self) -> &SignedTransactionPayload {
		&self.payload
	}

	/// Decoded transaction; `from` is the recovered signer.
	pub fn transaction(&self) -> &UnsignedTransaction {
		&self.decoded.transaction
	}

	/// Hash the network will report for this transaction.
	pub fn hash(&self) -> B256 {
		self.decoded.hash
	}

	pub fn details(&self) -> TransactionDetails {
		TransactionDetails::new(&self.decoded.transaction, Some(&self.decoded.hash))
	}
}

/// Human-readable summary of a transaction for confirmation screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
	pub network: String,
	pub chain_id: u64,
	pub from: String,
	pub to: String,
	/// Value with the native symbol, e.g. "0.1 ETH".
	pub value: String,
	pub fee: String,
	/// Value plus gas limit at the highest price the fee allows.
	pub max_cost: String,
	pub gas_limit: u64,
	pub nonce: u64,
	pub data_bytes: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transaction_hash: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub explorer_url: Option<String>,
}

impl TransactionDetails {
	pub fn new(tx: &UnsignedTransaction, hash: Option<&B256>) -> Self {
		let decimals = get_chain(tx.chain_id).map_or(18, |chain| chain.native_decimals);
		let fee = match tx.fee {
			FeeSpec::Legacy { gas_price } => format!("{} gwei", format_gwei(gas_price)),
			FeeSpec::Dynamic(fee) => format!(
				"max {} gwei, priority {} gwei",
				format_gwei(fee.max_fee_per_gas()),
				format_gwei(fee.max_priority_fee_per_gas())
			),
		};
		let hash = hash.map(|h| h.to_string());
		let native = |amount: U256| {
			format!(
				"{} {}",
				format_token_amount(&amount.to_string(), decimals),
				native_symbol(tx.chain_id)
			)
		};

		Self {
			network: chain_name(tx.chain_id),
			chain_id: tx.chain_id,
			from: tx.from.to_checksum(None),
			to: tx.to.to_checksum(None),
			value: native(tx.value),
			fee,
			max_cost: native(tx.max_cost()),
			gas_limit: tx.gas_limit,
			nonce: tx.nonce,
			data_bytes: tx.data.len(),
			explorer_url: hash
				.as_deref()
				.and_then(|h| explorer_tx_url(tx.chain_id, h)),
			transaction_hash: hash,
		}
	}
}

impl fmt::Display for TransactionDetails {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Network:   {} ({})", self.network, self.chain_id)?;
		writeln!(f, "From:      {}", self.from)?;
		writeln!(f, "To:        {}", self.to)?;
		writeln!(f, "Value:     {}", self.value)?;
		writeln!(f, "Fee:       {}", self.fee)?;
		writeln!(f, "Max cost:  {}", self.max_cost)?;
		writeln!(f, "Gas limit: {}", self.gas_limit)?;
		writeln!(f, "Nonce:     {}", self.nonce)?;
		if self.data_bytes > 0 {
			writeln!(f, "Data:      {} bytes", self.data_bytes)?;
		}
		if let Some(hash) = &self.transaction_hash {
			writeln!(f, "Hash:      {}", truncate_hash(hash))?;
		}
		if let Some(url) = &self.explorer_url {
			writeln!(f, "Explorer:  {}", url)?;
		}
		Ok(())
	}
}

/// Verifies payloads from the offline device and submits them.
pub struct Broadcaster {
	delivery: Arc<DeliveryService>,
	session: BroadcastSession,
}

impl Broadcaster {
	pub fn new(delivery: Arc<DeliveryService>) -> Self {
		Self {
			delivery,
			session: BroadcastSession::new(),
		}
	}

	pub fn session(&self) -> &BroadcastSession {
		&self.session
	}

	/// Parses a payload for display only. Accepts the demo payload.
	pub fn inspect(raw: &str) -> Result<(SignedTransactionPayload, TransactionDetails), AirgapError> {
		let payload = parse_payload(raw)?;
		let tx = UnsignedTransaction::try_from(&payload.transaction)?;
		let hash = decode_signed(&payload.serialized_transaction)
			.ok()
			.map(|decoded| decoded.hash);
		let details = TransactionDetails::new(&tx, hash.as_ref());
		Ok((payload, details))
	}

	/// Parses and verifies a payload for broadcast.
	///
	/// The signed bytes must recover to the claimed sender, decode to exactly
	/// the fields of the transaction object, and agree with the optional
	/// signature and hash fields.
	#[instrument(skip_all)]
	pub fn prepare(&self, raw: &str) -> Result<VerifiedTransaction, AirgapError> {
		if is_demo_input(raw) {
			return Err(AirgapError::DemoPayload);
		}

		let payload = parse_payload(raw)?;
		let claimed = UnsignedTransaction::try_from(&payload.transaction)?;

		if !is_supported_chain(claimed.chain_id) {
			return Err(AirgapError::UnsupportedChain(claimed.chain_id));
		}
		if !self.delivery.supports(claimed.chain_id) {
			return Err(AirgapError::Config(format!(
				"No network configured for {}",
				chain_name(claimed.chain_id)
			)));
		}

		let decoded =
			verify_signed_transaction(&payload.transaction.from, &payload.serialized_transaction)?;

		if decoded.transaction != claimed {
			return Err(AirgapError::MalformedPayload(
				"signed encoding does not match the transaction object".to_string(),
			));
		}
		if payload.signature.is_some_and(|sig| sig != decoded.signature) {
			return Err(AirgapError::MalformedPayload(
				"signature field does not match the signed encoding".to_string(),
			));
		}
		if payload.hash.is_some_and(|hash| hash != decoded.signing_hash) {
			return Err(AirgapError::MalformedPayload(
				"hash field does not match the signed encoding".to_string(),
			));
		}

		tracing::info!(
			chain_id = claimed.chain_id,
			from = %decoded.transaction.from,
			tx_hash = %decoded.hash,
			"Verified signed transaction"
		);
		Ok(VerifiedTransaction { payload, decoded })
	}

	/// Submits a verified transaction.
	///
	/// Fails with [`AirgapError::BroadcastInFlight`] while an earlier call is
	/// still waiting for the network. Transport errors are reported as
	/// [`AirgapError::BroadcastFailed`] and recorded in the session; retrying
	/// is up to the user.
	#[instrument(skip_all, fields(chain_id = verified.transaction().chain_id))]
	pub async fn broadcast(
		&self,
		verified: &VerifiedTransaction,
	) -> Result<BroadcastResult, AirgapError> {
		let ticket = self.session.begin()?;
		let chain_id = verified.transaction().chain_id;

		let outcome = self
			.delivery
			.submit(chain_id, &verified.payload.serialized_transaction)
			.await
			.map_err(|e| match e {
				DeliveryError::BroadcastFailed(message) => message,
				other => other.to_string(),
			});

		let Some(result) = self.session.complete(ticket, outcome.clone()) else {
			return Err(AirgapError::BroadcastFailed(
				"broadcast was abandoned before the network answered".to_string(),
			));
		};

		match outcome {
			Ok(hash) => {
				if hash.0 != verified.hash() {
					tracing::warn!(
						expected = %verified.hash(),
						reported = %hash,
						"Node reported an unexpected transaction hash"
					);
				}
				tracing::info!(tx_hash = %hash, chain_id = chain_id, "Broadcast accepted");
				Ok(result)
			},
			Err(message) => {
				tracing::warn!(chain_id = chain_id, error = %message, "Broadcast failed");
				Err(AirgapError::BroadcastFailed(message))
			},
		}
	}
}
