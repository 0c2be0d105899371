//! Offline signing flow.

use crate::builder::{SignerRole, TransactionBuilder, TransactionInput};
use crate::AirgapError;
use airgap_account::AccountService;
use airgap_codec::{bind, decode_signed, encode_unsigned, handoff_url, signing_hash};
use airgap_types::{Address, SignedTransactionPayload};
use std::sync::Arc;
use tracing::instrument;

/// Signs transactions on the offline device and packages them for transport.
pub struct OfflineSigner {
	account: Arc<AccountService>,
	builder: TransactionBuilder,
	broadcaster_url: String,
}

impl OfflineSigner {
	pub fn new(
		account: Arc<AccountService>,
		builder: TransactionBuilder,
		broadcaster_url: impl Into<String>,
	) -> Self {
		Self {
			account,
			builder,
			broadcaster_url: broadcaster_url.into(),
		}
	}

	/// Address transactions are signed for.
	pub async fn address(&self) -> Result<Address, AirgapError> {
		Ok(self.account.get_address().await?)
	}

	/// Builds, signs and packages a transaction.
	///
	/// The signed encoding is decoded again before it is returned; the result
	/// must recover to the account and carry exactly the built fields.
	#[instrument(skip_all, fields(chain_id = chain_id))]
	pub async fn sign(
		&self,
		input: &TransactionInput,
		chain_id: u64,
	) -> Result<SignedTransactionPayload, AirgapError> {
		let from = self.account.get_address().await?;
		let tx = self.builder.build(input, chain_id, from, SignerRole::Offline)?;

		let unsigned = encode_unsigned(&tx);
		let hash = signing_hash(&tx);
		let signature = self.account.sign_hash(&hash).await?;
		let signed = bind(&unsigned, &signature)?;

		let decoded = decode_signed(&signed)?;
		if decoded.transaction.from != from {
			return Err(AirgapError::SignatureMismatch {
				claimed: from.to_checksum(None),
				recovered: decoded.transaction.from.to_checksum(None),
			});
		}
		if decoded.transaction != tx {
			return Err(AirgapError::MalformedPayload(
				"signed encoding does not reproduce the built transaction".to_string(),
			));
		}

		tracing::info!(
			from = %from,
			nonce = tx.nonce,
			dynamic_fee = tx.fee.is_dynamic(),
			"Signed transaction"
		);

		Ok(SignedTransactionPayload {
			transaction: tx.to_object(),
			serialized_transaction: signed,
			signature: Some(decoded.signature),
			hash: Some(hash),
		})
	}

	/// URL that opens the broadcaster with `payload`.
	pub fn handoff_url(&self, payload: &SignedTransactionPayload) -> Result<String, AirgapError> {
		Ok(handoff_url(&self.broadcaster_url, payload)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{test_account, SENDER};
	use airgap_codec::parse_payload;
	use airgap_types::{FeeSpec, UnsignedTransaction};

	const HANDOFF: &str = "https://broadcaster.example/#/";

	fn signer() -> OfflineSigner {
		OfflineSigner::new(test_account(), TransactionBuilder::default(), HANDOFF)
	}

	/// Nonce 9, 20 Gwei, 21000 gas, 1 ETH to 0x3535..35 on mainnet.
	fn eip155_input() -> TransactionInput {
		TransactionInput {
			to: "0x3535353535353535353535353535353535353535".to_string(),
			amount: "1".to_string(),
			gas_price: Some("20".to_string()),
			nonce: Some("9".to_string()),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_sign_reproduces_eip155_vector() {
		let payload = signer().sign(&eip155_input(), 1).await.unwrap();

		let expected = "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83";
		assert_eq!(payload.serialized_transaction.to_string(), format!("0x{}", expected));
		assert_eq!(
			payload.hash.unwrap().to_string(),
			"0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
		);
		assert_eq!(payload.transaction.nonce.as_deref(), Some("9"));
		assert_eq!(payload.transaction.gas_price.as_deref(), Some("20000000000"));
		assert!(payload.transaction.from.eq_ignore_ascii_case(&SENDER.to_string()));
		assert!(!payload.signature.unwrap().v());
	}

	#[tokio::test]
	async fn test_dynamic_fee_payload() {
		let input = TransactionInput {
			gas_price: None,
			max_fee_per_gas: Some("30".to_string()),
			max_priority_fee_per_gas: Some("2".to_string()),
			..eip155_input()
		};
		let payload = signer().sign(&input, 11155111).await.unwrap();
		assert_eq!(payload.serialized_transaction[0], 0x02);

		let tx = UnsignedTransaction::try_from(&payload.transaction).unwrap();
		assert_eq!(tx.fee, FeeSpec::dynamic(30_000_000_000, 2_000_000_000).unwrap());
		assert_eq!(tx.chain_id, 11155111);
	}

	#[tokio::test]
	async fn test_handoff_url_round_trip() {
		let signer = signer();
		let payload = signer.sign(&eip155_input(), 1).await.unwrap();
		let url = signer.handoff_url(&payload).unwrap();
		assert!(url.starts_with(HANDOFF));
		assert_eq!(parse_payload(&url).unwrap(), payload);
	}

	#[tokio::test]
	async fn test_offline_signing_requires_nonce() {
		let input = TransactionInput {
			nonce: None,
			..eip155_input()
		};
		assert!(matches!(
			signer().sign(&input, 1).await,
			Err(AirgapError::MissingNonce(_))
		));
	}
}
