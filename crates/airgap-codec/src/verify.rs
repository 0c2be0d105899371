//! Signature verification.
//!
//! Recovers the signer of a hash or of a signed encoding and compares it with
//! the claimed sender. Comparison is on lower-cased hex so checksum casing
//! never causes a false mismatch.

use crate::{canonical, CodecError, DecodedTransaction};
use airgap_types::{addresses_match, payload::signature_hex};
use alloy_primitives::{Address, Signature, B256};
use tracing::warn;

/// Recovers the address that produced `signature` over `hash`.
pub fn recover_signer(hash: &B256, signature: &Signature) -> Result<Address, CodecError> {
	signature
		.recover_address_from_prehash(hash)
		.map_err(|e| CodecError::InvalidSignature(e.to_string()))
}

/// Returns true when the raw 65-byte signature over `hash` was produced by
/// `claimed_sender`.
///
/// Never fails: malformed signatures, unrecoverable points, and mismatched
/// signers all yield `false`.
pub fn verify(claimed_sender: &str, hash: &B256, signature: &[u8]) -> bool {
	let Ok(signature) = signature_hex::from_slice(signature) else {
		return false;
	};
	match recover_signer(hash, &signature) {
		Ok(recovered) => addresses_match(&recovered.to_string(), claimed_sender),
		Err(_) => false,
	}
}

/// Decodes a signed encoding and checks that its signer is `claimed_sender`.
///
/// # Errors
///
/// Returns the decoding error for malformed bytes, or
/// [`CodecError::SignatureMismatch`] when the recovered signer differs.
pub fn verify_signed_transaction(
	claimed_sender: &str,
	signed: &[u8],
) -> Result<DecodedTransaction, CodecError> {
	let decoded = canonical::decode_signed(signed)?;
	let recovered = decoded.transaction.from.to_string();
	if !addresses_match(&recovered, claimed_sender) {
		warn!(
			claimed = %claimed_sender,
			recovered = %recovered,
			"Signed transaction does not belong to claimed sender"
		);
		return Err(CodecError::SignatureMismatch {
			claimed: claimed_sender.to_string(),
			recovered,
		});
	}
	Ok(decoded)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::canonical::{encode_signed, signing_hash};
	use airgap_types::{FeeSpec, UnsignedTransaction};
	use alloy_primitives::{address, keccak256, Bytes, U256};
	use k256::ecdsa::{SigningKey, VerifyingKey};

	fn signer(byte: u8) -> (SigningKey, Address) {
		let key = SigningKey::from_slice(&[byte; 32]).unwrap();
		let point = VerifyingKey::from(&key).to_encoded_point(false);
		let hash = keccak256(&point.as_bytes()[1..]);
		(key, Address::from_slice(&hash[12..]))
	}

	fn sign(key: &SigningKey, hash: &B256) -> Signature {
		let (sig, recovery_id) = key.sign_prehash_recoverable(hash.as_slice()).unwrap();
		Signature::new(
			U256::from_be_slice(&sig.r().to_bytes()),
			U256::from_be_slice(&sig.s().to_bytes()),
			recovery_id.is_y_odd(),
		)
	}

	fn raw(signature: &Signature) -> Vec<u8> {
		let mut out = Vec::with_capacity(65);
		out.extend_from_slice(&signature.r().to_be_bytes::<32>());
		out.extend_from_slice(&signature.s().to_be_bytes::<32>());
		out.push(27 + signature.v() as u8);
		out
	}

	fn transaction(from: Address) -> UnsignedTransaction {
		UnsignedTransaction {
			from,
			to: address!("3535353535353535353535353535353535353535"),
			value: U256::from(1u64),
			gas_limit: 21000,
			data: Bytes::new(),
			nonce: 4,
			chain_id: 1,
			fee: FeeSpec::dynamic(20_000_000_000, 1_000_000_000).unwrap(),
		}
	}

	#[test]
	fn test_eip155_reference_key_address() {
		let (_, address) = signer(0x46);
		assert_eq!(address, address!("9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"));
	}

	#[test]
	fn test_verify_accepts_matching_signer_in_any_case() {
		let (key, address) = signer(0x46);
		let hash = B256::repeat_byte(0x42);
		let signature = raw(&sign(&key, &hash));

		assert!(verify(&address.to_string(), &hash, &signature));
		assert!(verify(&address.to_string().to_uppercase().replace("0X", "0x"), &hash, &signature));
	}

	#[test]
	fn test_verify_rejects_other_signer_and_garbage() {
		let (key, _) = signer(0x46);
		let (_, other) = signer(0x47);
		let hash = B256::repeat_byte(0x42);
		let signature = raw(&sign(&key, &hash));

		assert!(!verify(&other.to_string(), &hash, &signature));
		assert!(!verify(&other.to_string(), &hash, &signature[..64]));
		assert!(!verify(&other.to_string(), &hash, &[0xff; 65]));
		assert!(!verify(&other.to_string(), &hash, &[]));
	}

	#[test]
	fn test_verify_signed_transaction() {
		let (key, address) = signer(0x46);
		let (_, other) = signer(0x47);
		let tx = transaction(address);
		let signed = encode_signed(&tx, &sign(&key, &signing_hash(&tx)));

		let decoded = verify_signed_transaction(&address.to_string(), &signed).unwrap();
		assert_eq!(decoded.transaction, tx);

		assert!(matches!(
			verify_signed_transaction(&other.to_string(), &signed),
			Err(CodecError::SignatureMismatch { .. })
		));
	}
}
