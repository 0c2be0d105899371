//! Signature binding.
//!
//! Combines an unsigned encoding with the signature produced over its hash.
//! Binding never trusts verification: it re-derives the layout from the
//! unsigned bytes and only re-encodes, so it is deterministic for a given
//! input pair. Whether the signature belongs to the claimed sender is the
//! verifier's job.

use crate::{canonical, CodecError};
use airgap_types::payload::signature_hex;
use alloy_primitives::{Bytes, Signature};
use tracing::debug;

/// Produces the signed encoding for an unsigned encoding and its signature.
///
/// # Errors
///
/// Returns an error if `unsigned` is not a canonical signing payload.
pub fn bind(unsigned: &[u8], signature: &Signature) -> Result<Bytes, CodecError> {
	let tx = canonical::decode_unsigned_body(unsigned)?;
	let signed = canonical::encode_signed(&tx, signature);
	debug!(
		chain_id = tx.chain_id,
		nonce = tx.nonce,
		dynamic_fee = tx.fee.is_dynamic(),
		"Bound signature to transaction"
	);
	Ok(signed)
}

/// Like [`bind`], taking a raw 65-byte `r || s || v` signature.
///
/// The recovery byte may be given as 0/1 or 27/28.
pub fn bind_raw(unsigned: &[u8], signature: &[u8]) -> Result<Bytes, CodecError> {
	let signature = signature_hex::from_slice(signature).map_err(CodecError::InvalidSignature)?;
	bind(unsigned, &signature)
}
