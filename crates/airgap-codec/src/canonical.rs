//! Canonical transaction encoding.
//!
//! Legacy transactions use the EIP-155 layout: the signing payload is
//! `rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0])` and the
//! signed form replaces the trailing triple with `v = 35 + 2 * chainId +
//! parity, r, s`. Dynamic-fee transactions use the EIP-2718 type `0x02`
//! envelope: `0x02 || rlp([chainId, nonce, maxPriorityFeePerGas,
//! maxFeePerGas, gasLimit, to, value, data, accessList])` with
//! `yParity, r, s` appended once signed.
//!
//! Decoding is strict. Anything this module would not have produced itself is
//! rejected: trailing bytes, non-canonical integers, contract creation,
//! non-empty access lists, unknown type bytes, and legacy signatures without
//! replay protection.

use crate::CodecError;
use airgap_types::{FeeSpec, UnsignedTransaction};
use alloy_primitives::{keccak256, Address, Bytes, Signature, B256, U256};
use alloy_rlp::{BufMut, Decodable, Encodable, Header, EMPTY_LIST_CODE, EMPTY_STRING_CODE};

/// Transaction type constants per EIP-2718.
pub mod tx_type {
	/// Untyped legacy transaction.
	pub const LEGACY: u8 = 0x00;
	/// EIP-1559 fee market transaction.
	pub const EIP1559: u8 = 0x02;
}

/// Offset of the EIP-155 `v` value.
const EIP155_V_OFFSET: u128 = 35;

/// A signed transaction decoded from its canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
	/// Decoded fields; `from` is the signer recovered from the signature.
	pub transaction: UnsignedTransaction,
	/// Signature with the recovery value normalized to a parity bit.
	pub signature: Signature,
	/// Keccak-256 of the unsigned encoding.
	pub signing_hash: B256,
	/// Keccak-256 of the signed encoding, as reported by the network.
	pub hash: B256,
}

/// Empty access list, always `0xc0`.
struct EmptyAccessList;

impl Encodable for EmptyAccessList {
	fn encode(&self, out: &mut dyn BufMut) {
		out.put_u8(EMPTY_LIST_CODE);
	}

	fn length(&self) -> usize {
		1
	}
}

fn encode_list(fields: &[&dyn Encodable], out: &mut Vec<u8>) {
	let payload_length = fields.iter().map(|f| f.length()).sum();
	Header {
		list: true,
		payload_length,
	}
	.encode(out);
	for field in fields {
		field.encode(out);
	}
}

/// Encodes the unsigned signing payload.
pub fn encode_unsigned(tx: &UnsignedTransaction) -> Bytes {
	let mut out = Vec::new();
	match tx.fee {
		FeeSpec::Legacy { gas_price } => encode_list(
			&[
				&tx.nonce,
				&gas_price,
				&tx.gas_limit,
				&tx.to,
				&tx.value,
				&tx.data,
				&tx.chain_id,
				&0u8,
				&0u8,
			],
			&mut out,
		),
		FeeSpec::Dynamic(fee) => {
			let (max_fee, priority_fee) = (fee.max_fee_per_gas(), fee.max_priority_fee_per_gas());
			out.put_u8(tx_type::EIP1559);
			encode_list(
				&[
					&tx.chain_id,
					&tx.nonce,
					&priority_fee,
					&max_fee,
					&tx.gas_limit,
					&tx.to,
					&tx.value,
					&tx.data,
					&EmptyAccessList,
				],
				&mut out,
			)
		},
	}
	out.into()
}

/// Encodes the signed transaction in its network form.
///
/// The signature's parity bit is mapped to the variant's convention: EIP-155
/// `v` for legacy transactions, a bare `yParity` for dynamic-fee ones.
pub fn encode_signed(tx: &UnsignedTransaction, signature: &Signature) -> Bytes {
	let parity = signature.v();
	let (r, s) = (signature.r(), signature.s());
	let mut out = Vec::new();
	match tx.fee {
		FeeSpec::Legacy { gas_price } => {
			let v = EIP155_V_OFFSET + 2 * u128::from(tx.chain_id) + u128::from(parity);
			encode_list(
				&[
					&tx.nonce,
					&gas_price,
					&tx.gas_limit,
					&tx.to,
					&tx.value,
					&tx.data,
					&v,
					&r,
					&s,
				],
				&mut out,
			)
		},
		FeeSpec::Dynamic(fee) => {
			let (max_fee, priority_fee) = (fee.max_fee_per_gas(), fee.max_priority_fee_per_gas());
			let y_parity = u8::from(parity);
			out.put_u8(tx_type::EIP1559);
			encode_list(
				&[
					&tx.chain_id,
					&tx.nonce,
					&priority_fee,
					&max_fee,
					&tx.gas_limit,
					&tx.to,
					&tx.value,
					&tx.data,
					&EmptyAccessList,
					&y_parity,
					&r,
					&s,
				],
				&mut out,
			)
		},
	}
	out.into()
}

/// Keccak-256 of the unsigned encoding; the digest the signer signs.
pub fn signing_hash(tx: &UnsignedTransaction) -> B256 {
	keccak256(encode_unsigned(tx))
}

/// Keccak-256 of a signed encoding; the hash the network reports.
pub fn transaction_hash(signed: &[u8]) -> B256 {
	keccak256(signed)
}

/// Decodes an unsigned signing payload.
///
/// The sender is not part of the signed bytes, so it is supplied by the
/// caller and copied into the result unchanged.
pub fn decode_unsigned(bytes: &[u8], from: Address) -> Result<UnsignedTransaction, CodecError> {
	let mut tx = decode_unsigned_body(bytes)?;
	tx.from = from;
	Ok(tx)
}

/// Decodes a signed transaction and recovers its sender.
pub fn decode_signed(bytes: &[u8]) -> Result<DecodedTransaction, CodecError> {
	let (mut transaction, signature) = match envelope_type(bytes)? {
		tx_type::LEGACY => decode_legacy_signed(bytes)?,
		_ => decode_dynamic_signed(&bytes[1..])?,
	};

	let signing_hash = signing_hash(&transaction);
	transaction.from = signature
		.recover_address_from_prehash(&signing_hash)
		.map_err(|e| CodecError::InvalidSignature(e.to_string()))?;

	Ok(DecodedTransaction {
		transaction,
		signature,
		signing_hash,
		hash: transaction_hash(bytes),
	})
}

/// Decodes an unsigned payload leaving `from` as the zero address.
pub(crate) fn decode_unsigned_body(bytes: &[u8]) -> Result<UnsignedTransaction, CodecError> {
	match envelope_type(bytes)? {
		tx_type::LEGACY => decode_legacy_unsigned(bytes),
		_ => decode_dynamic_unsigned(&bytes[1..]),
	}
}

/// Classifies the envelope: an RLP list is legacy, `0x02` is dynamic-fee.
fn envelope_type(bytes: &[u8]) -> Result<u8, CodecError> {
	match bytes.first() {
		None => Err(CodecError::Empty),
		Some(&first) if first >= EMPTY_LIST_CODE => Ok(tx_type::LEGACY),
		Some(&tx_type::EIP1559) => Ok(tx_type::EIP1559),
		Some(&other) => Err(CodecError::UnsupportedType(other)),
	}
}

/// Splits off one RLP list and returns its payload, advancing `buf`.
fn take_list<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], CodecError> {
	let header = Header::decode(buf)?;
	if !header.list {
		return Err(alloy_rlp::Error::UnexpectedString.into());
	}
	if buf.len() < header.payload_length {
		return Err(alloy_rlp::Error::InputTooShort.into());
	}
	let (payload, rest) = buf.split_at(header.payload_length);
	*buf = rest;
	Ok(payload)
}

fn ensure_consumed(rest: &[u8], what: &'static str) -> Result<(), CodecError> {
	if rest.is_empty() {
		Ok(())
	} else {
		Err(CodecError::TrailingBytes(what))
	}
}

fn decode_recipient(buf: &mut &[u8]) -> Result<Address, CodecError> {
	if buf.first() == Some(&EMPTY_STRING_CODE) {
		return Err(CodecError::ContractCreation);
	}
	Ok(Address::decode(buf)?)
}

fn decode_access_list(buf: &mut &[u8]) -> Result<(), CodecError> {
	if take_list(buf)?.is_empty() {
		Ok(())
	} else {
		Err(CodecError::NonEmptyAccessList)
	}
}

fn positive(field: &'static str, value: u64) -> Result<u64, CodecError> {
	if value == 0 {
		return Err(CodecError::InvalidField {
			field,
			message: "must be greater than zero".to_string(),
		});
	}
	Ok(value)
}

/// Fields shared by every layout, in legacy order after the fee.
struct Common {
	nonce: u64,
	gas_limit: u64,
	to: Address,
	value: U256,
	data: Bytes,
}

fn decode_legacy_prefix(list: &mut &[u8]) -> Result<(Common, u128), CodecError> {
	let nonce = u64::decode(list)?;
	let gas_price = u128::decode(list)?;
	let gas_limit = positive("gasLimit", u64::decode(list)?)?;
	let to = decode_recipient(list)?;
	let value = U256::decode(list)?;
	let data = Bytes::decode(list)?;
	Ok((
		Common {
			nonce,
			gas_limit,
			to,
			value,
			data,
		},
		gas_price,
	))
}

fn decode_dynamic_prefix(list: &mut &[u8]) -> Result<(Common, u64, FeeSpec), CodecError> {
	let chain_id = positive("chainId", u64::decode(list)?)?;
	let nonce = u64::decode(list)?;
	let priority_fee = u128::decode(list)?;
	let max_fee = u128::decode(list)?;
	let gas_limit = positive("gasLimit", u64::decode(list)?)?;
	let to = decode_recipient(list)?;
	let value = U256::decode(list)?;
	let data = Bytes::decode(list)?;
	decode_access_list(list)?;
	let fee = FeeSpec::dynamic(max_fee, priority_fee)?;
	Ok((
		Common {
			nonce,
			gas_limit,
			to,
			value,
			data,
		},
		chain_id,
		fee,
	))
}

fn assemble(common: Common, chain_id: u64, fee: FeeSpec) -> UnsignedTransaction {
	UnsignedTransaction {
		from: Address::ZERO,
		to: common.to,
		value: common.value,
		gas_limit: common.gas_limit,
		data: common.data,
		nonce: common.nonce,
		chain_id,
		fee,
	}
}

fn decode_legacy_unsigned(bytes: &[u8]) -> Result<UnsignedTransaction, CodecError> {
	let mut buf = bytes;
	let mut list = take_list(&mut buf)?;
	let (common, gas_price) = decode_legacy_prefix(&mut list)?;
	let chain_id = positive("chainId", u64::decode(&mut list)?)?;
	if u8::decode(&mut list)? != 0 || u8::decode(&mut list)? != 0 {
		return Err(CodecError::InvalidField {
			field: "signature",
			message: "signing payload must end with two empty values".to_string(),
		});
	}
	ensure_consumed(list, "legacy signing payload fields")?;
	ensure_consumed(buf, "legacy signing payload")?;
	Ok(assemble(common, chain_id, FeeSpec::legacy(gas_price)))
}

fn decode_dynamic_unsigned(bytes: &[u8]) -> Result<UnsignedTransaction, CodecError> {
	let mut buf = bytes;
	let mut list = take_list(&mut buf)?;
	let (common, chain_id, fee) = decode_dynamic_prefix(&mut list)?;
	ensure_consumed(list, "dynamic-fee signing payload fields")?;
	ensure_consumed(buf, "dynamic-fee signing payload")?;
	Ok(assemble(common, chain_id, fee))
}

fn decode_legacy_signed(bytes: &[u8]) -> Result<(UnsignedTransaction, Signature), CodecError> {
	let mut buf = bytes;
	let mut list = take_list(&mut buf)?;
	let (common, gas_price) = decode_legacy_prefix(&mut list)?;
	let v = u128::decode(&mut list)?;
	let r = U256::decode(&mut list)?;
	let s = U256::decode(&mut list)?;
	ensure_consumed(list, "legacy transaction fields")?;
	ensure_consumed(buf, "legacy transaction")?;

	if v < EIP155_V_OFFSET {
		return Err(CodecError::MissingReplayProtection);
	}
	let chain_id = u64::try_from((v - EIP155_V_OFFSET) / 2).map_err(|_| CodecError::InvalidField {
		field: "v",
		message: format!("{} does not encode a valid chain id", v),
	})?;
	let chain_id = positive("chainId", chain_id)?;
	let parity = (v - EIP155_V_OFFSET) % 2 == 1;

	Ok((
		assemble(common, chain_id, FeeSpec::legacy(gas_price)),
		Signature::new(r, s, parity),
	))
}

fn decode_dynamic_signed(bytes: &[u8]) -> Result<(UnsignedTransaction, Signature), CodecError> {
	let mut buf = bytes;
	let mut list = take_list(&mut buf)?;
	let (common, chain_id, fee) = decode_dynamic_prefix(&mut list)?;
	let y_parity = match u8::decode(&mut list)? {
		0 => false,
		1 => true,
		other => {
			return Err(CodecError::InvalidField {
				field: "yParity",
				message: format!("expected 0 or 1, got {}", other),
			})
		},
	};
	let r = U256::decode(&mut list)?;
	let s = U256::decode(&mut list)?;
	ensure_consumed(list, "dynamic-fee transaction fields")?;
	ensure_consumed(buf, "dynamic-fee transaction")?;

	Ok((
		assemble(common, chain_id, fee),
		Signature::new(r, s, y_parity),
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, b256, hex, U256};

	/// Transaction from the EIP-155 specification example.
	fn eip155_example() -> UnsignedTransaction {
		UnsignedTransaction {
			from: address!("9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"),
			to: address!("3535353535353535353535353535353535353535"),
			value: U256::from(1_000_000_000_000_000_000u128),
			gas_limit: 21000,
			data: Bytes::new(),
			nonce: 9,
			chain_id: 1,
			fee: FeeSpec::legacy(20_000_000_000),
		}
	}

	fn eip155_signature() -> Signature {
		Signature::new(
			U256::from_be_bytes(hex!(
				"28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276"
			)),
			U256::from_be_bytes(hex!(
				"67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
			)),
			false,
		)
	}

	const EIP155_SIGNED: [u8; 110] = hex!(
		"f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
	);

	fn dynamic_example() -> UnsignedTransaction {
		UnsignedTransaction {
			fee: FeeSpec::dynamic(30_000_000_000, 1_500_000_000).unwrap(),
			chain_id: 11155111,
			data: Bytes::from_static(&[0xde, 0xad]),
			..eip155_example()
		}
	}

	#[test]
	fn test_eip155_signing_payload() {
		let tx = eip155_example();
		assert_eq!(
			&encode_unsigned(&tx)[..],
			hex!("ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080")
		);
		assert_eq!(
			signing_hash(&tx),
			b256!("daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53")
		);
	}

	#[test]
	fn test_eip155_signed_encoding() {
		let signed = encode_signed(&eip155_example(), &eip155_signature());
		assert_eq!(&signed[..], EIP155_SIGNED);
	}

	#[test]
	fn test_decode_signed_recovers_sender() {
		let decoded = decode_signed(&EIP155_SIGNED).unwrap();
		assert_eq!(decoded.transaction, eip155_example());
		assert_eq!(decoded.signature, eip155_signature());
		assert_eq!(decoded.hash, keccak256(EIP155_SIGNED));
	}

	#[test]
	fn test_unsigned_round_trip_both_layouts() {
		for tx in [eip155_example(), dynamic_example()] {
			let encoded = encode_unsigned(&tx);
			assert_eq!(decode_unsigned(&encoded, tx.from).unwrap(), tx);
		}
	}

	#[test]
	fn test_dynamic_layout_is_typed() {
		let encoded = encode_unsigned(&dynamic_example());
		assert_eq!(encoded[0], tx_type::EIP1559);
		assert!(encoded[1] >= EMPTY_LIST_CODE);
		// access list is the last field
		assert_eq!(*encoded.last().unwrap(), EMPTY_LIST_CODE);
	}

	#[test]
	fn test_rejects_trailing_bytes() {
		let mut bytes = encode_unsigned(&eip155_example()).to_vec();
		bytes.push(0x00);
		assert!(matches!(
			decode_unsigned(&bytes, Address::ZERO),
			Err(CodecError::TrailingBytes(_))
		));

		let mut signed = EIP155_SIGNED.to_vec();
		signed.push(0x80);
		assert!(matches!(
			decode_signed(&signed),
			Err(CodecError::TrailingBytes(_))
		));
	}

	#[test]
	fn test_rejects_unknown_type_and_empty_input() {
		assert!(matches!(decode_signed(&[]), Err(CodecError::Empty)));
		assert!(matches!(
			decode_signed(&[0x01, 0xc0]),
			Err(CodecError::UnsupportedType(0x01))
		));
		assert!(matches!(
			decode_signed(&[0x03, 0xc0]),
			Err(CodecError::UnsupportedType(0x03))
		));
	}

	#[test]
	fn test_rejects_pre_eip155_signature() {
		let mut out = Vec::new();
		let tx = eip155_example();
		let sig = eip155_signature();
		encode_list(
			&[
				&tx.nonce,
				&20_000_000_000u128,
				&tx.gas_limit,
				&tx.to,
				&tx.value,
				&tx.data,
				&27u8,
				&sig.r(),
				&sig.s(),
			],
			&mut out,
		);
		assert!(matches!(
			decode_signed(&out),
			Err(CodecError::MissingReplayProtection)
		));
	}

	#[test]
	fn test_rejects_contract_creation() {
		let mut out = Vec::new();
		encode_list(
			&[
				&0u64,
				&1u128,
				&21000u64,
				&Bytes::new(),
				&U256::ZERO,
				&Bytes::new(),
				&1u64,
				&0u8,
				&0u8,
			],
			&mut out,
		);
		assert!(matches!(
			decode_unsigned(&out, Address::ZERO),
			Err(CodecError::ContractCreation)
		));
	}

	#[test]
	fn test_rejects_priority_above_max_when_decoding() {
		let tx = dynamic_example();
		let mut out = vec![tx_type::EIP1559];
		encode_list(
			&[
				&tx.chain_id,
				&tx.nonce,
				&2u128,
				&1u128,
				&tx.gas_limit,
				&tx.to,
				&tx.value,
				&tx.data,
				&EmptyAccessList,
			],
			&mut out,
		);
		assert!(matches!(
			decode_unsigned(&out, Address::ZERO),
			Err(CodecError::InvalidFeeSpec(_))
		));
	}
}
