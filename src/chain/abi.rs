//! Contract call-data encoding and decoding.
//!
//! # Responsibilities
//! - Compute 4-byte function selectors from canonical signatures
//! - Encode typed arguments into the head/tail ABI layout
//! - Decode `eth_call` return data back into typed values
//!
//! # Design Decisions
//! - Encoding is bit-compatible with the contract ABI convention: a wrong
//!   byte here is accepted by the node and executes the wrong logic, so the
//!   layout is written out explicitly rather than hidden behind codegen
//! - Only the types the custody contracts use are supported; anything else
//!   is rejected up front with no partial output

use alloy::primitives::{keccak256, Address, Bytes, U256};
use thiserror::Error;

/// Errors produced while encoding or decoding call data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    /// Signature is not in canonical `name(type,type)` form.
    #[error("malformed function signature: {0}")]
    MalformedSignature(String),

    /// A parameter type outside the supported set.
    #[error("unsupported parameter type: {0}")]
    UnsupportedType(String),

    /// Argument count does not match the signature.
    #[error("signature declares {expected} parameters, got {actual} arguments")]
    Arity { expected: usize, actual: usize },

    /// Argument value does not match the declared parameter type.
    #[error("argument {index} does not match declared type {expected}")]
    TypeMismatch { index: usize, expected: &'static str },

    /// Decoding ran past the end of the data.
    #[error("call data truncated at byte {0}")]
    Truncated(usize),
}

/// Parameter types understood by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiType {
    Address,
    Uint256,
    Bool,
    Bytes,
    AddressArray,
}

impl AbiType {
    fn parse(canonical: &str) -> Result<Self, AbiError> {
        match canonical {
            "address" => Ok(Self::Address),
            "uint256" => Ok(Self::Uint256),
            "bool" => Ok(Self::Bool),
            "bytes" => Ok(Self::Bytes),
            "address[]" => Ok(Self::AddressArray),
            other => Err(AbiError::UnsupportedType(other.to_string())),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Uint256 => "uint256",
            Self::Bool => "bool",
            Self::Bytes => "bytes",
            Self::AddressArray => "address[]",
        }
    }
}

/// A typed argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
    Bytes(Vec<u8>),
    AddressArray(Vec<Address>),
}

impl AbiValue {
    fn matches(&self, ty: AbiType) -> bool {
        matches!(
            (self, ty),
            (Self::Address(_), AbiType::Address)
                | (Self::Uint(_), AbiType::Uint256)
                | (Self::Bool(_), AbiType::Bool)
                | (Self::Bytes(_), AbiType::Bytes)
                | (Self::AddressArray(_), AbiType::AddressArray)
        )
    }
}

/// Parse a canonical function signature into its name and parameter types.
///
/// Canonical form is `name(type,type)` with no spaces; the selector is the
/// keccak-256 of exactly this string, so anything non-canonical is rejected
/// rather than silently hashed into the wrong selector.
pub fn parse_signature(signature: &str) -> Result<(&str, Vec<AbiType>), AbiError> {
    let malformed = || AbiError::MalformedSignature(signature.to_string());

    if signature.contains(' ') {
        return Err(malformed());
    }
    let open = signature.find('(').ok_or_else(malformed)?;
    if open == 0 || !signature.ends_with(')') {
        return Err(malformed());
    }

    let name = &signature[..open];
    let inner = &signature[open + 1..signature.len() - 1];

    let mut params = Vec::new();
    if !inner.is_empty() {
        for ty in inner.split(',') {
            params.push(AbiType::parse(ty)?);
        }
    }
    Ok((name, params))
}

/// Compute the 4-byte selector for a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode a contract call: selector followed by head/tail argument layout.
///
/// Static values (address, uint256, bool) occupy one 32-byte head slot each.
/// Dynamic values (bytes, address[]) place an offset in their head slot and
/// append a length-prefixed payload after all head slots, in argument order;
/// offsets are absolute byte positions within the argument section.
pub fn encode_call(signature: &str, args: &[AbiValue]) -> Result<Bytes, AbiError> {
    let (_, params) = parse_signature(signature)?;
    if params.len() != args.len() {
        return Err(AbiError::Arity {
            expected: params.len(),
            actual: args.len(),
        });
    }
    for (index, (value, ty)) in args.iter().zip(&params).enumerate() {
        if !value.matches(*ty) {
            return Err(AbiError::TypeMismatch {
                index,
                expected: ty.name(),
            });
        }
    }

    let head_len = 32 * args.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for value in args {
        match value {
            AbiValue::Address(address) => head.extend_from_slice(&address_word(*address)),
            AbiValue::Uint(amount) => head.extend_from_slice(&amount.to_be_bytes::<32>()),
            AbiValue::Bool(flag) => head.extend_from_slice(&bool_word(*flag)),
            AbiValue::Bytes(data) => {
                head.extend_from_slice(&usize_word(head_len + tail.len()));
                append_bytes_payload(&mut tail, data);
            }
            AbiValue::AddressArray(items) => {
                head.extend_from_slice(&usize_word(head_len + tail.len()));
                append_array_payload(&mut tail, items);
            }
        }
    }

    let mut out = Vec::with_capacity(4 + head.len() + tail.len());
    out.extend_from_slice(&selector(signature));
    out.extend_from_slice(&head);
    out.extend_from_slice(&tail);
    Ok(out.into())
}

/// Decode an argument section (no selector) back into typed values.
///
/// This is the inverse of the encoder's layout and is what the enrichment
/// path uses to read `eth_call` returns.
pub fn decode(params: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>, AbiError> {
    let mut out = Vec::with_capacity(params.len());
    for (slot, ty) in params.iter().enumerate() {
        let word = word_at(data, slot * 32)?;
        let value = match ty {
            AbiType::Address => AbiValue::Address(Address::from_slice(&word[12..])),
            AbiType::Uint256 => AbiValue::Uint(U256::from_be_slice(word)),
            AbiType::Bool => AbiValue::Bool(word[31] != 0),
            AbiType::Bytes => {
                let offset = word_to_offset(word, slot * 32)?;
                let length = word_to_offset(word_at(data, offset)?, offset)?;
                let payload = data
                    .get(offset + 32..offset + 32 + length)
                    .ok_or(AbiError::Truncated(offset + 32))?;
                AbiValue::Bytes(payload.to_vec())
            }
            AbiType::AddressArray => {
                let offset = word_to_offset(word, slot * 32)?;
                let length = word_to_offset(word_at(data, offset)?, offset)?;
                let mut items = Vec::with_capacity(length);
                for i in 0..length {
                    let word = word_at(data, offset + 32 + i * 32)?;
                    items.push(Address::from_slice(&word[12..]));
                }
                AbiValue::AddressArray(items)
            }
        };
        out.push(value);
    }
    Ok(out)
}

fn address_word(address: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

fn bool_word(flag: bool) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[31] = flag as u8;
    word
}

fn usize_word(value: usize) -> [u8; 32] {
    U256::from(value).to_be_bytes::<32>()
}

fn append_bytes_payload(tail: &mut Vec<u8>, data: &[u8]) {
    tail.extend_from_slice(&usize_word(data.len()));
    tail.extend_from_slice(data);
    // pad to a 32-byte boundary
    let remainder = data.len() % 32;
    if remainder != 0 {
        tail.extend(std::iter::repeat(0u8).take(32 - remainder));
    }
}

fn append_array_payload(tail: &mut Vec<u8>, items: &[Address]) {
    tail.extend_from_slice(&usize_word(items.len()));
    for item in items {
        tail.extend_from_slice(&address_word(*item));
    }
}

fn word_at(data: &[u8], position: usize) -> Result<&[u8], AbiError> {
    data.get(position..position + 32)
        .ok_or(AbiError::Truncated(position))
}

fn word_to_offset(word: &[u8], position: usize) -> Result<usize, AbiError> {
    // An offset or length that does not fit in u64 cannot point inside any
    // real payload.
    if word[..24].iter().any(|b| *b != 0) {
        return Err(AbiError::Truncated(position));
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(raw) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn owners() -> Vec<Address> {
        vec![
            address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
            address!("cccccccccccccccccccccccccccccccccccccccc"),
        ]
    }

    #[test]
    fn test_known_selectors() {
        // Anchors against selectors observable on-chain for these contracts.
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("getOwners()"), [0xa0, 0xe6, 0x7e, 0x2b]);
        assert_eq!(
            selector("submitTransaction(address,uint256,bytes)"),
            [0xc6, 0x42, 0x74, 0x74]
        );
    }

    #[test]
    fn test_selector_is_leading_hash_bytes() {
        let sig = "create(address[],uint256)";
        let hash = keccak256(sig.as_bytes());
        let encoded = encode_call(
            sig,
            &[
                AbiValue::AddressArray(owners()),
                AbiValue::Uint(U256::from(2)),
            ],
        )
        .unwrap();
        assert_eq!(&encoded[..4], &hash[..4]);
    }

    #[test]
    fn test_factory_create_layout() {
        let encoded = encode_call(
            "create(address[],uint256)",
            &[
                AbiValue::AddressArray(owners()),
                AbiValue::Uint(U256::from(2)),
            ],
        )
        .unwrap();

        // selector + 2 head slots + (length + 3 elements) tail
        assert_eq!(encoded.len(), 4 + 2 * 32 + 4 * 32);

        let args = &encoded[4..];
        // slot 0: offset of the array payload = past both head slots
        assert_eq!(U256::from_be_slice(&args[0..32]), U256::from(64));
        // slot 1: required signatures, zero-extended
        assert_eq!(U256::from_be_slice(&args[32..64]), U256::from(2));
        // tail: array length then left-padded addresses
        assert_eq!(U256::from_be_slice(&args[64..96]), U256::from(3));
        assert_eq!(&args[96 + 12..96 + 32], owners()[0].as_slice());
        assert_eq!(&args[128 + 12..128 + 32], owners()[1].as_slice());
        assert_eq!(&args[160 + 12..160 + 32], owners()[2].as_slice());
    }

    #[test]
    fn test_submit_transaction_layout() {
        let destination = address!("d18df206913b8e04371c543b631b7121a5c09c14");
        let encoded = encode_call(
            "submitTransaction(address,uint256,bytes)",
            &[
                AbiValue::Address(destination),
                AbiValue::Uint(U256::from(1_000u64)),
                AbiValue::Bytes(Vec::new()),
            ],
        )
        .unwrap();

        // selector + 3 head slots + length word for the empty bytes payload
        assert_eq!(encoded.len(), 4 + 3 * 32 + 32);

        let args = &encoded[4..];
        assert_eq!(&args[12..32], destination.as_slice());
        assert_eq!(U256::from_be_slice(&args[32..64]), U256::from(1_000u64));
        // slot 2 points past the head; payload is a bare zero length
        assert_eq!(U256::from_be_slice(&args[64..96]), U256::from(96));
        assert_eq!(U256::from_be_slice(&args[96..128]), U256::ZERO);
    }

    #[test]
    fn test_bytes_payload_padding() {
        let encoded = encode_call("call(bytes)", &[AbiValue::Bytes(vec![0xde, 0xad])]).unwrap();
        let args = &encoded[4..];
        assert_eq!(args.len(), 3 * 32);
        assert_eq!(U256::from_be_slice(&args[32..64]), U256::from(2));
        assert_eq!(&args[64..66], &[0xde, 0xad]);
        assert!(args[66..96].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_static_scalars() {
        let encoded = encode_call(
            "set(bool,uint256)",
            &[AbiValue::Bool(true), AbiValue::Uint(U256::MAX)],
        )
        .unwrap();
        let args = &encoded[4..];
        assert!(args[..31].iter().all(|b| *b == 0));
        assert_eq!(args[31], 1);
        assert!(args[32..64].iter().all(|b| *b == 0xff));
    }

    #[test]
    fn test_round_trip_mixed_arguments() {
        let values = vec![
            AbiValue::Address(address!("4054db09c41e787cf5014a453f91c71418fab9af")),
            AbiValue::Bytes(b"hello contract".to_vec()),
            AbiValue::Uint(U256::from(42u64)),
            AbiValue::AddressArray(owners()),
            AbiValue::Bool(false),
        ];
        let encoded = encode_call("f(address,bytes,uint256,address[],bool)", &values).unwrap();
        let decoded = decode(
            &[
                AbiType::Address,
                AbiType::Bytes,
                AbiType::Uint256,
                AbiType::AddressArray,
                AbiType::Bool,
            ],
            &encoded[4..],
        )
        .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_round_trip_no_arguments() {
        let encoded = encode_call("required()", &[]).unwrap();
        assert_eq!(encoded.len(), 4);
        assert_eq!(decode(&[], &encoded[4..]).unwrap(), Vec::new());
    }

    #[test]
    fn test_arity_mismatch() {
        let err = encode_call("transfer(address,uint256)", &[AbiValue::Bool(true)]).unwrap_err();
        assert_eq!(err, AbiError::Arity { expected: 2, actual: 1 });
    }

    #[test]
    fn test_type_mismatch() {
        let err = encode_call(
            "transfer(address,uint256)",
            &[AbiValue::Uint(U256::ZERO), AbiValue::Uint(U256::ZERO)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            AbiError::TypeMismatch {
                index: 0,
                expected: "address"
            }
        );
    }

    #[test]
    fn test_unsupported_and_non_canonical_types() {
        assert_eq!(
            encode_call("f(uint8)", &[AbiValue::Uint(U256::ZERO)]).unwrap_err(),
            AbiError::UnsupportedType("uint8".to_string())
        );
        // "uint" hashes to a different selector than "uint256"; reject it.
        assert_eq!(
            encode_call("f(uint)", &[AbiValue::Uint(U256::ZERO)]).unwrap_err(),
            AbiError::UnsupportedType("uint".to_string())
        );
    }

    #[test]
    fn test_malformed_signatures() {
        for sig in ["transfer", "(address)", "f(address, uint256)", "f(address"] {
            assert!(matches!(
                parse_signature(sig),
                Err(AbiError::MalformedSignature(_))
            ));
        }
    }

    #[test]
    fn test_decode_truncated_data() {
        let err = decode(&[AbiType::Uint256], &[0u8; 16]).unwrap_err();
        assert_eq!(err, AbiError::Truncated(0));

        // Offset slot points past the end of the data.
        let mut data = vec![0u8; 32];
        data[31] = 0xff;
        let err = decode(&[AbiType::Bytes], &data).unwrap_err();
        assert_eq!(err, AbiError::Truncated(0xff));
    }
}
