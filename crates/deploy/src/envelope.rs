//! Tagged bytecode envelope understood by the node.
//!
//! The node accepts three payload kinds in the `data` field of a deployment
//! transaction and tells them apart by a leading variant tag. The layout is the
//! BCS encoding of an enum whose three variants each hold a byte vector:
//!
//! ```text
//! [ULEB128 variant tag][ULEB128 payload length][payload bytes]
//! ```
//!
//! Every tag value is below 128, so the tag always occupies a single byte.

use strum::{Display, EnumString};

/// Which virtual machine a payload is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum PayloadKind {
    /// Move script.
    Script,
    /// Move module.
    Module,
    /// EVM creation bytecode.
    EvmContract,
}

impl PayloadKind {
    pub const fn tag(self) -> u8 {
        match self {
            Self::Script => 0,
            Self::Module => 1,
            Self::EvmContract => 2,
        }
    }

    pub const fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            0 => Some(Self::Script),
            1 => Some(Self::Module),
            2 => Some(Self::EvmContract),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodingError {
    #[error("bytecode is empty")]
    EmptyBytecode,
    #[error("bytecode is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("unknown envelope tag {0}")]
    UnknownTag(u64),
    #[error("envelope is truncated")]
    Truncated,
    #[error("envelope integer is not minimally encoded")]
    NonCanonicalInteger,
    #[error("envelope integer exceeds 32 bits")]
    IntegerOverflow,
    #[error("envelope declares {declared} payload bytes but holds {actual}")]
    LengthMismatch { declared: u64, actual: usize },
}

/// Bytecode wrapped with the tag of the VM it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytecodeEnvelope {
    kind: PayloadKind,
    payload: Vec<u8>,
}

impl BytecodeEnvelope {
    pub fn new(kind: PayloadKind, payload: Vec<u8>) -> Result<Self, EncodingError> {
        if payload.is_empty() {
            return Err(EncodingError::EmptyBytecode);
        }
        if u32::try_from(payload.len()).is_err() {
            return Err(EncodingError::IntegerOverflow);
        }
        Ok(Self { kind, payload })
    }

    /// Wrap EVM creation bytecode given as hex, with or without a `0x` prefix.
    pub fn evm_from_hex(bytecode: &str) -> Result<Self, EncodingError> {
        let bytecode = bytecode.trim();
        let digits = strip_hex_prefix(bytecode);
        if digits.is_empty() {
            return Err(EncodingError::EmptyBytecode);
        }
        Self::new(PayloadKind::EvmContract, hex::decode(digits)?)
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Serialize to the wire layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + 6);
        write_uleb128(&mut out, self.kind.tag() as u64);
        write_uleb128(&mut out, self.payload.len() as u64);
        out.extend_from_slice(&self.payload);
        out
    }

    /// The encoded envelope as `0x`-prefixed hex, ready for a transaction's `data`.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.encode()))
    }

    /// Parse the wire layout. The whole input must be consumed.
    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        let mut cursor = bytes;
        let tag = read_uleb128(&mut cursor)?;
        let kind = PayloadKind::from_tag(tag).ok_or(EncodingError::UnknownTag(tag))?;
        let declared = read_uleb128(&mut cursor)?;

        if declared != cursor.len() as u64 {
            return Err(EncodingError::LengthMismatch {
                declared,
                actual: cursor.len(),
            });
        }

        Self::new(kind, cursor.to_vec())
    }
}

/// Drop a leading `0x` or `0X`.
pub(crate) fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

fn write_uleb128(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Reads a BCS ULEB128: at most 32 bits, with no redundant high zero bytes.
fn read_uleb128(cursor: &mut &[u8]) -> Result<u64, EncodingError> {
    let mut value = 0u64;
    for shift in (0..32).step_by(7) {
        let (&byte, rest) = cursor.split_first().ok_or(EncodingError::Truncated)?;
        *cursor = rest;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            if shift > 0 && byte == 0 {
                return Err(EncodingError::NonCanonicalInteger);
            }
            if value > u64::from(u32::MAX) {
                return Err(EncodingError::IntegerOverflow);
            }
            return Ok(value);
        }
    }
    Err(EncodingError::IntegerOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_evm_envelope_layout() {
        let envelope = BytecodeEnvelope::evm_from_hex("0x6080604052").unwrap();
        assert_eq!(envelope.encode(), vec![0x02, 0x05, 0x60, 0x80, 0x60, 0x40, 0x52]);
        assert_eq!(envelope.to_hex(), "0x02056080604052");
    }

    #[test]
    fn test_prefix_is_optional() {
        let expected = BytecodeEnvelope::evm_from_hex("0x6080").unwrap();
        assert_eq!(BytecodeEnvelope::evm_from_hex("6080").unwrap(), expected);
        assert_eq!(BytecodeEnvelope::evm_from_hex("0X6080").unwrap(), expected);
        assert_eq!(
            BytecodeEnvelope::evm_from_hex("0X"),
            Err(EncodingError::EmptyBytecode)
        );
    }

    #[test]
    fn test_long_payload_uses_multibyte_length() {
        let envelope = BytecodeEnvelope::new(PayloadKind::EvmContract, vec![0xab; 300]).unwrap();
        let encoded = envelope.encode();
        // 300 = 0b10_0101100 -> [0xac, 0x02]
        assert_eq!(&encoded[..3], &[0x02, 0xac, 0x02]);
        assert_eq!(encoded.len(), 303);
    }

    #[test]
    fn test_round_trip_random_bytecode() {
        let mut rng = rand::rng();
        for len in [1usize, 127, 128, 16_384, 24_576] {
            let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
            let envelope = BytecodeEnvelope::new(PayloadKind::EvmContract, bytes.clone()).unwrap();
            let decoded = BytecodeEnvelope::decode(&envelope.encode()).unwrap();
            assert_eq!(decoded.kind(), PayloadKind::EvmContract);
            assert_eq!(decoded.into_payload(), bytes);
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = BytecodeEnvelope::evm_from_hex("0xdeadbeef").unwrap();
        let b = BytecodeEnvelope::evm_from_hex("0xdeadbeef").unwrap();
        assert_eq!(a.encode(), b.encode());
    }

    #[test]
    fn test_rejects_empty_bytecode() {
        assert_eq!(
            BytecodeEnvelope::evm_from_hex("0x"),
            Err(EncodingError::EmptyBytecode)
        );
        assert_eq!(
            BytecodeEnvelope::evm_from_hex(""),
            Err(EncodingError::EmptyBytecode)
        );
    }

    #[test]
    fn test_rejects_invalid_hex() {
        assert!(matches!(
            BytecodeEnvelope::evm_from_hex("0x60zz"),
            Err(EncodingError::InvalidHex(_))
        ));
        assert!(matches!(
            BytecodeEnvelope::evm_from_hex("0x608"),
            Err(EncodingError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        assert_eq!(BytecodeEnvelope::decode(&[]), Err(EncodingError::Truncated));
        assert_eq!(
            BytecodeEnvelope::decode(&[0x07, 0x01, 0x00]),
            Err(EncodingError::UnknownTag(7))
        );
        assert_eq!(
            BytecodeEnvelope::decode(&[0x02, 0x03, 0x00]),
            Err(EncodingError::LengthMismatch {
                declared: 3,
                actual: 1
            })
        );
        assert_eq!(
            BytecodeEnvelope::decode(&[0x02, 0x80]),
            Err(EncodingError::Truncated)
        );
    }

    #[test]
    fn test_decode_rejects_non_canonical_integers() {
        // 1 written as two bytes
        assert_eq!(
            BytecodeEnvelope::decode(&[0x02, 0x81, 0x00, 0xff]),
            Err(EncodingError::NonCanonicalInteger)
        );
        assert_eq!(
            BytecodeEnvelope::decode(&[0x80, 0x00, 0x01, 0xff]),
            Err(EncodingError::NonCanonicalInteger)
        );
    }

    #[test]
    fn test_decode_rejects_lengths_above_u32() {
        // 2^32, five bytes
        assert_eq!(
            BytecodeEnvelope::decode(&[0x02, 0x80, 0x80, 0x80, 0x80, 0x10]),
            Err(EncodingError::IntegerOverflow)
        );
        // continuation past the fifth byte
        assert_eq!(
            BytecodeEnvelope::decode(&[0x02, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]),
            Err(EncodingError::IntegerOverflow)
        );
        // u32::MAX itself is a valid length, the payload is just missing
        assert_eq!(
            BytecodeEnvelope::decode(&[0x02, 0xff, 0xff, 0xff, 0xff, 0x0f]),
            Err(EncodingError::LengthMismatch {
                declared: u64::from(u32::MAX),
                actual: 0
            })
        );
    }

    #[test]
    fn test_move_tags_decode() {
        let script = BytecodeEnvelope::decode(&[0x00, 0x01, 0xff]).unwrap();
        assert_eq!(script.kind(), PayloadKind::Script);
        let module = BytecodeEnvelope::decode(&[0x01, 0x01, 0xff]).unwrap();
        assert_eq!(module.kind(), PayloadKind::Module);
    }
}
