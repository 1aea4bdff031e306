//! Minimal Solidity ABI codec for the credential contracts.
//!
//! Covers the static types `address`, `uint256`, `bytes32`, `bool` and the
//! dynamic `string`, which is everything the token and registry contracts
//! take or return.

use primitive_types::U256;
use sha3::{Digest, Keccak256};

const WORD: usize = 32;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AbiError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid hex data: {0}")]
    InvalidHex(String),

    #[error("Return data too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("Invalid UTF-8 in string return value")]
    InvalidUtf8,

    #[error("Offset or length out of range in return data")]
    OutOfRange,
}

/// A single ABI-encodable argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address([u8; 20]),
    Uint(U256),
    FixedBytes32([u8; 32]),
    Bool(bool),
    String(String),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_))
    }

    fn head_word(&self) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        match self {
            Token::Address(addr) => word[12..].copy_from_slice(addr),
            Token::Uint(value) => value.to_big_endian(&mut word),
            Token::FixedBytes32(bytes) => word.copy_from_slice(bytes),
            Token::Bool(flag) => word[31] = u8::from(*flag),
            Token::String(_) => unreachable!("dynamic tokens are encoded in the tail"),
        }
        word
    }
}

/// Keccak-256 digest of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// 4-byte function selector for a canonical signature such as `owner()`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encodes a call: selector followed by the head/tail encoded arguments.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode_args(args));
    out
}

fn encode_args(args: &[Token]) -> Vec<u8> {
    let head_len = args.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        if arg.is_dynamic() {
            let offset = U256::from(head_len + tail.len());
            head.extend_from_slice(&Token::Uint(offset).head_word());
            if let Token::String(s) = arg {
                tail.extend(encode_bytes(s.as_bytes()));
            }
        } else {
            head.extend_from_slice(&arg.head_word());
        }
    }

    head.extend(tail);
    head
}

fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Token::Uint(U256::from(data.len())).head_word().to_vec();
    out.extend_from_slice(data);
    let padding = (WORD - data.len() % WORD) % WORD;
    out.extend(std::iter::repeat(0u8).take(padding));
    out
}

/// Parses a `0x`-prefixed 20-byte address. Case is not checked.
pub fn parse_address(address: &str) -> Result<[u8; 20], AbiError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| AbiError::InvalidAddress(address.to_string()))?;

    let bytes = hex::decode(hex_part).map_err(|_| AbiError::InvalidAddress(address.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| AbiError::InvalidAddress(address.to_string()))
}

/// Formats 20 address bytes as a lowercase `0x` string.
pub fn format_address(address: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(address))
}

/// Decodes a `0x`-prefixed hex string (as returned by JSON-RPC) into bytes.
pub fn decode_hex(data: &str) -> Result<Vec<u8>, AbiError> {
    let trimmed = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(trimmed).map_err(|_| AbiError::InvalidHex(data.to_string()))
}

fn word_at(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
    let start = index * WORD;
    data.get(start..start + WORD).ok_or(AbiError::TooShort {
        expected: start + WORD,
        actual: data.len(),
    })
}

/// Decodes the `index`-th return word as an address.
pub fn decode_address(data: &[u8], index: usize) -> Result<[u8; 20], AbiError> {
    let word = word_at(data, index)?;
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&word[12..]);
    Ok(addr)
}

pub fn decode_uint(data: &[u8], index: usize) -> Result<U256, AbiError> {
    Ok(U256::from_big_endian(word_at(data, index)?))
}

pub fn decode_bool(data: &[u8], index: usize) -> Result<bool, AbiError> {
    Ok(!decode_uint(data, index)?.is_zero())
}

/// Decodes a dynamic `string` whose offset sits in the `index`-th head word.
pub fn decode_string(data: &[u8], index: usize) -> Result<String, AbiError> {
    let offset = word_as_usize(decode_uint(data, index)?)?;
    let start = offset.checked_add(WORD).ok_or(AbiError::OutOfRange)?;
    let len_word = data.get(offset..start).ok_or(AbiError::TooShort {
        expected: start,
        actual: data.len(),
    })?;
    let len = word_as_usize(U256::from_big_endian(len_word))?;
    let end = start.checked_add(len).ok_or(AbiError::OutOfRange)?;
    let bytes = data.get(start..end).ok_or(AbiError::TooShort {
        expected: end,
        actual: data.len(),
    })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
}

fn word_as_usize(value: U256) -> Result<usize, AbiError> {
    if value > U256::from(usize::MAX as u64) {
        return Err(AbiError::OutOfRange);
    }
    Ok(value.as_usize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_selectors() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
        assert_eq!(hex::encode(selector("owner()")), "8da5cb5b");
    }

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn encodes_static_arguments_in_place() {
        let addr = parse_address("0x00000000000000000000000000000000000000ff").unwrap();
        let data = encode_call(
            "transfer(address,uint256)",
            &[Token::Address(addr), Token::Uint(U256::from(1u64))],
        );

        assert_eq!(data.len(), 4 + 2 * WORD);
        assert_eq!(data[4 + 31], 0xff);
        assert_eq!(data[4 + 2 * WORD - 1], 1);
    }

    #[test]
    fn encodes_string_tail_with_offset_and_padding() {
        let data = encode_args(&[
            Token::Uint(U256::from(7u64)),
            Token::String("ipfs://abc".to_string()),
        ]);

        // head: uint + offset, tail: length word + one padded data word
        assert_eq!(data.len(), 4 * WORD);
        assert_eq!(decode_uint(&data, 1).unwrap(), U256::from(2 * WORD));
        assert_eq!(decode_string(&data, 1).unwrap(), "ipfs://abc");
    }

    #[test]
    fn decodes_address_and_bool_words() {
        let mut data = vec![0u8; 2 * WORD];
        data[12..32].copy_from_slice(&[0xab; 20]);
        data[63] = 1;

        assert_eq!(
            format_address(&decode_address(&data, 0).unwrap()),
            format!("0x{}", "ab".repeat(20))
        );
        assert!(decode_bool(&data, 1).unwrap());
    }

    #[test]
    fn short_return_data_is_an_error() {
        assert!(matches!(
            decode_address(&[0u8; 10], 0),
            Err(AbiError::TooShort { .. })
        ));
    }

    #[test]
    fn hostile_string_offsets_are_rejected() {
        // offset word of all ones
        let data = vec![0xffu8; 2 * WORD];
        assert_eq!(decode_string(&data, 0), Err(AbiError::OutOfRange));

        // offset fits, length word would run past usize::MAX
        let mut data = vec![0u8; 2 * WORD];
        data[31] = WORD as u8;
        data[WORD..].fill(0xff);
        assert_eq!(decode_string(&data, 0), Err(AbiError::OutOfRange));

        // offset just under usize::MAX
        let mut data = vec![0u8; WORD];
        data[24..].fill(0xff);
        assert_eq!(decode_string(&data, 0), Err(AbiError::OutOfRange));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("1234567890123456789012345678901234567890").is_err());
        assert!(parse_address("0xZZ34567890123456789012345678901234567890").is_err());
    }
}
