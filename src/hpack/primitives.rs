//! Prefix-coded integers and string literals (RFC 7541 Sections 5.1, 5.2).
//!
//! Decoders take a `&mut &[u8]` cursor and advance it past what they consume.

use bytes::Bytes;

use super::huffman;
use crate::error::HpackError;

/// Largest integer accepted from the wire.
pub const MAX_INTEGER: u64 = u32::MAX as u64;

const HUFFMAN_FLAG: u8 = 0x80;

/// Encode `value` with an N-bit prefix, OR-ing `flags` into the first byte.
pub fn encode_integer(value: usize, prefix_bits: u8, flags: u8, dst: &mut Vec<u8>) {
    debug_assert!((1..=8).contains(&prefix_bits));
    let max_prefix = (1usize << prefix_bits) - 1;
    if value < max_prefix {
        dst.push(flags | value as u8);
        return;
    }
    dst.push(flags | max_prefix as u8);
    let mut rest = value - max_prefix;
    while rest >= 0x80 {
        dst.push((rest & 0x7f) as u8 | 0x80);
        rest >>= 7;
    }
    dst.push(rest as u8);
}

/// Decode an N-bit-prefix integer, ignoring the bits above the prefix.
pub fn decode_integer(src: &mut &[u8], prefix_bits: u8) -> Result<usize, HpackError> {
    let (&first, rest) = src.split_first().ok_or(HpackError::MalformedInteger)?;
    *src = rest;

    let max_prefix = (1u16 << prefix_bits) - 1;
    let mut value = u64::from(u16::from(first) & max_prefix);
    if value < u64::from(max_prefix) {
        return Ok(value as usize);
    }

    let mut shift = 0u32;
    loop {
        let (&byte, rest) = src.split_first().ok_or(HpackError::MalformedInteger)?;
        *src = rest;
        value += u64::from(byte & 0x7f) << shift;
        if value > MAX_INTEGER {
            return Err(HpackError::IntegerOverflow);
        }
        if byte & 0x80 == 0 {
            return Ok(value as usize);
        }
        shift += 7;
        if shift > 28 {
            return Err(HpackError::IntegerOverflow);
        }
    }
}

/// Encode a string literal, Huffman-coded when that is strictly shorter.
pub fn encode_string(value: &[u8], allow_huffman: bool, dst: &mut Vec<u8>) {
    if allow_huffman {
        let coded_len = huffman::encoded_len(value);
        if coded_len < value.len() {
            encode_integer(coded_len, 7, HUFFMAN_FLAG, dst);
            huffman::encode(value, dst);
            return;
        }
    }
    encode_integer(value.len(), 7, 0, dst);
    dst.extend_from_slice(value);
}

pub fn decode_string(src: &mut &[u8]) -> Result<Bytes, HpackError> {
    let huffman_coded = src.first().is_some_and(|b| b & HUFFMAN_FLAG != 0);
    let len = decode_integer(src, 7)?;
    if src.len() < len {
        return Err(HpackError::TruncatedString);
    }
    let (raw, rest) = src.split_at(len);
    *src = rest;
    if huffman_coded {
        huffman::decode(raw).map(Bytes::from)
    } else {
        Ok(Bytes::copy_from_slice(raw))
    }
}
