//! Self-delimiting variable-length integers.
//!
//! A value is written as big-endian groups of 7 bits. Every byte but the last
//! has its high bit clear; the last byte carries the lowest group with the
//! high bit set, so a run of encoded values can be split without lengths.

use crate::error::{IndexError, Result};

/// Longest encoding of a `u64`.
pub const MAX_VARINT_BYTES: usize = 10;

const TERMINAL: u8 = 0x80;
const GROUP: u8 = 0x7f;

/// Append the encoding of `value` to `out`.
pub fn encode(value: u64, out: &mut Vec<u8>) {
    let mut groups = [0u8; MAX_VARINT_BYTES];
    let mut n = 0;
    let mut v = value;
    loop {
        groups[n] = (v as u8) & GROUP;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (1..n).rev() {
        out.push(groups[i]);
    }
    out.push(groups[0] | TERMINAL);
}

pub fn encode_u32(value: u32, out: &mut Vec<u8>) {
    encode(value as u64, out)
}

/// Number of bytes `encode` produces for `value`.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

/// Decode one value from the front of `bytes`, returning it with the number
/// of bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        if value >> 57 != 0 {
            return Err(IndexError::VarintOverflow { bits: 64 });
        }
        value = (value << 7) | (byte & GROUP) as u64;
        if byte & TERMINAL != 0 {
            return Ok((value, i + 1));
        }
    }
    Err(IndexError::corrupt(
        "varint",
        format!("no terminal byte within {} bytes", bytes.len()),
    ))
}

/// Sequential reader over a block of concatenated varints.
pub struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn next_u64(&mut self) -> Result<Option<u64>> {
        if self.is_empty() {
            return Ok(None);
        }
        let (value, used) = decode(&self.bytes[self.pos..])?;
        self.pos += used;
        Ok(Some(value))
    }

    pub fn next_u32(&mut self) -> Result<Option<u32>> {
        match self.next_u64()? {
            None => Ok(None),
            Some(v) => u32::try_from(v)
                .map(Some)
                .map_err(|_| IndexError::VarintOverflow { bits: 32 }),
        }
    }
}

/// Decode a block holding an even number of 32-bit values as pairs.
pub fn decode_pairs(block: &[u8], what: &'static str) -> Result<Vec<(u32, u32)>> {
    let mut decoder = Decoder::new(block);
    let mut pairs = Vec::new();
    while let Some(first) = decoder.next_u32()? {
        let second = decoder
            .next_u32()?
            .ok_or_else(|| IndexError::corrupt(what, "odd number of values in block"))?;
        pairs.push((first, second));
    }
    Ok(pairs)
}

pub fn encode_pairs(pairs: impl IntoIterator<Item = (u32, u32)>, out: &mut Vec<u8>) {
    for (a, b) in pairs {
        encode_u32(a, out);
        encode_u32(b, out);
    }
}
