//! Bit strings and bit cursors.
//!
//! Bits are numbered from the most significant bit of the first byte.
//! A [`BitString`] is an immutable view of `len` bits over a shared
//! [`Bytes`] buffer; bits past `len` in the last byte are ignored.

use bytes::Bytes;
use std::fmt;

use crate::error::CellError;

/// Maximum number of payload bits in a single cell.
pub const MAX_CELL_BITS: usize = 1023;

/// An immutable sequence of bits.
#[derive(Clone, Default)]
pub struct BitString {
    data: Bytes,
    len: usize,
}

impl BitString {
    /// View the first `len` bits of `data`.
    pub fn new(data: Bytes, len: usize) -> Result<Self, CellError> {
        if len > data.len() * 8 {
            return Err(CellError::InvalidBitLength(len));
        }
        Ok(Self { data, len })
    }

    /// View the first `len` bits of `data` where the caller guarantees
    /// `len <= data.len() * 8`.
    pub(crate) fn from_parts(data: Bytes, len: usize) -> Self {
        debug_assert!(len <= data.len() * 8);
        Self { data, len }
    }

    /// The empty bit string.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whole bytes as a byte-aligned bit string.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let data: Bytes = bytes.into();
        let len = data.len() * 8;
        Self { data, len }
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the length is a multiple of 8.
    pub fn is_byte_aligned(&self) -> bool {
        self.len % 8 == 0
    }

    /// The bit at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        Some(self.data[index / 8] & (0x80 >> (index % 8)) != 0)
    }

    /// Bytes covering the content: `ceil(len / 8)` bytes.
    ///
    /// Bits past `len` in the last byte are whatever the buffer holds.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len.div_ceil(8)]
    }

    /// The shared buffer backing this view.
    pub fn buffer(&self) -> &Bytes {
        &self.data
    }

    /// Iterate over the bits.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.data[i / 8] & (0x80 >> (i % 8)) != 0)
    }

    /// Start reading from the first bit.
    pub fn reader(&self) -> BitReader<'_> {
        BitReader::new(self)
    }
}

impl PartialEq for BitString {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for BitString {}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitString({} bits, {})", self.len, hex::encode(self.as_bytes()))
    }
}

/// Append-only bit writer with a fixed capacity.
#[derive(Debug, Clone)]
pub struct BitBuilder {
    buf: Vec<u8>,
    len: usize,
    capacity: usize,
}

impl BitBuilder {
    /// A builder sized for one cell payload.
    pub fn new() -> Self {
        Self::with_capacity(MAX_CELL_BITS)
    }

    /// A builder that holds at most `capacity` bits.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity.div_ceil(8)),
            len: 0,
            capacity,
        }
    }

    /// Bits written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bits still available.
    pub fn available(&self) -> usize {
        self.capacity - self.len
    }

    fn reserve(&self, bits: usize) -> Result<(), CellError> {
        if bits > self.available() {
            return Err(CellError::BitOverflow {
                capacity: self.capacity,
                requested: self.len + bits,
            });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.buf.push(0);
        }
        if bit {
            let last = self.buf.len() - 1;
            self.buf[last] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
    }

    /// Write one bit.
    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        self.reserve(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Write the low `bits` bits of `value`, most significant first.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 64 || (bits < 64 && value >> bits != 0) {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.reserve(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    /// Write whole bytes.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        self.reserve(bytes.len() * 8)?;
        if self.len % 8 == 0 {
            self.buf.extend_from_slice(bytes);
            self.len += bytes.len() * 8;
        } else {
            for byte in bytes {
                for i in (0..8).rev() {
                    self.push_bit((byte >> i) & 1 == 1);
                }
            }
        }
        Ok(self)
    }

    /// Write every bit of another bit string.
    pub fn store_bits(&mut self, bits: &BitString) -> Result<&mut Self, CellError> {
        self.reserve(bits.len())?;
        for bit in bits.iter() {
            self.push_bit(bit);
        }
        Ok(self)
    }

    /// Freeze the written bits.
    pub fn build(self) -> BitString {
        BitString {
            data: Bytes::from(self.buf),
            len: self.len,
        }
    }
}

impl Default for BitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Cursor over a [`BitString`] with peek and consume reads.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bits: &'a BitString,
    offset: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bits: &'a BitString) -> Self {
        Self { bits, offset: 0 }
    }

    /// Current bit offset.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Bits left to read.
    pub fn remaining(&self) -> usize {
        self.bits.len() - self.offset
    }

    fn check(&self, bits: usize) -> Result<(), CellError> {
        if bits > self.remaining() {
            return Err(CellError::BitUnderflow {
                requested: bits,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    fn uint_at(&self, bits: usize) -> u64 {
        (self.offset..self.offset + bits).fold(0u64, |acc, i| {
            let bit = self.bits.data[i / 8] & (0x80 >> (i % 8)) != 0;
            (acc << 1) | bit as u64
        })
    }

    /// Read an unsigned integer without moving the cursor.
    pub fn peek_uint(&self, bits: usize) -> Result<u64, CellError> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.check(bits)?;
        Ok(self.uint_at(bits))
    }

    /// Read an unsigned integer and advance.
    pub fn load_uint(&mut self, bits: usize) -> Result<u64, CellError> {
        let value = self.peek_uint(bits)?;
        self.offset += bits;
        Ok(value)
    }

    /// Read one bit and advance.
    pub fn load_bit(&mut self) -> Result<bool, CellError> {
        Ok(self.load_uint(1)? == 1)
    }

    /// Read `len` whole bytes and advance.
    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, CellError> {
        self.check(len * 8)?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.load_uint(8)? as u8);
        }
        Ok(out)
    }

    /// Read a fixed-size byte array and advance.
    pub fn load_array<const N: usize>(&mut self) -> Result<[u8; N], CellError> {
        let bytes = self.load_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_packs_msb_first() {
        let mut b = BitBuilder::new();
        b.store_bit(true).unwrap();
        b.store_uint(0b01, 2).unwrap();
        let bits = b.build();
        assert_eq!(bits.len(), 3);
        assert_eq!(bits.as_bytes(), &[0b1010_0000]);
        assert_eq!(bits.get(0), Some(true));
        assert_eq!(bits.get(1), Some(false));
        assert_eq!(bits.get(3), None);
    }

    #[test]
    fn test_store_bytes_unaligned() {
        let mut b = BitBuilder::new();
        b.store_bit(true).unwrap();
        b.store_bytes(&[0xff, 0x00]).unwrap();
        let bits = b.build();
        assert_eq!(bits.len(), 17);
        assert_eq!(bits.as_bytes(), &[0xff, 0x80, 0x00]);
    }

    #[test]
    fn test_builder_overflow() {
        let mut b = BitBuilder::with_capacity(4);
        b.store_uint(0xf, 4).unwrap();
        let err = b.store_bit(true).unwrap_err();
        assert!(matches!(err, CellError::BitOverflow { capacity: 4, requested: 5 }));
    }

    #[test]
    fn test_store_uint_rejects_wide_value() {
        let mut b = BitBuilder::new();
        assert!(b.store_uint(4, 2).is_err());
    }

    #[test]
    fn test_reader_peek_does_not_advance() {
        let bits = BitString::from_bytes(vec![0x03u8, 0xab]);
        let mut r = bits.reader();
        assert_eq!(r.peek_uint(8).unwrap(), 3);
        assert_eq!(r.position(), 0);
        assert_eq!(r.load_uint(8).unwrap(), 3);
        assert_eq!(r.load_bytes(1).unwrap(), vec![0xab]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_reader_underflow() {
        let bits = BitString::from_bytes(vec![0x01u8]);
        let r = bits.reader();
        let err = r.peek_uint(9).unwrap_err();
        assert_eq!(
            err,
            CellError::BitUnderflow {
                requested: 9,
                remaining: 8
            }
        );
    }

    #[test]
    fn test_equality_ignores_trailing_buffer_bits() {
        let a = BitString::new(Bytes::from_static(&[0b1010_1111]), 3).unwrap();
        let b = BitString::new(Bytes::from_static(&[0b1010_0000]), 3).unwrap();
        assert_eq!(a, b);
        let c = BitString::new(Bytes::from_static(&[0b1010_0000]), 4).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_new_rejects_length_past_buffer() {
        assert!(BitString::new(Bytes::from_static(&[0]), 9).is_err());
    }
}
