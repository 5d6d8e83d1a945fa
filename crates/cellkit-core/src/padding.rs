//! Reversible byte-alignment padding for bit strings.
//!
//! A payload whose length is not a multiple of 8 is completed with a single
//! `1` marker bit followed by `0`s. Byte-aligned payloads get no marker; the
//! cell's bits descriptor (odd `d2`) records which case applies.

use bytes::Bytes;

use crate::bits::BitString;

/// Round `bits` up to whole bytes, appending the padding marker if needed.
pub fn bits_to_padded(bits: &BitString) -> Vec<u8> {
    let mut out = bits.as_bytes().to_vec();
    let used = bits.len() % 8;
    if used != 0 {
        let last = out.len() - 1;
        // keep the content bits, set the marker, clear the rest
        let keep = 0xffu8 << (8 - used);
        out[last] = (out[last] & keep) | (0x80 >> used);
    }
    out
}

/// Recover the original bit string from a padded buffer.
///
/// The last non-zero byte carries the marker in its lowest set bit. An
/// all-zero or empty buffer holds zero bits. The result is a view over the
/// same buffer.
pub fn padded_to_bits(buf: impl Into<Bytes>) -> BitString {
    let data: Bytes = buf.into();
    let len = data
        .iter()
        .enumerate()
        .rev()
        .find(|(_, byte)| **byte != 0)
        .map(|(i, byte)| i * 8 + 7 - byte.trailing_zeros() as usize)
        .unwrap_or(0);
    // the marker sits inside the buffer, so len never exceeds it
    BitString::from_parts(data, len)
}

/// Decode cell data given whether it was padded.
///
/// `padded` is the parity of the cell's bits descriptor: aligned payloads
/// are taken whole, padded ones go through [`padded_to_bits`].
pub fn decode_padded(buf: impl Into<Bytes>, padded: bool) -> BitString {
    if padded {
        padded_to_bits(buf)
    } else {
        BitString::from_bytes(buf.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitBuilder;
    use proptest::prelude::*;

    fn bits_from(pattern: &[bool]) -> BitString {
        let mut b = BitBuilder::with_capacity(pattern.len());
        for bit in pattern {
            b.store_bit(*bit).unwrap();
        }
        b.build()
    }

    #[test]
    fn test_padding_marker() {
        let bits = bits_from(&[true, false, true]);
        assert_eq!(bits_to_padded(&bits), vec![0b1011_0000]);
    }

    #[test]
    fn test_aligned_has_no_marker() {
        let bits = BitString::from_bytes(vec![0xabu8, 0xcd]);
        assert_eq!(bits_to_padded(&bits), vec![0xab, 0xcd]);
    }

    #[test]
    fn test_empty() {
        assert!(bits_to_padded(&BitString::empty()).is_empty());
        assert_eq!(padded_to_bits(Vec::<u8>::new()).len(), 0);
        assert_eq!(padded_to_bits(vec![0u8, 0, 0]).len(), 0);
    }

    #[test]
    fn test_marker_ignores_dirty_tail() {
        let bits = BitString::new(Bytes::from_static(&[0b1111_1111]), 2).unwrap();
        assert_eq!(bits_to_padded(&bits), vec![0b1110_0000]);
    }

    #[test]
    fn test_marker_in_earlier_byte() {
        // seven content bits, then a zero byte the scan must skip
        let bits = padded_to_bits(vec![0b0000_0001u8, 0x00]);
        assert_eq!(bits.len(), 7);
    }

    #[test]
    fn test_unpadded_view_keeps_buffer() {
        let bits = padded_to_bits(vec![0xffu8, 0b0000_0001]);
        assert_eq!(bits.len(), 15);
        assert_eq!(bits.buffer().len(), 2);
        assert!(bits.iter().all(|b| b));
    }

    #[test]
    fn test_decode_padded_aligned() {
        let bits = BitString::from_bytes(vec![0x80u8]);
        let decoded = decode_padded(bits_to_padded(&bits), false);
        assert_eq!(decoded, bits);
    }

    proptest! {
        #[test]
        fn test_padding_roundtrip_unaligned(pattern in prop::collection::vec(any::<bool>(), 0..=256)) {
            prop_assume!(pattern.len() % 8 != 0);
            let bits = bits_from(&pattern);
            let padded = bits_to_padded(&bits);
            prop_assert_eq!(padded.len() * 8, pattern.len().div_ceil(8) * 8);
            prop_assert_eq!(padded_to_bits(padded), bits);
        }

        #[test]
        fn test_padding_roundtrip_with_descriptor(pattern in prop::collection::vec(any::<bool>(), 0..=256)) {
            let bits = bits_from(&pattern);
            let padded = bits_to_padded(&bits);
            let decoded = decode_padded(padded, !bits.is_byte_aligned());
            prop_assert_eq!(decoded, bits);
        }
    }
}
