//! Package-length decode (spec.md §4.4), grounded on `rcerc-acpi-rs`'s
//! `parse_pkg_length`: the lead byte's top two bits give the count of
//! extra length bytes (0-3); with zero extra bytes the low nibble is the
//! whole length, otherwise only the low **4** bits of the lead byte
//! contribute and the rest comes from the extra bytes, little-endian.

use bit_field::BitField;

use crate::error::{AmlError, AmlResult};

/// Returns `(length_including_itself, bytes_consumed_by_the_length_field)`.
pub fn parse_pkg_length(stream: &[u8], offset: usize) -> AmlResult<(usize, usize)> {
    let lead = *stream.get(offset).ok_or(AmlError::BadBytecode(None))?;
    let extra_count = lead.get_bits(6..8) as usize;

    if extra_count == 0 {
        return Ok((lead.get_bits(0..6) as usize, 1));
    }

    if offset + 1 + extra_count > stream.len() {
        return Err(AmlError::BadBytecode(None));
    }

    let mut length = lead.get_bits(0..4) as usize;
    for i in 0..extra_count {
        length |= (stream[offset + 1 + i] as usize) << (4 + 8 * i);
    }
    Ok((length, 1 + extra_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_length() {
        let (len, consumed) = parse_pkg_length(&[0x0A], 0).unwrap();
        assert_eq!(len, 0x0A);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn multi_byte_length() {
        // lead = 0b01_0011 -> extra_count=1, low nibble=0x3; extra byte=0x12
        let (len, consumed) = parse_pkg_length(&[0x43, 0x12], 0).unwrap();
        assert_eq!(consumed, 2);
        assert_eq!(len, 0x3 | (0x12 << 4));
    }

    #[test]
    fn truncated_stream_errors() {
        assert!(parse_pkg_length(&[0xC0], 0).is_err());
    }
}
