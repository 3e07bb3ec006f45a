//! Table checksum calculation.

use std::num::Wrapping;

use crate::binary::read::ReadScope;
use crate::binary::U32Be;

/// Byte offset of `checkSumAdjustment` in the `head` table.
pub const HEAD_CHECKSUM_ADJUSTMENT: usize = 8;

/// Calculate a checksum of `data` according to the OpenType table checksum algorithm
///
/// Data that is not 32-bit aligned is treated as if padded with zeros.
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/otff#calculating-checksums>
pub fn table_checksum(data: &[u8]) -> Wrapping<u32> {
    let whole = data.len() / 4;
    let words = ReadScope::new(data)
        .ctxt()
        .read_array::<U32Be>(whole)
        .map(|array| array.iter().map(Wrapping).sum())
        .unwrap_or(Wrapping(0));

    let mut tail = [0u8; 4];
    let rest = &data[whole * 4..];
    tail[..rest.len()].copy_from_slice(rest);
    words + Wrapping(u32::from_be_bytes(tail))
}

/// Checksum of a `head` table, which is calculated with `checkSumAdjustment` set to zero.
pub fn head_checksum(data: &[u8]) -> Wrapping<u32> {
    let sum = table_checksum(data);
    let adjustment = data
        .get(HEAD_CHECKSUM_ADJUSTMENT..HEAD_CHECKSUM_ADJUSTMENT + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .unwrap_or(0);
    sum - Wrapping(adjustment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_checksum() {
        let data = [0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4];

        assert_eq!(table_checksum(&data), Wrapping(10));
    }

    #[test]
    fn test_table_checksum_overflow() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 2];

        assert_eq!(table_checksum(&data), Wrapping(1));
    }

    #[test]
    fn test_table_checksum_unaligned() {
        let data = [0, 0, 0, 1, 0x01];

        assert_eq!(table_checksum(&data), Wrapping(0x0100_0001));
    }

    #[test]
    fn test_head_checksum_skips_adjustment() {
        let mut data = [0u8; 12];
        data[3] = 5;
        data[8..12].copy_from_slice(&0xDEAD_BEEFu32.to_be_bytes());

        assert_eq!(head_checksum(&data), Wrapping(5));
    }
}
