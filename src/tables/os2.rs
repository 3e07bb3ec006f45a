//! `OS/2` table
//!
//! Only the fields needed to identify a font's character repertoire are decoded.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/os2>

use bitflags::bitflags;

use crate::binary::read::{ReadBinary, ReadCtxt};
use crate::error::ParseError;

/// Offset of `ulUnicodeRange1`.
const UNICODE_RANGE_OFFSET: usize = 42;
/// Offset of `sTypoAscender`.
const TYPO_OFFSET: usize = 68;
/// Offset of `ulCodePageRange1`.
const CODE_PAGE_OFFSET: usize = 78;
/// Length of a version 1 table.
const VERSION_1_LENGTH: usize = 86;

bitflags! {
    /// `ulCodePageRange1` bits for the East Asian code pages.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct CodePage1: u32 {
        const JIS_JAPAN = 1 << 17;
        const CHINESE_SIMPLIFIED = 1 << 18;
        const KOREAN_WANSUNG = 1 << 19;
        const CHINESE_TRADITIONAL = 1 << 20;
        const KOREAN_JOHAB = 1 << 21;
        const _ = !0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Os2 {
    pub version: u16,
    pub ul_unicode_range: [u32; 4],
    pub s_typo_ascender: i16,
    pub s_typo_descender: i16,
    /// Zero when the table predates code page ranges.
    pub ul_code_page_range: [u32; 2],
    partial: bool,
}

impl ReadBinary for Os2 {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let table = ctxt.scope();
        let length = table.len();
        let version = ctxt.read_u16be()?;

        let mut ranges = table
            .offset_length(UNICODE_RANGE_OFFSET, 16)
            .map_err(|_| ParseError::BadEof)?
            .ctxt();
        let ul_unicode_range = [
            ranges.read_u32be()?,
            ranges.read_u32be()?,
            ranges.read_u32be()?,
            ranges.read_u32be()?,
        ];

        // Apple's version 0 stops at usLastCharIndex
        let (s_typo_ascender, s_typo_descender) = match table.offset_length(TYPO_OFFSET, 4) {
            Ok(scope) => {
                let mut typo = scope.ctxt();
                (typo.read_i16be()?, typo.read_i16be()?)
            }
            Err(_) => (0, 0),
        };

        let (ul_code_page_range, partial) = if version >= 1 && length >= VERSION_1_LENGTH {
            let mut pages = table.offset(CODE_PAGE_OFFSET).ctxt();
            ([pages.read_u32be()?, pages.read_u32be()?], false)
        } else {
            ([0, 0], true)
        };

        Ok(Os2 {
            version,
            ul_unicode_range,
            s_typo_ascender,
            s_typo_descender,
            ul_code_page_range,
            partial,
        })
    }
}

impl Os2 {
    /// Whether the code page ranges were missing from the table.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn code_page1(&self) -> CodePage1 {
        CodePage1::from_bits_retain(self.ul_code_page_range[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::tests::os2_table;

    #[test]
    fn test_version_1() {
        let os2 = ReadScope::new(&os2_table(1, 1 << 17))
            .read::<Os2>()
            .unwrap();
        assert!(!os2.is_partial());
        assert_eq!(os2.code_page1(), CodePage1::JIS_JAPAN);
        assert_eq!(os2.ul_unicode_range, [1, 0, 0, 0]);
        assert_eq!((os2.s_typo_ascender, os2.s_typo_descender), (880, -120));
    }

    #[test]
    fn test_version_0_is_partial() {
        let os2 = ReadScope::new(&os2_table(0, 0)).read::<Os2>().unwrap();
        assert!(os2.is_partial());
        assert_eq!(os2.ul_code_page_range, [0, 0]);
        assert_eq!(os2.s_typo_ascender, 880);
    }

    #[test]
    fn test_short_version_1_is_partial() {
        let data = os2_table(1, 1 << 18);
        let os2 = ReadScope::new(&data[..80]).read::<Os2>().unwrap();
        assert!(os2.is_partial());
        assert!(os2.code_page1().is_empty());
    }

    #[test]
    fn test_apple_short_version_0() {
        let data = os2_table(0, 0);
        let os2 = ReadScope::new(&data[..68]).read::<Os2>().unwrap();
        assert_eq!(os2.s_typo_ascender, 0);
    }

    #[test]
    fn test_too_short_for_unicode_ranges() {
        let data = os2_table(1, 0);
        assert_eq!(
            ReadScope::new(&data[..50]).read::<Os2>(),
            Err(ParseError::BadEof)
        );
    }
}
