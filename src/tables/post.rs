//! `post` table
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/post>

use std::borrow::Cow;

use encoding_rs::MACINTOSH;
use log::warn;

use crate::binary::read::{ReadBinary, ReadCtxt};
use crate::binary::{I16Be, I32Be, I8, U16Be, U32Be};
use crate::error::ParseError;

pub const POST_FORMAT_1_0: u32 = 0x00010000;
pub const POST_FORMAT_2_0: u32 = 0x00020000;
/// Format 2.5 as written by most tools.
pub const POST_FORMAT_2_5: u32 = 0x00025000;
/// Format 2.5 as a correctly encoded Fixed value.
pub const POST_FORMAT_2_5_FIXED: u32 = 0x00028000;
pub const POST_FORMAT_3_0: u32 = 0x00030000;
pub const POST_FORMAT_4_0: u32 = 0x00040000;
/// Length of the header shared by every format.
pub const POST_HEADER_LENGTH: usize = 32;

/// Format 4.0 code that marks a glyph with no character.
const NO_CHARACTER: u16 = 0xFFFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTable {
    pub header: Header,
    pub names: GlyphNames,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Format, after any repair.
    pub version: u32,
    pub italic_angle: i32,
    pub underline_position: i16,
    pub underline_thickness: i16,
    pub is_fixed_pitch: u32,
    pub min_mem_type_42: u32,
    pub max_mem_type_42: u32,
    pub min_mem_type_1: u32,
    pub max_mem_type_1: u32,
}

/// Glyph naming scheme of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlyphNames {
    /// Format 1.0: glyphs are named by the standard Macintosh ordering.
    Standard,
    /// Format 2.0: per glyph indices into the standard names followed by `strings`.
    Indexed {
        indices: Vec<u16>,
        strings: Vec<String>,
    },
    /// Format 2.5: per glyph offsets into the standard names.
    Offsets(Vec<i8>),
    /// Format 3.0: no names.
    None,
    /// Format 4.0: per glyph character codes.
    CharacterCodes(Vec<u16>),
}

impl ReadBinary for Header {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        Ok(Header {
            version: ctxt.read::<U32Be>()?,
            italic_angle: ctxt.read::<I32Be>()?,
            underline_position: ctxt.read::<I16Be>()?,
            underline_thickness: ctxt.read::<I16Be>()?,
            is_fixed_pitch: ctxt.read::<U32Be>()?,
            min_mem_type_42: ctxt.read::<U32Be>()?,
            max_mem_type_42: ctxt.read::<U32Be>()?,
            min_mem_type_1: ctxt.read::<U32Be>()?,
            max_mem_type_1: ctxt.read::<U32Be>()?,
        })
    }
}

impl ReadBinary for PostTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let mut header = ctxt.read::<Header>()?;
        let names = match header.version {
            POST_FORMAT_1_0 => GlyphNames::Standard,
            POST_FORMAT_2_0 => read_indexed_names(ctxt)?,
            POST_FORMAT_2_5 | POST_FORMAT_2_5_FIXED => {
                let num_glyphs = usize::from(ctxt.read_u16be()?);
                let offsets = ctxt.read_array::<I8>(num_glyphs)?.to_vec();
                GlyphNames::Offsets(offsets)
            }
            POST_FORMAT_3_0 => GlyphNames::None,
            POST_FORMAT_4_0 => {
                let num_codes = ctxt.remaining() / 2;
                GlyphNames::CharacterCodes(ctxt.read_array::<U16Be>(num_codes)?.to_vec())
            }
            version if !ctxt.bytes_available() => {
                warn!("post: treating unknown format 0x{:08x} as 3.0", version);
                header.version = POST_FORMAT_3_0;
                GlyphNames::None
            }
            _ => return Err(ParseError::BadVersion),
        };

        Ok(PostTable { header, names })
    }
}

fn read_indexed_names(ctxt: &mut ReadCtxt<'_>) -> Result<GlyphNames, ParseError> {
    let num_glyphs = usize::from(ctxt.read_u16be()?);
    let indices = ctxt.read_array::<U16Be>(num_glyphs)?.to_vec();

    // Indices may repeat and need not be in order, so read as many strings as the largest
    // index requires
    let num_strings = indices
        .iter()
        .map(|&index| usize::from(index))
        .filter(|&index| index >= STANDARD_NAMES.len())
        .max()
        .map_or(0, |index| index - STANDARD_NAMES.len() + 1);
    let mut strings = Vec::with_capacity(num_strings);
    for _ in 0..num_strings {
        let length = ctxt.read_u8().map_err(|_| ParseError::BadIndex)?;
        let bytes = ctxt
            .read_slice(usize::from(length))
            .map_err(|_| ParseError::BadIndex)?;
        let (name, _had_errors) = MACINTOSH.decode_without_bom_handling(bytes);
        strings.push(name.into_owned());
    }

    Ok(GlyphNames::Indexed { indices, strings })
}

impl PostTable {
    pub fn is_fixed_pitch(&self) -> bool {
        self.header.is_fixed_pitch != 0
    }

    /// The PostScript name of `glyph_index`, if the table provides one.
    pub fn glyph_name(&self, glyph_index: u16) -> Option<Cow<'_, str>> {
        let glyph = usize::from(glyph_index);
        match &self.names {
            GlyphNames::Standard => STANDARD_NAMES.get(glyph).map(|&name| Cow::Borrowed(name)),
            GlyphNames::Indexed { indices, strings } => {
                let index = usize::from(*indices.get(glyph)?);
                match index.checked_sub(STANDARD_NAMES.len()) {
                    None => Some(Cow::Borrowed(STANDARD_NAMES[index])),
                    Some(index) => strings.get(index).map(|name| Cow::Borrowed(name.as_str())),
                }
            }
            GlyphNames::Offsets(offsets) => {
                let offset = *offsets.get(glyph)?;
                // 16-bit arithmetic, a negative offset past zero wraps to a large index
                let index = glyph_index.wrapping_add(offset as i16 as u16);
                STANDARD_NAMES
                    .get(usize::from(index))
                    .map(|&name| Cow::Borrowed(name))
            }
            GlyphNames::None => None,
            GlyphNames::CharacterCodes(codes) => match *codes.get(glyph)? {
                NO_CHARACTER => None,
                code => Some(Cow::Owned(format!("a{:04X}", code))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::tests::{post_table, u16s};
    use regex::Regex;

    fn read(data: &[u8]) -> Result<PostTable, ParseError> {
        ReadScope::new(data).read::<PostTable>()
    }

    #[test]
    fn test_format_1() {
        let post = read(&post_table(POST_FORMAT_1_0, &[])).unwrap();
        assert_eq!(post.glyph_name(36).as_deref(), Some("A"));
        assert_eq!(post.glyph_name(258), None);
    }

    #[test]
    fn test_format_2_with_duplicates() {
        let mut tail = u16s(&[4, 0, 259, 258, 259]);
        tail.extend(b"\x03foo\x03bar");
        let post = read(&post_table(POST_FORMAT_2_0, &tail)).unwrap();
        assert_eq!(post.glyph_name(0).as_deref(), Some(".notdef"));
        assert_eq!(post.glyph_name(1).as_deref(), Some("bar"));
        assert_eq!(post.glyph_name(2).as_deref(), Some("foo"));
        assert_eq!(post.glyph_name(3).as_deref(), Some("bar"));
        assert_eq!(post.glyph_name(4), None);
    }

    #[test]
    fn test_format_2_names_are_mac_roman() {
        let mut tail = u16s(&[1, 258]);
        tail.extend(b"\x04caf\x8E");
        let post = read(&post_table(POST_FORMAT_2_0, &tail)).unwrap();
        assert_eq!(post.glyph_name(0).as_deref(), Some("caf\u{e9}"));
    }

    #[test]
    fn test_format_2_index_past_strings() {
        let mut tail = u16s(&[1, 260]);
        tail.extend(b"\x03foo");
        assert_eq!(
            read(&post_table(POST_FORMAT_2_0, &tail)),
            Err(ParseError::BadIndex)
        );
    }

    #[test]
    fn test_format_2_5_wraps() {
        // glyph 1 with offset -2 wraps to 0xFFFF, which has no standard name
        let tail = [0, 3, 0, 0xFE, 2];
        for version in [POST_FORMAT_2_5, POST_FORMAT_2_5_FIXED] {
            let post = read(&post_table(version, &tail)).unwrap();
            assert_eq!(post.glyph_name(0).as_deref(), Some(".notdef"));
            assert_eq!(post.glyph_name(1), None);
            assert_eq!(post.glyph_name(2).as_deref(), Some("exclam"));
        }
    }

    #[test]
    fn test_format_4_names() {
        let post = read(&post_table(POST_FORMAT_4_0, &u16s(&[0x8140, 0xFFFF, 0x41]))).unwrap();
        let pattern = Regex::new("^a[0-9A-F]{4}$").unwrap();
        let name = post.glyph_name(0).unwrap();
        assert!(pattern.is_match(&name));
        assert_eq!(name, "a8140");
        assert_eq!(post.glyph_name(1), None);
        assert_eq!(post.glyph_name(2).as_deref(), Some("a0041"));
    }

    #[test]
    fn test_unknown_format_without_data_repaired() {
        let post = read(&post_table(0x00050000, &[])).unwrap();
        assert_eq!(post.header.version, POST_FORMAT_3_0);
        assert_eq!(post.names, GlyphNames::None);
    }

    #[test]
    fn test_unknown_format_with_data_rejected() {
        assert_eq!(
            read(&post_table(0x00050000, &[0, 0])),
            Err(ParseError::BadVersion)
        );
    }
}

pub static STANDARD_NAMES: [&str; 258] = [
    ".notdef",
    ".null",
    "nonmarkingreturn",
    "space",
    "exclam",
    "quotedbl",
    "numbersign",
    "dollar",
    "percent",
    "ampersand",
    "quotesingle",
    "parenleft",
    "parenright",
    "asterisk",
    "plus",
    "comma",
    "hyphen",
    "period",
    "slash",
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "colon",
    "semicolon",
    "less",
    "equal",
    "greater",
    "question",
    "at",
    "A",
    "B",
    "C",
    "D",
    "E",
    "F",
    "G",
    "H",
    "I",
    "J",
    "K",
    "L",
    "M",
    "N",
    "O",
    "P",
    "Q",
    "R",
    "S",
    "T",
    "U",
    "V",
    "W",
    "X",
    "Y",
    "Z",
    "bracketleft",
    "backslash",
    "bracketright",
    "asciicircum",
    "underscore",
    "grave",
    "a",
    "b",
    "c",
    "d",
    "e",
    "f",
    "g",
    "h",
    "i",
    "j",
    "k",
    "l",
    "m",
    "n",
    "o",
    "p",
    "q",
    "r",
    "s",
    "t",
    "u",
    "v",
    "w",
    "x",
    "y",
    "z",
    "braceleft",
    "bar",
    "braceright",
    "asciitilde",
    "Adieresis",
    "Aring",
    "Ccedilla",
    "Eacute",
    "Ntilde",
    "Odieresis",
    "Udieresis",
    "aacute",
    "agrave",
    "acircumflex",
    "adieresis",
    "atilde",
    "aring",
    "ccedilla",
    "eacute",
    "egrave",
    "ecircumflex",
    "edieresis",
    "iacute",
    "igrave",
    "icircumflex",
    "idieresis",
    "ntilde",
    "oacute",
    "ograve",
    "ocircumflex",
    "odieresis",
    "otilde",
    "uacute",
    "ugrave",
    "ucircumflex",
    "udieresis",
    "dagger",
    "degree",
    "cent",
    "sterling",
    "section",
    "bullet",
    "paragraph",
    "germandbls",
    "registered",
    "copyright",
    "trademark",
    "acute",
    "dieresis",
    "notequal",
    "AE",
    "Oslash",
    "infinity",
    "plusminus",
    "lessequal",
    "greaterequal",
    "yen",
    "mu",
    "partialdiff",
    "summation",
    "product",
    "pi",
    "integral",
    "ordfeminine",
    "ordmasculine",
    "Omega",
    "ae",
    "oslash",
    "questiondown",
    "exclamdown",
    "logicalnot",
    "radical",
    "florin",
    "approxequal",
    "Delta",
    "guillemotleft",
    "guillemotright",
    "ellipsis",
    "nonbreakingspace",
    "Agrave",
    "Atilde",
    "Otilde",
    "OE",
    "oe",
    "endash",
    "emdash",
    "quotedblleft",
    "quotedblright",
    "quoteleft",
    "quoteright",
    "divide",
    "lozenge",
    "ydieresis",
    "Ydieresis",
    "fraction",
    "currency",
    "guilsinglleft",
    "guilsinglright",
    "fi",
    "fl",
    "daggerdbl",
    "periodcentered",
    "quotesinglbase",
    "quotedblbase",
    "perthousand",
    "Acircumflex",
    "Ecircumflex",
    "Aacute",
    "Edieresis",
    "Egrave",
    "Iacute",
    "Icircumflex",
    "Idieresis",
    "Igrave",
    "Oacute",
    "Ocircumflex",
    "apple",
    "Ograve",
    "Uacute",
    "Ucircumflex",
    "Ugrave",
    "dotlessi",
    "circumflex",
    "tilde",
    "macron",
    "breve",
    "dotaccent",
    "ring",
    "cedilla",
    "hungarumlaut",
    "ogonek",
    "caron",
    "Lslash",
    "lslash",
    "Scaron",
    "scaron",
    "Zcaron",
    "zcaron",
    "brokenbar",
    "Eth",
    "eth",
    "Yacute",
    "yacute",
    "Thorn",
    "thorn",
    "minus",
    "multiply",
    "onesuperior",
    "twosuperior",
    "threesuperior",
    "onehalf",
    "onequarter",
    "threequarters",
    "franc",
    "Gbreve",
    "gbreve",
    "Idotaccent",
    "Scedilla",
    "scedilla",
    "Cacute",
    "cacute",
    "Ccaron",
    "ccaron",
    "dcroat",
];
