//! Four byte table, script, language and feature tags.

use std::fmt;

/// Generate a 4-byte font table tag from byte string
///
/// Example:
///
/// ```
/// use sfnt_cid::tag;
/// assert_eq!(tag!(b"glyf"), 0x676C7966);
/// ```
#[macro_export]
macro_rules! tag {
    ($w:expr) => {
        $crate::tag::from_bytes(*$w)
    };
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub struct DisplayTag(pub u32);

pub const fn from_bytes(chars: [u8; 4]) -> u32 {
    u32::from_be_bytes(chars)
}

impl fmt::Display for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        if bytes.iter().any(|b| !b.is_ascii() || b.is_ascii_control()) {
            write!(f, "0x{:08x}", self.0)
        } else {
            bytes.iter().map(|&b| char::from(b)).collect::<String>().fmt(f)
        }
    }
}

impl fmt::Debug for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_string().fmt(f)
    }
}

// Tables
pub const CMAP: u32 = tag!(b"cmap");
pub const GSUB: u32 = tag!(b"GSUB");
pub const HEAD: u32 = tag!(b"head");
pub const HHEA: u32 = tag!(b"hhea");
pub const HMTX: u32 = tag!(b"hmtx");
pub const MAXP: u32 = tag!(b"maxp");
pub const NAME: u32 = tag!(b"name");
pub const OS_2: u32 = tag!(b"OS/2");
pub const POST: u32 = tag!(b"post");
pub const VHEA: u32 = tag!(b"vhea");
pub const VMTX: u32 = tag!(b"vmtx");
pub const VORG: u32 = tag!(b"VORG");

// sfnt versions and collection marker
pub const OTTO: u32 = tag!(b"OTTO");
pub const TRUE: u32 = tag!(b"true");
pub const TTCF: u32 = tag!(b"ttcf");

// Scripts, languages and features used by the vertical substitution pass
pub const DFLT: u32 = tag!(b"DFLT");
pub const JAN: u32 = tag!(b"JAN ");
pub const KANA: u32 = tag!(b"kana");
pub const VERT: u32 = tag!(b"vert");
pub const VRT2: u32 = tag!(b"vrt2");
