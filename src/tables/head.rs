//! `head` table
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/head>

use bitflags::bitflags;
use log::warn;

use crate::binary::read::{ReadBinaryDep, ReadCtxt};
use crate::binary::{I16Be, I64Be, U16Be, U32Be};
use crate::error::ParseError;
use crate::options::ParseOptions;

pub const HEAD_MAGIC: u32 = 0x5F0F3CF5;
const HEAD_VERSION_1_0: u32 = 0x00010000;
/// Length of a version 1.0 `head` table.
pub const HEAD_LENGTH: usize = 54;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct MacStyle: u16 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const OUTLINE = 1 << 3;
        const SHADOW = 1 << 4;
        const CONDENSED = 1 << 5;
        const EXTENDED = 1 << 6;
    }
}

/// Bits 0-14 of `head.flags` are defined, bit 15 is reserved.
const RESERVED_FLAGS: u16 = 1 << 15;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IndexToLocFormat {
    Short,
    Long,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadTable {
    pub version: u32,
    pub font_revision: u32,
    pub flags: u16,
    pub units_per_em: u16,
    pub created: i64,
    pub modified: i64,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    /// Raw value. Use `HeadTable::mac_style` for the defined bits.
    pub mac_style: u16,
    pub lowest_rec_ppem: u16,
    pub font_direction_hint: i16,
    pub index_to_loc_format: IndexToLocFormat,
    pub glyph_data_format: i16,
}

impl ReadBinaryDep for HeadTable {
    type Args<'a> = ParseOptions;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, options: ParseOptions) -> Result<Self, ParseError> {
        if ctxt.remaining() < HEAD_LENGTH {
            return Err(ParseError::BadEof);
        }

        let mut version = ctxt.read::<U32Be>()?;
        if version >> 16 != 1 {
            warn!("head: repairing version 0x{:08x} to 1.0", version);
            version = HEAD_VERSION_1_0;
        }
        let font_revision = ctxt.read::<U32Be>()?;
        let _check_sum_adjustment = ctxt.read::<U32Be>()?;
        let magic_number = ctxt.read::<U32Be>()?;
        ctxt.check(magic_number == HEAD_MAGIC)?;
        let flags = ctxt.read::<U16Be>()?;
        let units_per_em = ctxt.read::<U16Be>()?;
        let created = ctxt.read::<I64Be>()?;
        let modified = ctxt.read::<I64Be>()?;
        let x_min = ctxt.read::<I16Be>()?;
        let y_min = ctxt.read::<I16Be>()?;
        let x_max = ctxt.read::<I16Be>()?;
        let y_max = ctxt.read::<I16Be>()?;
        let mac_style = ctxt.read::<U16Be>()?;
        let lowest_rec_ppem = ctxt.read::<U16Be>()?;
        let font_direction_hint = ctxt.read::<I16Be>()?;
        let index_to_loc_format = match ctxt.read::<I16Be>()? {
            0 => IndexToLocFormat::Short,
            1 => IndexToLocFormat::Long,
            _ => return Err(ParseError::BadValue),
        };
        let glyph_data_format = ctxt.read::<I16Be>()?;

        let mut suspect = Vec::new();
        if flags & RESERVED_FLAGS != 0 {
            suspect.push("reserved flags");
        }
        if MacStyle::from_bits(mac_style).is_none() {
            suspect.push("reserved macStyle bits");
        }
        if !(-2..=2).contains(&font_direction_hint) {
            suspect.push("fontDirectionHint");
        }
        if !suspect.is_empty() {
            if options.is_strict() {
                return Err(ParseError::BadValue);
            }
            warn!("head: ignoring invalid {}", suspect.join(", "));
        }

        Ok(HeadTable {
            version,
            font_revision,
            flags,
            units_per_em,
            created,
            modified,
            x_min,
            y_min,
            x_max,
            y_max,
            mac_style,
            lowest_rec_ppem,
            font_direction_hint,
            index_to_loc_format,
            glyph_data_format,
        })
    }
}

impl HeadTable {
    pub fn mac_style(&self) -> MacStyle {
        MacStyle::from_bits_truncate(self.mac_style)
    }
}
