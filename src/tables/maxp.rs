//! `maxp` table
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/maxp>

use crate::binary::read::{ReadBinary, ReadCtxt};
use crate::error::ParseError;

pub const MAXP_VERSION_0_5: u32 = 0x00005000;
pub const MAXP_VERSION_1_0: u32 = 0x00010000;
/// version + numGlyphs
pub const MAXP_MIN_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxpTable {
    pub version: u32,
    pub num_glyphs: u16,
    /// Extra fields, present if the table is version 1.0 and long enough to hold them.
    pub version1_sub_table: Option<MaxpVersion1SubTable>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxpVersion1SubTable {
    pub max_points: u16,
    pub max_contours: u16,
    pub max_composite_points: u16,
    pub max_composite_contours: u16,
    pub max_zones: u16,
    pub max_twilight_points: u16,
    pub max_storage: u16,
    pub max_function_defs: u16,
    pub max_instruction_defs: u16,
    pub max_stack_elements: u16,
    pub max_size_of_instructions: u16,
    pub max_component_elements: u16,
    pub max_component_depth: u16,
}

impl ReadBinary for MaxpTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        if ctxt.remaining() < MAXP_MIN_LENGTH {
            return Err(ParseError::BadEof);
        }
        let version = ctxt.read_u32be()?;
        ctxt.check_version(version == MAXP_VERSION_0_5 || version == MAXP_VERSION_1_0)?;
        let num_glyphs = ctxt.read_u16be()?;

        // Some fonts claim version 1.0 with a truncated table, keep the glyph count
        let version1_sub_table = if version == MAXP_VERSION_1_0 {
            ctxt.clone().read::<MaxpVersion1SubTable>().ok()
        } else {
            None
        };

        Ok(MaxpTable {
            version,
            num_glyphs,
            version1_sub_table,
        })
    }
}

impl ReadBinary for MaxpVersion1SubTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        Ok(MaxpVersion1SubTable {
            max_points: ctxt.read_u16be()?,
            max_contours: ctxt.read_u16be()?,
            max_composite_points: ctxt.read_u16be()?,
            max_composite_contours: ctxt.read_u16be()?,
            max_zones: ctxt.read_u16be()?,
            max_twilight_points: ctxt.read_u16be()?,
            max_storage: ctxt.read_u16be()?,
            max_function_defs: ctxt.read_u16be()?,
            max_instruction_defs: ctxt.read_u16be()?,
            max_stack_elements: ctxt.read_u16be()?,
            max_size_of_instructions: ctxt.read_u16be()?,
            max_component_elements: ctxt.read_u16be()?,
            max_component_depth: ctxt.read_u16be()?,
        })
    }
}

impl MaxpTable {
    /// A version 1.0 table that was too short for its extra fields.
    pub fn is_partial(&self) -> bool {
        self.version == MAXP_VERSION_1_0 && self.version1_sub_table.is_none()
    }
}
