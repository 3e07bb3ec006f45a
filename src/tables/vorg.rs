//! `VORG` vertical origin table
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/vorg>

use crate::binary::read::{ReadBinary, ReadCtxt};
use crate::binary::{I16Be, U16Be};
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VorgTable {
    pub default_vert_origin_y: i16,
    origins: Origins,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Origins {
    /// One entry per glyph from `first_glyph`, glyphs without a record hold the default.
    Dense { first_glyph: u16, origins: Vec<i16> },
    /// Records sorted by glyph.
    Sparse(Vec<(u16, i16)>),
}

impl ReadBinary for VorgTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let major_version = ctxt.read_u16be()?;
        let minor_version = ctxt.read_u16be()?;
        ctxt.check_version(major_version == 1 && minor_version == 0)?;
        let default_vert_origin_y = ctxt.read_i16be()?;
        let count = usize::from(ctxt.read_u16be()?);
        let records = ctxt.read_array::<(U16Be, I16Be)>(count)?;

        let increasing = records
            .iter()
            .zip(records.iter().skip(1))
            .all(|((a, _), (b, _))| a < b);
        ctxt.check(increasing)?;

        let origins = match (records.get_item(0), records.last()) {
            (Some((first, _)), Some((last, _))) => {
                let span = usize::from(last - first) + 1;
                // Use a dense array when it is no bigger than the records themselves
                if span * 2 <= count * 4 {
                    let mut origins = vec![default_vert_origin_y; span];
                    for (glyph, origin) in &records {
                        origins[usize::from(glyph - first)] = origin;
                    }
                    Origins::Dense {
                        first_glyph: first,
                        origins,
                    }
                } else {
                    Origins::Sparse(records.to_vec())
                }
            }
            _ => Origins::Sparse(Vec::new()),
        };

        Ok(VorgTable {
            default_vert_origin_y,
            origins,
        })
    }
}

impl VorgTable {
    pub fn vertical_origin(&self, glyph_id: u16) -> i16 {
        let origin = match &self.origins {
            Origins::Dense {
                first_glyph,
                origins,
            } => glyph_id
                .checked_sub(*first_glyph)
                .and_then(|index| origins.get(usize::from(index)))
                .copied(),
            Origins::Sparse(records) => records
                .binary_search_by_key(&glyph_id, |&(glyph, _)| glyph)
                .ok()
                .map(|index| records[index].1),
        };
        origin.unwrap_or(self.default_vert_origin_y)
    }

    fn is_dense(&self) -> bool {
        matches!(self.origins, Origins::Dense { .. })
    }
}
