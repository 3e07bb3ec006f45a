//! Horizontal and vertical metrics.
//!
//! `hhea` and `vhea` share a layout, as do `hmtx` and `vmtx`, so each pair is decoded by one
//! reader. The metrics readers depend on the header's long metric count and on the glyph count
//! from `maxp`.
//!
//! * <https://docs.microsoft.com/en-us/typography/opentype/spec/hhea>
//! * <https://docs.microsoft.com/en-us/typography/opentype/spec/hmtx>
//! * <https://docs.microsoft.com/en-us/typography/opentype/spec/vhea>
//! * <https://docs.microsoft.com/en-us/typography/opentype/spec/vmtx>

use log::warn;

use crate::binary::read::{ReadBinary, ReadBinaryDep, ReadCtxt, ReadFrom};
use crate::binary::{I16Be, U16Be};
use crate::error::ParseError;
use crate::tag::DisplayTag;

const XHEA_LENGTH: usize = 36;

/// `hhea` or `vhea`. For `vhea` the ascender and descender are the vertical typo line values
/// and `advance_max` is the maximum advance height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XHeaderTable {
    pub version: u32,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub advance_max: u16,
    pub min_leading_bearing: i16,
    pub min_trailing_bearing: i16,
    pub max_extent: i16,
    pub caret_slope_rise: i16,
    pub caret_slope_run: i16,
    pub caret_offset: i16,
    pub num_long_metrics: u16,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LongMetric {
    pub advance: u16,
    pub bearing: i16,
}

/// `hmtx` or `vmtx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XMetricsTable {
    pub long_metrics: Vec<LongMetric>,
    /// Bearings of the glyphs after the last long metric.
    pub bearings: Vec<i16>,
    num_glyphs: u16,
}

/// Arguments for reading an X-metrics table.
#[derive(Debug, Copy, Clone)]
pub struct XMetricsArgs {
    pub tag: u32,
    pub num_glyphs: u16,
    pub num_long_metrics: u16,
}

impl ReadBinary for XHeaderTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        if ctxt.remaining() < XHEA_LENGTH {
            return Err(ParseError::BadEof);
        }
        let version = ctxt.read_u32be()?;
        ctxt.check_version(version >> 16 == 1)?;
        let ascender = ctxt.read_i16be()?;
        let descender = ctxt.read_i16be()?;
        let line_gap = ctxt.read_i16be()?;
        let advance_max = ctxt.read_u16be()?;
        let min_leading_bearing = ctxt.read_i16be()?;
        let min_trailing_bearing = ctxt.read_i16be()?;
        let max_extent = ctxt.read_i16be()?;
        let caret_slope_rise = ctxt.read_i16be()?;
        let caret_slope_run = ctxt.read_i16be()?;
        let caret_offset = ctxt.read_i16be()?;
        ctxt.skip(4 * 2)?; // reserved
        let metric_data_format = ctxt.read_i16be()?;
        ctxt.check(metric_data_format == 0)?;
        let num_long_metrics = ctxt.read_u16be()?;

        Ok(XHeaderTable {
            version,
            ascender,
            descender,
            line_gap,
            advance_max,
            min_leading_bearing,
            min_trailing_bearing,
            max_extent,
            caret_slope_rise,
            caret_slope_run,
            caret_offset,
            num_long_metrics,
        })
    }
}

impl ReadFrom for LongMetric {
    type ReadType = (U16Be, I16Be);
    fn read_from((advance, bearing): (u16, i16)) -> Self {
        LongMetric { advance, bearing }
    }
}

impl ReadBinaryDep for XMetricsTable {
    type Args<'a> = XMetricsArgs;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, args: XMetricsArgs) -> Result<Self, ParseError> {
        let num_glyphs = usize::from(args.num_glyphs);
        let num_long = usize::from(args.num_long_metrics);
        if num_long == 0 && num_glyphs > 0 {
            return Err(ParseError::BadValue);
        }

        let long_metrics = ctxt.read_array::<LongMetric>(num_long)?.to_vec();
        let wanted = num_glyphs.saturating_sub(num_long);
        let bearings = ctxt.read_array_upto::<I16Be>(wanted)?.to_vec();
        if bearings.len() < wanted {
            warn!(
                "{}: {} side bearings missing",
                DisplayTag(args.tag),
                wanted - bearings.len()
            );
        }

        Ok(XMetricsTable {
            long_metrics,
            bearings,
            num_glyphs: args.num_glyphs,
        })
    }
}

impl XMetricsTable {
    /// Advance of `glyph_id`. Glyphs past the last long metric share its advance.
    pub fn advance(&self, glyph_id: u16) -> Option<u16> {
        if glyph_id >= self.num_glyphs {
            return None;
        }
        self.long_metrics
            .get(usize::from(glyph_id))
            .or_else(|| self.long_metrics.last())
            .map(|metric| metric.advance)
    }

    /// Leading side bearing of `glyph_id`. Bearings missing from a truncated table read as 0.
    pub fn bearing(&self, glyph_id: u16) -> Option<i16> {
        if glyph_id >= self.num_glyphs {
            return None;
        }
        let index = usize::from(glyph_id);
        match self.long_metrics.get(index) {
            Some(metric) => Some(metric.bearing),
            None => {
                let index = index - self.long_metrics.len();
                Some(self.bearings.get(index).copied().unwrap_or(0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::tag;
    use crate::tests::{xhea_table, xmtx_table};

    fn args(num_glyphs: u16, num_long_metrics: u16) -> XMetricsArgs {
        XMetricsArgs {
            tag: tag::HMTX,
            num_glyphs,
            num_long_metrics,
        }
    }

    #[test]
    fn test_read_xhea() {
        let hhea = ReadScope::new(&xhea_table(3)).read::<XHeaderTable>().unwrap();
        assert_eq!(hhea.num_long_metrics, 3);
        assert_eq!(hhea.ascender, 800);
        assert_eq!(hhea.descender, -200);
    }

    #[test]
    fn test_xhea_bad_metric_format() {
        let mut data = xhea_table(3);
        data[33] = 1;
        assert_eq!(
            ReadScope::new(&data).read::<XHeaderTable>(),
            Err(ParseError::BadValue)
        );
    }

    #[test]
    fn test_last_advance_repeats() {
        let data = xmtx_table(&[(500, 10), (600, 20)], &[30, 40]);
        let hmtx = ReadScope::new(&data)
            .read_dep::<XMetricsTable>(args(4, 2))
            .unwrap();
        assert_eq!(hmtx.advance(0), Some(500));
        assert_eq!(hmtx.advance(1), Some(600));
        assert_eq!(hmtx.advance(3), Some(600));
        assert_eq!(hmtx.advance(4), None);
        assert_eq!(hmtx.bearing(3), Some(40));
    }

    #[test]
    fn test_truncated_bearings_tolerated() {
        let data = xmtx_table(&[(500, 10)], &[30]);
        let hmtx = ReadScope::new(&data)
            .read_dep::<XMetricsTable>(args(4, 1))
            .unwrap();
        assert_eq!(hmtx.bearing(1), Some(30));
        assert_eq!(hmtx.bearing(3), Some(0));
        assert_eq!(hmtx.advance(3), Some(500));
    }

    #[test]
    fn test_truncated_long_metrics_rejected() {
        let data = xmtx_table(&[(500, 10)], &[]);
        assert_eq!(
            ReadScope::new(&data).read_dep::<XMetricsTable>(args(4, 2)),
            Err(ParseError::BadEof)
        );
    }
}
