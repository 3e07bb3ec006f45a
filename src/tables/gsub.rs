//! Vertical form substitutions from the `GSUB` table.
//!
//! Only the path needed to find the vertical alternates of a CJK font is followed: the `kana`
//! (or default) script, the `JAN ` (or default) language system, the `vrt2` or `vert` feature
//! and its single substitution lookups.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/gsub>

use crate::binary::read::{ReadBinary, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::{U16Be, U32Be};
use crate::error::ParseError;
use crate::tag;

const NO_REQUIRED_FEATURE: u16 = 0xFFFF;

const SINGLE_SUBSTITUTION: u16 = 1;
const EXTENSION_SUBSTITUTION: u16 = 7;

#[derive(Debug, Copy, Clone)]
struct TagRecord {
    tag: u32,
    offset: u16,
}

impl ReadFrom for TagRecord {
    type ReadType = (U32Be, U16Be);
    fn read_from((tag, offset): (u32, u16)) -> Self {
        TagRecord { tag, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    Format1 { glyph_array: Vec<u16> },
    Format2 { coverage_range_array: Vec<CoverageRangeRecord> },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CoverageRangeRecord {
    start_glyph: u16,
    end_glyph: u16,
    start_coverage_index: u16,
}

impl ReadFrom for CoverageRangeRecord {
    type ReadType = (U16Be, U16Be, U16Be);
    fn read_from((start_glyph, end_glyph, start_coverage_index): (u16, u16, u16)) -> Self {
        CoverageRangeRecord {
            start_glyph,
            end_glyph,
            start_coverage_index,
        }
    }
}

impl ReadBinary for Coverage {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        match ctxt.read_u16be()? {
            1 => {
                let glyph_count = usize::from(ctxt.read_u16be()?);
                let glyph_array = ctxt.read_array::<U16Be>(glyph_count)?.to_vec();
                Ok(Coverage::Format1 { glyph_array })
            }
            2 => {
                let range_count = usize::from(ctxt.read_u16be()?);
                let coverage_range_array = ctxt
                    .read_array::<CoverageRangeRecord>(range_count)?
                    .to_vec();
                for record in &coverage_range_array {
                    ctxt.check(record.start_glyph <= record.end_glyph)?;
                }
                Ok(Coverage::Format2 {
                    coverage_range_array,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl Coverage {
    /// Covered glyphs with their coverage index.
    pub fn glyphs(&self) -> Vec<(u16, usize)> {
        match self {
            Coverage::Format1 { glyph_array } => glyph_array
                .iter()
                .enumerate()
                .map(|(index, &glyph)| (glyph, index))
                .collect(),
            Coverage::Format2 {
                coverage_range_array,
            } => coverage_range_array
                .iter()
                .flat_map(|record| {
                    (record.start_glyph..=record.end_glyph).map(move |glyph| {
                        let index = usize::from(record.start_coverage_index)
                            + usize::from(glyph - record.start_glyph);
                        (glyph, index)
                    })
                })
                .collect(),
        }
    }
}

/// `(glyph, vertical glyph)` pairs from the vertical substitution feature, in lookup order.
///
/// A font without the script, language system or feature has no pairs.
pub fn vertical_substitutions(scope: ReadScope<'_>) -> Result<Vec<(u16, u16)>, ParseError> {
    let mut ctxt = scope.ctxt();
    let major_version = ctxt.read_u16be()?;
    ctxt.check_version(major_version == 1)?;
    let _minor_version = ctxt.read_u16be()?;
    let script_list_offset = usize::from(ctxt.read_u16be()?);
    let feature_list_offset = usize::from(ctxt.read_u16be()?);
    let lookup_list_offset = usize::from(ctxt.read_u16be()?);

    let script_list = scope.offset(script_list_offset);
    let scripts = read_tag_records(script_list)?;
    let script = match find_tag(&scripts, tag::KANA).or_else(|| find_tag(&scripts, tag::DFLT)) {
        Some(record) => script_list.offset(usize::from(record.offset)),
        None => return Ok(Vec::new()),
    };

    let mut ctxt = script.ctxt();
    let default_langsys_offset = usize::from(ctxt.read_u16be()?);
    let langsys_count = usize::from(ctxt.read_u16be()?);
    let langsys_records = ctxt.read_array::<TagRecord>(langsys_count)?.to_vec();
    let langsys = match find_tag(&langsys_records, tag::JAN) {
        Some(record) => script.offset(usize::from(record.offset)),
        None if default_langsys_offset != 0 => script.offset(default_langsys_offset),
        None => return Ok(Vec::new()),
    };

    let mut ctxt = langsys.ctxt();
    let _lookup_order = ctxt.read_u16be()?;
    let required_feature_index = ctxt.read_u16be()?;
    let feature_index_count = usize::from(ctxt.read_u16be()?);
    let feature_indices = ctxt.read_array::<U16Be>(feature_index_count)?;

    let feature_list = scope.offset(feature_list_offset);
    let features = read_tag_records(feature_list)?;
    let candidates = Some(required_feature_index)
        .filter(|&index| index != NO_REQUIRED_FEATURE)
        .into_iter()
        .chain(feature_indices.iter())
        .map(|index| {
            features
                .get(usize::from(index))
                .copied()
                .ok_or(ParseError::BadIndex)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let feature = find_tag(&candidates, tag::VRT2).or_else(|| find_tag(&candidates, tag::VERT));
    let feature = match feature {
        Some(record) => feature_list.offset(usize::from(record.offset)),
        None => return Ok(Vec::new()),
    };

    let mut ctxt = feature.ctxt();
    let _feature_params = ctxt.read_u16be()?;
    let lookup_index_count = usize::from(ctxt.read_u16be()?);
    let lookup_indices = ctxt.read_array::<U16Be>(lookup_index_count)?;

    let lookup_list = scope.offset(lookup_list_offset);
    let mut ctxt = lookup_list.ctxt();
    let lookup_count = usize::from(ctxt.read_u16be()?);
    let lookup_offsets = ctxt.read_array::<U16Be>(lookup_count)?;

    let mut pairs = Vec::new();
    for lookup_index in &lookup_indices {
        let lookup_offset = lookup_offsets.read_item(usize::from(lookup_index))?;
        read_lookup(lookup_list.offset(usize::from(lookup_offset)), &mut pairs)?;
    }
    Ok(pairs)
}

fn read_tag_records(scope: ReadScope<'_>) -> Result<Vec<TagRecord>, ParseError> {
    let mut ctxt = scope.ctxt();
    let count = usize::from(ctxt.read_u16be()?);
    Ok(ctxt.read_array::<TagRecord>(count)?.to_vec())
}

fn find_tag(records: &[TagRecord], tag: u32) -> Option<TagRecord> {
    records.iter().find(|record| record.tag == tag).copied()
}

fn read_lookup(lookup: ReadScope<'_>, pairs: &mut Vec<(u16, u16)>) -> Result<(), ParseError> {
    let mut ctxt = lookup.ctxt();
    let lookup_type = ctxt.read_u16be()?;
    let _lookup_flag = ctxt.read_u16be()?;
    let subtable_count = usize::from(ctxt.read_u16be()?);
    let subtable_offsets = ctxt.read_array::<U16Be>(subtable_count)?;

    for subtable_offset in &subtable_offsets {
        let subtable = lookup.offset(usize::from(subtable_offset));
        match lookup_type {
            SINGLE_SUBSTITUTION => read_single_subst(subtable, pairs)?,
            EXTENSION_SUBSTITUTION => {
                let mut ctxt = subtable.ctxt();
                let format = ctxt.read_u16be()?;
                ctxt.check_version(format == 1)?;
                let extension_lookup_type = ctxt.read_u16be()?;
                let extension_offset = usize::try_from(ctxt.read_u32be()?)?;
                if extension_lookup_type == SINGLE_SUBSTITUTION {
                    read_single_subst(subtable.offset(extension_offset), pairs)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn read_single_subst(
    subtable: ReadScope<'_>,
    pairs: &mut Vec<(u16, u16)>,
) -> Result<(), ParseError> {
    let mut ctxt = subtable.ctxt();
    let format = ctxt.read_u16be()?;
    let coverage_offset = usize::from(ctxt.read_u16be()?);
    let coverage = subtable.offset(coverage_offset).read::<Coverage>()?;
    match format {
        1 => {
            let delta_glyph_index = ctxt.read_i16be()?;
            pairs.extend(coverage.glyphs().into_iter().map(|(glyph, _index)| {
                (glyph, glyph.wrapping_add(delta_glyph_index as u16))
            }));
        }
        2 => {
            let glyph_count = usize::from(ctxt.read_u16be()?);
            let substitutes = ctxt.read_array::<U16Be>(glyph_count)?;
            for (glyph, index) in coverage.glyphs() {
                pairs.push((glyph, substitutes.read_item(index)?));
            }
        }
        _ => return Err(ParseError::BadVersion),
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tests::u16s;

    /// A `GSUB` with one script, one language system and one feature whose lookups are the
    /// given raw lookup tables.
    pub(crate) fn gsub_table(
        script: &[u8; 4],
        langsys: Option<&[u8; 4]>,
        feature: &[u8; 4],
        lookups: &[Vec<u8>],
    ) -> Vec<u8> {
        // Script list: one record, script table right after it
        let mut script_list = u16s(&[1]);
        script_list.extend(script);
        script_list.extend(u16s(&[8]));
        // Script table: default LangSys or one tagged record, LangSys table after it
        match langsys {
            Some(langsys_tag) => {
                script_list.extend(u16s(&[0, 1]));
                script_list.extend(langsys_tag);
                script_list.extend(u16s(&[10]));
            }
            None => script_list.extend(u16s(&[4, 0])),
        }
        // LangSys: no required feature, feature 0
        script_list.extend(u16s(&[0, 0xFFFF, 1, 0]));

        let mut feature_list = u16s(&[1]);
        feature_list.extend(feature);
        feature_list.extend(u16s(&[8, 0, lookups.len() as u16]));
        feature_list.extend(u16s(&(0..lookups.len() as u16).collect::<Vec<_>>()));

        let mut lookup_list = u16s(&[lookups.len() as u16]);
        let mut offset = 2 + 2 * lookups.len();
        for lookup in lookups {
            lookup_list.extend(u16s(&[offset as u16]));
            offset += lookup.len();
        }
        for lookup in lookups {
            lookup_list.extend(lookup);
        }

        let script_list_offset = 10;
        let feature_list_offset = script_list_offset + script_list.len();
        let lookup_list_offset = feature_list_offset + feature_list.len();
        let mut data = u16s(&[
            1,
            0,
            script_list_offset as u16,
            feature_list_offset as u16,
            lookup_list_offset as u16,
        ]);
        data.extend(script_list);
        data.extend(feature_list);
        data.extend(lookup_list);
        data
    }

    /// Type 1 lookup with a format 2 single substitution over a format 1 coverage.
    pub(crate) fn single_subst_lookup(pairs: &[(u16, u16)]) -> Vec<u8> {
        let mut data = u16s(&[SINGLE_SUBSTITUTION, 0, 1, 8]);
        let coverage_offset = 6 + 2 * pairs.len();
        data.extend(u16s(&[2, coverage_offset as u16, pairs.len() as u16]));
        data.extend(u16s(&pairs.iter().map(|p| p.1).collect::<Vec<_>>()));
        data.extend(u16s(&[1, pairs.len() as u16]));
        data.extend(u16s(&pairs.iter().map(|p| p.0).collect::<Vec<_>>()));
        data
    }

    #[test]
    fn test_kana_vert_format2() {
        let lookups = [single_subst_lookup(&[(3, 7), (5, 9)])];
        let data = gsub_table(b"kana", Some(b"JAN "), b"vert", &lookups);
        let pairs = vertical_substitutions(ReadScope::new(&data)).unwrap();
        assert_eq!(pairs, vec![(3, 7), (5, 9)]);
    }

    #[test]
    fn test_default_script_and_langsys() {
        let data = gsub_table(b"DFLT", None, b"vrt2", &[single_subst_lookup(&[(4, 8)])]);
        let pairs = vertical_substitutions(ReadScope::new(&data)).unwrap();
        assert_eq!(pairs, vec![(4, 8)]);
    }

    #[test]
    fn test_other_feature_ignored() {
        let data = gsub_table(b"kana", None, b"liga", &[single_subst_lookup(&[(4, 8)])]);
        assert!(vertical_substitutions(ReadScope::new(&data)).unwrap().is_empty());
    }

    #[test]
    fn test_other_script_ignored() {
        let data = gsub_table(b"latn", None, b"vert", &[single_subst_lookup(&[(4, 8)])]);
        assert!(vertical_substitutions(ReadScope::new(&data)).unwrap().is_empty());
    }

    #[test]
    fn test_extension_format1_coverage_range() {
        // Single substitution format 1 (delta 10) over a format 2 coverage of glyphs 20..=22
        let mut single = u16s(&[1, 6, 10]);
        single.extend(u16s(&[2, 1, 20, 22, 0]));
        let mut lookup = u16s(&[EXTENSION_SUBSTITUTION, 0, 1, 8]);
        lookup.extend(u16s(&[1, SINGLE_SUBSTITUTION]));
        lookup.extend(8u32.to_be_bytes());
        lookup.extend(single);
        let data = gsub_table(b"kana", None, b"vert", &[lookup]);
        let pairs = vertical_substitutions(ReadScope::new(&data)).unwrap();
        assert_eq!(pairs, vec![(20, 30), (21, 31), (22, 32)]);
    }

    #[test]
    fn test_bad_lookup_index() {
        let mut data = gsub_table(b"kana", None, b"vert", &[single_subst_lookup(&[(4, 8)])]);
        // Point the feature at a second, nonexistent lookup
        let position = data
            .windows(4)
            .position(|window| window == b"vert")
            .unwrap();
        data[position + 11] = 1;
        assert_eq!(
            vertical_substitutions(ReadScope::new(&data)),
            Err(ParseError::BadIndex)
        );
    }
}
