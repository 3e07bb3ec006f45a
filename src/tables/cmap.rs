//! `cmap` table
//!
//! Decodes each subtable into the segment form used by [crate::cmap].
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/cmap>

use std::sync::Arc;

use itertools::Itertools;
use log::debug;
use rustc_hash::FxHashMap;

use crate::binary::read::{ReadArray, ReadFrom, ReadScope};
use crate::binary::{I16Be, U16Be, U32Be, U8};
use crate::cmap::{push_clipped, Cmap, CmapSubtable, Segment, SegmentBuilder, SegmentMap};
use crate::error::{FontError, ParseError};

const SUB_HEADER_SIZE: usize = 4 * 2;
const MAX_UNICODE: u32 = 0x10FFFF;

#[derive(Debug, Copy, Clone)]
struct EncodingRecord {
    platform_id: u16,
    encoding_id: u16,
    offset: u32,
}

// cmap subtable format 2 sub-header
#[derive(Debug, Copy, Clone)]
struct SubHeader {
    first_code: u16,
    entry_count: u16,
    id_delta: i16,
    id_range_offset: u16,
}

impl ReadFrom for EncodingRecord {
    type ReadType = (U16Be, U16Be, U32Be);
    fn read_from((platform_id, encoding_id, offset): (u16, u16, u32)) -> Self {
        EncodingRecord {
            platform_id,
            encoding_id,
            offset,
        }
    }
}

impl ReadFrom for SubHeader {
    type ReadType = ((U16Be, U16Be), (I16Be, U16Be));
    fn read_from(
        ((first_code, entry_count), (id_delta, id_range_offset)): ((u16, u16), (i16, u16)),
    ) -> Self {
        SubHeader {
            first_code,
            entry_count,
            id_delta,
            id_range_offset,
        }
    }
}

/// A subtable decoded once and shared by every encoding record that points at it.
#[derive(Debug, Clone)]
struct DecodedSubtable {
    format: u16,
    language: u16,
    segments: Arc<[Segment]>,
}

/// Decode every supported subtable of the `cmap` table in `scope`.
///
/// Subtables in unsupported formats are skipped.
pub fn read_cmap(scope: ReadScope<'_>) -> Result<Cmap, FontError> {
    let mut ctxt = scope.ctxt();
    let version = ctxt.read_u16be()?;
    ctxt.check_version(version == 0)?;
    let num_tables = usize::from(ctxt.read_u16be()?);
    let records = ctxt.read_array::<EncodingRecord>(num_tables)?;

    // Symbol subtables get an extra segment, so the same offset can decode two ways
    let mut decoded: FxHashMap<(u32, bool), Option<DecodedSubtable>> = FxHashMap::default();
    let mut subtables = Vec::new();
    subtables.try_reserve(num_tables)?;
    for record in &records {
        let symbol = record.platform_id == 3 && record.encoding_id == 0;
        let key = (record.offset, symbol);
        let subtable = match decoded.get(&key) {
            Some(subtable) => subtable.clone(),
            None => {
                let offset = usize::try_from(record.offset)?;
                if offset >= scope.len() {
                    return Err(FontError::InvalidFont(ParseError::BadOffset));
                }
                let subtable = read_subtable(scope.offset(offset), symbol)?;
                decoded.insert(key, subtable.clone());
                subtable
            }
        };
        if let Some(subtable) = subtable {
            subtables.push(CmapSubtable::new(
                record.platform_id,
                record.encoding_id,
                subtable.language,
                subtable.format,
                subtable.segments,
            ));
        }
    }

    Ok(Cmap { subtables })
}

fn read_subtable(
    scope: ReadScope<'_>,
    symbol: bool,
) -> Result<Option<DecodedSubtable>, FontError> {
    let format = scope.ctxt().read_u16be()?;
    let (language, segments) = match format {
        0 => read_format0(scope)?,
        2 => read_format2(scope)?,
        4 => {
            let (language, segments) = read_format4(scope)?;
            if symbol {
                (language, add_symbol_segment(segments)?)
            } else {
                (language, segments)
            }
        }
        6 => read_format6(scope)?,
        12 => read_format12(scope)?,
        _ => {
            debug!("cmap: skipping unsupported subtable format {}", format);
            return Ok(None);
        }
    };
    Ok(Some(DecodedSubtable {
        format,
        language,
        segments: Arc::from(segments),
    }))
}

fn read_format0(scope: ReadScope<'_>) -> Result<(u16, Vec<Segment>), FontError> {
    let mut ctxt = scope.ctxt();
    ctxt.skip(2 * 2)?; // format, length
    let language = ctxt.read_u16be()?;
    let glyph_id_array = ctxt.read_array::<U8>(256)?;
    let glyphs = glyph_id_array.iter().map(u16::from).collect();
    Ok((language, vec![Segment::array(0, glyphs)]))
}

fn read_format2(scope: ReadScope<'_>) -> Result<(u16, Vec<Segment>), FontError> {
    let mut ctxt = scope.ctxt();
    ctxt.skip(2 * 2)?; // format, length
    let language = ctxt.read_u16be()?;
    let sub_header_keys = ctxt.read_array::<U16Be>(256)?;
    let sub_headers_scope = ctxt.scope();
    // value is subHeader index × 8
    let max_sub_header_index = sub_header_keys.iter().map(|key| key / 8).max().unwrap_or(0);
    let sub_headers = ctxt.read_array::<SubHeader>(usize::from(max_sub_header_index) + 1)?;

    let mut segments = Vec::new();

    // Sub-header 0 maps the single byte codes, those whose own key is 0
    let header = sub_headers.read_item(0)?;
    let glyphs = glyph_index_sub_array(&header, 0, sub_headers_scope)?;
    let single_byte = (0..256u32)
        .filter(|&code| sub_header_keys.get_item(code as usize) == Some(0))
        .filter_map(|code| {
            let index = (code as u16).checked_sub(header.first_code)?;
            let raw = glyphs.get_item(usize::from(index))?;
            Some(Segment::array(code, vec![apply_delta(raw, header.id_delta)]))
        })
        .coalesce(merge_adjacent_arrays);
    segments.extend(single_byte);

    for (high_byte, key) in sub_header_keys.iter().enumerate() {
        let index = usize::from(key / 8);
        if index == 0 {
            continue;
        }
        let header = sub_headers.read_item(index)?;
        if header.entry_count == 0 {
            continue;
        }
        let glyphs = glyph_index_sub_array(&header, index, sub_headers_scope)?;
        let first_code = usize::from(header.first_code.min(256));
        let count = usize::from(header.entry_count).min(256 - first_code);
        if count == 0 {
            continue;
        }
        let glyphs = glyphs
            .iter()
            .take(count)
            .map(|raw| apply_delta(raw, header.id_delta))
            .collect();
        let start = ((high_byte as u32) << 8) | u32::from(header.first_code);
        segments.push(Segment::array(start, glyphs));
    }

    segments.sort_by_key(|segment| segment.start);
    let mut normalized = Vec::new();
    normalized.try_reserve(segments.len())?;
    for segment in segments {
        push_clipped(&mut normalized, segment)?;
    }
    Ok((language, normalized))
}

fn glyph_index_sub_array<'a>(
    header: &SubHeader,
    index: usize,
    sub_headers_scope: ReadScope<'a>,
) -> Result<ReadArray<'a, U16Be>, ParseError> {
    if header.entry_count == 0 {
        return Ok(ReadArray::empty());
    }
    // idRangeOffset counts from the idRangeOffset field itself
    let offset =
        index * SUB_HEADER_SIZE + SUB_HEADER_SIZE - 2 + usize::from(header.id_range_offset);
    sub_headers_scope
        .offset(offset)
        .ctxt()
        .read_array::<U16Be>(usize::from(header.entry_count))
}

fn apply_delta(raw: u16, delta: i16) -> u16 {
    match raw {
        0 => 0,
        raw => raw.wrapping_add(delta as u16),
    }
}

fn merge_adjacent_arrays(a: Segment, b: Segment) -> Result<Segment, (Segment, Segment)> {
    match (a, b) {
        (
            Segment {
                start,
                end,
                map: SegmentMap::Array(mut glyphs),
            },
            Segment {
                start: next,
                map: SegmentMap::Array(more),
                ..
            },
        ) if end + 1 == next => {
            glyphs.extend(more);
            Ok(Segment::array(start, glyphs))
        }
        (a, b) => Err((a, b)),
    }
}

fn read_format4(scope: ReadScope<'_>) -> Result<(u16, Vec<Segment>), FontError> {
    let mut ctxt = scope.ctxt();
    ctxt.skip(2 * 2)?; // format, length
    let language = ctxt.read_u16be()?;
    let seg_count_x2 = usize::from(ctxt.read_u16be()?);
    ctxt.check((seg_count_x2 & 1) == 0)?;
    let seg_count = seg_count_x2 >> 1;
    ctxt.skip(3 * 2)?; // searchRange, entrySelector, rangeShift
    let end_codes = ctxt.read_array::<U16Be>(seg_count)?;
    let _reserved_pad = ctxt.read_u16be()?;
    let start_codes = ctxt.read_array::<U16Be>(seg_count)?;
    let id_deltas = ctxt.read_array::<U16Be>(seg_count)?;
    let id_range_offsets = ctxt.read_array::<U16Be>(seg_count)?;
    // The length field overflows in large subtables, so the glyph array runs to the end of the
    // table
    let glyph_id_array = ctxt.read_array_upto::<U16Be>(ctxt.remaining() / 2)?;

    let mut segments = Vec::new();
    segments.try_reserve(seg_count)?;
    let mut prev_end = None;
    for i in 0..seg_count {
        let start = start_codes.read_item(i)?;
        let end = end_codes.read_item(i)?;
        let delta = id_deltas.read_item(i)?;
        let range_offset = usize::from(id_range_offsets.read_item(i)?);
        let is_last = i + 1 == seg_count;

        if start > end {
            return Err(FontError::InvalidFont(ParseError::BadValue));
        }
        match prev_end {
            Some(prev) if end < prev => return Err(FontError::InvalidFont(ParseError::BadValue)),
            // Unreachable through a binary search on end codes
            Some(prev) if end == prev => continue,
            _ => prev_end = Some(end),
        }
        let end = end.min(0xFFFE);
        if start > end {
            continue;
        }

        let segment = if range_offset == 0 {
            Segment::delta(u32::from(start), u32::from(end), delta)
        } else {
            let mut glyphs = Vec::new();
            glyphs.try_reserve(usize::from(end - start) + 1)?;
            for code in start..=end {
                let index =
                    (range_offset / 2 + i + usize::from(code - start)).checked_sub(seg_count);
                let raw = if range_offset % 2 == 0 {
                    index.and_then(|index| glyph_id_array.get_item(index))
                } else {
                    None
                };
                let glyph = match raw {
                    Some(raw) => apply_delta(raw, delta as i16),
                    // The final segment is often junk
                    None if is_last => 0,
                    None => return Err(FontError::InvalidFont(ParseError::BadIndex)),
                };
                glyphs.push(glyph);
            }
            Segment::array(u32::from(start), glyphs)
        };
        push_clipped(&mut segments, segment)?;
    }

    Ok((language, segments))
}

/// Symbol fonts usually map their characters at U+F000 to U+F0FF. Give codes 0 to 255 the
/// glyph of the higher code with the same low byte, unless the font maps the low code itself.
fn add_symbol_segment(segments: Vec<Segment>) -> Result<Vec<Segment>, FontError> {
    if segments.iter().all(|segment| segment.end < 0x100) {
        return Ok(segments);
    }

    let mut glyphs = vec![0u16; 256];
    for segment in segments.iter().take_while(|segment| segment.start < 0x100) {
        for (code, glyph) in segment.mapped() {
            if code < 0x100 {
                glyphs[code as usize] = glyph;
            }
        }
    }
    for segment in segments.iter().filter(|segment| segment.end >= 0x100) {
        for (code, glyph) in segment.mapped() {
            let slot = &mut glyphs[(code & 0xFF) as usize];
            if code >= 0x100 && *slot == 0 {
                *slot = glyph;
            }
        }
    }

    let mut out = Vec::new();
    out.try_reserve(segments.len() + 1)?;
    out.push(Segment::array(0, glyphs));
    for segment in segments.into_iter().filter(|segment| segment.end >= 0x100) {
        push_clipped(&mut out, segment)?;
    }
    Ok(out)
}

fn read_format6(scope: ReadScope<'_>) -> Result<(u16, Vec<Segment>), FontError> {
    let mut ctxt = scope.ctxt();
    ctxt.skip(2 * 2)?; // format, length
    let language = ctxt.read_u16be()?;
    let first_code = ctxt.read_u16be()?;
    let entry_count = usize::from(ctxt.read_u16be()?);
    let glyph_id_array = ctxt.read_array::<U16Be>(entry_count)?;
    let count = entry_count.min(0x10000 - usize::from(first_code));
    if count == 0 {
        return Ok((language, Vec::new()));
    }
    let glyphs = glyph_id_array.iter().take(count).collect();
    Ok((language, vec![Segment::array(u32::from(first_code), glyphs)]))
}

fn read_format12(scope: ReadScope<'_>) -> Result<(u16, Vec<Segment>), FontError> {
    let mut ctxt = scope.ctxt();
    ctxt.skip(2)?; // format
    let reserved = ctxt.read_u16be()?;
    ctxt.check(reserved == 0)?;
    let _length = ctxt.read_u32be()?;
    let language = ctxt.read_u32be()?;
    let num_groups = usize::try_from(ctxt.read_u32be()?)?;
    let groups = ctxt.read_array::<(U32Be, U32Be, U32Be)>(num_groups)?;

    let mut builder = SegmentBuilder::new();
    for (start_char_code, end_char_code, start_glyph_id) in &groups {
        if start_char_code > end_char_code {
            return Err(FontError::InvalidFont(ParseError::BadValue));
        }
        if start_char_code > MAX_UNICODE || start_glyph_id > 0xFFFF {
            debug!(
                "cmap: ignoring format 12 group {:#X}..={:#X}",
                start_char_code, end_char_code
            );
            continue;
        }
        // Stop before the glyph ID or character code overflows
        let end = end_char_code
            .min(start_char_code + (0xFFFF - start_glyph_id))
            .min(MAX_UNICODE);
        let delta = start_glyph_id.wrapping_sub(start_char_code) as u16;
        builder.insert_delta(start_char_code, end, delta)?;
    }

    let language = u16::try_from(language).unwrap_or(u16::MAX);
    Ok((language, builder.finish()))
}
