//! Character to glyph mapping.
//!
//! Every supported `cmap` subtable format is decoded into the same form: a sorted list of
//! non-overlapping [Segment]s, each mapping an inclusive range of character codes either by a
//! 16-bit delta or through an explicit glyph array. Lookups and the CID mapping builder work on
//! that form only.

use std::sync::Arc;

use log::debug;

use crate::error::{FontError, ParseError};
use crate::tables::{priority_search, RecordKey};

/// Subtable search order for Unicode character codes.
pub const UNICODE_PRIORITIES: [RecordKey; 5] = [
    RecordKey::new(3, 10, None),
    RecordKey::new(0, 4, None),
    RecordKey::new(0, 6, None),
    RecordKey::new(3, 1, None),
    RecordKey::platform(0),
];

/// Macintosh Roman character codes.
pub const MAC_ROMAN_PRIORITIES: [RecordKey; 1] = [RecordKey::new(1, 0, None)];

/// Microsoft Symbol character codes.
pub const SYMBOL_PRIORITIES: [RecordKey; 1] = [RecordKey::new(3, 0, None)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentMap {
    /// glyph = (code + delta) mod 65536
    Delta(u16),
    /// One glyph per code in the segment.
    Array(Vec<u16>),
}

/// An inclusive range of character codes in one subtable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start: u32,
    pub end: u32,
    pub map: SegmentMap,
}

impl Segment {
    pub fn delta(start: u32, end: u32, delta: u16) -> Self {
        Segment {
            start,
            end,
            map: SegmentMap::Delta(delta),
        }
    }

    /// An array segment starting at `start`. `glyphs` must not be empty.
    pub fn array(start: u32, glyphs: Vec<u16>) -> Self {
        let end = start + glyphs.len().saturating_sub(1) as u32;
        Segment {
            start,
            end,
            map: SegmentMap::Array(glyphs),
        }
    }

    pub fn contains(&self, code: u32) -> bool {
        self.start <= code && code <= self.end
    }

    /// Glyph for `code`, which must be within the segment. 0 means unmapped.
    fn glyph(&self, code: u32) -> Result<u16, FontError> {
        match &self.map {
            SegmentMap::Delta(delta) => match (code as u16).wrapping_add(*delta) {
                0xFFFF => Ok(0),
                glyph => Ok(glyph),
            },
            SegmentMap::Array(glyphs) => {
                let index = (code - self.start) as usize;
                match glyphs.get(index).copied() {
                    Some(0xFFFF) => Err(FontError::InvalidFont(ParseError::BadValue)),
                    Some(glyph) => Ok(glyph),
                    None => Err(FontError::InvalidFont(ParseError::BadIndex)),
                }
            }
        }
    }

    /// Every code in the segment that maps to a glyph other than 0, with its glyph.
    ///
    /// Codes whose lookup fails are left out, so one bad entry does not hide the rest.
    pub fn mapped(&self) -> impl DoubleEndedIterator<Item = (u32, u16)> + '_ {
        (self.start..=self.end).filter_map(move |code| match self.glyph(code) {
            Ok(0) => None,
            Ok(glyph) => Some((code, glyph)),
            Err(err) => {
                debug!("cmap: skipping code {:#X}: {}", code, err);
                None
            }
        })
    }

    /// The part of this segment from `start` onwards. `start` must be within the segment.
    fn from_code(&self, start: u32) -> Segment {
        match &self.map {
            SegmentMap::Delta(delta) => Segment::delta(start, self.end, *delta),
            SegmentMap::Array(glyphs) => {
                Segment::array(start, glyphs[(start - self.start) as usize..].to_vec())
            }
        }
    }
}

/// Look `code` up in sorted, non-overlapping `segments`.
pub fn lookup_segments(segments: &[Segment], code: u32) -> Result<Option<u16>, FontError> {
    let index = segments.partition_point(|segment| segment.end < code);
    match segments.get(index) {
        Some(segment) if segment.start <= code => match segment.glyph(code)? {
            0 => Ok(None),
            glyph => Ok(Some(glyph)),
        },
        _ => Ok(None),
    }
}

/// Append `segment` to sorted `segments`, clipping it so that earlier segments keep any codes
/// they already cover.
pub(crate) fn push_clipped(segments: &mut Vec<Segment>, segment: Segment) -> Result<(), FontError> {
    let segment = match segments.last() {
        Some(last) if segment.end <= last.end => return Ok(()),
        Some(last) if segment.start <= last.end => segment.from_code(last.end + 1),
        _ => segment,
    };
    segments.try_reserve(1)?;
    segments.push(segment);
    Ok(())
}

/// Builds a segment list from ranges supplied in any order, later ranges taking precedence
/// over earlier ones where they overlap.
#[derive(Debug, Default)]
pub(crate) struct SegmentBuilder {
    segments: Vec<Segment>,
    /// Highest code covered by `segments`.
    high_water: Option<u32>,
}

impl SegmentBuilder {
    pub fn new() -> Self {
        SegmentBuilder::default()
    }

    pub fn insert_delta(&mut self, start: u32, end: u32, delta: u16) -> Result<(), FontError> {
        let group = Segment::delta(start, end, delta);
        let high_water = match self.high_water {
            Some(high_water) if start <= high_water => high_water,
            _ => {
                // In order input
                self.high_water = Some(end);
                if let Some(last) = self.segments.last_mut() {
                    if last.end + 1 == start && last.map == group.map {
                        last.end = end;
                        return Ok(());
                    }
                }
                return self.push(group);
            }
        };
        self.high_water = Some(high_water.max(end));

        let first = self.segments.partition_point(|segment| segment.end < start);
        let last = self.segments.partition_point(|segment| segment.start <= end);
        let affected = &self.segments[first..last];

        let (span_start, span_end) = match (affected.first(), affected.last()) {
            (Some(left), Some(right)) => (left.start.min(start), right.end.max(end)),
            _ => {
                // Falls in a gap below the high-water mark
                self.segments.try_reserve(1)?;
                self.segments.insert(first, group);
                return Ok(());
            }
        };

        // Already covered by a segment that maps it the same way
        if let [only] = affected {
            if only.start <= start && end <= only.end && only.map == group.map {
                return Ok(());
            }
        }

        let agrees = affected.iter().all(|segment| {
            segment.map == group.map || (start <= segment.start && segment.end <= end)
        });
        let replacement = if agrees {
            Segment::delta(span_start, span_end, delta)
        } else {
            let mut glyphs = Vec::new();
            glyphs.try_reserve((span_end - span_start) as usize + 1)?;
            let mut existing = affected.iter().peekable();
            for code in span_start..=span_end {
                let glyph = if group.contains(code) {
                    group.glyph(code)?
                } else {
                    while existing.next_if(|segment| segment.end < code).is_some() {}
                    match existing.peek() {
                        Some(segment) if segment.contains(code) => segment.glyph(code)?,
                        _ => 0,
                    }
                };
                glyphs.push(glyph);
            }
            Segment::array(span_start, glyphs)
        };

        self.segments.splice(first..last, [replacement]);
        Ok(())
    }

    fn push(&mut self, segment: Segment) -> Result<(), FontError> {
        self.segments.try_reserve(1)?;
        self.segments.push(segment);
        Ok(())
    }

    pub fn finish(self) -> Vec<Segment> {
        self.segments
    }
}

/// A decoded `cmap` subtable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmapSubtable {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    /// Format of the subtable the segments were decoded from.
    pub format: u16,
    segments: Arc<[Segment]>,
}

impl CmapSubtable {
    pub fn new(
        platform_id: u16,
        encoding_id: u16,
        language_id: u16,
        format: u16,
        segments: Arc<[Segment]>,
    ) -> Self {
        CmapSubtable {
            platform_id,
            encoding_id,
            language_id,
            format,
            segments,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_symbol(&self) -> bool {
        self.platform_id == 3 && self.encoding_id == 0
    }

    /// Glyph for `code`. Unmapped codes and codes mapped to glyph 0 are `None`.
    pub fn lookup(&self, code: u32) -> Result<Option<u16>, FontError> {
        lookup_segments(&self.segments, code)
    }
}

/// All decodable subtables of a `cmap` table in directory order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cmap {
    pub subtables: Vec<CmapSubtable>,
}

impl Cmap {
    /// The subtable matching the earliest of `priorities`.
    pub fn select(&self, priorities: &[RecordKey]) -> Option<&CmapSubtable> {
        priority_search(&self.subtables, priorities, |subtable| {
            (
                subtable.platform_id,
                subtable.encoding_id,
                subtable.language_id,
            )
        })
    }

    pub fn lookup(&self, priorities: &[RecordKey], code: u32) -> Result<Option<u16>, FontError> {
        match self.select(priorities) {
            Some(subtable) => subtable.lookup(code),
            None => Ok(None),
        }
    }
}
