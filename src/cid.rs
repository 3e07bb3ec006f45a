//! CID-keyed use of TrueType fonts.
//!
//! A TrueType font used as a CIDFont needs a CID to glyph mapping and a Registry, Ordering and
//! Supplement describing the CIDs. Neither is stored in the font, so they are worked out from
//! whatever the font does contain. The strategies, in the order they are tried:
//!
//! 1. A pinned ROS with the `Identity` ordering maps every CID to the glyph with the same index.
//! 2. A CID findfont name (name ID 20) built from the PostScript name and a CMap name. The CMap
//!    is correlated with the font's Macintosh `cmap`.
//! 3. A single character collection identified by the `OS/2` code pages, or requested by the
//!    caller. The collection's UTF-16 CMaps are correlated with the font's Unicode `cmap`.
//! 4. A Unicode `cmap` used directly, with CIDs equal to Unicode scalar values.
//! 5. An identity mapping over every glyph, only when the caller forces CID use.

use std::fmt;

use itertools::Itertools;
use log::debug;

use crate::cmap::UNICODE_PRIORITIES;
use crate::error::FontError;
use crate::font::FontInstance;
use crate::options::CidOptions;
use crate::tables::name::{NameId, MACINTOSH_NAME_PRIORITIES};
use crate::tables::RecordKey;

mod collection;
pub mod vertical;

pub use collection::CharacterCollection;

/// Largest CID a mapping will hold.
pub const MAX_CID: u32 = 0x00FF_FFFF;

/// Registry, Ordering and Supplement of a character collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ros {
    pub registry: String,
    pub ordering: String,
    pub supplement: u32,
}

impl Ros {
    pub fn new(registry: impl Into<String>, ordering: impl Into<String>, supplement: u32) -> Self {
        Ros {
            registry: registry.into(),
            ordering: ordering.into(),
            supplement,
        }
    }

    /// `Adobe-Identity-0`
    pub fn identity() -> Self {
        Ros::new("Adobe", "Identity", 0)
    }

    /// `Harlequin-Unicode-0`, CIDs are Unicode scalar values.
    pub fn harlequin_unicode() -> Self {
        Ros::new("Harlequin", "Unicode", 0)
    }

    pub fn is_identity(&self) -> bool {
        self.ordering == "Identity"
    }
}

impl fmt::Display for Ros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.registry, self.ordering, self.supplement)
    }
}

/// A contiguous range of codes mapped to consecutive CIDs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CidRange {
    pub start_code: u32,
    pub end_code: u32,
    pub start_cid: u32,
}

/// A CMap resource, reduced to what CID mapping construction needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCMap {
    pub ros: Ros,
    pub ranges: Vec<CidRange>,
}

/// Finds CMap resources by name.
pub trait CMapResolver {
    fn resolve(&self, name: &str) -> Option<ResolvedCMap>;
}

impl<F> CMapResolver for F
where
    F: Fn(&str) -> Option<ResolvedCMap>,
{
    fn resolve(&self, name: &str) -> Option<ResolvedCMap> {
        self(name)
    }
}

/// Glyphs by CID, used while one mapping is being built.
#[derive(Debug, Default)]
pub(crate) struct CidScratch {
    glyphs: Vec<u16>,
}

impl CidScratch {
    pub(crate) fn new() -> Self {
        CidScratch::default()
    }

    pub(crate) fn get(&self, cid: u32) -> u16 {
        self.glyphs.get(cid as usize).copied().unwrap_or(0)
    }

    /// Map `cid` to `glyph` unless it is already mapped. Returns whether it was set.
    pub(crate) fn set(&mut self, cid: u32, glyph: u16) -> Result<bool, FontError> {
        if cid > MAX_CID || glyph == 0 {
            return Ok(false);
        }
        let index = cid as usize;
        if index >= self.glyphs.len() {
            let additional = index + 1 - self.glyphs.len();
            self.glyphs.try_reserve(additional)?;
            self.glyphs.resize(index + 1, 0);
        }
        if self.glyphs[index] != 0 {
            return Ok(false);
        }
        self.glyphs[index] = glyph;
        Ok(true)
    }

    /// Change the glyph of an already mapped `cid`.
    pub(crate) fn replace(&mut self, cid: u32, glyph: u16) {
        if let Some(slot) = self.glyphs.get_mut(cid as usize) {
            *slot = glyph;
        }
    }

    /// Unmap every CID whose glyph is `glyph_count` or above, returning how many there were.
    fn unmap_glyphs_from(&mut self, glyph_count: u16) -> usize {
        let mut unmapped = 0;
        for slot in self.glyphs.iter_mut().filter(|slot| **slot >= glyph_count) {
            if *slot != 0 {
                *slot = 0;
                unmapped += 1;
            }
        }
        unmapped
    }

    fn into_runs(self) -> Vec<CidRun> {
        self.glyphs
            .iter()
            .enumerate()
            .filter(|&(_, &glyph)| glyph != 0)
            .map(|(cid, &glyph)| CidRun {
                first_cid: cid as u32,
                last_cid: cid as u32,
                first_glyph: glyph,
            })
            .coalesce(|prev, next| {
                let consecutive = prev.last_cid + 1 == next.first_cid
                    && u32::from(prev.first_glyph) + (next.first_cid - prev.first_cid)
                        == u32::from(next.first_glyph);
                if consecutive {
                    Ok(CidRun {
                        last_cid: next.last_cid,
                        ..prev
                    })
                } else {
                    Err((prev, next))
                }
            })
            .collect()
    }
}

/// CIDs `first_cid..=last_cid` mapped to consecutive glyphs from `first_glyph`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CidRun {
    pub first_cid: u32,
    pub last_cid: u32,
    pub first_glyph: u16,
}

impl CidRun {
    fn last_glyph(&self) -> u16 {
        self.first_glyph
            .wrapping_add((self.last_cid - self.first_cid) as u16)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CidMap {
    Identity,
    Runs(Vec<CidRun>),
}

/// Mapping from CIDs to glyph indices, with the ROS it is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidMapping {
    ros: Ros,
    glyph_count: u16,
    map: CidMap,
}

impl CidMapping {
    pub fn identity(ros: Ros, glyph_count: u16) -> Self {
        CidMapping {
            ros,
            glyph_count,
            map: CidMap::Identity,
        }
    }

    pub fn ros(&self) -> &Ros {
        &self.ros
    }

    pub fn registry(&self) -> &str {
        &self.ros.registry
    }

    pub fn ordering(&self) -> &str {
        &self.ros.ordering
    }

    pub fn supplement(&self) -> u32 {
        self.ros.supplement
    }

    pub fn glyph_count(&self) -> u16 {
        self.glyph_count
    }

    /// Whether every mapped CID is mapped to the glyph with the same index.
    pub fn is_identity(&self) -> bool {
        match &self.map {
            CidMap::Identity => true,
            CidMap::Runs(runs) => runs
                .iter()
                .all(|run| run.first_cid == u32::from(run.first_glyph)),
        }
    }

    /// Glyph for `cid`, 0 when the CID is unmapped.
    pub fn cid_to_gid(&self, cid: u32) -> u16 {
        match &self.map {
            CidMap::Identity if cid < u32::from(self.glyph_count) => cid as u16,
            CidMap::Identity => 0,
            CidMap::Runs(runs) => {
                let index = runs.partition_point(|run| run.last_cid < cid);
                match runs.get(index) {
                    Some(run) if run.first_cid <= cid => run
                        .first_glyph
                        .wrapping_add((cid - run.first_cid) as u16),
                    _ => 0,
                }
            }
        }
    }

    /// The compacted mapping. Empty for identity mappings.
    pub fn runs(&self) -> &[CidRun] {
        match &self.map {
            CidMap::Identity => &[],
            CidMap::Runs(runs) => runs,
        }
    }

    /// Number of mapped CIDs in `first..=last`.
    fn count_mapped(&self, first: u32, last: u32) -> u32 {
        match &self.map {
            CidMap::Identity if self.glyph_count == 0 => 0,
            CidMap::Identity => {
                let end = last.min(u32::from(self.glyph_count).saturating_sub(1));
                (end + 1).saturating_sub(first)
            }
            CidMap::Runs(runs) => runs
                .iter()
                .filter(|run| run.first_cid <= last && first <= run.last_cid)
                .map(|run| run.last_cid.min(last) - run.first_cid.max(first) + 1)
                .sum(),
        }
    }
}

/// A mapping under construction.
struct Candidate {
    ros: Ros,
    scratch: CidScratch,
    /// Built by correlating UTF-16 CMaps with a Unicode `cmap`.
    through_unicode: bool,
}

pub(crate) fn build(
    font: &mut FontInstance,
    resolver: &dyn CMapResolver,
    options: &CidOptions,
) -> Result<Option<CidMapping>, FontError> {
    if let Some(ros) = options.pinned.as_ref().filter(|ros| ros.is_identity()) {
        let glyph_count = font.num_glyphs()?.unwrap_or(0);
        return Ok(Some(CidMapping::identity(ros.clone(), glyph_count)));
    }

    let candidate = match from_findfont_name(font, resolver)? {
        Some(candidate) => Some(candidate),
        None => match from_collection(font, resolver, options)? {
            Some(candidate) => Some(candidate),
            None => from_unicode(font)?,
        },
    };
    if let Some(candidate) = candidate {
        return finish(font, candidate).map(Some);
    }

    if !options.force_cid {
        return Ok(None);
    }
    match font.num_glyphs()? {
        Some(glyph_count) => {
            let ros = options.pinned.clone().unwrap_or_else(Ros::identity);
            Ok(Some(CidMapping::identity(ros, glyph_count)))
        }
        None => Err(FontError::RangeCheck),
    }
}

fn from_findfont_name(
    font: &mut FontInstance,
    resolver: &dyn CMapResolver,
) -> Result<Option<Candidate>, FontError> {
    font.decode_name()?;
    let name = match font.loaded_name() {
        Some(name) => name,
        None => return Ok(None),
    };
    let (record, findfont_name) =
        match name.find_record(NameId::POSTSCRIPT_CID_FINDFONT_NAME, &MACINTOSH_NAME_PRIORITIES) {
            Some(found) => found,
            None => return Ok(None),
        };
    let postscript_name = match name.string_for_id(NameId::POSTSCRIPT_NAME) {
        Some(postscript_name) => postscript_name,
        None => return Ok(None),
    };
    let cmap_name = match findfont_name.strip_prefix(postscript_name.as_str()) {
        Some(rest) => rest.strip_prefix('-').unwrap_or(rest),
        None => {
            debug!(
                "name: CID findfont name {:?} does not start with {:?}",
                findfont_name, postscript_name
            );
            return Ok(None);
        }
    };
    if cmap_name.is_empty() {
        return Ok(None);
    }
    let resolved = match resolver.resolve(cmap_name) {
        Some(resolved) => resolved,
        None => {
            debug!("CMap {} not found", cmap_name);
            return Ok(None);
        }
    };

    // Macintosh cmap languages are one more than the name table's
    let (encoding_id, language_id) = (record.encoding_id, record.language_id);
    let priorities = language_id
        .checked_add(1)
        .map(|language| RecordKey::new(1, encoding_id, Some(language)))
        .into_iter()
        .chain([RecordKey::new(1, encoding_id, Some(0))])
        .collect::<Vec<_>>();

    font.decode_cmap()?;
    let subtable = match font.loaded_cmap().and_then(|cmap| cmap.select(&priorities)) {
        Some(subtable) => subtable,
        None => return Ok(None),
    };
    let mut scratch = CidScratch::new();
    correlate(&mut scratch, &resolved.ranges, |code| subtable.lookup(code))?;
    Ok(Some(Candidate {
        ros: resolved.ros,
        scratch,
        through_unicode: false,
    }))
}

fn from_collection(
    font: &mut FontInstance,
    resolver: &dyn CMapResolver,
    options: &CidOptions,
) -> Result<Option<Candidate>, FontError> {
    let collection = match options.requested_collection() {
        Some(collection) => collection,
        None => {
            let code_pages = match font.os2()? {
                Some(os2) => os2.code_page1(),
                None => return Ok(None),
            };
            match CharacterCollection::from_code_pages(code_pages).as_slice() {
                [collection] => *collection,
                [] => return Ok(None),
                collections => {
                    debug!("OS/2: code pages name {:?}, using Unicode", collections);
                    return Ok(None);
                }
            }
        }
    };

    font.decode_cmap()?;
    let unicode = match font
        .loaded_cmap()
        .and_then(|cmap| cmap.select(&UNICODE_PRIORITIES))
    {
        Some(subtable) => subtable,
        None => return Ok(None),
    };

    let mut scratch = CidScratch::new();
    let mut ros = None;
    for name in collection.unicode_cmaps() {
        let resolved = match resolver.resolve(name) {
            Some(resolved) => resolved,
            None => {
                debug!("CMap {} not found", name);
                if ros.is_none() {
                    return Ok(None);
                }
                continue;
            }
        };
        correlate(&mut scratch, &resolved.ranges, |code| {
            match utf16_code_point(code) {
                Some(code_point) => unicode.lookup(code_point),
                None => Ok(None),
            }
        })?;
        if ros.is_none() {
            ros = Some(resolved.ros);
        }
    }

    Ok(ros.map(|ros| Candidate {
        ros,
        scratch,
        through_unicode: true,
    }))
}

fn from_unicode(font: &mut FontInstance) -> Result<Option<Candidate>, FontError> {
    font.decode_cmap()?;
    let unicode = match font
        .loaded_cmap()
        .and_then(|cmap| cmap.select(&UNICODE_PRIORITIES))
    {
        Some(subtable) => subtable,
        None => return Ok(None),
    };

    // Highest codes first so the scratch buffer is sized once
    let mut scratch = CidScratch::new();
    for segment in unicode.segments().iter().rev() {
        for (code, glyph) in segment.mapped().rev() {
            scratch.set(code, glyph)?;
        }
    }
    Ok(Some(Candidate {
        ros: Ros::harlequin_unicode(),
        scratch,
        through_unicode: false,
    }))
}

fn finish(font: &mut FontInstance, candidate: Candidate) -> Result<CidMapping, FontError> {
    let Candidate {
        ros,
        mut scratch,
        through_unicode,
    } = candidate;
    let collection = CharacterCollection::from_ros(&ros);

    if through_unicode && collection == Some(CharacterCollection::Japan1) {
        match font.vertical_substitutions() {
            Ok(Some(substitutions)) => vertical::apply(&mut scratch, &substitutions),
            Ok(None) => {}
            Err(err) => debug!("GSUB: vertical forms not applied: {}", err),
        }
    }

    let num_glyphs = font.num_glyphs()?;
    if let Some(glyph_count) = num_glyphs {
        let unmapped = scratch.unmap_glyphs_from(glyph_count);
        if unmapped > 0 {
            debug!("{}: {} CIDs map past the last glyph", ros, unmapped);
        }
    }
    let runs = scratch.into_runs();
    let glyph_count = match num_glyphs {
        Some(glyph_count) => glyph_count,
        None => runs
            .iter()
            .map(|run| run.last_glyph().saturating_add(1))
            .max()
            .unwrap_or(1),
    };
    let mut mapping = CidMapping {
        ros,
        glyph_count,
        map: CidMap::Runs(runs),
    };

    let supplement = collection.and_then(|collection| {
        collection.infer_supplement(|first, last| mapping.count_mapped(first, last))
    });
    if let Some(supplement) = supplement {
        mapping.ros.supplement = supplement;
    }
    Ok(mapping)
}

/// Map each code of `ranges` that `glyph_for` finds a glyph for.
fn correlate<F>(
    scratch: &mut CidScratch,
    ranges: &[CidRange],
    mut glyph_for: F,
) -> Result<(), FontError>
where
    F: FnMut(u32) -> Result<Option<u16>, FontError>,
{
    for range in ranges {
        if range.end_code < range.start_code {
            continue;
        }
        for code in range.start_code..=range.end_code {
            let cid = match range.start_cid.checked_add(code - range.start_code) {
                Some(cid) if cid <= MAX_CID => cid,
                _ => break,
            };
            match glyph_for(code) {
                Ok(Some(glyph)) => {
                    scratch.set(cid, glyph)?;
                }
                Ok(None) => {}
                Err(err) => debug!("CID {}: skipping code {:#X}: {}", cid, code, err),
            }
        }
    }
    Ok(())
}

/// Decode a UTF-16BE CMap code: one code unit, or a surrogate pair in one 32-bit code.
fn utf16_code_point(code: u32) -> Option<u32> {
    match code {
        0..=0xD7FF | 0xE000..=0xFFFF => Some(code),
        0x1_0000.. => {
            let (high, low) = (code >> 16, code & 0xFFFF);
            if (0xD800..=0xDBFF).contains(&high) && (0xDC00..=0xDFFF).contains(&low) {
                Some(0x1_0000 + ((high - 0xD800) << 10) + (low - 0xDC00))
            } else {
                None
            }
        }
        _ => None,
    }
}
