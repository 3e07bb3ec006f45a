//! sfnt and TrueType Collection table directories.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/otff#organization-of-an-opentype-font>

use log::debug;

use crate::binary::read::{ReadFrom, ReadScope};
use crate::binary::U32Be;
use crate::checksum;
use crate::error::{FontError, ParseError};
use crate::size;
use crate::source::{ByteSource, WindowStack};
use crate::tag::{self, DisplayTag};

/// sfnt version of TrueType outline fonts.
pub const TTF_MAGIC: u32 = 0x00010000;

/// The flavour of font data at the start of a blob.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SfntKind {
    /// `0x00010000` or Apple's `'true'`
    TrueType,
    /// `'OTTO'`, CFF outlines
    Cff,
    /// `'ttcf'`
    Collection,
}

/// The outermost header of a font blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontCollection {
    pub kind: SfntKind,
    /// Offset of the collection header in the blob. Always 0 for blobs that start with one.
    pub header_offset: u32,
    /// Collection version, `0x00010000` or `0x00020000`. Zero for plain fonts.
    pub version: u32,
    /// Offset of each sub-font's sfnt header. A plain font has the single offset 0.
    pub offsets: Vec<u32>,
}

/// An entry in a sub-font's table directory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TableRecord {
    pub table_tag: u32,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}

/// One sub-font's table directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDirectory {
    pub sfnt_version: u32,
    /// Records in the order they appear in the font.
    pub records: Vec<TableRecord>,
}

impl ReadFrom for TableRecord {
    type ReadType = ((U32Be, U32Be), (U32Be, U32Be));
    fn read_from(((table_tag, checksum), (offset, length)): ((u32, u32), (u32, u32))) -> Self {
        TableRecord {
            table_tag,
            checksum,
            offset,
            length,
        }
    }
}

impl TableRecord {
    /// Whether `data`, the contents of this table, matches the recorded checksum.
    pub fn checksum_matches(&self, data: &[u8]) -> bool {
        let sum = if self.table_tag == tag::HEAD {
            checksum::head_checksum(data)
        } else {
            checksum::table_checksum(data)
        };
        sum.0 == self.checksum
    }
}

impl FontCollection {
    pub fn num_fonts(&self) -> usize {
        self.offsets.len()
    }
}

impl TableDirectory {
    /// Find the record for `tag`.
    ///
    /// When a tag appears more than once the last record with a non-zero length is used.
    /// Zero length records are never returned.
    pub fn find(&self, tag: u32) -> Option<&TableRecord> {
        self.records
            .iter()
            .rev()
            .find(|record| record.table_tag == tag && record.length != 0)
    }

    pub fn contains(&self, tag: u32) -> bool {
        self.find(tag).is_some()
    }
}

fn sfnt_kind(version: u32) -> Option<SfntKind> {
    match version {
        TTF_MAGIC | tag::TRUE => Some(SfntKind::TrueType),
        tag::OTTO => Some(SfntKind::Cff),
        tag::TTCF => Some(SfntKind::Collection),
        _ => None,
    }
}

/// Read the header of `source` and the table directory of sub-font `index`.
pub fn load_directory(
    source: &dyn ByteSource,
    windows: &WindowStack,
    index: usize,
) -> Result<(FontCollection, TableDirectory), FontError> {
    let collection = read_collection(source, windows)?;
    let offset = *collection
        .offsets
        .get(index)
        .ok_or(ParseError::BadIndex)?;
    let directory = read_directory(source, windows, offset)?;
    Ok((collection, directory))
}

fn read_collection(
    source: &dyn ByteSource,
    windows: &WindowStack,
) -> Result<FontCollection, FontError> {
    let window = windows.open(source, 0, size::U32.min(source.len()))?;
    let version = window.scope().read::<U32Be>()?;
    drop(window);

    let kind = sfnt_kind(version).ok_or(ParseError::BadVersion)?;
    if kind != SfntKind::Collection {
        return Ok(FontCollection {
            kind,
            header_offset: 0,
            version: 0,
            offsets: vec![0],
        });
    }

    let header = windows.open(source, 0, size::TTC_HEADER)?;
    let mut ctxt = header.scope().ctxt();
    let _ttc_tag = ctxt.read_u32be()?;
    let version = ctxt.read_u32be()?;
    let major_version = (version >> 16) as u16;
    ctxt.check_version(major_version == 1 || major_version == 2)?;
    let num_fonts = usize::try_from(ctxt.read_u32be()?)?;
    ctxt.check(num_fonts > 0)?;
    drop(header);

    let length = num_fonts
        .checked_mul(size::U32)
        .ok_or(ParseError::LimitExceeded)?;
    let window = windows.open(source, size::TTC_HEADER, length)?;
    let array = window.scope().ctxt().read_array::<U32Be>(num_fonts)?;
    let mut offsets = Vec::new();
    offsets.try_reserve_exact(num_fonts)?;
    offsets.extend(array.iter());

    Ok(FontCollection {
        kind,
        header_offset: 0,
        version,
        offsets,
    })
}

fn read_directory(
    source: &dyn ByteSource,
    windows: &WindowStack,
    offset: u32,
) -> Result<TableDirectory, FontError> {
    let offset = usize::try_from(offset)?;
    let header = windows.open(source, offset, size::OFFSET_TABLE)?;
    let mut ctxt = header.scope().ctxt();
    let sfnt_version = ctxt.read_u32be()?;
    match sfnt_kind(sfnt_version) {
        Some(SfntKind::TrueType) | Some(SfntKind::Cff) => {}
        // A collection inside a collection is not allowed
        Some(SfntKind::Collection) | None => return Err(ParseError::BadVersion.into()),
    }
    let num_tables = usize::from(ctxt.read_u16be()?);
    ctxt.check(num_tables > 0)?;
    drop(header);

    let window = windows.open(
        source,
        offset + size::OFFSET_TABLE,
        num_tables * size::TABLE_RECORD,
    )?;
    let array = window
        .scope()
        .ctxt()
        .read_array::<TableRecord>(num_tables)?;
    let mut records = Vec::new();
    records.try_reserve_exact(num_tables)?;
    records.extend(array.iter());
    drop(window);

    for record in &records {
        verify_checksum(source, windows, record);
    }

    Ok(TableDirectory {
        sfnt_version,
        records,
    })
}

// Checksums are advisory. Mismatches and unreadable tables are reported, never fatal.
fn verify_checksum(source: &dyn ByteSource, windows: &WindowStack, record: &TableRecord) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let (Ok(offset), Ok(length)) = (usize::try_from(record.offset), usize::try_from(record.length))
    else {
        return;
    };
    match windows.open(source, offset, length) {
        Ok(window) if !record.checksum_matches(window.data()) => {
            debug!("checksum mismatch in '{}' table", DisplayTag(record.table_tag));
        }
        Ok(_) => {}
        Err(err) => debug!(
            "'{}' table lies outside the font data: {}",
            DisplayTag(record.table_tag),
            err
        ),
    }
}

/// Parse a table directory held entirely in memory.
pub fn read_directory_from(scope: ReadScope<'_>) -> Result<TableDirectory, ParseError> {
    let mut ctxt = scope.ctxt();
    let sfnt_version = ctxt.read_u32be()?;
    ctxt.check_version(matches!(
        sfnt_kind(sfnt_version),
        Some(SfntKind::TrueType) | Some(SfntKind::Cff)
    ))?;
    let num_tables = usize::from(ctxt.read_u16be()?);
    ctxt.check(num_tables > 0)?;
    ctxt.skip(3 * size::U16)?;
    let records = ctxt.read_array::<TableRecord>(num_tables)?.to_vec();
    Ok(TableDirectory {
        sfnt_version,
        records,
    })
}
