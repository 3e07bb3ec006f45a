//! An opened font and its lazily decoded tables.
//!
//! A [FontInstance] reads its table directory when it is opened. Tables are decoded the first
//! time something asks for them and the outcome is remembered, so each decoder runs at most
//! once for the life of the instance.

use std::sync::Arc;

use log::warn;

use crate::binary::read::ReadScope;
use crate::cid::{self, CMapResolver, CidMapping};
use crate::cmap::Cmap;
use crate::directory::{self, FontCollection, TableDirectory};
use crate::error::FontError;
use crate::options::{CidOptions, ParseOptions};
use crate::source::{ByteSource, WindowStack};
use crate::tables::cmap::read_cmap;
use crate::tables::gsub;
use crate::tables::head::HeadTable;
use crate::tables::maxp::MaxpTable;
use crate::tables::metrics::{XHeaderTable, XMetricsArgs, XMetricsTable};
use crate::tables::name::{NameId, NameTable};
use crate::tables::os2::Os2;
use crate::tables::post::PostTable;
use crate::tables::vorg::VorgTable;
use crate::tables::RecordKey;
use crate::tag::{self, DisplayTag};

/// Decoding state of one table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TableStatus {
    /// Not asked for yet.
    Untried,
    /// Absent from the font, missing a prerequisite, or invalid.
    AbsentOrFailed,
    Loaded,
    /// Loaded, but some optional fields were missing.
    LoadedPartial,
}

#[derive(Debug)]
pub(crate) struct LazyTable<T> {
    status: TableStatus,
    value: Option<T>,
}

impl<T> LazyTable<T> {
    const fn new() -> Self {
        LazyTable {
            status: TableStatus::Untried,
            value: None,
        }
    }

    /// Mark the table as attempted. Returns false if it already was.
    fn begin(&mut self) -> bool {
        if self.status != TableStatus::Untried {
            return false;
        }
        self.status = TableStatus::AbsentOrFailed;
        true
    }

    fn finish(&mut self, value: T, partial: bool) {
        self.status = if partial {
            TableStatus::LoadedPartial
        } else {
            TableStatus::Loaded
        };
        self.value = Some(value);
    }

    pub(crate) fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// One sub-font of a font blob.
pub struct FontInstance {
    source: Arc<dyn ByteSource>,
    windows: WindowStack,
    options: ParseOptions,
    collection: FontCollection,
    directory: TableDirectory,
    head: LazyTable<HeadTable>,
    maxp: LazyTable<MaxpTable>,
    hhea: LazyTable<XHeaderTable>,
    hmtx: LazyTable<XMetricsTable>,
    vhea: LazyTable<XHeaderTable>,
    vmtx: LazyTable<XMetricsTable>,
    vorg: LazyTable<VorgTable>,
    post: LazyTable<PostTable>,
    os2: LazyTable<Os2>,
    name: LazyTable<NameTable>,
    cmap: LazyTable<Cmap>,
    cid: Option<CidMapping>,
}

impl FontInstance {
    /// Open sub-font `index` of `source`. Plain fonts only have index 0.
    pub fn open(
        source: Arc<dyn ByteSource>,
        index: usize,
        options: ParseOptions,
    ) -> Result<FontInstance, FontError> {
        let windows = WindowStack::new();
        let (collection, directory) = directory::load_directory(&*source, &windows, index)?;
        Ok(FontInstance {
            source,
            windows,
            options,
            collection,
            directory,
            head: LazyTable::new(),
            maxp: LazyTable::new(),
            hhea: LazyTable::new(),
            hmtx: LazyTable::new(),
            vhea: LazyTable::new(),
            vmtx: LazyTable::new(),
            vorg: LazyTable::new(),
            post: LazyTable::new(),
            os2: LazyTable::new(),
            name: LazyTable::new(),
            cmap: LazyTable::new(),
            cid: None,
        })
    }

    pub fn source(&self) -> &Arc<dyn ByteSource> {
        &self.source
    }

    pub fn collection(&self) -> &FontCollection {
        &self.collection
    }

    pub fn directory(&self) -> &TableDirectory {
        &self.directory
    }

    /// Number of windows currently open on the source.
    pub fn open_windows(&self) -> usize {
        self.windows.depth()
    }

    /// Decoding state of `table_tag`, `None` for tables this crate does not decode.
    pub fn status(&self, table_tag: u32) -> Option<TableStatus> {
        let status = match table_tag {
            tag::HEAD => self.head.status,
            tag::MAXP => self.maxp.status,
            tag::HHEA => self.hhea.status,
            tag::HMTX => self.hmtx.status,
            tag::VHEA => self.vhea.status,
            tag::VMTX => self.vmtx.status,
            tag::VORG => self.vorg.status,
            tag::POST => self.post.status,
            tag::OS_2 => self.os2.status,
            tag::NAME => self.name.status,
            tag::CMAP => self.cmap.status,
            _ => return None,
        };
        Some(status)
    }

    /// Decode `table_tag` from a window onto its data. `None` if the font has no such table.
    fn load<T, E, F>(&self, table_tag: u32, decode: F) -> Result<Option<T>, FontError>
    where
        F: FnOnce(ReadScope<'_>) -> Result<T, E>,
        E: Into<FontError>,
    {
        let record = match self.directory.find(table_tag) {
            Some(record) => *record,
            None => return Ok(None),
        };
        let offset = usize::try_from(record.offset)?;
        let length = usize::try_from(record.length)?;
        let window = self.windows.open(&*self.source, offset, length)?;
        let table = decode(window.scope()).map_err(Into::into)?;
        Ok(Some(table))
    }

    pub fn decode_head(&mut self) -> Result<(), FontError> {
        if !self.head.begin() {
            return Ok(());
        }
        let options = self.options;
        if let Some(head) = self.load(tag::HEAD, |scope| scope.read_dep::<HeadTable>(options))? {
            self.head.finish(head, false);
        }
        Ok(())
    }

    pub fn decode_maxp(&mut self) -> Result<(), FontError> {
        if !self.maxp.begin() {
            return Ok(());
        }
        if let Some(maxp) = self.load(tag::MAXP, |scope| scope.read::<MaxpTable>())? {
            let partial = maxp.is_partial();
            self.maxp.finish(maxp, partial);
        }
        Ok(())
    }

    pub fn decode_hhea(&mut self) -> Result<(), FontError> {
        self.decode_header(Axis::Horizontal)
    }

    pub fn decode_vhea(&mut self) -> Result<(), FontError> {
        self.decode_header(Axis::Vertical)
    }

    pub fn decode_hmtx(&mut self) -> Result<(), FontError> {
        self.decode_metrics(Axis::Horizontal)
    }

    pub fn decode_vmtx(&mut self) -> Result<(), FontError> {
        self.decode_metrics(Axis::Vertical)
    }

    fn decode_header(&mut self, axis: Axis) -> Result<(), FontError> {
        let (table_tag, slot) = match axis {
            Axis::Horizontal => (tag::HHEA, &mut self.hhea),
            Axis::Vertical => (tag::VHEA, &mut self.vhea),
        };
        if !slot.begin() {
            return Ok(());
        }
        if let Some(header) = self.load(table_tag, |scope| scope.read::<XHeaderTable>())? {
            match axis {
                Axis::Horizontal => self.hhea.finish(header, false),
                Axis::Vertical => self.vhea.finish(header, false),
            }
        }
        Ok(())
    }

    fn decode_metrics(&mut self, axis: Axis) -> Result<(), FontError> {
        let (table_tag, slot) = match axis {
            Axis::Horizontal => (tag::HMTX, &mut self.hmtx),
            Axis::Vertical => (tag::VMTX, &mut self.vmtx),
        };
        if !slot.begin() {
            return Ok(());
        }
        if !self.directory.contains(table_tag) {
            return Ok(());
        }

        self.decode_header(axis)?;
        self.decode_maxp()?;
        let header = match axis {
            Axis::Horizontal => self.hhea.get(),
            Axis::Vertical => self.vhea.get(),
        };
        let (header, maxp) = match (header, self.maxp.get()) {
            (Some(header), Some(maxp)) => (header, maxp),
            _ => {
                warn!(
                    "{}: ignored, header or maxp table unavailable",
                    DisplayTag(table_tag)
                );
                return Ok(());
            }
        };
        let args = XMetricsArgs {
            tag: table_tag,
            num_glyphs: maxp.num_glyphs,
            num_long_metrics: header.num_long_metrics,
        };

        if let Some(metrics) =
            self.load(table_tag, |scope| scope.read_dep::<XMetricsTable>(args))?
        {
            match axis {
                Axis::Horizontal => self.hmtx.finish(metrics, false),
                Axis::Vertical => self.vmtx.finish(metrics, false),
            }
        }
        Ok(())
    }

    pub fn decode_vorg(&mut self) -> Result<(), FontError> {
        if !self.vorg.begin() {
            return Ok(());
        }
        if let Some(vorg) = self.load(tag::VORG, |scope| scope.read::<VorgTable>())? {
            self.vorg.finish(vorg, false);
        }
        Ok(())
    }

    pub fn decode_post(&mut self) -> Result<(), FontError> {
        if !self.post.begin() {
            return Ok(());
        }
        if let Some(post) = self.load(tag::POST, |scope| scope.read::<PostTable>())? {
            self.post.finish(post, false);
        }
        Ok(())
    }

    pub fn decode_os2(&mut self) -> Result<(), FontError> {
        if !self.os2.begin() {
            return Ok(());
        }
        if let Some(os2) = self.load(tag::OS_2, |scope| scope.read::<Os2>())? {
            let partial = os2.is_partial();
            self.os2.finish(os2, partial);
        }
        Ok(())
    }

    pub fn decode_name(&mut self) -> Result<(), FontError> {
        if !self.name.begin() {
            return Ok(());
        }
        if let Some(name) = self.load(tag::NAME, |scope| scope.read::<NameTable>())? {
            self.name.finish(name, false);
        }
        Ok(())
    }

    pub fn decode_cmap(&mut self) -> Result<(), FontError> {
        if !self.cmap.begin() {
            return Ok(());
        }
        if let Some(cmap) = self.load(tag::CMAP, read_cmap)? {
            self.cmap.finish(cmap, false);
        }
        Ok(())
    }

    /// Vertical substitution pairs from `GSUB`. Not cached, only CID construction uses them.
    pub(crate) fn vertical_substitutions(&self) -> Result<Option<Vec<(u16, u16)>>, FontError> {
        self.load(tag::GSUB, gsub::vertical_substitutions)
    }

    pub fn head(&mut self) -> Result<Option<&HeadTable>, FontError> {
        self.decode_head()?;
        Ok(self.head.get())
    }

    pub fn units_per_em(&mut self) -> Result<Option<u16>, FontError> {
        Ok(self.head()?.map(|head| head.units_per_em))
    }

    pub fn num_glyphs(&mut self) -> Result<Option<u16>, FontError> {
        self.decode_maxp()?;
        Ok(self.maxp.get().map(|maxp| maxp.num_glyphs))
    }

    pub fn advance_width(&mut self, glyph_id: u16) -> Result<Option<u16>, FontError> {
        self.decode_hmtx()?;
        Ok(self.hmtx.get().and_then(|hmtx| hmtx.advance(glyph_id)))
    }

    pub fn advance_height(&mut self, glyph_id: u16) -> Result<Option<u16>, FontError> {
        self.decode_vmtx()?;
        Ok(self.vmtx.get().and_then(|vmtx| vmtx.advance(glyph_id)))
    }

    /// Vertical origin of `glyph_id` from `VORG`, `None` if the font has no `VORG` table.
    pub fn vertical_origin(&mut self, glyph_id: u16) -> Result<Option<i16>, FontError> {
        self.decode_vorg()?;
        Ok(self.vorg.get().map(|vorg| vorg.vertical_origin(glyph_id)))
    }

    pub fn name(&mut self, name_id: NameId) -> Result<Option<String>, FontError> {
        self.decode_name()?;
        Ok(self.name.get().and_then(|name| name.string_for_id(name_id)))
    }

    pub fn glyph_name(&mut self, glyph_id: u16) -> Result<Option<String>, FontError> {
        self.decode_post()?;
        Ok(self
            .post
            .get()
            .and_then(|post| post.glyph_name(glyph_id))
            .map(|name| name.into_owned()))
    }

    pub fn os2(&mut self) -> Result<Option<&Os2>, FontError> {
        self.decode_os2()?;
        Ok(self.os2.get())
    }

    pub fn cmap(&mut self) -> Result<Option<&Cmap>, FontError> {
        self.decode_cmap()?;
        Ok(self.cmap.get())
    }

    /// Glyph for `code` in the subtable best matching `priorities`.
    pub fn cmap_lookup(
        &mut self,
        priorities: &[RecordKey],
        code: u32,
    ) -> Result<Option<u16>, FontError> {
        match self.cmap()? {
            Some(cmap) => cmap.lookup(priorities, code),
            None => Ok(None),
        }
    }

    pub(crate) fn loaded_name(&self) -> Option<&NameTable> {
        self.name.get()
    }

    pub(crate) fn loaded_cmap(&self) -> Option<&Cmap> {
        self.cmap.get()
    }

    /// Work out how the font is used as a CID font, replacing any earlier mapping.
    ///
    /// `Ok(None)` means the font is not a CID font under `options`.
    pub fn build_cid_mapping(
        &mut self,
        resolver: &dyn CMapResolver,
        options: &CidOptions,
    ) -> Result<Option<&CidMapping>, FontError> {
        self.cid = None;
        self.cid = cid::build(self, resolver, options)?;
        Ok(self.cid.as_ref())
    }

    /// The mapping from the last successful [FontInstance::build_cid_mapping].
    pub fn cid_mapping(&self) -> Option<&CidMapping> {
        self.cid.as_ref()
    }
}
