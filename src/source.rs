//! Windowed access to font data.
//!
//! Table decoders never see the whole font blob. They ask a [ByteSource] for a window of bytes
//! at an offset, read from it, and close it again. Windows opened through a [WindowStack] are
//! closed automatically, in reverse order of opening, when the [Window] guard is dropped.

use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::binary::read::ReadScope;
use crate::error::{FontError, ParseError};

/// Supplier of windows onto a font blob.
pub trait ByteSource: Send + Sync {
    /// Total length of the blob in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return `length` bytes starting at `offset`.
    fn open_window(&self, offset: usize, length: usize) -> Result<Cow<'_, [u8]>, ParseError>;

    /// Release a window previously returned by `open_window`.
    fn close_window(&self, _offset: usize, _length: usize) {}

    /// Whether the data behind this source still exists. Unreachable sources are evicted from
    /// the font cache regardless of use.
    fn is_reachable(&self) -> bool {
        true
    }
}

fn window_range(len: usize, offset: usize, length: usize) -> Result<(usize, usize), ParseError> {
    if offset > len {
        return Err(ParseError::BadOffset);
    }
    let end = offset.checked_add(length).ok_or(ParseError::BadEof)?;
    if end > len {
        return Err(ParseError::BadEof);
    }
    Ok((offset, end))
}

/// An in-memory font blob.
#[derive(Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        MemorySource { data: data.into() }
    }

    /// A source that holds `self`'s data weakly.
    pub fn downgrade(&self) -> WeakSource {
        WeakSource {
            data: Arc::downgrade(&self.data),
            len: self.data.len(),
        }
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn open_window(&self, offset: usize, length: usize) -> Result<Cow<'_, [u8]>, ParseError> {
        let (start, end) = window_range(self.data.len(), offset, length)?;
        Ok(Cow::Borrowed(&self.data[start..end]))
    }
}

/// A font blob owned elsewhere. Once its owner drops the data the source becomes unreachable and
/// every window request fails.
pub struct WeakSource {
    data: Weak<[u8]>,
    len: usize,
}

impl ByteSource for WeakSource {
    fn len(&self) -> usize {
        self.len
    }

    fn open_window(&self, offset: usize, length: usize) -> Result<Cow<'_, [u8]>, ParseError> {
        let data = self.data.upgrade().ok_or(ParseError::MissingValue)?;
        let (start, end) = window_range(data.len(), offset, length)?;
        Ok(Cow::Owned(data[start..end].to_vec()))
    }

    fn is_reachable(&self) -> bool {
        self.data.strong_count() > 0
    }
}

/// A font file read on demand.
pub struct FileSource {
    file: Mutex<File>,
    len: usize,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let len = usize::try_from(file.metadata()?.len())
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidData))?;
        Ok(FileSource {
            file: Mutex::new(file),
            len,
        })
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> usize {
        self.len
    }

    fn open_window(&self, offset: usize, length: usize) -> Result<Cow<'_, [u8]>, ParseError> {
        window_range(self.len, offset, length)?;
        let mut file = self.file.lock().map_err(|_| ParseError::MissingValue)?;
        let mut buf = vec![0; length];
        file.seek(SeekFrom::Start(offset as u64))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|_| ParseError::BadEof)?;
        Ok(Cow::Owned(buf))
    }
}

/// A font supplied as a list of byte arrays that together form one blob, as in a PostScript
/// `sfnts` array.
pub struct SfntArraySource {
    chunks: Vec<Box<[u8]>>,
    starts: Vec<usize>,
    len: usize,
}

impl SfntArraySource {
    pub fn new(chunks: Vec<Box<[u8]>>) -> Self {
        let mut starts = Vec::with_capacity(chunks.len());
        let mut len = 0;
        for chunk in &chunks {
            starts.push(len);
            len += chunk.len();
        }
        SfntArraySource {
            chunks,
            starts,
            len,
        }
    }

    fn chunk_containing(&self, offset: usize) -> usize {
        // The last chunk whose start is <= offset, skipping empty chunks
        self.starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }
}

impl ByteSource for SfntArraySource {
    fn len(&self) -> usize {
        self.len
    }

    fn open_window(&self, offset: usize, length: usize) -> Result<Cow<'_, [u8]>, ParseError> {
        let (start, end) = window_range(self.len, offset, length)?;
        if length == 0 {
            return Ok(Cow::Borrowed(&[]));
        }

        let first = self.chunk_containing(start);
        let chunk_start = self.starts[first];
        let chunk = &self.chunks[first];
        if end <= chunk_start + chunk.len() {
            return Ok(Cow::Borrowed(&chunk[start - chunk_start..end - chunk_start]));
        }

        // Window spans chunks
        let mut buf = Vec::with_capacity(length);
        for (chunk, &chunk_start) in self.chunks[first..].iter().zip(&self.starts[first..]) {
            if chunk_start >= end {
                break;
            }
            let from = start.saturating_sub(chunk_start);
            let to = (end - chunk_start).min(chunk.len());
            buf.extend_from_slice(&chunk[from..to]);
        }
        Ok(Cow::Owned(buf))
    }
}

/// Tracks the windows open against one font instance.
#[derive(Default)]
pub struct WindowStack {
    depth: AtomicUsize,
}

impl WindowStack {
    pub fn new() -> Self {
        WindowStack::default()
    }

    /// Number of windows currently open.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn open<'s>(
        &'s self,
        source: &'s dyn ByteSource,
        offset: usize,
        length: usize,
    ) -> Result<Window<'s>, FontError> {
        let data = source.open_window(offset, length)?;
        let level = self.depth.fetch_add(1, Ordering::AcqRel);
        Ok(Window {
            source,
            stack: self,
            offset,
            length,
            level,
            data,
        })
    }
}

/// An open window. Closed on drop.
pub struct Window<'s> {
    source: &'s dyn ByteSource,
    stack: &'s WindowStack,
    offset: usize,
    length: usize,
    level: usize,
    data: Cow<'s, [u8]>,
}

impl<'s> Window<'s> {
    pub fn scope(&self) -> ReadScope<'_> {
        ReadScope::with_base(self.offset, &self.data)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for Window<'_> {
    fn drop(&mut self) {
        let previous = self.stack.depth.fetch_sub(1, Ordering::AcqRel);
        debug_assert_eq!(previous, self.level + 1, "windows closed out of order");
        self.source.close_window(self.offset, self.length);
    }
}
