#![warn(rust_2018_idioms)]

//! TrueType and OpenType table parsing for CID-keyed printing.
//!
//! A font is opened from a [ByteSource](source::ByteSource) as a [FontInstance]. Its tables are
//! decoded on demand, character codes are mapped to glyphs through its `cmap` subtables, and a
//! [CidMapping] can be built for using it as a CIDFont.

/// Reading of binary data.
pub mod binary;
pub mod cache;
/// Checksum calculation routines.
pub mod checksum;
pub mod cid;
pub mod cmap;
pub mod directory;
pub mod error;
pub mod font;
pub mod options;
pub mod size;
pub mod source;
pub mod tables;
pub mod tag;

pub use crate::cache::{FontCache, FontHandle, FontKey};
pub use crate::cid::{CMapResolver, CidMapping, ResolvedCMap, Ros};
pub use crate::error::{FontError, ParseError};
pub use crate::font::{FontInstance, TableStatus};
pub use crate::options::{CidOptions, ParseOptions, Strictness};
