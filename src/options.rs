//! Parsing and CID construction options.

use crate::cid::{CharacterCollection, Ros};

/// How strictly to treat technically invalid but harmless values.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Strictness {
    /// Accept reserved bits and out of range hints, logging a warning.
    Permissive,
    /// Reject them as invalid.
    Strict,
}

impl Default for Strictness {
    fn default() -> Self {
        if cfg!(feature = "strict") {
            Strictness::Strict
        } else {
            Strictness::Permissive
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub strictness: Strictness,
}

impl ParseOptions {
    pub fn strict() -> Self {
        ParseOptions {
            strictness: Strictness::Strict,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strictness == Strictness::Strict
    }
}

/// Inputs to CID mapping construction supplied by the document using the font.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CidOptions {
    /// Registry, Ordering and Supplement named by the document, if any.
    pub pinned: Option<Ros>,
    /// Treat the font as CID-keyed even when nothing identifies it as such.
    pub force_cid: bool,
    /// Character collection to use when the `OS/2` code pages are ambiguous.
    pub force_collection: Option<CharacterCollection>,
}

impl CidOptions {
    pub fn forced() -> Self {
        CidOptions {
            force_cid: true,
            ..CidOptions::default()
        }
    }

    pub fn pinned(ros: Ros) -> Self {
        CidOptions {
            pinned: Some(ros),
            ..CidOptions::default()
        }
    }

    /// The collection the caller asked for, either directly or through a pinned ROS.
    pub fn requested_collection(&self) -> Option<CharacterCollection> {
        self.force_collection.or_else(|| {
            self.pinned
                .as_ref()
                .and_then(CharacterCollection::from_ros)
        })
    }
}
