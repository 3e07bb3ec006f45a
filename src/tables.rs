//! Decoders for individual sfnt tables.
//!
//! Each decoder reads an owned, validated form of its table out of a [ReadScope] covering
//! exactly that table.
//!
//! [ReadScope]: crate::binary::read::ReadScope

pub mod cmap;
pub mod gsub;
pub mod head;
pub mod maxp;
pub mod metrics;
pub mod name;
pub mod os2;
pub mod post;
pub mod vorg;

/// Selects records by platform, encoding and language. `None` matches any value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub platform_id: Option<u16>,
    pub encoding_id: Option<u16>,
    pub language_id: Option<u16>,
}

impl RecordKey {
    pub const fn new(platform_id: u16, encoding_id: u16, language_id: Option<u16>) -> Self {
        RecordKey {
            platform_id: Some(platform_id),
            encoding_id: Some(encoding_id),
            language_id,
        }
    }

    /// Match any encoding and language of `platform_id`
    pub const fn platform(platform_id: u16) -> Self {
        RecordKey {
            platform_id: Some(platform_id),
            encoding_id: None,
            language_id: None,
        }
    }

    pub fn matches(&self, platform_id: u16, encoding_id: u16, language_id: u16) -> bool {
        self.platform_id.map_or(true, |id| id == platform_id)
            && self.encoding_id.map_or(true, |id| id == encoding_id)
            && self.language_id.map_or(true, |id| id == language_id)
    }
}

/// Find the item that matches the earliest entry in `priorities`.
///
/// An item matching the first priority is returned immediately. Otherwise every item is
/// examined, and each match narrows the remaining search to strictly earlier priorities.
pub fn priority_search<I, T, F>(items: I, priorities: &[RecordKey], ids: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> (u16, u16, u16),
{
    let mut best = None;
    let mut limit = priorities.len();
    for item in items {
        let (platform_id, encoding_id, language_id) = ids(&item);
        let rank = priorities[..limit]
            .iter()
            .position(|key| key.matches(platform_id, encoding_id, language_id));
        match rank {
            Some(0) => return Some(item),
            Some(rank) => {
                limit = rank;
                best = Some(item);
            }
            None => {}
        }
    }
    best
}
