//! Cache of opened fonts.
//!
//! Opening a font reads its table directory, and every table decoded afterwards stays with the
//! [FontInstance]. The cache keeps instances alive between uses so that work is done once per
//! font, and frees them again when asked to release memory.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use log::debug;
use rustc_hash::FxHashMap;

use crate::error::FontError;
use crate::font::FontInstance;
use crate::options::ParseOptions;
use crate::source::ByteSource;

/// Identifies a sub-font of a blob. The caller chooses `source_id`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    pub source_id: u64,
    pub index: usize,
}

/// Refers to a cache entry. Handles to evicted entries stay invalid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FontHandle {
    slot: usize,
    generation: u32,
}

struct Entry {
    key: FontKey,
    font: Arc<Mutex<FontInstance>>,
    source: Arc<dyn ByteSource>,
    bytes: usize,
    last_used: u64,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Default)]
struct Entries {
    slots: Vec<Slot>,
    free: Vec<usize>,
    by_key: FxHashMap<FontKey, usize>,
    total_bytes: usize,
    clock: u64,
}

impl Entries {
    fn handle(&self, slot: usize) -> FontHandle {
        FontHandle {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    fn touch(&mut self, handle: FontHandle) -> Option<&Entry> {
        self.clock += 1;
        let clock = self.clock;
        let slot = self.slots.get_mut(handle.slot)?;
        if slot.generation != handle.generation {
            return None;
        }
        let entry = slot.entry.as_mut()?;
        entry.last_used = clock;
        Some(entry)
    }

    fn insert(&mut self, key: FontKey, font: FontInstance) -> FontHandle {
        let source = Arc::clone(font.source());
        let bytes = source.len();
        self.clock += 1;
        let entry = Entry {
            key,
            font: Arc::new(Mutex::new(font)),
            source,
            bytes,
            last_used: self.clock,
        };
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        self.slots[slot].entry = Some(entry);
        self.by_key.insert(key, slot);
        self.total_bytes += bytes;
        self.handle(slot)
    }

    /// Remove the entry in `slot`, returning its size.
    fn evict(&mut self, slot: usize) -> usize {
        let entry = match self.slots[slot].entry.take() {
            Some(entry) => entry,
            None => return 0,
        };
        self.slots[slot].generation = self.slots[slot].generation.wrapping_add(1);
        self.free.push(slot);
        self.by_key.remove(&entry.key);
        self.total_bytes -= entry.bytes;
        debug!(
            "cache: evicted font {}:{}",
            entry.key.source_id, entry.key.index
        );
        entry.bytes
    }
}

impl Entry {
    /// Whether some caller has the font locked or windows open on its source.
    fn in_use(&self) -> bool {
        match self.font.try_lock() {
            Ok(font) => font.open_windows() > 0,
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().open_windows() > 0,
        }
    }
}

/// Opened fonts, shared between threads.
#[derive(Default)]
pub struct FontCache {
    entries: Mutex<Entries>,
}

impl FontCache {
    pub fn new() -> Self {
        FontCache::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle for `key`, if it is cached.
    pub fn lookup(&self, key: FontKey) -> Option<FontHandle> {
        let mut entries = self.lock();
        let slot = *entries.by_key.get(&key)?;
        let handle = entries.handle(slot);
        entries.touch(handle).map(|_| handle)
    }

    /// Handle for `key`, opening sub-font `key.index` of `source` if it is not cached.
    ///
    /// The table directory is read without holding the cache lock.
    pub fn open(
        &self,
        key: FontKey,
        source: Arc<dyn ByteSource>,
        options: ParseOptions,
    ) -> Result<FontHandle, FontError> {
        if let Some(handle) = self.lookup(key) {
            return Ok(handle);
        }

        let font = FontInstance::open(source, key.index, options)?;

        let mut entries = self.lock();
        // Another thread may have opened the same font meanwhile
        if let Some(&slot) = entries.by_key.get(&key) {
            let handle = entries.handle(slot);
            entries.touch(handle);
            return Ok(handle);
        }
        Ok(entries.insert(key, font))
    }

    /// Run `f` on the font behind `handle`. `None` if the entry has been evicted.
    ///
    /// Only the font itself is locked while `f` runs, so distinct fonts can be used in parallel.
    pub fn with_font<R, F>(&self, handle: FontHandle, f: F) -> Option<R>
    where
        F: FnOnce(&mut FontInstance) -> R,
    {
        let font = {
            let mut entries = self.lock();
            Arc::clone(&entries.touch(handle)?.font)
        };
        let mut font = font.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut font))
    }

    /// Free at least `bytes` bytes if possible, returning the number freed.
    ///
    /// Fonts whose source has become unreachable are always evicted. Then fonts not in use are
    /// evicted least recently used first until enough has been freed.
    pub fn purge(&self, bytes: usize) -> usize {
        let mut entries = self.lock();
        let mut freed = 0;

        let unreachable = entries
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, s)| s.entry.as_ref().map(|entry| (slot, entry)))
            .filter(|(_, entry)| !entry.source.is_reachable())
            .map(|(slot, _)| slot)
            .collect::<Vec<_>>();
        for slot in unreachable {
            freed += entries.evict(slot);
        }

        let mut idle = entries
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, s)| s.entry.as_ref().map(|entry| (slot, entry)))
            .filter(|(_, entry)| !entry.in_use())
            .map(|(slot, entry)| (entry.last_used, slot))
            .collect::<Vec<_>>();
        idle.sort_unstable();
        for (_, slot) in idle {
            if freed >= bytes {
                break;
            }
            freed += entries.evict(slot);
        }
        freed
    }

    /// Combined size of the sources of all cached fonts.
    pub fn total_bytes(&self) -> usize {
        self.lock().total_bytes
    }

    pub fn len(&self) -> usize {
        self.lock().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::tests::{head_table, maxp_table, sfnt};

    fn font_data() -> Vec<u8> {
        sfnt(&[(b"head", head_table(1000)), (b"maxp", maxp_table(4))])
    }

    fn key(source_id: u64) -> FontKey {
        FontKey {
            source_id,
            index: 0,
        }
    }

    #[test]
    fn test_open_reuses_entry() {
        let cache = FontCache::new();
        let data = font_data();
        let len = data.len();
        let source: Arc<dyn ByteSource> = Arc::new(MemorySource::new(data));
        let first = cache
            .open(key(1), Arc::clone(&source), ParseOptions::default())
            .unwrap();
        assert_eq!(cache.with_font(first, |font| font.num_glyphs()), Some(Ok(Some(4))));
        let second = cache.open(key(1), source, ParseOptions::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), len);
    }

    #[test]
    fn test_purge_least_recently_used() {
        let cache = FontCache::new();
        let len = font_data().len();
        let handles = (0..3)
            .map(|id| {
                let source = Arc::new(MemorySource::new(font_data()));
                cache.open(key(id), source, ParseOptions::default()).unwrap()
            })
            .collect::<Vec<_>>();
        cache.with_font(handles[0], |_| ());

        assert_eq!(cache.purge(len + 1), 2 * len);
        assert_eq!(cache.len(), 1);
        assert!(cache.with_font(handles[1], |_| ()).is_none());
        assert!(cache.with_font(handles[0], |_| ()).is_some());
        assert_eq!(cache.lookup(key(2)), None);
    }

    #[test]
    fn test_font_in_use_not_evicted() {
        let cache = FontCache::new();
        let source = Arc::new(MemorySource::new(font_data()));
        let handle = cache.open(key(1), source, ParseOptions::default()).unwrap();
        let freed = cache.with_font(handle, |_| cache.purge(usize::MAX));
        assert_eq!(freed, Some(0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_opens_share_entry() {
        let cache = FontCache::new();
        let source: Arc<dyn ByteSource> = Arc::new(MemorySource::new(font_data()));
        let results = std::thread::scope(|scope| {
            let workers = (0..8)
                .map(|_| {
                    let source = Arc::clone(&source);
                    let cache = &cache;
                    scope.spawn(move || {
                        let handle = cache.open(key(1), source, ParseOptions::default()).unwrap();
                        let used = cache.with_font(handle, |font| {
                            // The font is locked here, so it must survive the purge
                            (cache.purge(usize::MAX), font.num_glyphs())
                        });
                        (handle, used)
                    })
                })
                .collect::<Vec<_>>();
            workers
                .into_iter()
                .map(|worker| worker.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert_eq!(cache.len(), 1);
        let first = results[0].0;
        for (handle, used) in results {
            assert_eq!(handle, first);
            assert_eq!(used, Some((0, Ok(Some(4)))));
        }
        assert!(cache.with_font(first, |_| ()).is_some());
    }

    #[test]
    fn test_unreachable_source_evicted() {
        let cache = FontCache::new();
        let owner = MemorySource::new(font_data());
        let source = Arc::new(owner.downgrade());
        let handle = cache.open(key(1), source, ParseOptions::default()).unwrap();
        assert_eq!(cache.purge(0), 0);
        assert_eq!(cache.len(), 1);

        drop(owner);
        assert_eq!(cache.purge(0), font_data().len());
        assert!(cache.with_font(handle, |_| ()).is_none());
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn test_slot_reuse_invalidates_old_handle() {
        let cache = FontCache::new();
        let first = cache
            .open(key(1), Arc::new(MemorySource::new(font_data())), ParseOptions::default())
            .unwrap();
        cache.purge(usize::MAX);
        let second = cache
            .open(key(2), Arc::new(MemorySource::new(font_data())), ParseOptions::default())
            .unwrap();
        assert_ne!(first, second);
        assert!(cache.with_font(first, |_| ()).is_none());
        assert!(cache.with_font(second, |_| ()).is_some());
    }
}
