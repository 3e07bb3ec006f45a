//! Vertical form correction for Adobe-Japan1 mappings built through Unicode.
//!
//! The UTF-16 CMaps map vertical form CIDs to the same characters as their horizontal
//! counterparts, so correlating them with a Unicode `cmap` gives both the horizontal glyph.
//! The font's `vert`/`vrt2` substitutions say which glyph to use instead.

use rustc_hash::FxHashMap;
use tinyvec::TinyVec;

use crate::cid::CidScratch;

/// Adobe-Japan1 CID ranges holding vertical forms.
pub const VERTICAL_CID_RANGES: [(u32, u32); 5] = [
    (7887, 7961),
    (8267, 8285),
    (12870, 13011),
    (16194, 16209),
    (16332, 16349),
];

/// Point the vertical form CIDs at the glyphs `substitutions` replace their glyphs with.
///
/// When several substitutions apply to the same glyph the first one wins.
pub(crate) fn apply(scratch: &mut CidScratch, substitutions: &[(u16, u16)]) {
    let mut by_glyph: FxHashMap<u16, TinyVec<[u32; 2]>> = FxHashMap::default();
    for (first, last) in VERTICAL_CID_RANGES {
        for cid in first..=last {
            match scratch.get(cid) {
                0 => {}
                glyph => by_glyph.entry(glyph).or_default().push(cid),
            }
        }
    }

    for &(from, to) in substitutions {
        if let Some(cids) = by_glyph.remove(&from) {
            for cid in cids {
                scratch.replace(cid, to);
            }
        }
    }
}
