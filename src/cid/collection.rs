//! Adobe character collections recognised when inferring a font's ROS.

use tinyvec::ArrayVec;

use crate::cid::Ros;
use crate::tables::os2::CodePage1;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum CharacterCollection {
    #[default]
    Japan1,
    Gb1,
    Cns1,
    Korea1,
}

// Number of CIDs in each supplement, indexed by supplement
const JAPAN1_SUPPLEMENTS: &[u32] = &[8284, 8359, 8720, 9354, 15444, 20317, 23058, 23060];
const GB1_SUPPLEMENTS: &[u32] = &[7717, 9897, 22127, 22353, 29064, 30284];
const CNS1_SUPPLEMENTS: &[u32] = &[14099, 17408, 17601, 18846, 18965, 19088, 19156, 19179];
const KOREA1_SUPPLEMENTS: &[u32] = &[9333, 18155, 18352];

/// Share of a supplement's CIDs, in percent, that must be present for it to count.
const SUPPLEMENT_COVERAGE: u64 = 80;

impl CharacterCollection {
    pub const ALL: [CharacterCollection; 4] = [
        CharacterCollection::Japan1,
        CharacterCollection::Gb1,
        CharacterCollection::Cns1,
        CharacterCollection::Korea1,
    ];

    pub fn ordering(self) -> &'static str {
        match self {
            CharacterCollection::Japan1 => "Japan1",
            CharacterCollection::Gb1 => "GB1",
            CharacterCollection::Cns1 => "CNS1",
            CharacterCollection::Korea1 => "Korea1",
        }
    }

    /// The collection an Adobe ROS belongs to.
    pub fn from_ros(ros: &Ros) -> Option<CharacterCollection> {
        if ros.registry != "Adobe" {
            return None;
        }
        CharacterCollection::ALL
            .into_iter()
            .find(|collection| collection.ordering() == ros.ordering)
    }

    /// Collections whose code page bits are set, without duplicates.
    pub fn from_code_pages(code_pages: CodePage1) -> ArrayVec<[CharacterCollection; 4]> {
        let mut collections = ArrayVec::new();
        let bits = [
            (CodePage1::JIS_JAPAN, CharacterCollection::Japan1),
            (CodePage1::CHINESE_SIMPLIFIED, CharacterCollection::Gb1),
            (CodePage1::CHINESE_TRADITIONAL, CharacterCollection::Cns1),
            (CodePage1::KOREAN_WANSUNG, CharacterCollection::Korea1),
            (CodePage1::KOREAN_JOHAB, CharacterCollection::Korea1),
        ];
        for (bit, collection) in bits {
            if code_pages.contains(bit) && !collections.contains(&collection) {
                collections.push(collection);
            }
        }
        collections
    }

    /// UTF-16 CMaps for this collection, horizontal first.
    pub fn unicode_cmaps(self) -> &'static [&'static str] {
        match self {
            CharacterCollection::Japan1 => &["UniJIS-UTF16-H", "UniJIS-UTF16-V"],
            CharacterCollection::Gb1 => &["UniGB-UTF16-H"],
            CharacterCollection::Cns1 => &["UniCNS-UTF16-H"],
            CharacterCollection::Korea1 => &["UniKS-UTF16-H"],
        }
    }

    fn supplement_sizes(self) -> &'static [u32] {
        match self {
            CharacterCollection::Japan1 => JAPAN1_SUPPLEMENTS,
            CharacterCollection::Gb1 => GB1_SUPPLEMENTS,
            CharacterCollection::Cns1 => CNS1_SUPPLEMENTS,
            CharacterCollection::Korea1 => KOREA1_SUPPLEMENTS,
        }
    }

    /// Highest supplement whose added CIDs are mostly present.
    ///
    /// `present(first, last)` counts the mapped CIDs in `first..=last`.
    pub fn infer_supplement<F>(self, present: F) -> Option<u32>
    where
        F: Fn(u32, u32) -> u32,
    {
        let mut first = 0;
        let mut best = None;
        for (supplement, &size) in self.supplement_sizes().iter().enumerate() {
            let last = size - 1;
            let total = u64::from(size - first);
            let found = u64::from(present(first, last));
            if found * 100 >= total * SUPPLEMENT_COVERAGE {
                best = Some(supplement as u32);
            }
            first = size;
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_johab_and_wansung_are_one_collection() {
        let collections = CharacterCollection::from_code_pages(
            CodePage1::KOREAN_WANSUNG | CodePage1::KOREAN_JOHAB,
        );
        assert_eq!(collections.as_slice(), &[CharacterCollection::Korea1]);
    }

    #[test]
    fn test_from_ros() {
        let ros = Ros::new("Adobe", "GB1", 4);
        assert_eq!(
            CharacterCollection::from_ros(&ros),
            Some(CharacterCollection::Gb1)
        );
        let ros = Ros::new("Other", "GB1", 4);
        assert_eq!(CharacterCollection::from_ros(&ros), None);
    }

    #[test]
    fn test_infer_supplement() {
        // Everything up to the end of Korea1-1 fully present, a few CIDs of Korea1-2
        let present = |first: u32, last: u32| {
            let last = last.min(18160);
            (last + 1).saturating_sub(first)
        };
        assert_eq!(
            CharacterCollection::Korea1.infer_supplement(present),
            Some(1)
        );
        assert_eq!(CharacterCollection::Korea1.infer_supplement(|_, _| 0), None);
    }

    #[test]
    fn test_infer_supplement_skips_sparse_middle() {
        // Japan1-1 adds 75 CIDs; without them the later supplements still count
        let present = |first: u32, last: u32| {
            if first == 8284 {
                0
            } else {
                last + 1 - first
            }
        };
        assert_eq!(
            CharacterCollection::Japan1.infer_supplement(present),
            Some(7)
        );
    }
}
