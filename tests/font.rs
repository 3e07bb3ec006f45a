#[allow(dead_code)]
mod common;

use std::sync::Arc;

use sfnt_cid::cmap::UNICODE_PRIORITIES;
use sfnt_cid::directory::SfntKind;
use sfnt_cid::error::{FontError, ParseError};
use sfnt_cid::source::{ByteSource, MemorySource, SfntArraySource};
use sfnt_cid::tables::name::NameId;
use sfnt_cid::tables::post::POST_FORMAT_2_5;
use sfnt_cid::tables::RecordKey;
use sfnt_cid::{tag, FontInstance, ParseOptions, TableStatus};

use common::*;

fn open(data: Vec<u8>, index: usize) -> Result<FontInstance, FontError> {
    FontInstance::open(Arc::new(MemorySource::new(data)), index, ParseOptions::default())
}

fn simple_font() -> Vec<u8> {
    sfnt(&[
        (
            b"cmap",
            cmap_table(&[CmapEntry {
                platform_id: 0,
                encoding_id: 1,
                subtable: cmap_format0(0, &[(65, 1), (66, 2), (67, 3)]),
            }]),
        ),
        (b"head", head_table(1000)),
        (b"maxp", maxp_table(4)),
    ])
}

#[test]
fn format0_lookup() {
    let mut font = open(simple_font(), 0).unwrap();
    let priorities = [RecordKey {
        platform_id: Some(0),
        encoding_id: Some(1),
        language_id: None,
    }];
    assert_eq!(font.cmap_lookup(&priorities, 66), Ok(Some(2)));
    assert_eq!(font.cmap_lookup(&priorities, 90), Ok(None));
    assert_eq!(font.cmap_lookup(&UNICODE_PRIORITIES, 65), Ok(Some(1)));
    assert_eq!(font.units_per_em(), Ok(Some(1000)));
    assert_eq!(font.num_glyphs(), Ok(Some(4)));
    assert_eq!(font.open_windows(), 0);
}

#[test]
fn collection_selects_sub_font() {
    let data = collection(&[
        vec![(b"maxp", maxp_table(4))],
        vec![(b"head", head_table(2048)), (b"maxp", maxp_table(9))],
    ]);
    let mut font = open(data.clone(), 1).unwrap();
    let offsets = &font.collection().offsets;
    assert_eq!(font.collection().kind, SfntKind::Collection);
    assert_eq!(font.collection().num_fonts(), 2);
    assert_eq!(offsets[0], 20);
    assert!(offsets[1] > offsets[0]);
    assert_eq!(font.num_glyphs(), Ok(Some(9)));
    assert_eq!(font.units_per_em(), Ok(Some(2048)));

    assert_eq!(
        open(data, 2).err(),
        Some(FontError::InvalidFont(ParseError::BadIndex))
    );
}

#[test]
fn cff_flavoured_font() {
    let mut font = open(otto(&[(b"maxp", maxp_table(2))]), 0).unwrap();
    assert!(font.directory().contains(tag::MAXP));
    assert_eq!(font.num_glyphs(), Ok(Some(2)));
}

#[test]
fn short_maxp_is_invalid() {
    let mut font = open(sfnt(&[(b"maxp", vec![0, 0, 0x50, 0, 0])]), 0).unwrap();
    assert_eq!(
        font.num_glyphs(),
        Err(FontError::InvalidFont(ParseError::BadEof))
    );
    assert_eq!(font.status(tag::MAXP), Some(TableStatus::AbsentOrFailed));
}

#[test]
fn post_format_2_5_offsets_wrap() {
    // glyph 0 -> 0 + 3 (space), glyph 1 -> 1 - 1 (.notdef), glyph 2 -> 2 - 3 wraps past 0
    let mut tail = u16s(&[3]);
    tail.extend([3u8, 0xFF, 0xFD]);
    let mut font = open(sfnt(&[(b"post", post_table(POST_FORMAT_2_5, &tail))]), 0).unwrap();
    assert_eq!(font.glyph_name(0), Ok(Some(String::from("space"))));
    assert_eq!(font.glyph_name(1), Ok(Some(String::from(".notdef"))));
    assert_eq!(font.glyph_name(2), Ok(None));
}

#[test]
fn format12_overlapping_groups() {
    let groups = [(0x20, 0x2F, 100), (0x28, 0x30, 200), (0x10, 0x22, 300)];
    let cmap = cmap_table(&[CmapEntry {
        platform_id: 3,
        encoding_id: 10,
        subtable: cmap_format12(&groups),
    }]);
    let mut font = open(sfnt(&[(b"cmap", cmap)]), 0).unwrap();

    // The last group defining each code decides its glyph
    let expected = |code: u32| {
        groups
            .iter()
            .rev()
            .find(|&&(start, end, _)| start <= code && code <= end)
            .map(|&(start, _, glyph)| (glyph + code - start) as u16)
    };
    for code in 0x0..0x40 {
        assert_eq!(font.cmap_lookup(&UNICODE_PRIORITIES, code), Ok(expected(code)));
    }

    let segments = font.cmap().unwrap().unwrap().subtables[0].segments();
    assert!(segments.windows(2).all(|pair| pair[0].end < pair[1].start));
}

#[test]
fn format4_final_segment_never_maps_ffff() {
    let cmap = cmap_table(&[CmapEntry {
        platform_id: 3,
        encoding_id: 1,
        subtable: cmap_format4(&[(0x41, 0x43, 1)]),
    }]);
    let mut font = open(sfnt(&[(b"cmap", cmap)]), 0).unwrap();
    assert_eq!(font.cmap_lookup(&UNICODE_PRIORITIES, 0x42), Ok(Some(0x43)));
    assert_eq!(font.cmap_lookup(&UNICODE_PRIORITIES, 0xFFFF), Ok(None));
}

#[test]
fn names_and_metrics() {
    let name = name_table(&[NameEntry {
        platform_id: 3,
        encoding_id: 1,
        language_id: 0x409,
        name_id: 6,
        bytes: utf16be("Test-Regular"),
    }]);
    let mut font = open(
        sfnt(&[
            (b"VORG", vorg_table(880, &[(2, 900)])),
            (b"hhea", xhea_table(1)),
            (b"hmtx", xmtx_table(&[(500, 10)], &[20, 30])),
            (b"maxp", maxp_table(3)),
            (b"name", name),
        ]),
        0,
    )
    .unwrap();
    assert_eq!(
        font.name(NameId::POSTSCRIPT_NAME),
        Ok(Some(String::from("Test-Regular")))
    );
    assert_eq!(font.name(NameId::FULL_FONT_NAME), Ok(None));
    assert_eq!(font.advance_width(2), Ok(Some(500)));
    assert_eq!(font.advance_width(3), Ok(None));
    assert_eq!(font.vertical_origin(2), Ok(Some(900)));
    assert_eq!(font.vertical_origin(1), Ok(Some(880)));
    assert_eq!(font.status(tag::VHEA), Some(TableStatus::Untried));
}

#[test]
fn chunked_source() {
    let data = simple_font();
    let chunks = data
        .chunks(7)
        .map(|chunk| chunk.to_vec().into_boxed_slice())
        .collect::<Vec<_>>();
    let source = Arc::new(SfntArraySource::new(chunks));
    assert_eq!(source.len(), data.len());
    let mut font = FontInstance::open(source, 0, ParseOptions::default()).unwrap();
    assert_eq!(font.cmap_lookup(&UNICODE_PRIORITIES, 67), Ok(Some(3)));
}
