// Builders for synthetic font data, shared by unit and integration tests.

pub type TableData = (&'static [u8; 4], Vec<u8>);

pub fn u16s(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn utf16be(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
}

fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

/// An sfnt whose header starts at `base` in the final blob.
fn sfnt_at(base: usize, version: u32, tables: &[TableData]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(version.to_be_bytes());
    out.extend(u16s(&[tables.len() as u16, 0, 0, 0]));
    let mut offset = base + 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in tables {
        out.extend(*tag);
        out.extend(checksum(data).to_be_bytes());
        out.extend((offset as u32).to_be_bytes());
        out.extend((data.len() as u32).to_be_bytes());
        body.extend(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = base + 12 + 16 * tables.len() + body.len();
    }
    out.extend(body);
    out
}

pub fn sfnt(tables: &[TableData]) -> Vec<u8> {
    sfnt_at(0, 0x00010000, tables)
}

pub fn otto(tables: &[TableData]) -> Vec<u8> {
    sfnt_at(0, u32::from_be_bytes(*b"OTTO"), tables)
}

/// A TrueType Collection containing one font per entry in `fonts`.
pub fn collection(fonts: &[Vec<TableData>]) -> Vec<u8> {
    let header_len = 12 + 4 * fonts.len();
    let mut out = Vec::new();
    out.extend(b"ttcf");
    out.extend(0x00010000u32.to_be_bytes());
    out.extend((fonts.len() as u32).to_be_bytes());
    let mut body = Vec::new();
    for tables in fonts {
        let base = header_len + body.len();
        out.extend((base as u32).to_be_bytes());
        body.extend(sfnt_at(base, 0x00010000, tables));
    }
    out.extend(body);
    out
}

pub fn head_table(units_per_em: u16) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(0x00010000u32.to_be_bytes()); // version
    data.extend(0x00010000u32.to_be_bytes()); // fontRevision
    data.extend(0u32.to_be_bytes()); // checkSumAdjustment
    data.extend(0x5F0F3CF5u32.to_be_bytes());
    data.extend(u16s(&[0x000B, units_per_em]));
    data.extend([0u8; 16]); // created, modified
    data.extend(u16s(&[0, 0, 1000, 1000])); // bbox
    data.extend(u16s(&[0, 8, 2, 0, 0])); // macStyle ... glyphDataFormat
    data
}

/// Version 0.5 `maxp`.
pub fn maxp_table(num_glyphs: u16) -> Vec<u8> {
    let mut data = 0x00005000u32.to_be_bytes().to_vec();
    data.extend(num_glyphs.to_be_bytes());
    data
}

pub struct CmapEntry {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub subtable: Vec<u8>,
}

pub fn cmap_table(entries: &[CmapEntry]) -> Vec<u8> {
    let mut data = u16s(&[0, entries.len() as u16]);
    let mut offset = 4 + 8 * entries.len();
    for entry in entries {
        data.extend(u16s(&[entry.platform_id, entry.encoding_id]));
        data.extend((offset as u32).to_be_bytes());
        offset += entry.subtable.len();
    }
    for entry in entries {
        data.extend(&entry.subtable);
    }
    data
}

pub fn cmap_format0(language: u16, mappings: &[(u8, u8)]) -> Vec<u8> {
    let mut data = u16s(&[0, 262, language]);
    let mut glyphs = [0u8; 256];
    for &(code, glyph) in mappings {
        glyphs[usize::from(code)] = glyph;
    }
    data.extend(glyphs);
    data
}

/// Format 4 built from `(start, end, delta)` segments, terminated by the 0xFFFF segment.
pub fn cmap_format4(segments: &[(u16, u16, i16)]) -> Vec<u8> {
    let mut segments = segments.to_vec();
    segments.push((0xFFFF, 0xFFFF, 1));
    let seg_count = segments.len() as u16;
    let mut body = u16s(&[seg_count * 2, 0, 0, 0]);
    body.extend(u16s(&segments.iter().map(|s| s.1).collect::<Vec<_>>()));
    body.extend(u16s(&[0]));
    body.extend(u16s(&segments.iter().map(|s| s.0).collect::<Vec<_>>()));
    body.extend(u16s(&segments.iter().map(|s| s.2 as u16).collect::<Vec<_>>()));
    body.extend(u16s(&vec![0; segments.len()]));
    let mut data = u16s(&[4, (body.len() + 6) as u16, 0]);
    data.extend(body);
    data
}

/// Format 4 with one segment from `start` mapped through the glyph index array.
pub fn cmap_format4_array(start: u16, glyphs: &[u16]) -> Vec<u8> {
    let end = start + glyphs.len() as u16 - 1;
    let mut body = u16s(&[4, 0, 0, 0]);
    body.extend(u16s(&[end, 0xFFFF, 0, start, 0xFFFF, 0, 1, 4, 0]));
    body.extend(u16s(glyphs));
    let mut data = u16s(&[4, (body.len() + 6) as u16, 0]);
    data.extend(body);
    data
}

pub fn cmap_format6(first_code: u16, glyphs: &[u16]) -> Vec<u8> {
    let mut data = u16s(&[6, (10 + 2 * glyphs.len()) as u16, 0, first_code, glyphs.len() as u16]);
    data.extend(u16s(glyphs));
    data
}

/// Format 12 built from `(start_char, end_char, start_glyph)` groups, in the given order.
pub fn cmap_format12(groups: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut data = u16s(&[12, 0]);
    data.extend(((16 + 12 * groups.len()) as u32).to_be_bytes());
    data.extend(0u32.to_be_bytes());
    data.extend((groups.len() as u32).to_be_bytes());
    for &(start, end, glyph) in groups {
        data.extend(start.to_be_bytes());
        data.extend(end.to_be_bytes());
        data.extend(glyph.to_be_bytes());
    }
    data
}

/// `OS/2` with the given code page bits. Version 0 tables stop before the code page ranges.
pub fn os2_table(version: u16, code_page_range1: u32) -> Vec<u8> {
    let mut data = u16s(&[version, 500, 400, 5, 0]);
    data.extend([0u8; 22]); // subscript ... sFamilyClass
    data.extend([0u8; 10]); // panose
    data.extend(1u32.to_be_bytes()); // ulUnicodeRange1
    data.extend([0u8; 12]);
    data.extend(b"TEST");
    data.extend(u16s(&[0x40, 0x20, 0xFFFF]));
    data.extend(u16s(&[880, (-120i16) as u16, 0, 1000, 200]));
    if version > 0 {
        data.extend(code_page_range1.to_be_bytes());
        data.extend(0u32.to_be_bytes());
    }
    data
}

pub struct NameEntry {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub name_id: u16,
    pub bytes: Vec<u8>,
}

pub fn name_table(entries: &[NameEntry]) -> Vec<u8> {
    let storage_offset = 6 + 12 * entries.len();
    let mut data = u16s(&[0, entries.len() as u16, storage_offset as u16]);
    let mut storage: Vec<u8> = Vec::new();
    for entry in entries {
        data.extend(u16s(&[
            entry.platform_id,
            entry.encoding_id,
            entry.language_id,
            entry.name_id,
            entry.bytes.len() as u16,
            storage.len() as u16,
        ]));
        storage.extend(&entry.bytes);
    }
    data.extend(storage);
    data
}

/// Shared layout of `hhea` and `vhea`.
pub fn xhea_table(num_long_metrics: u16) -> Vec<u8> {
    let mut data = 0x00010000u32.to_be_bytes().to_vec();
    data.extend(u16s(&[800, (-200i16) as u16, 0, 1000, 0, 0, 1000, 1, 0, 0]));
    data.extend(u16s(&[0, 0, 0, 0, 0, num_long_metrics]));
    data
}

pub fn xmtx_table(long_metrics: &[(u16, i16)], bearings: &[i16]) -> Vec<u8> {
    let mut data = Vec::new();
    for &(advance, bearing) in long_metrics {
        data.extend(advance.to_be_bytes());
        data.extend(bearing.to_be_bytes());
    }
    for bearing in bearings {
        data.extend(bearing.to_be_bytes());
    }
    data
}

pub fn post_table(version: u32, tail: &[u8]) -> Vec<u8> {
    let mut data = version.to_be_bytes().to_vec();
    data.extend([0u8; 28]);
    data.extend(tail);
    data
}

pub fn vorg_table(default_origin: i16, origins: &[(u16, i16)]) -> Vec<u8> {
    let mut data = u16s(&[1, 0, default_origin as u16, origins.len() as u16]);
    for &(glyph, origin) in origins {
        data.extend(u16s(&[glyph, origin as u16]));
    }
    data
}
