//! `name` table
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/name>

use encoding_rs::{DecoderResult, MACINTOSH};
use log::warn;

use crate::binary::read::{ReadBinary, ReadCtxt, ReadFrom};
use crate::binary::U16Be;
use crate::error::ParseError;
use crate::tables::{priority_search, RecordKey};

/// Semantic role of a name record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameId(pub u16);

impl NameId {
    pub const COPYRIGHT_NOTICE: NameId = NameId(0);
    pub const FONT_FAMILY_NAME: NameId = NameId(1);
    pub const FONT_SUBFAMILY_NAME: NameId = NameId(2);
    pub const UNIQUE_IDENTIFIER: NameId = NameId(3);
    pub const FULL_FONT_NAME: NameId = NameId(4);
    pub const VERSION_STRING: NameId = NameId(5);
    pub const POSTSCRIPT_NAME: NameId = NameId(6);
    pub const TRADEMARK: NameId = NameId(7);
    pub const MANUFACTURER_NAME: NameId = NameId(8);
    pub const DESIGNER: NameId = NameId(9);
    pub const DESCRIPTION: NameId = NameId(10);
    pub const URL_VENDOR: NameId = NameId(11);
    pub const URL_DESIGNER: NameId = NameId(12);
    pub const LICENSE_DESCRIPTION: NameId = NameId(13);
    pub const LICENSE_INFO_URL: NameId = NameId(14);
    pub const TYPOGRAPHIC_FAMILY_NAME: NameId = NameId(16);
    pub const TYPOGRAPHIC_SUBFAMILY_NAME: NameId = NameId(17);
    pub const COMPATIBLE_FULL: NameId = NameId(18);
    pub const SAMPLE_TEXT: NameId = NameId(19);
    /// Name to pass to `findfont` for the CID-keyed version of the font. Macintosh records only.
    pub const POSTSCRIPT_CID_FINDFONT_NAME: NameId = NameId(20);
}

/// Search order used for general name lookups.
pub const DEFAULT_NAME_PRIORITIES: [RecordKey; 7] = [
    RecordKey::new(3, 1, Some(0x409)),
    RecordKey::new(3, 1, None),
    RecordKey::new(1, 0, Some(0)),
    RecordKey::new(1, 0, None),
    RecordKey::platform(0),
    RecordKey::platform(3),
    RecordKey::platform(1),
];

/// Search order for names only defined on the Macintosh platform.
pub const MACINTOSH_NAME_PRIORITIES: [RecordKey; 3] = [
    RecordKey::new(1, 0, Some(0)),
    RecordKey::new(1, 0, None),
    RecordKey::platform(1),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTable {
    pub records: Vec<NameRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub name_id: u16,
    /// The undecoded string.
    pub bytes: Vec<u8>,
}

struct RawNameRecord {
    platform_id: u16,
    encoding_id: u16,
    language_id: u16,
    name_id: u16,
    length: u16,
    offset: u16,
}

impl ReadFrom for RawNameRecord {
    type ReadType = ((U16Be, U16Be, U16Be), (U16Be, U16Be, U16Be));
    fn read_from(
        ((platform_id, encoding_id, language_id), (name_id, length, offset)): (
            (u16, u16, u16),
            (u16, u16, u16),
        ),
    ) -> Self {
        RawNameRecord {
            platform_id,
            encoding_id,
            language_id,
            name_id,
            length,
            offset,
        }
    }
}

impl ReadBinary for NameTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let table = ctxt.scope();
        let format = ctxt.read_u16be()?;
        ctxt.check_version(format <= 1)?;
        let count = usize::from(ctxt.read_u16be()?);
        let storage_offset = usize::from(ctxt.read_u16be()?);
        let raw_records = ctxt.read_array::<RawNameRecord>(count)?;
        let storage = table.offset(storage_offset);

        let mut records = Vec::with_capacity(count);
        let mut dropped = 0;
        for raw in &raw_records {
            match storage.offset_length(usize::from(raw.offset), usize::from(raw.length)) {
                Ok(string) => records.push(NameRecord {
                    platform_id: raw.platform_id,
                    encoding_id: raw.encoding_id,
                    language_id: raw.language_id,
                    name_id: raw.name_id,
                    bytes: string.data().to_vec(),
                }),
                Err(_) => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!("name: {} records point outside string storage", dropped);
        }

        Ok(NameTable { records })
    }
}

impl NameRecord {
    fn ids(&self) -> (u16, u16, u16) {
        (self.platform_id, self.encoding_id, self.language_id)
    }

    /// Decode the string, if it is in an encoding this crate accepts.
    ///
    /// Unicode records must consist of printable ASCII. Macintosh Roman records are decoded in
    /// full, other Macintosh scripts only when they are printable ASCII.
    pub fn decode(&self) -> Option<String> {
        match (self.platform_id, self.encoding_id) {
            (0, _) | (3, 0) | (3, 1) | (3, 10) => decode_utf16_ascii(&self.bytes),
            (1, 0) => decode_mac_roman(&self.bytes),
            (1, _) if self.bytes.iter().copied().all(is_printable_ascii) => {
                Some(self.bytes.iter().map(|&b| char::from(b)).collect())
            }
            _ => None,
        }
    }
}

impl NameTable {
    /// Find the best record for `name_id` under `priorities`, with its decoded string.
    ///
    /// Records that cannot be decoded are not candidates.
    pub fn find_record(
        &self,
        name_id: NameId,
        priorities: &[RecordKey],
    ) -> Option<(&NameRecord, String)> {
        let candidates = self
            .records
            .iter()
            .filter(|record| record.name_id == name_id.0)
            .filter_map(|record| record.decode().map(|string| (record, string)));
        priority_search(candidates, priorities, |(record, _)| record.ids())
    }

    /// Find `name_id` using the default priorities, or the Macintosh ones for name ID 20.
    pub fn string_for_id(&self, name_id: NameId) -> Option<String> {
        let priorities: &[RecordKey] = if name_id == NameId::POSTSCRIPT_CID_FINDFONT_NAME {
            &MACINTOSH_NAME_PRIORITIES
        } else {
            &DEFAULT_NAME_PRIORITIES
        };
        self.find_record(name_id, priorities)
            .map(|(_record, string)| string)
    }
}

fn is_printable_ascii(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
}

fn decode_utf16_ascii(data: &[u8]) -> Option<String> {
    if data.len() % 2 != 0 {
        return None;
    }
    data.chunks_exact(2)
        .map(|unit| match u16::from_be_bytes([unit[0], unit[1]]) {
            unit @ 0x20..=0x7E => Some(char::from(unit as u8)),
            _ => None,
        })
        .collect()
}

fn decode_mac_roman(data: &[u8]) -> Option<String> {
    let mut decoder = MACINTOSH.new_decoder_without_bom_handling();
    let size = decoder.max_utf8_buffer_length_without_replacement(data.len())?;
    let mut s = String::with_capacity(size);
    let (res, _read) = decoder.decode_to_string_without_replacement(data, &mut s, true);
    match res {
        DecoderResult::InputEmpty => Some(s),
        DecoderResult::OutputFull | DecoderResult::Malformed(_, _) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::tests::{name_table, utf16be, NameEntry};

    fn entry(platform_id: u16, encoding_id: u16, language_id: u16, bytes: Vec<u8>) -> NameEntry {
        NameEntry {
            platform_id,
            encoding_id,
            language_id,
            name_id: 6,
            bytes,
        }
    }

    fn read(entries: &[NameEntry]) -> NameTable {
        ReadScope::new(&name_table(entries))
            .read::<NameTable>()
            .unwrap()
    }

    #[test]
    fn test_windows_english_preferred() {
        let table = read(&[
            entry(1, 0, 0, b"MacName".to_vec()),
            entry(3, 1, 0x411, utf16be("Japanese")),
            entry(3, 1, 0x409, utf16be("English")),
        ]);
        assert_eq!(
            table.string_for_id(NameId::POSTSCRIPT_NAME).as_deref(),
            Some("English")
        );
    }

    #[test]
    fn test_non_ascii_unicode_rejected() {
        let table = read(&[
            entry(3, 1, 0x409, utf16be("Caf\u{e9}")),
            entry(1, 0, 0, b"Cafe".to_vec()),
        ]);
        let (record, string) = table
            .find_record(NameId::POSTSCRIPT_NAME, &DEFAULT_NAME_PRIORITIES)
            .unwrap();
        assert_eq!(record.platform_id, 1);
        assert_eq!(string, "Cafe");
    }

    #[test]
    fn test_mac_roman_decoded() {
        let table = read(&[entry(1, 0, 0, vec![b'C', b'a', b'f', 0x8E])]);
        assert_eq!(
            table.string_for_id(NameId::POSTSCRIPT_NAME).as_deref(),
            Some("Caf\u{e9}")
        );
    }

    #[test]
    fn test_other_mac_script_needs_ascii() {
        let table = read(&[entry(1, 1, 11, vec![0x82, 0xA0]), entry(1, 1, 0, b"Ok".to_vec())]);
        let (record, string) = table
            .find_record(NameId::POSTSCRIPT_NAME, &MACINTOSH_NAME_PRIORITIES)
            .unwrap();
        assert_eq!(record.language_id, 0);
        assert_eq!(string, "Ok");
    }

    #[test]
    fn test_findfont_name_is_macintosh_only() {
        let mut windows = entry(3, 1, 0x409, utf16be("Windows-UniJIS-UTF16-H"));
        windows.name_id = 20;
        let table = read(&[windows]);
        assert_eq!(
            table.string_for_id(NameId::POSTSCRIPT_CID_FINDFONT_NAME),
            None
        );
    }

    #[test]
    fn test_record_outside_storage_dropped() {
        let mut data = name_table(&[entry(1, 0, 0, b"Name".to_vec())]);
        data.truncate(data.len() - 2);
        let table = ReadScope::new(&data).read::<NameTable>().unwrap();
        assert!(table.records.is_empty());
    }

    #[test]
    fn test_bad_format() {
        let mut data = name_table(&[]);
        data[1] = 2;
        assert_eq!(
            ReadScope::new(&data).read::<NameTable>(),
            Err(ParseError::BadVersion)
        );
    }
}
