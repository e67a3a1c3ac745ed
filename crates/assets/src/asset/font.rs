//! TrueType/OpenType faces.

use crate::asset::error::{ErrorKind, Result};
use exn::ResultExt;
use tracing::instrument;
use ttf_parser::{Face, name_id};

/// A validated font face.
///
/// The face is parsed once on load to prove the bytes are usable and to pull
/// out its metadata; the raw bytes are kept for whatever renders glyphs.
/// Fonts are size-independent, so one cached face serves every point size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Font {
    data: Vec<u8>,
    family: Option<String>,
    glyph_count: u16,
    units_per_em: u16,
}

impl Font {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The family name from the `name` table, when the face carries one.
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn glyph_count(&self) -> u16 {
        self.glyph_count
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Re-borrow the stored bytes as a parsed face.
    pub fn face(&self) -> Result<Face<'_>> {
        Face::parse(&self.data, 0).or_raise(|| ErrorKind::Font)
    }
}

#[instrument(level = "trace", skip(bytes), fields(size = bytes.len()))]
pub fn decode(bytes: &[u8]) -> Result<Font> {
    let face = Face::parse(bytes, 0).or_raise(|| ErrorKind::Font)?;
    let family = family_name(&face);
    let glyph_count = face.number_of_glyphs();
    let units_per_em = face.units_per_em();
    Ok(Font {
        data: bytes.to_vec(),
        family,
        glyph_count,
        units_per_em,
    })
}

fn family_name(face: &Face<'_>) -> Option<String> {
    // Prefer the typographic family; older faces only have the legacy one.
    [name_id::TYPOGRAPHIC_FAMILY, name_id::FAMILY].into_iter().find_map(|id| {
        face.names()
            .into_iter()
            .filter(|name| name.name_id == id && name.is_unicode())
            .find_map(|name| name.to_string())
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Assembles the smallest face the parser accepts: `head`, `hhea`,
    /// `maxp`, plus a `name` table carrying `family` as a Windows Unicode
    /// record.
    pub(crate) fn ttf_fixture(family: &str) -> Vec<u8> {
        let mut head = vec![0u8; 54];
        head[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
        head[18..20].copy_from_slice(&1000u16.to_be_bytes());

        let mut hhea = vec![0u8; 36];
        hhea[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());

        let mut maxp = Vec::new();
        maxp.extend(0x0000_5000u32.to_be_bytes());
        maxp.extend(3u16.to_be_bytes());

        let encoded: Vec<u8> = family.encode_utf16().flat_map(u16::to_be_bytes).collect();
        let mut name = Vec::new();
        // format, count, storage offset, then one record:
        // platform, encoding, language, name id, length, offset
        for field in [0u16, 1, 18, 3, 1, 0x0409, name_id::FAMILY, encoded.len() as u16, 0] {
            name.extend(field.to_be_bytes());
        }
        name.extend(&encoded);

        // Table records must be sorted by tag.
        let tables: [(&[u8; 4], Vec<u8>); 4] = [(b"head", head), (b"hhea", hhea), (b"maxp", maxp), (b"name", name)];
        let mut out = Vec::new();
        out.extend(0x0001_0000u32.to_be_bytes());
        out.extend((tables.len() as u16).to_be_bytes());
        out.extend([0u8; 6]);
        let mut offset = 12 + 16 * tables.len();
        let mut body: Vec<u8> = Vec::new();
        for (tag, data) in &tables {
            out.extend(**tag);
            out.extend(0u32.to_be_bytes());
            out.extend((offset as u32).to_be_bytes());
            out.extend((data.len() as u32).to_be_bytes());
            body.extend(data);
            offset += data.len();
        }
        out.extend(body);
        out
    }

    #[test]
    fn decodes_minimal_face() {
        let font = decode(&ttf_fixture("To The Point")).unwrap();
        assert_eq!(font.family(), Some("To The Point"));
        assert_eq!(font.glyph_count(), 3);
        assert_eq!(font.units_per_em(), 1000);
        assert!(font.face().is_ok());
    }

    #[test]
    fn keeps_original_bytes() {
        let bytes = ttf_fixture("Serif");
        assert_eq!(decode(&bytes).unwrap().data(), bytes.as_slice());
    }

    #[test]
    fn rejects_non_font() {
        let err = decode(b"not a font at all").unwrap_err();
        assert_eq!(*err, ErrorKind::Font);
    }

    #[test]
    fn rejects_truncated_face() {
        let bytes = ttf_fixture("Serif");
        assert_eq!(*decode(&bytes[..40]).unwrap_err(), ErrorKind::Font);
    }
}
