use std::fmt;
use std::path::Path;

use serde::{Serialize, Serializer};
use tracing::warn;

use crate::image::ExeImage;
use crate::layout::{Encoding, FieldSpec, CHIPS_EXE};
use crate::Result;

/// Every documented field as currently stored in an executable. Redundant
/// fields keep one entry per copy so drift between copies is visible.
/// String fields hold the raw bytes; anything outside printable ASCII is
/// shown as a `\xNN` escape in `Display` and JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExeFieldReport {
    #[serde(serialize_with = "escaped")]
    pub dat_file: Vec<u8>,
    #[serde(serialize_with = "escaped")]
    pub ini_file: Vec<u8>,
    #[serde(serialize_with = "escaped")]
    pub ini_heading: Vec<u8>,
    pub end_level: Vec<i16>,
    pub fake_end_level: Vec<i16>,
    pub credits_level: Vec<i16>,
    pub credits_opcodes: Vec<u8>,
    pub decade_messages: bool,
    pub sound: bool,
}

impl ExeFieldReport {
    /// Names of redundant fields whose copies disagree.
    pub fn drifted_fields(&self) -> Vec<&'static str> {
        let layout = &CHIPS_EXE;
        [
            (&layout.end_level, &self.end_level),
            (&layout.fake_end_level, &self.fake_end_level),
            (&layout.credits_level, &self.credits_level),
        ]
        .into_iter()
        .filter(|(_, values)| values.windows(2).any(|w| w[0] != w[1]))
        .map(|(field, _)| field.name)
        .collect()
    }
}

pub fn escape_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02X}", b)),
        }
    }
    out
}

fn escaped<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&escape_text(bytes))
}

impl fmt::Display for ExeFieldReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dat_file:        \"{}\"", escape_text(&self.dat_file))?;
        writeln!(f, "ini_file:        \"{}\"", escape_text(&self.ini_file))?;
        writeln!(f, "ini_heading:     \"{}\"", escape_text(&self.ini_heading))?;
        writeln!(f, "end_level:       {:?}", self.end_level)?;
        writeln!(f, "fake_end_level:  {:?}", self.fake_end_level)?;
        writeln!(f, "credits_level:   {:?}", self.credits_level)?;
        writeln!(f, "credits_opcodes: {:02X?}", self.credits_opcodes)?;
        writeln!(f, "decade_messages: {}", self.decade_messages)?;
        write!(f, "sound:           {}", self.sound)
    }
}

fn read_text(image: &ExeImage, field: &FieldSpec) -> Vec<u8> {
    let max_len = field.max_len().unwrap_or(0);
    image.read_cstr(field.offsets[0], max_len).to_vec()
}

fn read_flag(image: &ExeImage, field: &FieldSpec) -> bool {
    match field.encoding {
        Encoding::Flag { on, .. } => image.read_u8(field.offsets[0]) == on,
        _ => false,
    }
}

pub fn dump(image: &ExeImage) -> ExeFieldReport {
    let layout = &CHIPS_EXE;

    let report = ExeFieldReport {
        dat_file: read_text(image, &layout.dat_file),
        ini_file: read_text(image, &layout.ini_file),
        ini_heading: read_text(image, &layout.ini_heading),
        end_level: image.read_words(&layout.end_level),
        fake_end_level: image.read_words(&layout.fake_end_level),
        credits_level: image.read_words(&layout.credits_level),
        credits_opcodes: layout
            .credits_level
            .offsets
            .iter()
            .map(|&o| image.read_u8(o + 2))
            .collect(),
        decade_messages: read_flag(image, &layout.decade_messages),
        sound: read_flag(image, &layout.sound),
    };

    for name in report.drifted_fields() {
        warn!("copies of {} disagree; wrong executable version?", name);
    }

    report
}

pub fn dump_file(path: &Path) -> Result<ExeFieldReport> {
    Ok(dump(&ExeImage::load(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn image_with(edit: impl FnOnce(&mut Vec<u8>)) -> ExeImage {
        let mut bytes = vec![0u8; CHIPS_EXE.min_size];
        edit(&mut bytes);
        ExeImage::from_bytes(bytes).unwrap()
    }

    #[test]
    fn reads_stock_looking_image() {
        let image = image_with(|b| {
            b[0x4AD4..0x4AD4 + 10].copy_from_slice(b"CHIPS.DAT\0");
            b[0x4A68..0x4A68 + 12].copy_from_slice(b"entpack.ini\0");
            b[0x4A74..0x4A74 + 17].copy_from_slice(b"Chip's Challenge\0");
            for o in [0x91C0, 0xBA14, 0xBB1C] {
                b[o..o + 2].copy_from_slice(&149i16.to_le_bytes());
            }
            for o in [0x91B9, 0xBB14] {
                b[o..o + 2].copy_from_slice(&144i16.to_le_bytes());
            }
            for o in [0x9F85, 0xA6D9] {
                b[o..o + 3].copy_from_slice(&[145, 0, 0x7C]);
            }
            b[0xBB2B] = 0xD2;
            b[0x2F2F] = 0x01;
        });

        let report = dump(&image);
        assert_eq!(
            report,
            ExeFieldReport {
                dat_file: b"CHIPS.DAT".to_vec(),
                ini_file: b"entpack.ini".to_vec(),
                ini_heading: b"Chip's Challenge".to_vec(),
                end_level: vec![149, 149, 149],
                fake_end_level: vec![144, 144],
                credits_level: vec![145, 145],
                credits_opcodes: vec![0x7C, 0x7C],
                decade_messages: true,
                sound: true,
            }
        );
    }

    #[test]
    fn strings_are_capped_at_field_width() {
        let image = image_with(|b| {
            b[0x4AD4..0x4AD4 + 12].copy_from_slice(b"ABCDEFGHIJKL");
        });
        assert_eq!(dump(&image).dat_file, b"ABCDEFGHI");
    }

    #[test]
    fn high_bit_bytes_are_kept() {
        let image = image_with(|b| {
            b[0x4A74..0x4A74 + 6].copy_from_slice(b"Puc\xE9s\0");
        });

        let report = dump(&image);
        assert_eq!(report.ini_heading, b"Puc\xE9s");
        assert!(report.to_string().contains(r#"ini_heading:     "Puc\xE9s""#));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ini_heading"], r"Puc\xE9s");
    }

    #[test]
    fn escaping_leaves_plain_ascii_alone() {
        assert_eq!(escape_text(b"Chip's Challenge"), "Chip's Challenge");
        assert_eq!(escape_text(b"a\\b\x01"), r"a\\b\x01");
    }

    #[test]
    fn reports_drifted_copies() {
        let image = image_with(|b| {
            b[0x91C0..0x91C2].copy_from_slice(&149i16.to_le_bytes());
            b[0xBA14..0xBA16].copy_from_slice(&149i16.to_le_bytes());
            b[0xBB1C..0xBB1E].copy_from_slice(&150i16.to_le_bytes());
        });

        let report = dump(&image);
        assert_eq!(report.end_level, vec![149, 149, 150]);
        assert_eq!(report.drifted_fields(), vec!["end_level"]);
    }

    #[test]
    fn decade_flag_is_on_only_for_d2() {
        assert!(!dump(&image_with(|b| b[0xBB2B] = 0xD1)).decade_messages);
        assert!(!dump(&image_with(|b| b[0xBB2B] = 0x00)).decade_messages);
        assert!(dump(&image_with(|b| b[0xBB2B] = 0xD2)).decade_messages);
    }

    #[test]
    fn dump_file_checks_size_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chips.exe");
        fs::write(&path, vec![0u8; 267_775]).unwrap();

        assert!(matches!(
            dump_file(&path),
            Err(crate::PlaychipError::InvalidImage { .. })
        ));
    }
}
