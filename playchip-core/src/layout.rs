//! Offsets and encodings of every patchable field in CHIPS.EXE.
//!
//! Level offsets follow Brian Raiter's notes on the ending sequence
//! (<http://www.muppetlabs.com/~breadbox/pub/software/tworld/chipend>).

/// Data file loaded by default, and the reference for its field width.
pub const DEFAULT_DAT: &str = "CHIPS.DAT";

/// Configuration file written into the executable by `play`.
pub const DEFAULT_INI: &str = "./chip.ini";

/// Highest level number the executable can address.
pub const MAX_LEVEL: i32 = 999;

/// How a field's bytes are laid out in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// NUL-terminated string. `max_len` excludes the terminator.
    CString { max_len: usize },
    /// Signed 16-bit little-endian word.
    I16,
    /// Single byte holding either `off` or `on`. With `strict`, the byte
    /// already in the image must be one of the two before it is replaced.
    Flag { off: u8, on: u8, strict: bool },
}

/// Opcode byte written right after each copy of a word field, picked by
/// whether the written value is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingOpcode {
    pub positive: u8,
    pub zero: u8,
}

impl TrailingOpcode {
    pub fn select(&self, value: i32) -> u8 {
        if value > 0 {
            self.positive
        } else {
            self.zero
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offsets: &'static [usize],
    pub encoding: Encoding,
    pub trailing_opcode: Option<TrailingOpcode>,
}

impl FieldSpec {
    const fn new(name: &'static str, offsets: &'static [usize], encoding: Encoding) -> Self {
        Self {
            name,
            offsets,
            encoding,
            trailing_opcode: None,
        }
    }

    /// Number of bytes touched at each offset, trailing opcode included.
    pub const fn width(&self) -> usize {
        let base = match self.encoding {
            Encoding::CString { max_len } => max_len + 1,
            Encoding::I16 => 2,
            Encoding::Flag { .. } => 1,
        };

        if self.trailing_opcode.is_some() {
            base + 1
        } else {
            base
        }
    }

    pub const fn max_len(&self) -> Option<usize> {
        match self.encoding {
            Encoding::CString { max_len } => Some(max_len),
            _ => None,
        }
    }
}

/// Every field of one executable version plus the size it must reach.
#[derive(Debug, Clone, Copy)]
pub struct ExeLayout {
    pub min_size: usize,
    pub dat_file: FieldSpec,
    pub ini_file: FieldSpec,
    pub ini_heading: FieldSpec,
    pub end_level: FieldSpec,
    pub fake_end_level: FieldSpec,
    pub credits_level: FieldSpec,
    pub decade_messages: FieldSpec,
    pub sound: FieldSpec,
}

impl ExeLayout {
    pub fn fields(&self) -> [&FieldSpec; 8] {
        [
            &self.dat_file,
            &self.ini_file,
            &self.ini_heading,
            &self.end_level,
            &self.fake_end_level,
            &self.credits_level,
            &self.decade_messages,
            &self.sound,
        ]
    }
}

/// The 1991 Windows release of Chip's Challenge (267,776 bytes).
pub static CHIPS_EXE: ExeLayout = ExeLayout {
    min_size: 267_776,
    dat_file: FieldSpec::new(
        "dat_file",
        &[0x4AD4],
        Encoding::CString {
            max_len: DEFAULT_DAT.len(),
        },
    ),
    ini_file: FieldSpec::new(
        "ini_file",
        &[0x4A68],
        Encoding::CString {
            max_len: "entpack.ini".len(),
        },
    ),
    ini_heading: FieldSpec::new(
        "ini_heading",
        &[0x4A74],
        Encoding::CString {
            max_len: "Chip's Challenge".len(),
        },
    ),
    end_level: FieldSpec::new("end_level", &[0x91C0, 0xBA14, 0xBB1C], Encoding::I16),
    fake_end_level: FieldSpec::new("fake_end_level", &[0x91B9, 0xBB14], Encoding::I16),
    credits_level: FieldSpec {
        name: "credits_level",
        // 0x9F85: don't ignore passwords while on this level.
        // 0xA6D9: don't ignore passwords when jumping to this level.
        offsets: &[0x9F85, 0xA6D9],
        encoding: Encoding::I16,
        trailing_opcode: Some(TrailingOpcode {
            positive: 0x7C, // jl
            zero: 0x75,     // jnz
        }),
    },
    decade_messages: FieldSpec::new(
        "decade_messages",
        &[0xBB2B],
        Encoding::Flag {
            off: 0xD1,
            on: 0xD2,
            strict: true,
        },
    ),
    sound: FieldSpec::new(
        "sound",
        &[0x2F2F],
        Encoding::Flag {
            off: 0x00,
            on: 0x01,
            strict: false,
        },
    ),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_widths_match_reference_strings() {
        assert_eq!(CHIPS_EXE.dat_file.max_len(), Some(9));
        assert_eq!(CHIPS_EXE.ini_file.max_len(), Some(11));
        assert_eq!(CHIPS_EXE.ini_heading.max_len(), Some(17));
    }

    #[test]
    fn every_field_fits_inside_minimum_image() {
        for field in CHIPS_EXE.fields() {
            for &offset in field.offsets {
                assert!(offset + field.width() <= CHIPS_EXE.min_size, "{}", field.name);
            }
        }
    }

    #[test]
    fn fields_do_not_overlap() {
        let mut spans: Vec<(usize, usize, &str)> = CHIPS_EXE
            .fields()
            .iter()
            .flat_map(|f| f.offsets.iter().map(move |&o| (o, o + f.width(), f.name)))
            .collect();
        spans.sort();

        for pair in spans.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "{} overlaps {}", pair[0].2, pair[1].2);
        }
    }

    #[test]
    fn credits_opcode_follows_sign() {
        let op = CHIPS_EXE.credits_level.trailing_opcode.unwrap();
        assert_eq!(op.select(145), 0x7C);
        assert_eq!(op.select(0), 0x75);
    }
}
