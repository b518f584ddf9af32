use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::image::ExeImage;
use crate::layout::{Encoding, FieldSpec, CHIPS_EXE, MAX_LEVEL};
use crate::{PlaychipError, Result};

/// Field values to write into the executable. `None` leaves a field as-is,
/// except that an unset `fake_end_level` follows `end_level` and an unset
/// `credits_level` follows `fake_end_level`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub dat_file: Option<String>,
    pub ini_file: Option<String>,
    pub ini_heading: Option<String>,
    pub end_level: Option<i32>,
    pub fake_end_level: Option<i32>,
    pub credits_level: Option<i32>,
    pub decade_messages: Option<bool>,
    pub sound: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldValue<'a> {
    Text(&'a str),
    Int(i32),
    Flag(bool),
}

impl PatchRequest {
    /// The request with its default chain filled in.
    pub fn resolved(&self) -> PatchRequest {
        let fake_end_level = self.fake_end_level.or(self.end_level);
        let credits_level = self.credits_level.or(fake_end_level);
        PatchRequest {
            fake_end_level,
            credits_level,
            ..self.clone()
        }
    }

    fn values(&self) -> Vec<(&'static FieldSpec, FieldValue<'_>)> {
        let layout = &CHIPS_EXE;
        let mut out = Vec::new();

        let texts = [
            (&layout.dat_file, &self.dat_file),
            (&layout.ini_file, &self.ini_file),
            (&layout.ini_heading, &self.ini_heading),
        ];
        for (field, value) in texts {
            if let Some(s) = value {
                out.push((field, FieldValue::Text(s)));
            }
        }

        let ints = [
            (&layout.end_level, self.end_level),
            (&layout.fake_end_level, self.fake_end_level),
            (&layout.credits_level, self.credits_level),
        ];
        for (field, value) in ints {
            if let Some(v) = value {
                out.push((field, FieldValue::Int(v)));
            }
        }

        let flags = [
            (&layout.decade_messages, self.decade_messages),
            (&layout.sound, self.sound),
        ];
        for (field, value) in flags {
            if let Some(b) = value {
                out.push((field, FieldValue::Flag(b)));
            }
        }

        out
    }
}

fn out_of_range(field: &FieldSpec, value: i32) -> PlaychipError {
    PlaychipError::OutOfRange {
        field: field.name,
        value,
    }
}

/// Checks the ordering end >= credits >= fake, falling back to the image's
/// current values for levels the request leaves alone.
fn check_levels(image: &ExeImage, request: &PatchRequest) -> Result<()> {
    let layout = &CHIPS_EXE;
    let current = |field: &FieldSpec| i32::from(image.read_i16(field.offsets[0]));

    if let Some(end) = request.end_level {
        if !(1..=MAX_LEVEL).contains(&end) {
            return Err(out_of_range(&layout.end_level, end));
        }
    }
    let end = request
        .end_level
        .unwrap_or_else(|| current(&layout.end_level));

    if let Some(fake) = request.fake_end_level {
        if !(0 <= fake && fake <= end && end <= MAX_LEVEL) {
            return Err(out_of_range(&layout.fake_end_level, fake));
        }
    }
    let fake = request
        .fake_end_level
        .unwrap_or_else(|| current(&layout.fake_end_level));

    if let Some(credits) = request.credits_level {
        let ordered = 1 <= fake && fake <= credits && credits <= end && end <= MAX_LEVEL;
        if credits != 0 && !ordered {
            return Err(out_of_range(&layout.credits_level, credits));
        }
    }

    Ok(())
}

fn check_field(image: &ExeImage, field: &FieldSpec, value: FieldValue<'_>) -> Result<()> {
    match (field.encoding, value) {
        (Encoding::CString { max_len }, FieldValue::Text(s)) => {
            if s.len() > max_len {
                return Err(PlaychipError::ValueTooLarge {
                    field: field.name,
                    value: s.to_string(),
                    max: max_len,
                });
            }
        }
        (Encoding::I16, FieldValue::Int(v)) => {
            i16::try_from(v).map_err(|_| out_of_range(field, v))?;
        }
        (Encoding::Flag { off, on, strict }, FieldValue::Flag(_)) => {
            if strict {
                for &offset in field.offsets {
                    let found = image.read_u8(offset);
                    if found != off && found != on {
                        return Err(PlaychipError::UnexpectedByteValue {
                            field: field.name,
                            offset,
                            found,
                        });
                    }
                }
            }
        }
        (encoding, value) => {
            return Err(PlaychipError::Config(format!(
                "{} is encoded as {:?} and cannot hold {:?}",
                field.name, encoding, value
            )));
        }
    }
    Ok(())
}

fn write_field(image: &mut ExeImage, field: &FieldSpec, value: FieldValue<'_>) {
    for &offset in field.offsets {
        match (field.encoding, value) {
            (Encoding::CString { .. }, FieldValue::Text(s)) => {
                image.write_cstr(offset, s.as_bytes());
            }
            (Encoding::I16, FieldValue::Int(v)) => {
                image.write_word(offset, (v as i16).to_le_bytes());
            }
            (Encoding::Flag { off, on, .. }, FieldValue::Flag(enabled)) => {
                image.write_u8(offset, if enabled { on } else { off });
            }
            _ => continue,
        }

        if let (Some(opcode), FieldValue::Int(v)) = (field.trailing_opcode, value) {
            image.write_u8(offset + 2, opcode.select(v));
        }

        debug!("{} = {:?} at 0x{:X}", field.name, value, offset);
    }
}

/// Validates the whole request against `image`, then writes it. Nothing is
/// written unless every field passes.
pub fn apply(image: &mut ExeImage, request: &PatchRequest) -> Result<()> {
    let request = request.resolved();
    let values = request.values();

    for &(field, value) in &values {
        check_field(image, field, value)?;
    }
    check_levels(image, &request)?;

    for &(field, value) in &values {
        write_field(image, field, value);
    }

    Ok(())
}

/// Loads the executable at `path`, patches it and writes it back atomically.
pub fn patch_file(path: &Path, request: &PatchRequest) -> Result<()> {
    let mut image = ExeImage::load(path)?;
    apply(&mut image, request)?;
    image.save(path)?;
    info!("patched {}", path.display());
    Ok(())
}
