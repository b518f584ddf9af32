use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::layout::{FieldSpec, CHIPS_EXE};
use crate::{PlaychipError, Result};

/// Size check applied before any field is touched. There is no signature to
/// look for, so this is the only structural test.
pub fn validate(bytes: &[u8]) -> Result<()> {
    check_len(bytes.len() as u64)
}

/// Same check as [`validate`], from file metadata alone.
pub fn check_exe(path: &Path) -> Result<()> {
    check_len(fs::metadata(path)?.len())
}

fn check_len(len: u64) -> Result<()> {
    if len < CHIPS_EXE.min_size as u64 {
        return Err(PlaychipError::InvalidImage {
            len,
            min: CHIPS_EXE.min_size,
        });
    }
    Ok(())
}

/// An in-memory copy of CHIPS.EXE that has passed [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExeImage {
    bytes: Vec<u8>,
}

impl ExeImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        validate(&bytes)?;
        Ok(Self { bytes })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        debug!("read {} bytes from {}", bytes.len(), path.display());
        Self::from_bytes(bytes)
    }

    /// Writes the image to a temporary file next to `path`, then renames it
    /// over `path`. The original is untouched if anything fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&self.bytes)?;
        if let Ok(meta) = fs::metadata(path) {
            tmp.as_file().set_permissions(meta.permissions())?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        debug!("wrote {} bytes to {}", self.bytes.len(), path.display());
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    pub fn read_i16(&self, offset: usize) -> i16 {
        i16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }

    /// Bytes from `offset` up to a NUL or `max_len`, whichever comes first.
    pub fn read_cstr(&self, offset: usize, max_len: usize) -> &[u8] {
        let region = &self.bytes[offset..offset + max_len];
        let end = region.iter().position(|&b| b == 0).unwrap_or(max_len);
        &region[..end]
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) {
        self.bytes[offset] = value;
    }

    pub fn write_word(&mut self, offset: usize, word: [u8; 2]) {
        self.bytes[offset..offset + 2].copy_from_slice(&word);
    }

    pub fn write_cstr(&mut self, offset: usize, value: &[u8]) {
        self.bytes[offset..offset + value.len()].copy_from_slice(value);
        self.bytes[offset + value.len()] = 0;
    }

    /// Signed words stored at each of `field`'s offsets.
    pub fn read_words(&self, field: &FieldSpec) -> Vec<i16> {
        field.offsets.iter().map(|&o| self.read_i16(o)).collect()
    }
}
