use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::{PlaychipError, Result};

/// Magic bytes at the start of every CHIPS.DAT-format levelset.
pub const LEVELSET_SIGNATURE: [u8; 2] = [0xAC, 0xAA];

pub const HEADER_SIZE: usize = 6;

/// The fixed header of a levelset: signature, version, level count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelsetHeader {
    pub version: [u8; 2],
    pub level_count: u16,
}

impl LevelsetHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let signature = &bytes[..bytes.len().min(2)];
        if signature != LEVELSET_SIGNATURE || bytes.len() < HEADER_SIZE {
            return Err(PlaychipError::InvalidLevelCollection {
                signature: signature.to_vec(),
            });
        }

        Ok(Self {
            version: [bytes[2], bytes[3]],
            level_count: u16::from_le_bytes([bytes[4], bytes[5]]),
        })
    }

    /// Reads just the header from the front of `reader`.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Self::parse(&buf[..filled])
    }

    pub fn open(path: &Path) -> Result<Self> {
        Self::read_from(File::open(path)?)
    }
}
