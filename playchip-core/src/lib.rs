use thiserror::Error;

pub mod dump;
pub mod image;
pub mod install;
pub mod layout;
pub mod levelset;
pub mod patch;
pub mod policy;

pub use dump::{dump, dump_file, ExeFieldReport};
pub use image::{check_exe, validate, ExeImage};
pub use install::{initialize, play, Installation};
pub use layout::{ExeLayout, FieldSpec, CHIPS_EXE};
pub use levelset::LevelsetHeader;
pub use patch::{apply, patch_file, PatchRequest};
pub use policy::{derive, play_request};

#[derive(Debug, Error)]
pub enum PlaychipError {
    #[error("{field} value {value:?} is longer than {max} bytes")]
    ValueTooLarge {
        field: &'static str,
        value: String,
        max: usize,
    },
    #[error("{field} value {value} is out of range")]
    OutOfRange { field: &'static str, value: i32 },
    #[error("executable is {len} bytes (expected at least {min}); not Chip's Challenge")]
    InvalidImage { len: u64, min: usize },
    #[error("not a Chip's Challenge levelset (signature {signature:02X?})")]
    InvalidLevelCollection { signature: Vec<u8> },
    #[error("unexpected byte 0x{found:02X} for {field} at offset 0x{offset:X}")]
    UnexpectedByteValue {
        field: &'static str,
        offset: usize,
        found: u8,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PlaychipError>;
