use crate::layout::{CHIPS_EXE, DEFAULT_DAT};
use crate::levelset::LevelsetHeader;
use crate::patch::PatchRequest;

/// Level count of the original CHIPS.DAT.
const ORIGINAL_LEVEL_COUNT: u16 = 149;
/// Last level before the original set's bonus levels.
const ORIGINAL_FAKE_END_LEVEL: i32 = 144;
/// Level the original set shows the credits on.
const ORIGINAL_CREDITS_LEVEL: i32 = 145;

/// Ending levels for a levelset. Only the original set gets a pre-credits
/// ending and a credits level; every other set simply ends on its last level.
pub fn derive(header: &LevelsetHeader, installed_name: &str) -> PatchRequest {
    let fake_end_level = (header.level_count == ORIGINAL_LEVEL_COUNT)
        .then_some(ORIGINAL_FAKE_END_LEVEL);

    let credits_level = if installed_name.eq_ignore_ascii_case(DEFAULT_DAT) {
        ORIGINAL_CREDITS_LEVEL
    } else {
        0
    };

    PatchRequest {
        end_level: Some(i32::from(header.level_count)),
        fake_end_level,
        credits_level: Some(credits_level),
        ..PatchRequest::default()
    }
}

/// Everything written before launching a levelset: its ending levels, the
/// configuration file, its name as the window heading, decade messages off
/// and sound on.
pub fn play_request(header: &LevelsetHeader, set_name: &str, ini_file: &str) -> PatchRequest {
    let max_heading = CHIPS_EXE.ini_heading.max_len().unwrap_or(0);

    PatchRequest {
        ini_file: Some(ini_file.to_string()),
        ini_heading: Some(truncate_to_boundary(set_name, max_heading).to_string()),
        decade_messages: Some(false),
        sound: Some(true),
        ..derive(header, set_name)
    }
}

fn truncate_to_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
