use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::image::{check_exe, ExeImage};
use crate::layout::DEFAULT_DAT;
use crate::levelset::LevelsetHeader;
use crate::patch::apply;
use crate::policy::play_request;
use crate::{PlaychipError, Result};

/// Executable name looked for when `initialize` is given a directory.
pub const SOURCE_EXE: &str = "CHIPS.EXE";
/// Name of the private copy that gets patched.
pub const INSTALLED_EXE: &str = "chips.exe";
/// Helper library the executable will not start without.
pub const SUPPORT_DLL: &str = "WEP4UTIL.DLL";

/// A private copy of the game that playchip is free to patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    root: PathBuf,
}

impl Installation {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exe_path(&self) -> PathBuf {
        self.root.join(INSTALLED_EXE)
    }

    pub fn dat_path(&self) -> PathBuf {
        self.root.join(DEFAULT_DAT)
    }
}

/// Splits `source` into the game directory and executable name. A file path
/// names the executable directly; a directory is assumed to hold CHIPS.EXE.
fn locate_source(source: &Path) -> Result<(PathBuf, PathBuf)> {
    if source.is_file() {
        let dir = source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        return Ok((dir.to_path_buf(), source.to_path_buf()));
    }

    if source.is_dir() {
        return Ok((source.to_path_buf(), source.join(SOURCE_EXE)));
    }

    Err(PlaychipError::Config(format!(
        "Input path does not exist: {}",
        source.display()
    )))
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("wav"))
}

/// Copies the executable, its helper DLL and the sound effects from an
/// existing Chip's Challenge directory into `install`.
pub fn initialize(source: &Path, install: &Installation) -> Result<()> {
    let (game_dir, exe_src) = locate_source(source)?;
    check_exe(&exe_src)?;

    fs::create_dir_all(install.root())?;

    let exe_dest = install.exe_path();
    fs::copy(&exe_src, &exe_dest)?;
    info!("{} -> {}", exe_src.display(), exe_dest.display());

    let mut assets = vec![game_dir.join(SUPPORT_DLL)];
    for entry in WalkDir::new(&game_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            PlaychipError::Config(format!("failed to list {}: {e}", game_dir.display()))
        })?;
        if entry.file_type().is_file() && is_wav(entry.path()) {
            assets.push(entry.into_path());
        }
    }

    for asset in &assets {
        let Some(name) = asset.file_name() else {
            continue;
        };
        let dest = install.root().join(name);
        fs::copy(asset, &dest)?;
        info!("{} -> {}", asset.display(), dest.display());
    }

    Ok(())
}

/// Installs `levelset` as the game's data file and patches the executable to
/// match it. The patch is checked before the data file is replaced, so a
/// rejected levelset leaves the installation as it was. Returns the path of
/// the patched executable.
pub fn prepare(levelset: &Path, install: &Installation, ini_file: &str) -> Result<PathBuf> {
    let header = LevelsetHeader::open(levelset)?;
    let set_name = levelset
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            PlaychipError::Config(format!("Levelset has no file name: {}", levelset.display()))
        })?;
    info!("{} has {} levels", set_name, header.level_count);

    let exe = install.exe_path();
    if !exe.exists() {
        return Err(PlaychipError::Config(format!(
            "Chip's Challenge is not installed in {} (run init first)",
            install.root().display()
        )));
    }

    let mut image = ExeImage::load(&exe)?;
    apply(&mut image, &play_request(&header, set_name, ini_file))?;

    let dat = install.dat_path();
    fs::copy(levelset, &dat)?;
    info!("{} -> {}", levelset.display(), dat.display());

    image.save(&exe)?;
    info!("patched {}", exe.display());
    Ok(exe)
}

/// Starts the patched executable from inside the installation directory and
/// waits for it to exit.
pub fn launch(install: &Installation) -> Result<ExitStatus> {
    let exe = install.exe_path();
    info!("launching {}", exe.display());
    let status = Command::new(&exe).current_dir(install.root()).status()?;
    if !status.success() {
        warn!("{} exited with {}", exe.display(), status);
    }
    Ok(status)
}

/// `prepare` followed by `launch`. The game's own exit status is only
/// logged.
pub fn play(levelset: &Path, install: &Installation, ini_file: &str) -> Result<()> {
    prepare(levelset, install, ini_file)?;
    launch(install)?;
    Ok(())
}
