use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use playchip_core::install::prepare;
use playchip_core::{dump_file, initialize, play, Installation, PlaychipError, Result};

mod config;

use config::{load_config, save_config, PlaychipConfig};

#[derive(Debug, Parser)]
#[command(name = "playchip", version, about = "Play Chip's Challenge levelsets")]
struct Args {
    /// Directory holding the patched copy of the game.
    #[arg(long, global = true, value_name = "DIR")]
    install_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Copy CHIPS.EXE and its sound files from an existing installation.
    Init {
        /// Game directory, or the executable itself.
        path: PathBuf,
    },
    /// Print the configurable fields of an executable.
    Dump {
        /// Defaults to the installed copy.
        exe: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
    /// Install a levelset, patch the executable for it and start the game.
    Run {
        levelset: PathBuf,

        /// Patch only; don't start the game.
        #[arg(long)]
        no_launch: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn installation(args_dir: Option<PathBuf>, cfg: &PlaychipConfig) -> Result<Installation> {
    args_dir
        .or_else(|| cfg.install_dir())
        .map(Installation::new)
        .ok_or_else(|| {
            PlaychipError::Config("Could not determine an install directory".to_string())
        })
}

/// Executable `dump` reads. An explicit path needs no install directory.
fn dump_target(
    exe: Option<PathBuf>,
    args_dir: Option<PathBuf>,
    cfg: &PlaychipConfig,
) -> Result<PathBuf> {
    match exe {
        Some(exe) => Ok(exe),
        None => Ok(installation(args_dir, cfg)?.exe_path()),
    }
}

fn run(args: Args) -> Result<()> {
    let mut cfg = load_config()?;

    match args.command {
        Command::Init { path } => {
            let install = installation(args.install_dir.clone(), &cfg)?;
            initialize(&path, &install)?;
            if args.install_dir.is_some() {
                cfg.install_dir = Some(install.root().to_path_buf());
                save_config(&cfg)?;
            }
        }
        Command::Dump { exe, json } => {
            let exe = dump_target(exe, args.install_dir, &cfg)?;
            let report = dump_file(&exe)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
        Command::Run {
            levelset,
            no_launch,
        } => {
            let install = installation(args.install_dir, &cfg)?;
            if no_launch {
                prepare(&levelset, &install, &cfg.ini_file)?;
            } else {
                play(&levelset, &install, &cfg.ini_file)?;
            }
        }
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dump_path_skips_install_lookup() {
        let cfg = PlaychipConfig::default();
        let exe = PathBuf::from("/somewhere/CHIPS.EXE");
        assert_eq!(dump_target(Some(exe.clone()), None, &cfg).unwrap(), exe);
    }

    #[test]
    fn default_dump_path_is_installed_exe() {
        let cfg = PlaychipConfig {
            install_dir: Some(PathBuf::from("/games/chips")),
            ..PlaychipConfig::default()
        };
        assert_eq!(
            dump_target(None, None, &cfg).unwrap(),
            PathBuf::from("/games/chips").join("chips.exe")
        );
        assert_eq!(
            dump_target(None, Some(PathBuf::from("/other")), &cfg).unwrap(),
            PathBuf::from("/other").join("chips.exe")
        );
    }
}
