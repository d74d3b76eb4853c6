use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};

use crate::config::app_cache_dir;

/// Logs to stderr with `RUST_LOG` (default `info`). For command-line tools.
pub fn init_stderr(default_level: &str) {
    let _ = Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .try_init();
}

/// The terminal UI owns the screen, so its log goes to
/// `<cache>/unity_cup_terminal/client.log` instead. Returns the file path.
pub fn init_file(default_level: &str) -> Result<PathBuf> {
    let dir = app_cache_dir().context("no cache directory (HOME unset)")?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join("client.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    Builder::from_env(Env::default().default_filter_or(default_level))
        .target(Target::Pipe(Box::new(file)))
        .try_init()
        .context("logger already initialised")?;
    Ok(path)
}
