use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

const LOG_DIR: &str = "torn_terminal";
const LOG_FILE: &str = "torn_terminal.log";
const DEFAULT_FILTER: &str = "info";

/// The terminal belongs to the UI, so diagnostics go to a file. `RUST_LOG` adjusts the filter.
pub fn init_file_logging() -> Result<PathBuf> {
    let dir = cache_dir().context("no cache directory (set XDG_CACHE_HOME or HOME)")?;
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(env::var("RUST_LOG").ok().as_deref()))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;
    Ok(path)
}

/// `RUST_LOG` directives when present and valid, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn cache_dir() -> Option<PathBuf> {
    if let Some(base) = env::var("XDG_CACHE_HOME").ok().filter(|s| !s.trim().is_empty()) {
        return Some(PathBuf::from(base).join(LOG_DIR));
    }
    let home = env::var("HOME").ok().filter(|s| !s.trim().is_empty())?;
    Some(PathBuf::from(home).join(".cache").join(LOG_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn rust_log_level_is_honoured() {
        assert_eq!(log_filter(Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(Some("warn")).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn unset_or_blank_falls_back_to_info() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
    }
}
