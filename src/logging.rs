//! tracing subscriber setup.
//!
//! The TUI owns the terminal, so interactive sessions log to a file. Text
//! commands log to stderr and stay quiet unless asked.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub(crate) enum LogTarget<'a> {
    Stderr,
    File(Option<&'a Path>),
}

pub(crate) fn init(target: LogTarget<'_>, verbose: bool) -> Result<()> {
    match target {
        LogTarget::Stderr => {
            let default = if verbose { "debug" } else { "warn" };
            tracing_subscriber::fmt()
                .with_env_filter(filter(default))
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("install stderr logger: {e}"))?;
        }
        LogTarget::File(path) => {
            let log_path = path.map(Path::to_path_buf).unwrap_or_else(default_log_path);
            if let Some(parent) = log_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("create log directory {}", parent.display())
                    })?;
                }
            }
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .with_context(|| format!("open log file {}", log_path.display()))?;

            let default = if verbose { "debug" } else { "info" };
            tracing_subscriber::fmt()
                .with_env_filter(filter(default))
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("install file logger: {e}"))?;
        }
    }
    Ok(())
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into())
}

fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("influence-cli")
        .join("influence-cli.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_path_is_namespaced() {
        let p = default_log_path();
        assert!(p.ends_with("influence-cli/influence-cli.log"));
    }
}
