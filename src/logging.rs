//! Logging initialization for the bundled driver binary. Library code never
//! touches the global logger — only `main.rs` calls [`init_logging`], once,
//! at startup.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::LevelFilter;

/// Where diagnostic log output goes.
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Initialize `env_logger` against `target` at `level`. Returns the log
/// file path when `target` is [`LogTarget::File`], for the caller to surface
/// in a summary message.
pub fn init_logging(target: LogTarget, level: LevelFilter) -> Result<Option<PathBuf>> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);

    match target {
        LogTarget::Stderr => {
            builder.target(env_logger::Target::Stderr).init();
            Ok(None)
        }
        LogTarget::File(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed to create log file at {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file))).init();
            Ok(Some(path))
        }
    }
}

/// Convenience for a caller that only has an optional `--log-file` flag.
pub fn init_from_optional_path(path: Option<&Path>, level: LevelFilter) -> Result<Option<PathBuf>> {
    match path {
        Some(p) => init_logging(LogTarget::File(p.to_path_buf()), level),
        None => init_logging(LogTarget::Stderr, level),
    }
}
