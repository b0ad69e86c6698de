//! The `ArchiveBuilder` capability: an abstraction over any external tool
//! able to emit a native BSA/BA2 from a staged directory tree.
//!
//! Grounded on the teacher's `ArchiveManager`, which wraps Archive2.exe and
//! BSArch.exe behind one interface via `std::process::Command`. Here the
//! interface is a trait so callers can chain several backends and the
//! pipeline can refuse to run at all when none are usable, rather than
//! silently degrading to a ZIP the engine cannot load (spec §4.6).

use std::path::{Path, PathBuf};
use std::process::Command;

use log::{info, warn};

use crate::game::GameKind;

/// A backend capable of producing one native archive from a staged tree.
///
/// `build` must preserve `staging_dir`'s structure verbatim inside the
/// archive — member paths are the engine's lookup keys.
pub trait ArchiveBuilder: Send + Sync {
    /// Human-readable backend name, used in error messages.
    fn name(&self) -> &str;

    /// Whether this backend is currently usable (binary on `PATH`,
    /// version check, etc.). Checked before `build` is ever called.
    fn is_available(&self) -> bool;

    fn build(&self, staging_dir: &Path, output_path: &Path, game: GameKind) -> Result<(), BuildError>;
}

#[derive(Debug, Clone)]
pub struct BuildError {
    pub reason: String,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}
impl std::error::Error for BuildError {}

/// Invokes an external BSArch-compatible command-line tool. One instance
/// per candidate executable; candidates are tried in the order supplied to
/// [`chain`].
pub struct ExternalToolBuilder {
    tool_name: String,
    executable: PathBuf,
}

impl ExternalToolBuilder {
    pub fn new(tool_name: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        Self {
            tool_name: tool_name.into(),
            executable: executable.into(),
        }
    }
}

impl ArchiveBuilder for ExternalToolBuilder {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn is_available(&self) -> bool {
        self.executable.is_file()
    }

    fn build(&self, staging_dir: &Path, output_path: &Path, game: GameKind) -> Result<(), BuildError> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError {
                reason: format!("failed to create output directory: {e}"),
            })?;
        }

        info!(
            "{}: archiving {} -> {} ({})",
            self.tool_name,
            staging_dir.display(),
            output_path.display(),
            game.display_name()
        );

        // BSArch-style CLI contract: `bsarch pack <src_dir> <out_archive> -fo4|-sse`.
        let game_flag = match game {
            GameKind::Fallout4 => "-fo4",
            GameKind::Skyrim => "-sse",
        };

        let output = Command::new(&self.executable)
            .arg("pack")
            .arg(staging_dir)
            .arg(output_path)
            .arg(game_flag)
            .output()
            .map_err(|e| BuildError {
                reason: format!("failed to launch {}: {e}", self.tool_name),
            })?;

        if !output.status.success() {
            return Err(BuildError {
                reason: format!(
                    "{} exited with {}: {}",
                    self.tool_name,
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }

        Ok(())
    }
}

/// Tries each backend's [`ArchiveBuilder::is_available`] in order and
/// returns the first that reports itself usable. Never falls back past the
/// supplied list; returns `None` if every backend is unavailable, which the
/// caller (the `Packager`, pre-flight) turns into
/// [`crate::error::PackagerError::NoArchiveBuilderAvailable`] before any
/// staging happens.
pub fn first_available<'a>(chain: &'a [Box<dyn ArchiveBuilder>]) -> Option<&'a dyn ArchiveBuilder> {
    for candidate in chain {
        if candidate.is_available() {
            return Some(candidate.as_ref());
        }
        warn!("archive builder backend unavailable: {}", candidate.name());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeBuilder {
        available: bool,
        name: &'static str,
    }

    impl ArchiveBuilder for FakeBuilder {
        fn name(&self) -> &str {
            self.name
        }
        fn is_available(&self) -> bool {
            self.available
        }
        fn build(&self, _staging_dir: &Path, output_path: &Path, _game: GameKind) -> Result<(), BuildError> {
            std::fs::write(output_path, b"fake-archive").map_err(|e| BuildError {
                reason: e.to_string(),
            })
        }
    }

    #[test]
    fn picks_first_available_backend() {
        let chain: Vec<Box<dyn ArchiveBuilder>> = vec![
            Box::new(FakeBuilder { available: false, name: "primary" }),
            Box::new(FakeBuilder { available: true, name: "fallback" }),
        ];
        let chosen = first_available(&chain).unwrap();
        assert_eq!(chosen.name(), "fallback");
    }

    #[test]
    fn none_available_yields_none() {
        let chain: Vec<Box<dyn ArchiveBuilder>> = vec![
            Box::new(FakeBuilder { available: false, name: "a" }),
            Box::new(FakeBuilder { available: false, name: "b" }),
        ];
        assert!(first_available(&chain).is_none());
    }

    #[test]
    fn external_tool_builder_reports_unavailable_for_missing_binary() {
        let builder = ExternalToolBuilder::new("bsarch", "/no/such/bsarch.exe");
        assert!(!builder.is_available());
    }
}
