//! The `Metadata/` directory emitted alongside every package: human-readable
//! installation notes, a machine-readable descriptor, and the per-run log.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{PackagerError, Result};
use crate::game::GameKind;

/// Machine-readable descriptor written to `Metadata/package_info.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    pub mod_name: String,
    pub game: String,
    pub chunk_count: usize,
    pub pack_count: usize,
    pub loose_count: usize,
    pub skip_count: usize,
    pub error_count: usize,
    pub created_at: String,
    pub modpacker_version: String,
    pub warnings: Vec<String>,
}

/// One line of the per-run build log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildLogEntry {
    pub level: String,
    pub message: String,
    pub timestamp: String,
}

/// An in-memory sink the [`crate::packager::Packager`] installs for the
/// duration of one run. Separate from the global `log` logger — a caller
/// that never touches `log::set_logger` still gets a `build_log.txt`.
#[derive(Default)]
pub struct BuildLog {
    entries: Mutex<Vec<BuildLogEntry>>,
}

impl BuildLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, level: &str, message: impl Into<String>, timestamp: impl Into<String>) {
        let mut entries = self.entries.lock().expect("build log mutex poisoned");
        entries.push(BuildLogEntry {
            level: level.to_string(),
            message: message.into(),
            timestamp: timestamp.into(),
        });
    }

    fn render(&self) -> String {
        let entries = self.entries.lock().expect("build log mutex poisoned");
        let mut out = String::new();
        for entry in entries.iter() {
            out.push_str(&format!("[{}] {} {}\n", entry.timestamp, entry.level, entry.message));
        }
        out
    }
}

/// Writes `INSTALLATION.txt`, `SUMMARY.txt`, `package_info.json`, and
/// `build_log.txt` under `metadata_dir`. All text output is UTF-8 with `\n`
/// line endings only — no escaped-backslash artifacts (spec §6).
pub fn write_metadata(
    metadata_dir: &Path,
    info: &PackageInfo,
    game: GameKind,
    build_log: &BuildLog,
) -> Result<()> {
    fs::create_dir_all(metadata_dir).map_err(|e| PackagerError::io(metadata_dir, e))?;

    let installation = render_installation(info, game);
    write_text(&metadata_dir.join("INSTALLATION.txt"), &installation)?;

    let summary = render_summary(info);
    write_text(&metadata_dir.join("SUMMARY.txt"), &summary)?;

    let json_path = metadata_dir.join("package_info.json");
    let json = serde_json::to_string_pretty(info)
        .map_err(|e| PackagerError::Compress(format!("serializing package_info.json: {e}")))?;
    write_text(&json_path, &json)?;

    write_text(&metadata_dir.join("build_log.txt"), &build_log.render())?;

    Ok(())
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| PackagerError::io(path, e))
}

fn render_installation(info: &PackageInfo, game: GameKind) -> String {
    let mut lines = vec![
        format!("Installation instructions for {}", info.mod_name),
        String::new(),
        format!("Target game: {}", game.display_name()),
        String::new(),
    ];

    if info.pack_count > 0 {
        lines.push(format!(
            "1. Install {}_Packed archive with your mod manager.",
            info.mod_name
        ));
    }
    if info.loose_count > 0 {
        lines.push(format!(
            "{}. Install {}_Loose archive AFTER the packed archive, so loose files take priority.",
            if info.pack_count > 0 { "2" } else { "1" },
            info.mod_name
        ));
    }
    if info.pack_count == 0 && info.loose_count == 0 {
        lines.push("No installable content was produced (every file matched the reference tree).".to_string());
    }

    if !info.warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings:".to_string());
        for warning in &info.warnings {
            lines.push(format!("- {warning}"));
        }
    }

    lines.join("\n") + "\n"
}

fn render_summary(info: &PackageInfo) -> String {
    format!(
        "{}\npack: {}\nloose: {}\nskip: {}\nerrors: {}\nchunks: {}\ncreated_at: {}\n",
        info.mod_name,
        info.pack_count,
        info.loose_count,
        info.skip_count,
        info.error_count,
        info.chunk_count,
        info.created_at
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_info() -> PackageInfo {
        PackageInfo {
            mod_name: "MyMod".to_string(),
            game: "Skyrim".to_string(),
            chunk_count: 1,
            pack_count: 2,
            loose_count: 1,
            skip_count: 5,
            error_count: 0,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            modpacker_version: "0.1.0".to_string(),
            warnings: vec![],
        }
    }

    #[test]
    fn writes_all_four_files() {
        let dir = tempdir().unwrap();
        let log = BuildLog::new();
        log.push("INFO", "starting", "2026-01-01T00:00:00Z");

        write_metadata(dir.path(), &sample_info(), GameKind::Skyrim, &log).unwrap();

        assert!(dir.path().join("INSTALLATION.txt").exists());
        assert!(dir.path().join("SUMMARY.txt").exists());
        assert!(dir.path().join("package_info.json").exists());
        assert!(dir.path().join("build_log.txt").exists());
    }

    #[test]
    fn installation_text_has_no_crlf() {
        let dir = tempdir().unwrap();
        let log = BuildLog::new();
        write_metadata(dir.path(), &sample_info(), GameKind::Skyrim, &log).unwrap();

        let contents = fs::read_to_string(dir.path().join("INSTALLATION.txt")).unwrap();
        assert!(!contents.contains('\r'));
    }

    #[test]
    fn package_info_round_trips_through_json() {
        let info = sample_info();
        let json = serde_json::to_string(&info).unwrap();
        let parsed: PackageInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.mod_name, info.mod_name);
        assert_eq!(parsed.pack_count, info.pack_count);
    }

    #[test]
    fn warnings_surface_in_installation_text() {
        let dir = tempdir().unwrap();
        let mut info = sample_info();
        info.warnings.push("packed side failed; loose delivered independently".to_string());
        let log = BuildLog::new();
        write_metadata(dir.path(), &info, GameKind::Skyrim, &log).unwrap();

        let contents = fs::read_to_string(dir.path().join("INSTALLATION.txt")).unwrap();
        assert!(contents.contains("packed side failed"));
    }
}
