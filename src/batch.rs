//! Discovers multiple mod folders under a collection root and runs the
//! single-mod `Packager` pipeline over each with isolated staging.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::error::PackagerError;
use crate::game::GameKind;
use crate::packager::{Options, PackageLayout, Packager};

const PLUGIN_EXTENSIONS: [&str; 3] = ["esp", "esl", "esm"];
const JUNK_NAMES: [&str; 3] = [".ds_store", "thumbs.db", "desktop.ini"];
const JUNK_SUFFIXES: [&str; 2] = [".tmp", ".bak"];

/// One candidate mod discovered under a collection root.
#[derive(Debug, Clone)]
pub struct ModInfo {
    pub name: String,
    pub root: PathBuf,
    pub plugin_candidates: Vec<PathBuf>,
    pub has_assets: bool,
}

/// Outcome of processing one mod.
#[derive(Debug)]
pub enum ModStatus {
    Processed(PackageLayout),
    SkippedNoPlugin,
    Failed(PackagerError),
}

/// One row of the aggregate [`BatchReport`].
#[derive(Debug)]
pub struct BatchReportEntry {
    pub mod_name: String,
    pub status: ModStatus,
}

/// Serializable summary counts alongside the per-mod detail — what
/// `batch_report.json` actually serializes, since [`PackagerError`] and
/// staging paths inside `ModStatus` are not meant for a stable wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReportSummary {
    pub total_mods: usize,
    pub processed: usize,
    pub skipped_no_plugin: usize,
    pub failed: usize,
}

/// Full result of a batch run: detailed per-mod entries plus the summary
/// written to `batch_report.json`.
#[derive(Debug)]
pub struct BatchReport {
    pub entries: Vec<BatchReportEntry>,
    pub summary: BatchReportSummary,
}

impl BatchReport {
    /// Writes `batch_report.json` (summary counts only — per-mod errors and
    /// staging paths are not a stable wire format) to `path`.
    pub fn write_json(&self, path: &Path) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(&self.summary)
            .map_err(|e| PackagerError::Compress(format!("serializing batch_report.json: {e}")))?;
        std::fs::write(path, json).map_err(|e| PackagerError::io(path, e))
    }

    fn from_entries(entries: Vec<BatchReportEntry>) -> Self {
        let processed = entries.iter().filter(|e| matches!(e.status, ModStatus::Processed(_))).count();
        let skipped = entries
            .iter()
            .filter(|e| matches!(e.status, ModStatus::SkippedNoPlugin))
            .count();
        let failed = entries.iter().filter(|e| matches!(e.status, ModStatus::Failed(_))).count();
        let summary = BatchReportSummary {
            total_mods: entries.len(),
            processed,
            skipped_no_plugin: skipped,
            failed,
        };
        Self { entries, summary }
    }
}

/// Runs [`Packager::build_package`] over every mod discovered under
/// `collection_root`, bounded by `options.batch_concurrency`, into a
/// dedicated `rayon::ThreadPool` nested under the classifier's own pool —
/// each per-mod `Options` gets its thread count divided by the batch
/// width when the caller left `threads` at the default, keeping total
/// worker count under roughly `2 * cores` (spec §5).
pub fn process_collection(
    collection_root: &Path,
    reference_root: &Path,
    out_root: &Path,
    game: GameKind,
    options: &Options,
    packager: &Packager<'_>,
    cancel: &CancellationToken,
) -> crate::error::Result<BatchReport> {
    let mods = discover_mods(collection_root)?;
    let staging_root = out_root.join(".batch_staging");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.batch_concurrency.max(1))
        .build()
        .map_err(|e| PackagerError::FatalClassifier {
            reason: format!("failed to start batch worker pool: {e}"),
        })?;

    let per_mod_threads = (options.threads / options.batch_concurrency.max(1)).max(1);

    let entries: Vec<BatchReportEntry> = pool.install(|| {
        mods.par_iter()
            .map(|m| {
                let status = process_one(
                    m,
                    reference_root,
                    out_root,
                    &staging_root,
                    game,
                    options,
                    per_mod_threads,
                    packager,
                    cancel,
                );
                BatchReportEntry {
                    mod_name: m.name.clone(),
                    status,
                }
            })
            .collect()
    });

    if options.cleanup_staging && staging_root.exists() {
        let _ = std::fs::remove_dir_all(&staging_root);
    }

    Ok(BatchReport::from_entries(entries))
}

#[allow(clippy::too_many_arguments)]
fn process_one(
    mod_info: &ModInfo,
    reference_root: &Path,
    out_root: &Path,
    staging_root: &Path,
    game: GameKind,
    options: &Options,
    per_mod_threads: usize,
    packager: &Packager<'_>,
    cancel: &CancellationToken,
) -> ModStatus {
    if mod_info.plugin_candidates.is_empty() {
        return ModStatus::SkippedNoPlugin;
    }

    let asset_root = staging_root.join(&mod_info.name);
    if let Err(e) = stage_asset_subtree(&mod_info.root, &asset_root) {
        return ModStatus::Failed(e);
    }

    let per_mod_options = Options {
        threads: per_mod_threads,
        chunk_size_bytes: options.chunk_size_bytes,
        compression_level: options.compression_level,
        plugin_template_override: options.plugin_template_override.clone(),
        separate_components: options.separate_components,
        batch_concurrency: options.batch_concurrency,
        cleanup_staging: options.cleanup_staging,
    };

    let mod_out_dir = out_root.join(&mod_info.name);
    match packager.build_package(
        &asset_root,
        reference_root,
        game,
        &mod_info.name,
        &mod_out_dir,
        &per_mod_options,
        cancel,
    ) {
        Ok(layout) => ModStatus::Processed(layout),
        Err(e) => ModStatus::Failed(e),
    }
}

/// Mirrors every non-plugin, non-junk file under `mod_root` into
/// `asset_root`, hardlinking where possible — this filtered tree, not the
/// mod folder itself, is what the single-mod `Packager` sees as its
/// generated root (spec §4.10: plugin files and junk must not contaminate
/// classification).
fn stage_asset_subtree(mod_root: &Path, asset_root: &Path) -> crate::error::Result<()> {
    for entry in walkdir::WalkDir::new(mod_root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        if is_junk(entry.path()) || is_plugin_file(entry.path()) {
            continue;
        }
        let rel = entry.path().strip_prefix(mod_root).unwrap_or(entry.path());
        let dest = asset_root.join(rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PackagerError::io(parent, e))?;
        }
        if std::fs::hard_link(entry.path(), &dest).is_err() {
            std::fs::copy(entry.path(), &dest).map_err(|e| PackagerError::io(entry.path(), e))?;
        }
    }
    std::fs::create_dir_all(asset_root).map_err(|e| PackagerError::io(asset_root, e))?;
    Ok(())
}

/// Treats each immediate subdirectory of `collection_root` as a candidate
/// mod (spec §4.10). A mod needs at least one plugin-extension file to be
/// processable; zero-plugin mods are still discovered (so they can be
/// reported as skipped) but never packaged.
fn discover_mods(collection_root: &Path) -> crate::error::Result<Vec<ModInfo>> {
    let entries = std::fs::read_dir(collection_root).map_err(|e| PackagerError::io(collection_root, e))?;

    let mut mods = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PackagerError::io(collection_root, e))?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }

        let root = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        let plugin_candidates = find_plugin_candidates(&root);
        let has_assets = has_non_junk_files(&root);

        mods.push(ModInfo {
            name,
            root,
            plugin_candidates,
            has_assets,
        });
    }

    mods.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(mods)
}

fn find_plugin_candidates(root: &Path) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| PLUGIN_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    candidates.sort();
    candidates
}

fn is_junk(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let lower = name.to_lowercase();
    if JUNK_NAMES.contains(&lower.as_str()) {
        return true;
    }
    if lower.starts_with('.') {
        return true;
    }
    JUNK_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

fn is_plugin_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| PLUGIN_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn has_non_junk_files(root: &Path) -> bool {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_file() && !is_junk(e.path()) && !is_plugin_file(e.path()))
}
