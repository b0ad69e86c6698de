//! Top-level orchestration: classify, chunk, emit plugin, compress, write
//! metadata, clean up. The single entry point a non-batch caller needs.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::archive::ArchiveBuilder;
use crate::cancel::CancellationToken;
use crate::chunk::{self, DEFAULT_CHUNK_SIZE_BYTES};
use crate::classify::{self, ClassificationResult};
use crate::compress::{CompressMember, CompressionLevel, Compressor};
use crate::error::{PackagerError, Result};
use crate::game::GameKind;
use crate::metadata::{self, BuildLog, PackageInfo};
use crate::plugin::{self, TemplateSource};
use crate::progress::ProgressReporter;

/// Configuration surface for a single-mod `build_package` run (spec §6).
pub struct Options {
    pub threads: usize,
    pub chunk_size_bytes: u64,
    pub compression_level: CompressionLevel,
    pub plugin_template_override: Option<PathBuf>,
    pub separate_components: bool,
    pub batch_concurrency: usize,
    pub cleanup_staging: bool,
}

impl Default for Options {
    fn default() -> Self {
        let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self {
            threads: cores.min(8),
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
            compression_level: CompressionLevel(3),
            plugin_template_override: None,
            separate_components: true,
            batch_concurrency: cores.min(4),
            cleanup_staging: true,
        }
    }
}

/// The set of artifacts a completed (or partially completed) run produced.
#[derive(Debug, Clone, Default)]
pub struct PackageLayout {
    pub root: PathBuf,
    pub packed_archive: Option<PathBuf>,
    pub loose_archive: Option<PathBuf>,
    pub metadata_dir: PathBuf,
    pub warnings: Vec<String>,
    pub pack_count: usize,
    pub loose_count: usize,
    pub skip_count: usize,
    pub error_count: usize,
    pub chunk_count: usize,
}

/// Ties together every component capability a run needs. Construct once,
/// call [`Packager::build_package`] per mod.
pub struct Packager<'a> {
    pub archive_builders: &'a [Box<dyn ArchiveBuilder>],
    pub compressor: &'a dyn Compressor,
    pub template_source: &'a dyn TemplateSource,
    pub progress: &'a dyn ProgressReporter,
}

impl<'a> Packager<'a> {
    pub fn build_package(
        &self,
        generated_root: &Path,
        reference_root: &Path,
        game: GameKind,
        mod_name: &str,
        out_dir: &Path,
        options: &Options,
        cancel: &CancellationToken,
    ) -> Result<PackageLayout> {
        let builder = crate::archive::first_available(self.archive_builders)
            .ok_or(PackagerError::NoArchiveBuilderAvailable)?;

        validate_inputs(generated_root, reference_root)?;

        let package_root = out_dir.join(format!("{mod_name}_Package"));
        let staging_root = package_root.join(".staging");
        let metadata_dir = package_root.join("Metadata");

        let build_log = BuildLog::new();
        build_log.push("INFO", format!("starting package build for {mod_name}"), now());

        let classification = classify::classify(
            generated_root,
            reference_root,
            game,
            options.threads,
            cancel,
            self.progress,
        )?;

        let mut layout = PackageLayout {
            root: package_root.clone(),
            metadata_dir: metadata_dir.clone(),
            pack_count: classification.pack.len(),
            loose_count: classification.loose.len(),
            skip_count: classification.skip.len(),
            error_count: classification.errors.len(),
            ..Default::default()
        };

        let packed_result = if !classification.pack.is_empty() {
            match self.build_packed_side(
                &classification,
                &staging_root,
                mod_name,
                game,
                &package_root,
                builder,
                options,
                cancel,
            ) {
                Ok((path, chunk_count)) => {
                    build_log.push("INFO", format!("packed archive written: {}", path.display()), now());
                    layout.chunk_count = chunk_count;
                    Some(path)
                }
                Err(e) => {
                    build_log.push("ERROR", format!("packed side failed: {e}"), now());
                    layout
                        .warnings
                        .push("packed side failed; loose delivered independently (if non-empty)".to_string());
                    None
                }
            }
        } else {
            None
        };
        layout.packed_archive = packed_result;

        if !classification.loose.is_empty() {
            match self.build_loose_side(&classification, &staging_root, mod_name, &package_root, options, cancel) {
                Ok(path) => {
                    build_log.push("INFO", format!("loose archive written: {}", path.display()), now());
                    layout.loose_archive = Some(path);
                }
                Err(e) => {
                    build_log.push("ERROR", format!("loose side failed: {e}"), now());
                    layout.warnings.push(format!("loose side failed: {e}"));
                }
            }
        }

        for fault in &classification.errors {
            build_log.push(
                "WARN",
                format!("classification error for {}: {}", fault.rel_path, fault.error),
                now(),
            );
        }

        let info = PackageInfo {
            mod_name: mod_name.to_string(),
            game: game.display_name().to_string(),
            chunk_count: layout.chunk_count,
            pack_count: layout.pack_count,
            loose_count: layout.loose_count,
            skip_count: layout.skip_count,
            error_count: layout.error_count,
            created_at: now(),
            modpacker_version: crate::VERSION.to_string(),
            warnings: layout.warnings.clone(),
        };
        metadata::write_metadata(&metadata_dir, &info, game, &build_log)?;

        if options.cleanup_staging && staging_root.exists() {
            let _ = fs::remove_dir_all(&staging_root);
        }

        Ok(layout)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_packed_side(
        &self,
        classification: &ClassificationResult,
        staging_root: &Path,
        mod_name: &str,
        game: GameKind,
        package_root: &Path,
        builder: &dyn ArchiveBuilder,
        options: &Options,
        cancel: &CancellationToken,
    ) -> Result<(PathBuf, usize)> {
        let packed_staging = staging_root.join("packed");

        let pack_set: Vec<(crate::path::RelPath, PathBuf, u64)> = classification
            .pack
            .iter()
            .map(|(rel, src)| {
                let size = fs::metadata(src).map(|m| m.len()).unwrap_or(0);
                (rel.clone(), src.clone(), size)
            })
            .collect();

        let plan = chunk::plan(&pack_set, options.chunk_size_bytes);
        let archive_dir = packed_staging.join("archives");
        let archives = chunk::execute(
            &plan,
            &packed_staging,
            mod_name,
            builder,
            game,
            &archive_dir,
            cancel,
            self.progress,
        )?;

        plugin::write_plugin_stub(self.template_source, game, mod_name, &archive_dir)?;

        let packed_output = package_root.join(format!("{mod_name}_Packed.{}", extension_for(self.compressor)));
        let members = collect_dir_members(&archive_dir)?;
        self.compressor.compress(&members, &packed_output, options.compression_level, cancel)?;
        self.progress.compressed(&packed_output);

        Ok((packed_output, archives.len()))
    }

    fn build_loose_side(
        &self,
        classification: &ClassificationResult,
        staging_root: &Path,
        mod_name: &str,
        package_root: &Path,
        options: &Options,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let loose_staging = staging_root.join("loose");
        fs::create_dir_all(&loose_staging).map_err(|e| PackagerError::io(&loose_staging, e))?;

        for (rel_path, source) in &classification.loose {
            if cancel.is_cancelled() {
                return Err(PackagerError::Cancelled {
                    completed: 0,
                    remaining: classification.loose.len(),
                });
            }
            let dest = loose_staging.join(rel_path.as_str());
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| PackagerError::io(parent, e))?;
            }
            if fs::hard_link(source, &dest).is_err() {
                fs::copy(source, &dest).map_err(|e| PackagerError::io(source, e))?;
            }
        }

        let loose_output = package_root.join(format!("{mod_name}_Loose.{}", extension_for(self.compressor)));
        let members = collect_dir_members(&loose_staging)?;
        self.compressor.compress(&members, &loose_output, options.compression_level, cancel)?;
        self.progress.compressed(&loose_output);

        Ok(loose_output)
    }
}

fn extension_for(compressor: &dyn Compressor) -> &'static str {
    match compressor.name() {
        "7z" => "7z",
        _ => "zip",
    }
}

/// Walks a staged directory into the flat `(RelPath, source)` member list a
/// [`Compressor`] expects, re-deriving `RelPath` relative to the staging
/// root itself (already game-relative by construction — no known-dirs scan
/// needed here).
fn collect_dir_members(staging_dir: &Path) -> Result<Vec<CompressMember>> {
    let mut members = Vec::new();
    for entry in WalkDir::new(staging_dir) {
        let entry = entry.map_err(|e| PackagerError::Compress(format!("walking {}: {e}", staging_dir.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(staging_dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        members.push(CompressMember {
            rel_path: crate::path::RelPath::raw(rel),
            source: entry.path().to_path_buf(),
        });
    }
    Ok(members)
}

/// Pre-flight: both roots must exist, and required free space is estimated
/// as `3 * size(generated_root)` (spec §5/§7) — one copy for staging, one
/// for the packed archive, one for the loose archive, roughly concurrently
/// on disk during a run. Fails fast with [`PackagerError::InsufficientSpace`]
/// before any staging copy begins.
///
/// The *available*-space half of the comparison is best-effort: no crate in
/// this workspace exposes a portable `statvfs`-equivalent, so
/// [`available_space`] currently always returns `None` and the check is
/// skipped rather than guessed at. That is a narrower, disclosed gap than
/// dropping the pre-flight check entirely — see DESIGN.md.
fn validate_inputs(generated_root: &Path, reference_root: &Path) -> Result<()> {
    if !generated_root.is_dir() {
        return Err(PackagerError::Path {
            input: generated_root.to_path_buf(),
            reason: "generated root does not exist or is not a directory".into(),
        });
    }
    if !reference_root.is_dir() {
        return Err(PackagerError::Path {
            input: reference_root.to_path_buf(),
            reason: "reference root does not exist or is not a directory".into(),
        });
    }

    let required = estimate_required_space(generated_root);
    if let Some(available) = available_space(generated_root) {
        if available < required {
            return Err(PackagerError::InsufficientSpace {
                required,
                available,
                path: generated_root.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// `3 * size(generated_root)`: one copy for staging, one for the packed
/// archive, one for the loose archive.
fn estimate_required_space(generated_root: &Path) -> u64 {
    WalkDir::new(generated_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum::<u64>()
        .saturating_mul(3)
}

/// Best-effort free-space query for the filesystem backing `path`. Returns
/// `None` until a portable free-space crate is added to this workspace.
fn available_space(_path: &Path) -> Option<u64> {
    None
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
