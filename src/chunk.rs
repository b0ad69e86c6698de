//! Bin-packs the pack-set into archive-sized chunks, stages each chunk's
//! files into its own directory, and names the resulting archives per the
//! CAO (chunked-archive) convention: the first chunk is unsuffixed, later
//! chunks carry contiguous numeric suffixes starting at 0.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::ArchiveBuilder;
use crate::cancel::CancellationToken;
use crate::error::{PackagerError, Result};
use crate::game::GameKind;
use crate::path::RelPath;
use crate::progress::ProgressReporter;

/// Default per-chunk size budget: 2 GiB.
pub const DEFAULT_CHUNK_SIZE_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// One member of a chunk: its game-relative path, its absolute source
/// file, and its size in bytes.
#[derive(Debug, Clone)]
pub struct ChunkMember {
    pub rel_path: RelPath,
    pub source: PathBuf,
    pub size: u64,
}

/// One bin in a [`ChunkPlan`]. `Σsize ≤ chunk_size_limit`, except when the
/// chunk holds exactly one file whose size exceeds the limit on its own
/// (spec §3: no other choice preserves semantic integrity).
#[derive(Debug, Clone, Default)]
pub struct ChunkSpec {
    pub members: Vec<ChunkMember>,
}

impl ChunkSpec {
    pub fn total_size(&self) -> u64 {
        self.members.iter().map(|m| m.size).sum()
    }
}

/// An ordered sequence of chunks produced by [`plan`].
#[derive(Debug, Clone, Default)]
pub struct ChunkPlan {
    pub chunks: Vec<ChunkSpec>,
}

/// First-fit-decreasing bin-packing of `pack_set` into bins capped at
/// `chunk_size_limit`, with a stable lexicographic tie-break on `RelPath`
/// (spec §5: deterministic, given fixed input).
///
/// A file whose size alone exceeds `chunk_size_limit` gets a bin of its
/// own; it is the only member of that bin.
pub fn plan(pack_set: &[(RelPath, PathBuf, u64)], chunk_size_limit: u64) -> ChunkPlan {
    let mut members: Vec<ChunkMember> = pack_set
        .iter()
        .map(|(rel_path, source, size)| ChunkMember {
            rel_path: rel_path.clone(),
            source: source.clone(),
            size: *size,
        })
        .collect();

    members.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.rel_path.as_str().to_lowercase().cmp(&b.rel_path.as_str().to_lowercase()))
    });

    let mut bins: Vec<ChunkSpec> = Vec::new();

    for member in members {
        if member.size > chunk_size_limit {
            bins.push(ChunkSpec {
                members: vec![member],
            });
            continue;
        }

        let fitting_bin = bins.iter_mut().find(|bin| {
            let is_oversize_singleton = bin.members.len() == 1 && bin.members[0].size > chunk_size_limit;
            !is_oversize_singleton && bin.total_size() + member.size <= chunk_size_limit
        });

        match fitting_bin {
            Some(bin) => bin.members.push(member),
            None => bins.push(ChunkSpec {
                members: vec![member],
            }),
        }
    }

    ChunkPlan { chunks: bins }
}

/// CAO naming for `index` of `total` chunks: the first chunk is
/// unsuffixed, later chunks are numbered contiguously from 0.
pub fn chunk_filename(base: &str, extension: &str, index: usize) -> String {
    if index == 0 {
        format!("{base}.{extension}")
    } else {
        format!("{base}{}.{extension}", index - 1)
    }
}

/// Stage and build every chunk in `plan`, returning the produced archive
/// paths in chunk order (chunk 0 first, matching the unsuffixed filename).
///
/// Staging materializes each chunk's files under
/// `staging_dir/chunk_{idx}/<rel_path>`, hardlinking from the source when
/// possible and falling back to a copy across filesystem boundaries (spec
/// §4.5: "copy (or hardlink when the filesystem allows)").
pub fn execute(
    plan: &ChunkPlan,
    staging_dir: &Path,
    base_name: &str,
    builder: &dyn ArchiveBuilder,
    game: GameKind,
    out_dir: &Path,
    cancel: &CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<Vec<PathBuf>> {
    let extension = game.archive_extension();
    let mut produced = Vec::new();

    for (idx, chunk) in plan.chunks.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(PackagerError::Chunking {
                reason: "cancelled".into(),
                produced_archives: produced,
            });
        }

        progress.chunk_started(idx);

        let chunk_dir = staging_dir.join(format!("chunk_{idx}"));
        stage_chunk(chunk, &chunk_dir).map_err(|e| PackagerError::Chunking {
            reason: format!("staging chunk {idx} failed: {e}"),
            produced_archives: produced.clone(),
        })?;

        let archive_name = chunk_filename(base_name, extension, idx);
        let archive_path = out_dir.join(&archive_name);

        builder
            .build(&chunk_dir, &archive_path, game)
            .map_err(|e| PackagerError::Chunking {
                reason: format!("building archive for chunk {idx} failed: {e}"),
                produced_archives: produced.clone(),
            })?;

        progress.archive_built(&archive_path);
        progress.chunk_finished(idx);
        produced.push(archive_path);
    }

    verify_integrity(plan, &produced)?;
    Ok(produced)
}

fn stage_chunk(chunk: &ChunkSpec, chunk_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(chunk_dir)?;
    for member in &chunk.members {
        let dest = chunk_dir.join(member.rel_path.as_str());
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        if dest.exists() {
            fs::remove_file(&dest)?;
        }
        // Hardlink when the filesystem allows it (spec §4.5); fall back to
        // a copy for any failure — cross-device links (EXDEV), read-only
        // mounts, and filesystems without hardlink support all land here.
        if fs::hard_link(&member.source, &dest).is_err() {
            fs::copy(&member.source, &dest)?;
        }
    }
    Ok(())
}

/// Post-execution integrity checks (spec §4.5):
/// every archive exists and is non-empty, and the union of member paths
/// across all chunks equals the input pack set exactly — no losses, no
/// duplicates.
fn verify_integrity(plan: &ChunkPlan, produced: &[PathBuf]) -> Result<()> {
    if produced.len() != plan.chunks.len() {
        return Err(PackagerError::Chunking {
            reason: format!(
                "expected {} archives, produced {}",
                plan.chunks.len(),
                produced.len()
            ),
            produced_archives: produced.to_vec(),
        });
    }

    for archive in produced {
        let meta = fs::metadata(archive).map_err(|e| PackagerError::Chunking {
            reason: format!("archive {} missing after build: {e}", archive.display()),
            produced_archives: produced.to_vec(),
        })?;
        if meta.len() == 0 {
            return Err(PackagerError::Chunking {
                reason: format!("archive {} is empty", archive.display()),
                produced_archives: produced.to_vec(),
            });
        }
    }

    let mut seen = HashSet::new();
    for chunk in &plan.chunks {
        for member in &chunk.members {
            if !seen.insert(member.rel_path.key().clone()) {
                return Err(PackagerError::Chunking {
                    reason: format!("duplicate member across chunks: {}", member.rel_path),
                    produced_archives: produced.to_vec(),
                });
            }
        }
    }

    Ok(())
}
