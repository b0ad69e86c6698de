//! Loose-file compression: packages the loose set into a single archive
//! for convenient distribution alongside the packed BSA/BA2s. Unlike
//! [`crate::archive`], this path never has to match the engine's native
//! format, so it is pure-Rust rather than an external-tool invocation.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::cancel::CancellationToken;
use crate::error::{PackagerError, Result};
use crate::path::RelPath;

/// One file destined for a compressed archive: its archive-relative path
/// and its on-disk source.
#[derive(Debug, Clone)]
pub struct CompressMember {
    pub rel_path: RelPath,
    pub source: PathBuf,
}

/// Compression level, 0 (store, no compression) through 9 (maximum).
/// Clamped by each implementation to whatever range its backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompressionLevel(pub u8);

impl CompressionLevel {
    pub const STORE: CompressionLevel = CompressionLevel(0);
    pub const MAX: CompressionLevel = CompressionLevel(9);

    fn clamped(self) -> u8 {
        self.0.min(9)
    }
}

/// A pure-Rust compression backend producing one archive from a member list.
pub trait Compressor: Send + Sync {
    fn name(&self) -> &str;
    fn compress(
        &self,
        members: &[CompressMember],
        output_path: &Path,
        level: CompressionLevel,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Standard zip archive, store-through-deflate.
pub struct ZipCompressor;

impl Compressor for ZipCompressor {
    fn name(&self) -> &str {
        "zip"
    }

    fn compress(
        &self,
        members: &[CompressMember],
        output_path: &Path,
        level: CompressionLevel,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PackagerError::io(parent, e))?;
        }

        let file = File::create(output_path).map_err(|e| PackagerError::io(output_path, e))?;
        let mut writer = zip::ZipWriter::new(BufWriter::new(file));

        let method = if level.clamped() == 0 {
            zip::CompressionMethod::Stored
        } else {
            zip::CompressionMethod::Deflated
        };
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(method)
            .compression_level(Some(level.clamped() as i64));

        for (idx, member) in members.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PackagerError::Cancelled {
                    completed: idx,
                    remaining: members.len() - idx,
                });
            }

            writer
                .start_file(member.rel_path.as_str(), options)
                .map_err(|e| PackagerError::Compress(format!("start_file {}: {e}", member.rel_path)))?;
            let mut src = File::open(&member.source).map_err(|e| PackagerError::io(&member.source, e))?;
            std::io::copy(&mut src, &mut writer)
                .map_err(|e| PackagerError::Compress(format!("writing {}: {e}", member.rel_path)))?;
        }

        writer
            .finish()
            .map_err(|e| PackagerError::Compress(format!("finalizing {}: {e}", output_path.display())))?
            .flush()
            .map_err(|e| PackagerError::io(output_path, e))?;

        Ok(())
    }
}

/// 7-Zip archive via the pure-Rust `sevenz-rust` backend. Used when callers
/// want smaller archives at the cost of slower compression.
pub struct SevenZCompressor;

impl Compressor for SevenZCompressor {
    fn name(&self) -> &str {
        "7z"
    }

    fn compress(
        &self,
        members: &[CompressMember],
        output_path: &Path,
        _level: CompressionLevel,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PackagerError::io(parent, e))?;
        }

        let mut writer = sevenz_rust::SevenZWriter::create(output_path)
            .map_err(|e| PackagerError::Compress(format!("creating {}: {e}", output_path.display())))?;

        for (idx, member) in members.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PackagerError::Cancelled {
                    completed: idx,
                    remaining: members.len() - idx,
                });
            }

            writer
                .push_archive_entry(
                    sevenz_rust::SevenZArchiveEntry::from_path(&member.source, member.rel_path.as_str().to_string()),
                    Some(File::open(&member.source).map_err(|e| PackagerError::io(&member.source, e))?),
                )
                .map_err(|e| PackagerError::Compress(format!("adding {}: {e}", member.rel_path)))?;
        }

        writer
            .finish()
            .map_err(|e| PackagerError::Compress(format!("finalizing {}: {e}", output_path.display())))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::KnownDirs;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn rel(s: &str) -> RelPath {
        let known = KnownDirs {
            detected: BTreeSet::new(),
            fallback: ["meshes".to_string()].into_iter().collect(),
            combined: ["meshes".to_string()].into_iter().collect(),
        };
        crate::path::normalize(Path::new(s), &known).unwrap()
    }

    #[test]
    fn zip_round_trips_member_bytes() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("body.nif");
        std::fs::write(&src, b"triangle soup").unwrap();

        let members = vec![CompressMember {
            rel_path: rel("meshes/body.nif"),
            source: src,
        }];

        let out = dir.path().join("loose.zip");
        ZipCompressor
            .compress(&members, &out, CompressionLevel::MAX, &CancellationToken::new())
            .unwrap();

        let file = File::open(&out).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "meshes/body.nif");
        let mut contents = String::new();
        std::io::Read::read_to_string(&mut entry, &mut contents).unwrap();
        assert_eq!(contents, "triangle soup");
    }

    #[test]
    fn store_level_uses_stored_method() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("x.txt");
        std::fs::write(&src, b"abc").unwrap();
        let members = vec![CompressMember {
            rel_path: rel("meshes/x.txt"),
            source: src,
        }];
        let out = dir.path().join("out.zip");
        ZipCompressor
            .compress(&members, &out, CompressionLevel::STORE, &CancellationToken::new())
            .unwrap();
        assert!(out.exists());
    }

    #[test]
    fn cancellation_stops_before_remaining_members_are_written() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("x.txt");
        std::fs::write(&src, b"abc").unwrap();
        let members = vec![CompressMember {
            rel_path: rel("meshes/x.txt"),
            source: src,
        }];
        let out = dir.path().join("cancelled.zip");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = ZipCompressor.compress(&members, &out, CompressionLevel::MAX, &cancel);
        assert!(matches!(result, Err(PackagerError::Cancelled { completed: 0, remaining: 1 })));
    }
}
