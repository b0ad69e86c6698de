//! Walks a generated asset tree and decides, file by file, whether each
//! entry is new content safe to archive (`Pack`), modified content that
//! must stay loose to preserve override semantics (`Loose`), or
//! byte-identical to the reference tree (`Skip`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use unicase::UniCase;
use walkdir::WalkDir;

use crate::cancel::CancellationToken;
use crate::error::{ClassifyError, ClassifyFault, PackagerError, Result};
use crate::game::GameKind;
use crate::hash;
use crate::path::{self, RelPath};
use crate::progress::ProgressReporter;
use crate::scanner;

/// The decision made for one generated file.
#[derive(Debug, Clone)]
pub enum Classification {
    /// No reference file at this path — safe to put in an archive.
    Pack,
    /// A reference file exists at this path with different content — must
    /// remain loose so it overrides the reference/archived copy.
    Loose,
    /// A reference file exists at this path with identical content —
    /// nothing new to ship.
    Skip,
    /// Could not be classified; not recorded in pack/loose/skip.
    Error(ClassifyError),
}

/// One classified input file.
#[derive(Debug, Clone)]
pub struct ClassifiedFile {
    pub rel_path: RelPath,
    pub source: PathBuf,
    pub classification: Classification,
}

/// The partition of every file under a generated root into pack/loose/skip,
/// plus any per-file faults. `pack.len() + loose.len() + skip.len() +
/// errors.len()` equals the number of files enumerated under the generated
/// root (spec invariant 1).
#[derive(Debug, Default, Clone)]
pub struct ClassificationResult {
    pub pack: Vec<(RelPath, PathBuf)>,
    pub loose: Vec<(RelPath, PathBuf)>,
    pub skip: Vec<(RelPath, PathBuf)>,
    pub errors: Vec<ClassifyFault>,
}

impl ClassificationResult {
    pub fn total(&self) -> usize {
        self.pack.len() + self.loose.len() + self.skip.len() + self.errors.len()
    }
}

/// Classify every regular file under `generated_root` against
/// `reference_root` for `game`, fanning work out across `threads` workers.
///
/// Aborts with [`PackagerError::FatalClassifier`] only if `generated_root`
/// itself cannot be enumerated; individual file faults are accumulated in
/// the returned result instead. Checks `cancel` between files and returns
/// [`PackagerError::Cancelled`] with a partial count if it fires.
pub fn classify(
    generated_root: &Path,
    reference_root: &Path,
    game: GameKind,
    threads: usize,
    cancel: &CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<ClassificationResult> {
    let known_dirs = scanner::scan(reference_root, game);
    let reference_index = build_reference_index(reference_root);
    let files = enumerate_generated(generated_root)?;

    progress.enumerated(files.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .map_err(|e| PackagerError::FatalClassifier {
            reason: format!("failed to start worker pool: {e}"),
        })?;

    let completed = AtomicUsize::new(0);
    let outcomes: Vec<Option<ClassifiedFile>> = pool.install(|| {
        files
            .par_iter()
            .map(|abs_path| {
                if cancel.is_cancelled() {
                    return None;
                }
                let outcome = classify_one(abs_path, generated_root, &known_dirs, &reference_index);
                let n = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress.classified(n);
                Some(outcome)
            })
            .collect()
    });

    if cancel.is_cancelled() {
        let done = completed.load(Ordering::SeqCst);
        return Err(PackagerError::Cancelled {
            completed: done,
            remaining: files.len().saturating_sub(done),
        });
    }

    let mut result = ClassificationResult::default();
    for file in outcomes.into_iter().flatten() {
        match file.classification {
            Classification::Pack => result.pack.push((file.rel_path, file.source)),
            Classification::Loose => result.loose.push((file.rel_path, file.source)),
            Classification::Skip => result.skip.push((file.rel_path, file.source)),
            Classification::Error(err) => result.errors.push(ClassifyFault {
                rel_path: file.rel_path,
                error: err,
            }),
        }
    }
    Ok(result)
}

fn classify_one(
    abs_path: &Path,
    generated_root: &Path,
    known_dirs: &scanner::KnownDirs,
    reference_index: &HashMap<UniCase<String>, PathBuf>,
) -> ClassifiedFile {
    let rel_from_root = abs_path.strip_prefix(generated_root).unwrap_or(abs_path);

    let rel_path = match path::normalize(rel_from_root, known_dirs) {
        Ok(rel) => rel,
        Err(err) => {
            return ClassifiedFile {
                rel_path: RelPath::raw(rel_from_root.to_string_lossy().replace('\\', "/")),
                source: abs_path.to_path_buf(),
                classification: Classification::Error(ClassifyError::Path(err.to_string())),
            };
        }
    };

    let Some(reference_path) = reference_index.get(rel_path.key()) else {
        return ClassifiedFile {
            rel_path,
            source: abs_path.to_path_buf(),
            classification: Classification::Pack,
        };
    };

    let classification = match (hash::hash_file(abs_path), hash::hash_file(reference_path)) {
        (Ok(generated), Ok(reference)) if generated == reference => Classification::Skip,
        (Ok(_), Ok(_)) => Classification::Loose,
        (Err(e), _) => Classification::Error(ClassifyError::Hash(format!("{}: {e}", abs_path.display()))),
        (_, Err(e)) => Classification::Error(ClassifyError::Hash(format!("{}: {e}", reference_path.display()))),
    };

    ClassifiedFile {
        rel_path,
        source: abs_path.to_path_buf(),
        classification,
    }
}

/// Builds a lowercase-keyed index of every file under `reference_root`.
/// Never fails — an unreadable or absent reference root simply yields an
/// empty index, so every generated file ends up `Pack` (matching the
/// disjoint-generated-root round-trip property).
fn build_reference_index(reference_root: &Path) -> HashMap<UniCase<String>, PathBuf> {
    let mut index = HashMap::new();
    for entry in WalkDir::new(reference_root)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(reference_root) {
            let key = rel.to_string_lossy().replace('\\', "/");
            index.insert(UniCase::new(key), entry.path().to_path_buf());
        }
    }
    index
}

fn enumerate_generated(generated_root: &Path) -> Result<Vec<PathBuf>> {
    if !generated_root.is_dir() {
        return Err(PackagerError::FatalClassifier {
            reason: format!("generated root is not a directory: {}", generated_root.display()),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(generated_root) {
        let entry = entry.map_err(|e| PackagerError::FatalClassifier {
            reason: format!("enumeration failed: {e}"),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullReporter;
    use std::fs;

    fn write(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn partitions_every_file_exactly_once() {
        let reference = tempfile::tempdir().unwrap();
        let generated = tempfile::tempdir().unwrap();

        write(&reference.path().join("meshes/actors/character/body.nif"), b"X");
        write(&reference.path().join("textures/armor/a.dds"), b"Y");

        write(&generated.path().join("meshes/actors/character/body.nif"), b"X");
        write(&generated.path().join("meshes/armor/new.nif"), b"Z");
        write(&generated.path().join("textures/armor/a.dds"), b"Y-prime");
        write(&generated.path().join("notes.txt"), b"hi");

        let result = classify(
            generated.path(),
            reference.path(),
            GameKind::Skyrim,
            2,
            &CancellationToken::new(),
            &NullReporter,
        )
        .unwrap();

        assert_eq!(result.total(), 4);
        assert_eq!(result.skip.len(), 1);
        assert_eq!(result.loose.len(), 1);
        assert_eq!(result.pack.len(), 2); // new.nif + unqualified notes.txt
        assert!(result.errors.is_empty());
    }

    #[test]
    fn disjoint_generated_root_is_all_pack() {
        let reference = tempfile::tempdir().unwrap();
        let generated = tempfile::tempdir().unwrap();
        write(&reference.path().join("meshes/a.nif"), b"A");
        write(&generated.path().join("meshes/b.nif"), b"B");

        let result = classify(
            generated.path(),
            reference.path(),
            GameKind::Fallout4,
            1,
            &CancellationToken::new(),
            &NullReporter,
        )
        .unwrap();

        assert_eq!(result.pack.len(), 1);
        assert!(result.loose.is_empty());
        assert!(result.skip.is_empty());
    }

    #[test]
    fn subset_of_reference_is_all_skip() {
        let reference = tempfile::tempdir().unwrap();
        let generated = tempfile::tempdir().unwrap();
        write(&reference.path().join("meshes/a.nif"), b"A");
        write(&reference.path().join("meshes/b.nif"), b"B");
        write(&generated.path().join("meshes/a.nif"), b"A");

        let result = classify(
            generated.path(),
            reference.path(),
            GameKind::Fallout4,
            1,
            &CancellationToken::new(),
            &NullReporter,
        )
        .unwrap();

        assert_eq!(result.skip.len(), 1);
        assert!(result.pack.is_empty());
        assert!(result.loose.is_empty());
    }

    #[test]
    fn every_byte_flip_is_loose() {
        let reference = tempfile::tempdir().unwrap();
        let generated = tempfile::tempdir().unwrap();
        for name in ["meshes/a.nif", "textures/b.dds", "sounds/c.wav"] {
            write(&reference.path().join(name), b"original-bytes");
            write(&generated.path().join(name), b"original-Bytes"); // one-byte flip
        }

        let result = classify(
            generated.path(),
            reference.path(),
            GameKind::Skyrim,
            4,
            &CancellationToken::new(),
            &NullReporter,
        )
        .unwrap();

        assert_eq!(result.loose.len(), 3);
        assert!(result.pack.is_empty());
        assert!(result.skip.is_empty());
    }

    #[test]
    fn fatal_error_on_missing_generated_root() {
        let reference = tempfile::tempdir().unwrap();
        let err = classify(
            Path::new("/no/such/generated/root"),
            reference.path(),
            GameKind::Skyrim,
            1,
            &CancellationToken::new(),
            &NullReporter,
        )
        .unwrap_err();
        assert!(matches!(err, PackagerError::FatalClassifier { .. }));
    }

    #[test]
    fn cancellation_yields_partial_count() {
        let reference = tempfile::tempdir().unwrap();
        let generated = tempfile::tempdir().unwrap();
        for i in 0..50 {
            write(&generated.path().join(format!("meshes/f{i}.nif")), b"x");
        }

        let cancel = CancellationToken::new();
        cancel.cancel(); // cancel before starting: every file should be skipped

        let err = classify(
            generated.path(),
            reference.path(),
            GameKind::Skyrim,
            2,
            &cancel,
            &NullReporter,
        )
        .unwrap_err();

        match err {
            PackagerError::Cancelled { completed, remaining } => {
                assert_eq!(completed + remaining, 50);
            }
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }

    #[test]
    fn reference_root_is_never_written_to() {
        let reference = tempfile::tempdir().unwrap();
        let generated = tempfile::tempdir().unwrap();
        let ref_file = reference.path().join("meshes/a.nif");
        write(&ref_file, b"A");
        write(&generated.path().join("meshes/a.nif"), b"A-modified");

        let before = fs::metadata(&ref_file).unwrap();
        classify(
            generated.path(),
            reference.path(),
            GameKind::Skyrim,
            1,
            &CancellationToken::new(),
            &NullReporter,
        )
        .unwrap();
        let after = fs::metadata(&ref_file).unwrap();

        assert_eq!(before.len(), after.len());
        assert_eq!(fs::read(&ref_file).unwrap(), b"A");
    }
}
