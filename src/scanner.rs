//! Produces the known-dirs set [`crate::path::normalize`] and the
//! [`crate::classify::Classifier`] use to recognize game data directories.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::game::GameKind;

/// The known-directory set for one (reference root, game) pair.
#[derive(Debug, Clone)]
pub struct KnownDirs {
    /// Lowercase names of immediate children of the reference root that are directories.
    pub detected: BTreeSet<String>,
    /// Compiled-in fallback set for the game.
    pub fallback: BTreeSet<String>,
    /// `detected ∪ fallback`.
    pub combined: BTreeSet<String>,
}

type CacheKey = (PathBuf, GameKind);

fn cache() -> &'static Mutex<std::collections::HashMap<CacheKey, KnownDirs>> {
    static CACHE: OnceLock<Mutex<std::collections::HashMap<CacheKey, KnownDirs>>> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

/// Scans `reference_root`'s immediate children and merges them with
/// `game`'s compiled-in fallback set. Cached by `(reference_root, game)` —
/// construction never invokes anything that itself depends on the cache
/// (spec §9: this is the one-shot invariant the source's profile-loading
/// recursion bug stands in for).
///
/// Never fails: a missing or unreadable reference root simply yields an
/// empty `detected` set, leaving `combined == fallback`.
pub fn scan(reference_root: &Path, game: GameKind) -> KnownDirs {
    let key = (reference_root.to_path_buf(), game);

    if let Some(hit) = cache().lock().unwrap().get(&key) {
        return hit.clone();
    }

    let detected = detect_children(reference_root);
    let fallback = game.fallback_dirs();
    let combined = detected.union(&fallback).cloned().collect();

    let known = KnownDirs {
        detected,
        fallback,
        combined,
    };

    cache().lock().unwrap().insert(key, known.clone());
    known
}

fn detect_children(reference_root: &Path) -> BTreeSet<String> {
    let Ok(entries) = std::fs::read_dir(reference_root) else {
        return BTreeSet::new();
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_yields_fallback_only() {
        let known = scan(Path::new("/does/not/exist/at/all"), GameKind::Fallout4);
        assert!(known.detected.is_empty());
        assert_eq!(known.combined, known.fallback);
        assert!(known.combined.contains("meshes"));
    }

    #[test]
    fn fallback_nonempty_for_every_game() {
        assert!(!GameKind::Skyrim.fallback_dirs().is_empty());
        assert!(!GameKind::Fallout4.fallback_dirs().is_empty());
    }

    #[test]
    fn detects_real_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("CustomStuff")).unwrap();
        std::fs::write(dir.path().join("not_a_dir.txt"), b"x").unwrap();

        let known = scan(dir.path(), GameKind::Skyrim);
        assert!(known.detected.contains("customstuff"));
        assert!(known.combined.contains("customstuff"));
        assert!(known.combined.contains("meshes"));
    }
}
