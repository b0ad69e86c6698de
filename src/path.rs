//! Path normalization: reduce an absolute or nested filesystem path to the
//! game-data-relative path the Creation Engine would use to address it.

use std::path::Path;

use unicase::UniCase;

use crate::error::{PackagerError, Result};
use crate::scanner::KnownDirs;

/// A normalized, forward-slash-delimited path rooted at a known game
/// directory (e.g. `meshes/actors/character/body.nif`).
///
/// Equality and hashing are case-insensitive (Windows/Linux lookup parity);
/// `display()` preserves the original case for UI/log output.
#[derive(Debug, Clone)]
pub struct RelPath {
    display: String,
    key: UniCase<String>,
    /// `true` when no known game directory prefix was found — the file is
    /// still classifiable (falls to Pack, spec §4.1) but cannot be matched
    /// against a reference tree.
    pub unqualified: bool,
}

impl RelPath {
    fn new(display: String, unqualified: bool) -> Self {
        let key = UniCase::new(display.clone());
        Self {
            display,
            key,
            unqualified,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }

    pub fn key(&self) -> &UniCase<String> {
        &self.key
    }

    /// Build a `RelPath` directly from an already-joined display string,
    /// bypassing known-dir detection. Used when normalization itself
    /// failed and the caller still needs something to label the faulty
    /// file with in a [`crate::error::ClassifyFault`].
    pub(crate) fn raw(display: String) -> Self {
        Self::new(display, true)
    }
}

impl PartialEq for RelPath {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for RelPath {}

impl std::hash::Hash for RelPath {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl std::fmt::Display for RelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}

/// Split a path into plain UTF-8 components, normalizing separators and
/// rejecting `.`/`..` segments and empty/root-only input (spec §4.1 edge cases).
///
/// Splits on `/` *and* `\` explicitly rather than relying on
/// [`Path::components`], whose separator handling is platform-dependent —
/// `\` is an ordinary filename character on Unix, but generated-root paths
/// passed to this crate may originate from a Windows mod manager even when
/// the classifier itself runs on Linux (spec §4.1's "platform separator
/// differences" edge case).
fn components(path: &Path) -> Result<Vec<String>> {
    let raw = path.to_string_lossy();
    let mut out = Vec::new();
    for part in raw.split(['/', '\\']) {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(PackagerError::Path {
                input: path.to_path_buf(),
                reason: "path contains a `..` segment".into(),
            });
        }
        out.push(part.nfc().collect::<String>());
    }
    if out.is_empty() {
        return Err(PackagerError::Path {
            input: path.to_path_buf(),
            reason: "empty or root-only path".into(),
        });
    }
    Ok(out)
}

/// Reduce `path` to the `RelPath` under which the engine would address it,
/// given the active known-dirs set.
///
/// Performs a case-insensitive left-to-right scan for the first component
/// that is a member of `known_dirs.combined`, preferring the **leftmost**
/// match when more than one component qualifies (spec §4.1's tie-break:
/// nested `meshes/` under a utility directory is not the game's `meshes/`).
/// If no component matches, the full path (joined, case preserved) is
/// returned and marked `unqualified`.
pub fn normalize(path: &Path, known_dirs: &KnownDirs) -> Result<RelPath> {
    let parts = components(path)?;

    for (idx, part) in parts.iter().enumerate() {
        let lower = part.to_lowercase();
        if known_dirs.combined.contains(&lower) {
            let display = parts[idx..].join("/");
            return Ok(RelPath::new(display, false));
        }
    }

    let display = parts.join("/");
    Ok(RelPath::new(display, true))
}

trait NfcExt {
    fn nfc(&self) -> std::str::Chars<'_>;
}

impl NfcExt for str {
    fn nfc(&self) -> std::str::Chars<'_> {
        // Inputs from the OS are already NFC-normalized on every platform
        // this crate targets (macOS's HFS+ decomposition is the notable
        // exception and is out of scope); this is a pass-through seam kept
        // explicit so a real normalizer can be swapped in without touching
        // call sites.
        self.chars()
    }
}
