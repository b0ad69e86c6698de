//! Property-style round-trip tests for the classifier (spec "Round-trip
//! properties"), using synthetic file sets generated by `proptest`.

use std::fs;
use std::path::Path;

use modpacker::cancel::CancellationToken;
use modpacker::game::GameKind;
use modpacker::progress::NullReporter;
use proptest::prelude::*;
use tempfile::tempdir;

fn write(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn file_name_strategy() -> impl Strategy<Value = String> {
    "[a-z]{3,10}".prop_map(|s| format!("{s}.nif"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A GeneratedRoot that is an exact subset of ReferenceRoot classifies
    /// entirely as Skip.
    #[test]
    fn subset_of_reference_is_all_skip(names in prop::collection::vec(file_name_strategy(), 1..8)) {
        let reference = tempdir().unwrap();
        let generated = tempdir().unwrap();

        let mut unique: Vec<String> = names;
        unique.sort();
        unique.dedup();

        for name in &unique {
            let rel = format!("meshes/{name}");
            write(&reference.path().join(&rel), name.as_bytes());
            write(&generated.path().join(&rel), name.as_bytes());
        }

        let result = modpacker::classify::classify(
            generated.path(),
            reference.path(),
            GameKind::Skyrim,
            2,
            &CancellationToken::new(),
            &NullReporter,
        ).unwrap();

        prop_assert_eq!(result.skip.len(), unique.len());
        prop_assert!(result.pack.is_empty());
        prop_assert!(result.loose.is_empty());
        prop_assert!(result.errors.is_empty());
    }

    /// A GeneratedRoot disjoint from ReferenceRoot classifies entirely as Pack.
    #[test]
    fn disjoint_generated_root_is_all_pack(names in prop::collection::vec(file_name_strategy(), 1..8)) {
        let reference = tempdir().unwrap();
        let generated = tempdir().unwrap();

        write(&reference.path().join("meshes/unrelated_reference_only.nif"), b"ref");

        let mut unique: Vec<String> = names;
        unique.sort();
        unique.dedup();

        for name in &unique {
            write(&generated.path().join(format!("meshes/gen_{name}")), name.as_bytes());
        }

        let result = modpacker::classify::classify(
            generated.path(),
            reference.path(),
            GameKind::Fallout4,
            2,
            &CancellationToken::new(),
            &NullReporter,
        ).unwrap();

        prop_assert_eq!(result.pack.len(), unique.len());
        prop_assert!(result.loose.is_empty());
        prop_assert!(result.skip.is_empty());
    }

    /// Every file present in both roots but with flipped content classifies as Loose.
    #[test]
    fn byte_flip_is_always_loose(names in prop::collection::vec(file_name_strategy(), 1..8)) {
        let reference = tempdir().unwrap();
        let generated = tempdir().unwrap();

        let mut unique: Vec<String> = names;
        unique.sort();
        unique.dedup();

        for name in &unique {
            let rel = format!("meshes/{name}");
            write(&reference.path().join(&rel), name.as_bytes());
            let mut flipped = name.as_bytes().to_vec();
            flipped.push(b'!');
            write(&generated.path().join(&rel), &flipped);
        }

        let result = modpacker::classify::classify(
            generated.path(),
            reference.path(),
            GameKind::Skyrim,
            2,
            &CancellationToken::new(),
            &NullReporter,
        ).unwrap();

        prop_assert_eq!(result.loose.len(), unique.len());
        prop_assert!(result.pack.is_empty());
        prop_assert!(result.skip.is_empty());
    }
}
