//! Content fingerprinting. Streams file contents through SHA-1 in fixed
//! blocks rather than loading whole files into memory (spec §4.3).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha1::{Digest, Sha1};

const BLOCK_SIZE: usize = 64 * 1024;

/// A stable content fingerprint. Any collision-resistant digest of at least
/// 160 bits satisfies the specification; SHA-1 is the reference choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 20]);

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Hash `path`'s contents. Fails with the file's I/O error on any read
/// failure; never partially succeeds.
pub fn hash_file(path: &Path) -> std::io::Result<Fingerprint> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; BLOCK_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let digest = hasher.finalize();
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    Ok(Fingerprint(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn identical_contents_hash_equal() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, b"the quick brown fox").unwrap();
        std::fs::write(&b, b"the quick brown fox").unwrap();
        assert_eq!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }

    #[test]
    fn different_contents_hash_differently() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, b"the quick brown fox").unwrap();
        std::fs::write(&b, b"the quick brown fo!").unwrap();
        assert_ne!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }

    #[test]
    fn hashes_files_larger_than_one_block() {
        let dir = tempfile::tempdir().unwrap();
        let big = dir.path().join("big.bin");
        let mut f = std::fs::File::create(&big).unwrap();
        let chunk = vec![0x42u8; BLOCK_SIZE];
        for _ in 0..3 {
            f.write_all(&chunk).unwrap();
        }
        f.write_all(b"trailer").unwrap();
        drop(f);

        assert!(hash_file(&big).is_ok());
    }

    #[test]
    fn missing_file_errors() {
        assert!(hash_file(Path::new("/no/such/file")).is_err());
    }

    #[test]
    fn display_is_lowercase_hex() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("f.bin");
        std::fs::write(&f, b"x").unwrap();
        let fp = hash_file(&f).unwrap();
        let s = fp.to_string();
        assert_eq!(s.len(), 40);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
