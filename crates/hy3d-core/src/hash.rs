//! Content-based hashing for filenames and downloaded assets

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// A SHA-256 content hash.
///
/// Used for the short prompt hash in generated filenames and to fingerprint
/// downloaded models.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Compute a hash from bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Compute a hash from a string
    pub fn from_str(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }

    /// Compute a hash from a file's contents, streaming it in chunks
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hasher.finalize().into()))
    }

    /// Get the hash as a hex string
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// First `len` hex characters of the hash
    pub fn short_hex(&self, len: usize) -> String {
        let hex = self.to_hex();
        hex[..len.min(hex.len())].to_string()
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistent_hashing() {
        assert_eq!(ContentHash::from_str("robot"), ContentHash::from_str("robot"));
        assert_ne!(ContentHash::from_str("robot"), ContentHash::from_str("robots"));
    }

    #[test]
    fn test_known_digest() {
        // sha256("abc")
        assert_eq!(
            ContentHash::from_str("abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_short_hex() {
        let h = ContentHash::from_str("abc");
        assert_eq!(h.short_hex(8), "ba7816bf");
        assert_eq!(h.short_hex(100).len(), 64);
    }

    #[test]
    fn test_from_file_matches_from_bytes() {
        let path = std::env::temp_dir().join(format!("hy3d_hash_test_{}", std::process::id()));
        let data = vec![7u8; 200_000];
        std::fs::write(&path, &data).unwrap();
        assert_eq!(ContentHash::from_file(&path).unwrap(), ContentHash::from_bytes(&data));
        std::fs::remove_file(&path).ok();
    }
}
