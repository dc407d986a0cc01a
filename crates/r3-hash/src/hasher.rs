use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::hex::hex_to_string;
use crate::HashError;

/// Bytes read per chunk when streaming a file through the hasher.
const CHUNK_SIZE: usize = 64 * 1024;

/// Streaming SHA-256 computation.
///
/// Data can be fed incrementally with [`update`](Hasher::update) or through
/// the [`std::io::Write`] implementation, then finalised into a lowercase
/// hex digest.
pub struct Hasher {
    inner: Sha256,
}

impl Hasher {
    /// Create a new hasher.
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    /// Feed data into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize and return the lowercase hex digest.
    pub fn finalize(self) -> String {
        let result = self.inner.finalize();
        hex_to_string(&result)
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::io::Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Hash a file's contents, streaming it through SHA-256 in fixed-size chunks.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String, HashError> {
    let mut file = File::open(path.as_ref()).map_err(HashError::Io)?;
    let mut hasher = Hasher::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf).map_err(HashError::Io)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hasher.finalize())
}

/// Hash a string's UTF-8 encoding.
pub fn hash_str(s: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(s.as_bytes());
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn hash_str_known_vector() {
        // sha256("")
        assert_eq!(
            hash_str(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hash_str_matches_hasher_write() {
        let mut h = Hasher::new();
        write!(h, "hello world").unwrap();
        assert_eq!(h.finalize(), hash_str("hello world"));
    }

    #[test]
    fn hash_file_matches_hash_str() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "print('hi')\n").unwrap();
        assert_eq!(hash_file(&path).unwrap(), hash_str("print('hi')\n"));
    }

    #[test]
    fn hash_file_spans_multiple_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data = vec![0x42u8; CHUNK_SIZE * 3 + 17];
        std::fs::write(&path, &data).unwrap();
        let mut expected = Hasher::new();
        expected.update(&data);
        assert_eq!(hash_file(&path).unwrap(), expected.finalize());
    }
}
