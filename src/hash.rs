// src/hash.rs

//! Hashing for archive verification and cache keys
//!
//! - **SHA-256**: recipe checksums and build cache keys
//! - **XXH128**: fast non-cryptographic recipe checksums (`xxh128:<hex>`)

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;
use xxhash_rust::xxh3::Xxh3;

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Xxh128,
}

impl HashAlgorithm {
    /// Length of the hex digest
    pub const fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Xxh128 => 32,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Xxh128 => "xxh128",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "xxh128" | "xxh3" => Ok(Self::Xxh128),
            _ => Err(Error::ParseError(format!(
                "Unsupported checksum algorithm: {} (supported: sha256, xxh128)",
                s
            ))),
        }
    }
}

/// A prefixed checksum such as `sha256:abc...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: HashAlgorithm,
    pub value: String,
}

impl Checksum {
    pub fn parse(s: &str) -> Result<Self> {
        let (algo, value) = s
            .split_once(':')
            .ok_or_else(|| Error::ParseError(format!("Invalid checksum format: {}", s)))?;
        let algorithm: HashAlgorithm = algo.parse()?;

        if value.len() != algorithm.hex_len() || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::ParseError(format!(
                "Invalid {} digest: {}",
                algorithm, value
            )));
        }

        Ok(Self {
            algorithm,
            value: value.to_ascii_lowercase(),
        })
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}

enum State {
    Sha256(Sha256),
    Xxh128(Box<Xxh3>),
}

/// Incremental hasher over either algorithm
pub struct Hasher {
    state: State,
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha256 => State::Sha256(Sha256::new()),
            HashAlgorithm::Xxh128 => State::Xxh128(Box::new(Xxh3::new())),
        };
        Self { state }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            State::Sha256(h) => h.update(data),
            State::Xxh128(h) => h.update(data),
        }
    }

    /// Finish and return the lowercase hex digest
    pub fn finalize(self) -> String {
        match self.state {
            State::Sha256(h) => format!("{:x}", h.finalize()),
            State::Xxh128(h) => format!("{:032x}", h.digest128()),
        }
    }
}

/// Hex digest of a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> String {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Hex digest of everything a reader yields
pub fn hash_reader<R: Read>(algorithm: HashAlgorithm, reader: &mut R) -> io::Result<String> {
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// Stream a file and compare it against a checksum
pub fn verify_file(path: &Path, expected: &Checksum) -> Result<()> {
    let mut file = File::open(path)?;
    let actual = hash_reader(expected.algorithm, &mut file)?;

    if actual == expected.value {
        Ok(())
    } else {
        Err(Error::VerificationFailed(format!(
            "{}: {} mismatch, expected {}, got {}",
            path.display(),
            expected.algorithm,
            expected.value,
            actual
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            hash_bytes(HashAlgorithm::Sha256, b"Hello, World!"),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn test_xxh128_length() {
        assert_eq!(hash_bytes(HashAlgorithm::Xxh128, b"sfml").len(), 32);
    }

    #[test]
    fn test_checksum_parse() {
        let sum = Checksum::parse(
            "sha256:DFFD6021BB2BD5B0AF676290809EC3A53191DD81C7F70A4B28688A362182986F",
        )
        .unwrap();
        assert_eq!(sum.algorithm, HashAlgorithm::Sha256);
        assert!(sum.value.starts_with("dffd"));

        assert!(Checksum::parse("abc").is_err());
        assert!(Checksum::parse("md5:abc").is_err());
        assert!(Checksum::parse("sha256:zz").is_err());
    }

    #[test]
    fn test_verify_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Hello, World!").unwrap();

        let good = Checksum::parse(
            "sha256:dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f",
        )
        .unwrap();
        assert!(verify_file(file.path(), &good).is_ok());

        let bad = Checksum {
            algorithm: HashAlgorithm::Sha256,
            value: "0".repeat(64),
        };
        assert!(matches!(
            verify_file(file.path(), &bad),
            Err(Error::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_verify_file_with_xxh128_checksum() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"sfml").unwrap();

        let digest = hash_bytes(HashAlgorithm::Xxh128, b"sfml");
        let sum = Checksum::parse(&format!("xxh128:{}", digest)).unwrap();
        assert_eq!(sum.algorithm, HashAlgorithm::Xxh128);
        assert!(verify_file(file.path(), &sum).is_ok());
    }
}
