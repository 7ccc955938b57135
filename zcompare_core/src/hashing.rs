use std::io::{self, Read};
use xxhash_rust::xxh64::Xxh64;
use zcompare_common::{ContentDigest, HashAlgorithm};

const BUFFER_SIZE: usize = 64 * 1024;

/// Streams entry contents through the configured content hash
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl ContentHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<ContentDigest> {
        let mut buffer = vec![0; BUFFER_SIZE];

        match self.algorithm {
            HashAlgorithm::Xxh64 => {
                let mut hasher = Xxh64::new(0);
                loop {
                    let n = reader.read(&mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
                Ok(ContentDigest::Xxh64(hasher.digest()))
            }
            HashAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                loop {
                    let n = reader.read(&mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
                Ok(ContentDigest::Blake3(*hasher.finalize().as_bytes()))
            }
        }
    }

    pub fn hash_bytes(&self, data: &[u8]) -> ContentDigest {
        match self.algorithm {
            HashAlgorithm::Xxh64 => ContentDigest::Xxh64(xxhash_rust::xxh64::xxh64(data, 0)),
            HashAlgorithm::Blake3 => ContentDigest::Blake3(*blake3::hash(data).as_bytes()),
        }
    }
}
