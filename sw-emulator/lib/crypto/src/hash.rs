/*++

Licensed under the Apache-2.0 license.

File Name:

    hash.rs

Abstract:

    Message digests computed by the emulated hash unit.

--*/

use sha2::Digest;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HashAlgo {
    Sha1,
    Sha256,
    Md5,
}

impl HashAlgo {
    pub const fn digest_size(&self) -> usize {
        match self {
            HashAlgo::Sha1 => 20,
            HashAlgo::Sha256 => 32,
            HashAlgo::Md5 => 16,
        }
    }
}

/// Incremental hasher for one frame of data.
#[derive(Clone)]
pub enum Hasher {
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Md5(md5::Md5),
}

impl Hasher {
    pub fn new(algo: HashAlgo) -> Self {
        match algo {
            HashAlgo::Sha1 => Hasher::Sha1(sha1::Sha1::new()),
            HashAlgo::Sha256 => Hasher::Sha256(sha2::Sha256::new()),
            HashAlgo::Md5 => Hasher::Md5(md5::Md5::new()),
        }
    }

    pub fn algo(&self) -> HashAlgo {
        match self {
            Hasher::Sha1(_) => HashAlgo::Sha1,
            Hasher::Sha256(_) => HashAlgo::Sha256,
            Hasher::Md5(_) => HashAlgo::Md5,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha1(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
            Hasher::Md5(h) => h.update(data),
        }
    }

    /// Writes the digest into `out`, which must be at least
    /// `algo().digest_size()` bytes, and starts a new frame.
    pub fn finalize_into(&mut self, out: &mut [u8]) {
        match self {
            Hasher::Sha1(h) => out[..20].copy_from_slice(&h.finalize_reset()),
            Hasher::Sha256(h) => out[..32].copy_from_slice(&h.finalize_reset()),
            Hasher::Md5(h) => out[..16].copy_from_slice(&h.finalize_reset()),
        }
    }
}
