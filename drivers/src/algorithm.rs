/*++

Licensed under the Apache-2.0 license.

File Name:

    algorithm.rs

Abstract:

    File contains the algorithm, mode and direction selectors understood by
    the crypto engine.

--*/

use crate::{CeError, CeResult};
use ce_registers::layout::{algo, crypto_algo, key_size};

pub const SHA256_EMPTY_DIGEST: [u8; 32] = [
    0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9, 0x24,
    0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
];

pub const SHA1_EMPTY_DIGEST: [u8; 20] = [
    0xda, 0x39, 0xa3, 0xee, 0x5e, 0x6b, 0x4b, 0x0d, 0x32, 0x55, 0xbf, 0xef, 0x95, 0x60, 0x18, 0x90,
    0xaf, 0xd8, 0x07, 0x09,
];

pub const MD5_EMPTY_DIGEST: [u8; 16] = [
    0xd4, 0x1d, 0x8c, 0xd9, 0x8f, 0x00, 0xb2, 0x04, 0xe9, 0x80, 0x09, 0x98, 0xec, 0xf8, 0x42, 0x7e,
];

/// Hash block size; also the growth granularity of the hash cache.
pub(crate) const HASH_BLOCK_SIZE: usize = 64;

/// Largest digest any hash algorithm produces.
pub(crate) const MAX_DIGEST_SIZE: usize = 32;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Algorithm {
    HmacSha1,
    Sha256,
    Sha1,
    Md5,
    Aes,
    TripleDes,
    Des,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CipherMode {
    Ecb,
    Cbc,
    Ctr,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

impl Algorithm {
    /// Security association ALGO selector.
    pub const fn code(&self) -> u32 {
        match self {
            Algorithm::HmacSha1 => algo::HMAC1,
            Algorithm::Sha256 => algo::SHA256,
            Algorithm::Sha1 => algo::SHA1,
            Algorithm::Md5 => algo::MD5,
            Algorithm::Aes => algo::AES,
            Algorithm::TripleDes => algo::TDES,
            Algorithm::Des => algo::DES,
        }
    }

    pub const fn is_hash(&self) -> bool {
        matches!(
            self,
            Algorithm::HmacSha1 | Algorithm::Sha256 | Algorithm::Sha1 | Algorithm::Md5
        )
    }

    pub const fn block_size(&self) -> usize {
        match self {
            Algorithm::Aes => 16,
            Algorithm::TripleDes | Algorithm::Des => 8,
            _ => HASH_BLOCK_SIZE,
        }
    }

    /// Digest size in bytes, for hash algorithms.
    pub const fn digest_size(&self) -> Option<usize> {
        match self {
            Algorithm::Sha256 => Some(32),
            Algorithm::Sha1 | Algorithm::HmacSha1 => Some(20),
            Algorithm::Md5 => Some(16),
            _ => None,
        }
    }

    /// Digest of the zero-length message.
    pub fn empty_digest(&self) -> Option<&'static [u8]> {
        match self {
            Algorithm::Sha256 => Some(&SHA256_EMPTY_DIGEST),
            Algorithm::Sha1 => Some(&SHA1_EMPTY_DIGEST),
            Algorithm::Md5 => Some(&MD5_EMPTY_DIGEST),
            _ => None,
        }
    }

    /// Security association CRYPTOALGO sub-mode for `mode`.
    pub(crate) fn sub_mode(&self, mode: CipherMode) -> CeResult<u32> {
        match (self, mode) {
            (Algorithm::Aes, CipherMode::Ecb) => Ok(crypto_algo::AES_ECB),
            (Algorithm::Aes, CipherMode::Cbc) => Ok(crypto_algo::AES_CBC),
            (Algorithm::Aes, CipherMode::Ctr) => Ok(crypto_algo::AES_CTR),
            (Algorithm::TripleDes, CipherMode::Ecb) => Ok(crypto_algo::TDES_ECB),
            (Algorithm::TripleDes, CipherMode::Cbc) => Ok(crypto_algo::TDES_CBC),
            (Algorithm::Des, CipherMode::Ecb) => Ok(crypto_algo::DES_ECB),
            (Algorithm::Des, CipherMode::Cbc) => Ok(crypto_algo::DES_CBC),
            _ => Err(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM),
        }
    }

    /// Security association KEYSIZE code for a key of `len` bytes.
    pub(crate) fn key_size_code(&self, len: usize) -> CeResult<u32> {
        match (self, len) {
            (Algorithm::Aes, 16) => Ok(key_size::BITS_128),
            (Algorithm::Aes, 24) => Ok(key_size::BITS_192),
            (Algorithm::Aes, 32) => Ok(key_size::BITS_256),
            (Algorithm::TripleDes, 24) | (Algorithm::Des, 8) => Ok(key_size::BITS_192),
            _ => Err(CeError::DRIVER_CE_INVALID_KEY_SIZE),
        }
    }
}

impl CipherMode {
    /// True for modes that only operate on whole blocks.
    pub const fn needs_whole_blocks(&self) -> bool {
        matches!(self, CipherMode::Ecb | CipherMode::Cbc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_modes() {
        assert_eq!(Algorithm::Aes.sub_mode(CipherMode::Ctr), Ok(0b1101));
        assert_eq!(Algorithm::TripleDes.sub_mode(CipherMode::Cbc), Ok(0b0101));
        assert_eq!(
            Algorithm::Des.sub_mode(CipherMode::Ctr),
            Err(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM)
        );
        assert_eq!(
            Algorithm::Sha256.sub_mode(CipherMode::Ecb),
            Err(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM)
        );
    }

    #[test]
    fn test_key_sizes() {
        assert_eq!(Algorithm::Aes.key_size_code(32), Ok(0b10));
        assert_eq!(Algorithm::Aes.key_size_code(24), Ok(0b01));
        assert_eq!(Algorithm::Aes.key_size_code(16), Ok(0b00));
        assert_eq!(Algorithm::Des.key_size_code(8), Ok(0b01));
        assert_eq!(Algorithm::TripleDes.key_size_code(24), Ok(0b01));
        assert_eq!(
            Algorithm::Des.key_size_code(16),
            Err(CeError::DRIVER_CE_INVALID_KEY_SIZE)
        );
    }

    #[test]
    fn test_sizes() {
        assert_eq!(Algorithm::Aes.block_size(), 16);
        assert_eq!(Algorithm::Des.block_size(), 8);
        assert_eq!(Algorithm::Md5.block_size(), 64);
        assert_eq!(Algorithm::Sha256.digest_size(), Some(32));
        assert_eq!(Algorithm::Aes.digest_size(), None);
        assert_eq!(Algorithm::HmacSha1.empty_digest(), None);
    }
}
