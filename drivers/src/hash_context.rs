/*++

Licensed under the Apache-2.0 license.

File Name:

    hash_context.rs

Abstract:

    File contains the incremental hashing context built on the hash cache.

--*/

use crate::crypto_engine::HashEngine;
use crate::hash_cache::HashCache;
use crate::{Algorithm, CeError, CeResult};
use zeroize::Zeroize;

/// Inline buffer size in words; one hash block.
const INLINE_WORDS: usize = 16;

/// Incremental SHA-1, SHA-256 or MD5 computation.
pub struct HashContext {
    algorithm: Algorithm,
    inline: [u32; INLINE_WORDS],
    cache: HashCache,
}

impl HashContext {
    pub fn new(algorithm: Algorithm) -> CeResult<Self> {
        if !algorithm.is_hash() || algorithm == Algorithm::HmacSha1 {
            return Err(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM);
        }
        Ok(Self::with(algorithm))
    }

    pub fn sha1() -> Self {
        Self::with(Algorithm::Sha1)
    }

    pub fn sha256() -> Self {
        Self::with(Algorithm::Sha256)
    }

    pub fn md5() -> Self {
        Self::with(Algorithm::Md5)
    }

    fn with(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            inline: [0; INLINE_WORDS],
            cache: HashCache::new(),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn update(&mut self, engine: &mut impl HashEngine, data: &[u8]) -> CeResult<()> {
        self.cache
            .update(engine, &mut self.inline, data, self.algorithm)
    }

    /// Declare the total message length so the remaining updates stream
    /// straight to the engine.
    pub fn set_final_len(&mut self, len: usize) -> CeResult<()> {
        self.cache.set_final_len(len)
    }

    /// Compute the digest and reset the context for a new message.
    pub fn finalize(&mut self, engine: &mut impl HashEngine, hash: &mut [u8]) -> CeResult<()> {
        self.cache
            .finalize(engine, &mut self.inline, self.algorithm, hash)
    }

    /// Duplicate the context. A streaming session is never duplicated.
    pub fn copy(&mut self) -> Self {
        Self {
            algorithm: self.algorithm,
            inline: self.inline,
            cache: self.cache.copy(),
        }
    }
}

impl Drop for HashContext {
    fn drop(&mut self) {
        self.inline.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        assert!(HashContext::new(Algorithm::Sha256).is_ok());
        assert_eq!(
            HashContext::new(Algorithm::Aes).err(),
            Some(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM)
        );
        assert_eq!(
            HashContext::new(Algorithm::HmacSha1).err(),
            Some(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM)
        );
        assert_eq!(HashContext::md5().algorithm(), Algorithm::Md5);
        assert_eq!(HashContext::sha1().algorithm(), Algorithm::Sha1);
        assert_eq!(
            HashContext::new(Algorithm::Sha256).map(|ctx| ctx.algorithm()),
            Ok(HashContext::sha256().algorithm())
        );
    }
}
