/*++

Licensed under the Apache-2.0 license.

File Name:

    hash_cache.rs

Abstract:

    File contains the hash accumulation cache: message bytes collected across
    updates and hashed in one go at finalize, or handed to the streaming
    engine once the total length is known.

--*/

use crate::algorithm::{HASH_BLOCK_SIZE, MAX_DIGEST_SIZE};
use crate::crypto_engine::{EngineConfig, HashEngine, MAX_JOB_INPUT_LEN};
use crate::{cprintln, Algorithm, CeError, CeResult};
use alloc::sync::Arc;
use alloc::vec::Vec;
use zerocopy::IntoBytes;
use zeroize::Zeroize;

/// Storage holding the accumulated message.
enum CacheBuffer {
    Empty,
    /// The caller's inline buffer.
    Inline,
    Owned(Vec<u32>),
    /// Shared with a copy; written copy-on-write and freed by the last owner.
    Shared(Arc<Vec<u32>>),
}

/// Accumulated hash input.
///
/// The inline buffer is owned by the caller and passed to every operation,
/// so a cache can be embedded next to it without self-reference.
pub struct HashCache {
    buffer: CacheBuffer,
    len: usize,
    final_len: Option<usize>,
    /// Bytes handed to the streaming engine while a session is in flight.
    streamed: Option<usize>,
    /// Copied from a cache whose data had already gone to the engine.
    detached: bool,
}

impl Default for HashCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HashCache {
    pub const fn new() -> Self {
        Self {
            buffer: CacheBuffer::Empty,
            len: 0,
            final_len: None,
            streamed: None,
            detached: false,
        }
    }

    /// Number of bytes accumulated and not yet streamed.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True while the cache forwards updates to a streaming session.
    pub fn is_streaming(&self) -> bool {
        self.streamed.is_some()
    }

    /// Declare the total message length, switching later updates to the
    /// streaming engine. A length of zero leaves the length undeclared.
    pub fn set_final_len(&mut self, len: usize) -> CeResult<()> {
        if self.detached {
            return Err(CeError::DRIVER_CE_STREAM_NOT_ACTIVE);
        }
        if self.streamed.is_some() {
            return Err(CeError::DRIVER_CE_INVALID_ARGUMENT);
        }
        self.final_len = (len > 0).then_some(len);
        Ok(())
    }

    /// Append `data` to the message.
    ///
    /// # Arguments
    ///
    /// * `engine` - Engine used once the final length is declared
    /// * `inline` - Caller's inline buffer
    /// * `data` - Message bytes
    /// * `algorithm` - Hash algorithm of the message
    pub fn update<E: HashEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        inline: &mut [u32],
        data: &[u8],
        algorithm: Algorithm,
    ) -> CeResult<()> {
        if self.detached {
            return Err(CeError::DRIVER_CE_STREAM_NOT_ACTIVE);
        }
        if data.is_empty() {
            return Ok(());
        }
        if self.final_len.is_some() || self.streamed.is_some() {
            let result = self.stream_data(engine, inline, data, algorithm);
            // Before a session opens nothing has left the cache; keep it for a retry.
            if result.is_err() && self.streamed.is_some() {
                engine.hash_stream_abort();
                self.reset(inline);
            }
            return result;
        }
        self.append(engine.config(), inline, data)
    }

    /// Produce the digest of everything accumulated and reset the cache.
    ///
    /// # Arguments
    ///
    /// * `hash` - Receives the leading `hash.len()` bytes of the digest
    pub fn finalize<E: HashEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        inline: &mut [u32],
        algorithm: Algorithm,
        hash: &mut [u8],
    ) -> CeResult<()> {
        let result = self.finalize_inner(engine, inline, algorithm, hash);
        if result.is_err() && self.streamed.is_some() {
            engine.hash_stream_abort();
        }
        self.reset(inline);
        result
    }

    /// Duplicate the cache. The heap buffer, if any, becomes shared between
    /// both; the caller copies its inline buffer.
    ///
    /// Data already handed to a streaming session cannot be duplicated: the
    /// copy of a streaming cache fails every `update` and `finalize` with
    /// `DRIVER_CE_STREAM_NOT_ACTIVE` until a finalize resets it.
    pub fn copy(&mut self) -> HashCache {
        if self.streamed.is_some() || self.detached {
            let mut copy = HashCache::new();
            copy.detached = true;
            return copy;
        }
        let buffer = match &mut self.buffer {
            CacheBuffer::Empty => CacheBuffer::Empty,
            CacheBuffer::Inline => CacheBuffer::Inline,
            CacheBuffer::Shared(shared) => CacheBuffer::Shared(Arc::clone(shared)),
            CacheBuffer::Owned(owned) => {
                let shared = Arc::new(core::mem::take(owned));
                self.buffer = CacheBuffer::Shared(Arc::clone(&shared));
                CacheBuffer::Shared(shared)
            }
        };
        HashCache {
            buffer,
            len: self.len,
            final_len: self.final_len,
            streamed: None,
            detached: false,
        }
    }

    fn finalize_inner<E: HashEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        inline: &mut [u32],
        algorithm: Algorithm,
        hash: &mut [u8],
    ) -> CeResult<()> {
        if self.detached {
            return Err(CeError::DRIVER_CE_STREAM_NOT_ACTIVE);
        }
        let digest_size = match algorithm {
            Algorithm::HmacSha1 => return Err(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM),
            _ => algorithm
                .digest_size()
                .ok_or(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM)?,
        };
        if hash.len() > digest_size.min(MAX_DIGEST_SIZE) {
            return Err(CeError::DRIVER_CE_INVALID_OUTPUT_SIZE);
        }

        if engine.config().hash_pad_marker {
            self.write_pad_marker(inline);
        }

        if self.final_len.is_some() {
            self.promote(engine, inline, algorithm)?;
        }
        if self.streamed.is_some() {
            engine.hash_stream_start()?;
            return engine.hash_stream_wait(hash);
        }

        let len = self.len;
        if len == 0 {
            let empty = algorithm
                .empty_digest()
                .ok_or(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM)?;
            hash.copy_from_slice(&empty[..hash.len()]);
            return Ok(());
        }

        if len > MAX_JOB_INPUT_LEN {
            engine.hash_stream_reset(algorithm, len)?;
            self.streamed = Some(0);
            engine.hash_stream_update(&self.bytes(inline)[..len])?;
            engine.hash_stream_start()?;
            return engine.hash_stream_wait(hash);
        }

        engine.hash_once(&self.bytes(inline)[..len], hash, algorithm)
    }

    fn stream_data<E: HashEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        inline: &mut [u32],
        data: &[u8],
        algorithm: Algorithm,
    ) -> CeResult<()> {
        self.promote(engine, inline, algorithm)?;
        engine.hash_stream_update(data)?;
        if let Some(streamed) = self.streamed.as_mut() {
            *streamed += data.len();
        }
        Ok(())
    }

    /// Open a streaming session for the declared length and feed it what was
    /// accumulated before the length was known.
    fn promote<E: HashEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        inline: &mut [u32],
        algorithm: Algorithm,
    ) -> CeResult<()> {
        if self.streamed.is_some() {
            return Ok(());
        }
        let total = self.final_len.ok_or(CeError::DRIVER_CE_STREAM_NOT_ACTIVE)?;
        engine.hash_stream_reset(algorithm, total)?;
        self.streamed = Some(0);

        let len = self.len;
        if len > 0 {
            engine.hash_stream_update(&self.bytes(inline)[..len])?;
            self.streamed = Some(len);
        }
        self.release(inline);
        self.len = 0;
        Ok(())
    }

    fn append(&mut self, config: &EngineConfig, inline: &mut [u32], data: &[u8]) -> CeResult<()> {
        let new_len = self
            .len
            .checked_add(data.len())
            .ok_or(CeError::DRIVER_CE_OUT_OF_MEMORY)?;
        let padded = padded_len(new_len).ok_or(CeError::DRIVER_CE_OUT_OF_MEMORY)?;

        let fits_inline = padded <= inline.len() * 4;
        if fits_inline && matches!(self.buffer, CacheBuffer::Empty | CacheBuffer::Inline) {
            self.buffer = CacheBuffer::Inline;
        } else if padded > self.capacity(inline) {
            let grown = match try_alloc_words(padded / 4, config.hash_cache_limit) {
                Some(grown) => grown,
                None => {
                    cprintln!("[ce] Hash cache allocation of {} bytes failed", padded);
                    self.reset(inline);
                    return Err(CeError::DRIVER_CE_OUT_OF_MEMORY);
                }
            };
            let mut grown = grown;
            let len = self.len;
            grown.as_mut_bytes()[..len].copy_from_slice(&self.bytes(inline)[..len]);
            self.release(inline);
            self.buffer = CacheBuffer::Owned(grown);
        }

        let len = self.len;
        self.bytes_mut(inline)[len..new_len].copy_from_slice(data);
        self.len = new_len;
        Ok(())
    }

    fn capacity(&self, inline: &[u32]) -> usize {
        match &self.buffer {
            CacheBuffer::Empty => 0,
            CacheBuffer::Inline => inline.len() * 4,
            CacheBuffer::Owned(owned) => owned.len() * 4,
            CacheBuffer::Shared(shared) => shared.len() * 4,
        }
    }

    fn bytes<'a>(&'a self, inline: &'a [u32]) -> &'a [u8] {
        match &self.buffer {
            CacheBuffer::Empty => &[],
            CacheBuffer::Inline => inline.as_bytes(),
            CacheBuffer::Owned(owned) => owned.as_bytes(),
            CacheBuffer::Shared(shared) => shared.as_bytes(),
        }
    }

    /// Writable view of the buffer; a shared buffer is unshared first.
    fn bytes_mut<'a>(&'a mut self, inline: &'a mut [u32]) -> &'a mut [u8] {
        match &mut self.buffer {
            CacheBuffer::Empty => &mut [],
            CacheBuffer::Inline => inline.as_mut_bytes(),
            CacheBuffer::Owned(owned) => owned.as_mut_bytes(),
            CacheBuffer::Shared(shared) => Arc::make_mut(shared).as_mut_bytes(),
        }
    }

    fn write_pad_marker(&mut self, inline: &mut [u32]) {
        let len = self.len;
        let buf = match &mut self.buffer {
            CacheBuffer::Inline => inline.as_mut_bytes(),
            CacheBuffer::Owned(owned) => owned.as_mut_bytes(),
            // A shared buffer is left untouched rather than unshared.
            CacheBuffer::Empty | CacheBuffer::Shared(_) => return,
        };
        if let Some(byte) = buf.get_mut(len) {
            *byte = 0x80;
        }
    }

    fn release(&mut self, inline: &mut [u32]) {
        if matches!(self.buffer, CacheBuffer::Inline) {
            inline.zeroize();
        }
        self.release_heap();
    }

    fn release_heap(&mut self) {
        match core::mem::replace(&mut self.buffer, CacheBuffer::Empty) {
            CacheBuffer::Owned(mut owned) => owned.zeroize(),
            CacheBuffer::Shared(shared) => {
                if let Some(mut owned) = Arc::into_inner(shared) {
                    owned.zeroize();
                }
            }
            CacheBuffer::Empty | CacheBuffer::Inline => {}
        }
    }

    fn reset(&mut self, inline: &mut [u32]) {
        self.release(inline);
        self.len = 0;
        self.final_len = None;
        self.streamed = None;
        self.detached = false;
    }
}

impl Drop for HashCache {
    fn drop(&mut self) {
        self.release_heap();
    }
}

fn padded_len(len: usize) -> Option<usize> {
    Some(len.checked_add(HASH_BLOCK_SIZE - 1)? & !(HASH_BLOCK_SIZE - 1))
}

fn try_alloc_words(words: usize, limit: Option<usize>) -> Option<Vec<u32>> {
    if limit.is_some_and(|limit| words * 4 > limit) {
        return None;
    }
    let mut buf = Vec::new();
    buf.try_reserve_exact(words).ok()?;
    buf.resize(words, 0);
    Some(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records what reaches the engine and hashes by concatenation length.
    #[derive(Default)]
    struct RecordingEngine {
        config: EngineConfig,
        once: Vec<Vec<u8>>,
        stream: Option<(usize, Vec<u8>)>,
        aborts: usize,
    }

    impl HashEngine for RecordingEngine {
        fn config(&self) -> &EngineConfig {
            &self.config
        }

        fn hash_once(&mut self, input: &[u8], digest: &mut [u8], _: Algorithm) -> CeResult<()> {
            self.once.push(input.to_vec());
            digest.fill(input.len() as u8);
            Ok(())
        }

        fn hash_stream_reset(&mut self, _: Algorithm, msg_len: usize) -> CeResult<()> {
            if self.stream.is_some() {
                return Err(CeError::DRIVER_CE_ENGINE_BUSY);
            }
            self.stream = Some((msg_len, Vec::new()));
            Ok(())
        }

        fn hash_stream_update(&mut self, data: &[u8]) -> CeResult<()> {
            let (total, buf) = self
                .stream
                .as_mut()
                .ok_or(CeError::DRIVER_CE_STREAM_NOT_ACTIVE)?;
            if buf.len() + data.len() > *total {
                return Err(CeError::DRIVER_CE_STREAM_OVERRUN);
            }
            buf.extend_from_slice(data);
            Ok(())
        }

        fn hash_stream_start(&mut self) -> CeResult<()> {
            match &self.stream {
                Some((total, buf)) if *total == buf.len() => Ok(()),
                _ => Err(CeError::DRIVER_CE_STREAM_LENGTH_MISMATCH),
            }
        }

        fn hash_stream_wait(&mut self, digest: &mut [u8]) -> CeResult<()> {
            let (_, buf) = self
                .stream
                .take()
                .ok_or(CeError::DRIVER_CE_STREAM_NOT_ACTIVE)?;
            digest.fill(0xa5);
            self.once.push(buf);
            Ok(())
        }

        fn hash_stream_abort(&mut self) {
            if self.stream.take().is_some() {
                self.aborts += 1;
            }
        }
    }

    #[test]
    fn test_inline_then_heap() {
        let mut engine = RecordingEngine::default();
        let mut inline = [0u32; 16];
        let mut cache = HashCache::new();

        cache
            .update(&mut engine, &mut inline, &[1; 40], Algorithm::Sha256)
            .unwrap();
        assert!(matches!(cache.buffer, CacheBuffer::Inline));
        cache
            .update(&mut engine, &mut inline, &[2; 40], Algorithm::Sha256)
            .unwrap();
        assert!(matches!(cache.buffer, CacheBuffer::Owned(ref v) if v.len() == 32));
        assert_eq!(inline, [0; 16]);

        let mut digest = [0u8; 32];
        cache
            .finalize(&mut engine, &mut inline, Algorithm::Sha256, &mut digest)
            .unwrap();
        let mut expected = vec![1u8; 40];
        expected.extend_from_slice(&[2; 40]);
        assert_eq!(engine.once, vec![expected]);
        assert!(cache.is_empty());
        assert!(matches!(cache.buffer, CacheBuffer::Empty));
    }

    #[test]
    fn test_empty_finalize() {
        let mut engine = RecordingEngine::default();
        let mut inline = [0u32; 16];
        let mut cache = HashCache::new();
        let mut digest = [0u8; 16];
        cache
            .finalize(&mut engine, &mut inline, Algorithm::Md5, &mut digest)
            .unwrap();
        assert_eq!(digest, crate::algorithm::MD5_EMPTY_DIGEST);
        assert!(engine.once.is_empty());
    }

    #[test]
    fn test_late_final_len() {
        let mut engine = RecordingEngine::default();
        let mut inline = [0u32; 16];
        let mut cache = HashCache::new();

        cache
            .update(&mut engine, &mut inline, b"hello ", Algorithm::Sha1)
            .unwrap();
        cache.set_final_len(11).unwrap();
        cache
            .update(&mut engine, &mut inline, b"world", Algorithm::Sha1)
            .unwrap();
        assert!(cache.is_streaming());
        assert_eq!(cache.set_final_len(12), Err(CeError::DRIVER_CE_INVALID_ARGUMENT));

        let mut digest = [0u8; 20];
        cache
            .finalize(&mut engine, &mut inline, Algorithm::Sha1, &mut digest)
            .unwrap();
        assert_eq!(engine.once, vec![b"hello world".to_vec()]);
        assert_eq!(digest, [0xa5; 20]);
        assert!(!cache.is_streaming());
    }

    #[test]
    fn test_final_len_without_update() {
        let mut engine = RecordingEngine::default();
        let mut inline = [0u32; 16];
        let mut cache = HashCache::new();

        cache
            .update(&mut engine, &mut inline, b"abc", Algorithm::Sha256)
            .unwrap();
        cache.set_final_len(3).unwrap();
        let mut digest = [0u8; 32];
        cache
            .finalize(&mut engine, &mut inline, Algorithm::Sha256, &mut digest)
            .unwrap();
        assert_eq!(engine.once, vec![b"abc".to_vec()]);
        assert_eq!(digest, [0xa5; 32]);
    }

    #[test]
    fn test_stream_error_resets() {
        let mut engine = RecordingEngine::default();
        let mut inline = [0u32; 16];
        let mut cache = HashCache::new();

        cache.set_final_len(4).unwrap();
        assert_eq!(
            cache.update(&mut engine, &mut inline, &[0; 5], Algorithm::Sha256),
            Err(CeError::DRIVER_CE_STREAM_OVERRUN)
        );
        assert_eq!(engine.aborts, 1);
        assert!(!cache.is_streaming());
        assert_eq!(cache.final_len, None);
    }

    #[test]
    fn test_large_message_streams() {
        let mut engine = RecordingEngine::default();
        let mut inline = [0u32; 16];
        let mut cache = HashCache::new();
        let data = vec![7u8; MAX_JOB_INPUT_LEN + 1];

        cache
            .update(&mut engine, &mut inline, &data, Algorithm::Sha256)
            .unwrap();
        let mut digest = [0u8; 32];
        cache
            .finalize(&mut engine, &mut inline, Algorithm::Sha256, &mut digest)
            .unwrap();
        assert_eq!(engine.once, vec![data]);
        assert_eq!(digest, [0xa5; 32]);
    }

    #[test]
    fn test_cache_limit() {
        let mut engine = RecordingEngine {
            config: EngineConfig {
                hash_cache_limit: Some(128),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut inline = [0u32; 16];
        let mut cache = HashCache::new();

        cache
            .update(&mut engine, &mut inline, &[1; 100], Algorithm::Sha256)
            .unwrap();
        assert_eq!(
            cache.update(&mut engine, &mut inline, &[1; 100], Algorithm::Sha256),
            Err(CeError::DRIVER_CE_OUT_OF_MEMORY)
        );
        assert!(cache.is_empty());
        assert!(matches!(cache.buffer, CacheBuffer::Empty));
    }

    #[test]
    fn test_copy_on_write() {
        let mut engine = RecordingEngine::default();
        let mut inline = [0u32; 16];
        let mut cache = HashCache::new();

        cache
            .update(&mut engine, &mut inline, &[1; 100], Algorithm::Sha256)
            .unwrap();
        let mut copy = cache.copy();
        assert!(matches!(cache.buffer, CacheBuffer::Shared(_)));

        copy.update(&mut engine, &mut inline, &[2; 4], Algorithm::Sha256)
            .unwrap();
        assert!(matches!(cache.buffer, CacheBuffer::Shared(ref s) if Arc::strong_count(s) == 1));
        assert_eq!(&cache.bytes(&inline)[..cache.len()], &[1; 100][..]);
        assert_eq!(copy.len(), 104);
        assert_eq!(&copy.bytes(&inline)[100..104], &[2; 4]);
    }

    #[test]
    fn test_busy_engine_keeps_cache() {
        let mut engine = RecordingEngine::default();
        let mut inline = [0u32; 16];
        let mut cache = HashCache::new();

        cache
            .update(&mut engine, &mut inline, b"hello ", Algorithm::Sha256)
            .unwrap();
        cache.set_final_len(11).unwrap();

        // Another session holds the engine.
        engine.stream = Some((4, Vec::new()));
        assert_eq!(
            cache.update(&mut engine, &mut inline, b"world", Algorithm::Sha256),
            Err(CeError::DRIVER_CE_ENGINE_BUSY)
        );
        assert_eq!(engine.aborts, 0);
        assert!(engine.stream.is_some());
        assert_eq!(cache.len(), 6);
        assert_eq!(cache.final_len, Some(11));
        assert!(!cache.is_streaming());

        engine.stream = None;
        cache
            .update(&mut engine, &mut inline, b"world", Algorithm::Sha256)
            .unwrap();
        let mut digest = [0u8; 32];
        cache
            .finalize(&mut engine, &mut inline, Algorithm::Sha256, &mut digest)
            .unwrap();
        assert_eq!(engine.once, vec![b"hello world".to_vec()]);
    }

    #[test]
    fn test_copy_while_streaming() {
        let mut engine = RecordingEngine::default();
        let mut inline = [0u32; 16];
        let mut copy_inline = [0u32; 16];
        let mut cache = HashCache::new();

        cache.set_final_len(200).unwrap();
        cache
            .update(&mut engine, &mut inline, &[0x41; 100], Algorithm::Sha256)
            .unwrap();
        let mut copy = cache.copy();
        assert!(!copy.is_streaming());

        let mut digest = [0u8; 32];
        assert_eq!(
            copy.update(&mut engine, &mut copy_inline, &[0x41; 4], Algorithm::Sha256),
            Err(CeError::DRIVER_CE_STREAM_NOT_ACTIVE)
        );
        assert_eq!(
            copy.set_final_len(4),
            Err(CeError::DRIVER_CE_STREAM_NOT_ACTIVE)
        );
        assert!(cache.copy().detached);
        assert_eq!(
            copy.finalize(&mut engine, &mut copy_inline, Algorithm::Sha256, &mut digest),
            Err(CeError::DRIVER_CE_STREAM_NOT_ACTIVE)
        );
        assert_eq!(engine.aborts, 0);
        assert!(engine.once.is_empty());

        // The original session is untouched and the copy is usable again.
        cache
            .update(&mut engine, &mut inline, &[0x41; 100], Algorithm::Sha256)
            .unwrap();
        cache
            .finalize(&mut engine, &mut inline, Algorithm::Sha256, &mut digest)
            .unwrap();
        assert_eq!(engine.once, vec![vec![0x41; 200]]);

        copy.update(&mut engine, &mut copy_inline, b"abc", Algorithm::Sha256)
            .unwrap();
        copy.finalize(&mut engine, &mut copy_inline, Algorithm::Sha256, &mut digest)
            .unwrap();
        assert_eq!(engine.once[1], b"abc".to_vec());
    }

    #[test]
    fn test_zero_final_len_is_undeclared() {
        let mut engine = RecordingEngine::default();
        let mut inline = [0u32; 16];
        let mut cache = HashCache::new();

        cache
            .update(&mut engine, &mut inline, b"ab", Algorithm::Sha256)
            .unwrap();
        cache.set_final_len(0).unwrap();
        assert_eq!(cache.final_len, None);
        cache
            .update(&mut engine, &mut inline, b"c", Algorithm::Sha256)
            .unwrap();
        assert!(engine.stream.is_none());

        let mut digest = [0u8; 32];
        cache
            .finalize(&mut engine, &mut inline, Algorithm::Sha256, &mut digest)
            .unwrap();
        assert_eq!(engine.once, vec![b"abc".to_vec()]);
    }

    #[test]
    fn test_output_size() {
        let mut engine = RecordingEngine::default();
        let mut inline = [0u32; 16];
        let mut cache = HashCache::new();
        let mut digest = [0u8; 21];
        assert_eq!(
            cache.finalize(&mut engine, &mut inline, Algorithm::Sha1, &mut digest),
            Err(CeError::DRIVER_CE_INVALID_OUTPUT_SIZE)
        );
        assert_eq!(
            cache.finalize(&mut engine, &mut inline, Algorithm::HmacSha1, &mut digest[..20]),
            Err(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM)
        );
    }
}
