// Licensed under the Apache-2.0 license

#![allow(dead_code)]

use ce_drivers::{CryptoEngine, EngineConfig, SpinHwMutex};
use ce_emu_periph::CryptoEngineEmu;
use zerocopy::IntoBytes;

pub type EmuEngine<'a> =
    CryptoEngine<&'a CryptoEngineEmu, &'a CryptoEngineEmu, &'a SpinHwMutex>;

pub fn engine<'a>(emu: &'a CryptoEngineEmu, lock: &'a SpinHwMutex) -> EmuEngine<'a> {
    engine_with_config(emu, lock, EngineConfig::default())
}

pub fn engine_with_config<'a>(
    emu: &'a CryptoEngineEmu,
    lock: &'a SpinHwMutex,
    config: EngineConfig,
) -> EmuEngine<'a> {
    CryptoEngine::new(emu.ce_reg(), emu, lock, config).unwrap()
}

/// Word-aligned byte buffer, as the engine requires for DMA.
pub struct WordBuf {
    words: Vec<u32>,
    len: usize,
}

impl WordBuf {
    pub fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(4)],
            len,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        let mut buf = Self::zeroed(data.len());
        buf.bytes_mut().copy_from_slice(data);
        buf
    }

    pub fn random(rng: &mut impl rand::Rng, len: usize) -> Self {
        let mut buf = Self::zeroed(len);
        rng.fill(buf.bytes_mut());
        buf
    }

    pub fn bytes(&self) -> &[u8] {
        &self.words.as_bytes()[..self.len]
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.words.as_mut_bytes()[..self.len]
    }

    /// The buffer including the padding up to a word.
    pub fn padded_mut(&mut self) -> &mut [u8] {
        self.words.as_mut_bytes()
    }
}

pub fn sha1(data: &[u8]) -> Vec<u8> {
    use sha1::Digest;
    sha1::Sha1::digest(data).to_vec()
}

pub fn sha256(data: &[u8]) -> Vec<u8> {
    use sha2::Digest;
    sha2::Sha256::digest(data).to_vec()
}

pub fn md5(data: &[u8]) -> Vec<u8> {
    use md5::Digest;
    md5::Md5::digest(data).to_vec()
}

pub fn reference_digest(algorithm: ce_drivers::Algorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        ce_drivers::Algorithm::Sha1 => sha1(data),
        ce_drivers::Algorithm::Sha256 => sha256(data),
        ce_drivers::Algorithm::Md5 => md5(data),
        other => panic!("no reference digest for {other:?}"),
    }
}
