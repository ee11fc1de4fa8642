/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Crypto Engine driver library.

--*/

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

mod algorithm;
mod block_cipher;
mod crypto_engine;
mod descriptor;
mod endian;
mod hash_cache;
mod hash_context;
mod hash_stream;
mod hw_mutex;
pub mod printer;
pub mod wait;

pub use algorithm::{Algorithm, CipherMode, Direction};
pub use block_cipher::{AesCipher, DesCipher, TripleDesCipher, AES_BLOCK_SIZE, DES_BLOCK_SIZE};
pub use ce_error::{CeError, CeResult, ErrorKind};
pub use ce_registers::ce::CeReg;
pub use ce_registers::memory::{DeviceMemory, KsegMemory};
pub use ce_registers::{Mmio, MmioMut, RealMmio};
pub use crypto_engine::{
    CipherEngine, CryptoEngine, EngineConfig, HashEngine, Job, MAX_JOB_INPUT_LEN,
};
pub use endian::EndianSwap;
pub use hash_cache::HashCache;
pub use hash_context::HashContext;
pub use hw_mutex::{HwMutex, SpinHwMutex};
pub use wait::WaitBudget;
