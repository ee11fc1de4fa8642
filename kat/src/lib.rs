/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Crypto Engine Known Answer Tests.

--*/

#![no_std]

mod aes128cbc_kat;
mod aes128ctr_kat;
mod crypto_kat;
mod md5_kat;
mod sha1_kat;
mod sha256_kat;
mod tdescbc_kat;

pub use aes128cbc_kat::Aes128CbcKat;
pub use aes128ctr_kat::Aes128CtrKat;
pub use ce_drivers::{CeError, CeResult};
pub use crypto_kat::{execute_kats, CryptoKat};
pub use md5_kat::Md5Kat;
pub use sha1_kat::Sha1Kat;
pub use sha256_kat::Sha256Kat;
pub use tdescbc_kat::TdesCbcKat;

/// Test vector storage the engine can DMA from.
#[repr(C, align(4))]
pub(crate) struct WordAligned<const N: usize>(pub [u8; N]);
