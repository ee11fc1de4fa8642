/*++

Licensed under the Apache-2.0 license.

File Name:

    aes128ctr_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for AES-128-CTR cryptography operations.

--*/

use crate::WordAligned;
use ce_drivers::{AesCipher, CeError, CeResult, CipherEngine};

const KEY: [u8; 16] = [
    0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
];

const COUNTER: [u8; 16] = [
    0xf0, 0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8, 0xf9, 0xfa, 0xfb, 0xfc, 0xfd, 0xfe, 0xff,
];

const PT: WordAligned<16> = WordAligned([
    0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93, 0x17, 0x2a,
]);

const CT: [u8; 16] = [
    0x87, 0x4d, 0x61, 0x91, 0xb6, 0x20, 0xe3, 0x26, 0x1b, 0xef, 0x68, 0x64, 0x99, 0x0d, 0xb6, 0xce,
];

#[derive(Default, Debug)]
pub struct Aes128CtrKat {}

impl Aes128CtrKat {
    /// This function executes the Known Answer Tests (aka KAT) for AES-128-CTR.
    ///
    /// Test vector source:
    /// NIST SP 800-38A F.5.1, first block
    ///
    /// # Arguments
    ///
    /// * `engine` - Crypto engine
    ///
    /// # Returns
    ///
    /// * `CeResult` - Result denoting the KAT outcome.
    pub fn execute(&self, engine: &mut impl CipherEngine) -> CeResult<()> {
        let aes = AesCipher::new(&KEY)?;
        let input = PT;
        let mut ciphertext = WordAligned([0u8; 16]);
        aes.ctr_encrypt_block(engine, &COUNTER, &mut ciphertext.0, &input.0)?;
        if ciphertext.0 != CT {
            Err(CeError::KAT_AES_CIPHERTEXT_MISMATCH)?;
        }

        let mut plaintext = WordAligned([0u8; 16]);
        aes.ctr_encrypt_block(engine, &COUNTER, &mut plaintext.0, &ciphertext.0)?;
        if plaintext.0 != PT.0 {
            Err(CeError::KAT_AES_PLAINTEXT_MISMATCH)?;
        }
        Ok(())
    }
}
