/*++

Licensed under the Apache-2.0 license.

File Name:

    aes128cbc_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for AES-128-CBC cryptography operations.

--*/

use crate::WordAligned;
use ce_drivers::{AesCipher, CeError, CeResult, CipherEngine};

const KEY: [u8; 16] = [
    0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
];

const IV: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
];

const PT: WordAligned<32> = WordAligned([
    0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93, 0x17, 0x2a,
    0xae, 0x2d, 0x8a, 0x57, 0x1e, 0x03, 0xac, 0x9c, 0x9e, 0xb7, 0x6f, 0xac, 0x45, 0xaf, 0x8e, 0x51,
]);

const CT: WordAligned<32> = WordAligned([
    0x76, 0x49, 0xab, 0xac, 0x81, 0x19, 0xb2, 0x46, 0xce, 0xe9, 0x8e, 0x9b, 0x12, 0xe9, 0x19, 0x7d,
    0x50, 0x86, 0xcb, 0x9b, 0x50, 0x72, 0x19, 0xee, 0x95, 0xdb, 0x11, 0x3a, 0x91, 0x76, 0x78, 0xb2,
]);

#[derive(Default, Debug)]
pub struct Aes128CbcKat {}

impl Aes128CbcKat {
    /// This function executes the Known Answer Tests (aka KAT) for AES-128-CBC.
    ///
    /// Test vector source:
    /// NIST SP 800-38A F.2.1 and F.2.2
    ///
    /// # Arguments
    ///
    /// * `engine` - Crypto engine
    ///
    /// # Returns
    ///
    /// * `CeResult` - Result denoting the KAT outcome.
    pub fn execute(&self, engine: &mut impl CipherEngine) -> CeResult<()> {
        self.encrypt_decrypt(engine)
    }

    fn encrypt_decrypt(&self, engine: &mut impl CipherEngine) -> CeResult<()> {
        let mut aes = AesCipher::new(&KEY)?;
        let input = PT;
        let mut ciphertext = WordAligned([0u8; 32]);
        aes.set_iv(&IV);
        aes.cbc_encrypt(engine, &mut ciphertext.0, &input.0)?;
        if ciphertext.0 != CT.0 || aes.iv()[..] != CT.0[16..] {
            Err(CeError::KAT_AES_CIPHERTEXT_MISMATCH)?;
        }

        let mut plaintext = WordAligned([0u8; 32]);
        aes.set_iv(&IV);
        aes.cbc_decrypt(engine, &mut plaintext.0, &ciphertext.0)?;
        if plaintext.0 != PT.0 {
            Err(CeError::KAT_AES_PLAINTEXT_MISMATCH)?;
        }
        Ok(())
    }
}
