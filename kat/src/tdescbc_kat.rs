/*++

Licensed under the Apache-2.0 license.

File Name:

    tdescbc_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for Triple-DES-CBC cryptography operations.

--*/

use crate::WordAligned;
use ce_drivers::{CeError, CeResult, CipherEngine, TripleDesCipher};

const KEY: [u8; 24] = [
    0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef,
    0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef,
];

const IV: [u8; 8] = [0x12, 0x34, 0x56, 0x78, 0x90, 0xab, 0xcd, 0xef];

// "Now is the time for all "
const PT: WordAligned<24> = WordAligned([
    0x4e, 0x6f, 0x77, 0x20, 0x69, 0x73, 0x20, 0x74, 0x68, 0x65, 0x20, 0x74, 0x69, 0x6d, 0x65, 0x20,
    0x66, 0x6f, 0x72, 0x20, 0x61, 0x6c, 0x6c, 0x20,
]);

const CT: [u8; 24] = [
    0xe5, 0xc7, 0xcd, 0xde, 0x87, 0x2b, 0xf2, 0x7c, 0x43, 0xe9, 0x34, 0x00, 0x8c, 0x38, 0x9c, 0x0f,
    0x68, 0x37, 0x88, 0x49, 0x9a, 0x7c, 0x05, 0xf6,
];

#[derive(Default, Debug)]
pub struct TdesCbcKat {}

impl TdesCbcKat {
    /// This function executes the Known Answer Tests (aka KAT) for Triple-DES-CBC.
    ///
    /// With all three keys equal the result matches single DES, so the
    /// FIPS 81 CBC example applies.
    ///
    /// Test vector source:
    /// FIPS 81 Appendix C, Table C1
    ///
    /// # Arguments
    ///
    /// * `engine` - Crypto engine
    ///
    /// # Returns
    ///
    /// * `CeResult` - Result denoting the KAT outcome.
    pub fn execute(&self, engine: &mut impl CipherEngine) -> CeResult<()> {
        let mut tdes = TripleDesCipher::new(&KEY);
        let input = PT;
        let mut ciphertext = WordAligned([0u8; 24]);
        tdes.set_iv(&IV);
        tdes.cbc_encrypt(engine, &mut ciphertext.0, &input.0)?;
        if ciphertext.0 != CT {
            Err(CeError::KAT_TDES_CIPHERTEXT_MISMATCH)?;
        }

        let mut plaintext = WordAligned([0u8; 24]);
        tdes.set_iv(&IV);
        tdes.cbc_decrypt(engine, &mut plaintext.0, &ciphertext.0)?;
        if plaintext.0 != PT.0 {
            Err(CeError::KAT_TDES_PLAINTEXT_MISMATCH)?;
        }
        Ok(())
    }
}
