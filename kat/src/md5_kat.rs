/*++

Licensed under the Apache-2.0 license.

File Name:

    md5_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for MD5 hash operations.

--*/

use crate::WordAligned;
use ce_drivers::{Algorithm, CeError, CeResult, HashContext, HashEngine};

const EMPTY_DIGEST: [u8; 16] = [
    0xd4, 0x1d, 0x8c, 0xd9, 0x8f, 0x00, 0xb2, 0x04, 0xe9, 0x80, 0x09, 0x98, 0xec, 0xf8, 0x42, 0x7e,
];

const ABC: WordAligned<3> = WordAligned(*b"abc");

const ABC_DIGEST: [u8; 16] = [
    0x90, 0x01, 0x50, 0x98, 0x3c, 0xd2, 0x4f, 0xb0, 0xd6, 0x96, 0x3f, 0x7d, 0x28, 0xe1, 0x7f, 0x72,
];

#[derive(Default, Debug)]
pub struct Md5Kat {}

impl Md5Kat {
    /// This function executes the Known Answer Tests (aka KAT) for MD5.
    ///
    /// Test vector source:
    /// RFC 1321 Appendix A.5
    ///
    /// # Arguments
    ///
    /// * `engine` - Crypto engine
    ///
    /// # Returns
    ///
    /// * `CeResult` - Result denoting the KAT outcome.
    pub fn execute(&self, engine: &mut impl HashEngine) -> CeResult<()> {
        let mut digest = [0u8; 16];
        HashContext::md5().finalize(engine, &mut digest)?;
        if digest != EMPTY_DIGEST {
            Err(CeError::KAT_MD5_DIGEST_MISMATCH)?;
        }

        let input = ABC;
        engine.hash_once(&input.0, &mut digest, Algorithm::Md5)?;
        if digest != ABC_DIGEST {
            Err(CeError::KAT_MD5_DIGEST_MISMATCH)?;
        }
        Ok(())
    }
}
