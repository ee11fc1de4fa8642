/*++

Licensed under the Apache-2.0 license.

File Name:

    sha1_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for SHA-1 cryptography operations.

--*/

use crate::WordAligned;
use ce_drivers::{Algorithm, CeError, CeResult, HashContext, HashEngine};

const EMPTY_DIGEST: [u8; 20] = [
    0xda, 0x39, 0xa3, 0xee, 0x5e, 0x6b, 0x4b, 0x0d, 0x32, 0x55, 0xbf, 0xef, 0x95, 0x60, 0x18, 0x90,
    0xaf, 0xd8, 0x07, 0x09,
];

const ABC: WordAligned<3> = WordAligned(*b"abc");

const ABC_DIGEST: [u8; 20] = [
    0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78, 0x50, 0xc2, 0x6c,
    0x9c, 0xd0, 0xd8, 0x9d,
];

#[derive(Default, Debug)]
pub struct Sha1Kat {}

impl Sha1Kat {
    /// This function executes the Known Answer Tests (aka KAT) for SHA-1.
    ///
    /// Test vector source:
    /// FIPS 180-2 Appendix A
    ///
    /// # Arguments
    ///
    /// * `engine` - Crypto engine
    ///
    /// # Returns
    ///
    /// * `CeResult` - Result denoting the KAT outcome.
    pub fn execute(&self, engine: &mut impl HashEngine) -> CeResult<()> {
        self.kat_no_data(engine)?;
        self.kat_abc(engine)
    }

    fn kat_no_data(&self, engine: &mut impl HashEngine) -> CeResult<()> {
        let mut digest = [0u8; 20];
        HashContext::sha1().finalize(engine, &mut digest)?;
        if digest != EMPTY_DIGEST {
            Err(CeError::KAT_SHA1_DIGEST_MISMATCH)?;
        }
        Ok(())
    }

    fn kat_abc(&self, engine: &mut impl HashEngine) -> CeResult<()> {
        let mut digest = [0u8; 20];
        let input = ABC;
        engine.hash_once(&input.0, &mut digest, Algorithm::Sha1)?;
        if digest != ABC_DIGEST {
            Err(CeError::KAT_SHA1_DIGEST_MISMATCH)?;
        }
        Ok(())
    }
}
