/*++

Licensed under the Apache-2.0 license.

File Name:

    sha256_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for SHA-256 cryptography operations.

--*/

use crate::WordAligned;
use ce_drivers::{CeError, CeResult, HashContext, HashEngine};

const EMPTY_DIGEST: [u8; 32] = [
    0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9, 0x24,
    0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
];

const ABC: WordAligned<3> = WordAligned(*b"abc");

const ABC_DIGEST: [u8; 32] = [
    0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae, 0x22, 0x23,
    0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61, 0xf2, 0x00, 0x15, 0xad,
];

#[derive(Default, Debug)]
pub struct Sha256Kat {}

impl Sha256Kat {
    /// This function executes the Known Answer Tests (aka KAT) for SHA-256.
    ///
    /// Test vector source:
    /// FIPS 180-2 Appendix B
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
        self.kat_abc_incremental(engine)
    }

    fn kat_no_data(&self, engine: &mut impl HashEngine) -> CeResult<()> {
        let mut digest = [0u8; 32];
        HashContext::sha256().finalize(engine, &mut digest)?;
        if digest != EMPTY_DIGEST {
            Err(CeError::KAT_SHA256_DIGEST_MISMATCH)?;
        }
        Ok(())
    }

    /// Feeds the message one byte at a time through a hash context.
    fn kat_abc_incremental(&self, engine: &mut impl HashEngine) -> CeResult<()> {
        let mut ctx = HashContext::sha256();
        for byte in ABC.0.chunks(1) {
            ctx.update(engine, byte)?;
        }
        let mut digest = [0u8; 32];
        ctx.finalize(engine, &mut digest)?;
        if digest != ABC_DIGEST {
            Err(CeError::KAT_SHA256_DIGEST_MISMATCH)?;
        }
        Ok(())
    }
}
