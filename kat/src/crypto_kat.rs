/*++

Licensed under the Apache-2.0 license.

File Name:

    crypto_kat.rs

Abstract:

    File contains function to execute all the Known Answer Tests (KAT) for cryptography operations.

--*/

use crate::{Aes128CbcKat, Aes128CtrKat, Md5Kat, Sha1Kat, Sha256Kat, TdesCbcKat};
use ce_drivers::{CeResult, CipherEngine, HashEngine};

#[derive(Default, Debug)]
pub struct CryptoKat {}

impl CryptoKat {
    /// This function executes all the Known Answer Tests (aka KAT).
    ///
    /// # Arguments
    ///
    /// * `engine` - Crypto engine
    ///
    /// # Returns
    ///
    /// * `CeResult` - Result denoting the KAT outcome.
    pub fn execute<E: CipherEngine + HashEngine>(&self, engine: &mut E) -> CeResult<()> {
        Sha1Kat::default().execute(engine)?;
        Sha256Kat::default().execute(engine)?;
        Md5Kat::default().execute(engine)?;
        Aes128CbcKat::default().execute(engine)?;
        Aes128CtrKat::default().execute(engine)?;
        TdesCbcKat::default().execute(engine)?;
        Ok(())
    }
}

/// Run every self test, stopping at the first failure.
pub fn execute_kats<E: CipherEngine + HashEngine>(engine: &mut E) -> CeResult<()> {
    CryptoKat::default().execute(engine)
}
