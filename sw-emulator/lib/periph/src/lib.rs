/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Crypto Engine Emulator Peripheral library.

--*/

mod crypto_engine;

pub use crypto_engine::{CryptoEngineEmu, EmuStats};
