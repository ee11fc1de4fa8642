/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Crypto Engine Emulator Crypto library.

--*/

mod block_cipher;
mod hash;
mod helpers;

pub use block_cipher::{BlockCipher, BlockCipherMode, CipherError};
pub use hash::{HashAlgo, Hasher};
pub use helpers::EndianessTransform;
