/*++

Licensed under the Apache-2.0 license.

File Name:

    block_cipher.rs

Abstract:

    File contains AES, DES and Triple-DES contexts that keep a key and a
    running IV across calls to the crypto engine.

--*/

use crate::crypto_engine::CipherEngine;
use crate::{Algorithm, CeError, CeResult, CipherMode, Direction};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const AES_BLOCK_SIZE: usize = 16;
pub const DES_BLOCK_SIZE: usize = 8;

/// AES context with a 128, 192 or 256 bit key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct AesCipher {
    key: [u8; 32],
    key_len: usize,
    iv: [u8; AES_BLOCK_SIZE],
}

impl AesCipher {
    pub fn new(key: &[u8]) -> CeResult<Self> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(CeError::DRIVER_CE_INVALID_KEY_SIZE);
        }
        let mut cipher = Self {
            key: [0; 32],
            key_len: key.len(),
            iv: [0; AES_BLOCK_SIZE],
        };
        cipher.key[..key.len()].copy_from_slice(key);
        Ok(cipher)
    }

    pub fn set_iv(&mut self, iv: &[u8; AES_BLOCK_SIZE]) {
        self.iv = *iv;
    }

    /// Running CBC IV: the last ciphertext block processed.
    pub fn iv(&self) -> &[u8; AES_BLOCK_SIZE] {
        &self.iv
    }

    pub fn ecb_encrypt(
        &self,
        engine: &mut impl CipherEngine,
        output: &mut [u8],
        input: &[u8],
    ) -> CeResult<()> {
        self.ecb(engine, output, input, Direction::Encrypt)
    }

    pub fn ecb_decrypt(
        &self,
        engine: &mut impl CipherEngine,
        output: &mut [u8],
        input: &[u8],
    ) -> CeResult<()> {
        self.ecb(engine, output, input, Direction::Decrypt)
    }

    /// CBC encrypt, continuing from the running IV.
    pub fn cbc_encrypt(
        &mut self,
        engine: &mut impl CipherEngine,
        output: &mut [u8],
        input: &[u8],
    ) -> CeResult<()> {
        self.cbc(engine, output, input, Direction::Encrypt)
    }

    /// CBC decrypt, continuing from the running IV.
    pub fn cbc_decrypt(
        &mut self,
        engine: &mut impl CipherEngine,
        output: &mut [u8],
        input: &[u8],
    ) -> CeResult<()> {
        self.cbc(engine, output, input, Direction::Decrypt)
    }

    /// Encrypt (or, equivalently, decrypt) up to one block in counter mode.
    ///
    /// # Arguments
    ///
    /// * `counter` - Initial counter block; left unchanged
    /// * `output` - Output buffer, at least `input.len()` rounded up to a word
    /// * `input` - At most one block
    pub fn ctr_encrypt_block(
        &self,
        engine: &mut impl CipherEngine,
        counter: &[u8; AES_BLOCK_SIZE],
        output: &mut [u8],
        input: &[u8],
    ) -> CeResult<()> {
        if input.len() > AES_BLOCK_SIZE {
            return Err(CeError::DRIVER_CE_INVALID_ARGUMENT);
        }
        let mut ctr = *counter;
        let result = engine.submit_cipher(
            &self.key[..self.key_len],
            Some(&mut ctr[..]),
            output,
            input,
            Direction::Encrypt,
            Algorithm::Aes,
            CipherMode::Ctr,
        );
        ctr.zeroize();
        result
    }

    fn ecb(
        &self,
        engine: &mut impl CipherEngine,
        output: &mut [u8],
        input: &[u8],
        direction: Direction,
    ) -> CeResult<()> {
        engine.submit_cipher(
            &self.key[..self.key_len],
            None,
            output,
            input,
            direction,
            Algorithm::Aes,
            CipherMode::Ecb,
        )
    }

    fn cbc(
        &mut self,
        engine: &mut impl CipherEngine,
        output: &mut [u8],
        input: &[u8],
        direction: Direction,
    ) -> CeResult<()> {
        engine.submit_cipher(
            &self.key[..self.key_len],
            Some(&mut self.iv[..]),
            output,
            input,
            direction,
            Algorithm::Aes,
            CipherMode::Cbc,
        )
    }
}

macro_rules! des_cipher {
    ($(#[$meta:meta])* $name:ident, $algorithm:expr, $key_len:literal) => {
        $(#[$meta])*
        #[derive(Zeroize, ZeroizeOnDrop)]
        pub struct $name {
            key: [u8; $key_len],
            iv: [u8; DES_BLOCK_SIZE],
        }

        impl $name {
            pub fn new(key: &[u8; $key_len]) -> Self {
                Self {
                    key: *key,
                    iv: [0; DES_BLOCK_SIZE],
                }
            }

            pub fn set_iv(&mut self, iv: &[u8; DES_BLOCK_SIZE]) {
                self.iv = *iv;
            }

            pub fn iv(&self) -> &[u8; DES_BLOCK_SIZE] {
                &self.iv
            }

            pub fn ecb_encrypt(
                &self,
                engine: &mut impl CipherEngine,
                output: &mut [u8],
                input: &[u8],
            ) -> CeResult<()> {
                engine.submit_cipher(
                    &self.key,
                    None,
                    output,
                    input,
                    Direction::Encrypt,
                    $algorithm,
                    CipherMode::Ecb,
                )
            }

            pub fn ecb_decrypt(
                &self,
                engine: &mut impl CipherEngine,
                output: &mut [u8],
                input: &[u8],
            ) -> CeResult<()> {
                engine.submit_cipher(
                    &self.key,
                    None,
                    output,
                    input,
                    Direction::Decrypt,
                    $algorithm,
                    CipherMode::Ecb,
                )
            }

            pub fn cbc_encrypt(
                &mut self,
                engine: &mut impl CipherEngine,
                output: &mut [u8],
                input: &[u8],
            ) -> CeResult<()> {
                engine.submit_cipher(
                    &self.key,
                    Some(&mut self.iv[..]),
                    output,
                    input,
                    Direction::Encrypt,
                    $algorithm,
                    CipherMode::Cbc,
                )
            }

            pub fn cbc_decrypt(
                &mut self,
                engine: &mut impl CipherEngine,
                output: &mut [u8],
                input: &[u8],
            ) -> CeResult<()> {
                engine.submit_cipher(
                    &self.key,
                    Some(&mut self.iv[..]),
                    output,
                    input,
                    Direction::Decrypt,
                    $algorithm,
                    CipherMode::Cbc,
                )
            }
        }
    };
}

des_cipher!(
    /// Single DES context.
    DesCipher,
    Algorithm::Des,
    8
);

des_cipher!(
    /// Triple-DES (EDE, three keys) context.
    TripleDesCipher,
    Algorithm::TripleDes,
    24
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    struct Call {
        key: Vec<u8>,
        iv: Option<Vec<u8>>,
        direction: Direction,
        algorithm: Algorithm,
        mode: CipherMode,
    }

    /// Records each submission and returns the input as the output.
    #[derive(Default)]
    struct RecordingEngine {
        calls: Vec<Call>,
    }

    impl CipherEngine for RecordingEngine {
        fn submit_cipher(
            &mut self,
            key: &[u8],
            iv: Option<&mut [u8]>,
            output: &mut [u8],
            input: &[u8],
            direction: Direction,
            algorithm: Algorithm,
            mode: CipherMode,
        ) -> CeResult<()> {
            self.calls.push(Call {
                key: key.to_vec(),
                iv: iv.as_deref().map(|iv| iv.to_vec()),
                direction,
                algorithm,
                mode,
            });
            output[..input.len()].copy_from_slice(input);
            if let Some(iv) = iv {
                iv.fill(0xee);
            }
            Ok(())
        }
    }

    #[test]
    fn test_aes_key_sizes() {
        assert!(AesCipher::new(&[0; 16]).is_ok());
        assert!(AesCipher::new(&[0; 24]).is_ok());
        assert!(AesCipher::new(&[0; 32]).is_ok());
        assert_eq!(
            AesCipher::new(&[0; 20]).err(),
            Some(CeError::DRIVER_CE_INVALID_KEY_SIZE)
        );
    }

    #[test]
    fn test_aes_cbc_keeps_running_iv() {
        let mut engine = RecordingEngine::default();
        let mut aes = AesCipher::new(&[1; 24]).unwrap();
        aes.set_iv(&[2; 16]);
        let mut out = [0u8; 32];
        aes.cbc_encrypt(&mut engine, &mut out, &[3; 32]).unwrap();
        assert_eq!(aes.iv(), &[0xee; 16]);

        let call = &engine.calls[0];
        assert_eq!(call.key, [1; 24]);
        assert_eq!(call.iv.as_deref(), Some(&[2u8; 16][..]));
        assert_eq!(call.mode, CipherMode::Cbc);
        assert_eq!(call.direction, Direction::Encrypt);
    }

    #[test]
    fn test_aes_ctr_leaves_counter() {
        let mut engine = RecordingEngine::default();
        let aes = AesCipher::new(&[1; 16]).unwrap();
        let counter = [9u8; 16];
        let mut out = [0u8; 16];
        aes.ctr_encrypt_block(&mut engine, &counter, &mut out, &[5; 16])
            .unwrap();
        assert_eq!(counter, [9; 16]);
        assert_eq!(engine.calls[0].mode, CipherMode::Ctr);
        assert_eq!(
            aes.ctr_encrypt_block(&mut engine, &counter, &mut [0; 20], &[5; 17]),
            Err(CeError::DRIVER_CE_INVALID_ARGUMENT)
        );
    }

    #[test]
    fn test_des_contexts() {
        let mut engine = RecordingEngine::default();
        let des = DesCipher::new(&[4; 8]);
        let mut out = [0u8; 8];
        des.ecb_decrypt(&mut engine, &mut out, &[6; 8]).unwrap();

        let mut tdes = TripleDesCipher::new(&[7; 24]);
        tdes.set_iv(&[8; 8]);
        tdes.cbc_decrypt(&mut engine, &mut out, &[6; 8]).unwrap();
        assert_eq!(tdes.iv(), &[0xee; 8]);

        assert_eq!(engine.calls[0].algorithm, Algorithm::Des);
        assert_eq!(engine.calls[0].iv, None);
        assert_eq!(engine.calls[1].algorithm, Algorithm::TripleDes);
        assert_eq!(engine.calls[1].direction, Direction::Decrypt);
        assert_eq!(engine.calls[1].key, [7; 24]);
    }
}
