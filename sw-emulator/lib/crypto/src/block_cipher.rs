/*++

Licensed under the Apache-2.0 license.

File Name:

    block_cipher.rs

Abstract:

    File contains the AES, DES and triple-DES modes of the emulated cipher unit.

--*/

use aes::{Aes128, Aes192, Aes256};
use cipher::generic_array::GenericArray;
use cipher::{
    BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, BlockSizeUser, KeyInit,
    KeyIvInit, StreamCipher,
};
use des::{Des, TdesEde3};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlockCipher {
    Aes,
    Des,
    TripleDes,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlockCipherMode {
    Ecb,
    Cbc,
    Ctr,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CipherError {
    InvalidKey,
    InvalidIv,
    /// Block modes require whole blocks.
    PartialBlock,
    /// The cipher has no such mode.
    UnsupportedMode,
}

impl BlockCipher {
    pub const fn block_size(&self) -> usize {
        match self {
            BlockCipher::Aes => 16,
            BlockCipher::Des | BlockCipher::TripleDes => 8,
        }
    }

    /// Encrypts or decrypts `buf` in place.
    pub fn apply(
        &self,
        mode: BlockCipherMode,
        encrypt: bool,
        key: &[u8],
        iv: &[u8],
        buf: &mut [u8],
    ) -> Result<(), CipherError> {
        macro_rules! dispatch {
            ($cipher:ty) => {
                match mode {
                    BlockCipherMode::Ecb => ecb::<$cipher>(encrypt, key, buf),
                    BlockCipherMode::Cbc if encrypt => {
                        cbc_encrypt::<cbc::Encryptor<$cipher>>(key, iv, buf)
                    }
                    BlockCipherMode::Cbc => cbc_decrypt::<cbc::Decryptor<$cipher>>(key, iv, buf),
                    BlockCipherMode::Ctr => Err(CipherError::UnsupportedMode),
                }
            };
        }

        match (self, key.len()) {
            (BlockCipher::Aes, _) if mode == BlockCipherMode::Ctr => match key.len() {
                16 => ctr::<ctr::Ctr128BE<Aes128>>(key, iv, buf),
                24 => ctr::<ctr::Ctr128BE<Aes192>>(key, iv, buf),
                32 => ctr::<ctr::Ctr128BE<Aes256>>(key, iv, buf),
                _ => Err(CipherError::InvalidKey),
            },
            (BlockCipher::Aes, 16) => dispatch!(Aes128),
            (BlockCipher::Aes, 24) => dispatch!(Aes192),
            (BlockCipher::Aes, 32) => dispatch!(Aes256),
            (BlockCipher::Des, 8) => dispatch!(Des),
            (BlockCipher::TripleDes, 24) => dispatch!(TdesEde3),
            _ => Err(CipherError::InvalidKey),
        }
    }
}

fn ecb<C: BlockEncrypt + BlockDecrypt + KeyInit>(
    encrypt: bool,
    key: &[u8],
    buf: &mut [u8],
) -> Result<(), CipherError> {
    let cipher = C::new_from_slice(key).map_err(|_| CipherError::InvalidKey)?;
    if buf.len() % C::block_size() != 0 {
        return Err(CipherError::PartialBlock);
    }
    for block in buf.chunks_exact_mut(C::block_size()) {
        let block = GenericArray::from_mut_slice(block);
        if encrypt {
            cipher.encrypt_block(block);
        } else {
            cipher.decrypt_block(block);
        }
    }
    Ok(())
}

fn cbc_encrypt<E: BlockEncryptMut + KeyIvInit>(
    key: &[u8],
    iv: &[u8],
    buf: &mut [u8],
) -> Result<(), CipherError> {
    let mut cipher = E::new_from_slices(key, iv).map_err(|_| CipherError::InvalidIv)?;
    if buf.len() % <E as BlockSizeUser>::block_size() != 0 {
        return Err(CipherError::PartialBlock);
    }
    for block in buf.chunks_exact_mut(<E as BlockSizeUser>::block_size()) {
        cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    Ok(())
}

fn cbc_decrypt<D: BlockDecryptMut + KeyIvInit>(
    key: &[u8],
    iv: &[u8],
    buf: &mut [u8],
) -> Result<(), CipherError> {
    let mut cipher = D::new_from_slices(key, iv).map_err(|_| CipherError::InvalidIv)?;
    if buf.len() % <D as BlockSizeUser>::block_size() != 0 {
        return Err(CipherError::PartialBlock);
    }
    for block in buf.chunks_exact_mut(<D as BlockSizeUser>::block_size()) {
        cipher.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    Ok(())
}

fn ctr<S: StreamCipher + KeyIvInit>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), CipherError> {
    let mut cipher = S::new_from_slices(key, iv).map_err(|_| CipherError::InvalidIv)?;
    cipher.apply_keystream(buf);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes_cbc_zero_key() {
        let mut buf = [0u8; 48];
        BlockCipher::Aes
            .apply(BlockCipherMode::Cbc, true, &[0u8; 32], &[0u8; 16], &mut buf)
            .unwrap();
        assert_eq!(
            hex::encode(buf),
            "dc95c078a2408989ad48a21492842087\
             08c374848c228233c2b34f332bd2e9d3\
             8b70c515a6663d38cdb8e6532b266491"
        );
        BlockCipher::Aes
            .apply(BlockCipherMode::Cbc, false, &[0u8; 32], &[0u8; 16], &mut buf)
            .unwrap();
        assert_eq!(buf, [0u8; 48]);
    }

    #[test]
    fn test_des_partial_block() {
        let mut buf = [0u8; 12];
        assert_eq!(
            BlockCipher::Des.apply(BlockCipherMode::Ecb, true, &[1u8; 8], &[], &mut buf),
            Err(CipherError::PartialBlock)
        );
    }

    #[test]
    fn test_bad_key_and_mode() {
        let mut buf = [0u8; 16];
        assert_eq!(
            BlockCipher::Aes.apply(BlockCipherMode::Ecb, true, &[0u8; 20], &[], &mut buf),
            Err(CipherError::InvalidKey)
        );
        assert_eq!(
            BlockCipher::TripleDes.apply(BlockCipherMode::Ctr, true, &[0u8; 24], &[0u8; 8], &mut buf),
            Err(CipherError::UnsupportedMode)
        );
    }

    #[test]
    fn test_aes_ctr_roundtrip() {
        let key = [7u8; 16];
        let iv = [9u8; 16];
        let mut buf = *b"counter mode text";
        BlockCipher::Aes
            .apply(BlockCipherMode::Ctr, true, &key, &iv, &mut buf)
            .unwrap();
        assert_ne!(&buf, b"counter mode text");
        BlockCipher::Aes
            .apply(BlockCipherMode::Ctr, false, &key, &iv, &mut buf)
            .unwrap();
        assert_eq!(&buf, b"counter mode text");
    }
}
