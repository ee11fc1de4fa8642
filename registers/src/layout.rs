// Licensed under the Apache-2.0 license
//
//! In-memory structures fetched by the crypto engine's descriptor processor.

use bitfield::bitfield;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
use zeroize::Zeroize;

pub const SA_AUTH_KEY_WORDS: usize = 8;
pub const SA_ENC_KEY_WORDS: usize = 8;
pub const SA_AUTH_IV_WORDS: usize = 8;
pub const SA_ENC_IV_WORDS: usize = 4;

/// Largest value representable in the descriptor BUFLEN field.
pub const BD_MAX_BUFLEN: u32 = 0xFFFF;

/// `SaCtrl::algo` selector codes. Exactly one bit is set.
pub mod algo {
    pub const HMAC1: u32 = 0x40;
    pub const SHA256: u32 = 0x20;
    pub const SHA1: u32 = 0x10;
    pub const MD5: u32 = 0x08;
    pub const AES: u32 = 0x04;
    pub const TDES: u32 = 0x02;
    pub const DES: u32 = 0x01;
}

/// `SaCtrl::crypto_algo` sub-mode codes.
pub mod crypto_algo {
    pub const DES_ECB: u32 = 0b0000;
    pub const DES_CBC: u32 = 0b0001;
    pub const TDES_ECB: u32 = 0b0100;
    pub const TDES_CBC: u32 = 0b0101;
    pub const AES_ECB: u32 = 0b1000;
    pub const AES_CBC: u32 = 0b1001;
    pub const AES_CTR: u32 = 0b1101;
}

/// `SaCtrl::key_size` codes.
pub mod key_size {
    pub const BITS_128: u32 = 0b00;
    pub const BITS_192: u32 = 0b01;
    pub const BITS_256: u32 = 0b10;
}

bitfield! {
    /// Security association control word
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct SaCtrl(u32);
    impl Debug;

    pub u32, crypto_algo, set_crypto_algo: 3, 0;
    pub u32, multitask, set_multitask: 6, 4;
    pub u32, key_size, set_key_size: 8, 7;

    /// Encrypt when set; hashing always sets it
    pub bool, enc_type, set_enc_type: 9;

    pub u32, algo, set_algo: 16, 10;
    pub bool, flags, set_flags: 20;

    /// First block of a message
    pub bool, fb, set_fb: 21;

    /// Load the IV slots
    pub bool, load_iv, set_load_iv: 22;

    /// Load new keys
    pub bool, lnc, set_lnc: 23;

    /// Clear for immediate result
    pub bool, ir_flag, set_ir_flag: 24;

    pub bool, icv_only, set_icv_only: 25;
    pub bool, or_en, set_or_en: 26;
    pub bool, no_rx, set_no_rx: 27;
    pub bool, verify, set_verify: 29;
}

bitfield! {
    /// Buffer descriptor control word
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct BdCtrl(u32);
    impl Debug;

    pub u32, buf_len, set_buf_len: 15, 0;
    pub bool, cbd_int_en, set_cbd_int_en: 16;
    pub bool, pkt_int_en, set_pkt_int_en: 17;

    /// Last descriptor of the frame
    pub bool, lifm, set_lifm: 18;

    /// Last descriptor of the chain
    pub bool, last_bd, set_last_bd: 19;

    pub bool, sa_fetch_en, set_sa_fetch_en: 22;

    /// Owned by hardware while set
    pub bool, desc_en, set_desc_en: 31;
}

/// Security association: algorithm selection plus key and IV material.
///
/// Key and IV material is right-justified within each slot, one big-endian
/// word per 4 bytes.
#[repr(C, align(8))]
#[derive(Clone, Default, FromBytes, Immutable, IntoBytes, KnownLayout, Zeroize)]
pub struct SecurityAssociation {
    pub ctrl: u32,
    pub auth_key: [u32; SA_AUTH_KEY_WORDS],
    pub enc_key: [u32; SA_ENC_KEY_WORDS],
    pub auth_iv: [u32; SA_AUTH_IV_WORDS],
    pub enc_iv: [u32; SA_ENC_IV_WORDS],
    pub reserved: u32,
}

/// Buffer descriptor: one DMA transfer of the descriptor chain.
#[repr(C, align(8))]
#[derive(Clone, Copy, Default, FromBytes, Immutable, IntoBytes, KnownLayout)]
pub struct BufferDescriptor {
    pub ctrl: u32,
    /// Physical address of the security association
    pub sa_addr: u32,
    pub src_addr: u32,
    pub dst_addr: u32,
    /// Physical address of the next descriptor
    pub next_ptr: u32,
    /// Physical address the digest is written to
    pub upd_ptr: u32,
    /// Total message length in bytes
    pub msg_len: u32,
    pub enc_off: u32,
}
