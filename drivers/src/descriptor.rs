/*++

Licensed under the Apache-2.0 license.

File Name:

    descriptor.rs

Abstract:

    File contains construction of security associations and buffer
    descriptors, and the helpers that hand them to the engine.

--*/

use crate::endian::load_right_justified;
use crate::{Algorithm, CeError, CeResult, CipherMode, Direction};
use ce_registers::layout::{
    BdCtrl, SaCtrl, SecurityAssociation, SA_AUTH_IV_WORDS, SA_AUTH_KEY_WORDS, SA_ENC_IV_WORDS,
};
use ce_registers::memory::DeviceMemory;
use zeroize::Zeroize;

/// Parameters of one security association.
pub(crate) struct SaParams<'a> {
    pub algorithm: Algorithm,
    pub mode: Option<CipherMode>,
    pub direction: Direction,
    pub key: Option<&'a [u8]>,
    pub iv: Option<&'a [u8]>,
    /// Partial digest to continue from; hashing only.
    pub auth_iv: Option<&'a [u8]>,
}

fn check_slot(material: &[u8], words: usize, err: CeError) -> CeResult<()> {
    if material.len() % 4 != 0 || material.len() > words * 4 {
        return Err(err);
    }
    Ok(())
}

fn load_slot(slot: &mut [u32], material: Option<&[u8]>, err: CeError) -> CeResult<()> {
    match material {
        Some(material) => load_right_justified(slot, material).ok_or(err),
        None => Ok(()),
    }
}

/// Builds a security association.
///
/// All sizes are validated before any key material is copied.
pub(crate) fn build_sa(params: &SaParams) -> CeResult<SecurityAssociation> {
    let alg = params.algorithm;
    let mut ctrl = SaCtrl(0);
    ctrl.set_algo(alg.code());
    ctrl.set_lnc(true);
    ctrl.set_fb(true);

    if alg.is_hash() {
        if params.mode.is_some() {
            return Err(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM);
        }
        if params.iv.is_some() {
            return Err(CeError::DRIVER_CE_INVALID_IV_SIZE);
        }
        match (alg, params.key) {
            (Algorithm::HmacSha1, Some(key)) if !key.is_empty() => {
                check_slot(key, SA_AUTH_KEY_WORDS, CeError::DRIVER_CE_INVALID_KEY_SIZE)?
            }
            (Algorithm::HmacSha1, _) | (_, Some(_)) => {
                return Err(CeError::DRIVER_CE_INVALID_KEY_SIZE)
            }
            _ => {}
        }
        if let Some(seed) = params.auth_iv {
            check_slot(seed, SA_AUTH_IV_WORDS, CeError::DRIVER_CE_INVALID_OUTPUT_SIZE)?;
            ctrl.set_load_iv(true);
        }
        ctrl.set_enc_type(true);
    } else {
        let mode = params.mode.ok_or(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM)?;
        ctrl.set_crypto_algo(alg.sub_mode(mode)?);
        let key = params.key.ok_or(CeError::DRIVER_CE_INVALID_KEY_SIZE)?;
        ctrl.set_key_size(alg.key_size_code(key.len())?);
        if let Some(iv) = params.iv {
            check_slot(iv, SA_ENC_IV_WORDS, CeError::DRIVER_CE_INVALID_IV_SIZE)?;
            if iv.is_empty() {
                return Err(CeError::DRIVER_CE_INVALID_IV_SIZE);
            }
            ctrl.set_load_iv(true);
        }
        ctrl.set_enc_type(params.direction == Direction::Encrypt);
    }

    let mut sa = SecurityAssociation {
        ctrl: ctrl.0,
        ..Default::default()
    };
    let loaded = if alg.is_hash() {
        load_slot(&mut sa.auth_key, params.key, CeError::DRIVER_CE_INVALID_KEY_SIZE).and_then(
            |_| load_slot(&mut sa.auth_iv, params.auth_iv, CeError::DRIVER_CE_INVALID_OUTPUT_SIZE),
        )
    } else {
        load_slot(&mut sa.enc_key, params.key, CeError::DRIVER_CE_INVALID_KEY_SIZE)
            .and_then(|_| load_slot(&mut sa.enc_iv, params.iv, CeError::DRIVER_CE_INVALID_IV_SIZE))
    };
    if let Err(err) = loaded {
        sa.zeroize();
        return Err(err);
    }
    Ok(sa)
}

/// Control word of the single descriptor of a one-shot job.
pub(crate) fn job_bd_ctrl(len: usize) -> BdCtrl {
    let mut ctrl = BdCtrl(0);
    ctrl.set_buf_len(round_up_word(len) as u32);
    ctrl.set_sa_fetch_en(true);
    ctrl.set_pkt_int_en(true);
    ctrl.set_last_bd(true);
    ctrl.set_lifm(true);
    ctrl.set_desc_en(true);
    ctrl
}

pub(crate) const fn round_up_word(len: usize) -> usize {
    (len + 3) & !3
}

/// Copies `src` into `dst` through the engine's view of memory.
///
/// # Safety
///
/// `dst` must be valid for writes of one `T`.
pub(crate) unsafe fn publish<T, M: DeviceMemory>(mem: &M, dst: *mut T, src: &T) {
    let view = mem.to_device_view(dst as *const u8) as *mut T;
    core::ptr::copy_nonoverlapping(src as *const T, view, 1);
}

/// Reads one word through the engine's view of memory.
///
/// # Safety
///
/// `src` must be valid for reads of one `u32`.
pub(crate) unsafe fn read_device_word<M: DeviceMemory>(mem: &M, src: *const u32) -> u32 {
    core::ptr::read_volatile(mem.to_device_view(src as *const u8) as *const u32)
}

/// Writes one word through the engine's view of memory.
///
/// # Safety
///
/// `dst` must be valid for writes of one `u32`.
pub(crate) unsafe fn write_device_word<M: DeviceMemory>(mem: &M, dst: *mut u32, val: u32) {
    core::ptr::write_volatile(mem.to_device_view(dst as *const u8) as *mut u32, val)
}
