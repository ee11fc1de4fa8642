/*++

Licensed under the Apache-2.0 license.

File Name:

    hash_stream.rs

Abstract:

    File contains API for hashing messages larger than one buffer descriptor
    by cycling a ring of descriptors through the crypto engine.

--*/

use crate::crypto_engine::CryptoEngine;
use crate::descriptor::{self, read_device_word, round_up_word, write_device_word};
use crate::wait;
use crate::{cprintln, Algorithm, CeError, CeResult, HwMutex};
use alloc::boxed::Box;
use alloc::vec::Vec;
use ce_registers::ce::IntFlags;
use ce_registers::layout::{BdCtrl, BufferDescriptor, SaCtrl, SecurityAssociation};
use ce_registers::memory::DeviceMemory;
use ce_registers::MmioMut;
use core::ptr::{addr_of, addr_of_mut};
use zerocopy::IntoBytes;

/// Largest read-only region a single descriptor references in place.
const MAX_ZERO_COPY_LEN: usize = 32 * 1024;

/// Descriptor ring and the buffers it points at. Allocated once per engine
/// and kept at a fixed address.
struct StreamRing {
    sa: Box<SecurityAssociation>,
    bds: Box<[BufferDescriptor]>,
    staging: Box<[u32]>,
    digest: Box<[u32; 8]>,
    block_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Filling,
    Draining,
}

struct Session {
    algorithm: Algorithm,
    msg_len: u32,
    consumed: usize,
    current: usize,
    fill: usize,
    /// Set when the current descriptor references caller memory directly.
    external_src: Option<u32>,
    sa_fetched: bool,
    phase: Phase,
}

#[derive(Default)]
pub(crate) struct StreamState {
    ring: Option<StreamRing>,
    session: Option<Session>,
}

impl StreamState {
    pub(crate) fn is_active(&self) -> bool {
        self.session.is_some()
    }
}

fn try_alloc<T: Clone>(len: usize, val: T) -> CeResult<Box<[T]>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| CeError::DRIVER_CE_OUT_OF_MEMORY)?;
    v.resize(len, val);
    Ok(v.into_boxed_slice())
}

impl<TMmio: MmioMut + Copy, TMem: DeviceMemory, TLock: HwMutex> CryptoEngine<TMmio, TMem, TLock> {
    /// True while a hash stream holds the engine.
    pub fn hash_stream_active(&self) -> bool {
        self.stream.is_active()
    }

    /// Begin streaming a message of exactly `msg_len` bytes.
    ///
    /// The engine lock is acquired here and held until
    /// [`Self::hash_stream_wait`] or [`Self::hash_stream_abort`].
    ///
    /// # Arguments
    ///
    /// * `algorithm` - SHA-1, SHA-256 or MD5
    /// * `msg_len` - Total number of bytes the stream will receive
    pub fn hash_stream_reset(&mut self, algorithm: Algorithm, msg_len: usize) -> CeResult<()> {
        if !algorithm.is_hash() || algorithm == Algorithm::HmacSha1 {
            return Err(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM);
        }
        if msg_len == 0 {
            return Err(CeError::DRIVER_CE_EMPTY_INPUT);
        }
        let msg_len = u32::try_from(msg_len).map_err(|_| CeError::DRIVER_CE_INPUT_TOO_LARGE)?;

        self.ensure_ring()?;
        if !self.lock.try_lock() {
            return Err(CeError::DRIVER_CE_ENGINE_BUSY);
        }
        if let Err(err) = self.software_reset() {
            self.lock.unlock();
            return Err(err);
        }
        if let Err(err) = self.program_ring(algorithm, msg_len) {
            let _ = self.software_reset();
            self.lock.unlock();
            return Err(err);
        }

        self.stream.session = Some(Session {
            algorithm,
            msg_len,
            consumed: 0,
            current: 0,
            fill: 0,
            external_src: None,
            sa_fetched: false,
            phase: Phase::Filling,
        });
        Ok(())
    }

    /// Feed the next part of the message.
    ///
    /// Blocks while every descriptor of the ring is owned by the engine.
    pub fn hash_stream_update(&mut self, data: &[u8]) -> CeResult<()> {
        let session = self
            .stream
            .session
            .as_ref()
            .ok_or(CeError::DRIVER_CE_STREAM_NOT_ACTIVE)?;
        if session.phase != Phase::Filling {
            return Err(CeError::DRIVER_CE_STREAM_NOT_ACTIVE);
        }
        if session.consumed + data.len() > session.msg_len as usize {
            cprintln!(
                "[ce] Hash stream overrun: {} of {} bytes",
                session.consumed + data.len(),
                session.msg_len
            );
            self.hash_stream_abort();
            return Err(CeError::DRIVER_CE_STREAM_OVERRUN);
        }

        let result = self.stream_fill(data);
        if result.is_err() {
            self.hash_stream_abort();
        }
        result
    }

    /// Submit the final descriptor of the message.
    pub fn hash_stream_start(&mut self) -> CeResult<()> {
        let session = self
            .stream
            .session
            .as_ref()
            .ok_or(CeError::DRIVER_CE_STREAM_NOT_ACTIVE)?;
        if session.phase != Phase::Filling {
            return Err(CeError::DRIVER_CE_STREAM_NOT_ACTIVE);
        }
        if session.consumed != session.msg_len as usize {
            cprintln!(
                "[ce] Hash stream length mismatch: {} of {} bytes",
                session.consumed,
                session.msg_len
            );
            self.hash_stream_abort();
            return Err(CeError::DRIVER_CE_STREAM_LENGTH_MISMATCH);
        }

        let result = self.stream_submit(true);
        if result.is_err() {
            self.hash_stream_abort();
        }
        result
    }

    /// Wait for the digest and end the stream, releasing the engine lock.
    ///
    /// # Arguments
    ///
    /// * `digest` - Receives the leading `digest.len()` bytes of the digest
    pub fn hash_stream_wait(&mut self, digest: &mut [u8]) -> CeResult<()> {
        let session = self
            .stream
            .session
            .as_ref()
            .ok_or(CeError::DRIVER_CE_STREAM_NOT_ACTIVE)?;
        if session.phase != Phase::Draining {
            return Err(CeError::DRIVER_CE_STREAM_NOT_ACTIVE);
        }
        let digest_size = session.algorithm.digest_size().unwrap_or(0);
        if digest.len() > digest_size {
            self.hash_stream_abort();
            return Err(CeError::DRIVER_CE_INVALID_OUTPUT_SIZE);
        }

        let ring_len = self.stream.ring.as_ref().map_or(0, |ring| ring.bds.len());
        if let Err(err) = self.wait_ring_idle(0, ring_len) {
            self.hash_stream_abort();
            return Err(err);
        }

        if let Some(ring) = self.stream.ring.as_mut() {
            let bytes = ring.digest.as_mut_bytes();
            Self::copy_out(&self.mem, &mut bytes[..digest_size], digest_size);
            digest.copy_from_slice(&bytes[..digest.len()]);
            ring.digest.fill(0);
        }

        self.ce.regs().intsrc().write(IntFlags::all());
        self.stream.session = None;
        self.lock.unlock();
        Ok(())
    }

    /// Stop the engine and end the stream, if one is active.
    pub fn hash_stream_abort(&mut self) {
        if self.stream.session.take().is_some() {
            cprintln!("[ce] Hash stream aborted");
            let _ = self.software_reset();
            self.lock.unlock();
        }
    }

    fn ensure_ring(&mut self) -> CeResult<()> {
        let block_size = self.config.stream_block_size;
        let ring_len = self.config.stream_ring_len;
        if self.stream.ring.is_some() {
            return Ok(());
        }
        let bds = try_alloc(ring_len, BufferDescriptor::default())?;
        let staging = try_alloc(ring_len * block_size / 4, 0u32)?;
        self.stream.ring = Some(StreamRing {
            sa: Box::default(),
            bds,
            staging,
            digest: Box::new([0u32; 8]),
            block_size,
        });
        Ok(())
    }

    fn program_ring(&mut self, algorithm: Algorithm, msg_len: u32) -> CeResult<()> {
        let ring = self
            .stream
            .ring
            .as_mut()
            .ok_or(CeError::DRIVER_CE_OUT_OF_MEMORY)?;
        let mem = &self.mem;
        let ring_len = ring.bds.len();
        let block_size = ring.block_size;

        let staging = ring.staging.as_mut_ptr() as *mut u8;
        let digest = ring.digest.as_mut_ptr() as *mut u8;
        // SAFETY: both buffers are owned by the ring and sized as written
        unsafe {
            core::ptr::write_bytes(mem.to_device_view(staging), 0, ring_len * block_size);
            core::ptr::write_bytes(mem.to_device_view(digest), 0, 32);
        }

        let mut ctrl = SaCtrl(0);
        ctrl.set_algo(algorithm.code());
        ctrl.set_lnc(true);
        ctrl.set_fb(true);
        ctrl.set_enc_type(true);
        ctrl.set_load_iv(true);
        let sa_ptr: *mut SecurityAssociation = &mut *ring.sa;
        // SAFETY: sa_ptr points at the ring's SA
        unsafe {
            descriptor::publish(
                mem,
                sa_ptr,
                &SecurityAssociation {
                    ctrl: ctrl.0,
                    ..Default::default()
                },
            )
        };

        let sa_phys = mem.to_physical(sa_ptr as *const u8);
        let digest_phys = mem.to_physical(digest);
        let bds = ring.bds.as_mut_ptr();
        for i in 0..ring_len {
            let mut ctrl = BdCtrl(0);
            ctrl.set_pkt_int_en(true);
            ctrl.set_last_bd(true);
            ctrl.set_lifm(true);
            ctrl.set_sa_fetch_en(i == 0);
            // SAFETY: indices are within the ring
            unsafe {
                let bd = BufferDescriptor {
                    ctrl: ctrl.0,
                    sa_addr: sa_phys,
                    src_addr: mem.to_physical(staging.add(i * block_size)),
                    dst_addr: 0,
                    next_ptr: mem.to_physical(bds.add((i + 1) % ring_len) as *const u8),
                    upd_ptr: digest_phys,
                    msg_len,
                    enc_off: 0,
                };
                descriptor::publish(mem, bds.add(i), &bd);
            }
        }

        let regs = self.ce.regs();
        regs.intsrc().write(IntFlags::all());
        regs.bdpaddr().write(mem.to_physical(bds as *const u8));
        regs.pollcon().write(u32::from(self.config.stream_poll_interval));
        regs.inten()
            .write(IntFlags::BDPIF | IntFlags::CBDIF | IntFlags::PKTIF);
        regs.con().write(Self::start_flags(true));
        Ok(())
    }

    fn stream_fill(&mut self, mut data: &[u8]) -> CeResult<()> {
        while !data.is_empty() {
            let full = match self.stream.session.as_ref() {
                Some(session) => {
                    session.external_src.is_some() || session.fill == self.config.stream_block_size
                }
                None => return Err(CeError::DRIVER_CE_STREAM_NOT_ACTIVE),
            };
            if full {
                self.stream_submit(false)?;
            }

            let StreamState { ring, session } = &mut self.stream;
            let (Some(ring), Some(session)) = (ring.as_mut(), session.as_mut()) else {
                return Err(CeError::DRIVER_CE_STREAM_NOT_ACTIVE);
            };

            if session.fill == 0
                && !self.mem.is_ram(data.as_ptr())
                && data.as_ptr() as usize % 4 == 0
            {
                let len = data.len().min(MAX_ZERO_COPY_LEN);
                session.external_src = Some(self.mem.to_physical(data.as_ptr()));
                session.fill = len;
                session.consumed += len;
                data = &data[len..];
                continue;
            }

            let len = (ring.block_size - session.fill).min(data.len());
            let offset = session.current * ring.block_size + session.fill;
            // SAFETY: offset + len stays within the current staging buffer
            unsafe {
                let dst = (ring.staging.as_mut_ptr() as *mut u8).add(offset);
                core::ptr::copy_nonoverlapping(data.as_ptr(), self.mem.to_device_view(dst), len);
            }
            session.fill += len;
            session.consumed += len;
            data = &data[len..];
        }
        Ok(())
    }

    /// Hand the current descriptor to the engine and, unless it is the last,
    /// move to the next one once the engine has released it.
    fn stream_submit(&mut self, last: bool) -> CeResult<()> {
        let StreamState { ring, session } = &mut self.stream;
        let (Some(ring), Some(session)) = (ring.as_mut(), session.as_mut()) else {
            return Err(CeError::DRIVER_CE_STREAM_NOT_ACTIVE);
        };
        let mem = &self.mem;

        let slot = session.current;
        let src = match session.external_src.take() {
            Some(src) => src,
            // SAFETY: slot is within the ring
            None => mem.to_physical(unsafe {
                (ring.staging.as_ptr() as *const u8).add(slot * ring.block_size)
            }),
        };

        let mut ctrl = BdCtrl(0);
        ctrl.set_buf_len(if last {
            round_up_word(session.fill)
        } else {
            session.fill
        } as u32);
        ctrl.set_sa_fetch_en(!session.sa_fetched);
        ctrl.set_pkt_int_en(true);
        ctrl.set_last_bd(last);
        ctrl.set_lifm(last);
        ctrl.set_desc_en(true);

        // SAFETY: slot is within the ring, and the engine has released it
        unsafe {
            let bd = ring.bds.as_mut_ptr().add(slot);
            write_device_word(mem, addr_of_mut!((*bd).src_addr), src);
            write_device_word(mem, addr_of_mut!((*bd).msg_len), session.msg_len);
            core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
            write_device_word(mem, addr_of_mut!((*bd).ctrl), ctrl.0);
        }
        session.sa_fetched = true;

        if last {
            session.phase = Phase::Draining;
            return Ok(());
        }

        session.current = (slot + 1) % ring.bds.len();
        session.fill = 0;
        let next = session.current;
        self.wait_ring_idle(next, 1)
    }

    /// Wait until the engine has released `count` descriptors starting at
    /// `first`.
    fn wait_ring_idle(&self, first: usize, count: usize) -> CeResult<()> {
        let ring = self
            .stream
            .ring
            .as_ref()
            .ok_or(CeError::DRIVER_CE_STREAM_NOT_ACTIVE)?;
        let ring_len = ring.bds.len();
        let bds = ring.bds.as_ptr();
        let regs = self.ce.regs();

        let mut fault = false;
        let done = wait::until(self.config.stream_budget, || {
            if regs.stat().read().err_op() != 0 {
                fault = true;
                return true;
            }
            (0..count).all(|k| {
                // SAFETY: indices are within the ring
                let ctrl = unsafe {
                    read_device_word(&self.mem, addr_of!((*bds.add((first + k) % ring_len)).ctrl))
                };
                !BdCtrl(ctrl).desc_en()
            })
        });

        if fault {
            let stat = regs.stat().read();
            cprintln!(
                "[ce] Hash stream failed, ERROP={} ERRPHASE={}",
                stat.err_op(),
                stat.err_phase()
            );
            return Err(CeError::DRIVER_CE_HARDWARE_FAULT);
        }
        done.map_err(|err| {
            cprintln!("[ce] Hash stream descriptor not released");
            err
        })
    }
}
