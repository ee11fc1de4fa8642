/*++

Licensed under the Apache-2.0 license.

File Name:

    crypto_engine.rs

Abstract:

    File contains API for submitting one-shot cipher and hash jobs to the
    crypto engine.

--*/

use crate::descriptor::{self, job_bd_ctrl, round_up_word, SaParams};
use crate::hash_stream::StreamState;
use crate::hw_mutex::EngineLockGuard;
use crate::printer::HexWord;
use crate::wait::{self, WaitBudget};
use crate::{cprintln, Algorithm, CeError, CeResult, CipherMode, Direction, HwMutex};
use ce_registers::ce::{CeReg, Con, IntFlags};
use ce_registers::layout::{BufferDescriptor, SecurityAssociation, BD_MAX_BUFLEN};
use ce_registers::memory::DeviceMemory;
use ce_registers::MmioMut;
use zerocopy::IntoBytes;
use zeroize::Zeroize;

/// Largest input a single buffer descriptor can carry.
pub const MAX_JOB_INPUT_LEN: usize = (BD_MAX_BUFLEN as usize) & !3;

const DEFAULT_JOB_POLLS: u32 = 0x00FF_FFFF;
const DEFAULT_RESET_POLLS: u32 = 0x0000_FFFF;
const DEFAULT_STREAM_BLOCK_SIZE: usize = 256;
const MIN_STREAM_BLOCK_SIZE: usize = 64;
const MAX_STREAM_BLOCK_SIZE: usize = 32 * 1024;
const DEFAULT_STREAM_RING_LEN: usize = 2;
const DEFAULT_STREAM_POLL_INTERVAL: u16 = 10;

/// Runtime configuration of a [`CryptoEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Completion poll budget of a one-shot job.
    pub job_budget: WaitBudget,

    /// Poll budget for a software reset to take effect.
    pub reset_budget: WaitBudget,

    /// Poll budget while a hash stream waits for a free or finished descriptor.
    pub stream_budget: WaitBudget,

    /// Size of each hash stream staging buffer in bytes.
    pub stream_block_size: usize,

    /// Number of descriptors in the hash stream ring.
    pub stream_ring_len: usize,

    /// Descriptor poll interval programmed while streaming, in engine clocks.
    pub stream_poll_interval: u16,

    /// Upper bound on the hash cache's heap buffer; `None` for no bound.
    pub hash_cache_limit: Option<usize>,

    /// Write a 0x80 byte after cached hash data before finalizing.
    pub hash_pad_marker: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            job_budget: WaitBudget::Polls(DEFAULT_JOB_POLLS),
            reset_budget: WaitBudget::Polls(DEFAULT_RESET_POLLS),
            stream_budget: WaitBudget::Unbounded,
            stream_block_size: DEFAULT_STREAM_BLOCK_SIZE,
            stream_ring_len: DEFAULT_STREAM_RING_LEN,
            stream_poll_interval: DEFAULT_STREAM_POLL_INTERVAL,
            hash_cache_limit: None,
            hash_pad_marker: true,
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> CeResult<()> {
        if self.stream_block_size < MIN_STREAM_BLOCK_SIZE
            || self.stream_block_size > MAX_STREAM_BLOCK_SIZE
            || self.stream_block_size % 4 != 0
            || self.stream_ring_len == 0
        {
            return Err(CeError::DRIVER_CE_INVALID_CONFIG);
        }
        Ok(())
    }
}

/// One job for the engine: one security association, one descriptor.
pub struct Job<'a> {
    pub input: &'a [u8],

    /// Cipher output, or the digest (seeded into the partial digest slot
    /// before the job runs).
    pub output: &'a mut [u8],

    pub direction: Direction,
    pub algorithm: Algorithm,
    pub mode: Option<CipherMode>,
    pub key: Option<&'a [u8]>,

    /// Replaced with the chaining IV when the job succeeds.
    pub iv: Option<&'a mut [u8]>,
}

pub trait CipherEngine {
    /// Encrypt or decrypt `input` into `output`.
    ///
    /// # Arguments
    ///
    /// * `key` - Cipher key
    /// * `iv` - Initialization vector; replaced with the chaining IV on success
    /// * `output` - Output buffer, at least `input.len()` rounded up to a word
    /// * `input` - Input buffer
    /// * `direction` - Encrypt or decrypt
    /// * `algorithm` - Cipher algorithm
    /// * `mode` - Cipher mode
    #[allow(clippy::too_many_arguments)]
    fn submit_cipher(
        &mut self,
        key: &[u8],
        iv: Option<&mut [u8]>,
        output: &mut [u8],
        input: &[u8],
        direction: Direction,
        algorithm: Algorithm,
        mode: CipherMode,
    ) -> CeResult<()>;
}

pub trait HashEngine {
    fn config(&self) -> &EngineConfig;

    /// Hash `input` with a single job; `digest` receives the leading
    /// `digest.len()` bytes.
    fn hash_once(&mut self, input: &[u8], digest: &mut [u8], algorithm: Algorithm)
        -> CeResult<()>;

    /// Begin streaming a message of exactly `msg_len` bytes.
    fn hash_stream_reset(&mut self, algorithm: Algorithm, msg_len: usize) -> CeResult<()>;

    fn hash_stream_update(&mut self, data: &[u8]) -> CeResult<()>;

    /// Submit the last descriptor of the message.
    fn hash_stream_start(&mut self) -> CeResult<()>;

    /// Wait for the message digest and end the stream.
    fn hash_stream_wait(&mut self, digest: &mut [u8]) -> CeResult<()>;

    /// Stop the engine and end the stream, if one is active.
    fn hash_stream_abort(&mut self);
}

/// Crypto engine driver.
pub struct CryptoEngine<TMmio: MmioMut + Copy, TMem: DeviceMemory, TLock: HwMutex> {
    pub(crate) ce: CeReg<TMmio>,
    pub(crate) mem: TMem,
    pub(crate) lock: TLock,
    pub(crate) config: EngineConfig,
    pub(crate) stream: StreamState,
}

#[repr(C, align(8))]
#[derive(Default)]
struct DigestScratch([u32; 8]);

impl<TMmio: MmioMut + Copy, TMem: DeviceMemory, TLock: HwMutex> CryptoEngine<TMmio, TMem, TLock> {
    pub fn new(ce: CeReg<TMmio>, mem: TMem, lock: TLock, config: EngineConfig) -> CeResult<Self> {
        config.validate()?;
        Ok(Self {
            ce,
            mem,
            lock,
            config,
            stream: StreamState::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one job to completion.
    ///
    /// Validation happens before the engine is touched. The engine lock is
    /// held for the duration of the job only.
    pub fn submit(&mut self, mut job: Job) -> CeResult<()> {
        let len = job.input.len();
        if len == 0 {
            return Err(CeError::DRIVER_CE_EMPTY_INPUT);
        }
        if len > MAX_JOB_INPUT_LEN {
            return Err(CeError::DRIVER_CE_INPUT_TOO_LARGE);
        }

        let hash = job.algorithm.is_hash();
        let written = match job.algorithm.digest_size() {
            Some(digest_size) if hash => {
                if job.output.len() < digest_size {
                    return Err(CeError::DRIVER_CE_INVALID_OUTPUT_SIZE);
                }
                round_up_word(digest_size)
            }
            _ => {
                if job.output.len() < round_up_word(len) {
                    return Err(CeError::DRIVER_CE_INVALID_OUTPUT_SIZE);
                }
                round_up_word(len)
            }
        };

        let mut sa = descriptor::build_sa(&SaParams {
            algorithm: job.algorithm,
            mode: job.mode,
            direction: job.direction,
            key: job.key,
            iv: job.iv.as_deref(),
            auth_iv: if hash { Some(&*job.output) } else { None },
        })?;

        if job.input.as_ptr() as usize % 4 != 0 || job.output.as_ptr() as usize % 4 != 0 {
            sa.zeroize();
            return Err(CeError::DRIVER_CE_BUFFER_ALIGNMENT);
        }

        let result = self.run_job(&sa, job.input, job.output, written, hash);
        sa.zeroize();
        result?;

        Self::copy_out(&self.mem, job.output, written);

        if let Some(iv) = job.iv.as_deref_mut() {
            let chain = match job.direction {
                Direction::Encrypt => &job.output[..len],
                Direction::Decrypt => job.input,
            };
            if chain.len() >= iv.len() {
                iv.copy_from_slice(&chain[chain.len() - iv.len()..]);
            }
        }
        Ok(())
    }

    fn run_job(
        &self,
        sa: &SecurityAssociation,
        input: &[u8],
        output: &mut [u8],
        written: usize,
        hash: bool,
    ) -> CeResult<()> {
        let mut sa_slot = SecurityAssociation::default();
        let mut bd_slot = BufferDescriptor::default();
        let sa_ptr: *mut SecurityAssociation = &mut sa_slot;
        let bd_ptr: *mut BufferDescriptor = &mut bd_slot;
        let out_ptr = output.as_mut_ptr();

        let _guard = EngineLockGuard::acquire(&self.lock)?;

        if self.mem.is_ram(input.as_ptr()) {
            self.mem.sync_for_device(input.as_ptr(), input.len());
        }
        if !hash {
            // SAFETY: output holds at least `written` bytes
            unsafe { core::ptr::write_bytes(self.mem.to_device_view(out_ptr), 0, written) };
        }

        let out_phys = self.mem.to_physical(out_ptr);
        let bd = BufferDescriptor {
            ctrl: job_bd_ctrl(input.len()).0,
            sa_addr: self.mem.to_physical(sa_ptr as *const u8),
            src_addr: self.mem.to_physical(input.as_ptr()),
            dst_addr: if hash { 0 } else { out_phys },
            next_ptr: self.mem.to_physical(bd_ptr as *const u8),
            upd_ptr: if hash { out_phys } else { 0 },
            msg_len: input.len() as u32,
            enc_off: 0,
        };

        // SAFETY: both slots are live locals of this frame
        unsafe {
            descriptor::publish(&self.mem, sa_ptr, sa);
            descriptor::publish(&self.mem, bd_ptr, &bd);
        }

        let result = self.execute(bd.next_ptr);

        // SAFETY: sa_ptr is a live local of this frame
        unsafe { descriptor::publish(&self.mem, sa_ptr, &SecurityAssociation::default()) };
        sa_slot.zeroize();
        result
    }

    fn execute(&self, bd_phys: u32) -> CeResult<()> {
        self.software_reset()?;

        let regs = self.ce.regs();
        regs.intsrc().write(IntFlags::all());
        regs.bdpaddr().write(bd_phys);
        regs.inten()
            .write(IntFlags::BDPIF | IntFlags::CBDIF | IntFlags::PKTIF);
        regs.con().write(Self::start_flags(false));

        let done = wait::until(self.config.job_budget, || {
            regs.intsrc().read().contains(IntFlags::PKTIF) || regs.stat().read().err_op() != 0
        });
        let stat = regs.stat().read();
        regs.intsrc().write(IntFlags::all());

        if done.is_err() || stat.err_op() != 0 {
            if done.is_err() {
                cprintln!("[ce] Job did not complete, BDADDR={}", HexWord(regs.bdaddr().read()));
            } else {
                cprintln!(
                    "[ce] Job failed, ERROP={} ERRPHASE={} ERRMODE={}",
                    stat.err_op(),
                    stat.err_phase(),
                    stat.err_mode()
                );
            }
            // Stop DMA before the descriptor leaves scope.
            let _ = self.software_reset();
            return Err(CeError::DRIVER_CE_HARDWARE_FAULT);
        }
        Ok(())
    }

    /// Moves the engine's result into canonical byte order in `output`.
    pub(crate) fn copy_out(mem: &TMem, output: &mut [u8], written: usize) {
        let view = mem.to_device_view(output.as_ptr());
        cfg_if::cfg_if! {
            if #[cfg(feature = "no-out-swap")] {
                use crate::EndianSwap;
                for (i, word) in output[..written].chunks_exact_mut(4).enumerate() {
                    // SAFETY: view aliases output, which holds `written` bytes
                    let val = unsafe { core::ptr::read_volatile((view as *const u32).add(i)) };
                    word.copy_from_slice(&val.to_ne_bytes());
                    word.swap_words();
                }
            } else {
                mem.invalidate_cache(output.as_ptr(), written);
                // SAFETY: view aliases output, which holds `written` bytes
                unsafe { core::ptr::copy(view, output.as_mut_ptr(), written) };
            }
        }
    }

    /// Reset the engine and wait for CON to clear.
    pub(crate) fn software_reset(&self) -> CeResult<()> {
        let regs = self.ce.regs();
        regs.con().write(Con::SWRST);
        wait::until(self.config.reset_budget, || regs.con().read().is_empty()).map_err(|err| {
            cprintln!("[ce] Software reset did not complete");
            err
        })
    }

    pub(crate) fn start_flags(polling: bool) -> Con {
        let mut con = Con::DMAEN | Con::BDPCHST | Con::SWAPEN;
        if polling {
            con |= Con::BDPPLEN;
        }
        cfg_if::cfg_if! {
            if #[cfg(not(feature = "no-out-swap"))] {
                con |= Con::SWAPOEN;
            }
        }
        con
    }

    /// Hash `input` with a single job.
    ///
    /// The digest lands in an engine-aligned scratch buffer, so `digest`
    /// may have any alignment.
    pub fn hash_once(
        &mut self,
        input: &[u8],
        digest: &mut [u8],
        algorithm: Algorithm,
    ) -> CeResult<()> {
        let digest_size = match algorithm {
            Algorithm::HmacSha1 => return Err(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM),
            _ => algorithm
                .digest_size()
                .ok_or(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM)?,
        };
        if digest.len() > digest_size {
            return Err(CeError::DRIVER_CE_INVALID_OUTPUT_SIZE);
        }
        if input.is_empty() {
            // The engine cannot run an empty job.
            let empty = algorithm
                .empty_digest()
                .ok_or(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM)?;
            digest.copy_from_slice(&empty[..digest.len()]);
            return Ok(());
        }

        let mut scratch = DigestScratch::default();
        self.submit(Job {
            input,
            output: &mut scratch.0.as_mut_bytes()[..digest_size],
            direction: Direction::Encrypt,
            algorithm,
            mode: None,
            key: None,
            iv: None,
        })?;
        digest.copy_from_slice(&scratch.0.as_bytes()[..digest.len()]);
        Ok(())
    }

    /// Encrypt or decrypt with a single job. See [`CipherEngine::submit_cipher`].
    #[allow(clippy::too_many_arguments)]
    pub fn submit_cipher(
        &mut self,
        key: &[u8],
        iv: Option<&mut [u8]>,
        output: &mut [u8],
        input: &[u8],
        direction: Direction,
        algorithm: Algorithm,
        mode: CipherMode,
    ) -> CeResult<()> {
        if algorithm.is_hash() {
            return Err(CeError::DRIVER_CE_UNSUPPORTED_ALGORITHM);
        }
        if mode.needs_whole_blocks() && input.len() % algorithm.block_size() != 0 {
            return Err(CeError::DRIVER_CE_INVALID_BLOCK_MULTIPLE);
        }
        self.submit(Job {
            input,
            output,
            direction,
            algorithm,
            mode: Some(mode),
            key: Some(key),
            iv,
        })
    }
}

impl<TMmio: MmioMut + Copy, TMem: DeviceMemory, TLock: HwMutex> CipherEngine
    for CryptoEngine<TMmio, TMem, TLock>
{
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
        CryptoEngine::submit_cipher(self, key, iv, output, input, direction, algorithm, mode)
    }
}

impl<TMmio: MmioMut + Copy, TMem: DeviceMemory, TLock: HwMutex> HashEngine
    for CryptoEngine<TMmio, TMem, TLock>
{
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn hash_once(
        &mut self,
        input: &[u8],
        digest: &mut [u8],
        algorithm: Algorithm,
    ) -> CeResult<()> {
        CryptoEngine::hash_once(self, input, digest, algorithm)
    }

    fn hash_stream_reset(&mut self, algorithm: Algorithm, msg_len: usize) -> CeResult<()> {
        CryptoEngine::hash_stream_reset(self, algorithm, msg_len)
    }

    fn hash_stream_update(&mut self, data: &[u8]) -> CeResult<()> {
        CryptoEngine::hash_stream_update(self, data)
    }

    fn hash_stream_start(&mut self) -> CeResult<()> {
        CryptoEngine::hash_stream_start(self)
    }

    fn hash_stream_wait(&mut self, digest: &mut [u8]) -> CeResult<()> {
        CryptoEngine::hash_stream_wait(self, digest)
    }

    fn hash_stream_abort(&mut self) {
        CryptoEngine::hash_stream_abort(self)
    }
}

impl<TMmio: MmioMut + Copy, TMem: DeviceMemory, TLock: HwMutex> Drop
    for CryptoEngine<TMmio, TMem, TLock>
{
    fn drop(&mut self) {
        self.hash_stream_abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(EngineConfig::default().validate().is_ok());
        for (block_size, ring_len) in [(32, 2), (64 * 1024, 2), (258, 2), (256, 0)] {
            let config = EngineConfig {
                stream_block_size: block_size,
                stream_ring_len: ring_len,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(CeError::DRIVER_CE_INVALID_CONFIG));
        }
    }

    #[test]
    fn test_max_job_input() {
        assert_eq!(MAX_JOB_INPUT_LEN, 65532);
        assert_eq!(round_up_word(MAX_JOB_INPUT_LEN), MAX_JOB_INPUT_LEN);
    }
}
