/*++

Licensed under the Apache-2.0 license.

File Name:

    crypto_engine.rs

Abstract:

    File contains the emulated crypto engine: control registers, descriptor
    processor, hash unit and cipher unit.

--*/

use ce_emu_crypto::{BlockCipher, BlockCipherMode, EndianessTransform, HashAlgo, Hasher};
use ce_registers::ce::{offsets, CeReg, Con, IntFlags, Stat, CE_ADDR};
use ce_registers::layout::{
    algo, crypto_algo, key_size, BdCtrl, BufferDescriptor, SaCtrl, SecurityAssociation,
};
use ce_registers::memory::DeviceMemory;
use ce_registers::{Mmio, MmioMut};
use core::cell::RefCell;
use core::mem::size_of;
use zerocopy::FromBytes;

/// Size of each host address window mapped into the engine's bus.
const WINDOW_SHIFT: u32 = 20;
const WINDOW_SIZE: usize = 1 << WINDOW_SHIFT;
const MAX_WINDOWS: usize = (u32::MAX >> WINDOW_SHIFT) as usize - 1;

/// ERROP value reported for descriptor, SA or bus errors.
const ERR_OP_FAULT: u32 = 0b001;

/// Counters describing what the engine has done so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmuStats {
    pub register_reads: u64,
    pub register_writes: u64,
    pub descriptors_processed: u64,
    pub sa_fetches: u64,
    pub faults: u64,
}

#[derive(Clone)]
enum Unit {
    Hash(Hasher),
    Cipher {
        cipher: BlockCipher,
        mode: BlockCipherMode,
        encrypt: bool,
        key: Vec<u8>,
        iv: Vec<u8>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Processor {
    Idle,
    Running { bd: u32, countdown: u32 },
}

#[derive(Default)]
struct Regs {
    con: Con,
    bdaddr: u32,
    bdpaddr: u32,
    stat: Stat,
    intsrc: IntFlags,
    inten: IntFlags,
    pollcon: u32,
}

struct EmuState {
    regs: Regs,
    processor: Processor,
    unit: Option<Unit>,
    consumed: u32,

    latency: u32,
    stalled: bool,
    fault_pending: bool,

    windows: Vec<usize>,
    read_only: Vec<(usize, usize)>,
    stats: EmuStats,
}

/// Software model of the crypto engine.
///
/// The engine runs on the caller's thread: every register read advances the
/// descriptor processor by one step. Host memory is reached through windows
/// that `to_physical` allocates on demand.
pub struct CryptoEngineEmu {
    state: RefCell<EmuState>,
}

impl Default for CryptoEngineEmu {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoEngineEmu {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(EmuState {
                regs: Regs::default(),
                processor: Processor::Idle,
                unit: None,
                consumed: 0,
                latency: 0,
                stalled: false,
                fault_pending: false,
                windows: Vec::new(),
                read_only: Vec::new(),
                stats: EmuStats::default(),
            }),
        }
    }

    /// Register file of this engine, for constructing a driver.
    pub fn ce_reg(&self) -> CeReg<&Self> {
        // SAFETY: the emulator decodes register addresses relative to CE_ADDR
        // and never dereferences them.
        unsafe { CeReg::new_with_mmio(CE_ADDR as usize as *mut u32, self) }
    }

    /// Number of register reads between two processed descriptors.
    pub fn set_latency(&self, steps: u32) {
        self.state.borrow_mut().latency = steps;
    }

    /// While stalled the descriptor processor makes no progress.
    pub fn set_stalled(&self, stalled: bool) {
        self.state.borrow_mut().stalled = stalled;
    }

    /// The next descriptor processed stops the engine with an error.
    pub fn inject_fault(&self) {
        self.state.borrow_mut().fault_pending = true;
    }

    /// Marks `region` as immutable, non-RAM memory (flash).
    pub fn map_read_only(&self, region: &[u8]) {
        let start = region.as_ptr() as usize;
        self.state
            .borrow_mut()
            .read_only
            .push((start, start + region.len()));
    }

    pub fn stats(&self) -> EmuStats {
        self.state.borrow().stats
    }

    /// True when no descriptor chain is being processed.
    pub fn is_idle(&self) -> bool {
        self.state.borrow().processor == Processor::Idle
    }

    /// Value of the CON register without advancing the engine.
    pub fn con(&self) -> Con {
        self.state.borrow().regs.con
    }
}

impl EmuState {
    fn host_ptr(&self, phys: u32) -> Option<*mut u8> {
        let idx = (phys >> WINDOW_SHIFT).checked_sub(1)? as usize;
        let base = self.windows.get(idx)?;
        Some((base + (phys as usize & (WINDOW_SIZE - 1))) as *mut u8)
    }

    fn physical(&mut self, ptr: *const u8) -> u32 {
        let addr = ptr as usize;
        let idx = match self
            .windows
            .iter()
            .position(|&base| addr >= base && addr - base < WINDOW_SIZE)
        {
            Some(idx) => idx,
            None => {
                assert!(
                    self.windows.len() < MAX_WINDOWS,
                    "crypto engine emulator ran out of address windows"
                );
                self.windows.push(addr);
                self.windows.len() - 1
            }
        };
        (((idx + 1) as u32) << WINDOW_SHIFT) | (addr - self.windows[idx]) as u32
    }

    fn read_reg(&mut self, offset: usize) -> u32 {
        self.stats.register_reads += 1;
        self.step();
        match offset {
            offsets::CON => self.regs.con.bits(),
            offsets::BDADDR => self.regs.bdaddr,
            offsets::BDPADDR => self.regs.bdpaddr,
            offsets::STAT => self.regs.stat.0,
            offsets::INTSRC => self.regs.intsrc.bits(),
            offsets::INTEN => self.regs.inten.bits(),
            offsets::POLLCON => self.regs.pollcon,
            _ => 0,
        }
    }

    fn write_reg(&mut self, offset: usize, val: u32) {
        self.stats.register_writes += 1;
        match offset {
            offsets::CON => self.write_con(Con::from_bits_truncate(val)),
            offsets::BDPADDR => self.regs.bdpaddr = val,
            offsets::INTSRC => self.regs.intsrc &= !IntFlags::from_bits_truncate(val),
            offsets::INTEN => self.regs.inten = IntFlags::from_bits_truncate(val),
            offsets::POLLCON => self.regs.pollcon = val & 0xFFFF,
            _ => {}
        }
    }

    fn write_con(&mut self, con: Con) {
        if con.contains(Con::SWRST) {
            self.regs = Regs::default();
            self.processor = Processor::Idle;
            self.unit = None;
            self.consumed = 0;
            return;
        }
        self.regs.con = con;
        if con.contains(Con::DMAEN | Con::BDPCHST) && self.processor == Processor::Idle {
            self.regs.bdaddr = self.regs.bdpaddr;
            self.regs.stat.set_active(true);
            self.processor = Processor::Running {
                bd: self.regs.bdpaddr,
                countdown: self.latency,
            };
        }
    }

    fn stop(&mut self) {
        self.processor = Processor::Idle;
        self.regs.stat.set_active(false);
    }

    fn fault(&mut self, phase: u32) {
        self.stats.faults += 1;
        self.regs.stat.set_err_op(ERR_OP_FAULT);
        self.regs.stat.set_err_phase(phase);
        self.stop();
    }

    fn step(&mut self) {
        let Processor::Running { bd, countdown } = self.processor else {
            return;
        };
        if self.stalled {
            return;
        }
        if countdown > 0 {
            self.processor = Processor::Running {
                bd,
                countdown: countdown - 1,
            };
            return;
        }
        self.process_descriptor(bd);
    }

    fn process_descriptor(&mut self, bd_phys: u32) {
        let Some(bd_ptr) = self.host_ptr(bd_phys) else {
            return self.fault(0);
        };
        if bd_ptr as usize % 8 != 0 {
            return self.fault(0);
        }
        // SAFETY: the driver keeps its descriptors alive while the engine runs
        let bd = unsafe {
            let bytes = core::slice::from_raw_parts(bd_ptr, size_of::<BufferDescriptor>());
            match BufferDescriptor::read_from_bytes(bytes) {
                Ok(bd) => bd,
                Err(_) => return self.fault(0),
            }
        };
        let mut ctrl = BdCtrl(bd.ctrl);

        if !ctrl.desc_en() {
            if !self.regs.con.contains(Con::BDPPLEN) {
                self.stop();
            }
            return;
        }

        if core::mem::take(&mut self.fault_pending) {
            return self.fault(1);
        }

        if ctrl.sa_fetch_en() {
            self.stats.sa_fetches += 1;
            match self.fetch_sa(bd.sa_addr) {
                Some(unit) => {
                    self.unit = Some(unit);
                    self.consumed = 0;
                }
                None => return self.fault(1),
            }
        }

        let len = ctrl
            .buf_len()
            .min(bd.msg_len.saturating_sub(self.consumed)) as usize;
        let Some(src) = self.host_ptr(bd.src_addr) else {
            return self.fault(2);
        };
        // SAFETY: the driver keeps the source buffer alive while the engine runs
        let mut data = unsafe { core::slice::from_raw_parts(src, len) }.to_vec();
        if !self.regs.con.contains(Con::SWAPEN) {
            data.change_endianess();
        }
        let swap_out = !self.regs.con.contains(Con::SWAPOEN);

        let output = match self.unit.as_mut() {
            Some(Unit::Hash(hasher)) => {
                hasher.update(&data);
                if ctrl.lifm() {
                    let mut digest = [0u8; 32];
                    let digest_len = hasher.algo().digest_size();
                    hasher.finalize_into(&mut digest);
                    Some((bd.upd_ptr, digest[..digest_len].to_vec()))
                } else {
                    None
                }
            }
            Some(Unit::Cipher {
                cipher,
                mode,
                encrypt,
                key,
                iv,
            }) => {
                if cipher.apply(*mode, *encrypt, key, iv, &mut data).is_err() {
                    return self.fault(2);
                }
                data.resize(data.len().next_multiple_of(4), 0);
                Some((bd.dst_addr, data))
            }
            None => return self.fault(1),
        };

        if let Some((dst_phys, mut out)) = output {
            let Some(dst) = self.host_ptr(dst_phys) else {
                return self.fault(3);
            };
            if swap_out {
                out.change_endianess();
            }
            // SAFETY: the driver sizes the destination for the rounded length
            unsafe { core::ptr::copy_nonoverlapping(out.as_ptr(), dst, out.len()) };
        }

        self.consumed = if ctrl.lifm() {
            0
        } else {
            self.consumed + len as u32
        };

        ctrl.set_desc_en(false);
        // SAFETY: bd_ptr was validated above
        unsafe { core::ptr::write_volatile(bd_ptr as *mut u32, ctrl.0) };
        self.stats.descriptors_processed += 1;

        self.regs.intsrc |= IntFlags::CBDIF;
        if ctrl.lifm() && ctrl.pkt_int_en() {
            self.regs.intsrc |= IntFlags::PKTIF;
        }
        if ctrl.last_bd() {
            self.regs.intsrc |= IntFlags::BDPIF;
            self.stop();
        } else {
            self.regs.bdaddr = bd.next_ptr;
            self.processor = Processor::Running {
                bd: bd.next_ptr,
                countdown: self.latency,
            };
        }
    }

    fn fetch_sa(&self, sa_phys: u32) -> Option<Unit> {
        let sa_ptr = self.host_ptr(sa_phys)?;
        if sa_ptr as usize % 8 != 0 {
            return None;
        }
        // SAFETY: the driver keeps the SA alive while the engine runs
        let bytes = unsafe { core::slice::from_raw_parts(sa_ptr, size_of::<SecurityAssociation>()) };
        let sa = SecurityAssociation::read_from_bytes(bytes).ok()?;
        let ctrl = SaCtrl(sa.ctrl);

        let hash = match ctrl.algo() {
            algo::SHA1 => Some(HashAlgo::Sha1),
            algo::SHA256 => Some(HashAlgo::Sha256),
            algo::MD5 => Some(HashAlgo::Md5),
            _ => None,
        };
        if let Some(hash) = hash {
            return Some(Unit::Hash(Hasher::new(hash)));
        }

        let (cipher, mode, key_len) = match (ctrl.algo(), ctrl.crypto_algo()) {
            (algo::AES, sub) => {
                let mode = match sub {
                    crypto_algo::AES_ECB => BlockCipherMode::Ecb,
                    crypto_algo::AES_CBC => BlockCipherMode::Cbc,
                    crypto_algo::AES_CTR => BlockCipherMode::Ctr,
                    _ => return None,
                };
                let key_len = match ctrl.key_size() {
                    key_size::BITS_128 => 16,
                    key_size::BITS_192 => 24,
                    key_size::BITS_256 => 32,
                    _ => return None,
                };
                (BlockCipher::Aes, mode, key_len)
            }
            (algo::DES, crypto_algo::DES_ECB) => (BlockCipher::Des, BlockCipherMode::Ecb, 8),
            (algo::DES, crypto_algo::DES_CBC) => (BlockCipher::Des, BlockCipherMode::Cbc, 8),
            (algo::TDES, crypto_algo::TDES_ECB) => (BlockCipher::TripleDes, BlockCipherMode::Ecb, 24),
            (algo::TDES, crypto_algo::TDES_CBC) => (BlockCipher::TripleDes, BlockCipherMode::Cbc, 24),
            _ => return None,
        };

        let iv_len = cipher.block_size();
        let iv = if ctrl.load_iv() {
            right_justified(&sa.enc_iv, iv_len)
        } else {
            vec![0u8; iv_len]
        };
        Some(Unit::Cipher {
            cipher,
            mode,
            encrypt: ctrl.enc_type(),
            key: right_justified(&sa.enc_key, key_len),
            iv,
        })
    }
}

/// Recovers `len` bytes stored right-justified, one big-endian word per 4 bytes.
fn right_justified(slot: &[u32], len: usize) -> Vec<u8> {
    slot[slot.len() - len / 4..]
        .iter()
        .flat_map(|word| word.to_be_bytes())
        .collect()
}

fn reg_offset(ptr: *const u32) -> usize {
    (ptr as usize).wrapping_sub(CE_ADDR as usize)
}

unsafe impl Mmio for CryptoEngineEmu {
    unsafe fn read_volatile(&self, src: *const u32) -> u32 {
        self.state.borrow_mut().read_reg(reg_offset(src))
    }
}

unsafe impl MmioMut for CryptoEngineEmu {
    unsafe fn write_volatile(&self, dst: *mut u32, src: u32) {
        self.state.borrow_mut().write_reg(reg_offset(dst), src)
    }
}

impl DeviceMemory for CryptoEngineEmu {
    fn to_device_view(&self, ptr: *const u8) -> *mut u8 {
        ptr as *mut u8
    }

    fn to_physical(&self, ptr: *const u8) -> u32 {
        self.state.borrow_mut().physical(ptr)
    }

    fn invalidate_cache(&self, _ptr: *const u8, _len: usize) {}

    fn sync_for_device(&self, _ptr: *const u8, _len: usize) {}

    fn is_ram(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        !self
            .state
            .borrow()
            .read_only
            .iter()
            .any(|&(start, end)| addr >= start && addr < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest;

    #[repr(C, align(8))]
    struct Job {
        sa: SecurityAssociation,
        bd: BufferDescriptor,
        digest: [u8; 32],
    }

    fn hash_job(emu: &CryptoEngineEmu, job: &mut Job, data: &[u8]) {
        let mut sa_ctrl = SaCtrl(0);
        sa_ctrl.set_algo(algo::SHA256);
        sa_ctrl.set_enc_type(true);
        job.sa.ctrl = sa_ctrl.0;

        let mut ctrl = BdCtrl(0);
        ctrl.set_buf_len(data.len() as u32);
        ctrl.set_sa_fetch_en(true);
        ctrl.set_lifm(true);
        ctrl.set_last_bd(true);
        ctrl.set_pkt_int_en(true);
        ctrl.set_desc_en(true);
        job.bd = BufferDescriptor {
            ctrl: ctrl.0,
            sa_addr: emu.to_physical(core::ptr::addr_of!(job.sa).cast()),
            src_addr: emu.to_physical(data.as_ptr()),
            upd_ptr: emu.to_physical(job.digest.as_mut_ptr()),
            msg_len: data.len() as u32,
            ..Default::default()
        };

        let regs = emu.ce_reg().regs();
        regs.con().write(Con::SWRST);
        regs.bdpaddr()
            .write(emu.to_physical(core::ptr::addr_of_mut!(job.bd).cast()));
        regs.con()
            .write(Con::DMAEN | Con::BDPCHST | Con::SWAPEN | Con::SWAPOEN);
    }

    fn bd_ctrl(job: &Job) -> BdCtrl {
        BdCtrl(unsafe { core::ptr::read_volatile(&job.bd.ctrl) })
    }

    #[test]
    fn test_window_translation() {
        let emu = CryptoEngineEmu::new();
        let buf = [0u8; 64];
        let phys = emu.to_physical(buf.as_ptr());
        assert_eq!(emu.to_physical(buf[16..].as_ptr()), phys + 16);
        assert_eq!(
            emu.state.borrow().host_ptr(phys + 8),
            Some(buf[8..].as_ptr() as *mut u8)
        );
        assert_eq!(emu.state.borrow().host_ptr(0), None);
    }

    #[test]
    fn test_sha256_descriptor() {
        let emu = CryptoEngineEmu::new();
        emu.set_latency(3);
        let mut job = Job {
            sa: SecurityAssociation::default(),
            bd: BufferDescriptor::default(),
            digest: [0u8; 32],
        };
        let data = *b"abcd";
        hash_job(&emu, &mut job, &data);

        let regs = emu.ce_reg().regs();
        let mut polls = 0;
        while !regs.intsrc().read().contains(IntFlags::PKTIF) {
            polls += 1;
            assert!(polls < 10);
        }
        assert!(polls >= 3);
        assert!(emu.is_idle());
        assert!(!bd_ctrl(&job).desc_en());
        assert_eq!(job.digest.as_slice(), sha2::Sha256::digest(data).as_slice());
        assert_eq!(emu.stats().descriptors_processed, 1);
    }

    #[test]
    fn test_injected_fault() {
        let emu = CryptoEngineEmu::new();
        emu.inject_fault();
        let mut job = Job {
            sa: SecurityAssociation::default(),
            bd: BufferDescriptor::default(),
            digest: [0u8; 32],
        };
        hash_job(&emu, &mut job, b"abcd");

        let regs = emu.ce_reg().regs();
        assert_eq!(regs.stat().read().err_op(), ERR_OP_FAULT);
        assert!(!regs.intsrc().read().contains(IntFlags::PKTIF));
        assert!(bd_ctrl(&job).desc_en());

        regs.con().write(Con::SWRST);
        assert_eq!(regs.stat().read().err_op(), 0);
        assert_eq!(regs.con().read(), Con::empty());
    }

    #[test]
    fn test_stall() {
        let emu = CryptoEngineEmu::new();
        emu.set_stalled(true);
        let mut job = Job {
            sa: SecurityAssociation::default(),
            bd: BufferDescriptor::default(),
            digest: [0u8; 32],
        };
        hash_job(&emu, &mut job, b"abcd");
        let regs = emu.ce_reg().regs();
        for _ in 0..100 {
            assert!(!regs.intsrc().read().contains(IntFlags::PKTIF));
        }
        emu.set_stalled(false);
        assert!(regs.intsrc().read().contains(IntFlags::PKTIF));
    }

    #[test]
    fn test_right_justified() {
        let slot = [0, 0, 0, 0, 0, 0, 0x0102_0304, 0x0506_0708];
        assert_eq!(right_justified(&slot, 8), [1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
