// Licensed under the Apache-2.0 license
//
//! Crypto engine control register block.

use crate::{Mmio, RealMmio, RegRef, RegValue};
use bitfield::bitfield;
use bitflags::bitflags;

/// Base address of the crypto engine register file.
pub const CE_ADDR: u32 = 0xBF8E_5000;

pub mod offsets {
    pub const CON: usize = 0x00;
    pub const BDADDR: usize = 0x10;
    pub const BDPADDR: usize = 0x20;
    pub const STAT: usize = 0x30;
    pub const INTSRC: usize = 0x40;
    pub const INTEN: usize = 0x50;
    pub const POLLCON: usize = 0x60;

    /// Size of the register window in bytes.
    pub const SIZE: usize = 0x70;
}

bitflags! {
    /// CECON: engine control
    #[derive(Default)]
    pub struct Con : u32 {
        /// DMA enable
        const DMAEN = 1 << 0;
        /// Descriptor processor poll enable
        const BDPPLEN = 1 << 1;
        /// Descriptor processor channel start
        const BDPCHST = 1 << 2;
        /// Input data byte swap
        const SWAPEN = 1 << 5;
        /// Software reset
        const SWRST = 1 << 6;
        /// Output data byte swap
        const SWAPOEN = 1 << 7;
    }
}

bitflags! {
    /// CEINTSRC / CEINTEN
    #[derive(Default)]
    pub struct IntFlags : u32 {
        /// Descriptor processor done
        const BDPIF = 1 << 0;
        /// Current descriptor done
        const CBDIF = 1 << 1;
        /// Packet done
        const PKTIF = 1 << 2;
        /// Access response error
        const AREIF = 1 << 3;
    }
}

impl RegValue for Con {
    fn from_raw(raw: u32) -> Self {
        Con::from_bits_truncate(raw)
    }
    fn to_raw(self) -> u32 {
        self.bits()
    }
}

impl RegValue for IntFlags {
    fn from_raw(raw: u32) -> Self {
        IntFlags::from_bits_truncate(raw)
    }
    fn to_raw(self) -> u32 {
        self.bits()
    }
}

bitfield! {
    /// CESTAT: engine status
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Stat(u32);
    impl Debug;

    /// Descriptor processor active
    pub bool, active, set_active: 0;

    /// Phase in which the error occurred
    pub u32, err_phase, set_err_phase: 23, 22;

    /// Non-zero when the engine stopped on an error
    pub u32, err_op, set_err_op: 26, 24;

    /// Engine mode at the time of the error
    pub u32, err_mode, set_err_mode: 29, 27;
}

impl RegValue for Stat {
    fn from_raw(raw: u32) -> Self {
        Stat(raw)
    }
    fn to_raw(self) -> u32 {
        self.0
    }
}

/// Typed view over the crypto engine registers.
#[derive(Clone, Copy)]
pub struct RegisterBlock<TMmio: Mmio> {
    ptr: *mut u32,
    mmio: TMmio,
}

impl RegisterBlock<RealMmio> {
    /// # Safety
    ///
    /// The caller is responsible for ensuring that ptr is valid for
    /// volatile reads and writes at any of the offsets in this register
    /// block.
    #[inline(always)]
    pub unsafe fn new(ptr: *mut u32) -> Self {
        Self {
            ptr,
            mmio: RealMmio,
        }
    }
}

impl<TMmio: Mmio> RegisterBlock<TMmio> {
    /// # Safety
    ///
    /// The caller is responsible for ensuring that ptr is valid for
    /// volatile reads and writes at any of the offsets in this register
    /// block.
    #[inline(always)]
    pub unsafe fn new_with_mmio(ptr: *mut u32, mmio: TMmio) -> Self {
        Self { ptr, mmio }
    }

    #[inline(always)]
    fn reg<T: RegValue>(&self, offset: usize) -> RegRef<'_, TMmio, T> {
        // SAFETY: offsets are within the block described by `new_with_mmio`
        unsafe { RegRef::new_with_mmio(self.ptr.wrapping_byte_add(offset), &self.mmio) }
    }

    pub fn con(&self) -> RegRef<'_, TMmio, Con> {
        self.reg(offsets::CON)
    }

    /// Address of the descriptor currently being processed.
    pub fn bdaddr(&self) -> RegRef<'_, TMmio, u32> {
        self.reg(offsets::BDADDR)
    }

    /// Physical address of the first descriptor in the chain.
    pub fn bdpaddr(&self) -> RegRef<'_, TMmio, u32> {
        self.reg(offsets::BDPADDR)
    }

    pub fn stat(&self) -> RegRef<'_, TMmio, Stat> {
        self.reg(offsets::STAT)
    }

    /// Interrupt sources; write one to clear.
    pub fn intsrc(&self) -> RegRef<'_, TMmio, IntFlags> {
        self.reg(offsets::INTSRC)
    }

    pub fn inten(&self) -> RegRef<'_, TMmio, IntFlags> {
        self.reg(offsets::INTEN)
    }

    /// Descriptor poll interval, in engine clocks.
    pub fn pollcon(&self) -> RegRef<'_, TMmio, u32> {
        self.reg(offsets::POLLCON)
    }
}

/// Owner of the crypto engine register file.
pub struct CeReg<TMmio: Mmio = RealMmio> {
    base: *mut u32,
    mmio: TMmio,
}

impl CeReg<RealMmio> {
    /// # Safety
    ///
    /// Caller must ensure that only one instance of this type exists at a
    /// time.
    pub unsafe fn new() -> Self {
        Self {
            base: CE_ADDR as usize as *mut u32,
            mmio: RealMmio,
        }
    }
}

impl<TMmio: Mmio + Copy> CeReg<TMmio> {
    /// # Safety
    ///
    /// `base` must be a register file reachable through `mmio`, and only
    /// one instance may exist per register file.
    pub unsafe fn new_with_mmio(base: *mut u32, mmio: TMmio) -> Self {
        Self { base, mmio }
    }

    pub fn regs(&self) -> RegisterBlock<TMmio> {
        // SAFETY: base validity is a precondition of construction
        unsafe { RegisterBlock::new_with_mmio(self.base, self.mmio) }
    }

    pub fn regs_mut(&mut self) -> RegisterBlock<TMmio> {
        self.regs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_fields() {
        let stat = Stat(0b101 << 24 | 0b10 << 22 | 1);
        assert!(stat.active());
        assert_eq!(stat.err_op(), 0b101);
        assert_eq!(stat.err_phase(), 0b10);
        assert_eq!(stat.err_mode(), 0);
    }

    #[test]
    fn test_con_bits() {
        let start = Con::DMAEN | Con::BDPCHST | Con::SWAPEN;
        assert_eq!(start.bits(), 0x25);
        assert_eq!((start | Con::SWAPOEN).bits(), 0xa5);
        assert_eq!((start | Con::BDPPLEN).bits(), 0x27);
        assert_eq!((start | Con::BDPPLEN | Con::SWAPOEN).bits(), 0xa7);
    }
}
