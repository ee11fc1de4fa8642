// Licensed under the Apache-2.0 license
//
//! Translation between CPU addresses and the addresses the crypto engine's
//! DMA uses.

/// Address translation and cache maintenance for buffers shared with the
/// crypto engine.
pub trait DeviceMemory {
    /// Returns the alias through which the CPU sees what the engine sees.
    fn to_device_view(&self, ptr: *const u8) -> *mut u8;

    /// Returns the bus address the engine uses for `ptr`.
    fn to_physical(&self, ptr: *const u8) -> u32;

    /// Makes engine writes to `[ptr, ptr + len)` visible to the CPU.
    fn invalidate_cache(&self, ptr: *const u8, len: usize);

    /// Makes CPU writes to `[ptr, ptr + len)` visible to the engine.
    fn sync_for_device(&self, ptr: *const u8, len: usize);

    /// Returns false for memory whose contents cannot change, such as flash.
    fn is_ram(&self, ptr: *const u8) -> bool;
}

impl<T: DeviceMemory> DeviceMemory for &T {
    fn to_device_view(&self, ptr: *const u8) -> *mut u8 {
        T::to_device_view(self, ptr)
    }
    fn to_physical(&self, ptr: *const u8) -> u32 {
        T::to_physical(self, ptr)
    }
    fn invalidate_cache(&self, ptr: *const u8, len: usize) {
        T::invalidate_cache(self, ptr, len)
    }
    fn sync_for_device(&self, ptr: *const u8, len: usize) {
        T::sync_for_device(self, ptr, len)
    }
    fn is_ram(&self, ptr: *const u8) -> bool {
        T::is_ram(self, ptr)
    }
}

const KSEG_PHYS_MASK: u32 = 0x1FFF_FFFF;
const KSEG1_BASE: u32 = 0xA000_0000;
const RAM_PHYS_END: u32 = 0x0010_0000;

/// MIPS32 KSEG0/KSEG1 address map.
///
/// The device view is the uncached KSEG1 alias, so no explicit cache
/// maintenance beyond ordering is required.
#[derive(Clone, Copy, Default)]
pub struct KsegMemory;

impl KsegMemory {
    pub const fn phys(addr: u32) -> u32 {
        addr & KSEG_PHYS_MASK
    }

    pub const fn kseg1(addr: u32) -> u32 {
        Self::phys(addr) | KSEG1_BASE
    }
}

impl DeviceMemory for KsegMemory {
    fn to_device_view(&self, ptr: *const u8) -> *mut u8 {
        Self::kseg1(ptr as usize as u32) as usize as *mut u8
    }

    fn to_physical(&self, ptr: *const u8) -> u32 {
        Self::phys(ptr as usize as u32)
    }

    fn invalidate_cache(&self, _ptr: *const u8, _len: usize) {
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    }

    fn sync_for_device(&self, _ptr: *const u8, _len: usize) {
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    }

    fn is_ram(&self, ptr: *const u8) -> bool {
        Self::phys(ptr as usize as u32) < RAM_PHYS_END
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kseg_translation() {
        assert_eq!(KsegMemory::phys(0x8000_1234), 0x0000_1234);
        assert_eq!(KsegMemory::kseg1(0x8000_1234), 0xA000_1234);
        assert_eq!(KsegMemory::phys(0xBD00_0000), 0x1D00_0000);
    }
}
