// Licensed under the Apache-2.0 license

use core::marker::PhantomData;

/// Volatile read access to a memory-mapped register.
///
/// # Safety
///
/// Implementations must perform (or faithfully model) a single volatile read
/// of `src`.
pub unsafe trait Mmio: Sized {
    /// # Safety
    ///
    /// The caller is responsible for ensuring that `src` is a valid register
    /// address for this implementation.
    unsafe fn read_volatile(&self, src: *const u32) -> u32;
}

/// Volatile write access to a memory-mapped register.
///
/// # Safety
///
/// Implementations must perform (or faithfully model) a single volatile write
/// to `dst`.
pub unsafe trait MmioMut: Mmio {
    /// # Safety
    ///
    /// The caller is responsible for ensuring that `dst` is a valid register
    /// address for this implementation.
    unsafe fn write_volatile(&self, dst: *mut u32, src: u32);
}

/// Direct access to the physical register file.
#[derive(Clone, Copy, Default)]
pub struct RealMmio;

unsafe impl Mmio for RealMmio {
    #[inline(always)]
    unsafe fn read_volatile(&self, src: *const u32) -> u32 {
        core::ptr::read_volatile(src)
    }
}

unsafe impl MmioMut for RealMmio {
    #[inline(always)]
    unsafe fn write_volatile(&self, dst: *mut u32, src: u32) {
        core::ptr::write_volatile(dst, src)
    }
}

unsafe impl<T: Mmio> Mmio for &T {
    #[inline(always)]
    unsafe fn read_volatile(&self, src: *const u32) -> u32 {
        T::read_volatile(self, src)
    }
}

unsafe impl<T: MmioMut> MmioMut for &T {
    #[inline(always)]
    unsafe fn write_volatile(&self, dst: *mut u32, src: u32) {
        T::write_volatile(self, dst, src)
    }
}

/// Conversion between a register's raw word and its typed value.
pub trait RegValue: Copy {
    fn from_raw(raw: u32) -> Self;
    fn to_raw(self) -> u32;
}

impl RegValue for u32 {
    #[inline(always)]
    fn from_raw(raw: u32) -> Self {
        raw
    }
    #[inline(always)]
    fn to_raw(self) -> u32 {
        self
    }
}

/// A typed handle to one register of a register block.
pub struct RegRef<'a, TMmio: Mmio, T: RegValue> {
    ptr: *mut u32,
    mmio: &'a TMmio,
    _value: PhantomData<T>,
}

impl<'a, TMmio: Mmio, T: RegValue> RegRef<'a, TMmio, T> {
    /// # Safety
    ///
    /// The caller is responsible for ensuring that ptr is valid for
    /// volatile reads and writes through `mmio`.
    #[inline(always)]
    pub unsafe fn new_with_mmio(ptr: *mut u32, mmio: &'a TMmio) -> Self {
        Self {
            ptr,
            mmio,
            _value: PhantomData,
        }
    }

    #[inline(always)]
    pub fn read(&self) -> T {
        // SAFETY: ptr validity is a precondition of new_with_mmio
        T::from_raw(unsafe { self.mmio.read_volatile(self.ptr) })
    }

    #[inline(always)]
    pub fn ptr(&self) -> *mut u32 {
        self.ptr
    }
}

impl<TMmio: MmioMut, T: RegValue> RegRef<'_, TMmio, T> {
    #[inline(always)]
    pub fn write(&self, val: T) {
        // SAFETY: ptr validity is a precondition of new_with_mmio
        unsafe { self.mmio.write_volatile(self.ptr, val.to_raw()) }
    }

    #[inline(always)]
    pub fn modify(&self, f: impl FnOnce(T) -> T) {
        self.write(f(self.read()))
    }
}
