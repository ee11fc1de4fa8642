/*++

Licensed under the Apache-2.0 license.

File Name:

    hw_mutex.rs

Abstract:

    File contains the mutual exclusion primitive guarding the crypto engine.

--*/

use crate::{CeError, CeResult};
use core::sync::atomic::{AtomicBool, Ordering};

/// Process-wide lock over the crypto engine.
pub trait HwMutex {
    /// Returns true if the lock was acquired.
    fn try_lock(&self) -> bool;

    fn unlock(&self);
}

impl<T: HwMutex> HwMutex for &T {
    fn try_lock(&self) -> bool {
        T::try_lock(self)
    }

    fn unlock(&self) {
        T::unlock(self)
    }
}

/// Lock backed by an atomic flag; not re-entrant.
#[derive(Default)]
pub struct SpinHwMutex {
    locked: AtomicBool,
}

impl SpinHwMutex {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

impl HwMutex for SpinHwMutex {
    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

/// Holds the engine lock until dropped.
pub(crate) struct EngineLockGuard<'a, L: HwMutex> {
    lock: &'a L,
}

impl<'a, L: HwMutex> EngineLockGuard<'a, L> {
    pub(crate) fn acquire(lock: &'a L) -> CeResult<Self> {
        if lock.try_lock() {
            Ok(Self { lock })
        } else {
            Err(CeError::DRIVER_CE_ENGINE_BUSY)
        }
    }
}

impl<L: HwMutex> Drop for EngineLockGuard<'_, L> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases() {
        let lock = SpinHwMutex::new();
        {
            let _guard = EngineLockGuard::acquire(&lock).unwrap();
            assert!(lock.is_locked());
            assert_eq!(
                EngineLockGuard::acquire(&lock).err(),
                Some(CeError::DRIVER_CE_ENGINE_BUSY)
            );
        }
        assert!(!lock.is_locked());
    }
}
