// Licensed under the Apache-2.0 license

mod common;

use ce_drivers::{HashContext, SpinHwMutex};
use ce_emu_periph::CryptoEngineEmu;
use common::engine;
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Size of the cache buffer for a 3000-byte message: rounded up to a block.
const TRACKED_SIZE: usize = 3008;

static TRACKED_ALLOCS: AtomicUsize = AtomicUsize::new(0);
static TRACKED_FREES: AtomicUsize = AtomicUsize::new(0);

struct CountingAlloc;

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.size() == TRACKED_SIZE {
            TRACKED_ALLOCS.fetch_add(1, Ordering::SeqCst);
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if layout.size() == TRACKED_SIZE {
            TRACKED_FREES.fetch_add(1, Ordering::SeqCst);
        }
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static ALLOCATOR: CountingAlloc = CountingAlloc;

fn counts() -> (usize, usize) {
    (
        TRACKED_ALLOCS.load(Ordering::SeqCst),
        TRACKED_FREES.load(Ordering::SeqCst),
    )
}

#[test]
fn test_copy_frees_shared_buffer_once() {
    let emu = CryptoEngineEmu::new();
    let lock = SpinHwMutex::new();
    let mut ce = engine(&emu, &lock);
    let message = vec![0x6du8; 3000];
    let expected = common::sha256(&message);

    let mut ctx = HashContext::sha256();
    let (before, _) = counts();
    ctx.update(&mut ce, &message).unwrap();
    let (allocs, frees) = counts();
    assert_eq!(allocs, before + 1);

    let mut copy = ctx.copy();
    let mut digest = [0u8; 32];
    ctx.finalize(&mut ce, &mut digest).unwrap();
    assert_eq!(digest[..], expected[..]);
    assert_eq!(counts(), (allocs, frees));

    copy.finalize(&mut ce, &mut digest).unwrap();
    assert_eq!(digest[..], expected[..]);
    assert_eq!(counts(), (allocs, frees + 1));

    drop(ctx);
    drop(copy);
    assert_eq!(counts(), (allocs, frees + 1));
}
