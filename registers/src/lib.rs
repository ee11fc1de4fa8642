// Licensed under the Apache-2.0 license
//
#![no_std]

pub mod ce;
pub mod layout;
pub mod memory;
mod mmio;

pub use mmio::{Mmio, MmioMut, RealMmio, RegRef, RegValue};
