/*++

Licensed under the Apache-2.0 license.

File Name:

    endian.rs

Abstract:

    File contains word byte-order conversions between host buffers and the
    engine's big-endian key, IV and digest slots.

--*/

/// Reverses the byte order within each 32-bit word.
pub trait EndianSwap {
    fn swap_words(&mut self);
}

impl EndianSwap for [u8] {
    /// A trailing partial word is left as is.
    fn swap_words(&mut self) {
        for word in self.chunks_exact_mut(4) {
            word.reverse();
        }
    }
}

impl EndianSwap for [u32] {
    fn swap_words(&mut self) {
        for word in self {
            *word = word.swap_bytes();
        }
    }
}

/// Packs `src` into big-endian words, last byte of `src` ending the last
/// word of `dst`.
///
/// `src.len()` must be a multiple of 4 no larger than `dst.len() * 4`.
pub(crate) fn load_right_justified(dst: &mut [u32], src: &[u8]) -> Option<()> {
    if src.len() % 4 != 0 || src.len() > dst.len() * 4 {
        return None;
    }
    let start = dst.len() - src.len() / 4;
    for (word, chunk) in dst[start..].iter_mut().zip(src.chunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Some(())
}
