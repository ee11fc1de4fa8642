/*++

Licensed under the Apache-2.0 license.

File Name:

    helpers.rs

Abstract:

    Byte order helpers shared by the emulated engine.

--*/

/// Reverses the byte order of every 32-bit word in place.
pub trait EndianessTransform {
    fn change_endianess(&mut self);
}

impl EndianessTransform for [u8] {
    /// A trailing partial word is left untouched.
    fn change_endianess(&mut self) {
        for word in self.chunks_exact_mut(4) {
            word.reverse();
        }
    }
}

impl EndianessTransform for [u32] {
    fn change_endianess(&mut self) {
        for word in self.iter_mut() {
            *word = word.swap_bytes();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_endianess() {
        let mut bytes = [1u8, 2, 3, 4, 5, 6, 7, 8, 9];
        bytes.change_endianess();
        assert_eq!(bytes, [4, 3, 2, 1, 8, 7, 6, 5, 9]);

        let mut words = [0x0102_0304u32, 0xaabb_ccdd];
        words.change_endianess();
        assert_eq!(words, [0x0403_0201, 0xddcc_bbaa]);
    }
}
