/*++

Licensed under the Apache-2.0 license.

File Name:

    printer.rs

Abstract:

    File contains support routines and macros for driver diagnostics

--*/
use core::convert::Infallible;
use ufmt::{uDisplay, uWrite};

#[derive(Default)]
pub struct Printer;

impl uWrite for Printer {
    type Error = Infallible;

    /// Diagnostics are discarded without a console.
    #[cfg(not(feature = "std"))]
    #[inline(never)]
    fn write_str(&mut self, _str: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Writes a string slice into this writer, returning whether the write succeeded.
    #[cfg(feature = "std")]
    fn write_str(&mut self, str: &str) -> Result<(), Self::Error> {
        std::print!("{str}");
        Ok(())
    }
}

#[macro_export]
macro_rules! cprint {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwrite!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

#[macro_export]
macro_rules! cprintln {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwriteln!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

/// Formats a word as `0x` followed by eight hex digits.
pub struct HexWord(pub u32);

impl uDisplay for HexWord {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str("0x")?;
        for shift in (0..8).rev() {
            let c = ((self.0 >> (shift * 4)) & 0xf) as u8;
            if c < 10 {
                f.write_char((c + b'0') as char)?;
            } else {
                f.write_char((c - 10 + b'a') as char)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Buf(std::string::String);

    impl uWrite for Buf {
        type Error = Infallible;
        fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
            self.0.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn test_hex_word() {
        let mut buf = Buf(std::string::String::new());
        ufmt::uwrite!(&mut buf, "{}", HexWord(0x0a1b_2c3d)).unwrap();
        assert_eq!(buf.0, "0x0a1b2c3d");
    }
}
