/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the crypto engine drivers for error handling

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Crypto Engine Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CeError(pub NonZeroU32);

/// Broad classification of an error code.
///
/// The upper half-word of every error code selects its kind.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    InvalidArgument,
    BufferAlignment,
    EngineBusy,
    HardwareFault,
    OutOfMemory,
    SelfTest,
    Unknown,
}

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: CeError = CeError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl CeError {
    /// Create an error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. Use `CeError::try_from()` to convert a u32.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("CeError cannot be 0"),
        }
    }

    define_error_constants![
        (
            DRIVER_CE_INVALID_ARGUMENT,
            0x00010001,
            "Crypto engine invalid argument"
        ),
        (
            DRIVER_CE_EMPTY_INPUT,
            0x00010002,
            "Crypto engine job input is empty"
        ),
        (
            DRIVER_CE_UNSUPPORTED_ALGORITHM,
            0x00010003,
            "Crypto engine algorithm or mode not supported for this operation"
        ),
        (
            DRIVER_CE_INVALID_KEY_SIZE,
            0x00010004,
            "Crypto engine invalid key size"
        ),
        (
            DRIVER_CE_INVALID_IV_SIZE,
            0x00010005,
            "Crypto engine invalid IV size"
        ),
        (
            DRIVER_CE_INVALID_OUTPUT_SIZE,
            0x00010006,
            "Crypto engine output buffer has the wrong size"
        ),
        (
            DRIVER_CE_INVALID_BLOCK_MULTIPLE,
            0x00010007,
            "Crypto engine input is not a multiple of the cipher block size"
        ),
        (
            DRIVER_CE_INPUT_TOO_LARGE,
            0x00010008,
            "Crypto engine input does not fit in one buffer descriptor"
        ),
        (
            DRIVER_CE_INVALID_CONFIG,
            0x00010009,
            "Crypto engine configuration out of range"
        ),
        (
            DRIVER_CE_STREAM_NOT_ACTIVE,
            0x0001000A,
            "Crypto engine hash stream is not active"
        ),
        (
            DRIVER_CE_STREAM_OVERRUN,
            0x0001000B,
            "Crypto engine hash stream received more data than declared"
        ),
        (
            DRIVER_CE_STREAM_LENGTH_MISMATCH,
            0x0001000C,
            "Crypto engine hash stream ended before the declared length"
        ),
        (
            DRIVER_CE_BUFFER_ALIGNMENT,
            0x00020001,
            "Crypto engine buffer is not word aligned"
        ),
        (DRIVER_CE_ENGINE_BUSY, 0x00030001, "Crypto engine is in use"),
        (
            DRIVER_CE_HARDWARE_FAULT,
            0x00040001,
            "Crypto engine reported an error or did not complete"
        ),
        (
            DRIVER_CE_OUT_OF_MEMORY,
            0x00050001,
            "Crypto engine hash cache allocation failed"
        ),
        (
            KAT_SHA1_DIGEST_MISMATCH,
            0x00090001,
            "KAT: SHA-1 digest mismatch"
        ),
        (
            KAT_SHA256_DIGEST_MISMATCH,
            0x00090002,
            "KAT: SHA-256 digest mismatch"
        ),
        (KAT_MD5_DIGEST_MISMATCH, 0x00090003, "KAT: MD5 digest mismatch"),
        (
            KAT_AES_CIPHERTEXT_MISMATCH,
            0x00090004,
            "KAT: AES ciphertext mismatch"
        ),
        (
            KAT_AES_PLAINTEXT_MISMATCH,
            0x00090005,
            "KAT: AES plaintext mismatch"
        ),
        (
            KAT_TDES_CIPHERTEXT_MISMATCH,
            0x00090006,
            "KAT: TDES ciphertext mismatch"
        ),
        (
            KAT_TDES_PLAINTEXT_MISMATCH,
            0x00090007,
            "KAT: TDES plaintext mismatch"
        ),
    ];

    /// Classify the error by its group.
    pub fn kind(&self) -> ErrorKind {
        match self.0.get() >> 16 {
            0x0001 => ErrorKind::InvalidArgument,
            0x0002 => ErrorKind::BufferAlignment,
            0x0003 => ErrorKind::EngineBusy,
            0x0004 => ErrorKind::HardwareFault,
            0x0005 => ErrorKind::OutOfMemory,
            0x0009 => ErrorKind::SelfTest,
            _ => ErrorKind::Unknown,
        }
    }
}

impl From<core::num::NonZeroU32> for CeError {
    fn from(val: core::num::NonZeroU32) -> Self {
        CeError(val)
    }
}

impl From<CeError> for core::num::NonZeroU32 {
    fn from(val: CeError) -> Self {
        val.0
    }
}

impl From<CeError> for u32 {
    fn from(val: CeError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for CeError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(CeError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type CeResult<T> = Result<T, CeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_try_from() {
        assert!(CeError::try_from(0).is_err());
        assert_eq!(
            Ok(CeError::DRIVER_CE_BUFFER_ALIGNMENT),
            CeError::try_from(0x00020001)
        );
    }

    #[test]
    fn test_error_constants_uniqueness() {
        let constants = CeError::all_constants();
        let mut error_values = HashSet::new();
        let mut duplicates = Vec::new();

        for (name, value) in constants {
            if !error_values.insert(value) {
                duplicates.push((name, value));
            }
        }

        assert!(
            duplicates.is_empty(),
            "Found duplicate error codes: {:?}",
            duplicates
        );
    }

    #[test]
    fn test_every_constant_has_a_kind() {
        for (name, value) in CeError::all_constants() {
            let err = CeError::try_from(value).unwrap();
            assert_ne!(err.kind(), ErrorKind::Unknown, "{name} has no kind");
        }
    }

    #[test]
    fn test_kind() {
        assert_eq!(
            CeError::DRIVER_CE_STREAM_OVERRUN.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(CeError::DRIVER_CE_ENGINE_BUSY.kind(), ErrorKind::EngineBusy);
        assert_eq!(
            CeError::DRIVER_CE_HARDWARE_FAULT.kind(),
            ErrorKind::HardwareFault
        );
        assert_eq!(
            CeError::DRIVER_CE_OUT_OF_MEMORY.kind(),
            ErrorKind::OutOfMemory
        );
        assert_eq!(CeError::try_from(0x00FF0001).unwrap().kind(), ErrorKind::Unknown);
    }
}
