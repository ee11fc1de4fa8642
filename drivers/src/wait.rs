/*++

Licensed under the Apache-2.0 license.

File Name:

    wait.rs

Abstract:

    File contains common functions to implement bounded wait routines.

--*/

use crate::{CeError, CeResult};

/// How long a busy-wait may spin before giving up.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WaitBudget {
    /// Give up after this many unsuccessful polls.
    Polls(u32),
    Unbounded,
}

/// Spins until `predicate` holds.
///
/// # Returns
///
/// * `CeResult` - `DRIVER_CE_HARDWARE_FAULT` when the budget runs out
pub fn until<F>(budget: WaitBudget, mut predicate: F) -> CeResult<()>
where
    F: FnMut() -> bool,
{
    match budget {
        WaitBudget::Unbounded => {
            while !predicate() {}
            Ok(())
        }
        WaitBudget::Polls(polls) => {
            for _ in 0..polls {
                if predicate() {
                    return Ok(());
                }
            }
            if predicate() {
                Ok(())
            } else {
                Err(CeError::DRIVER_CE_HARDWARE_FAULT)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_until_counts_polls() {
        let mut calls = 0;
        assert_eq!(
            until(WaitBudget::Polls(3), || {
                calls += 1;
                false
            }),
            Err(CeError::DRIVER_CE_HARDWARE_FAULT)
        );
        assert_eq!(calls, 4);

        let mut calls = 0;
        assert_eq!(
            until(WaitBudget::Polls(0), || {
                calls += 1;
                true
            }),
            Ok(())
        );
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_until_unbounded() {
        let mut calls = 0;
        until(WaitBudget::Unbounded, || {
            calls += 1;
            calls == 1000
        })
        .unwrap();
        assert_eq!(calls, 1000);
    }
}
