//! Non-reentrant execution lock.

use std::cell::Cell;

use crate::error::{Error, Result};

/// Single-flag lock held for the full duration of a state-changing call
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: Cell<bool>,
}

impl ReentrancyGuard {
    /// Create an unlocked guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock; [`Error::Reentrancy`] if it is already held
    pub fn enter(&self) -> Result<GuardToken<'_>> {
        if self.entered.replace(true) {
            tracing::warn!(code = Error::Reentrancy.code(), "reentrant call rejected");
            return Err(Error::Reentrancy);
        }
        Ok(GuardToken { guard: self })
    }

    /// Fail with [`Error::Reentrancy`] while the lock is held
    pub fn ensure_idle(&self) -> Result<()> {
        if self.entered.get() {
            return Err(Error::Reentrancy);
        }
        Ok(())
    }

    /// True while an operation is in flight
    pub fn is_entered(&self) -> bool {
        self.entered.get()
    }
}

/// Held lock; released on drop, including on early error returns
#[derive(Debug)]
pub struct GuardToken<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.guard.entered.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_enter_rejected() {
        let guard = ReentrancyGuard::new();
        let token = guard.enter().unwrap();
        assert!(guard.is_entered());
        assert_eq!(guard.enter().unwrap_err(), Error::Reentrancy);
        assert_eq!(guard.ensure_idle(), Err(Error::Reentrancy));

        drop(token);
        assert!(!guard.is_entered());
        assert!(guard.ensure_idle().is_ok());
    }

    #[test]
    fn test_released_on_error_path() {
        fn failing(guard: &ReentrancyGuard) -> Result<()> {
            let _lock = guard.enter()?;
            Err(Error::InvalidAmount)
        }

        let guard = ReentrancyGuard::new();
        assert!(failing(&guard).is_err());
        assert!(guard.enter().is_ok());
    }
}
