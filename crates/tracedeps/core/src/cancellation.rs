// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Cooperative cancellation for resolution calls
//!
//! A `CancellationToken` is owned by the caller and may be tripped from any
//! thread, including a signal handler thread: `cancel` is one atomic store.
//! Each resolution call combines the token with its own timeout into a
//! `CancelCheck` that is polled at every iteration of the traversal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{CancelReason, ResolveError, ResolveResult};

/// Atomic cancellation signal shared between a caller and its resolution calls
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; never allocates or blocks
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Per-call cancellation state: the caller's token plus an optional deadline
#[derive(Debug)]
pub(crate) struct CancelCheck {
    token: Option<CancellationToken>,
    started: Instant,
    timeout: Option<Duration>,
}

impl CancelCheck {
    /// Start the clock for one resolution call
    pub(crate) fn start(token: Option<&CancellationToken>, timeout: Option<Duration>) -> Self {
        Self {
            token: token.cloned(),
            started: Instant::now(),
            timeout,
        }
    }

    /// Time since the call started
    pub(crate) fn age(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fail with `Cancelled` if the token was tripped or the deadline passed
    pub(crate) fn check(&self) -> ResolveResult<()> {
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(ResolveError::Cancelled(CancelReason::Interrupted));
        }
        if let Some(timeout) = self.timeout
            && self.age() >= timeout
        {
            return Err(ResolveError::Cancelled(CancelReason::Timeout));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shared_between_clones() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_check_passes_without_token_or_timeout() {
        let check = CancelCheck::start(None, None);
        assert!(check.check().is_ok());
    }

    #[test]
    fn test_check_reports_interrupt() {
        let token = CancellationToken::new();
        let check = CancelCheck::start(Some(&token), Some(Duration::from_secs(60)));
        assert!(check.check().is_ok());
        token.cancel();
        assert!(matches!(check.check(), Err(ResolveError::Cancelled(CancelReason::Interrupted))));
    }

    #[test]
    fn test_check_reports_timeout() {
        let check = CancelCheck::start(None, Some(Duration::ZERO));
        assert!(matches!(check.check(), Err(ResolveError::Cancelled(CancelReason::Timeout))));
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let token = CancellationToken::new();
        let remote = token.clone();
        std::thread::spawn(move || remote.cancel()).join().unwrap();
        let check = CancelCheck::start(Some(&token), None);
        assert!(check.check().unwrap_err().is_cancelled());
    }
}
