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

use std::fmt;
use thiserror::Error;
use tracedeps_common::IndexError;

use crate::config::ConfigError;

/// Why a resolution call was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The configured timeout elapsed
    Timeout,
    /// The caller's cancellation token was tripped
    Interrupted,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Timeout => write!(f, "timeout"),
            CancelReason::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Dependency resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Unknown path: {path}")]
    UnknownPath { path: String },

    #[error("Corrupt trace index: {context} [{handle}]")]
    CorruptIndex { context: &'static str, handle: u64 },

    #[error("Dependency resolution cancelled ({0})")]
    Cancelled(CancelReason),

    #[error("Invalid exclusion pattern: {0}")]
    InvalidPattern(#[from] IndexError),

    #[error("Command pattern index {index} out of range ({available} patterns in trace)")]
    PatternIndexOutOfRange { index: usize, available: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ResolveError {
    pub fn unknown_path(path: impl Into<String>) -> Self {
        Self::UnknownPath { path: path.into() }
    }

    /// Build a `CorruptIndex` error, logging it with its context
    pub fn corrupt(context: &'static str, handle: u64) -> Self {
        tracing::error!(context, handle, "Trace index invariant violated");
        Self::CorruptIndex { context, handle }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResolveError::Cancelled(_))
    }
}

/// Type alias for resolution results
pub type ResolveResult<T> = Result<T, ResolveError>;
