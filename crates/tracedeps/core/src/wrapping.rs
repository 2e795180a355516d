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

//! Wrapper substitution for writing processes
//!
//! A process launched through a wrapper (a shell running a pipeline, a
//! compiler driver, ...) can be replaced by that wrapper so the whole
//! wrapper subtree is treated as one writer.

use std::fmt;

use tracedeps_common::{Pid, TraceStore};

/// Result of resolving a pid against the wrapper relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectivePid {
    Direct(Pid),
    Wrapped { original: Pid, wrapper: Pid },
}

impl EffectivePid {
    /// The pid whose executions were traced as writing
    pub fn original(self) -> Pid {
        match self {
            EffectivePid::Direct(pid) => pid,
            EffectivePid::Wrapped { original, .. } => original,
        }
    }

    /// The identity used for exclusion, pipes and reporting
    pub fn writer(self) -> Writer {
        match self {
            EffectivePid::Direct(pid) => Writer::Process(pid),
            EffectivePid::Wrapped { wrapper, .. } => Writer::Wrapper(wrapper),
        }
    }
}

/// A writing identity collected during one round
///
/// The wrapper tag travels next to the pid, so a pid seen both as a plain
/// writer and as a wrapper yields two distinct identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Writer {
    Process(Pid),
    Wrapper(Pid),
}

impl Writer {
    pub fn pid(self) -> Pid {
        match self {
            Writer::Process(pid) | Writer::Wrapper(pid) => pid,
        }
    }

    pub fn is_wrapper(self) -> bool {
        matches!(self, Writer::Wrapper(_))
    }
}

impl fmt::Display for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Writer::Process(pid) => write!(f, "{pid}"),
            Writer::Wrapper(pid) => write!(f, "{pid}(wrapper)"),
        }
    }
}

/// Resolve `pid` to its wrapper when wrapper substitution is enabled
///
/// The first execution of `pid` carrying a wrapper pid decides.
pub fn effective<Q: TraceStore + ?Sized>(store: &Q, pid: Pid, wrap_deps: bool) -> EffectivePid {
    if !wrap_deps {
        return EffectivePid::Direct(pid);
    }
    store
        .executions(pid)
        .iter()
        .find_map(|execution| execution.wrapper_pid)
        .map_or(EffectivePid::Direct(pid), |wrapper| EffectivePid::Wrapped { original: pid, wrapper })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracedeps_common::{ExecutionRecord, TraceIndexBuilder};

    fn wrapped_index() -> tracedeps_common::TraceIndex {
        TraceIndexBuilder::new()
            .with_execution(ExecutionRecord::new(19, "/bin/sh"))
            .with_execution(ExecutionRecord::new(20, "/usr/bin/gcc").with_parent(19))
            .with_execution(ExecutionRecord::new(21, "/usr/bin/as").with_parent(19).with_wrapper(19))
            .with_execution(
                ExecutionRecord::new(21, "/usr/bin/as")
                    .with_exec_index(1)
                    .with_wrapper(7),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_disabled_wrapping_is_direct() {
        let index = wrapped_index();
        assert_eq!(effective(&index, 21, false), EffectivePid::Direct(21));
    }

    #[test]
    fn test_first_wrapper_wins() {
        let index = wrapped_index();
        let resolved = effective(&index, 21, true);
        assert_eq!(resolved, EffectivePid::Wrapped { original: 21, wrapper: 19 });
        assert_eq!(resolved.original(), 21);
        assert_eq!(resolved.writer(), Writer::Wrapper(19));
    }

    #[test]
    fn test_unwrapped_process_stays_direct() {
        let index = wrapped_index();
        assert_eq!(effective(&index, 20, true).writer(), Writer::Process(20));
        assert_eq!(effective(&index, 404, true), EffectivePid::Direct(404));
    }

    #[test]
    fn test_wrapper_tag_distinguishes_identities() {
        assert_ne!(Writer::Process(19), Writer::Wrapper(19));
        assert_eq!(Writer::Wrapper(19).pid(), 19);
        assert!(Writer::Wrapper(19).is_wrapper());
        assert_eq!(Writer::Wrapper(19).to_string(), "19(wrapper)");
    }
}
