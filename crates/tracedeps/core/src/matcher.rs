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

//! Path and command filters applied during traversal

use std::collections::HashSet;

use tracedeps_common::{ExecutionId, GlobSet, Pid, StringHandle, TraceStore};

use crate::config::CommandExclusion;
use crate::error::{ResolveError, ResolveResult};

/// The execution (and pattern, when known) that got a process excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMatch {
    pub execution: ExecutionId,
    pub pattern: Option<usize>,
}

#[derive(Debug, Clone)]
enum Strategy {
    Disabled,
    Glob(GlobSet),
    Precomputed(Vec<usize>),
}

/// Decides whether a writing process is excluded by its command lines
///
/// Executions without a recorded command never match, so a process whose
/// executions carry no argv is never excluded, negated or not.
#[derive(Debug, Clone)]
pub struct CommandMatcher {
    strategy: Strategy,
    negate: bool,
}

impl CommandMatcher {
    /// Build the matcher for one call
    ///
    /// `available` is the number of command patterns the trace precomputed
    /// bits for; precomputed indices at or beyond it are rejected.
    pub fn new(exclusion: &CommandExclusion, negate: bool, available: usize) -> ResolveResult<Self> {
        let strategy = match exclusion {
            _ if exclusion.is_none() => Strategy::Disabled,
            CommandExclusion::Patterns(patterns) => Strategy::Glob(GlobSet::new(patterns)?),
            CommandExclusion::Precomputed(indices) => {
                if let Some(&index) = indices.iter().find(|&&k| k >= available) {
                    return Err(ResolveError::PatternIndexOutOfRange { index, available });
                }
                Strategy::Precomputed(indices.clone())
            }
            CommandExclusion::None => Strategy::Disabled,
        };
        Ok(Self { strategy, negate })
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.strategy, Strategy::Disabled)
    }

    /// First execution of `pid` whose command decides exclusion, if any
    pub fn excluded<Q: TraceStore + ?Sized>(&self, store: &Q, pid: Pid) -> Option<CommandMatch> {
        if !self.is_active() {
            return None;
        }
        for execution in store.executions(pid).iter().filter(|e| e.has_command()) {
            let hit = match &self.strategy {
                Strategy::Disabled => return None,
                Strategy::Glob(set) => set.first_match(&store.command_line(execution)),
                Strategy::Precomputed(indices) => {
                    let Some(bits) = &execution.pattern_bits else {
                        tracing::trace!(execution = %execution.id, "No precomputed pattern bits");
                        continue;
                    };
                    indices.iter().copied().find(|&k| bits.is_set(k))
                }
            };
            if hit.is_some() != self.negate {
                return Some(CommandMatch {
                    execution: execution.id,
                    pattern: hit,
                });
            }
        }
        None
    }
}

/// Admission test for read files discovered during the process round
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    excluded: HashSet<StringHandle>,
    patterns: GlobSet,
    negate: bool,
}

impl PathFilter {
    pub fn new(excluded: HashSet<StringHandle>, patterns: GlobSet, negate: bool) -> Self {
        Self {
            excluded,
            patterns,
            negate,
        }
    }

    /// Whether `path` may be reported and traversed
    ///
    /// Exact exclusions always win. An empty pattern list admits everything;
    /// otherwise a path is admitted when matching equals `negate`.
    pub fn admits(&self, handle: StringHandle, path: &str) -> bool {
        if self.excluded.contains(&handle) {
            return false;
        }
        if self.patterns.is_empty() {
            return true;
        }
        self.patterns.is_match(path) == self.negate
    }
}
