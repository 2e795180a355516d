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

//! In-memory trace index

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::records::{Execution, FileEntry, Pid};
use crate::store::TraceStore;
use crate::strings::{StringHandle, StringTable};

/// Fully resident, immutable trace index
///
/// Built once by `TraceIndexBuilder` and then only read. All maps are keyed by
/// integer handles; the process map keeps executions ordered by exec index.
#[derive(Debug, Clone, Default)]
pub struct TraceIndex {
    pub(crate) strings: StringTable,
    pub(crate) processes: BTreeMap<Pid, Vec<Execution>>,
    pub(crate) files: HashMap<StringHandle, FileEntry>,
    pub(crate) forks: HashMap<Pid, Vec<Pid>>,
    pub(crate) reverse_forks: HashMap<Pid, Pid>,
    pub(crate) pipes: HashMap<Pid, Vec<Pid>>,
    pub(crate) modules: BTreeSet<StringHandle>,
    pub(crate) command_patterns: Vec<String>,
}

/// Summary counters for an index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub strings: usize,
    pub processes: usize,
    pub executions: usize,
    pub files: usize,
    pub written_files: usize,
    /// Every recorded open, across all files
    pub opens: usize,
    pub modules: usize,
    pub pipe_edges: usize,
    pub command_patterns: usize,
}

impl TraceIndex {
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// Iterate over all pids in ascending order
    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.processes.keys().copied()
    }

    /// Iterate over every execution, ordered by pid then exec index
    pub fn all_executions(&self) -> impl Iterator<Item = &Execution> {
        self.processes.values().flatten()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            strings: self.strings.len(),
            processes: self.processes.len(),
            executions: self.processes.values().map(Vec::len).sum(),
            files: self.files.len(),
            written_files: self.files.values().filter(|f| f.has_writers()).count(),
            opens: self.files.values().map(|f| f.global_access.len()).sum(),
            modules: self.modules.len(),
            pipe_edges: self.pipes.values().map(Vec::len).sum(),
            command_patterns: self.command_patterns.len(),
        }
    }
}

impl TraceStore for TraceIndex {
    fn lookup(&self, value: &str) -> Option<StringHandle> {
        self.strings.lookup(value)
    }

    fn string(&self, handle: StringHandle) -> Option<&str> {
        self.strings.get(handle)
    }

    fn file(&self, handle: StringHandle) -> Option<&FileEntry> {
        self.files.get(&handle)
    }

    fn executions(&self, pid: Pid) -> &[Execution] {
        self.processes.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    fn parent(&self, pid: Pid) -> Option<Pid> {
        self.reverse_forks.get(&pid).copied()
    }

    fn children(&self, pid: Pid) -> &[Pid] {
        self.forks.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    fn pipe_targets(&self, pid: Pid) -> &[Pid] {
        self.pipes.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    fn modules(&self) -> &BTreeSet<StringHandle> {
        &self.modules
    }

    fn command_patterns(&self) -> &[String] {
        &self.command_patterns
    }
}
