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

//! Read-only query contract over a trace index

use std::collections::BTreeSet;

use crate::records::{Execution, ExecutionId, FileEntry, Pid};
use crate::strings::StringHandle;

/// Queries the resolution engine needs from a trace index
///
/// Implementations are immutable for the duration of any resolution call and
/// may be shared between threads, so every method takes `&self`.
pub trait TraceStore: Send + Sync {
    /// Handle of an interned string (path, argv token, ...)
    fn lookup(&self, value: &str) -> Option<StringHandle>;

    /// String behind a handle
    fn string(&self, handle: StringHandle) -> Option<&str>;

    /// Access lists for a file handle
    fn file(&self, handle: StringHandle) -> Option<&FileEntry>;

    /// All executions of a pid, ordered by exec index
    fn executions(&self, pid: Pid) -> &[Execution];

    /// A single execution
    fn execution(&self, id: ExecutionId) -> Option<&Execution> {
        self.executions(id.pid).iter().find(|e| e.id.exec_index == id.exec_index)
    }

    /// Parent pid from the reverse fork map
    fn parent(&self, pid: Pid) -> Option<Pid>;

    /// Child pids from the fork map
    fn children(&self, pid: Pid) -> &[Pid];

    /// Pids this pid may have written to through a pipe
    fn pipe_targets(&self, pid: Pid) -> &[Pid];

    /// Known final linked build artifacts
    fn modules(&self) -> &BTreeSet<StringHandle>;

    fn is_module(&self, handle: StringHandle) -> bool {
        self.modules().contains(&handle)
    }

    /// Patterns the offline command bitsets were computed against
    fn command_patterns(&self) -> &[String];

    /// Command line of an execution: argv tokens joined by single spaces
    fn command_line(&self, execution: &Execution) -> String {
        execution.argv.iter().filter_map(|&arg| self.string(arg)).collect::<Vec<_>>().join(" ")
    }
}
