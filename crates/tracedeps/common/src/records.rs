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

//! Execution records and per-file access lists

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::strings::StringHandle;

/// Operating system process identifier as recorded by the tracer
pub type Pid = u64;

/// One real execution: a pid plus the index of the exec under that pid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExecutionId {
    pub pid: Pid,
    pub exec_index: u32,
}

impl ExecutionId {
    pub fn new(pid: Pid, exec_index: u32) -> Self {
        Self { pid, exec_index }
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.pid, self.exec_index)
    }
}

/// How a file was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn is_read(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    pub fn is_write(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }

    /// Combine two opens of the same path; differing modes collapse to `ReadWrite`
    pub fn merge(self, other: Access) -> Access {
        if self == other { self } else { Access::ReadWrite }
    }
}

/// A single open call made by an execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    pub path: StringHandle,
    pub access: Access,
    pub exists: bool,
    pub is_dir: bool,
}

/// Offline command pattern bits, one bit per configured pattern, MSB first within each byte
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternBits(Vec<u8>);

impl PatternBits {
    /// Create a bitset able to hold `patterns` bits, all clear
    pub fn with_capacity(patterns: usize) -> Self {
        Self(vec![0; patterns.div_ceil(8)])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Set the bit for pattern `k`, growing the storage when needed
    pub fn set(&mut self, k: usize) {
        let byte = k / 8;
        if byte >= self.0.len() {
            self.0.resize(byte + 1, 0);
        }
        self.0[byte] |= 0x80 >> (k % 8);
    }

    /// Whether the command matched pattern `k`; bits past the end read as clear
    pub fn is_set(&self, k: usize) -> bool {
        self.0.get(k / 8).is_some_and(|byte| byte & (0x80 >> (k % 8)) != 0)
    }
}

/// One execution of one process instance
#[derive(Debug, Clone)]
pub struct Execution {
    pub id: ExecutionId,
    pub parent: Option<ExecutionId>,
    pub binary: StringHandle,
    pub cwd: StringHandle,
    pub argv: Vec<StringHandle>,
    pub open_files: Vec<OpenFile>,
    pub wrapper_pid: Option<Pid>,
    pub pipe_targets: Vec<ExecutionId>,
    pub pattern_bits: Option<PatternBits>,
}

impl Execution {
    pub fn pid(&self) -> Pid {
        self.id.pid
    }

    /// Whether this execution recorded any command line at all
    pub fn has_command(&self) -> bool {
        !self.argv.is_empty()
    }

    /// Opens of this execution together with their open index
    pub fn opens(&self) -> impl Iterator<Item = (OpenRef, &OpenFile)> {
        self.open_files.iter().enumerate().map(|(i, open)| (OpenRef::new(self.id, i as u32), open))
    }
}

/// Reference to a specific open call: the execution and its open index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpenRef {
    pub execution: ExecutionId,
    pub open_index: u32,
}

impl OpenRef {
    pub fn new(execution: ExecutionId, open_index: u32) -> Self {
        Self { execution, open_index }
    }

    pub fn pid(&self) -> Pid {
        self.execution.pid
    }
}

/// Accesses to one file across the whole trace
///
/// `read_only`, `write_only` and `read_write` never share an entry and are
/// sorted by `(pid, exec_index, open_index)`. `global_access` is their union.
#[derive(Debug, Clone, Default)]
pub struct FileEntry {
    pub read_only: Vec<OpenRef>,
    pub write_only: Vec<OpenRef>,
    pub read_write: Vec<OpenRef>,
    pub global_access: Vec<OpenRef>,
}

impl FileEntry {
    /// Whether any execution ever opened this file for writing
    pub fn has_writers(&self) -> bool {
        !self.write_only.is_empty() || !self.read_write.is_empty()
    }

    /// Writing opens (write-only and read-write) merged in ascending pid order
    pub fn writers(&self) -> Vec<OpenRef> {
        let mut writers = Vec::with_capacity(self.write_only.len() + self.read_write.len());
        let (mut w, mut rw) = (0, 0);
        while w < self.write_only.len() || rw < self.read_write.len() {
            let take_write = match (self.write_only.get(w), self.read_write.get(rw)) {
                (Some(a), Some(b)) => a.pid() < b.pid(),
                (Some(_), None) => true,
                _ => false,
            };
            if take_write {
                writers.push(self.write_only[w]);
                w += 1;
            } else {
                writers.push(self.read_write[rw]);
                rw += 1;
            }
        }
        writers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_merge() {
        assert_eq!(Access::Read.merge(Access::Read), Access::Read);
        assert_eq!(Access::Read.merge(Access::Write), Access::ReadWrite);
        assert_eq!(Access::Write.merge(Access::ReadWrite), Access::ReadWrite);
        assert!(Access::ReadWrite.is_read());
        assert!(Access::ReadWrite.is_write());
        assert!(!Access::Read.is_write());
    }

    #[test]
    fn test_pattern_bits_msb_first() {
        let mut bits = PatternBits::with_capacity(10);
        bits.set(0);
        bits.set(9);
        assert_eq!(bits.as_bytes(), &[0x80, 0x40]);
        assert!(bits.is_set(0));
        assert!(bits.is_set(9));
        assert!(!bits.is_set(1));
        assert!(!bits.is_set(64));
    }

    #[test]
    fn test_pattern_bits_grow_on_set() {
        let mut bits = PatternBits::default();
        bits.set(17);
        assert_eq!(bits.as_bytes().len(), 3);
        assert!(bits.is_set(17));
    }

    #[test]
    fn test_writers_merged_by_pid() {
        let e = |pid, open| OpenRef::new(ExecutionId::new(pid, 0), open);
        let entry = FileEntry {
            read_only: vec![],
            write_only: vec![e(3, 0), e(9, 1)],
            read_write: vec![e(5, 0), e(9, 0)],
            global_access: vec![],
        };
        let pids: Vec<Pid> = entry.writers().iter().map(OpenRef::pid).collect();
        assert_eq!(pids, vec![3, 5, 9, 9]);
        assert!(entry.has_writers());
        assert!(!FileEntry::default().has_writers());
    }
}
