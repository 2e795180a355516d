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

//! Trace index construction
//!
//! Turns string-based execution records (the shape produced by the trace
//! parser) into a `TraceIndex`, enforcing the index invariants on the way:
//! - conflicting open modes of one path within one execution become `ReadWrite`
//! - every opened path gets a file entry with disjoint, pid-sorted access lists
//! - a pid has at most one parent
//! - command pattern bits are precomputed for every execution with a command line

use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::glob::GlobSet;
use crate::index::TraceIndex;
use crate::records::{Access, Execution, ExecutionId, OpenFile, PatternBits, Pid};
use crate::strings::StringTable;

fn default_true() -> bool {
    true
}

/// One open call in a trace dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRecord {
    pub path: String,
    pub access: Access,
    #[serde(default = "default_true")]
    pub exists: bool,
    #[serde(default)]
    pub is_dir: bool,
}

impl OpenRecord {
    pub fn new(path: impl Into<String>, access: Access) -> Self {
        Self {
            path: path.into(),
            access,
            exists: true,
            is_dir: false,
        }
    }
}

/// One execution in a trace dump
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub pid: Pid,
    #[serde(default)]
    pub exec_index: u32,
    #[serde(default)]
    pub parent: Option<ExecutionId>,
    #[serde(default)]
    pub binary: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub argv: Vec<String>,
    #[serde(default)]
    pub opens: Vec<OpenRecord>,
    #[serde(default)]
    pub wrapper_pid: Option<Pid>,
    #[serde(default)]
    pub pipe_targets: Vec<ExecutionId>,
}

impl ExecutionRecord {
    /// Create a record for the first exec of `pid` running `binary`
    pub fn new(pid: Pid, binary: impl Into<String>) -> Self {
        Self {
            pid,
            binary: binary.into(),
            cwd: "/".to_string(),
            ..Default::default()
        }
    }

    pub fn with_exec_index(mut self, exec_index: u32) -> Self {
        self.exec_index = exec_index;
        self
    }

    pub fn with_parent(mut self, parent: Pid) -> Self {
        self.parent = Some(ExecutionId::new(parent, 0));
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_argv<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv = argv.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_open(mut self, path: impl Into<String>, access: Access) -> Self {
        self.opens.push(OpenRecord::new(path, access));
        self
    }

    pub fn with_reads<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        paths.into_iter().fold(self, |record, path| record.with_open(path, Access::Read))
    }

    pub fn with_writes<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        paths.into_iter().fold(self, |record, path| record.with_open(path, Access::Write))
    }

    pub fn with_wrapper(mut self, wrapper_pid: Pid) -> Self {
        self.wrapper_pid = Some(wrapper_pid);
        self
    }

    pub fn with_pipe_to(mut self, pid: Pid) -> Self {
        self.pipe_targets.push(ExecutionId::new(pid, 0));
        self
    }
}

/// A complete trace dump as emitted by the ingestion pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceDump {
    pub executions: Vec<ExecutionRecord>,
    #[serde(default)]
    pub linked_modules: Vec<String>,
    #[serde(default)]
    pub command_patterns: Vec<String>,
}

impl TraceDump {
    /// Parse a JSON trace dump
    pub fn from_reader<R: Read>(reader: R) -> IndexResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Read and parse a JSON trace dump from disk
    pub fn from_path(path: impl AsRef<Path>) -> IndexResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Build the index described by this dump
    pub fn into_index(self) -> IndexResult<TraceIndex> {
        let mut builder = TraceIndexBuilder::new().with_command_patterns(self.command_patterns);
        for module in &self.linked_modules {
            builder.add_module(module);
        }
        for record in self.executions {
            builder.add_execution(record);
        }
        builder.build()
    }
}

/// Builder for `TraceIndex`
#[derive(Debug, Default)]
pub struct TraceIndexBuilder {
    records: Vec<ExecutionRecord>,
    modules: Vec<String>,
    command_patterns: Vec<String>,
}

impl TraceIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_execution(mut self, record: ExecutionRecord) -> Self {
        self.add_execution(record);
        self
    }

    pub fn add_execution(&mut self, record: ExecutionRecord) {
        self.records.push(record);
    }

    pub fn with_module(mut self, path: impl Into<String>) -> Self {
        self.modules.push(path.into());
        self
    }

    pub fn add_module(&mut self, path: impl Into<String>) {
        self.modules.push(path.into());
    }

    /// Patterns to precompute command bitsets for
    pub fn with_command_patterns(mut self, patterns: Vec<String>) -> Self {
        self.command_patterns = patterns;
        self
    }

    /// Build the index
    pub fn build(self) -> IndexResult<TraceIndex> {
        let commands = GlobSet::new(&self.command_patterns)?;
        let mut strings = StringTable::new();
        let mut processes: BTreeMap<Pid, Vec<Execution>> = BTreeMap::new();
        let mut seen = HashSet::new();

        for record in self.records {
            let id = ExecutionId::new(record.pid, record.exec_index);
            if !seen.insert(id) {
                return Err(IndexError::DuplicateExecution(id));
            }
            let execution = intern_execution(&mut strings, &commands, id, record);
            processes.entry(id.pid).or_default().push(execution);
        }
        for executions in processes.values_mut() {
            executions.sort_by_key(|e| e.id.exec_index);
        }

        let mut index = TraceIndex {
            strings,
            command_patterns: self.command_patterns,
            ..Default::default()
        };

        for execution in processes.values().flatten() {
            for (open_ref, open) in execution.opens() {
                let entry = index.files.entry(open.path).or_default();
                match open.access {
                    Access::Read => entry.read_only.push(open_ref),
                    Access::Write => entry.write_only.push(open_ref),
                    Access::ReadWrite => entry.read_write.push(open_ref),
                }
                entry.global_access.push(open_ref);
            }

            if let Some(parent) = execution.parent
                && parent.pid != execution.pid()
            {
                match index.reverse_forks.entry(execution.pid()) {
                    Entry::Occupied(existing) if *existing.get() != parent.pid => {
                        return Err(IndexError::ConflictingParent {
                            pid: execution.pid(),
                            existing: *existing.get(),
                            conflicting: parent.pid,
                        });
                    }
                    Entry::Occupied(_) => {}
                    Entry::Vacant(slot) => {
                        slot.insert(parent.pid);
                        index.forks.entry(parent.pid).or_default().push(execution.pid());
                    }
                }
            }

            if !execution.pipe_targets.is_empty() {
                let targets = index.pipes.entry(execution.pid()).or_default();
                targets.extend(execution.pipe_targets.iter().map(|t| t.pid));
            }
        }

        for children in index.forks.values_mut() {
            children.sort_unstable();
            children.dedup();
        }
        for targets in index.pipes.values_mut() {
            targets.sort_unstable();
            targets.dedup();
        }
        for module in &self.modules {
            let handle = index.strings.intern(module);
            index.modules.insert(handle);
        }
        index.processes = processes;

        debug!(
            processes = index.processes.len(),
            files = index.files.len(),
            modules = index.modules.len(),
            "Trace index built"
        );
        Ok(index)
    }
}

fn intern_execution(strings: &mut StringTable, commands: &GlobSet, id: ExecutionId, record: ExecutionRecord) -> Execution {
    let mut merged: HashMap<&str, Access> = HashMap::new();
    for open in &record.opens {
        merged
            .entry(open.path.as_str())
            .and_modify(|access| *access = access.merge(open.access))
            .or_insert(open.access);
    }

    let open_files = record
        .opens
        .iter()
        .map(|open| OpenFile {
            path: strings.intern(&open.path),
            access: merged.get(open.path.as_str()).copied().unwrap_or(open.access),
            exists: open.exists,
            is_dir: open.is_dir,
        })
        .collect();

    let pattern_bits = if commands.is_empty() || record.argv.is_empty() {
        None
    } else {
        let command = record.argv.join(" ");
        let mut bits = PatternBits::with_capacity(commands.len());
        for (k, pattern) in commands.patterns().iter().enumerate() {
            if pattern.matches(&command) {
                bits.set(k);
            }
        }
        Some(bits)
    };

    Execution {
        id,
        parent: record.parent,
        binary: strings.intern(&record.binary),
        cwd: strings.intern(&record.cwd),
        argv: record.argv.iter().map(|arg| strings.intern(arg)).collect(),
        open_files,
        wrapper_pid: record.wrapper_pid,
        pipe_targets: record.pipe_targets,
        pattern_bits,
    }
}
