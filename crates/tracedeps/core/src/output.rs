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

//! Resolution results and their printable report form

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracedeps_common::{OpenRef, Pid, StringHandle, TraceStore};

use crate::error::{ResolveError, ResolveResult};

/// Dependency information for one written file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphEntry {
    /// Each writer of the file with the files it read, in discovery order
    pub producers: Vec<(Pid, Vec<StringHandle>)>,
    /// Read files that are themselves produced by some process
    pub intermediates: BTreeSet<StringHandle>,
}

pub type DependencyGraph = BTreeMap<StringHandle, GraphEntry>;

/// Outcome of one successful resolution call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyResult {
    /// Every file discovered, roots excluded, sorted by handle
    pub dependency_files: Vec<StringHandle>,
    /// Every process (or wrapper) credited with writing a discovered file
    pub writing_pids: Vec<Pid>,
    /// Opens that linked files and processes during traversal
    pub provenance: Vec<OpenRef>,
    /// Present only when the graph was requested
    pub graph: Option<DependencyGraph>,
}

impl DependencyResult {
    pub fn is_empty(&self) -> bool {
        self.dependency_files.is_empty() && self.writing_pids.is_empty()
    }

    /// Resolve handles to strings against the store the result came from
    pub fn to_report<Q: TraceStore + ?Sized>(&self, store: &Q) -> ResolveResult<DependencyReport> {
        let dependency_files = self
            .dependency_files
            .iter()
            .map(|&h| path_of(store, h))
            .collect::<ResolveResult<Vec<_>>>()?;

        let mut provenance = Vec::with_capacity(self.provenance.len());
        for open in &self.provenance {
            let execution = store
                .execution(open.execution)
                .ok_or_else(|| ResolveError::corrupt("provenance execution missing", open.pid()))?;
            let file = execution
                .open_files
                .get(open.open_index as usize)
                .ok_or_else(|| ResolveError::corrupt("provenance open index out of range", open.pid()))?;
            provenance.push(ProvenanceEntry {
                pid: open.pid(),
                exec_index: open.execution.exec_index,
                open_index: open.open_index,
                path: path_of(store, file.path)?,
            });
        }

        let graph = match &self.graph {
            None => None,
            Some(graph) => {
                let mut report = BTreeMap::new();
                for (&file, entry) in graph {
                    report.insert(path_of(store, file)?, graph_report(store, entry)?);
                }
                Some(report)
            }
        };

        Ok(DependencyReport {
            dependency_files,
            writing_pids: self.writing_pids.clone(),
            provenance,
            graph,
        })
    }
}

/// `DependencyResult` with every handle replaced by its string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    pub dependency_files: Vec<String>,
    pub writing_pids: Vec<Pid>,
    pub provenance: Vec<ProvenanceEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<BTreeMap<String, GraphReport>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvenanceEntry {
    pub pid: Pid,
    pub exec_index: u32,
    pub open_index: u32,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphReport {
    pub producers: Vec<ProducerReport>,
    pub intermediates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProducerReport {
    pub pid: Pid,
    /// Command lines of the producing process, one per execution
    pub commands: Vec<String>,
    pub reads: Vec<String>,
}

fn path_of<Q: TraceStore + ?Sized>(store: &Q, handle: StringHandle) -> ResolveResult<String> {
    store
        .string(handle)
        .map(str::to_string)
        .ok_or_else(|| ResolveError::corrupt("dangling string handle", u64::from(handle.0)))
}

fn graph_report<Q: TraceStore + ?Sized>(store: &Q, entry: &GraphEntry) -> ResolveResult<GraphReport> {
    let mut producers = Vec::with_capacity(entry.producers.len());
    for (pid, reads) in &entry.producers {
        let commands = store
            .executions(*pid)
            .iter()
            .filter(|e| e.has_command())
            .map(|e| store.command_line(e))
            .collect();
        let reads = reads.iter().map(|&h| path_of(store, h)).collect::<ResolveResult<Vec<_>>>()?;
        producers.push(ProducerReport { pid: *pid, commands, reads });
    }
    let intermediates = entry
        .intermediates
        .iter()
        .map(|&h| path_of(store, h))
        .collect::<ResolveResult<Vec<_>>>()?;
    Ok(GraphReport { producers, intermediates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracedeps_common::{Access, ExecutionId, ExecutionRecord, TraceIndexBuilder};

    #[test]
    fn test_report_resolves_strings() {
        let index = TraceIndexBuilder::new()
            .with_execution(
                ExecutionRecord::new(5, "/usr/bin/cc")
                    .with_argv(["cc", "-c", "a.c"])
                    .with_open("a.c", Access::Read)
                    .with_open("a.o", Access::Write),
            )
            .build()
            .unwrap();
        let a_c = index.lookup("a.c").unwrap();
        let a_o = index.lookup("a.o").unwrap();
        let mut graph = DependencyGraph::new();
        graph.insert(
            a_o,
            GraphEntry {
                producers: vec![(5, vec![a_c])],
                intermediates: BTreeSet::new(),
            },
        );
        let result = DependencyResult {
            dependency_files: vec![a_c],
            writing_pids: vec![5],
            provenance: vec![OpenRef::new(ExecutionId::new(5, 0), 1)],
            graph: Some(graph),
        };

        let report = result.to_report(&index).unwrap();
        assert_eq!(report.dependency_files, vec!["a.c"]);
        assert_eq!(report.provenance[0].path, "a.o");
        let producer = &report.graph.as_ref().unwrap()["a.o"].producers[0];
        assert_eq!(producer.commands, vec!["cc -c a.c"]);
        assert_eq!(producer.reads, vec!["a.c"]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["writing_pids"][0], 5);
    }

    #[test]
    fn test_report_rejects_dangling_handle() {
        let index = TraceIndexBuilder::new().build().unwrap();
        let result = DependencyResult {
            dependency_files: vec![StringHandle(99)],
            ..Default::default()
        };
        assert!(matches!(result.to_report(&index), Err(ResolveError::CorruptIndex { .. })));
    }

    #[test]
    fn test_report_omits_missing_graph() {
        let report = DependencyReport::default();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("graph").is_none());
    }
}
