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

//! Worklist traversal alternating between files and the processes writing them

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use tracedeps_common::{GlobSet, OpenRef, Pid, StringHandle, TraceStore};
use tracing::{debug, info, trace, warn};

use crate::cancellation::{CancelCheck, CancellationToken};
use crate::config::ResolveOptions;
use crate::context::ResolutionContext;
use crate::error::{ResolveError, ResolveResult};
use crate::matcher::{CommandMatcher, PathFilter};
use crate::output::{DependencyGraph, DependencyResult};
use crate::wrapping::{self, Writer};

/// Compiler front ends whose writes belong to the driver that spawned them
const COMPILER_FRONTENDS: [&str; 2] = ["/cc1", "/cc1plus"];

/// Resolves the files and processes a set of build outputs depend on
///
/// The resolver only borrows the trace store, so any number of resolvers
/// may run concurrently over one index.
pub struct DependencyResolver<'a, Q: TraceStore + ?Sized> {
    store: &'a Q,
    token: Option<CancellationToken>,
}

impl<'a, Q: TraceStore + ?Sized> DependencyResolver<'a, Q> {
    pub fn new(store: &'a Q) -> Self {
        Self { store, token: None }
    }

    /// Attach a caller-owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Resolve the transitive dependencies of `roots`
    ///
    /// Roots that were never written by any process contribute nothing.
    /// On cancellation no partial result is returned.
    pub fn resolve<S: AsRef<str>>(&self, roots: &[S], options: &ResolveOptions) -> ResolveResult<DependencyResult> {
        let cancel = CancelCheck::start(self.token.as_ref(), options.timeout);

        let mut requested = BTreeSet::new();
        let mut written = Vec::new();
        for root in roots {
            let handle = self.file_handle(root.as_ref())?;
            if !requested.insert(handle) {
                continue;
            }
            if self.store.file(handle).is_some_and(|entry| entry.has_writers()) {
                written.push(handle);
            } else {
                debug!(root = root.as_ref(), "Root has no writers, skipping");
            }
        }

        let excluded = options
            .exclude_files
            .iter()
            .map(|path| self.file_handle(path))
            .collect::<ResolveResult<HashSet<_>>>()?;
        let path_filter = PathFilter::new(excluded, GlobSet::new(&options.exclude_patterns)?, options.negate_pattern);
        let commands = CommandMatcher::new(
            &options.exclude_commands,
            options.negate_pattern,
            self.store.command_patterns().len(),
        )?;

        let mut admitted = Vec::with_capacity(written.len());
        for root in written {
            if path_filter.admits(root, self.path(root)?) {
                admitted.push(root);
            } else {
                debug!(root = %root, "Root rejected by path filter");
            }
        }

        let modules = self.module_set(options, &requested)?;

        if admitted.is_empty() || options.dry_run {
            debug!(roots = admitted.len(), dry_run = options.dry_run, "Nothing to traverse");
            return Ok(DependencyResult {
                graph: options.dep_graph.then(DependencyGraph::new),
                ..Default::default()
            });
        }

        let mut traversal = Traversal {
            store: self.store,
            options,
            path_filter,
            commands,
            modules,
            cancel,
            context: ResolutionContext::new(admitted.iter().copied()),
            graph: DependencyGraph::new(),
        };

        if let Err(err) = traversal.run() {
            if let ResolveError::Cancelled(reason) = &err {
                warn!(
                    %reason,
                    rounds = traversal.context.rounds,
                    elapsed_ms = traversal.cancel.age().as_millis() as u64,
                    "Dependency resolution cancelled"
                );
            }
            return Err(err);
        }
        Ok(traversal.finish(&requested))
    }

    /// Handle of a path that must be present in the file map
    fn file_handle(&self, path: &str) -> ResolveResult<StringHandle> {
        self.store
            .lookup(path)
            .filter(|&handle| self.store.file(handle).is_some())
            .ok_or_else(|| ResolveError::unknown_path(path))
    }

    fn path(&self, handle: StringHandle) -> ResolveResult<&'a str> {
        let store: &'a Q = self.store;
        store
            .string(handle)
            .ok_or_else(|| ResolveError::corrupt("dangling string handle", u64::from(handle.0)))
    }

    fn module_set(&self, options: &ResolveOptions, roots: &BTreeSet<StringHandle>) -> ResolveResult<ModuleSet> {
        let overridden = match &options.modules {
            Some(paths) => Some(paths.iter().map(|path| self.file_handle(path)).collect::<ResolveResult<HashSet<_>>>()?),
            None => None,
        };
        Ok(ModuleSet {
            overridden,
            roots: roots.clone(),
        })
    }
}

/// Linked modules a `direct_only` traversal does not expand
///
/// Uses the caller's list when one was given, the index's otherwise. Roots
/// are never treated as modules.
pub(crate) struct ModuleSet {
    overridden: Option<HashSet<StringHandle>>,
    roots: BTreeSet<StringHandle>,
}

impl ModuleSet {
    pub(crate) fn contains<Q: TraceStore + ?Sized>(&self, store: &Q, file: StringHandle) -> bool {
        if self.roots.contains(&file) {
            return false;
        }
        match &self.overridden {
            Some(modules) => modules.contains(&file),
            None => store.is_module(file),
        }
    }
}

/// State of one traversal; lives for a single `resolve` call
pub(crate) struct Traversal<'a, Q: TraceStore + ?Sized> {
    pub(crate) store: &'a Q,
    pub(crate) options: &'a ResolveOptions,
    pub(crate) path_filter: PathFilter,
    pub(crate) commands: CommandMatcher,
    pub(crate) modules: ModuleSet,
    pub(crate) cancel: CancelCheck,
    pub(crate) context: ResolutionContext,
    pub(crate) graph: DependencyGraph,
}

impl<'a, Q: TraceStore + ?Sized> Traversal<'a, Q> {
    pub(crate) fn run(&mut self) -> ResolveResult<()> {
        while self.context.has_pending() {
            self.context.begin_round();
            debug!(round = self.context.rounds, pending = self.context.pending_len(), "Starting file round");

            while let Some(file) = self.context.next_pending() {
                self.cancel.check()?;
                if self.options.direct_only && self.modules.contains(self.store, file) {
                    trace!(file = %file, "Not expanding linked module");
                } else {
                    self.expand_file(file)?;
                }
                self.context.finish(file);
            }

            let writers: Vec<Writer> = self.context.round_writers.iter().copied().collect();
            debug!(round = self.context.rounds, writers = writers.len(), "Starting process round");
            for writer in writers {
                self.cancel.check()?;
                self.expand_process(writer)?;
            }
            self.context.rounds += 1;
        }
        Ok(())
    }

    /// Collect every non-excluded writer of `file` into the round's writer set
    fn expand_file(&mut self, file: StringHandle) -> ResolveResult<()> {
        let store = self.store;
        let entry = store
            .file(file)
            .ok_or_else(|| ResolveError::corrupt("queued file has no file map entry", u64::from(file.0)))?;

        let mut previous: Option<Pid> = None;
        for open in entry.writers() {
            if previous == Some(open.pid()) {
                continue;
            }
            previous = Some(open.pid());
            self.cancel.check()?;

            let effective = wrapping::effective(store, open.pid(), self.options.wrap_deps);
            let writer = effective.writer();
            if let Some(hit) = self.commands.excluded(store, writer.pid()) {
                trace!(file = %file, %writer, execution = %hit.execution, "Writer excluded by command");
                continue;
            }

            if self.context.round_writers.insert(writer) {
                trace!(file = %file, %writer, original = effective.original(), "Found writer");
            }
            if self.options.dep_graph {
                self.context.written_by.insert(writer, file);
            }
            self.context.all_writers.insert(writer.pid());
            self.context.provenance.insert(open);
            self.propagate_pipes(writer, file)?;
        }
        Ok(())
    }

    /// Queue every admitted file the writer read without also writing it
    fn expand_process(&mut self, writer: Writer) -> ResolveResult<()> {
        let store = self.store;
        let reads = self.read_set(writer)?;
        let mut dependencies = Vec::new();

        for (file, open) in reads {
            let path = store
                .string(file)
                .ok_or_else(|| ResolveError::corrupt("dangling string handle", u64::from(file.0)))?;
            let admitted = self.path_filter.admits(file, path);
            if admitted && self.options.dep_graph {
                dependencies.push(file);
            }
            if self.context.is_known(file) {
                continue;
            }
            if admitted {
                self.context.enqueue(file);
                self.context.provenance.insert(open);
                trace!(%writer, path, "Queued read file");
            } else {
                self.context.exclude(file);
                trace!(%writer, path, "Read file excluded");
            }
        }

        self.attribute_compiler_driver(writer)?;
        if self.options.dep_graph {
            self.record_graph(writer, dependencies)?;
        }
        Ok(())
    }

    /// Read-only files of the writer, or of the whole subtree of a wrapper
    fn read_set(&self, writer: Writer) -> ResolveResult<BTreeMap<StringHandle, OpenRef>> {
        let pids = if self.options.wrap_deps && writer.is_wrapper() {
            self.subtree(writer.pid())?
        } else {
            vec![writer.pid()]
        };

        let mut reads = BTreeMap::new();
        let mut writes = HashSet::new();
        for pid in pids {
            for execution in self.store.executions(pid) {
                for (open, file) in execution.opens() {
                    if file.access.is_read() {
                        reads.entry(file.path).or_insert(open);
                    }
                    if file.access.is_write() {
                        writes.insert(file.path);
                    }
                }
            }
        }
        reads.retain(|path, _| !writes.contains(path));
        Ok(reads)
    }

    /// `root` and every pid forked beneath it
    fn subtree(&self, root: Pid) -> ResolveResult<Vec<Pid>> {
        let mut visited = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        let mut pids = Vec::new();
        while let Some(pid) = queue.pop_front() {
            self.cancel.check()?;
            pids.push(pid);
            for &child in self.store.children(pid) {
                if visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        Ok(pids)
    }

    /// Credit the driver of a compiler front end, which never writes the object itself
    fn attribute_compiler_driver(&mut self, writer: Writer) -> ResolveResult<()> {
        let store = self.store;
        let pid = writer.pid();
        let is_frontend = store.executions(pid).iter().any(|execution| {
            store
                .string(execution.binary)
                .is_some_and(|binary| COMPILER_FRONTENDS.iter().any(|suffix| binary.ends_with(suffix)))
        });
        if !is_frontend {
            return Ok(());
        }
        let driver = store
            .parent(pid)
            .ok_or_else(|| ResolveError::corrupt("compiler front end has no parent", pid))?;
        if self.context.all_writers.insert(driver) {
            trace!(frontend = pid, driver, "Credited compiler driver");
        }
        Ok(())
    }

    fn record_graph(&mut self, writer: Writer, dependencies: Vec<StringHandle>) -> ResolveResult<()> {
        let Some(&file) = self.context.written_by.get(&writer) else {
            return Ok(());
        };
        let store = self.store;
        let mut intermediates = Vec::new();
        for &dependency in &dependencies {
            let entry = store.file(dependency).ok_or_else(|| {
                ResolveError::corrupt("read file has no file map entry", u64::from(dependency.0))
            })?;
            if entry.has_writers() {
                intermediates.push(dependency);
            }
        }
        let entry = self.graph.entry(file).or_default();
        entry.intermediates.extend(intermediates);
        entry.producers.push((writer.pid(), dependencies));
        Ok(())
    }

    pub(crate) fn finish(self, roots: &BTreeSet<StringHandle>) -> DependencyResult {
        let dependency_files: Vec<StringHandle> =
            self.context.done().iter().filter(|file| !roots.contains(file)).copied().collect();
        let writing_pids: Vec<Pid> = self.context.all_writers.iter().copied().collect();

        info!(
            roots = roots.len(),
            dependency_files = dependency_files.len(),
            writing_pids = writing_pids.len(),
            excluded = self.context.excluded_len(),
            rounds = self.context.rounds,
            elapsed_ms = self.cancel.age().as_millis() as u64,
            "Dependency resolution complete"
        );

        DependencyResult {
            dependency_files,
            writing_pids,
            provenance: self.context.provenance.into_iter().collect(),
            graph: self.options.dep_graph.then_some(self.graph),
        }
    }
}
