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

//! Mutable state of one resolution call

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use tracedeps_common::{OpenRef, Pid, StringHandle};

use crate::wrapping::Writer;

/// Traversal state owned by a single resolution call
#[derive(Debug, Default)]
pub(crate) struct ResolutionContext {
    /// Files waiting for the next file round, in discovery order
    pending: VecDeque<StringHandle>,
    queued: HashSet<StringHandle>,
    /// Files whose writers were collected
    done: BTreeSet<StringHandle>,
    /// Files rejected by the path filter; never reported
    excluded: HashSet<StringHandle>,
    /// Writers found in the current file round
    pub round_writers: BTreeSet<Writer>,
    /// File each writer was found through, for the dependency graph
    pub written_by: BTreeMap<Writer, StringHandle>,
    pub all_writers: BTreeSet<Pid>,
    pub provenance: BTreeSet<OpenRef>,
    pub rounds: usize,
}

impl ResolutionContext {
    pub(crate) fn new<I: IntoIterator<Item = StringHandle>>(roots: I) -> Self {
        let mut context = Self::default();
        for root in roots {
            context.enqueue(root);
        }
        context
    }

    /// Queue a file unless it is already known; returns whether it was queued
    pub(crate) fn enqueue(&mut self, file: StringHandle) -> bool {
        if self.is_known(file) {
            return false;
        }
        self.queued.insert(file);
        self.pending.push_back(file);
        true
    }

    /// Whether the file was ever queued, finished or excluded
    pub(crate) fn is_known(&self, file: StringHandle) -> bool {
        self.queued.contains(&file) || self.done.contains(&file) || self.excluded.contains(&file)
    }

    pub(crate) fn exclude(&mut self, file: StringHandle) {
        self.excluded.insert(file);
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn next_pending(&mut self) -> Option<StringHandle> {
        self.pending.pop_front()
    }

    pub(crate) fn finish(&mut self, file: StringHandle) {
        self.queued.remove(&file);
        self.done.insert(file);
    }

    /// Reset the per-round writer state before a new file round
    pub(crate) fn begin_round(&mut self) {
        self.round_writers.clear();
        self.written_by.clear();
    }

    pub(crate) fn done(&self) -> &BTreeSet<StringHandle> {
        &self.done
    }

    pub(crate) fn excluded_len(&self) -> usize {
        self.excluded.len()
    }
}
