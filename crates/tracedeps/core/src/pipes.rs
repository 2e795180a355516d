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

//! Writer propagation along pipe relations

use std::collections::{HashSet, VecDeque};

use tracedeps_common::{StringHandle, TraceStore};
use tracing::trace;

use crate::error::ResolveResult;
use crate::resolver::Traversal;
use crate::wrapping::{self, Writer};

impl<Q: TraceStore + ?Sized> Traversal<'_, Q> {
    /// Credit every process reachable through pipes from `start` as a writer of `file`
    ///
    /// A target excluded by command is not credited, but the walk still
    /// continues through it to its own targets. Returns the number of newly
    /// credited writers.
    pub(crate) fn propagate_pipes(&mut self, start: Writer, file: StringHandle) -> ResolveResult<usize> {
        if !self.options.use_pipes {
            return Ok(0);
        }
        let store = self.store;
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut credited = 0;

        while let Some(writer) = queue.pop_front() {
            self.cancel.check()?;
            for &target in store.pipe_targets(writer.pid()) {
                let next = wrapping::effective(store, target, self.options.wrap_deps).writer();
                if !visited.insert(next) || self.context.round_writers.contains(&next) {
                    continue;
                }
                queue.push_back(next);
                if let Some(hit) = self.commands.excluded(store, next.pid()) {
                    trace!(from = %writer, to = %next, execution = %hit.execution, "Pipe target excluded by command");
                    continue;
                }

                self.context.round_writers.insert(next);
                if self.options.dep_graph {
                    self.context.written_by.entry(next).or_insert(file);
                }
                self.context.all_writers.insert(next.pid());
                trace!(from = %writer, to = %next, "Writer credited through pipe");
                credited += 1;
            }
        }
        Ok(credited)
    }
}
