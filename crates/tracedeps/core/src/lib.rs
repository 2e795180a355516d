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

//! Dependency resolution over an indexed build trace
//!
//! Given one or more build outputs, the resolver walks the trace backwards:
//! each file round collects the processes that wrote the pending files, each
//! process round collects the files those processes read. The walk ends when
//! no new file is discovered. Exclusions by path and by command line, wrapper
//! substitution and pipe propagation shape which processes count as writers.
//!
//! ```ignore
//! use tracedeps_core::{DependencyResolver, ResolveOptions};
//!
//! let index = TraceDump::from_path("build.trace.json")?.into_index()?;
//! let result = DependencyResolver::new(&index).resolve(&["out/vmlinux"], &ResolveOptions::default())?;
//! ```

pub mod batch;
pub mod cancellation;
pub mod config;
mod context;
pub mod error;
pub mod matcher;
pub mod output;
mod pipes;
pub mod resolver;
pub mod wrapping;

pub use batch::{resolve_each, resolve_each_with_config};
pub use cancellation::CancellationToken;
pub use config::{CommandExclusion, ConfigError, ExclusionConfig, ResolveOptions};
pub use error::{CancelReason, ResolveError, ResolveResult};
pub use matcher::{CommandMatch, CommandMatcher, PathFilter};
pub use output::{DependencyGraph, DependencyReport, DependencyResult, GraphEntry, GraphReport, ProducerReport, ProvenanceEntry};
pub use resolver::DependencyResolver;
pub use wrapping::{EffectivePid, Writer, effective};

use tracedeps_common::TraceStore;

/// One-shot resolution without cancellation
pub fn resolve<Q, S>(store: &Q, roots: &[S], options: &ResolveOptions) -> ResolveResult<DependencyResult>
where
    Q: TraceStore + ?Sized,
    S: AsRef<str>,
{
    DependencyResolver::new(store).resolve(roots, options)
}
