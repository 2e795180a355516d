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

//! Independent per-root resolution in parallel

use rayon::prelude::*;
use tracedeps_common::TraceStore;

use crate::cancellation::CancellationToken;
use crate::config::{ExclusionConfig, ResolveOptions};
use crate::error::ResolveResult;
use crate::output::DependencyResult;
use crate::resolver::DependencyResolver;

/// Resolve every root on its own, results in input order
///
/// All calls share `token`, so one cancellation stops the whole batch.
pub fn resolve_each<Q, S>(
    store: &Q,
    roots: &[S],
    options: &ResolveOptions,
    token: Option<&CancellationToken>,
) -> Vec<ResolveResult<DependencyResult>>
where
    Q: TraceStore + ?Sized,
    S: AsRef<str> + Sync,
{
    tracing::debug!(roots = roots.len(), "Resolving roots in parallel");
    roots
        .par_iter()
        .map(|root| resolver(store, token).resolve(std::slice::from_ref(root), options))
        .collect()
}

/// Like `resolve_each`, deriving each root's options from `config`
pub fn resolve_each_with_config<Q, S>(
    store: &Q,
    roots: &[S],
    base: &ResolveOptions,
    config: &ExclusionConfig,
    token: Option<&CancellationToken>,
) -> Vec<ResolveResult<DependencyResult>>
where
    Q: TraceStore + ?Sized,
    S: AsRef<str> + Sync,
{
    roots
        .par_iter()
        .map(|root| {
            let options = config.options_for(root.as_ref(), base)?;
            resolver(store, token).resolve(std::slice::from_ref(root), &options)
        })
        .collect()
}

fn resolver<'a, Q: TraceStore + ?Sized>(store: &'a Q, token: Option<&CancellationToken>) -> DependencyResolver<'a, Q> {
    let resolver = DependencyResolver::new(store);
    match token {
        Some(token) => resolver.with_cancellation(token.clone()),
        None => resolver,
    }
}
