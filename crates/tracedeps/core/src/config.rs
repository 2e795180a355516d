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

//! Resolution options and per-root exclusion configuration

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracedeps_common::{GlobPattern, IndexError};

/// Exclusion configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read exclusion config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed exclusion config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid root variant pattern: {0}")]
    InvalidVariant(#[from] IndexError),
}

/// How writing processes are excluded by their command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandExclusion {
    /// No command filtering
    #[default]
    None,
    /// Glob patterns matched against each execution's command line
    Patterns(Vec<String>),
    /// Indices into the trace index's offline pattern list
    Precomputed(Vec<usize>),
}

impl CommandExclusion {
    pub fn is_none(&self) -> bool {
        match self {
            CommandExclusion::None => true,
            CommandExclusion::Patterns(patterns) => patterns.is_empty(),
            CommandExclusion::Precomputed(indices) => indices.is_empty(),
        }
    }
}

/// Options for a single resolution call
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptions {
    /// Do not expand through linked modules other than the roots
    pub direct_only: bool,
    /// Substitute wrapper processes for wrapped ones
    pub wrap_deps: bool,
    /// Follow pipe relations between writers
    pub use_pipes: bool,
    /// Invert path and command pattern matching
    pub negate_pattern: bool,
    /// Build the per-file dependency graph
    pub dep_graph: bool,
    /// Validate inputs and return an empty result without traversing
    pub dry_run: bool,
    /// Abort the call once this much time has passed
    pub timeout: Option<Duration>,
    /// Exact paths that are never reported nor traversed
    pub exclude_files: Vec<String>,
    /// Path globs; see `negate_pattern`
    pub exclude_patterns: Vec<String>,
    pub exclude_commands: CommandExclusion,
    /// Overrides the trace's own linked module set
    pub modules: Option<Vec<String>>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            direct_only: false,
            wrap_deps: false,
            use_pipes: true,
            negate_pattern: false,
            dep_graph: false,
            dry_run: false,
            timeout: None,
            exclude_files: Vec::new(),
            exclude_patterns: Vec::new(),
            exclude_commands: CommandExclusion::None,
            modules: None,
        }
    }
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_direct_only(mut self, direct_only: bool) -> Self {
        self.direct_only = direct_only;
        self
    }

    pub fn with_wrap_deps(mut self, wrap_deps: bool) -> Self {
        self.wrap_deps = wrap_deps;
        self
    }

    pub fn with_pipes(mut self, use_pipes: bool) -> Self {
        self.use_pipes = use_pipes;
        self
    }

    pub fn with_negate_pattern(mut self, negate: bool) -> Self {
        self.negate_pattern = negate;
        self
    }

    pub fn with_dep_graph(mut self, dep_graph: bool) -> Self {
        self.dep_graph = dep_graph;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_exclude_file(mut self, path: impl Into<String>) -> Self {
        self.exclude_files.push(path.into());
        self
    }

    pub fn with_exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    pub fn with_exclude_commands(mut self, exclusion: CommandExclusion) -> Self {
        self.exclude_commands = exclusion;
        self
    }

    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = Some(modules.into_iter().map(Into::into).collect());
        self
    }
}

/// Exclusion settings keyed by root path variants
///
/// Each map key is a glob matched against a root path. Every matching
/// variant contributes its entries to the options used for that root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionConfig {
    /// Path globs applied to every root
    #[serde(default)]
    pub dependency_exclude_patterns: Vec<String>,
    #[serde(default)]
    pub module_exclude_pattern_variants: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub exclude_command_variants: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub exclude_command_variants_index: BTreeMap<String, Vec<usize>>,
}

impl ExclusionConfig {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Derive the options for `root` from `base` plus every matching variant
    ///
    /// Precomputed command indices take precedence over command globs when
    /// both end up configured for the same root.
    pub fn options_for(&self, root: &str, base: &ResolveOptions) -> Result<ResolveOptions, ConfigError> {
        let mut options = base.clone();
        options.exclude_patterns.extend(self.dependency_exclude_patterns.iter().cloned());
        for patterns in matching_variants(&self.module_exclude_pattern_variants, root)? {
            options.exclude_patterns.extend(patterns.iter().cloned());
        }

        let (mut globs, mut indices) = match &base.exclude_commands {
            CommandExclusion::None => (Vec::new(), Vec::new()),
            CommandExclusion::Patterns(patterns) => (patterns.clone(), Vec::new()),
            CommandExclusion::Precomputed(indices) => (Vec::new(), indices.clone()),
        };
        for patterns in matching_variants(&self.exclude_command_variants, root)? {
            globs.extend(patterns.iter().cloned());
        }
        for variant in matching_variants(&self.exclude_command_variants_index, root)? {
            indices.extend(variant.iter().copied());
        }

        options.exclude_commands = if !indices.is_empty() {
            CommandExclusion::Precomputed(indices)
        } else if !globs.is_empty() {
            CommandExclusion::Patterns(globs)
        } else {
            CommandExclusion::None
        };

        tracing::debug!(
            root,
            exclude_patterns = options.exclude_patterns.len(),
            exclude_commands = ?options.exclude_commands,
            "Derived per-root exclusion options"
        );
        Ok(options)
    }
}

fn matching_variants<'a, T>(variants: &'a BTreeMap<String, T>, root: &str) -> Result<Vec<&'a T>, ConfigError> {
    let mut matching = Vec::new();
    for (variant, value) in variants {
        if GlobPattern::new(variant)?.matches(root) {
            matching.push(value);
        }
    }
    Ok(matching)
}
