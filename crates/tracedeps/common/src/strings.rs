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

//! Interned string table
//!
//! Every path, argv token and working directory in a trace is stored once and
//! referred to by a stable `StringHandle`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable index into a `StringTable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringHandle(pub u32);

impl StringHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StringHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Append-only interned string storage
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    strings: Vec<String>,
    reverse: HashMap<String, StringHandle>,
}

impl StringTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning the existing handle if already present
    pub fn intern(&mut self, value: &str) -> StringHandle {
        if let Some(&handle) = self.reverse.get(value) {
            return handle;
        }
        let handle = StringHandle(self.strings.len() as u32);
        self.strings.push(value.to_string());
        self.reverse.insert(value.to_string(), handle);
        handle
    }

    /// Look up the handle of an already interned string
    pub fn lookup(&self, value: &str) -> Option<StringHandle> {
        self.reverse.get(value).copied()
    }

    /// Resolve a handle back to its string
    pub fn get(&self, handle: StringHandle) -> Option<&str> {
        self.strings.get(handle.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
