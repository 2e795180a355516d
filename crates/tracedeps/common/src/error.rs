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

use thiserror::Error;

use crate::records::{ExecutionId, Pid};

/// Errors raised while building or loading a trace index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Process {pid} already has parent {existing}, refusing second parent {conflicting}")]
    ConflictingParent { pid: Pid, existing: Pid, conflicting: Pid },

    #[error("Execution {0} recorded more than once")]
    DuplicateExecution(ExecutionId),

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Trace dump parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Trace dump IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for index operation results
pub type IndexResult<T> = Result<T, IndexError>;
