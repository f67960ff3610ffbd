// Copyright 2025 Roberto Antunes
//
// Licensed under the Functional Source License, Version 1.1 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://github.com/RobAntunes/lingodb/blob/main/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for the morphological parser.

use std::io;
use thiserror::Error;

/// Main error type for morphological parser operations.
#[derive(Debug, Error)]
pub enum ParserError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An external toolkit executable (foma, flookup, estimate-ngram) is not
    /// installed or not on PATH.
    #[error("required toolkit executable not found: {0}")]
    ToolkitAbsent(String),

    /// A subprocess ran but exited with a non-zero status or otherwise
    /// failed its success criteria.
    #[error("subprocess failed (exit {code:?}): {stderr}")]
    SubprocessFailed { code: Option<i32>, stderr: String },

    /// A subprocess exceeded its wall-clock timeout and was killed.
    #[error("subprocess `{command}` timed out after {timeout_secs}s")]
    SubprocessTimedOut { command: String, timeout_secs: u64 },

    /// A generated or hand-authored script did not have the expected shape
    /// (e.g. no `define phonology` block to splice into).
    #[error("script not well formed: {0}")]
    ScriptNotWellFormed(String),

    /// A compile step reported success but produced no new binary artifact.
    #[error("compile reported success but no binary was written to {0}")]
    NoBinaryWritten(String),

    /// Caller-supplied input failed validation (surface form, lexicon entry,
    /// parse string, etc).
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// A required attribute or file this operation depends on is absent
    /// (e.g. parsing before compiling).
    #[error("missing dependency: {0}")]
    DependencyMissing(String),

    /// A path or input failed a security boundary check.
    #[error("security check failed: {0}")]
    Security(String),

    /// Serialization/deserialization of an on-disk artifact failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;
