// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for mesh loading, stream parsing and metric evaluation
//!
//! Every parse error carries the 1-based source line so a rejected submission
//! can be diagnosed without re-running the parser.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for library operations
pub type MeshResult<T> = Result<T, MeshError>;

/// Kind of element an index refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Vertex,
    Face,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Vertex => write!(f, "vertex"),
            Target::Face => write!(f, "face"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MeshError {
    /// An instruction referenced a vertex or face that was not declared yet.
    /// `index` is 1-based, as written in the source.
    #[error("there is no {target} {index} (line {line})")]
    DanglingReference {
        target: Target,
        index: i64,
        line: usize,
    },

    /// `efv` selected a face slot outside 1..=3
    #[error("face has no vertex slot {index} (line {line})")]
    FaceVertex { index: i64, line: usize },

    #[error("invalid {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("stream contains no mesh instructions")]
    EmptyInput,

    #[error("syntax error (line {line}): {message}")]
    Syntax { line: usize, message: String },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown reference mesh '{id}'")]
    UnknownReference { id: String },
}

impl MeshError {
    pub fn dangling_vertex(index: i64, line: usize) -> Self {
        MeshError::DanglingReference {
            target: Target::Vertex,
            index,
            line,
        }
    }

    pub fn dangling_face(index: i64, line: usize) -> Self {
        MeshError::DanglingReference {
            target: Target::Face,
            index,
            line,
        }
    }

    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        MeshError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeshError::Io {
            path: path.into(),
            source,
        }
    }

    /// Source line of a parse error, if the error came from parsing
    pub fn line(&self) -> Option<usize> {
        match self {
            MeshError::DanglingReference { line, .. }
            | MeshError::FaceVertex { line, .. }
            | MeshError::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangling_message() {
        let err = MeshError::dangling_vertex(5, 12);
        assert_eq!(err.to_string(), "there is no vertex 5 (line 12)");
        assert_eq!(err.line(), Some(12));
    }

    #[test]
    fn test_face_vertex_message() {
        let err = MeshError::FaceVertex { index: 4, line: 3 };
        assert_eq!(err.to_string(), "face has no vertex slot 4 (line 3)");
    }

    #[test]
    fn test_non_parse_errors_have_no_line() {
        assert_eq!(MeshError::EmptyInput.line(), None);
        let err = MeshError::UnknownReference { id: "teapot".into() };
        assert_eq!(err.line(), None);
    }
}
