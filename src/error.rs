//! Error types
//!
//! [`EvalError`] is the evaluator's taxonomy. Every variant names the node
//! where the fault was found, so callers can localize it in the graph.
//! [`DecodeError`] covers the JSON envelope, before any node is looked at.

use std::fmt;

/// Evaluation failure. Always terminal for the evaluation in progress.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// An operand index does not point into the array
    #[error("node {index}: operand {operand} is out of range for a graph of {len} nodes")]
    OutOfRangeReference {
        index: usize,
        operand: i64,
        len: usize,
    },

    /// `node_type` is not a recognized tag
    #[error("node {index}: unknown node type '{node_type}'")]
    UnknownNodeType { index: usize, node_type: String },

    /// Literal or operand shape does not fit the node type
    #[error("node {index}: malformed arguments: {reason}")]
    MalformedArguments { index: usize, reason: String },

    /// The node was re-entered while still being resolved
    #[error("node {index}: cyclic dependency")]
    CyclicDependency { index: usize },

    /// The dependency chain below the output grew past the configured limit
    #[error("node {index}: dependency chain exceeds the maximum depth of {max_depth}")]
    DepthLimitExceeded { index: usize, max_depth: usize },

    /// A `pattern_matching` node received a pattern that does not compile
    #[error("node {index}: invalid pattern: {message}")]
    InvalidPattern { index: usize, message: String },

    /// The requested output index is not in the array
    #[error("output node {output} is out of range for a graph of {len} nodes")]
    InvalidOutput { output: usize, len: usize },
}

impl EvalError {
    /// Position of the node the fault was found at.
    pub fn index(&self) -> usize {
        match self {
            EvalError::OutOfRangeReference { index, .. }
            | EvalError::UnknownNodeType { index, .. }
            | EvalError::MalformedArguments { index, .. }
            | EvalError::CyclicDependency { index }
            | EvalError::DepthLimitExceeded { index, .. }
            | EvalError::InvalidPattern { index, .. } => *index,
            EvalError::InvalidOutput { output, .. } => *output,
        }
    }

    /// Kind of the fault, without its payload.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::OutOfRangeReference { .. } => ErrorKind::OutOfRangeReference,
            EvalError::UnknownNodeType { .. } => ErrorKind::UnknownNodeType,
            EvalError::MalformedArguments { .. } => ErrorKind::MalformedArguments,
            EvalError::CyclicDependency { .. } => ErrorKind::CyclicDependency,
            EvalError::DepthLimitExceeded { .. } => ErrorKind::DepthLimitExceeded,
            EvalError::InvalidPattern { .. } => ErrorKind::InvalidPattern,
            EvalError::InvalidOutput { .. } => ErrorKind::InvalidOutput,
        }
    }

    pub(crate) fn malformed(
        index: usize,
        reason: impl Into<String>,
    ) -> Self {
        EvalError::MalformedArguments {
            index,
            reason: reason.into(),
        }
    }
}

/// Payload-free discriminant of [`EvalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OutOfRangeReference,
    UnknownNodeType,
    MalformedArguments,
    CyclicDependency,
    DepthLimitExceeded,
    InvalidPattern,
    InvalidOutput,
}

impl ErrorKind {
    /// Stable diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::OutOfRangeReference => "E0001",
            ErrorKind::UnknownNodeType => "E0002",
            ErrorKind::MalformedArguments => "E0003",
            ErrorKind::CyclicDependency => "E0004",
            ErrorKind::DepthLimitExceeded => "E0005",
            ErrorKind::InvalidPattern => "E0006",
            ErrorKind::InvalidOutput => "E0007",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The JSON envelope could not be decoded.
#[derive(Debug, thiserror::Error)]
#[error("invalid evaluation request: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// Error returned by the JSON entry points.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
