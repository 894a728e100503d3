use thiserror::Error;

/// Rejected tree mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("attaching node {child} under node {parent} would create a cycle")]
    Cycle { parent: usize, child: usize },

    #[error("node {0} already has a parent")]
    AlreadyAttached(usize),

    #[error("child index {index} out of bounds for node with {len} children")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("bad tree description: {0}")]
    Description(String),
}

/// A grammar violation. Parsing stops at the first one.
///
/// `stack` is the rendered parse stack at the point of failure, bottom first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}; stack = {stack}")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub stack: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("undefined procedure `{0}`")]
    UndefinedProcedure(String),

    #[error("`{name}` expects {expected} argument(s), got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("malformed `{node}` node: {reason}")]
    MalformedNode { node: String, reason: String },

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("color channel value {0} is outside 0..=255")]
    ColorOutOfRange(f64),

    #[error("`{0}` is not a valid number")]
    InvalidNumber(String),
}

impl RuntimeError {
    pub(crate) fn malformed(node: impl Into<String>, reason: impl Into<String>) -> Self {
        RuntimeError::MalformedNode {
            node: node.into(),
            reason: reason.into(),
        }
    }
}

/// Either stage of `run_source` failing.
#[derive(Debug, Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}
