use std::path::PathBuf;
use thiserror::Error;

/// Failures that prevent a snapshot store from being built.
///
/// Per-line malformations never surface here: they are logged and skipped
/// by the loaders in [`crate::persist`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io { path: path.into(), source }
    }
}

/// A structurally invalid boolean expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty expression")]
    EmptyExpression,
    #[error("operator '{0}' is missing an operand")]
    MissingOperand(&'static str),
    #[error("unbalanced parentheses")]
    UnbalancedParenthesis,
    #[error("missing operator between operands")]
    MissingOperator,
}
