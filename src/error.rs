use thiserror::Error;

use crate::catalog::DataType;

pub type Result<T> = std::result::Result<T, SemanticError>;

/// Why a parse tree could not be turned into an analyzed statement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    #[error("unsupported statement: {0}")]
    UnsupportedStatement(String),

    #[error("unsupported {context} element: {tag}")]
    UnsupportedConstruct { context: &'static str, tag: String },

    #[error("unsupported join condition: {0} (only a single equality is allowed)")]
    UnsupportedJoinCondition(String),

    #[error("malformed join: expected at least two table references, found {0}")]
    MalformedJoin(usize),

    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("ambiguous column reference: {0}")]
    AmbiguousReference(String),

    #[error("incompatible operands for '{operator}': {left} and {right}")]
    IncompatibleOperands {
        operator: &'static str,
        left: DataType,
        right: DataType,
    },
}

impl SemanticError {
    pub(crate) fn unsupported(context: &'static str, tag: impl ToString) -> Self {
        SemanticError::UnsupportedConstruct {
            context,
            tag: tag.to_string(),
        }
    }
}
