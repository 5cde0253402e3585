//! Error types for the Quill compiler.
//!
//! Every variant aborts compilation of the statement being lowered; none is
//! retried or recovered inside the compiler.

use alloc::string::String;
use thiserror::Error;

/// Result type alias for Quill operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Compile-time failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The type of a sub-expression cannot be determined.
    #[error("unresolved domain: {what}")]
    UnresolvedDomain { what: String },

    /// A name has no matching binding in any enclosing scope.
    #[error("unresolved reference to {name} (from-item {spec})")]
    UnresolvedReference { spec: u32, name: String },

    /// A key-range term has no valid key operand on either side.
    #[error("invalid key operand in term: {term}")]
    InvalidKeyOperand { term: String },

    /// The compilation arena cannot grow.
    #[error("arena allocation failed: {requested} entries requested, limit {limit}")]
    Allocation { requested: usize, limit: usize },

    /// An operator reached a branch that upstream passes should have removed.
    #[error("operator {op} is not supported in {context}")]
    UnsupportedOperator { op: String, context: String },

    /// The parse tree is structurally invalid for lowering.
    #[error("invalid expression: {message}")]
    InvalidExpression { message: String },

    /// The owning class of an attribute cannot be located.
    #[error("class not found: {class}")]
    ClassNotFound { class: String },

    /// A catalog definition is malformed.
    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },
}

impl Error {
    /// Creates an unresolved domain error.
    pub fn unresolved_domain(what: impl Into<String>) -> Self {
        Error::UnresolvedDomain { what: what.into() }
    }

    /// Creates an unresolved reference error.
    pub fn unresolved_reference(spec: u32, name: impl Into<String>) -> Self {
        Error::UnresolvedReference {
            spec,
            name: name.into(),
        }
    }

    /// Creates an invalid key operand error.
    pub fn invalid_key_operand(term: impl Into<String>) -> Self {
        Error::InvalidKeyOperand { term: term.into() }
    }

    /// Creates an allocation error.
    pub fn allocation(requested: usize, limit: usize) -> Self {
        Error::Allocation { requested, limit }
    }

    /// Creates an unsupported operator error.
    pub fn unsupported_operator(op: impl Into<String>, context: impl Into<String>) -> Self {
        Error::UnsupportedOperator {
            op: op.into(),
            context: context.into(),
        }
    }

    /// Creates an invalid expression error.
    pub fn invalid_expression(message: impl Into<String>) -> Self {
        Error::InvalidExpression {
            message: message.into(),
        }
    }

    /// Creates a class not found error.
    pub fn class_not_found(class: impl Into<String>) -> Self {
        Error::ClassNotFound {
            class: class.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            message: message.into(),
        }
    }

    /// Returns the short category name used in logs.
    pub fn category(&self) -> &'static str {
        match self {
            Error::UnresolvedDomain { .. } => "unresolved-domain",
            Error::UnresolvedReference { .. } => "unresolved-reference",
            Error::InvalidKeyOperand { .. } => "invalid-key-operand",
            Error::Allocation { .. } => "allocation",
            Error::UnsupportedOperator { .. } => "unsupported-operator",
            Error::InvalidExpression { .. } => "invalid-expression",
            Error::ClassNotFound { .. } => "class-not-found",
            Error::InvalidSchema { .. } => "invalid-schema",
        }
    }
}
