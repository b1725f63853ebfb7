//! Core error types.

use std::fmt;

use thiserror::Error;

/// Boxed error produced by a statement builder or executor backend.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Engine operation an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateTable,
    DropTable,
    Insert,
    Update,
    Delete,
    Query,
    BatchQuery,
    Count,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::CreateTable => "create table",
            Operation::DropTable => "drop table",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Query => "query",
            Operation::BatchQuery => "batch query",
            Operation::Count => "count",
        })
    }
}

/// Core mapping errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] relmap_proto::Error),

    /// A shape failed validation. All problems found are reported together.
    #[error("invalid shape '{shape}': {}", .problems.join("; "))]
    Shape { shape: String, problems: Vec<String> },

    /// A value cannot be coerced into the declared kind or width.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// A field does not have the shape the operation expects.
    #[error("classification error: field '{field}' {message}")]
    Classification { field: String, message: String },

    /// A related model cannot be derived or resolved.
    #[error("relation error: {0}")]
    Relation(String),

    /// Builder or executor failure, passed through unchanged.
    #[error("backend error: {0}")]
    Backend(#[source] BackendError),

    /// Transaction error.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Record not found.
    #[error("record not found")]
    NotFound,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// An error annotated with the operation and field it occurred in.
    #[error("{operation} failed{}: {source}", .field.as_deref().map(|f| format!(" on field '{f}'")).unwrap_or_default())]
    Context {
        operation: Operation,
        field: Option<String>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap a backend failure.
    pub fn backend(err: impl Into<BackendError>) -> Self {
        Error::Backend(err.into())
    }

    pub(crate) fn classification(field: &str, message: impl Into<String>) -> Self {
        Error::Classification {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// The error with every context layer removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Attach operation/field context, keeping the innermost annotation.
    pub(crate) fn within(self, operation: Operation, field: Option<&str>) -> Self {
        match self {
            already @ Error::Context { .. } => already,
            inner => Error::Context {
                operation,
                field: field.map(str::to_string),
                source: Box::new(inner),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Extension for annotating results with engine context.
pub(crate) trait ResultExt<T> {
    fn within(self, operation: Operation, field: Option<&str>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn within(self, operation: Operation, field: Option<&str>) -> Result<T> {
        self.map_err(|e| e.within(operation, field))
    }
}
