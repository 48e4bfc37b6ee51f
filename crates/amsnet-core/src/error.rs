use serde::Serialize;
use thiserror::Error;

use crate::types::EntityKind;

/// Error returned by every graph service operation.
///
/// Validation and existence failures are raised before the store is touched.
/// `Store` covers everything that went wrong inside a transaction; the driver
/// error itself is logged at the transaction boundary and not carried here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: EntityKind, name: String },

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: EntityKind, name: String },

    #[error("Graph store error: {0}")]
    Store(String),
}

/// Stable, machine-readable error category.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    StoreError,
}

impl ServiceError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn already_exists(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::Store(_) => ErrorKind::StoreError,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
