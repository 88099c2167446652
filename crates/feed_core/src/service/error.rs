//! Caller-facing error taxonomy for core services.
//!
//! # Invariants
//! - Storage failures stay wrapped in `Repo` with their source chain intact.
//! - Uniqueness conflicts surface as `ValidationFailed`.

use crate::registry::RegistryError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for feed, content and reaction use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Selector is not one of `articles|moments|comments`.
    InvalidContentType(String),
    /// Lookup by id, alias or handle missed.
    NotFound { entity: &'static str, key: String },
    /// Realm membership is required and absent.
    AccessDenied(String),
    /// Category alias does not exist; categories are never created implicitly.
    CategoryNotFound(String),
    /// Missing or malformed input.
    ValidationFailed(String),
    /// A row references a content item that no longer exists.
    DanglingReference(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidContentType(value) => write!(f, "invalid content type: `{value}`"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::AccessDenied(message) => write!(f, "access denied: {message}"),
            Self::CategoryNotFound(alias) => write!(f, "category not found: `{alias}`"),
            Self::ValidationFailed(message) => write!(f, "validation failed: {message}"),
            Self::DanglingReference(message) => write!(f, "dangling reference: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RegistryError> for ServiceError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::InvalidContentType(name) => Self::InvalidContentType(name),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(key) => Self::not_found("record", key),
            RepoError::Conflict(key) => Self::ValidationFailed(format!("already exists: {key}")),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}
