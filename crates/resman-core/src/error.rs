//! Unified error types for the resource manager.
//!
//! Every crate maps its internal failures into [`AppError`]. Pool
//! operations add context (pool name, operation) by nesting the original
//! error as the `source`, so the precise cause stays reachable through
//! [`AppError::root_kind`].

use std::fmt;
use thiserror::Error;

/// Error categorization shared by the store, the property codec and the pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A pool, resource, resource type or property type is absent.
    NotFound,
    /// A new pool could not be created.
    PoolCreation,
    /// A pool cannot be destroyed while claims are still live.
    PoolInUse,
    /// A set pool has no unclaimed inventory left.
    PoolExhausted,
    /// The resource being freed is not currently claimed.
    NotClaimed,
    /// The resource or tag is already claimed.
    AlreadyClaimed,
    /// A property lookup matched zero or several resources.
    AmbiguousOrNotFound,
    /// A mandatory property has no value.
    MissingMandatoryProperty,
    /// The declared property kind is not supported.
    UnsupportedPropertyType,
    /// A property name is not declared on the resource type.
    UnknownProperty,
    /// A raw property value cannot be coerced to its declared kind.
    InvalidPropertyValue,
    /// A singleton pool lost its blueprint resource.
    BlueprintMissing,
    /// The stored pool type is not recognized.
    UnknownPoolType,
    /// Opening, committing or rolling back a transaction failed.
    TransactionFailure,
    /// The request was cancelled before it could commit.
    Cancelled,
    /// Input validation failed.
    Validation,
    /// A uniqueness or referential constraint was violated.
    Conflict,
    /// A database driver error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::PoolCreation => write!(f, "POOL_CREATION"),
            Self::PoolInUse => write!(f, "POOL_IN_USE"),
            Self::PoolExhausted => write!(f, "POOL_EXHAUSTED"),
            Self::NotClaimed => write!(f, "NOT_CLAIMED"),
            Self::AlreadyClaimed => write!(f, "ALREADY_CLAIMED"),
            Self::AmbiguousOrNotFound => write!(f, "AMBIGUOUS_OR_NOT_FOUND"),
            Self::MissingMandatoryProperty => write!(f, "MISSING_MANDATORY_PROPERTY"),
            Self::UnsupportedPropertyType => write!(f, "UNSUPPORTED_PROPERTY_TYPE"),
            Self::UnknownProperty => write!(f, "UNKNOWN_PROPERTY"),
            Self::InvalidPropertyValue => write!(f, "INVALID_PROPERTY_VALUE"),
            Self::BlueprintMissing => write!(f, "BLUEPRINT_MISSING"),
            Self::UnknownPoolType => write!(f, "UNKNOWN_POOL_TYPE"),
            Self::TransactionFailure => write!(f, "TRANSACTION_FAILURE"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error returned by every resource manager operation.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// A later failure raised while handling this one, such as a failed
    /// rollback after the operation itself failed.
    pub secondary: Option<Box<AppError>>,
}

impl AppError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            secondary: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
            secondary: None,
        }
    }

    /// Add operation context, keeping the error kind.
    pub fn context(self, message: impl Into<String>) -> Self {
        let kind = self.kind;
        Self::with_source(kind, message, self)
    }

    /// Re-categorize the error under `kind`, keeping the original as the cause.
    pub fn wrap(self, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::with_source(kind, message, self)
    }

    /// Attach a failure that happened while handling this error.
    ///
    /// The kind, message and source chain stay those of `self`.
    pub fn with_secondary(mut self, secondary: AppError) -> Self {
        self.secondary = Some(Box::new(secondary));
        self
    }

    /// The failure attached by [`AppError::with_secondary`], if any.
    pub fn secondary(&self) -> Option<&AppError> {
        self.secondary.as_deref()
    }

    /// The kind of the innermost [`AppError`] in the source chain.
    pub fn root_kind(&self) -> ErrorKind {
        let mut current = self;
        while let Some(inner) = current
            .source
            .as_deref()
            .and_then(|s| s.downcast_ref::<AppError>())
        {
            current = inner;
        }
        current.kind
    }

    /// Whether `kind` appears anywhere in the nested [`AppError`] chain.
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        let mut current = Some(self);
        while let Some(err) = current {
            if err.kind == kind {
                return true;
            }
            current = err
                .source
                .as_deref()
                .and_then(|s| s.downcast_ref::<AppError>());
        }
        false
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a pool-creation error.
    pub fn pool_creation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PoolCreation, message)
    }

    /// Create a pool-in-use error.
    pub fn pool_in_use(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PoolInUse, message)
    }

    /// Create a pool-exhausted error.
    pub fn pool_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PoolExhausted, message)
    }

    /// Create a not-claimed error.
    pub fn not_claimed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotClaimed, message)
    }

    /// Create an already-claimed error.
    pub fn already_claimed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyClaimed, message)
    }

    /// Create an ambiguous-or-not-found error.
    pub fn ambiguous_or_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AmbiguousOrNotFound, message)
    }

    /// Create a missing-mandatory-property error.
    pub fn missing_mandatory_property(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingMandatoryProperty, message)
    }

    /// Create an unsupported-property-type error.
    pub fn unsupported_property_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedPropertyType, message)
    }

    /// Create an unknown-property error.
    pub fn unknown_property(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownProperty, message)
    }

    /// Create an invalid-property-value error.
    pub fn invalid_property_value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPropertyValue, message)
    }

    /// Create a blueprint-missing error.
    pub fn blueprint_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BlueprintMissing, message)
    }

    /// Create an unknown-pool-type error.
    pub fn unknown_pool_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownPoolType, message)
    }

    /// Create a transaction-failure error.
    pub fn transaction_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransactionFailure, message)
    }

    /// Create a cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
            secondary: self.secondary.clone(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::with_source(ErrorKind::Validation, format!("Invalid input: {err}"), err)
    }
}
