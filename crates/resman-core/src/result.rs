//! Convenience result type alias for the resource manager.

use crate::error::AppError;

/// A specialized `Result` type for resource manager operations.
pub type AppResult<T> = Result<T, AppError>;
