//! Mapping of sqlx errors into the application taxonomy.

use resman_core::error::{AppError, ErrorKind};

/// Map a driver error, reporting constraint violations as `Conflict`.
pub(crate) fn db_error(err: sqlx::Error, message: &str) -> AppError {
    let conflict = matches!(
        &err,
        sqlx::Error::Database(db) if db.is_unique_violation() || db.is_foreign_key_violation()
    );
    if conflict {
        AppError::with_source(ErrorKind::Conflict, format!("{message}: {err}"), err)
    } else {
        AppError::with_source(ErrorKind::Database, message, err)
    }
}
