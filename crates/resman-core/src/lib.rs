//! # resman-core
//!
//! Core crate for the resource manager. Contains the unified error
//! system, configuration schemas and typed numeric identifiers.
//!
//! This crate has **no** internal dependencies on other resman crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
