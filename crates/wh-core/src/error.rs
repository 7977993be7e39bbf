//! Framework error type.
//!
//! Sub-crates define their own error enums and either convert into
//! `CoreError` via `From` impls or wrap it as one variant.  Both patterns are
//! acceptable; prefer whichever keeps error sites clean.

use thiserror::Error;

/// The top-level error type for `wh-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error for {key}: {message}")]
    Parse { key: String, message: String },
}

/// Shorthand result type for all `wh-*` crates that use `CoreError` directly.
pub type CoreResult<T> = Result<T, CoreError>;
