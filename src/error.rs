use thiserror::Error;

/// Errors that can occur when reading from an object store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Object does not exist in the backend.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Requested range exceeds the object bounds.
    #[error("Range out of bounds for {path}: requested [{start}, {end}), size is {size}")]
    OutOfRange {
        path: String,
        start: u64,
        end: u64,
        size: u64,
    },

    /// A conditional request (if-match / if-none-match) was not satisfied.
    #[error("Precondition failed for {path}: {reason}")]
    Precondition { path: String, reason: String },

    /// Network, timeout, or backend service failure. Surfaced verbatim;
    /// the core performs no retry.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A glob pattern could not be compiled (e.g. an invalid character range).
    #[error("Invalid glob pattern `{pattern}`: {message}")]
    InvalidGlob { pattern: String, message: String },
}

/// Errors produced by URL registration and resolution.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The URL could not be parsed, or carries no scheme.
    #[error("Invalid url `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    /// No registered store matches the URL.
    #[error("Could not find an object store matching the url `{0}`")]
    NoMatchingStore(String),
}
