//! Construction options for network-backed stores.
//!
//! Sizes and capacities for wrappers and readers are constructor parameters
//! on the types themselves; this module only carries the knobs shared by
//! network clients.

use std::time::Duration;

/// Default request timeout for network stores.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for constructing a network-backed store client.
///
/// Timeouts are configured per store at construction and propagated to the
/// underlying client; readers never impose timeouts of their own.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Total per-request timeout.
    pub timeout: Duration,
    /// Headers added to every request (e.g. authentication).
    pub default_headers: Vec<(String, String)>,
}

impl ClientOptions {
    /// Options with the given timeout and no default headers.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    /// Add a header to every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            default_headers: Vec::new(),
        }
    }
}
