//! Failures raised while resolving and starting implementations.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Errors from the isolation layer. Both variants are fatal to the calling
/// phase: a missing or broken implementation does not become available by
/// waiting.
#[derive(Debug, Clone, Error)]
pub enum IsolateError {
    /// No visible root holds the named implementation.
    #[error("implementation `{name}` not found in isolation context ({searched} roots searched)")]
    ImplementationNotFound {
        /// Name that failed to resolve.
        name: String,
        /// How many roots were visible to the search.
        searched: usize,
    },
    /// The implementation resolved but the process could not be started.
    #[error("implementation `{name}` could not be started")]
    NotInstantiable {
        /// Name of the implementation.
        name: String,
        /// Underlying OS failure.
        #[source]
        source: Arc<io::Error>,
    },
}
