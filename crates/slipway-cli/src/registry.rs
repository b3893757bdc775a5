//! Cross-goal provider registry.
//!
//! Goals in one build run share the providers they started through this
//! value. The registry is deliberately an explicit argument of every goal
//! handler rather than process-global state, so tests (and any embedding)
//! can run isolated registries side by side.

use std::collections::HashMap;
use std::fmt;

use slipway_api::ServiceProvider;

/// Owned provider handle as stored in the registry.
pub type ProviderHandle = Box<dyn ServiceProvider>;

/// Keyed store of live provider handles.
///
/// Entries live until they are removed or the registry is dropped; putting
/// a handle under an existing id replaces the previous entry.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: HashMap<String, ProviderHandle>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handle` under `id`, replacing any previous entry.
    pub fn put(&mut self, id: impl Into<String>, handle: ProviderHandle) {
        self.entries.insert(id.into(), handle);
    }

    /// Borrows the handle registered under `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&dyn ServiceProvider> {
        self.entries.get(id).map(Box::as_ref)
    }

    /// Removes and returns the handle registered under `id`.
    pub fn remove(&mut self, id: &str) -> Option<ProviderHandle> {
        self.entries.remove(id)
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no providers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
