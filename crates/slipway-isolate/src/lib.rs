//! Isolated execution contexts for slipway providers.
//!
//! A provider implementation must not resolve against the host tool's own
//! dependency set. This crate builds the boundary: a [`ContextProfile`]
//! collects scope-tagged resource locations, sealing it yields an
//! [`IsolationContext`] whose visible roots are the only places an
//! implementation name can resolve, and spawning through the context hands
//! the child a scrubbed environment carrying nothing but the slipway
//! settings and its own resource roots.
//!
//! ```rust,no_run
//! use slipway_api::config::ProviderSettings;
//! use slipway_isolate::{ContextProfile, ResolutionScope, ResourceSpec};
//!
//! # fn main() -> Result<(), slipway_isolate::IsolateError> {
//! let context = ContextProfile::new(ResolutionScope::Test)
//!     .with_resource(ResourceSpec::new(ResolutionScope::Test, "target/debug"))
//!     .seal();
//! let settings = ProviderSettings::new(8080, false, "/tmp/build".into());
//! let child = context.spawn_implementation("slipway-echo", &settings, &[])?;
//! # drop(child);
//! # Ok(()) }
//! ```

pub mod context;
pub mod error;
pub mod resource;
pub mod scope;
mod spawn;

pub use self::context::{ContextProfile, IsolationContext};
pub use self::error::IsolateError;
pub use self::resource::{ResourceSpec, ResourceSpecError};
pub use self::scope::ResolutionScope;
