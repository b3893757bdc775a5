//! Boundary adapter between the host and isolated provider processes.
//!
//! The host never holds a provider object directly. It holds a
//! [`ProcessProvider`], a hand-written stand-in that implements the
//! [`slipway_api::ServiceProvider`] contract by forwarding each operation
//! over the child's control channel. The stand-in is only handed out after
//! a describe handshake has verified that the remote side offers every
//! contract operation, so a contract mismatch surfaces at creation instead
//! of as a confusing failure mid-lifecycle.

mod error;
mod process;

pub use error::AdapterError;
pub use process::{ChildChannel, ProcessProvider};
