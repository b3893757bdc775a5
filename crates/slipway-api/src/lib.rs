//! Provider contract and shared plumbing for slipway backends.
//!
//! The `slipway-api` crate defines everything both sides of the isolation
//! boundary agree on: the [`ServiceProvider`] capability trait every embedded
//! service implements, the control-channel [`protocol`] the host uses to drive
//! a provider living in another process, the [`config`] keys and resolution
//! helpers shared by the CLI and the backends, and the [`ProviderHarness`]
//! serve loop a backend binary wraps around its provider.
//!
//! A backend binary is typically nothing more than a provider implementation
//! plus a harness:
//!
//! ```rust,no_run
//! use std::io;
//!
//! use slipway_api::{ProviderError, ProviderHarness, ServiceProvider};
//!
//! struct Quiet;
//!
//! impl ServiceProvider for Quiet {
//!     fn launch(&self, _block: bool) -> Result<(), ProviderError> {
//!         Ok(())
//!     }
//!     fn stop(&self) -> Result<(), ProviderError> {
//!         Ok(())
//!     }
//!     fn is_running(&self) -> bool {
//!         false
//!     }
//!     fn port(&self) -> Option<u16> {
//!         None
//!     }
//!     fn base_url(&self) -> Option<String> {
//!         None
//!     }
//! }
//!
//! # fn main() -> Result<(), slipway_api::harness::HarnessError> {
//! let harness = ProviderHarness::new("quiet", Quiet);
//! harness.run(io::stdin().lock(), io::stdout().lock())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod contract;
pub mod harness;
pub mod net;
pub mod protocol;
pub mod telemetry;

pub use self::channel::{ChannelError, ControlChannel, JsonlChannel};
pub use self::config::{ConfigError, ProviderSettings};
pub use self::contract::{ProviderError, ServiceProvider};
pub use self::harness::ProviderHarness;
pub use self::protocol::{
    CONTRACT_OPERATIONS, ControlRequest, ControlResponse, PROTOCOL_VERSION,
};
pub use self::telemetry::LogFormat;
