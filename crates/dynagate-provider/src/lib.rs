//! dynagate-provider: dynamic connection provisioning for a remote-access
//! gateway.
//!
//! Authenticates callers via encrypted connection tokens or plain request
//! parameters, registers short-lived connection descriptors under opaque
//! IDs, and converts credential-bearing URLs into credential-free ones with
//! a one-shot redirect. The host framework supplies transport and session
//! mechanics; this crate supplies the provisioning core.

pub mod config;
pub mod directory;
pub mod factory;
pub mod gateway;
pub mod provider;
pub mod redirect;
pub mod registry;
pub mod request;

// Re-export commonly used items at crate root.
pub use config::ProviderConfig;
pub use directory::{ConnectionDirectory, ConnectionView, ROOT_GROUP};
pub use gateway::{AuthOutcome, AuthenticationGateway, SessionTicket};
pub use provider::DynamicConnectionProvider;
pub use registry::ConnectionRegistry;
pub use request::{AuthRequest, ProvisionRequest, RedirectSink};
