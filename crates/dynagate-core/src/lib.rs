//! dynagate-core: Shared library for dynagate.
//!
//! Provides the connection descriptor model, protocol port policy, the
//! AES-256-GCM connection-token codec, and HMAC session tickets.

pub mod descriptor;
pub mod error;
pub mod ports;
pub mod ticket;
pub mod token;

// Re-export commonly used items at crate root.
pub use descriptor::{ConnectionDescriptor, ConnectionId};
pub use error::{GateError, GateResult};
pub use ticket::{generate_secret, mint_ticket, verify_ticket};
pub use token::{TokenCipher, TokenClaims, ENCRYPTION_KEY_ENV};
