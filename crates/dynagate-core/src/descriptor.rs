//! Connection descriptors and their opaque identifiers.
//!
//! A [`ConnectionDescriptor`] is the full set of target-address and
//! credential fields needed to open a downstream remote-access session.
//! Descriptors are finalized before registration and never mutated after.

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Opaque handle identifying a registered connection.
///
/// Always server-generated: 16 random bytes, hex-encoded (128 bits of
/// entropy). Never derived from caller input and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One provisioned remote-access target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Protocol identifier ("ssh", "rdp", "vnc", or an extension).
    pub protocol: String,
    /// Target host. Non-empty.
    pub hostname: String,
    /// Target port, 1–65535.
    pub port: u16,
    /// Optional login username.
    pub username: Option<String>,
    /// Optional login password.
    pub password: Option<String>,
    /// When the descriptor was built. Immutable.
    pub created_at: SystemTime,
    /// Protocol-specific tuning parameters (color depth, DPI, font, ...).
    pub extra_parameters: BTreeMap<String, String>,
}

impl ConnectionDescriptor {
    /// Age of this descriptor relative to now.
    ///
    /// Returns zero if the system clock has moved backwards.
    pub fn age(&self) -> std::time::Duration {
        SystemTime::now()
            .duration_since(self.created_at)
            .unwrap_or_default()
    }
}
