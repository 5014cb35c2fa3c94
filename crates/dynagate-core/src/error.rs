use thiserror::Error;

/// Errors produced by the dynagate provisioning layer.
#[derive(Debug, Error)]
pub enum GateError {
    /// Startup-time configuration problem (missing or mis-sized secret key).
    /// Fatal: the process must not start.
    #[error("configuration error: {0}")]
    Config(String),

    /// The token is not a well-formed encrypted blob (bad base64, too short).
    #[error("malformed token")]
    MalformedToken,

    /// Authenticated decryption failed. Deliberately carries no detail:
    /// a wrong key and a tampered ciphertext must be indistinguishable.
    #[error("token decryption failed")]
    Decrypt,

    /// Required connection fields are missing or invalid.
    #[error("validation error: {0}")]
    Validation(String),

    /// No connection registered under the given ID.
    #[error("connection not found: {0}")]
    NotFound(String),

    /// The registry could not create an entry (ID collision).
    #[error("registry error: {0}")]
    Registry(String),

    /// An invalid session ticket.
    #[error("ticket error: {0}")]
    Ticket(String),

    /// The outbound redirect sink could not deliver a redirect.
    #[error("redirect error: {0}")]
    Redirect(String),
}

pub type GateResult<T> = Result<T, GateError>;
