//! HMAC session tickets.
//!
//! A ticket binds a connection ID to an expiry time so the host can hand an
//! authenticated session back to its client statelessly.
//! Format: URL-safe base64 of `[8-byte expiry][32-byte HMAC-SHA256]`.

use crate::descriptor::ConnectionId;
use crate::error::{GateError, GateResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::hmac;

const TICKET_LEN: usize = 8 + 32;

/// Mint a session ticket for a connection.
///
/// The ticket signs the expiry together with the connection ID under the
/// server secret.
pub fn mint_ticket(secret: &[u8], connection_id: &ConnectionId, ttl_secs: u64) -> String {
    let now = unix_now();
    let expiry = now + ttl_secs;

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    let tag = hmac::sign(&key, &signed_bytes(expiry, connection_id));

    let mut ticket = Vec::with_capacity(TICKET_LEN);
    ticket.extend_from_slice(&expiry.to_be_bytes());
    ticket.extend_from_slice(tag.as_ref());
    URL_SAFE_NO_PAD.encode(ticket)
}

/// Verify a session ticket against a connection ID.
///
/// Checks both the HMAC signature and the expiry time.
pub fn verify_ticket(secret: &[u8], connection_id: &ConnectionId, ticket: &str) -> GateResult<()> {
    let raw = URL_SAFE_NO_PAD
        .decode(ticket.trim_end_matches('='))
        .map_err(|_| GateError::Ticket("ticket is not valid base64".to_string()))?;
    if raw.len() != TICKET_LEN {
        return Err(GateError::Ticket(format!(
            "invalid ticket length: expected {TICKET_LEN}, got {}",
            raw.len()
        )));
    }

    let expiry_bytes: [u8; 8] = raw[..8].try_into().expect("8-byte slice");
    let expiry = u64::from_be_bytes(expiry_bytes);
    if unix_now() > expiry {
        return Err(GateError::Ticket("ticket expired".to_string()));
    }

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hmac::verify(&key, &signed_bytes(expiry, connection_id), &raw[8..])
        .map_err(|_| GateError::Ticket("invalid ticket signature".to_string()))
}

/// Generate a random ticket-signing secret (32 bytes).
pub fn generate_secret() -> Vec<u8> {
    use ring::rand::{SecureRandom, SystemRandom};
    let rng = SystemRandom::new();
    let mut secret = vec![0u8; 32];
    rng.fill(&mut secret).expect("RNG failure");
    secret
}

fn signed_bytes(expiry: u64, connection_id: &ConnectionId) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&expiry.to_be_bytes());
    data.extend_from_slice(connection_id.as_str().as_bytes());
    data
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs()
}
