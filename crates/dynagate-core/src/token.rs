//! Encrypted connection tokens.
//!
//! A token is URL-safe base64 of `[12-byte nonce][ciphertext][16-byte tag]`,
//! sealed with AES-256-GCM under a process-wide key. The plaintext is a JSON
//! object carrying the same fields as a connection descriptor plus an
//! issuance timestamp. Tokens are minted out-of-band by a trusted issuer;
//! this module provides both directions so the issuer and the gateway share
//! one wire format.

use crate::error::{GateError, GateResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use serde::{Deserialize, Deserializer, Serialize};

/// Environment variable holding the 32-byte AES-256 key.
pub const ENCRYPTION_KEY_ENV: &str = "DYNAGATE_ENCRYPTION_KEY";

/// Decrypted contents of a connection token.
///
/// Unknown JSON fields are ignored. `port` is kept as the raw string form:
/// the factory owns all port parsing and defaulting, for tokens and plain
/// request parameters alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default, deserialize_with = "lenient_port")]
    pub port: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Issuance time, milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: u64,
}

/// Accept a port given as either a JSON number or a string.
///
/// Any other JSON type is treated as absent rather than rejecting the whole
/// token; port fallback is the factory's concern.
fn lenient_port<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n.to_string()),
        Some(Raw::Text(s)) => Some(s),
        _ => None,
    })
}

/// AES-256-GCM codec for connection tokens.
///
/// The key is read-only after construction; a cipher can be shared freely
/// across request tasks.
pub struct TokenCipher {
    key: [u8; 32],
}

impl TokenCipher {
    /// Build a cipher from a raw 32-byte key.
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Build a cipher from arbitrary key material, enforcing the AES-256
    /// key length.
    pub fn from_key_material(material: &[u8]) -> GateResult<Self> {
        let key: [u8; 32] = material.try_into().map_err(|_| {
            GateError::Config(format!(
                "encryption key must be exactly 32 bytes, got {}",
                material.len()
            ))
        })?;
        Ok(Self::new(key))
    }

    /// Load the key from [`ENCRYPTION_KEY_ENV`].
    ///
    /// Absence or wrong length is a startup-fatal configuration error.
    pub fn from_env() -> GateResult<Self> {
        let raw = std::env::var(ENCRYPTION_KEY_ENV)
            .map_err(|_| GateError::Config(format!("{ENCRYPTION_KEY_ENV} is not set")))?;
        Self::from_key_material(raw.as_bytes())
    }

    /// Decrypt and parse a connection token.
    ///
    /// Fails with [`GateError::MalformedToken`] when the input is not a
    /// plausible encrypted blob, and with [`GateError::Decrypt`] for every
    /// authentication failure — wrong key and tampered ciphertext are
    /// indistinguishable by design.
    pub fn decode(&self, token: &str) -> GateResult<TokenClaims> {
        let decoded = URL_SAFE_NO_PAD
            .decode(token.trim().trim_end_matches('='))
            .map_err(|_| GateError::MalformedToken)?;
        if decoded.len() < NONCE_LEN {
            return Err(GateError::MalformedToken);
        }

        let (nonce_bytes, sealed) = decoded.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| GateError::Decrypt)?;

        let mut in_out = sealed.to_vec();
        let plaintext = self
            .aead_key()
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| GateError::Decrypt)?;

        let claims: TokenClaims = serde_json::from_slice(plaintext)
            .map_err(|e| GateError::Validation(format!("token payload is not valid JSON: {e}")))?;

        if claims.protocol.trim().is_empty() || claims.hostname.trim().is_empty() {
            return Err(GateError::Validation(
                "token is missing protocol/hostname".to_string(),
            ));
        }

        Ok(claims)
    }

    /// Seal connection claims into a token.
    ///
    /// Every call draws a fresh random 12-byte nonce from the system CSPRNG.
    pub fn encode(&self, claims: &TokenClaims) -> String {
        let plaintext = serde_json::to_vec(claims).expect("claims serialize to JSON");
        self.seal(&plaintext)
    }

    fn seal(&self, plaintext: &[u8]) -> String {
        use ring::rand::{SecureRandom, SystemRandom};
        let mut nonce_bytes = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce_bytes)
            .expect("RNG failure");

        let mut in_out = plaintext.to_vec();
        self.aead_key()
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .expect("AES-GCM seal");

        let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&in_out);
        URL_SAFE_NO_PAD.encode(blob)
    }

    fn aead_key(&self) -> LessSafeKey {
        // Key length is enforced at construction, so this cannot fail.
        LessSafeKey::new(UnboundKey::new(&AES_256_GCM, &self.key).expect("32-byte AES-256 key"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> TokenCipher {
        TokenCipher::new(*b"0123456789abcdef0123456789abcdef")
    }

    fn claims() -> TokenClaims {
        TokenClaims {
            protocol: "rdp".to_string(),
            hostname: "win.example.net".to_string(),
            port: Some("3390".to_string()),
            username: Some("admin".to_string()),
            password: Some("hunter2".to_string()),
            timestamp: 1_722_000_000_000,
        }
    }

    #[test]
    fn round_trip() {
        let c = cipher();
        let token = c.encode(&claims());
        let decoded = c.decode(&token).unwrap();
        assert_eq!(decoded, claims());
    }

    #[test]
    fn every_flipped_byte_fails_closed() {
        let c = cipher();
        let token = c.encode(&claims());
        let blob = URL_SAFE_NO_PAD.decode(&token).unwrap();

        for i in 0..blob.len() {
            let mut tampered = blob.clone();
            tampered[i] ^= 0x01;
            let tampered_token = URL_SAFE_NO_PAD.encode(&tampered);
            match c.decode(&tampered_token) {
                Err(GateError::Decrypt) => {}
                other => panic!("byte {i}: expected Decrypt, got {other:?}"),
            }
        }
    }

    #[test]
    fn wrong_key_is_indistinguishable_from_tampering() {
        let token = cipher().encode(&claims());
        let other = TokenCipher::new(*b"ffffffffffffffffffffffffffffffff");
        assert!(matches!(other.decode(&token), Err(GateError::Decrypt)));
    }

    #[test]
    fn garbage_is_malformed() {
        let c = cipher();
        assert!(matches!(
            c.decode("not/base64!!"),
            Err(GateError::MalformedToken)
        ));
        // Valid base64 but shorter than a nonce.
        let short = URL_SAFE_NO_PAD.encode([0u8; 8]);
        assert!(matches!(c.decode(&short), Err(GateError::MalformedToken)));
    }

    #[test]
    fn padded_tokens_are_accepted() {
        let c = cipher();
        let token = c.encode(&claims());
        let padded = format!("{token}==");
        assert_eq!(c.decode(&padded).unwrap(), claims());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let c = cipher();
        let token = c.seal(
            br#"{"protocol":"ssh","hostname":"h","port":22,"color":"green","nested":{"a":1}}"#,
        );
        let decoded = c.decode(&token).unwrap();
        assert_eq!(decoded.protocol, "ssh");
        assert_eq!(decoded.port, Some("22".to_string()));
    }

    #[test]
    fn numeric_and_string_ports_both_parse() {
        let c = cipher();
        let numeric = c.seal(br#"{"protocol":"vnc","hostname":"h","port":5901}"#);
        assert_eq!(c.decode(&numeric).unwrap().port, Some("5901".to_string()));

        let text = c.seal(br#"{"protocol":"vnc","hostname":"h","port":"5901"}"#);
        assert_eq!(c.decode(&text).unwrap().port, Some("5901".to_string()));
    }

    #[test]
    fn missing_required_fields_fail_validation() {
        let c = cipher();
        let token = c.seal(br#"{"protocol":"ssh"}"#);
        assert!(matches!(c.decode(&token), Err(GateError::Validation(_))));
    }

    #[test]
    fn from_key_material_enforces_length() {
        assert!(TokenCipher::from_key_material(b"short").is_err());
        assert!(TokenCipher::from_key_material(&[7u8; 32]).is_ok());
    }

    #[test]
    fn nonces_are_fresh_per_encode() {
        let c = cipher();
        let a = c.encode(&claims());
        let b = c.encode(&claims());
        assert_ne!(a, b);
    }
}
