//! Authentication gateway.
//!
//! Orchestrates one inbound request: decode the token or read plain
//! parameters, build a descriptor, register it, run the redirect guard, and
//! mint a session ticket bound to the connection ID. Tokens and parameters
//! are attacker-controlled, so every per-request failure is contained here
//! and collapsed into a uniform decline — a caller can not distinguish a
//! bad ciphertext from a missing hostname.

use std::sync::Arc;
use tracing::{debug, info};

use dynagate_core::{ticket, ConnectionDescriptor, ConnectionId, GateError, GateResult, TokenCipher};

use crate::config::ProviderConfig;
use crate::factory::{self, RequestParameters, TokenParameters};
use crate::redirect::{RedirectDisposition, RedirectGuard};
use crate::registry::ConnectionRegistry;
use crate::request::{
    AuthRequest, CONNECTION_ID_PARAM, HOSTNAME_PARAM, PROTOCOL_PARAM, TOKEN_PARAM,
};

/// An established session, bound to one provisioned connection.
#[derive(Debug, Clone)]
pub struct SessionTicket {
    /// The connection this session is authorized for.
    pub connection_id: ConnectionId,
    /// HMAC ticket the host hands back to its client.
    pub ticket: String,
}

/// Result of one authentication attempt.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// Session established.
    Authenticated(SessionTicket),
    /// A clean-URL redirect was emitted; no session on this request.
    Interrupted,
    /// Not a dynamic-connection request, or its credentials were rejected.
    Declined,
}

/// Entry point for the host's authentication SPI.
///
/// Holds the process-wide registry handle and the token cipher; the
/// ticket-signing secret is generated once at construction.
pub struct AuthenticationGateway {
    registry: Arc<ConnectionRegistry>,
    cipher: TokenCipher,
    ticket_secret: Vec<u8>,
    ticket_ttl: u64,
}

impl AuthenticationGateway {
    pub fn new(registry: Arc<ConnectionRegistry>, cipher: TokenCipher, config: &ProviderConfig) -> Self {
        Self {
            registry,
            cipher,
            ticket_secret: ticket::generate_secret(),
            ticket_ttl: config.ticket_ttl,
        }
    }

    /// Authenticate one request.
    ///
    /// Never fails: hostile or malformed input declines, it does not
    /// propagate.
    pub async fn authenticate(&self, request: &dyn AuthRequest) -> AuthOutcome {
        match self.try_authenticate(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                info!(error = %e, "authentication declined");
                AuthOutcome::Declined
            }
        }
    }

    /// Check a previously issued session ticket against a connection ID.
    pub fn verify_session(&self, session: &SessionTicket) -> GateResult<()> {
        ticket::verify_ticket(&self.ticket_secret, &session.connection_id, &session.ticket)
    }

    async fn try_authenticate(&self, request: &dyn AuthRequest) -> GateResult<AuthOutcome> {
        let mut guard = RedirectGuard::for_request(request);

        if guard.is_settled() {
            return self.settle(request).await;
        }

        let descriptor = match self.descriptor_from(request)? {
            Some(descriptor) => descriptor,
            None => {
                debug!("not a dynamic connection request");
                return Ok(AuthOutcome::Declined);
            }
        };

        let protocol = descriptor.protocol.clone();
        let hostname = descriptor.hostname.clone();
        let id = self.registry.create(descriptor).await?;
        guard.mark_provisioned();
        info!(
            id = %id,
            protocol = %protocol,
            hostname = %hostname,
            "provisioned dynamic connection"
        );

        match guard.finish(request, &id) {
            RedirectDisposition::Interrupted => Ok(AuthOutcome::Interrupted),
            RedirectDisposition::Complete => Ok(self.establish(id)),
        }
    }

    /// A replayed provisioning redirect: bind to the connection it named.
    ///
    /// Never creates, never redirects again. A marker without a known
    /// connection ID declines rather than re-provisioning.
    async fn settle(&self, request: &dyn AuthRequest) -> GateResult<AuthOutcome> {
        let id = request
            .parameter(CONNECTION_ID_PARAM)
            .map(ConnectionId::from)
            .ok_or_else(|| {
                GateError::Validation("redirected request carries no connection id".to_string())
            })?;

        if !self.registry.exists(&id).await {
            return Err(GateError::NotFound(id.to_string()));
        }

        debug!(id = %id, "settled redirected request");
        Ok(self.establish(id))
    }

    fn establish(&self, id: ConnectionId) -> AuthOutcome {
        let ticket = ticket::mint_ticket(&self.ticket_secret, &id, self.ticket_ttl);
        AuthOutcome::Authenticated(SessionTicket {
            connection_id: id,
            ticket,
        })
    }

    /// Build a descriptor from whichever credential shape the request
    /// carries: an encrypted token wins over plain parameters.
    fn descriptor_from(
        &self,
        request: &dyn AuthRequest,
    ) -> GateResult<Option<ConnectionDescriptor>> {
        if let Some(token) = request
            .parameter(TOKEN_PARAM)
            .filter(|t| !t.trim().is_empty())
        {
            let claims = self.cipher.decode(token)?;
            return factory::build(&TokenParameters::new(claims)).map(Some);
        }

        if request.parameter(PROTOCOL_PARAM).is_some()
            && request.parameter(HOSTNAME_PARAM).is_some()
        {
            return factory::build(&RequestParameters::new(request)).map(Some);
        }

        Ok(None)
    }
}
