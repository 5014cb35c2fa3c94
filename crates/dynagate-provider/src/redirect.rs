//! One-shot clean-URL redirect guard.
//!
//! A provisioning request arrives with credentials in its parameters. The
//! guard converts that URL into a credential-free one exactly once: the
//! first request provisions and is answered with a redirect to
//! `<app-root>/#/client/<id>?_redirected=true`; the replayed request carries
//! the marker, settles, and is never re-provisioned. Credentials therefore
//! survive in browser history for a single exchange at most, and the guard
//! can never loop.

use tracing::{debug, warn};

use dynagate_core::ConnectionId;

use crate::request::{AuthRequest, REDIRECTED_PARAM};

/// Lifecycle of redirect handling for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPhase {
    /// Nothing provisioned yet.
    Initial,
    /// A connection was registered on this request.
    Provisioned,
    /// The credential-free redirect went out; no session on this request.
    Redirected,
    /// The request already carried the one-shot marker. Terminal.
    Settled,
}

/// What the gateway should do after the guard has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectDisposition {
    /// Authentication on this request is interrupted by the redirect.
    Interrupted,
    /// Complete authentication on this request with the provisioned ID.
    Complete,
}

/// Per-request redirect state machine. Transient: lives for one exchange.
pub struct RedirectGuard {
    phase: RedirectPhase,
}

impl RedirectGuard {
    /// Read the one-shot marker off the request and start in either
    /// `Initial` or the terminal `Settled` phase.
    pub fn for_request(request: &dyn AuthRequest) -> Self {
        let phase = if request.parameter(REDIRECTED_PARAM) == Some("true") {
            RedirectPhase::Settled
        } else {
            RedirectPhase::Initial
        };
        Self { phase }
    }

    pub fn phase(&self) -> RedirectPhase {
        self.phase
    }

    /// Whether this request is the replay of a prior provisioning redirect.
    pub fn is_settled(&self) -> bool {
        self.phase == RedirectPhase::Settled
    }

    /// Record that a connection was registered on this request.
    pub fn mark_provisioned(&mut self) {
        debug_assert_eq!(self.phase, RedirectPhase::Initial);
        self.phase = RedirectPhase::Provisioned;
    }

    /// Attempt the clean-URL redirect for a freshly provisioned connection.
    ///
    /// If the transport has no redirect capability, or emission fails, the
    /// guard falls back to completing authentication on this request — the
    /// connection is already registered and must not be orphaned or
    /// re-provisioned on a retry.
    pub fn finish(&mut self, request: &dyn AuthRequest, id: &ConnectionId) -> RedirectDisposition {
        debug_assert_eq!(self.phase, RedirectPhase::Provisioned);

        let Some(sink) = request.redirect_sink() else {
            debug!(id = %id, "no redirect capability, completing on current request");
            return RedirectDisposition::Complete;
        };

        let location = clean_url(request.app_root(), id);
        match sink.send_redirect(&location) {
            Ok(()) => {
                self.phase = RedirectPhase::Redirected;
                debug!(id = %id, location = %location, "redirected to clean URL");
                RedirectDisposition::Interrupted
            }
            Err(e) => {
                warn!(id = %id, error = %e, "redirect failed, completing on current request");
                RedirectDisposition::Complete
            }
        }
    }
}

/// The credential-free target URL: connection ID and one-shot marker only.
pub fn clean_url(app_root: &str, id: &ConnectionId) -> String {
    format!("{app_root}/#/client/{id}?{REDIRECTED_PARAM}=true")
}
