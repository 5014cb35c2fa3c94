//! Inbound request abstraction.
//!
//! The host framework hands authentication a bag of request parameters plus,
//! when the transport supports it, an outbound redirect capability. Both are
//! modeled as explicit traits decided at construction time — nothing is
//! discovered at runtime.

use std::collections::HashMap;
use std::sync::Arc;

use dynagate_core::GateResult;

/// Parameter carrying an encrypted connection token.
pub const TOKEN_PARAM: &str = "token";
/// Parameter naming the target protocol.
pub const PROTOCOL_PARAM: &str = "protocol";
/// Parameter naming the target host.
pub const HOSTNAME_PARAM: &str = "hostname";
/// Parameter naming the target port.
pub const PORT_PARAM: &str = "port";
/// Parameter carrying the login username.
pub const USERNAME_PARAM: &str = "username";
/// Parameter carrying the login password.
pub const PASSWORD_PARAM: &str = "password";
/// Parameter echoing the connection ID on a redirected request.
pub const CONNECTION_ID_PARAM: &str = "id";
/// One-shot marker proving a request is the replay of a provisioning
/// redirect.
pub const REDIRECTED_PARAM: &str = "_redirected";

/// Parameters consumed by the provisioning flow itself. Everything else a
/// request carries passes through as protocol-tuning extras.
pub const RESERVED_PARAMS: &[&str] = &[
    TOKEN_PARAM,
    PROTOCOL_PARAM,
    HOSTNAME_PARAM,
    PORT_PARAM,
    USERNAME_PARAM,
    PASSWORD_PARAM,
    CONNECTION_ID_PARAM,
    REDIRECTED_PARAM,
];

/// Outbound redirect capability of a request's transport.
pub trait RedirectSink: Send + Sync {
    /// Deliver a redirect to `location` on the current exchange.
    fn send_redirect(&self, location: &str) -> GateResult<()>;
}

/// A credential bag presented for authentication.
pub trait AuthRequest: Send + Sync {
    /// Value of a named request parameter, if present.
    fn parameter(&self, name: &str) -> Option<&str>;

    /// Names of all parameters on the request.
    fn parameter_names(&self) -> Vec<String>;

    /// Application root path prepended to redirect targets.
    fn app_root(&self) -> &str {
        ""
    }

    /// The redirect capability, when the transport can still emit one.
    fn redirect_sink(&self) -> Option<&dyn RedirectSink>;
}

/// A concrete [`AuthRequest`] backed by a parameter map.
///
/// Hosts translate their native request type into one of these; tests build
/// them directly.
#[derive(Default)]
pub struct ProvisionRequest {
    parameters: HashMap<String, String>,
    app_root: String,
    sink: Option<Arc<dyn RedirectSink>>,
}

impl ProvisionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a request parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Set the application root path.
    pub fn with_app_root(mut self, app_root: impl Into<String>) -> Self {
        self.app_root = app_root.into();
        self
    }

    /// Attach the outbound redirect capability.
    pub fn with_redirect_sink(mut self, sink: Arc<dyn RedirectSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl AuthRequest for ProvisionRequest {
    fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    fn parameter_names(&self) -> Vec<String> {
        self.parameters.keys().cloned().collect()
    }

    fn app_root(&self) -> &str {
        &self.app_root
    }

    fn redirect_sink(&self) -> Option<&dyn RedirectSink> {
        self.sink.as_deref()
    }
}
