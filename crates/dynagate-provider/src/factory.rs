//! Connection factory.
//!
//! Builds an immutable [`ConnectionDescriptor`] from either a decoded token
//! or raw request parameters, applying port defaults and protocol-specific
//! tuning parameters. Both inputs go through one [`ParameterSource`] seam so
//! the build rules cannot drift between the two authentication paths.

use std::collections::BTreeMap;
use std::time::SystemTime;
use tracing::warn;

use dynagate_core::{ports, ConnectionDescriptor, GateError, GateResult, TokenClaims};

use crate::request::{
    AuthRequest, HOSTNAME_PARAM, PASSWORD_PARAM, PORT_PARAM, PROTOCOL_PARAM, RESERVED_PARAMS,
    USERNAME_PARAM,
};

/// Uniform field access over the two credential shapes.
pub trait ParameterSource {
    fn protocol(&self) -> Option<&str>;
    fn hostname(&self) -> Option<&str>;
    /// Raw port value. Parsing and defaulting happen in [`build`].
    fn port(&self) -> Option<String>;
    fn username(&self) -> Option<&str>;
    fn password(&self) -> Option<&str>;
    /// Caller-supplied protocol-tuning parameters.
    fn extra_parameters(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// Parameter source backed by decrypted token claims.
pub struct TokenParameters {
    claims: TokenClaims,
}

impl TokenParameters {
    pub fn new(claims: TokenClaims) -> Self {
        Self { claims }
    }
}

impl ParameterSource for TokenParameters {
    fn protocol(&self) -> Option<&str> {
        Some(&self.claims.protocol)
    }

    fn hostname(&self) -> Option<&str> {
        Some(&self.claims.hostname)
    }

    fn port(&self) -> Option<String> {
        self.claims.port.clone()
    }

    fn username(&self) -> Option<&str> {
        self.claims.username.as_deref()
    }

    fn password(&self) -> Option<&str> {
        self.claims.password.as_deref()
    }
}

/// Parameter source backed by plain request parameters.
///
/// Any parameter outside the reserved provisioning set passes through as a
/// protocol-tuning extra.
pub struct RequestParameters<'a> {
    request: &'a dyn AuthRequest,
}

impl<'a> RequestParameters<'a> {
    pub fn new(request: &'a dyn AuthRequest) -> Self {
        Self { request }
    }
}

impl ParameterSource for RequestParameters<'_> {
    fn protocol(&self) -> Option<&str> {
        self.request.parameter(PROTOCOL_PARAM)
    }

    fn hostname(&self) -> Option<&str> {
        self.request.parameter(HOSTNAME_PARAM)
    }

    fn port(&self) -> Option<String> {
        self.request.parameter(PORT_PARAM).map(str::to_string)
    }

    fn username(&self) -> Option<&str> {
        self.request.parameter(USERNAME_PARAM)
    }

    fn password(&self) -> Option<&str> {
        self.request.parameter(PASSWORD_PARAM)
    }

    fn extra_parameters(&self) -> BTreeMap<String, String> {
        self.request
            .parameter_names()
            .into_iter()
            .filter(|name| !RESERVED_PARAMS.contains(&name.as_str()))
            .filter_map(|name| {
                self.request
                    .parameter(&name)
                    .map(|value| (name.clone(), value.to_string()))
            })
            .collect()
    }
}

/// Build a complete, immutable descriptor from a parameter source.
///
/// Port resolution is lenient: an unparsable or out-of-range value falls
/// back to the protocol default and is logged as a recoverable anomaly, not
/// an error. Protocol tuning defaults never override caller-supplied keys.
pub fn build(source: &dyn ParameterSource) -> GateResult<ConnectionDescriptor> {
    let protocol = source
        .protocol()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GateError::Validation("missing protocol/hostname".to_string()))?
        .to_string();
    let hostname = source
        .hostname()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GateError::Validation("missing protocol/hostname".to_string()))?
        .to_string();

    let port = match source.port() {
        Some(raw) => match raw.trim().parse::<u16>() {
            Ok(p) if p >= 1 => p,
            _ => {
                warn!(
                    port = %raw,
                    protocol = %protocol,
                    "unparsable port, falling back to protocol default"
                );
                ports::default_port(&protocol)
            }
        },
        None => ports::default_port(&protocol),
    };

    let mut extra_parameters = source.extra_parameters();
    for (key, value) in protocol_defaults(&protocol) {
        extra_parameters
            .entry((*key).to_string())
            .or_insert_with(|| (*value).to_string());
    }

    Ok(ConnectionDescriptor {
        protocol,
        hostname,
        port,
        username: source.username().map(str::to_string),
        password: source.password().map(str::to_string),
        created_at: SystemTime::now(),
        extra_parameters,
    })
}

/// Protocol-specific tuning defaults, keyed case-insensitively.
fn protocol_defaults(protocol: &str) -> &'static [(&'static str, &'static str)] {
    match protocol.to_ascii_lowercase().as_str() {
        "rdp" => &[("security", "any"), ("ignore-cert", "true"), ("dpi", "96")],
        "ssh" => &[
            ("font-name", "Menlo, Consolas, monospace"),
            ("font-size", "12"),
        ],
        "vnc" => &[("color-depth", "32")],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ProvisionRequest;

    struct Raw {
        protocol: Option<&'static str>,
        hostname: Option<&'static str>,
        port: Option<&'static str>,
    }

    impl ParameterSource for Raw {
        fn protocol(&self) -> Option<&str> {
            self.protocol
        }
        fn hostname(&self) -> Option<&str> {
            self.hostname
        }
        fn port(&self) -> Option<String> {
            self.port.map(str::to_string)
        }
        fn username(&self) -> Option<&str> {
            None
        }
        fn password(&self) -> Option<&str> {
            None
        }
    }

    #[test]
    fn missing_hostname_fails_validation() {
        let source = Raw {
            protocol: Some("ssh"),
            hostname: None,
            port: None,
        };
        assert!(matches!(
            build(&source),
            Err(GateError::Validation(_))
        ));
    }

    #[test]
    fn blank_protocol_fails_validation() {
        let source = Raw {
            protocol: Some("   "),
            hostname: Some("h"),
            port: None,
        };
        assert!(build(&source).is_err());
    }

    #[test]
    fn unparsable_port_falls_back_to_protocol_default() {
        let source = Raw {
            protocol: Some("rdp"),
            hostname: Some("h"),
            port: Some("not-a-number"),
        };
        assert_eq!(build(&source).unwrap().port, 3389);
    }

    #[test]
    fn out_of_range_port_falls_back() {
        let source = Raw {
            protocol: Some("vnc"),
            hostname: Some("h"),
            port: Some("70000"),
        };
        assert_eq!(build(&source).unwrap().port, 5900);

        let zero = Raw {
            protocol: Some("vnc"),
            hostname: Some("h"),
            port: Some("0"),
        };
        assert_eq!(build(&zero).unwrap().port, 5900);
    }

    #[test]
    fn explicit_port_wins() {
        let source = Raw {
            protocol: Some("ssh"),
            hostname: Some("h"),
            port: Some("2222"),
        };
        assert_eq!(build(&source).unwrap().port, 2222);
    }

    #[test]
    fn absent_port_uses_protocol_default() {
        let source = Raw {
            protocol: Some("unknown-proto"),
            hostname: Some("h"),
            port: None,
        };
        // Unrecognized protocols share the SSH fallback.
        assert_eq!(build(&source).unwrap().port, 22);
    }

    #[test]
    fn protocol_defaults_are_merged() {
        let source = Raw {
            protocol: Some("RDP"),
            hostname: Some("h"),
            port: None,
        };
        let descriptor = build(&source).unwrap();
        assert_eq!(
            descriptor.extra_parameters.get("security"),
            Some(&"any".to_string())
        );
        assert_eq!(
            descriptor.extra_parameters.get("ignore-cert"),
            Some(&"true".to_string())
        );
        assert_eq!(descriptor.extra_parameters.get("dpi"), Some(&"96".to_string()));
    }

    #[test]
    fn explicit_extras_win_over_defaults() {
        let request = ProvisionRequest::new()
            .with_parameter("protocol", "rdp")
            .with_parameter("hostname", "h")
            .with_parameter("dpi", "192");
        let source = RequestParameters::new(&request);
        let descriptor = build(&source).unwrap();
        assert_eq!(descriptor.extra_parameters.get("dpi"), Some(&"192".to_string()));
        // Untouched defaults still merge in.
        assert_eq!(
            descriptor.extra_parameters.get("security"),
            Some(&"any".to_string())
        );
    }

    #[test]
    fn reserved_parameters_do_not_leak_into_extras() {
        let request = ProvisionRequest::new()
            .with_parameter("protocol", "vnc")
            .with_parameter("hostname", "h")
            .with_parameter("password", "secret")
            .with_parameter("_redirected", "true")
            .with_parameter("read-only", "true");
        let source = RequestParameters::new(&request);
        let descriptor = build(&source).unwrap();
        assert!(!descriptor.extra_parameters.contains_key("password"));
        assert!(!descriptor.extra_parameters.contains_key("_redirected"));
        assert_eq!(
            descriptor.extra_parameters.get("read-only"),
            Some(&"true".to_string())
        );
    }

    #[test]
    fn token_claims_feed_the_same_build_path() {
        let claims = TokenClaims {
            protocol: "ssh".to_string(),
            hostname: "bastion".to_string(),
            port: Some("2200".to_string()),
            username: Some("ops".to_string()),
            password: Some("pw".to_string()),
            timestamp: 0,
        };
        let descriptor = build(&TokenParameters::new(claims)).unwrap();
        assert_eq!(descriptor.port, 2200);
        assert_eq!(descriptor.username.as_deref(), Some("ops"));
        assert_eq!(
            descriptor.extra_parameters.get("font-size"),
            Some(&"12".to_string())
        );
    }
}
