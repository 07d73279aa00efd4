//! Rotating proxy selection.
//!
//! Every incoming request gets its own [`ProxyConfig`]. A fresh session token is appended to
//! the proxy username, which makes the provider bind a new sticky session (and egress IP)
//! for that request.

use uuid::Uuid;

use crate::config::ProxySettings;

/// Length of the session token appended to the proxy username
pub const SESSION_TOKEN_LEN: usize = 8;

/// Transport configuration for outbound YouTube calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyConfig {
    /// Connect to YouTube directly
    Direct,

    /// Route through the rotating proxy with a per-request session
    Rotating {
        endpoint: String,
        username: String,
        password: String,
        session_token: String,
    },
}

impl ProxyConfig {
    pub fn is_direct(&self) -> bool {
        matches!(self, ProxyConfig::Direct)
    }

    pub fn session_token(&self) -> Option<&str> {
        match self {
            ProxyConfig::Direct => None,
            ProxyConfig::Rotating { session_token, .. } => Some(session_token),
        }
    }

    /// Proxy URL with percent-encoded credentials, `None` for direct connections
    pub fn proxy_url(&self) -> Option<String> {
        match self {
            ProxyConfig::Direct => None,
            ProxyConfig::Rotating {
                endpoint,
                username,
                password,
                ..
            } => Some(format!(
                "http://{}:{}@{}",
                urlencoding::encode(username),
                urlencoding::encode(password),
                endpoint
            )),
        }
    }

    /// Build the reqwest proxy for this configuration
    pub fn to_reqwest_proxy(&self) -> crate::Result<Option<reqwest::Proxy>> {
        let Some(url) = self.proxy_url() else {
            return Ok(None);
        };

        let proxy = reqwest::Proxy::all(&url)
            .map_err(|e| crate::TranscriptError::ClientBuild(format!("invalid proxy: {}", e)))?;
        Ok(Some(proxy))
    }
}

impl std::fmt::Display for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyConfig::Direct => write!(f, "direct"),
            ProxyConfig::Rotating {
                endpoint, username, ..
            } => write!(f, "proxy {}@{}", username, endpoint),
        }
    }
}

/// Short per-request session token: the first 8 hex digits of a v4 UUID
pub fn generate_session_token() -> String {
    Uuid::new_v4().simple().to_string()[..SESSION_TOKEN_LEN].to_string()
}

/// Append the session suffix the proxy provider uses to pin a sticky session
pub fn rotated_username(base_username: &str, session_token: &str) -> String {
    format!("{}-session-{}", base_username, session_token)
}

/// Pick the transport for one request.
///
/// Never fails: missing credentials or a proxy that cannot be built both yield
/// [`ProxyConfig::Direct`].
pub fn select_proxy(settings: &ProxySettings) -> ProxyConfig {
    let Some((username, password)) = settings.credentials() else {
        tracing::debug!("No proxy credentials configured, using direct connection");
        return ProxyConfig::Direct;
    };

    let session_token = generate_session_token();
    let config = ProxyConfig::Rotating {
        endpoint: settings.endpoint.clone(),
        username: rotated_username(username, &session_token),
        password: password.to_string(),
        session_token,
    };

    match config.to_reqwest_proxy() {
        Ok(_) => {
            tracing::debug!("Using {}", config);
            config
        }
        Err(e) => {
            tracing::warn!("Failed to configure rotating proxy, falling back to direct: {}", e);
            ProxyConfig::Direct
        }
    }
}
