//! Client configuration — where to connect and how to authenticate.
//!
//! The credential is an opaque bearer token sourced outside this crate (the
//! surrounding app owns acquisition and storage). A missing credential is a
//! valid configuration: it suppresses connection attempts entirely instead
//! of erroring.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

/// Connection settings shared by kiosk and dashboard clients.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    api_base_url: String,
    credential: Option<String>,
}

impl ClientConfig {
    /// Create a config pointing at the platform's API base URL, e.g.
    /// `https://park.example.com/api/v1`. The realtime gateway lives on the
    /// same origin; see [`ClientConfig::socket_base_url`].
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self { api_base_url: api_base_url.into(), credential: None }
    }

    /// Attach the bearer credential used during the transport handshake.
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    #[must_use]
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// Base URL of the realtime gateway: the API base URL with its path
    /// suffix stripped. `https://host/api/v1` becomes `https://host`.
    #[must_use]
    pub fn socket_base_url(&self) -> String {
        let trimmed = self.api_base_url.trim_end_matches('/');

        if let Some(scheme_end) = trimmed.find("://") {
            let authority_start = scheme_end + 3;
            let rest = &trimmed[authority_start..];
            return match rest.find('/') {
                Some(slash) => trimmed[..authority_start + slash].to_owned(),
                None => trimmed.to_owned(),
            };
        }

        // Schemeless value: keep the authority segment only.
        trimmed.split('/').next().unwrap_or(trimmed).to_owned()
    }
}
