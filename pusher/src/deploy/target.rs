//! Target URL normalization

use url::Url;

use crate::errors::PushError;

const SECURE_SCHEME: &str = "https://";
const API_PREFIX: &str = "api.";

/// Fully qualified API target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: Url,
    host: String,
}

impl Target {
    /// Normalize a user supplied host or URL into an HTTPS API URL.
    ///
    /// `example.com` and `api.example.com` both become `https://api.example.com`;
    /// anything already starting with `https://` is kept.
    pub fn normalize(raw: &str) -> Result<Self, PushError> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(PushError::InvalidTarget("empty target".to_string()));
        }

        let full = if trimmed.starts_with(SECURE_SCHEME) {
            trimmed.to_string()
        } else if trimmed.starts_with(API_PREFIX) {
            format!("{}{}", SECURE_SCHEME, trimmed)
        } else {
            format!("{}{}{}", SECURE_SCHEME, API_PREFIX, trimmed)
        };

        let url = Url::parse(&full).map_err(|e| PushError::InvalidTarget(format!("{}: {}", full, e)))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| PushError::InvalidTarget(format!("{}: no host", full)))?
            .to_string();

        Ok(Self { url, host })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The URL as text, without the trailing slash `Url` adds to bare hosts
    pub fn as_str(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }

    /// Default application domain: the last two labels of the host
    pub fn derived_domain(&self) -> String {
        let labels: Vec<&str> = self.host.split('.').filter(|l| !l.is_empty()).collect();
        if labels.len() <= 2 {
            return labels.join(".");
        }
        labels[labels.len() - 2..].join(".")
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
