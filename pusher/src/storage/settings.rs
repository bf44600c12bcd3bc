//! Settings file management

use secrecy::SecretString;
use serde::Deserialize;

use crate::deploy::info::InlineManifest;
use crate::deploy::staging_logs::LogStrategy;
use crate::logs::LogLevel;

/// Push settings
///
/// Read from a JSON file. Every field has a default, so a partial file is valid.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Platform API host or URL
    #[serde(default)]
    pub target: String,

    /// Organization to push into
    #[serde(default)]
    pub organization: String,

    /// Space to push into
    #[serde(default)]
    pub space: String,

    /// Login user
    #[serde(default)]
    pub username: String,

    /// Login password
    #[serde(default = "default_password")]
    pub password: SecretString,

    /// Accept self-signed certificates from the target
    #[serde(default)]
    pub self_signed: bool,

    /// Delete and recreate an application that already exists
    #[serde(default)]
    pub reset_if_exists: bool,

    /// Manifest file configuration
    #[serde(default)]
    pub manifest: ManifestSettings,

    /// Inline configuration; when present the manifest file is ignored
    #[serde(default)]
    pub optional_manifest: Option<InlineManifest>,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpSettings,

    /// Staging log configuration
    #[serde(default)]
    pub logs: LogSettings,

    /// Health poll configuration
    #[serde(default)]
    pub health: HealthSettings,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit diagnostics as JSON
    #[serde(default)]
    pub json_logs: bool,
}

fn default_password() -> SecretString {
    SecretString::from(String::new())
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target: String::new(),
            organization: String::new(),
            space: String::new(),
            username: String::new(),
            password: default_password(),
            self_signed: false,
            reset_if_exists: false,
            manifest: ManifestSettings::default(),
            optional_manifest: None,
            http: HttpSettings::default(),
            logs: LogSettings::default(),
            health: HealthSettings::default(),
            log_level: LogLevel::default(),
            json_logs: false,
        }
    }
}

/// Manifest file settings
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestSettings {
    /// Manifest path, relative to the workspace
    #[serde(default = "default_manifest_path")]
    pub path: String,

    /// Application to pick; the first one when unset
    #[serde(default)]
    pub app_name: Option<String>,
}

fn default_manifest_path() -> String {
    "manifest.yml".to_string()
}

impl Default for ManifestSettings {
    fn default() -> Self {
        Self {
            path: default_manifest_path(),
            app_name: None,
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// Timeout of API calls in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
        }
    }
}

/// Staging log settings
#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `stream` or `poll`
    #[serde(default)]
    pub strategy: LogStrategy,

    /// Seconds without a message after which the log stream is considered finished
    #[serde(default = "default_stream_idle")]
    pub stream_idle_secs: u64,

    /// Upper bound in seconds on mirroring the log stream
    #[serde(default = "default_stream_max")]
    pub stream_max_secs: u64,
}

fn default_stream_idle() -> u64 {
    10
}

fn default_stream_max() -> u64 {
    120
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            strategy: LogStrategy::default(),
            stream_idle_secs: default_stream_idle(),
            stream_max_secs: default_stream_max(),
        }
    }
}

/// Health poll settings
#[derive(Debug, Clone, Deserialize)]
pub struct HealthSettings {
    /// Delay between two instance reports in milliseconds
    #[serde(default = "default_health_interval")]
    pub interval_ms: u64,
}

fn default_health_interval() -> u64 {
    1000
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_health_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_partial_settings() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "target": "example.com",
                "organization": "acme",
                "space": "dev",
                "username": "ci",
                "password": "hunter2",
                "logs": { "strategy": "poll" }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.target, "example.com");
        assert_eq!(settings.password.expose_secret(), "hunter2");
        assert_eq!(settings.manifest.path, "manifest.yml");
        assert_eq!(settings.logs.strategy, LogStrategy::Poll);
        assert_eq!(settings.logs.stream_idle_secs, 10);
        assert_eq!(settings.logs.stream_max_secs, 120);
        assert_eq!(settings.health.interval_ms, 1000);
        assert!(settings.optional_manifest.is_none());
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }

    #[test]
    fn test_inline_manifest_settings() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "optional_manifest": {
                    "app_name": "demo",
                    "memory": 256,
                    "buildpack": "",
                    "env_vars": [{ "key": "MODE", "value": "ci" }]
                }
            }"#,
        )
        .unwrap();

        let inline = settings.optional_manifest.unwrap();
        assert_eq!(inline.app_name, "demo");
        assert_eq!(inline.memory, 256);
        assert_eq!(inline.env_vars.len(), 1);
        assert_eq!(settings.log_level, LogLevel::default());
    }
}
