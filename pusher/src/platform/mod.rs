//! Platform client capability
//!
//! The push orchestration only talks to the platform through [`PlatformClient`].
//! [`crate::http::client::HttpClient`] implements it over the v2 REST API; tests use
//! an in-memory fake.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use secrecy::SecretString;
use url::Url;

use crate::errors::PushError;

/// Login credentials
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Staging parameters of a new application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Staging {
    pub command: Option<String>,
    pub buildpack: Option<String>,
}

/// Route bound to an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub host: String,
    pub domain: String,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.host, self.domain)
    }
}

/// Application as listed in the target space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSummary {
    pub name: String,
    pub memory: u32,
    pub instances: u32,
}

/// Full application record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudApplication {
    pub guid: String,
    pub name: String,
    pub memory: u32,
    pub instances: u32,
    pub state: Option<String>,
}

/// Handle returned by start and restart, used to read the staging log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingHandle {
    pub staging_log_url: Option<String>,
}

/// Upload payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Reported state of one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    Running,
    Starting,
    Crashed,
    Flapping,
    Down,
    Unknown,
}

impl InstanceState {
    /// Parse the platform's state string; unknown strings map to `Unknown`
    pub fn from_platform(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "RUNNING" => InstanceState::Running,
            "STARTING" => InstanceState::Starting,
            "CRASHED" => InstanceState::Crashed,
            "FLAPPING" => InstanceState::Flapping,
            "DOWN" => InstanceState::Down,
            _ => InstanceState::Unknown,
        }
    }
}

/// One instance of an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub index: u32,
    pub state: InstanceState,
}

/// Instance report of an application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstancesInfo {
    pub instances: Vec<InstanceInfo>,
}

/// Line callback of the log stream
pub type LineCallback<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Operations the push needs from the platform
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Authenticate and select the organization and space
    async fn login(
        &self,
        credentials: &Credentials,
        target: &Url,
        organization: &str,
        space: &str,
    ) -> Result<(), PushError>;

    /// Applications of the selected space
    async fn list_applications(&self) -> Result<Vec<AppSummary>, PushError>;

    /// Create an application record; no bits, not started
    async fn create_application(
        &self,
        name: &str,
        staging: &Staging,
        memory_mb: u32,
        routes: &[Route],
        service_names: &[String],
    ) -> Result<(), PushError>;

    /// Change the desired instance count
    async fn update_application_instances(&self, name: &str, count: u32) -> Result<(), PushError>;

    /// Replace the application's environment variables
    async fn update_application_env(
        &self,
        name: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<(), PushError>;

    /// Bind a service instance of the space to the application
    async fn bind_service(&self, name: &str, service_name: &str) -> Result<(), PushError>;

    /// Delete the application
    async fn delete_application(&self, name: &str) -> Result<(), PushError>;

    /// Upload the application bits
    async fn upload_application(&self, name: &str, artifact: &ArtifactArchive) -> Result<(), PushError>;

    async fn start_application(&self, name: &str) -> Result<StagingHandle, PushError>;

    async fn restart_application(&self, name: &str) -> Result<StagingHandle, PushError>;

    /// Mirror the application's log stream to `on_line` until the stream ends
    async fn stream_logs(&self, name: &str, on_line: LineCallback<'_>) -> Result<(), PushError>;

    /// Staging log text from `offset` on; `None` once the log is exhausted
    async fn get_staging_logs(
        &self,
        handle: &StagingHandle,
        offset: usize,
    ) -> Result<Option<String>, PushError>;

    async fn get_application(&self, name: &str) -> Result<CloudApplication, PushError>;

    /// Current instance report; `None` while the platform has none to give
    async fn get_application_instances(
        &self,
        app: &CloudApplication,
    ) -> Result<Option<InstancesInfo>, PushError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_state_from_platform() {
        assert_eq!(InstanceState::from_platform("RUNNING"), InstanceState::Running);
        assert_eq!(InstanceState::from_platform("flapping"), InstanceState::Flapping);
        assert_eq!(InstanceState::from_platform("EVICTED"), InstanceState::Unknown);
    }

    #[test]
    fn test_route_display() {
        let route = Route {
            host: "demo".into(),
            domain: "example.com".into(),
        };
        assert_eq!(route.to_string(), "demo.example.com");
    }
}
