//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::deploy::health;
use crate::deploy::info::InlineManifest;
use crate::deploy::pusher::{self, PushRequest, PushSource};
use crate::filesys::file::File;
use crate::http::client::HttpOptions;
use crate::platform::Credentials;
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Platform coordinates
    pub target: TargetOptions,

    /// Manifest file options
    pub manifest: ManifestOptions,

    /// Inline configuration, replacing the manifest file when set
    pub inline_manifest: Option<InlineManifest>,

    /// HTTP client options
    pub http: HttpOptions,

    /// Push options
    pub push: pusher::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            target: TargetOptions::default(),
            manifest: ManifestOptions::default(),
            inline_manifest: None,
            http: HttpOptions::default(),
            push: pusher::Options::default(),
        }
    }
}

impl AppOptions {
    /// Options described by a settings file
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            target: TargetOptions {
                target: settings.target.clone(),
                organization: settings.organization.clone(),
                space: settings.space.clone(),
            },
            manifest: ManifestOptions {
                path: PathBuf::from(&settings.manifest.path),
                app_name: settings.manifest.app_name.clone(),
            },
            inline_manifest: settings.optional_manifest.clone(),
            http: HttpOptions {
                timeout: Duration::from_secs(settings.http.timeout_secs),
                self_signed: settings.self_signed,
                stream_idle_timeout: Duration::from_secs(settings.logs.stream_idle_secs),
                stream_max_duration: Duration::from_secs(settings.logs.stream_max_secs),
                ..Default::default()
            },
            push: pusher::Options {
                log_strategy: settings.logs.strategy,
                reset_if_exists: settings.reset_if_exists,
                health: health::Options {
                    interval: Duration::from_millis(settings.health.interval_ms),
                },
            },
        }
    }

    /// Push request for one build
    pub fn push_request(&self, credentials: Credentials, build: BuildContext) -> PushRequest {
        let source = match &self.inline_manifest {
            Some(inline) => PushSource::Inline(inline.clone()),
            None => PushSource::ManifestFile {
                file: File::new(build.workspace.join(&self.manifest.path)),
                app_name: self.manifest.app_name.clone(),
            },
        };

        PushRequest {
            target: self.target.target.clone(),
            organization: self.target.organization.clone(),
            space: self.target.space.clone(),
            credentials,
            source,
            workspace: build.workspace,
            build_name: build.build_name,
            build_succeeded: build.build_succeeded,
        }
    }
}

/// Platform coordinates
#[derive(Debug, Clone, Default)]
pub struct TargetOptions {
    /// API host or URL
    pub target: String,

    pub organization: String,

    pub space: String,
}

/// Manifest file options
#[derive(Debug, Clone)]
pub struct ManifestOptions {
    /// Path relative to the workspace
    pub path: PathBuf,

    /// Application to select
    pub app_name: Option<String>,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from("manifest.yml"),
            app_name: None,
        }
    }
}

/// What the build host knows about the build being pushed
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Workspace root
    pub workspace: PathBuf,

    /// Build display name
    pub build_name: String,

    /// Whether the upstream steps succeeded
    pub build_succeeded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::staging_logs::LogStrategy;

    fn build() -> BuildContext {
        BuildContext {
            workspace: PathBuf::from("/work"),
            build_name: "job-7".to_string(),
            build_succeeded: true,
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "ci".to_string(),
            password: "secret".to_string().into(),
        }
    }

    #[test]
    fn test_from_settings() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "target": "example.com",
                "self_signed": true,
                "reset_if_exists": true,
                "http": { "timeout_secs": 5 },
                "logs": { "strategy": "poll", "stream_idle_secs": 3, "stream_max_secs": 45 },
                "health": { "interval_ms": 250 }
            }"#,
        )
        .unwrap();

        let options = AppOptions::from_settings(&settings);
        assert_eq!(options.target.target, "example.com");
        assert!(options.http.self_signed);
        assert_eq!(options.http.timeout, Duration::from_secs(5));
        assert_eq!(options.http.stream_idle_timeout, Duration::from_secs(3));
        assert_eq!(options.http.stream_max_duration, Duration::from_secs(45));
        assert_eq!(options.push.log_strategy, LogStrategy::Poll);
        assert!(options.push.reset_if_exists);
        assert_eq!(options.push.health.interval, Duration::from_millis(250));
    }

    #[test]
    fn test_manifest_file_resolves_against_workspace() {
        let options = AppOptions::default();
        let request = options.push_request(credentials(), build());
        match request.source {
            PushSource::ManifestFile { file, app_name } => {
                assert_eq!(file.path(), PathBuf::from("/work/manifest.yml").as_path());
                assert!(app_name.is_none());
            }
            other => panic!("unexpected source {:?}", other),
        }
        assert_eq!(request.build_name, "job-7");
    }

    #[test]
    fn test_inline_manifest_replaces_file() {
        let options = AppOptions {
            inline_manifest: Some(InlineManifest {
                app_name: "inline".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let request = options.push_request(credentials(), build());
        assert!(matches!(request.source, PushSource::Inline(ref i) if i.app_name == "inline"));
    }
}
