//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::future::{Future, Ready};
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use cfpush::errors::PushError;
use cfpush::platform::{
    AppSummary, ArtifactArchive, CloudApplication, Credentials, InstanceInfo, InstanceState,
    InstancesInfo, LineCallback, PlatformClient, Route, Staging, StagingHandle,
};

/// One recorded platform call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login { target: String, organization: String, space: String },
    ListApplications,
    CreateApplication { name: String, staging: Staging, memory: u32, routes: Vec<String> },
    UpdateInstances { name: String, count: u32 },
    UpdateEnv { name: String, env: BTreeMap<String, String> },
    BindService { name: String, service: String },
    DeleteApplication { name: String },
    Upload { name: String, file_name: String },
    Start { name: String },
    Restart { name: String },
    StreamLogs { name: String },
    GetStagingLogs { offset: usize },
    GetApplication { name: String },
    GetInstances { name: String },
}

/// Scripted in-memory platform
#[derive(Default)]
pub struct FakePlatform {
    apps: Vec<AppSummary>,
    reject_login: bool,
    stream_lines: Vec<String>,
    stream_fails: bool,
    staging_chunks: Vec<String>,
    reports: Mutex<VecDeque<Option<InstancesInfo>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// An application already present in the space
    pub fn with_app(mut self, name: &str) -> Self {
        self.apps.push(AppSummary {
            name: name.to_string(),
            memory: 512,
            instances: 1,
        });
        self
    }

    pub fn rejecting_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    pub fn with_stream_lines(mut self, lines: &[&str]) -> Self {
        self.stream_lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn failing_stream(mut self) -> Self {
        self.stream_fails = true;
        self
    }

    pub fn with_staging_chunks(mut self, chunks: &[&str]) -> Self {
        self.staging_chunks = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Instance reports in order; the last one repeats
    pub fn with_reports(self, reports: Vec<Option<InstancesInfo>>) -> Self {
        *self.reports.lock().unwrap() = reports.into();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    pub fn staging_offsets(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::GetStagingLogs { offset } => Some(offset),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_report(&self) -> Option<InstancesInfo> {
        let mut reports = self.reports.lock().unwrap();
        if reports.len() > 1 {
            reports.pop_front().flatten()
        } else {
            reports.front().cloned().flatten()
        }
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn login(
        &self,
        _credentials: &Credentials,
        target: &Url,
        organization: &str,
        space: &str,
    ) -> Result<(), PushError> {
        self.record(Call::Login {
            target: target.as_str().trim_end_matches('/').to_string(),
            organization: organization.to_string(),
            space: space.to_string(),
        });
        if self.reject_login {
            return Err(PushError::Authentication("401 Bad credentials".to_string()));
        }
        Ok(())
    }

    async fn list_applications(&self) -> Result<Vec<AppSummary>, PushError> {
        self.record(Call::ListApplications);
        Ok(self.apps.clone())
    }

    async fn create_application(
        &self,
        name: &str,
        staging: &Staging,
        memory_mb: u32,
        routes: &[Route],
        _service_names: &[String],
    ) -> Result<(), PushError> {
        self.record(Call::CreateApplication {
            name: name.to_string(),
            staging: staging.clone(),
            memory: memory_mb,
            routes: routes.iter().map(Route::to_string).collect(),
        });
        Ok(())
    }

    async fn update_application_instances(&self, name: &str, count: u32) -> Result<(), PushError> {
        self.record(Call::UpdateInstances {
            name: name.to_string(),
            count,
        });
        Ok(())
    }

    async fn update_application_env(
        &self,
        name: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<(), PushError> {
        self.record(Call::UpdateEnv {
            name: name.to_string(),
            env: env.clone(),
        });
        Ok(())
    }

    async fn bind_service(&self, name: &str, service_name: &str) -> Result<(), PushError> {
        self.record(Call::BindService {
            name: name.to_string(),
            service: service_name.to_string(),
        });
        Ok(())
    }

    async fn delete_application(&self, name: &str) -> Result<(), PushError> {
        self.record(Call::DeleteApplication {
            name: name.to_string(),
        });
        Ok(())
    }

    async fn upload_application(&self, name: &str, artifact: &ArtifactArchive) -> Result<(), PushError> {
        self.record(Call::Upload {
            name: name.to_string(),
            file_name: artifact.file_name.clone(),
        });
        Ok(())
    }

    async fn start_application(&self, name: &str) -> Result<StagingHandle, PushError> {
        self.record(Call::Start {
            name: name.to_string(),
        });
        Ok(staging_handle())
    }

    async fn restart_application(&self, name: &str) -> Result<StagingHandle, PushError> {
        self.record(Call::Restart {
            name: name.to_string(),
        });
        Ok(staging_handle())
    }

    async fn stream_logs(&self, name: &str, on_line: LineCallback<'_>) -> Result<(), PushError> {
        self.record(Call::StreamLogs {
            name: name.to_string(),
        });
        for line in &self.stream_lines {
            on_line(line);
        }
        if self.stream_fails {
            return Err(PushError::Platform("websocket handshake refused".to_string()));
        }
        Ok(())
    }

    async fn get_staging_logs(
        &self,
        _handle: &StagingHandle,
        offset: usize,
    ) -> Result<Option<String>, PushError> {
        let served = self.staging_offsets().len();
        self.record(Call::GetStagingLogs { offset });
        Ok(self.staging_chunks.get(served).cloned())
    }

    async fn get_application(&self, name: &str) -> Result<CloudApplication, PushError> {
        self.record(Call::GetApplication {
            name: name.to_string(),
        });
        Ok(CloudApplication {
            guid: format!("{}-guid", name),
            name: name.to_string(),
            memory: 512,
            instances: 1,
            state: Some("STARTED".to_string()),
        })
    }

    async fn get_application_instances(
        &self,
        app: &CloudApplication,
    ) -> Result<Option<InstancesInfo>, PushError> {
        self.record(Call::GetInstances {
            name: app.name.clone(),
        });
        Ok(self.next_report())
    }
}

pub fn staging_handle() -> StagingHandle {
    StagingHandle {
        staging_log_url: Some("https://stager.example.com/log".to_string()),
    }
}

pub fn report(states: &[InstanceState]) -> InstancesInfo {
    InstancesInfo {
        instances: states
            .iter()
            .enumerate()
            .map(|(index, state)| InstanceInfo {
                index: index as u32,
                state: *state,
            })
            .collect(),
    }
}

pub fn running(count: usize) -> Option<InstancesInfo> {
    Some(report(&vec![InstanceState::Running; count]))
}

pub fn credentials() -> Credentials {
    Credentials {
        username: "ci-bot".to_string(),
        password: "s3cr3t-pa55".to_string().into(),
    }
}

/// Sleep that returns at once and counts its calls
pub fn counting_sleep() -> (Arc<AtomicU32>, impl Fn(Duration) -> Ready<()>) {
    let count = Arc::new(AtomicU32::new(0));
    let counter = count.clone();
    (count, move |_: Duration| {
        counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(())
    })
}

pub fn no_shutdown() -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(std::future::pending())
}

pub fn write_file(dir: &Path, name: &str, contents: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
