//! Push orchestration
//!
//! [`run`] drives one push attempt through the stages of [`PushFsm`], talking to the
//! platform only through [`PlatformClient`]. Every remote error aborts the remaining
//! stages. Nothing already created, updated or started is rolled back.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::console::Console;
use crate::deploy::artifact;
use crate::deploy::fsm::{PushFsm, PushStage};
use crate::deploy::health::{self, HealthOutcome};
use crate::deploy::info::{self, ConfigSource, DeploymentInfo, InlineManifest, ResolveDefaults};
use crate::deploy::staging_logs::{self, LogStrategy};
use crate::deploy::target::Target;
use crate::errors::PushError;
use crate::filesys::file::File;
use crate::manifest::ManifestReader;
use crate::platform::{Credentials, PlatformClient, Route, Staging, StagingHandle};
use crate::utils::pluralize;

/// Where the deployment parameters are read from
#[derive(Debug, Clone)]
pub enum PushSource {
    /// A manifest file, optionally selecting an application by name
    ManifestFile { file: File, app_name: Option<String> },
    /// Inline configuration; the manifest file is not read at all
    Inline(InlineManifest),
}

/// Everything the build host hands to a push
#[derive(Debug)]
pub struct PushRequest {
    /// Host or URL of the platform API, normalized before use
    pub target: String,
    pub organization: String,
    pub space: String,
    pub credentials: Credentials,
    pub source: PushSource,
    /// Build workspace; relative artifact paths resolve against it
    pub workspace: PathBuf,
    /// Display name of the build, the fallback application name
    pub build_name: String,
    /// Outcome of the upstream build steps
    pub build_succeeded: bool,
}

/// Push options
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Preferred staging log strategy
    pub log_strategy: LogStrategy,
    /// Delete and recreate an application that already exists
    pub reset_if_exists: bool,
    /// Health poll options
    pub health: health::Options,
}

/// Result of a push
#[derive(Debug, Clone)]
pub struct PushOutcome {
    /// True on `Done`, and on `Skipped` (nothing to push)
    pub success: bool,
    /// Externally reachable URI, set on success when the app has a route
    pub app_uri: Option<String>,
    /// Final stage
    pub stage: PushStage,
    /// Every stage entered
    pub history: Vec<PushStage>,
    /// Console text of the error that failed the push
    pub error: Option<String>,
    /// Resolved parameters, once resolution succeeded
    pub deployment: Option<DeploymentInfo>,
}

/// Run one push attempt
pub async fn run<S, F>(
    request: &PushRequest,
    options: &Options,
    client: &dyn PlatformClient,
    console: &dyn Console,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> PushOutcome
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let mut push = Push {
        request,
        options,
        client,
        console,
        fsm: PushFsm::new(),
        deployment: None,
    };

    if !request.build_succeeded {
        info!("Build {} did not succeed, skipping push", request.build_name);
        console.line("Build did not succeed, skipping push.");
        if let Err(e) = push.fsm.advance(PushStage::Skipped) {
            debug!("Could not mark push as skipped: {}", e);
        }
        return push.outcome(None);
    }

    match push.stages(&sleep_fn, &mut shutdown_signal).await {
        Ok(app_uri) => push.outcome(app_uri),
        Err(e) => {
            console.error(&e.to_string());
            push.fsm.fail(&e);
            error!("Push failed in stage {:?}: {}", push.fsm.last_active_stage(), e);
            if e.is_local() {
                debug!("Nothing was sent to the platform");
            }
            push.outcome(None)
        }
    }
}

struct Push<'a> {
    request: &'a PushRequest,
    options: &'a Options,
    client: &'a dyn PlatformClient,
    console: &'a dyn Console,
    fsm: PushFsm,
    deployment: Option<DeploymentInfo>,
}

impl Push<'_> {
    async fn stages<S, F>(
        &mut self,
        sleep_fn: &S,
        shutdown_signal: &mut Pin<Box<dyn Future<Output = ()> + Send>>,
    ) -> Result<Option<String>, PushError>
    where
        S: Fn(Duration) -> F,
        F: Future<Output = ()>,
    {
        let request = self.request;
        let client = self.client;
        let console = self.console;

        self.fsm.advance(PushStage::NormalizeTarget)?;
        let target = Target::normalize(&request.target)?;

        self.fsm.advance(PushStage::DeriveDomain)?;
        let derived_domain = target.derived_domain();
        debug!("Target {} derives domain {}", target, derived_domain);

        self.fsm.advance(PushStage::ResolveDeploymentInfo)?;
        let deployment = self.resolve(&derived_domain).await?;
        let app_name = deployment.app_name.clone();
        self.echo(&target, &deployment);

        self.fsm.advance(PushStage::Login)?;
        client
            .login(
                &request.credentials,
                target.url(),
                &request.organization,
                &request.space,
            )
            .await?;

        self.fsm.advance(PushStage::CheckExists)?;
        let mut exists = client
            .list_applications()
            .await?
            .iter()
            .any(|app| app.name == app_name);

        if exists && self.options.reset_if_exists {
            self.fsm.advance(PushStage::Reset)?;
            console.line("App already exists, resetting.");
            client.delete_application(&app_name).await?;
            exists = false;
        }

        if exists {
            self.fsm.advance(PushStage::Update)?;
            console.line("App already exists, skipping creation.");
        } else {
            self.fsm.advance(PushStage::Create)?;
            console.line("Creating new app.");
            let staging = Staging {
                command: deployment.command.clone(),
                buildpack: deployment.buildpack.clone(),
            };
            let routes = if deployment.no_route {
                Vec::new()
            } else {
                vec![Route {
                    host: deployment.hostname.clone(),
                    domain: deployment.domain.clone(),
                }]
            };
            client
                .create_application(&app_name, &staging, deployment.memory, &routes, &[])
                .await?;
        }

        self.fsm.advance(PushStage::Configure)?;
        self.configure(&deployment).await?;

        self.fsm.advance(PushStage::Upload)?;
        let location = artifact::resolve(&request.workspace, &deployment.app_path).await?;
        console.line("Pushing app bits.");
        let archive = artifact::package(&location).await?;
        client.upload_application(&app_name, &archive).await?;

        let handle: StagingHandle = if exists {
            self.fsm.advance(PushStage::Restart)?;
            console.line("Restarting application.");
            client.restart_application(&app_name).await?
        } else {
            self.fsm.advance(PushStage::Start)?;
            console.line("Starting application.");
            client.start_application(&app_name).await?
        };

        self.fsm.advance(PushStage::ObserveLogs)?;
        let observation = staging_logs::observe(
            client,
            console,
            &app_name,
            &handle,
            self.options.log_strategy,
        )
        .await;
        debug!("Staging log observation for {}: {:?}", app_name, observation);

        self.fsm.advance(PushStage::PollHealth)?;
        let app = client.get_application(&app_name).await?;
        let outcome = health::poll(
            client,
            &app,
            deployment.timeout_seconds,
            &self.options.health,
            sleep_fn,
            shutdown_signal,
        )
        .await?;

        let tally = outcome.tally();
        console.line(&format!(
            "{} running out of {}",
            pluralize(tally.running, "instance", "instances"),
            tally.total()
        ));
        if let HealthOutcome::TimedOut { attempts, .. } = outcome {
            debug!("{} did not converge after {} attempts", app_name, attempts);
            return Err(PushError::TimeoutExceeded {
                seconds: deployment.timeout_seconds,
                detail: tally.to_string(),
            });
        }

        self.fsm.advance(PushStage::Done)?;
        let app_uri = deployment.app_uri();
        if let Some(uri) = &app_uri {
            console.line(&format!("Application is now running at {}", uri));
        }
        console.line("Push successful.");
        info!("Pushed {} ({})", app_name, tally);
        Ok(app_uri)
    }

    /// Resolve the deployment parameters from the one configured source
    async fn resolve(&mut self, derived_domain: &str) -> Result<DeploymentInfo, PushError> {
        let source = match &self.request.source {
            PushSource::ManifestFile { file, app_name } => {
                let reader = ManifestReader::read(file).await?;
                ConfigSource::Manifest(reader.application_info(app_name.as_deref())?)
            }
            PushSource::Inline(inline) => ConfigSource::Inline(inline.clone()),
        };

        let defaults = ResolveDefaults {
            build_name: self.request.build_name.clone(),
            domain: derived_domain.to_string(),
        };
        let resolution = info::resolve(&source, &defaults)?;
        for warning in &resolution.warnings {
            self.console.warn(&warning.to_string());
        }

        self.deployment = Some(resolution.info.clone());
        Ok(resolution.info)
    }

    fn echo(&self, target: &Target, deployment: &DeploymentInfo) {
        let console = self.console;
        console.line(&format!(
            "Pushing {} app to {}",
            deployment.app_name,
            target.as_str()
        ));
        console.line(&format!("Organization: {}", self.request.organization));
        console.line(&format!("Space: {}", self.request.space));
        console.line(&format!("Username: {}", self.request.credentials.username));
        match deployment.app_uri() {
            Some(uri) => console.line(&format!("App URI: {}", uri)),
            None => console.line("App URI: none (no route)"),
        }
    }

    /// Instance count, environment and service bindings
    async fn configure(&self, deployment: &DeploymentInfo) -> Result<(), PushError> {
        let client = self.client;
        let app_name = &deployment.app_name;

        if deployment.instances > 1 {
            debug!("Scaling {} to {} instances", app_name, deployment.instances);
            client
                .update_application_instances(app_name, deployment.instances)
                .await?;
        }

        if !deployment.env_vars.is_empty() {
            self.console.line(&format!(
                "Setting {}.",
                pluralize(deployment.env_vars.len(), "environment variable", "environment variables")
            ));
            client
                .update_application_env(app_name, &deployment.env_vars)
                .await?;
        }

        for service in &deployment.service_names {
            self.console.line(&format!("Binding service {}.", service));
            client.bind_service(app_name, service).await?;
        }
        Ok(())
    }

    fn outcome(&self, app_uri: Option<String>) -> PushOutcome {
        let stage = self.fsm.stage();
        PushOutcome {
            success: matches!(stage, PushStage::Done | PushStage::Skipped),
            app_uri,
            stage,
            history: self.fsm.history().to_vec(),
            error: self.fsm.error().map(str::to_string),
            deployment: self.deployment.clone(),
        }
    }
}
