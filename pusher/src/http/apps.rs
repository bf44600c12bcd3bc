//! Application endpoints and the `PlatformClient` implementation

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use tracing::{debug, info};
use url::Url;

use cf_models::{
    AppEntity, CreateAppRequest, CreateRouteRequest, CreateServiceBindingRequest, InstancesResponse,
    Paged, Resource, RouteEntity, UpdateAppRequest,
};

use crate::errors::PushError;
use crate::http::client::{send, status_error, transport_error, HttpClient};
use crate::platform::{
    AppSummary, ArtifactArchive, CloudApplication, Credentials, InstanceInfo, InstanceState,
    InstancesInfo, LineCallback, PlatformClient, Route, Staging, StagingHandle,
};

/// Header carrying the staging log location on start
const STAGING_LOG_HEADER: &str = "x-app-staging-log";

const PAGE_SIZE: &str = "100";

impl HttpClient {
    /// Application resource by name in the selected space
    async fn app_resource(&self, name: &str) -> Result<Resource<AppEntity>, PushError> {
        let space_guid = self.space_guid().await?;
        let page: Paged<AppEntity> = self
            .get(
                &format!("/v2/spaces/{}/apps", space_guid),
                &[("q", format!("name:{}", name))],
            )
            .await?;
        page.resources
            .into_iter()
            .find(|r| r.entity.name == name)
            .ok_or_else(|| PushError::Platform(format!("Application {} not found", name)))
    }

    async fn app_guid(&self, name: &str) -> Result<String, PushError> {
        Ok(self.app_resource(name).await?.metadata.guid)
    }

    async fn update_app(&self, guid: &str, update: &UpdateAppRequest) -> Result<(), PushError> {
        let _: Resource<AppEntity> = self.put(&format!("/v2/apps/{}", guid), update).await?;
        Ok(())
    }

    /// Guid of a shared or private domain
    async fn domain_guid(&self, domain: &str) -> Result<String, PushError> {
        match self.find_guid("/v2/shared_domains", domain, "Domain").await {
            Ok(guid) => Ok(guid),
            Err(PushError::Platform(_)) => self.find_guid("/v2/private_domains", domain, "Domain").await,
            Err(e) => Err(e),
        }
    }

    /// Existing route guid, creating the route if needed
    async fn route_guid(&self, route: &Route, space_guid: &str) -> Result<String, PushError> {
        let domain_guid = self.domain_guid(&route.domain).await?;
        let existing: Paged<RouteEntity> = self
            .get(
                "/v2/routes",
                &[
                    ("q", format!("host:{}", route.host)),
                    ("q", format!("domain_guid:{}", domain_guid)),
                ],
            )
            .await?;
        if let Some(found) = existing.resources.into_iter().next() {
            return Ok(found.metadata.guid);
        }

        debug!("Creating route {}", route);
        let created: Resource<RouteEntity> = self
            .post(
                "/v2/routes",
                &CreateRouteRequest {
                    host: route.host.clone(),
                    domain_guid,
                    space_guid: space_guid.to_string(),
                },
            )
            .await?;
        Ok(created.metadata.guid)
    }

    async fn set_state(&self, name: &str, state: &str) -> Result<StagingHandle, PushError> {
        let guid = self.app_guid(name).await?;
        let response = self
            .put_raw(
                &format!("/v2/apps/{}", guid),
                &[("stager_response", "true".to_string())],
                &UpdateAppRequest {
                    state: Some(state.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        let staging_log_url = response
            .headers()
            .get(STAGING_LOG_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!("Set {} to {} (staging log: {:?})", name, state, staging_log_url);
        Ok(StagingHandle { staging_log_url })
    }
}

/// Instance report from the `/instances` body
pub(crate) fn instances_from_response(response: InstancesResponse) -> InstancesInfo {
    let mut instances: Vec<InstanceInfo> = response
        .into_iter()
        .map(|(index, entry)| InstanceInfo {
            index: index.parse().unwrap_or(u32::MAX),
            state: InstanceState::from_platform(&entry.state),
        })
        .collect();
    instances.sort_by_key(|i| i.index);
    InstancesInfo { instances }
}

#[async_trait]
impl PlatformClient for HttpClient {
    async fn login(
        &self,
        credentials: &Credentials,
        target: &Url,
        organization: &str,
        space: &str,
    ) -> Result<(), PushError> {
        self.login_session(credentials, target, organization, space)
            .await
    }

    async fn list_applications(&self) -> Result<Vec<AppSummary>, PushError> {
        let space_guid = self.space_guid().await?;
        let mut apps = Vec::new();
        let mut page: Paged<AppEntity> = self
            .get(
                &format!("/v2/spaces/{}/apps", space_guid),
                &[("results-per-page", PAGE_SIZE.to_string())],
            )
            .await?;

        loop {
            apps.extend(page.resources.into_iter().map(|r| AppSummary {
                name: r.entity.name,
                memory: r.entity.memory,
                instances: r.entity.instances,
            }));
            match page.next_url {
                Some(next) => page = self.get(&next, &[]).await?,
                None => break,
            }
        }

        debug!("Space {} holds {} application(s)", space_guid, apps.len());
        Ok(apps)
    }

    async fn create_application(
        &self,
        name: &str,
        staging: &Staging,
        memory_mb: u32,
        routes: &[Route],
        service_names: &[String],
    ) -> Result<(), PushError> {
        let space_guid = self.space_guid().await?;
        let app: Resource<AppEntity> = self
            .post(
                "/v2/apps",
                &CreateAppRequest {
                    name: name.to_string(),
                    space_guid: space_guid.clone(),
                    memory: memory_mb,
                    instances: 1,
                    buildpack: staging.buildpack.clone(),
                    command: staging.command.clone(),
                },
            )
            .await?;
        info!("Created application {} ({})", name, app.metadata.guid);

        for route in routes {
            let route_guid = self.route_guid(route, &space_guid).await?;
            let _: Resource<AppEntity> = self
                .put(
                    &format!("/v2/apps/{}/routes/{}", app.metadata.guid, route_guid),
                    &serde_json::json!({}),
                )
                .await?;
            debug!("Mapped route {} to {}", route, name);
        }

        for service in service_names {
            self.bind_service(name, service).await?;
        }
        Ok(())
    }

    async fn update_application_instances(&self, name: &str, count: u32) -> Result<(), PushError> {
        let guid = self.app_guid(name).await?;
        self.update_app(
            &guid,
            &UpdateAppRequest {
                instances: Some(count),
                ..Default::default()
            },
        )
        .await
    }

    async fn update_application_env(
        &self,
        name: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<(), PushError> {
        let guid = self.app_guid(name).await?;
        self.update_app(
            &guid,
            &UpdateAppRequest {
                environment_json: Some(env.clone()),
                ..Default::default()
            },
        )
        .await
    }

    async fn bind_service(&self, name: &str, service_name: &str) -> Result<(), PushError> {
        let space_guid = self.space_guid().await?;
        let app_guid = self.app_guid(name).await?;
        let service_guid = self
            .find_guid(
                &format!("/v2/spaces/{}/service_instances", space_guid),
                service_name,
                "Service",
            )
            .await?;
        let _: serde_json::Value = self
            .post(
                "/v2/service_bindings",
                &CreateServiceBindingRequest {
                    app_guid,
                    service_instance_guid: service_guid,
                },
            )
            .await?;
        Ok(())
    }

    async fn delete_application(&self, name: &str) -> Result<(), PushError> {
        let guid = self.app_guid(name).await?;
        self.delete(&format!("/v2/apps/{}", guid), &[("recursive", "true".to_string())])
            .await
    }

    async fn upload_application(&self, name: &str, artifact: &ArtifactArchive) -> Result<(), PushError> {
        let guid = self.app_guid(name).await?;
        let part = Part::bytes(artifact.bytes.clone())
            .file_name(artifact.file_name.clone())
            .mime_str("application/zip")?;
        let form = Form::new().text("resources", "[]").part("application", part);

        let request = self
            .request(reqwest::Method::PUT, &format!("/v2/apps/{}/bits", guid))
            .await?
            .timeout(self.options.transfer_timeout)
            .multipart(form);
        send(request).await?;
        info!("Uploaded {} bytes for {}", artifact.bytes.len(), name);
        Ok(())
    }

    async fn start_application(&self, name: &str) -> Result<StagingHandle, PushError> {
        self.set_state(name, "STARTED").await
    }

    async fn restart_application(&self, name: &str) -> Result<StagingHandle, PushError> {
        self.set_state(name, "STOPPED").await?;
        self.set_state(name, "STARTED").await
    }

    async fn stream_logs(&self, name: &str, on_line: LineCallback<'_>) -> Result<(), PushError> {
        let guid = self.app_guid(name).await?;
        self.stream_app_logs(&guid, on_line).await
    }

    async fn get_staging_logs(
        &self,
        handle: &StagingHandle,
        offset: usize,
    ) -> Result<Option<String>, PushError> {
        self.read_staging_log(handle, offset).await
    }

    async fn get_application(&self, name: &str) -> Result<CloudApplication, PushError> {
        let resource = self.app_resource(name).await?;
        Ok(CloudApplication {
            guid: resource.metadata.guid,
            name: resource.entity.name,
            memory: resource.entity.memory,
            instances: resource.entity.instances,
            state: resource.entity.state,
        })
    }

    async fn get_application_instances(
        &self,
        app: &CloudApplication,
    ) -> Result<Option<InstancesInfo>, PushError> {
        let request = self
            .request(reqwest::Method::GET, &format!("/v2/apps/{}/instances", app.guid))
            .await?;
        let response = request.send().await.map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {
                let body: InstancesResponse = response.json().await?;
                Ok(Some(instances_from_response(body)))
            }
            // Not staged yet, or staging failed
            StatusCode::BAD_REQUEST => Ok(None),
            _ => Err(status_error(response).await),
        }
    }
}
