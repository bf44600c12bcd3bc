//! Cloud Foundry v2 API models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `GET /v2/info` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub authorization_endpoint: String,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub doppler_logging_endpoint: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

/// UAA password grant response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Resource metadata shared by every v2 entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub guid: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// A v2 resource: metadata plus entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource<T> {
    pub metadata: Metadata,
    pub entity: T,
}

/// A page of v2 resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paged<T> {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub next_url: Option<String>,
    pub resources: Vec<Resource<T>>,
}

/// Entity with only a name (organizations, spaces, domains, service instances)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedEntity {
    pub name: String,
}

/// Application entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppEntity {
    pub name: String,
    #[serde(default)]
    pub memory: u32,
    #[serde(default)]
    pub instances: u32,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub buildpack: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
}

/// Route entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEntity {
    pub host: String,
    pub domain_guid: String,
}

/// `POST /v2/apps` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppRequest {
    pub name: String,
    pub space_guid: String,
    pub memory: u32,
    pub instances: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildpack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// `PUT /v2/apps/{guid}` body; only set fields are sent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_json: Option<BTreeMap<String, String>>,
}

/// `POST /v2/routes` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRouteRequest {
    pub host: String,
    pub domain_guid: String,
    pub space_guid: String,
}

/// `POST /v2/service_bindings` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceBindingRequest {
    pub app_guid: String,
    pub service_instance_guid: String,
}

/// One entry of `GET /v2/apps/{guid}/instances`, keyed by instance index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceEntry {
    pub state: String,
    #[serde(default)]
    pub since: Option<f64>,
}

/// Whole `GET /v2/apps/{guid}/instances` response
pub type InstancesResponse = BTreeMap<String, InstanceEntry>;

/// Error body returned by the cloud controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}
