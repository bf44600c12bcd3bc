//! HTTP client for the platform's v2 API

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error};

use cf_models::ErrorResponse;

use crate::errors::PushError;

/// HTTP client options
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Timeout of ordinary API calls
    pub timeout: Duration,
    /// Timeout of bits uploads and staging log reads
    pub transfer_timeout: Duration,
    /// Accept self-signed or otherwise invalid TLS certificates
    pub self_signed: bool,
    /// A log stream quiet for this long is considered finished
    pub stream_idle_timeout: Duration,
    /// A log stream is left after this long even while lines keep arriving
    pub stream_max_duration: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(300),
            self_signed: false,
            stream_idle_timeout: Duration::from_secs(10),
            stream_max_duration: Duration::from_secs(120),
        }
    }
}

/// Authenticated state established by `login`
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub api_url: String,
    pub token: String,
    pub doppler_endpoint: Option<String>,
    pub space_guid: Option<String>,
}

/// HTTP client for the platform API
pub struct HttpClient {
    pub(crate) client: Client,
    pub(crate) options: HttpOptions,
    session: RwLock<Option<Session>>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(options: HttpOptions) -> Result<Self, PushError> {
        let client = Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.self_signed)
            .build()?;

        Ok(Self {
            client,
            options,
            session: RwLock::new(None),
        })
    }

    pub(crate) async fn session(&self) -> Result<Session, PushError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| PushError::Internal("Not logged in".to_string()))
    }

    pub(crate) async fn set_session(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    /// Space selected at login
    pub(crate) async fn space_guid(&self) -> Result<String, PushError> {
        self.session()
            .await?
            .space_guid
            .ok_or_else(|| PushError::Internal("No space selected".to_string()))
    }

    async fn authorized(&self, method: reqwest::Method, path: &str) -> Result<RequestBuilder, PushError> {
        let session = self.session().await?;
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", session.api_url, path)
        };
        debug!("{} {}", method, url);
        Ok(self.client.request(method, &url).bearer_auth(&session.token))
    }

    /// Make a GET request
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PushError> {
        let request = self.authorized(reqwest::Method::GET, path).await?.query(query);
        let response = send(request).await?;
        Ok(response.json().await?)
    }

    /// Make a POST request
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PushError> {
        let request = self.authorized(reqwest::Method::POST, path).await?.json(body);
        let response = send(request).await?;
        Ok(response.json().await?)
    }

    /// Make a PUT request, returning the raw response
    pub(crate) async fn put_raw<B: Serialize>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<Response, PushError> {
        let request = self
            .authorized(reqwest::Method::PUT, path)
            .await?
            .query(query)
            .json(body);
        send(request).await
    }

    /// Make a PUT request
    pub(crate) async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PushError> {
        let response = self.put_raw(path, &[], body).await?;
        Ok(response.json().await?)
    }

    /// Make a DELETE request
    pub(crate) async fn delete(&self, path: &str, query: &[(&str, String)]) -> Result<(), PushError> {
        let request = self.authorized(reqwest::Method::DELETE, path).await?.query(query);
        send(request).await?;
        Ok(())
    }

    /// Builder for requests that need custom handling
    pub(crate) async fn request(&self, method: reqwest::Method, path: &str) -> Result<RequestBuilder, PushError> {
        self.authorized(method, path).await
    }
}

/// Send a request and turn failures into push errors
pub(crate) async fn send(request: RequestBuilder) -> Result<Response, PushError> {
    let response = request.send().await.map_err(transport_error)?;
    if response.status().is_success() {
        return Ok(response);
    }
    Err(status_error(response).await)
}

/// Network level failure
pub(crate) fn transport_error(err: reqwest::Error) -> PushError {
    if err.is_connect() || err.is_timeout() {
        PushError::UnreachableTarget(err.to_string())
    } else {
        PushError::HttpError(err)
    }
}

/// Non success response
pub(crate) async fn status_error(response: Response) -> PushError {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    error!("HTTP request to {} failed: {} - {}", url, status, body);
    classify_status(status, &body)
}

pub(crate) fn classify_status(status: StatusCode, body: &str) -> PushError {
    let description = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.description)
        .unwrap_or_else(|| body.trim().to_string());
    let message = format!("{} {}", status.as_u16(), description).trim_end().to_string();

    PushError::Platform(message)
}
