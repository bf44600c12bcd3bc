//! Login against the platform's UAA

use reqwest::{header, StatusCode};
use secrecy::ExposeSecret;
use tracing::{debug, info};
use url::Url;

use cf_models::{InfoResponse, NamedEntity, Paged, TokenResponse};

use crate::errors::PushError;
use crate::http::client::{classify_status, send, transport_error, HttpClient, Session};
use crate::platform::Credentials;

/// OAuth client the command line tools use
const UAA_CLIENT_ID: &str = "cf";

impl HttpClient {
    /// Fetch the API info document
    pub(crate) async fn fetch_info(&self, api_url: &str) -> Result<InfoResponse, PushError> {
        let url = format!("{}/v2/info", api_url);
        debug!("GET {}", url);
        let response = send(self.client.get(&url)).await?;
        Ok(response.json().await?)
    }

    /// Password grant against the authorization endpoint
    pub(crate) async fn request_token(
        &self,
        authorization_endpoint: &str,
        credentials: &Credentials,
    ) -> Result<TokenResponse, PushError> {
        let url = format!("{}/oauth/token", authorization_endpoint.trim_end_matches('/'));
        debug!("POST {} (password grant)", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(UAA_CLIENT_ID, Some(""))
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "password"),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.expose_secret()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(token_error(status, &body))
    }

    /// Guid of the single resource named `name` under `path`
    pub(crate) async fn find_guid(&self, path: &str, name: &str, kind: &str) -> Result<String, PushError> {
        let page: Paged<NamedEntity> = self.get(path, &[("q", format!("name:{}", name))]).await?;
        page.resources
            .into_iter()
            .find(|r| r.entity.name == name)
            .map(|r| r.metadata.guid)
            .ok_or_else(|| PushError::Platform(format!("{} {} not found", kind, name)))
    }

    pub(crate) async fn login_session(
        &self,
        credentials: &Credentials,
        target: &Url,
        organization: &str,
        space: &str,
    ) -> Result<(), PushError> {
        let api_url = target.as_str().trim_end_matches('/').to_string();
        let info = self.fetch_info(&api_url).await?;
        let token = self
            .request_token(&info.authorization_endpoint, credentials)
            .await?;

        self.set_session(Session {
            api_url: api_url.clone(),
            token: token.access_token.clone(),
            doppler_endpoint: info.doppler_logging_endpoint.clone(),
            space_guid: None,
        })
        .await;

        let org_guid = self
            .find_guid("/v2/organizations", organization, "Organization")
            .await?;
        let space_guid = self
            .find_guid(
                &format!("/v2/organizations/{}/spaces", org_guid),
                space,
                "Space",
            )
            .await?;

        self.set_session(Session {
            api_url,
            token: token.access_token,
            doppler_endpoint: info.doppler_logging_endpoint,
            space_guid: Some(space_guid),
        })
        .await;

        info!(
            "Logged in as {} to {} ({} / {})",
            credentials.username, target, organization, space
        );
        Ok(())
    }
}

/// Only the token endpoint rejecting the grant means wrong credentials
fn token_error(status: StatusCode, body: &str) -> PushError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PushError::Authentication(format!("{} {}", status.as_u16(), body.trim()))
        }
        _ => classify_status(status, body),
    }
}
