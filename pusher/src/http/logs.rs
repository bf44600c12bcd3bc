//! Application log stream and staging log reads

use futures::StreamExt;
use http::{header, HeaderValue};
use reqwest::StatusCode;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::PushError;
use crate::http::client::{status_error, transport_error, HttpClient};
use crate::platform::{LineCallback, StagingHandle};

impl HttpClient {
    /// Mirror the log stream of application `guid` until it closes, goes quiet or runs out of time
    pub(crate) async fn stream_app_logs(&self, guid: &str, on_line: LineCallback<'_>) -> Result<(), PushError> {
        let session = self.session().await?;
        let endpoint = session
            .doppler_endpoint
            .ok_or_else(|| PushError::Platform("No logging endpoint advertised".to_string()))?;
        let stream_url = build_stream_url(&endpoint, guid)?;

        let mut request = stream_url
            .as_str()
            .into_client_request()
            .map_err(|e| PushError::Platform(format!("Log stream request: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("bearer {}", session.token))
            .map_err(|e| PushError::Internal(e.to_string()))?;
        request.headers_mut().insert(header::AUTHORIZATION, bearer);

        info!("Connecting to log stream: {}", stream_url);
        let (mut ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| PushError::Platform(format!("Log stream connection failed: {}", e)))?;

        let deadline = Instant::now() + self.options.stream_max_duration;
        loop {
            let idle = tokio::time::timeout(self.options.stream_idle_timeout, ws_stream.next());
            let Ok(next) = tokio::time::timeout_at(deadline, idle).await else {
                info!(
                    "Log stream still open after {:?}, finishing",
                    self.options.stream_max_duration
                );
                break;
            };
            match next {
                Err(_) => {
                    debug!("Log stream idle for {:?}, finishing", self.options.stream_idle_timeout);
                    break;
                }
                Ok(Some(Ok(Message::Text(text)))) => {
                    for line in text.lines() {
                        on_line(line);
                    }
                }
                Ok(Some(Ok(Message::Binary(_)))) => {
                    return Err(PushError::Platform(
                        "Log stream sent an envelope this client cannot decode".to_string(),
                    ));
                }
                Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                    debug!("Log stream closed");
                    break;
                }
                Ok(Some(Ok(_))) => {}
                Ok(Some(Err(e))) => {
                    return Err(PushError::Platform(format!("Log stream error: {}", e)));
                }
            }
        }

        if let Err(e) = ws_stream.close(None).await {
            warn!("Failed to close log stream: {}", e);
        }
        Ok(())
    }

    /// Staging log text from `offset` on
    pub(crate) async fn read_staging_log(
        &self,
        handle: &StagingHandle,
        offset: usize,
    ) -> Result<Option<String>, PushError> {
        let Some(log_url) = handle.staging_log_url.as_deref() else {
            return Ok(None);
        };
        let url = staging_log_url(log_url, offset);

        let request = self
            .request(reqwest::Method::GET, &url)
            .await?
            .timeout(self.options.transfer_timeout);
        let response = request.send().await.map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {
                let body = response.text().await?;
                Ok(if body.is_empty() { None } else { Some(body) })
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(status_error(response).await),
        }
    }
}

fn build_stream_url(endpoint: &str, guid: &str) -> Result<Url, PushError> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| PushError::Platform(format!("Invalid logging endpoint {}: {}", endpoint, e)))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(PushError::Platform(format!(
                "Unsupported logging endpoint scheme: {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| PushError::Platform("Failed to set logging endpoint scheme".to_string()))?;
    url.set_path(&format!("{}/apps/{}/stream", url.path().trim_end_matches('/'), guid));
    Ok(url)
}

fn staging_log_url(base: &str, offset: usize) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}tail&tail_offset={}", base, separator, offset)
}
