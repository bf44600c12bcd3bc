//! Main application run

use std::future::Future;

use tracing::info;

use crate::app::options::{AppOptions, BuildContext};
use crate::console::Console;
use crate::deploy::pusher::{self, PushOutcome};
use crate::errors::PushError;
use crate::http::client::HttpClient;
use crate::platform::Credentials;

/// Push one build with the HTTP platform client
pub async fn run(
    options: &AppOptions,
    credentials: Credentials,
    build: BuildContext,
    console: &dyn Console,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<PushOutcome, PushError> {
    info!("Initializing cfpush for build {}...", build.build_name);

    let client = HttpClient::new(options.http.clone())?;
    let request = options.push_request(credentials, build);

    let outcome = pusher::run(
        &request,
        &options.push,
        &client,
        console,
        tokio::time::sleep,
        Box::pin(shutdown_signal),
    )
    .await;

    info!(
        "Push finished in stage {:?} (success: {})",
        outcome.stage, outcome.success
    );
    Ok(outcome)
}
