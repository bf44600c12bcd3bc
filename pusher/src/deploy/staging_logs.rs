//! Staging log mirroring
//!
//! Two strategies, tried in order and never both: the platform's log stream, and
//! cursor based polling of the staging log. Polling is used only when the stream
//! fails, and always starts at offset zero. Nothing here fails the push; errors are
//! reported on the console and observation stops.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::console::Console;
use crate::platform::{PlatformClient, StagingHandle};

/// Log observation strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStrategy {
    /// Subscribe to the log stream, falling back to polling on error
    #[default]
    Stream,
    /// Poll the staging log only
    Poll,
}

/// What an observation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogObservation {
    /// Strategy that produced the output
    pub strategy: LogStrategy,
    /// Stream error that caused the switch to polling
    pub fallback_reason: Option<String>,
    /// Staging log bytes read while polling
    pub polled_bytes: usize,
}

/// Mirror the staging output of `app_name` to the console
pub async fn observe(
    client: &dyn PlatformClient,
    console: &dyn Console,
    app_name: &str,
    handle: &StagingHandle,
    preferred: LogStrategy,
) -> LogObservation {
    let fallback_reason = match preferred {
        LogStrategy::Poll => None,
        LogStrategy::Stream => {
            let on_line = |line: &str| console.line(line);
            match client.stream_logs(app_name, &on_line).await {
                Ok(()) => {
                    debug!("Log stream for {} ended", app_name);
                    return LogObservation {
                        strategy: LogStrategy::Stream,
                        fallback_reason: None,
                        polled_bytes: 0,
                    };
                }
                Err(e) => {
                    warn!("Log stream for {} failed: {}", app_name, e);
                    console.warn(
                        "Exception occurred trying to get staging logs via websocket. \
                         Switching to alternate method.",
                    );
                    Some(e.to_string())
                }
            }
        }
    };

    let polled_bytes = poll(client, console, handle).await;
    LogObservation {
        strategy: LogStrategy::Poll,
        fallback_reason,
        polled_bytes,
    }
}

/// Read the staging log from offset zero until it runs dry; returns bytes read
pub async fn poll(client: &dyn PlatformClient, console: &dyn Console, handle: &StagingHandle) -> usize {
    let mut offset = 0;
    loop {
        match client.get_staging_logs(handle, offset).await {
            Ok(Some(chunk)) if !chunk.is_empty() => {
                for line in chunk.lines() {
                    console.line(line);
                }
                offset += chunk.len();
            }
            Ok(_) => {
                debug!("Staging log exhausted at offset {}", offset);
                return offset;
            }
            Err(e) => {
                console.warn(&format!("Could not read staging logs: {}", e));
                return offset;
            }
        }
    }
}
