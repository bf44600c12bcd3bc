//! Instance health polling
//!
//! The platform has no readiness notification, so the push polls the instance report
//! once per interval, for at most a fixed number of attempts. The sleep between
//! attempts is injected and races a shutdown signal.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::errors::PushError;
use crate::platform::{CloudApplication, InstanceState, InstancesInfo, PlatformClient};

/// Health poll options
#[derive(Debug, Clone)]
pub struct Options {
    /// Delay between two attempts
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

/// Instance counts per state of one report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceTally {
    pub running: usize,
    pub starting: usize,
    pub crashed: usize,
    pub flapping: usize,
    pub down: usize,
    pub unknown: usize,
}

impl InstanceTally {
    pub fn from_report(report: &InstancesInfo) -> Self {
        let mut tally = Self::default();
        for instance in &report.instances {
            match instance.state {
                InstanceState::Running => tally.running += 1,
                InstanceState::Starting => tally.starting += 1,
                InstanceState::Crashed => tally.crashed += 1,
                InstanceState::Flapping => tally.flapping += 1,
                InstanceState::Down => tally.down += 1,
                InstanceState::Unknown => tally.unknown += 1,
            }
        }
        tally
    }

    pub fn total(&self) -> usize {
        self.running + self.starting + self.crashed + self.flapping + self.down + self.unknown
    }

    /// Every reported instance runs
    pub fn converged(&self) -> bool {
        self.running == self.total()
    }
}

impl fmt::Display for InstanceTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} running", self.running)?;
        for (count, label) in [
            (self.starting, "starting"),
            (self.crashed, "crashed"),
            (self.flapping, "flapping"),
            (self.down, "down"),
            (self.unknown, "unknown"),
        ] {
            if count > 0 {
                write!(f, ", {} {}", count, label)?;
            }
        }
        Ok(())
    }
}

/// Result of a health poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthOutcome {
    /// All reported instances are running
    Converged { tally: InstanceTally, attempts: u32 },
    /// Attempts ran out; `last` is the latest report, if any arrived
    TimedOut {
        last: Option<InstanceTally>,
        attempts: u32,
    },
}

impl HealthOutcome {
    /// Latest tally seen
    pub fn tally(&self) -> InstanceTally {
        match self {
            HealthOutcome::Converged { tally, .. } => *tally,
            HealthOutcome::TimedOut { last, .. } => last.unwrap_or_default(),
        }
    }
}

/// Poll `app` until every instance runs or `max_attempts` reports were fetched.
///
/// Sleeps only between attempts. A fetch error aborts the poll, and so does
/// `shutdown_signal`, with `PushError::Cancelled`.
pub async fn poll<S, F>(
    client: &dyn PlatformClient,
    app: &CloudApplication,
    max_attempts: u32,
    options: &Options,
    sleep_fn: &S,
    shutdown_signal: &mut Pin<Box<dyn Future<Output = ()> + Send>>,
) -> Result<HealthOutcome, PushError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let mut last = None;

    for attempt in 1..=max_attempts {
        if let Some(report) = client.get_application_instances(app).await? {
            let tally = InstanceTally::from_report(&report);
            debug!("Health attempt {}/{} for {}: {}", attempt, max_attempts, app.name, tally);
            if tally.converged() {
                return Ok(HealthOutcome::Converged {
                    tally,
                    attempts: attempt,
                });
            }
            last = Some(tally);
        } else {
            debug!("Health attempt {}/{} for {}: no report", attempt, max_attempts, app.name);
        }

        if attempt < max_attempts {
            tokio::select! {
                _ = &mut *shutdown_signal => {
                    return Err(PushError::Cancelled("health polling".to_string()));
                }
                _ = sleep_fn(options.interval) => {}
            }
        }
    }

    Ok(HealthOutcome::TimedOut {
        last,
        attempts: max_attempts,
    })
}
