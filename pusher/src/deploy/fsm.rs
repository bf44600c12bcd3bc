//! Finite state machine for a push run
//!
//! A push walks the stages strictly forward:
//!
//! ```text
//! NormalizeTarget -> DeriveDomain -> ResolveDeploymentInfo -> Login -> CheckExists
//!   -> [Reset] -> Create | Update -> Configure -> Upload -> Start | Restart
//!   -> ObserveLogs -> PollHealth -> Done
//! ```
//!
//! `Start` is only reachable from a run that created the application, `Restart` only
//! from one that updated it. Any non terminal stage may move to `Failed`.

use serde::{Deserialize, Serialize};

use crate::errors::PushError;

/// Push stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushStage {
    /// Nothing done yet
    Pending,
    NormalizeTarget,
    DeriveDomain,
    ResolveDeploymentInfo,
    Login,
    CheckExists,
    /// Existing application deleted before recreation
    Reset,
    Create,
    Update,
    /// Instance count, environment and service bindings
    Configure,
    Upload,
    Start,
    Restart,
    ObserveLogs,
    PollHealth,
    /// Finished successfully
    Done,
    /// Upstream build did not succeed; nothing was pushed
    Skipped,
    /// Aborted on an error
    Failed,
}

impl PushStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PushStage::Done | PushStage::Skipped | PushStage::Failed)
    }
}

/// Push FSM
#[derive(Debug, Clone)]
pub struct PushFsm {
    stage: PushStage,
    history: Vec<PushStage>,
    error: Option<String>,
}

impl PushFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            stage: PushStage::Pending,
            history: vec![PushStage::Pending],
            error: None,
        }
    }

    /// Get current stage
    pub fn stage(&self) -> PushStage {
        self.stage
    }

    /// Every stage entered so far, in order
    pub fn history(&self) -> &[PushStage] {
        &self.history
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Stage before `Failed`, or the current one
    pub fn last_active_stage(&self) -> PushStage {
        self.history
            .iter()
            .rev()
            .find(|s| !s.is_terminal())
            .copied()
            .unwrap_or(PushStage::Pending)
    }

    /// Move to the next stage
    pub fn advance(&mut self, next: PushStage) -> Result<(), PushError> {
        use PushStage::*;

        let allowed = match (self.stage, next) {
            (Pending, NormalizeTarget) | (Pending, Skipped) => true,
            (NormalizeTarget, DeriveDomain) => true,
            (DeriveDomain, ResolveDeploymentInfo) => true,
            (ResolveDeploymentInfo, Login) => true,
            (Login, CheckExists) => true,
            (CheckExists, Create) | (CheckExists, Update) | (CheckExists, Reset) => true,
            (Reset, Create) => true,
            (Create, Configure) | (Update, Configure) => true,
            (Configure, Upload) => true,
            (Upload, Start) => self.history.contains(&Create),
            (Upload, Restart) => self.history.contains(&Update),
            (Start, ObserveLogs) | (Restart, ObserveLogs) => true,
            (ObserveLogs, PollHealth) => true,
            (PollHealth, Done) => true,
            _ => false,
        };

        if !allowed {
            return Err(PushError::Internal(format!(
                "Invalid transition: {:?} -> {:?}",
                self.stage, next
            )));
        }

        self.stage = next;
        self.history.push(next);
        Ok(())
    }

    /// Record a failure; a terminal FSM is left untouched
    pub fn fail(&mut self, error: &PushError) {
        if self.stage.is_terminal() {
            return;
        }
        self.error = Some(error.to_string());
        self.stage = PushStage::Failed;
        self.history.push(PushStage::Failed);
    }
}

impl Default for PushFsm {
    fn default() -> Self {
        Self::new()
    }
}
