use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Publication progress for one assembled package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    Idle,
    Uploading,
    Uploaded,
    UploadFailed,
    CleanedUp,
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::UploadFailed => "upload_failed",
            Self::CleanedUp => "cleaned_up",
        };
        f.write_str(s)
    }
}

pub fn validate_transition(from: PublishState, to: PublishState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (PublishState::Idle, PublishState::Uploading)
            | (
                PublishState::Uploading,
                PublishState::Uploaded | PublishState::UploadFailed
            )
            | (
                PublishState::Uploaded | PublishState::UploadFailed,
                PublishState::CleanedUp
            )
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Current state plus the transitions taken so far.
#[derive(Debug, Clone)]
pub(crate) struct StateTracker {
    state: PublishState,
    history: Vec<PublishState>,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        Self {
            state: PublishState::Idle,
            history: vec![PublishState::Idle],
        }
    }

    pub(crate) fn state(&self) -> PublishState {
        self.state
    }

    pub(crate) fn history(&self) -> &[PublishState] {
        &self.history
    }

    pub(crate) fn advance(&mut self, to: PublishState) -> Result<(), CoreError> {
        validate_transition(self.state, to)?;
        debug!("publish state {} -> {to}", self.state);
        self.state = to;
        self.history.push(to);
        Ok(())
    }
}
