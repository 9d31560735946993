//! Upload flow states and the events published while moving between them.

use serde::Serialize;
use std::fmt;

use crate::models::UploadResult;

/// Where a submission currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FlowState {
    Idle,
    WalletCheck,
    Validating,
    RequestingUrl,
    Uploading { completed: usize, total: usize },
    Succeeded { link: String },
    Failed { message: String },
}

impl FlowState {
    /// `Succeeded` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Succeeded { .. } | FlowState::Failed { .. })
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Idle => write!(f, "idle"),
            FlowState::WalletCheck => write!(f, "checking wallet"),
            FlowState::Validating => write!(f, "validating form"),
            FlowState::RequestingUrl => write!(f, "requesting upload URL"),
            FlowState::Uploading { completed, total } => write!(f, "uploading ({}/{})", completed, total),
            FlowState::Succeeded { link } => write!(f, "uploaded: {}", link),
            FlowState::Failed { message } => write!(f, "failed: {}", message),
        }
    }
}

/// Progress notifications for subscribers (terminal UI, SSE, tests).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlowEvent {
    /// The controller entered a new state.
    StateChanged { state: FlowState },
    /// A file finished pinning. `index` is its position in the submission.
    FileUploaded {
        index: usize,
        total: usize,
        result: UploadResult,
    },
    /// The wallet was asked to connect.
    AuthenticationRequested,
}
