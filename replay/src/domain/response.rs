use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape of a successful `/api/analyze` response.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AnalysisResponse {
    pub status: AnalysisStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub action: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisStatus {
    Ok,
    Alert,
}
impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisStatus::Ok => write!(f, "OK"),
            AnalysisStatus::Alert => write!(f, "ALERT"),
        }
    }
}

/// Why a single descriptor did not succeed. None of these stop a run.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RequestFailure {
    #[error("network failure: {0}")]
    Network(String),
    #[error("unexpected status {status}")]
    UnexpectedStatus { status: u16, detail: Option<String> },
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// `analysis` is `None` when the body was not an analysis response.
    Success { analysis: Option<AnalysisResponse> },
    Failure(RequestFailure),
}

/// Result of processing one descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOutcome {
    /// 1-based position in the request file.
    pub index: usize,
    pub label: String,
    pub http_status: Option<u16>,
    pub outcome: Outcome,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn failure(&self) -> Option<&RequestFailure> {
        match &self.outcome {
            Outcome::Failure(failure) => Some(failure),
            Outcome::Success { .. } => None,
        }
    }

    /// Whether a request actually went out for this descriptor.
    pub fn was_sent(&self) -> bool {
        !matches!(
            self.outcome,
            Outcome::Failure(RequestFailure::InvalidDescriptor(_))
        )
    }
}
