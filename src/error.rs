//! Error taxonomy shared by the session, gateway and wizards

use thiserror::Error;

/// A single failed input rule, reported by the wizards
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Form field the rule applies to
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PanelError {
    /// No access key is set
    #[error("no access key set, log in first")]
    Unauthenticated,

    /// The backend refused the access key at login
    #[error("access key rejected by the backend")]
    InvalidKey,

    /// Transport failure, the backend could not be reached
    #[error("cannot reach the backend: {0}")]
    Connectivity(String),

    /// Backend reachable but reported a failure
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0} wizard is not open")]
    WizardNotOpen(&'static str),

    #[error("session store error: {0}")]
    Store(#[from] std::io::Error),
}

impl PanelError {
    /// True for failures that mean the backend is down
    pub fn is_connectivity(&self) -> bool {
        matches!(self, PanelError::Connectivity(_))
    }
}

impl From<reqwest::Error> for PanelError {
    fn from(e: reqwest::Error) -> Self {
        PanelError::Connectivity(e.to_string())
    }
}
