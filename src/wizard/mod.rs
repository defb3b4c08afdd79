//! Configuration wizards
//!
//! Each wizard is a small state machine around a [`WizardForm`]: the form
//! knows how to check and normalize its own input, the wizard decides when
//! the backend gets contacted. Invalid input never leaves the process.
//!
//! ```text
//! Closed -> Open -> Validating -> Invalid -> Open
//!                              -> Submitting -> Closed
//! ```

pub mod dhcp;
pub mod dns;

pub use dhcp::{derive_netmask, DhcpForm, DhcpWizardInput};
pub use dns::{DnsForm, DnsWizardInput};

use crate::error::{PanelError, ValidationError};
use crate::gateway::{Gateway, Reply};
use reqwest::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Only required fields
    Basic,
    /// Every rule
    #[default]
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    Closed,
    Open,
    Validating,
    Invalid(String),
    Submitting,
}

/// Input handling for one wizard
pub trait WizardForm {
    type Input;
    type Payload: Serialize;

    /// Shown in messages, e.g. "DHCP"
    const NAME: &'static str;
    const ENDPOINT: &'static str;

    /// Check the input, stopping at the first broken rule
    fn validate(input: &Self::Input, level: ValidationLevel) -> Result<(), ValidationError>;

    /// Build the payload sent to the backend from already validated input
    fn normalize(input: Self::Input) -> Self::Payload;
}

pub struct Wizard<F: WizardForm> {
    state: WizardState,
    level: ValidationLevel,
    _form: std::marker::PhantomData<F>,
}

impl<F: WizardForm> Wizard<F> {
    pub fn new(level: ValidationLevel) -> Self {
        Self {
            state: WizardState::Closed,
            level,
            _form: std::marker::PhantomData,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, WizardState::Closed)
    }

    /// Message of the most recent rejected submission, while still open
    pub fn last_error(&self) -> Option<&str> {
        match &self.state {
            WizardState::Invalid(message) => Some(message),
            _ => None,
        }
    }

    pub fn open(&mut self) {
        self.state = WizardState::Open;
    }

    pub fn close(&mut self) {
        self.state = WizardState::Closed;
    }

    /// Validate and, if everything holds, close the wizard and send the
    /// payload. On invalid input the wizard stays open and nothing is sent.
    pub async fn submit(&mut self, input: F::Input, gateway: &Gateway) -> Result<Reply, PanelError> {
        if !self.is_open() {
            return Err(PanelError::WizardNotOpen(F::NAME));
        }

        self.state = WizardState::Validating;
        if let Err(err) = F::validate(&input, self.level) {
            tracing::debug!("{} wizard rejected input: {}", F::NAME, err);
            gateway.log().error(None, format!("{}: {}", F::NAME, err));
            // Invalid keeps the form open for another attempt
            self.state = WizardState::Invalid(err.message.clone());
            return Err(err.into());
        }

        self.state = WizardState::Submitting;
        let payload = match serde_json::to_value(F::normalize(input)) {
            Ok(payload) => payload,
            Err(e) => {
                self.state = WizardState::Open;
                return Err(ValidationError::new("payload", e.to_string()).into());
            }
        };
        self.close();

        gateway.call(F::ENDPOINT, Method::POST, Some(payload)).await
    }
}

/// Required text field, trimmed
pub(crate) fn require(value: &str, field: &'static str, label: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, format!("{label} is required")));
    }
    Ok(())
}
