use chrono::{DateTime, Utc};
use ethers::types::{H256, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::units::to_minor_units;
use crate::error::IntentError;

pub const MAX_MESSAGE_CHARS: usize = 100;

/// A visitor's request to pay a page. Immutable once handed to the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub recipient_handle: String,
    pub amount_major_units: Decimal,
    pub amount_minor_units: U256,
    pub message: String,
}

impl PaymentIntent {
    pub fn new(handle: &str, amount: Decimal, message: &str) -> Result<Self, IntentError> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(IntentError::EmptyHandle);
        }
        if amount <= Decimal::ZERO {
            return Err(IntentError::NonPositiveAmount(amount));
        }
        let chars = message.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(IntentError::MessageTooLong(chars));
        }
        let amount_minor_units = to_minor_units(amount).ok_or(IntentError::AmountOutOfRange(amount))?;
        // Positive but below one minor unit would submit a zero-value transfer
        if amount_minor_units.is_zero() {
            return Err(IntentError::NonPositiveAmount(amount));
        }

        Ok(Self {
            recipient_handle: handle.to_string(),
            amount_major_units: amount,
            amount_minor_units,
            message: message.to_string(),
        })
    }
}

/// Body accepted by `POST /flow/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub handle: String,
    pub amount: Decimal,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowState {
    Idle,
    Approving,
    Paying,
    Success,
    Error,
}

impl FlowState {
    /// A transaction has been submitted and its receipt is awaited.
    pub fn is_in_flight(self) -> bool {
        matches!(self, FlowState::Approving | FlowState::Paying)
    }
}

/// Snapshot of the flow published to observers after every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStatus {
    pub state: FlowState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<PaymentIntent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_tx: Option<H256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_tx: Option<H256>,
    pub updated_at: DateTime<Utc>,
}

impl FlowStatus {
    pub fn idle() -> Self {
        Self {
            state: FlowState::Idle,
            error_message: None,
            intent: None,
            approval_tx: None,
            payment_tx: None,
            updated_at: Utc::now(),
        }
    }

    /// An attempt has started and has not yet settled in `Success` or `Error`.
    pub fn is_busy(&self) -> bool {
        self.intent.is_some() && !matches!(self.state, FlowState::Success | FlowState::Error)
    }
}

impl Default for FlowStatus {
    fn default() -> Self {
        Self::idle()
    }
}
