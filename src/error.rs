use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use ethers::types::H256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Rejected payment input, reported before any chain call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntentError {
    #[error("Page handle must not be empty")]
    EmptyHandle,

    #[error("Amount must be greater than zero: {0}")]
    NonPositiveAmount(Decimal),

    #[error("Amount out of range: {0}")]
    AmountOutOfRange(Decimal),

    #[error("Message too long: {0} characters (max 100)")]
    MessageTooLong(usize),
}

/// Failure reported by a wallet, RPC node or contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("{0}")]
    Wallet(String),

    #[error("{0}")]
    Rpc(String),

    #[error("Contract reverted: {0}")]
    Revert(String),

    #[error("Transaction {0:?} failed onchain")]
    Reverted(H256),

    #[error("Transaction {0:?} dropped")]
    Dropped(H256),

    #[error("Unknown chain error")]
    Unknown,
}

impl ChainError {
    /// Human-readable message from the underlying layer, if it gave one.
    pub fn user_message(&self) -> Option<String> {
        match self {
            ChainError::Wallet(msg) | ChainError::Rpc(msg) => {
                let msg = msg.trim();
                (!msg.is_empty()).then(|| msg.to_string())
            }
            ChainError::Revert(reason) if reason.trim().is_empty() => None,
            ChainError::Unknown => None,
            other => Some(other.to_string()),
        }
    }

    pub fn message_or(&self, fallback: &str) -> String {
        self.user_message().unwrap_or_else(|| fallback.to_string())
    }
}

#[derive(Error, Debug)]
pub enum OnClickError {
    #[error("Invalid payment: {0}")]
    InvalidPayment(#[from] IntentError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("A payment is already in progress")]
    FlowBusy,

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Handle already taken: {0}")]
    HandleTaken(String),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub request_id: String,
}

impl OnClickError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            OnClickError::InvalidPayment(_) => (StatusCode::BAD_REQUEST, "INVALID_PAYMENT"),
            OnClickError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            OnClickError::FlowBusy => (StatusCode::CONFLICT, "FLOW_BUSY"),
            OnClickError::PageNotFound(_) => (StatusCode::NOT_FOUND, "PAGE_NOT_FOUND"),
            OnClickError::HandleTaken(_) => (StatusCode::CONFLICT, "HANDLE_TAKEN"),
            OnClickError::Chain(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        }
    }
}

impl IntoResponse for OnClickError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            error_code: error_code.to_string(),
            timestamp: Utc::now(),
            request_id: Uuid::new_v4().to_string(),
        };

        if status.is_server_error() {
            tracing::warn!(error = ?self, error_code = error_code, "Upstream request failed");
        } else {
            tracing::debug!(error = %self, error_code = error_code, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}
