use crate::{
    config::Network,
    error::OnClickError,
    handlers::{respond, AppState},
    models::{ApiResponse, FlowState, FlowStatus, PaymentIntent, PaymentRequest},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Flow status plus explorer links for any submitted transactions.
#[derive(Debug, Serialize, Deserialize)]
pub struct FlowView {
    #[serde(flatten)]
    pub status: FlowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

impl FlowView {
    pub fn new(status: FlowStatus, network: Network) -> Self {
        Self {
            approval_url: status.approval_tx.map(|tx| network.tx_url(tx)),
            payment_url: status.payment_tx.map(|tx| network.tx_url(tx)),
            status,
        }
    }
}

pub async fn get_flow(State(state): State<AppState>) -> Json<ApiResponse<FlowView>> {
    respond(state.network, FlowView::new(state.flow.status(), state.network))
}

pub async fn start_payment(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FlowView>>), OnClickError> {
    let intent = PaymentIntent::new(&request.handle, request.amount, &request.message)?;

    let handle = intent.recipient_handle.clone();
    let attempt = state.flow.try_spawn(intent).ok_or(OnClickError::FlowBusy)?;
    let pages = state.pages.clone();
    tokio::spawn(async move {
        match attempt.await {
            Ok(FlowState::Success) => pages.invalidate(&handle).await,
            Ok(_) => {}
            Err(e) => tracing::error!("Payment task failed: {}", e),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        respond(state.network, FlowView::new(state.flow.status(), state.network)),
    ))
}

pub async fn reset_flow(State(state): State<AppState>) -> Json<ApiResponse<FlowView>> {
    state.flow.reset();
    respond(state.network, FlowView::new(state.flow.status(), state.network))
}
