pub mod flow;
pub mod health;
pub mod pages;
pub mod stats;
pub mod stream;

pub use flow::*;
pub use health::*;
pub use pages::*;
pub use stats::*;
pub use stream::*;

use crate::{
    config::Network,
    flow::PaymentFlow,
    models::ApiResponse,
    services::{FlowStats, PageDirectory},
};
use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub network: Network,
    pub flow: Arc<PaymentFlow>,
    pub pages: Arc<PageDirectory>,
    pub stats: Arc<FlowStats>,
    pub probe: Arc<dyn ChainProbe>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/flow", get(get_flow))
        .route("/flow/start", post(start_payment))
        .route("/flow/reset", post(reset_flow))
        .route("/ws/flow", get(flow_socket))
        .route("/pages/:handle", get(get_page))
        .route("/pages/:handle/payments", get(get_payments))
        .route("/pages/:handle/available", get(check_handle))
        .route("/pages/:handle/goal", get(goal_progress))
        .with_state(state)
}

pub(crate) fn respond<T: Serialize>(network: Network, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        timestamp: Utc::now(),
        network: network.to_string(),
        request_id: Uuid::new_v4().to_string(),
    })
}
