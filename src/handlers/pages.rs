use crate::{
    error::OnClickError,
    handlers::{respond, AppState},
    models::{from_minor_units, ApiResponse, Page, PagePayment},
};
use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct PageView {
    #[serde(flatten)]
    pub page: Page,
    pub total_raised_usdc: Decimal,
    pub goal_usdc: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HandleAvailability {
    pub handle: String,
    pub available: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoalProgress {
    pub handle: String,
    pub goal_reached: bool,
}

pub async fn get_page(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<ApiResponse<PageView>>, OnClickError> {
    let page = state
        .pages
        .page(&handle)
        .await?
        .ok_or_else(|| OnClickError::PageNotFound(handle.clone()))?;

    let view = PageView {
        total_raised_usdc: from_minor_units(page.total_raised),
        goal_usdc: page.has_goal().then(|| from_minor_units(page.goal)),
        page,
    };
    Ok(respond(state.network, view))
}

pub async fn get_payments(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<ApiResponse<Vec<PagePayment>>>, OnClickError> {
    let payments = state.pages.payments(&handle).await?;
    tracing::debug!("Fetched {} payments for {}", payments.len(), handle);
    Ok(respond(state.network, payments))
}

pub async fn check_handle(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<ApiResponse<HandleAvailability>>, OnClickError> {
    let available = state.pages.is_handle_available(&handle).await?;
    Ok(respond(state.network, HandleAvailability { handle, available }))
}

pub async fn goal_progress(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<ApiResponse<GoalProgress>>, OnClickError> {
    let goal_reached = state.pages.is_goal_reached(&handle).await?;
    Ok(respond(state.network, GoalProgress { handle, goal_reached }))
}
