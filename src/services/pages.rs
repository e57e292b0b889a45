use crate::{
    error::{ChainError, OnClickError},
    flow::ConfirmationSource,
    models::{to_minor_units, Page, PagePayment, Role},
};
use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use moka::future::Cache;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// OnClick contract surface for page metadata.
#[async_trait]
pub trait PageRegistry: Send + Sync {
    /// `None` when the contract reports no page under `handle`.
    async fn get_page(&self, handle: &str) -> Result<Option<Page>, ChainError>;
    async fn get_payments(&self, handle: &str) -> Result<Vec<PagePayment>, ChainError>;
    async fn is_handle_available(&self, handle: &str) -> Result<bool, ChainError>;
    async fn is_goal_reached(&self, handle: &str) -> Result<bool, ChainError>;
    async fn submit_create_page(
        &self,
        handle: &str,
        role: u8,
        wallet: Address,
        goal: U256,
        deadline: u64,
    ) -> Result<TxHash, ChainError>;
    async fn submit_update_page(
        &self,
        handle: &str,
        wallet: Address,
        goal: U256,
        deadline: u64,
    ) -> Result<TxHash, ChainError>;
}

/// Read side of the page registry. Page metadata is cached briefly;
/// payment history is always read through.
pub struct PageDirectory {
    registry: Arc<dyn PageRegistry>,
    pages: Cache<String, Page>,
}

impl PageDirectory {
    pub fn new(registry: Arc<dyn PageRegistry>, ttl: Duration) -> Self {
        let pages = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();

        Self { registry, pages }
    }

    pub async fn page(&self, handle: &str) -> Result<Option<Page>, ChainError> {
        let handle = normalize(handle);
        if let Some(page) = self.pages.get(&handle).await {
            tracing::debug!("Page cache hit for handle: {}", handle);
            return Ok(Some(page));
        }

        let page = self.registry.get_page(&handle).await?;
        if let Some(page) = &page {
            self.pages.insert(handle, page.clone()).await;
        }
        Ok(page)
    }

    pub async fn payments(&self, handle: &str) -> Result<Vec<PagePayment>, ChainError> {
        self.registry.get_payments(&normalize(handle)).await
    }

    pub async fn is_handle_available(&self, handle: &str) -> Result<bool, ChainError> {
        self.registry.is_handle_available(&normalize(handle)).await
    }

    pub async fn is_goal_reached(&self, handle: &str) -> Result<bool, ChainError> {
        self.registry.is_goal_reached(&normalize(handle)).await
    }

    /// Drop the cached page so the next read sees fresh totals.
    pub async fn invalidate(&self, handle: &str) {
        self.pages.invalidate(&normalize(handle)).await;
    }
}

fn normalize(handle: &str) -> String {
    handle.trim().to_string()
}

/// Page metadata to publish. A zero goal or deadline means "none".
#[derive(Debug, Clone, PartialEq)]
pub struct PageDraft {
    pub handle: String,
    pub role: Role,
    pub wallet_address: Address,
    pub goal: Decimal,
    pub deadline: u64,
}

/// Write side: create and update pages, waiting for confirmation. A
/// confirmed change drops the handle from `directory`.
pub struct PagePublisher {
    registry: Arc<dyn PageRegistry>,
    confirmations: Arc<dyn ConfirmationSource>,
    directory: Arc<PageDirectory>,
}

impl PagePublisher {
    pub fn new(
        registry: Arc<dyn PageRegistry>,
        confirmations: Arc<dyn ConfirmationSource>,
        directory: Arc<PageDirectory>,
    ) -> Self {
        Self {
            registry,
            confirmations,
            directory,
        }
    }

    pub async fn create_page(&self, draft: &PageDraft) -> Result<TxHash, OnClickError> {
        let handle = validate_handle(&draft.handle)?;
        let goal = goal_minor_units(draft.goal)?;

        if !self.registry.is_handle_available(&handle).await? {
            return Err(OnClickError::HandleTaken(handle));
        }

        tracing::info!(handle = %handle, role = %draft.role, "Publishing page");
        let tx = self
            .registry
            .submit_create_page(&handle, draft.role.as_u8(), draft.wallet_address, goal, draft.deadline)
            .await?;
        self.confirmations.await_confirmation(tx).await?;
        self.directory.invalidate(&handle).await;

        tracing::info!(handle = %handle, tx = ?tx, "Page published");
        Ok(tx)
    }

    pub async fn update_page(&self, draft: &PageDraft) -> Result<TxHash, OnClickError> {
        let handle = validate_handle(&draft.handle)?;
        let goal = goal_minor_units(draft.goal)?;

        let tx = self
            .registry
            .submit_update_page(&handle, draft.wallet_address, goal, draft.deadline)
            .await?;
        self.confirmations.await_confirmation(tx).await?;
        self.directory.invalidate(&handle).await;

        tracing::info!(handle = %handle, tx = ?tx, "Page updated");
        Ok(tx)
    }
}

fn validate_handle(handle: &str) -> Result<String, OnClickError> {
    let handle = normalize(handle);
    if handle.is_empty() {
        return Err(OnClickError::InvalidRequest("Page handle must not be empty".to_string()));
    }
    Ok(handle)
}

fn goal_minor_units(goal: Decimal) -> Result<U256, OnClickError> {
    if goal <= Decimal::ZERO {
        return Ok(U256::zero());
    }
    to_minor_units(goal)
        .ok_or_else(|| OnClickError::InvalidRequest(format!("Goal out of range: {}", goal)))
}
