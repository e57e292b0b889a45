#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use onclick_pay::{
    error::ChainError,
    flow::{ConfirmationSource, PaymentFlow, PaymentGateway, TokenLedger, WalletSession},
    handlers::ChainProbe,
    models::{FlowState, Page, PagePayment, Role},
    services::PageRegistry,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Notify};

pub fn owner() -> Address {
    Address::from_low_u64_be(0xa11ce)
}

pub fn spender() -> Address {
    Address::from_low_u64_be(0x0c11c)
}

pub fn session() -> WalletSession {
    WalletSession {
        owner: owner(),
        spender: spender(),
    }
}

pub fn usdc(minor: u64) -> U256 {
    U256::from(minor)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ReadBalance(Address),
    ReadAllowance(Address, Address),
    Approve(Address, U256),
    Payment(String, U256, String),
    Confirm(TxHash),
    CreatePage(String, u8, U256),
    UpdatePage(String, U256),
}

/// Scripted chain: fixed balance and allowance, optional failures, and
/// optional gates that hold approval or payment confirmations until released.
#[derive(Default)]
pub struct MockChain {
    balance: Mutex<U256>,
    allowance: Mutex<U256>,
    balance_error: Mutex<Option<ChainError>>,
    approve_error: Mutex<Option<ChainError>>,
    payment_error: Mutex<Option<ChainError>>,
    approval_confirm_error: Mutex<Option<ChainError>>,
    payment_confirm_error: Mutex<Option<ChainError>>,
    approval_gate: Mutex<Option<Arc<Notify>>>,
    payment_gate: Mutex<Option<Arc<Notify>>>,
    approvals: Mutex<HashMap<TxHash, U256>>,
    calls: Mutex<Vec<Call>>,
    next_tx: AtomicU64,
    pages: Mutex<HashMap<String, Page>>,
    page_reads: AtomicU64,
    taken_handles: Mutex<Vec<String>>,
}

impl MockChain {
    pub fn new(balance: u64, allowance: u64) -> Self {
        let chain = Self::default();
        *chain.balance.lock().unwrap() = usdc(balance);
        *chain.allowance.lock().unwrap() = usdc(allowance);
        chain
    }

    pub fn fail_balance(self, err: ChainError) -> Self {
        *self.balance_error.lock().unwrap() = Some(err);
        self
    }

    pub fn fail_approve(self, err: ChainError) -> Self {
        *self.approve_error.lock().unwrap() = Some(err);
        self
    }

    pub fn fail_payment(self, err: ChainError) -> Self {
        *self.payment_error.lock().unwrap() = Some(err);
        self
    }

    pub fn fail_approval_confirmation(self, err: ChainError) -> Self {
        *self.approval_confirm_error.lock().unwrap() = Some(err);
        self
    }

    pub fn fail_payment_confirmation(self, err: ChainError) -> Self {
        *self.payment_confirm_error.lock().unwrap() = Some(err);
        self
    }

    pub fn gate_approvals(self, gate: Arc<Notify>) -> Self {
        *self.approval_gate.lock().unwrap() = Some(gate);
        self
    }

    pub fn gate_payments(self, gate: Arc<Notify>) -> Self {
        *self.payment_gate.lock().unwrap() = Some(gate);
        self
    }

    pub fn with_page(self, page: Page) -> Self {
        self.pages.lock().unwrap().insert(page.handle.clone(), page);
        self
    }

    pub fn set_allowance(&self, allowance: u64) {
        *self.allowance.lock().unwrap() = usdc(allowance);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn payment_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Payment(..)))
            .collect()
    }

    pub fn approve_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Approve(..)))
            .collect()
    }

    pub fn page_reads(&self) -> u64 {
        self.page_reads.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_hash(&self) -> TxHash {
        TxHash::from_low_u64_be(self.next_tx.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl TokenLedger for MockChain {
    async fn read_balance(&self, owner: Address) -> Result<U256, ChainError> {
        self.record(Call::ReadBalance(owner));
        if let Some(err) = self.balance_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(*self.balance.lock().unwrap())
    }

    async fn read_allowance(&self, owner: Address, spender: Address) -> Result<U256, ChainError> {
        self.record(Call::ReadAllowance(owner, spender));
        Ok(*self.allowance.lock().unwrap())
    }

    async fn submit_approve(&self, spender: Address, amount: U256) -> Result<TxHash, ChainError> {
        self.record(Call::Approve(spender, amount));
        if let Some(err) = self.approve_error.lock().unwrap().clone() {
            return Err(err);
        }
        let tx = self.next_hash();
        self.approvals.lock().unwrap().insert(tx, amount);
        Ok(tx)
    }
}

#[async_trait]
impl PaymentGateway for MockChain {
    async fn submit_payment(
        &self,
        handle: &str,
        amount: U256,
        message: &str,
    ) -> Result<TxHash, ChainError> {
        self.record(Call::Payment(handle.to_string(), amount, message.to_string()));
        if let Some(err) = self.payment_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.next_hash())
    }
}

#[async_trait]
impl ConfirmationSource for MockChain {
    async fn await_confirmation(&self, tx: TxHash) -> Result<(), ChainError> {
        self.record(Call::Confirm(tx));

        let approved = self.approvals.lock().unwrap().get(&tx).copied();
        match approved {
            Some(amount) => {
                let gate = self.approval_gate.lock().unwrap().clone();
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                if let Some(err) = self.approval_confirm_error.lock().unwrap().clone() {
                    return Err(err);
                }
                *self.allowance.lock().unwrap() = amount;
                Ok(())
            }
            None => {
                let gate = self.payment_gate.lock().unwrap().clone();
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                match self.payment_confirm_error.lock().unwrap().clone() {
                    Some(err) => Err(err),
                    None => Ok(()),
                }
            }
        }
    }
}

#[async_trait]
impl PageRegistry for MockChain {
    async fn get_page(&self, handle: &str) -> Result<Option<Page>, ChainError> {
        self.page_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages.lock().unwrap().get(handle).cloned())
    }

    async fn get_payments(&self, _handle: &str) -> Result<Vec<PagePayment>, ChainError> {
        Ok(vec![PagePayment {
            supporter: owner(),
            amount: usdc(10_000_000),
            timestamp: 1_700_000_000,
            message: "thanks".to_string(),
            is_fiat_converted: false,
        }])
    }

    async fn is_handle_available(&self, handle: &str) -> Result<bool, ChainError> {
        let taken = self.taken_handles.lock().unwrap().iter().any(|h| h == handle);
        Ok(!taken && !self.pages.lock().unwrap().contains_key(handle))
    }

    async fn is_goal_reached(&self, handle: &str) -> Result<bool, ChainError> {
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(handle)
            .map(|p| p.has_goal() && p.total_raised >= p.goal)
            .unwrap_or(false))
    }

    async fn submit_create_page(
        &self,
        handle: &str,
        role: u8,
        _wallet: Address,
        goal: U256,
        _deadline: u64,
    ) -> Result<TxHash, ChainError> {
        self.record(Call::CreatePage(handle.to_string(), role, goal));
        self.taken_handles.lock().unwrap().push(handle.to_string());
        Ok(self.next_hash())
    }

    async fn submit_update_page(
        &self,
        handle: &str,
        _wallet: Address,
        goal: U256,
        _deadline: u64,
    ) -> Result<TxHash, ChainError> {
        self.record(Call::UpdatePage(handle.to_string(), goal));
        Ok(self.next_hash())
    }
}

#[async_trait]
impl ChainProbe for MockChain {
    async fn block_number(&self) -> anyhow::Result<u64> {
        Ok(42)
    }
}

pub fn flow_for(chain: &Arc<MockChain>) -> Arc<PaymentFlow> {
    Arc::new(PaymentFlow::with_client(session(), chain.clone()))
}

pub fn page(handle: &str, goal: u64, raised: u64) -> Page {
    Page {
        owner: owner(),
        handle: handle.to_string(),
        role: Role::Crowdfunder,
        wallet_address: owner(),
        goal: usdc(goal),
        deadline: 0,
        total_raised: usdc(raised),
        supporter_count: 3,
        exists: true,
    }
}

/// Every state published so far on `rx`.
pub fn drain_states(rx: &mut broadcast::Receiver<onclick_pay::models::FlowStatus>) -> Vec<FlowState> {
    let mut states = Vec::new();
    while let Ok(status) = rx.try_recv() {
        states.push(status.state);
    }
    states
}
