use crate::models::{FlowState, FlowStatus, Stats};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast::{self, error::RecvError};

/// Counters over the payment flow's transition stream.
pub struct FlowStats {
    attempts: AtomicU64,
    approvals: AtomicU64,
    payments_confirmed: AtomicU64,
    failures: AtomicU64,
    start_time: Instant,
}

impl FlowStats {
    pub fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            approvals: AtomicU64::new(0),
            payments_confirmed: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, status: &FlowStatus) {
        match status.state {
            // A fresh attempt publishes Idle with its intent attached
            FlowState::Idle if status.intent.is_some() => {
                self.attempts.fetch_add(1, Ordering::SeqCst);
            }
            FlowState::Approving => {
                self.approvals.fetch_add(1, Ordering::SeqCst);
            }
            FlowState::Success => {
                self.payments_confirmed.fetch_add(1, Ordering::SeqCst);
                if let Some(intent) = &status.intent {
                    tracing::info!(
                        "Payment recorded: {} USDC to {}",
                        intent.amount_major_units,
                        intent.recipient_handle
                    );
                }
            }
            FlowState::Error => {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }

    /// Consume `transitions` until the flow is dropped.
    pub fn track(self: Arc<Self>, mut transitions: broadcast::Receiver<FlowStatus>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match transitions.recv().await {
                    Ok(status) => self.record(&status),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Stats tracker lagged, {} transitions skipped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            attempts: self.attempts.load(Ordering::SeqCst),
            approvals: self.approvals.load(Ordering::SeqCst),
            payments_confirmed: self.payments_confirmed.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            uptime_seconds: self.uptime_seconds(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for FlowStats {
    fn default() -> Self {
        Self::new()
    }
}
