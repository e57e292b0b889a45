use super::ports::{ConfirmationSource, PaymentGateway, TokenLedger, WalletSession};
use super::state::FlowEvent;
use crate::error::IntentError;
use crate::models::{FlowState, FlowStatus, PaymentIntent};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

pub const INSUFFICIENT_BALANCE: &str = "Insufficient USDC balance";
pub const APPROVAL_FAILED: &str = "Approval failed";
pub const PAYMENT_FAILED: &str = "Payment failed";

const TRANSITION_BUFFER: usize = 64;

/// The attempt was reset or replaced by a newer one while suspended.
#[derive(Debug)]
struct Superseded;

/// Drives one page payment from intent to confirmation: approve if the
/// current allowance is short, then pay.
///
/// Status is published on a [`watch`] channel (latest snapshot) and every
/// state change on a [`broadcast`] channel (transition stream). A newer
/// `start_payment` or `reset` supersedes the running attempt, which stops
/// publishing and never submits its payment. Use [`PaymentFlow::try_spawn`]
/// to refuse a start while another attempt is unsettled.
pub struct PaymentFlow {
    session: WalletSession,
    token: Arc<dyn TokenLedger>,
    gateway: Arc<dyn PaymentGateway>,
    confirmations: Arc<dyn ConfirmationSource>,
    status: watch::Sender<FlowStatus>,
    transitions: broadcast::Sender<FlowStatus>,
    // Only mutated inside `status` modify closures
    attempt: AtomicU64,
}

impl PaymentFlow {
    pub fn new(
        session: WalletSession,
        token: Arc<dyn TokenLedger>,
        gateway: Arc<dyn PaymentGateway>,
        confirmations: Arc<dyn ConfirmationSource>,
    ) -> Self {
        let (status, _) = watch::channel(FlowStatus::idle());
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);

        Self {
            session,
            token,
            gateway,
            confirmations,
            status,
            transitions,
            attempt: AtomicU64::new(0),
        }
    }

    /// Build a flow whose three collaborators are one chain client.
    pub fn with_client<C>(session: WalletSession, client: Arc<C>) -> Self
    where
        C: TokenLedger + PaymentGateway + ConfirmationSource + 'static,
    {
        Self::new(session, client.clone(), client.clone(), client)
    }

    pub fn session(&self) -> WalletSession {
        self.session
    }

    pub fn status(&self) -> FlowStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> FlowState {
        self.status.borrow().state
    }

    pub fn error_message(&self) -> Option<String> {
        self.status.borrow().error_message.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowStatus> {
        self.status.subscribe()
    }

    pub fn transitions(&self) -> broadcast::Receiver<FlowStatus> {
        self.transitions.subscribe()
    }

    /// Validate the input and run the payment to completion.
    ///
    /// Invalid input is returned as an error with no side effects. Every
    /// other failure is reported through the flow's `Error` state; the
    /// returned state is where this attempt came to rest.
    pub async fn start_payment(
        &self,
        handle: &str,
        amount: Decimal,
        message: &str,
    ) -> Result<FlowState, IntentError> {
        let intent = PaymentIntent::new(handle, amount, message)?;
        Ok(self.run(intent).await)
    }

    /// Run an already validated intent.
    pub async fn run(&self, intent: PaymentIntent) -> FlowState {
        let attempt = self.begin(&intent);
        self.finish(attempt, intent).await
    }

    /// Start an attempt now and drive it on a background task. The flow is
    /// back in `Idle` with `intent` attached by the time this returns.
    pub fn spawn(self: &Arc<Self>, intent: PaymentIntent) -> JoinHandle<FlowState> {
        let attempt = self.begin(&intent);
        self.drive_in_background(attempt, intent)
    }

    /// Like [`PaymentFlow::spawn`], but returns `None` without touching the
    /// flow while another attempt is unsettled.
    pub fn try_spawn(self: &Arc<Self>, intent: PaymentIntent) -> Option<JoinHandle<FlowState>> {
        let attempt = self.begin_exclusive(&intent)?;
        Some(self.drive_in_background(attempt, intent))
    }

    fn drive_in_background(self: &Arc<Self>, attempt: u64, intent: PaymentIntent) -> JoinHandle<FlowState> {
        let flow = Arc::clone(self);
        tokio::spawn(async move { flow.finish(attempt, intent).await })
    }

    /// A superseded attempt reports `Idle`: it settled nowhere.
    async fn finish(&self, attempt: u64, intent: PaymentIntent) -> FlowState {
        match self.drive(attempt, &intent).await {
            Ok(state) => state,
            Err(Superseded) => {
                tracing::warn!(
                    handle = %intent.recipient_handle,
                    attempt,
                    "Payment attempt superseded; any submitted transaction may still confirm"
                );
                FlowState::Idle
            }
        }
    }

    /// Force the flow back to `Idle`, dropping the intent and error message.
    ///
    /// Cannot recall a submitted transaction.
    pub fn reset(&self) {
        let mut was_in_flight = false;
        self.status.send_modify(|status| {
            was_in_flight = status.state.is_in_flight();
            self.attempt.fetch_add(1, Ordering::SeqCst);
            *status = FlowStatus::idle();
            let _ = self.transitions.send(status.clone());
        });

        if was_in_flight {
            tracing::warn!("Payment flow reset while a transaction was pending");
        } else {
            tracing::debug!("Payment flow reset");
        }
    }

    fn begin(&self, intent: &PaymentIntent) -> u64 {
        let mut attempt = 0;
        self.status.send_modify(|status| {
            attempt = self.start_attempt(status, intent);
        });
        self.log_start(intent, attempt);
        attempt
    }

    /// Busy check and attempt start under one lock of the status channel.
    fn begin_exclusive(&self, intent: &PaymentIntent) -> Option<u64> {
        let mut attempt = None;
        self.status.send_if_modified(|status| {
            if status.is_busy() {
                return false;
            }
            attempt = Some(self.start_attempt(status, intent));
            true
        });

        match attempt {
            Some(attempt) => self.log_start(intent, attempt),
            None => tracing::debug!(
                handle = %intent.recipient_handle,
                "Payment refused, another attempt is unsettled"
            ),
        }
        attempt
    }

    fn start_attempt(&self, status: &mut FlowStatus, intent: &PaymentIntent) -> u64 {
        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;
        *status = FlowStatus {
            intent: Some(intent.clone()),
            ..FlowStatus::idle()
        };
        let _ = self.transitions.send(status.clone());
        attempt
    }

    fn log_start(&self, intent: &PaymentIntent, attempt: u64) {
        tracing::info!(
            handle = %intent.recipient_handle,
            amount = %intent.amount_major_units,
            attempt,
            "Starting payment"
        );
    }

    async fn drive(&self, attempt: u64, intent: &PaymentIntent) -> Result<FlowState, Superseded> {
        let amount = intent.amount_minor_units;
        let WalletSession { owner, spender } = self.session;

        // Balance first, then allowance, both fresh, before anything is signed
        let balance = match self.token.read_balance(owner).await {
            Ok(balance) => balance,
            Err(e) => return self.fail(attempt, e.message_or(PAYMENT_FAILED)),
        };
        if balance < amount {
            tracing::info!(%owner, %balance, %amount, "Insufficient balance for payment");
            return self.fail(attempt, INSUFFICIENT_BALANCE.to_string());
        }

        let allowance = match self.token.read_allowance(owner, spender).await {
            Ok(allowance) => allowance,
            Err(e) => return self.fail(attempt, e.message_or(PAYMENT_FAILED)),
        };

        if allowance < amount {
            self.apply(attempt, FlowEvent::ApprovalStarted)?;
            tracing::info!(%spender, %amount, %allowance, "Submitting approval");

            let tx = match self.token.submit_approve(spender, amount).await {
                Ok(tx) => tx,
                Err(e) => return self.fail(attempt, e.message_or(APPROVAL_FAILED)),
            };
            self.record(attempt, |status| status.approval_tx = Some(tx))?;

            if let Err(e) = self.confirmations.await_confirmation(tx).await {
                return self.fail(attempt, e.message_or(APPROVAL_FAILED));
            }
            tracing::info!(tx = ?tx, "Approval confirmed");
            self.apply(attempt, FlowEvent::ApprovalConfirmed)?;
        } else {
            tracing::debug!(%allowance, %amount, "Existing allowance covers payment");
            self.apply(attempt, FlowEvent::PaymentStarted)?;
        }

        tracing::info!(handle = %intent.recipient_handle, %amount, "Submitting payment");
        let tx = match self
            .gateway
            .submit_payment(&intent.recipient_handle, amount, &intent.message)
            .await
        {
            Ok(tx) => tx,
            Err(e) => return self.fail(attempt, e.message_or(PAYMENT_FAILED)),
        };
        self.record(attempt, |status| status.payment_tx = Some(tx))?;

        if let Err(e) = self.confirmations.await_confirmation(tx).await {
            return self.fail(attempt, e.message_or(PAYMENT_FAILED));
        }
        tracing::info!(tx = ?tx, handle = %intent.recipient_handle, "Payment confirmed");
        self.apply(attempt, FlowEvent::PaymentConfirmed)
    }

    fn fail(&self, attempt: u64, message: String) -> Result<FlowState, Superseded> {
        tracing::warn!(attempt, error = %message, "Payment flow failed");
        self.apply(attempt, FlowEvent::Failed(message))
    }

    /// Run `event` through the state machine on behalf of `attempt`.
    fn apply(&self, attempt: u64, event: FlowEvent) -> Result<FlowState, Superseded> {
        let mut outcome = Err(Superseded);

        self.status.send_if_modified(|status| {
            if self.attempt.load(Ordering::SeqCst) != attempt {
                return false;
            }
            let Some(next) = status.state.transition(&event) else {
                tracing::error!(state = ?status.state, event = ?event, "Rejected flow transition");
                outcome = Ok(status.state);
                return false;
            };

            tracing::debug!(from = ?status.state, to = ?next, "Flow transition");
            status.state = next;
            if let FlowEvent::Failed(message) = &event {
                status.error_message = Some(message.clone());
            }
            status.updated_at = Utc::now();
            outcome = Ok(next);
            let _ = self.transitions.send(status.clone());
            true
        });

        outcome
    }

    /// Update the snapshot without a state change.
    fn record(&self, attempt: u64, update: impl FnOnce(&mut FlowStatus)) -> Result<(), Superseded> {
        let mut current = false;
        self.status.send_if_modified(|status| {
            current = self.attempt.load(Ordering::SeqCst) == attempt;
            if current {
                update(status);
                status.updated_at = Utc::now();
            }
            current
        });

        if current {
            Ok(())
        } else {
            Err(Superseded)
        }
    }
}
