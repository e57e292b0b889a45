//! Approve-then-pay state machine for page payments.

pub mod controller;
pub mod ports;
pub mod state;

pub use controller::{PaymentFlow, APPROVAL_FAILED, INSUFFICIENT_BALANCE, PAYMENT_FAILED};
pub use ports::{ConfirmationSource, PaymentGateway, TokenLedger, WalletSession};
pub use state::FlowEvent;
