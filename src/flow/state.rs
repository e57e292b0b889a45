use crate::models::FlowState;

/// Inputs to the payment state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    /// Allowance is short; the approval transaction is about to be submitted.
    ApprovalStarted,
    /// Allowance already covers the amount; payment goes out directly.
    PaymentStarted,
    ApprovalConfirmed,
    PaymentConfirmed,
    Failed(String),
    Reset,
}

impl FlowState {
    /// Apply `event`, returning the next state, or `None` when the event is
    /// not valid in the current state.
    pub fn transition(self, event: &FlowEvent) -> Option<FlowState> {
        use FlowEvent::*;
        use FlowState::*;

        match (self, event) {
            (_, Reset) => Some(Idle),
            (Idle, ApprovalStarted) => Some(Approving),
            (Idle, PaymentStarted) => Some(Paying),
            (Approving, ApprovalConfirmed) => Some(Paying),
            (Paying, PaymentConfirmed) => Some(Success),
            (Idle | Approving | Paying, Failed(_)) => Some(Error),
            _ => None,
        }
    }
}
