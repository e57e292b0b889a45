mod common;

use common::*;
use ethers::types::H256;
use onclick_pay::{
    error::{ChainError, IntentError},
    flow::{APPROVAL_FAILED, INSUFFICIENT_BALANCE, PAYMENT_FAILED},
    models::FlowState,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn insufficient_balance_fails_without_transactions() {
    let chain = Arc::new(MockChain::new(5_000_000, 0));
    let flow = flow_for(&chain);
    let mut rx = flow.transitions();

    let state = assert_ok!(flow.start_payment("alice", dec!(10), "thanks").await);

    assert_eq!(state, FlowState::Error);
    assert_eq!(flow.state(), FlowState::Error);
    assert_eq!(flow.error_message().as_deref(), Some(INSUFFICIENT_BALANCE));
    assert_eq!(drain_states(&mut rx), vec![FlowState::Idle, FlowState::Error]);
    assert_eq!(chain.calls(), vec![Call::ReadBalance(owner())]);
}

#[tokio::test]
async fn existing_allowance_skips_approval() {
    let chain = Arc::new(MockChain::new(50_000_000, 20_000_000));
    let flow = flow_for(&chain);
    let mut rx = flow.transitions();

    let state = assert_ok!(flow.start_payment("alice", dec!(10), "thanks").await);

    assert_eq!(state, FlowState::Success);
    assert_eq!(
        drain_states(&mut rx),
        vec![FlowState::Idle, FlowState::Paying, FlowState::Success]
    );
    assert!(chain.approve_calls().is_empty());
    assert_eq!(
        chain.payment_calls(),
        vec![Call::Payment("alice".into(), usdc(10_000_000), "thanks".into())]
    );
    assert_eq!(flow.error_message(), None);
}

#[tokio::test]
async fn short_allowance_approves_exact_amount_then_pays() {
    let chain = Arc::new(MockChain::new(50_000_000, 0));
    let flow = flow_for(&chain);
    let mut rx = flow.transitions();

    let state = assert_ok!(flow.start_payment("alice", dec!(10), "").await);

    assert_eq!(state, FlowState::Success);
    assert_eq!(
        drain_states(&mut rx),
        vec![
            FlowState::Idle,
            FlowState::Approving,
            FlowState::Paying,
            FlowState::Success
        ]
    );

    let approve_tx = H256::from_low_u64_be(1);
    let payment_tx = H256::from_low_u64_be(2);
    assert_eq!(
        chain.calls(),
        vec![
            Call::ReadBalance(owner()),
            Call::ReadAllowance(owner(), spender()),
            Call::Approve(spender(), usdc(10_000_000)),
            Call::Confirm(approve_tx),
            Call::Payment("alice".into(), usdc(10_000_000), "".into()),
            Call::Confirm(payment_tx),
        ]
    );

    let status = flow.status();
    assert_eq!(status.approval_tx, Some(approve_tx));
    assert_eq!(status.payment_tx, Some(payment_tx));
}

#[tokio::test]
async fn payment_uses_floored_intent_amount() {
    let chain = Arc::new(MockChain::new(50_000_000, 0));
    let flow = flow_for(&chain);

    assert_ok!(flow.start_payment("alice", dec!(1.2345679), "tip").await);

    assert_eq!(chain.approve_calls(), vec![Call::Approve(spender(), usdc(1_234_567))]);
    assert_eq!(
        chain.payment_calls(),
        vec![Call::Payment("alice".into(), usdc(1_234_567), "tip".into())]
    );
}

#[tokio::test]
async fn rejected_approval_never_pays() {
    let chain = Arc::new(
        MockChain::new(50_000_000, 0)
            .fail_approve(ChainError::Wallet("User rejected the request.".into())),
    );
    let flow = flow_for(&chain);
    let mut rx = flow.transitions();

    let state = assert_ok!(flow.start_payment("alice", dec!(10), "thanks").await);

    assert_eq!(state, FlowState::Error);
    assert_eq!(flow.error_message().as_deref(), Some("User rejected the request."));
    assert_eq!(
        drain_states(&mut rx),
        vec![FlowState::Idle, FlowState::Approving, FlowState::Error]
    );
    assert!(chain.payment_calls().is_empty());
}

#[tokio::test]
async fn reverted_approval_never_pays() {
    let reverted = H256::from_low_u64_be(1);
    let chain = Arc::new(
        MockChain::new(50_000_000, 0).fail_approval_confirmation(ChainError::Reverted(reverted)),
    );
    let flow = flow_for(&chain);

    let state = assert_ok!(flow.start_payment("alice", dec!(10), "").await);

    assert_eq!(state, FlowState::Error);
    assert_eq!(
        flow.error_message(),
        Some(ChainError::Reverted(reverted).to_string())
    );
    assert!(chain.payment_calls().is_empty());
}

#[tokio::test]
async fn blank_failures_fall_back_to_generic_messages() {
    let chain = Arc::new(MockChain::new(50_000_000, 0).fail_approve(ChainError::Unknown));
    let flow = flow_for(&chain);
    assert_ok!(flow.start_payment("alice", dec!(1), "").await);
    assert_eq!(flow.error_message().as_deref(), Some(APPROVAL_FAILED));

    let chain = Arc::new(MockChain::new(50_000_000, 50_000_000).fail_payment(ChainError::Rpc(String::new())));
    let flow = flow_for(&chain);
    assert_ok!(flow.start_payment("alice", dec!(1), "").await);
    assert_eq!(flow.error_message().as_deref(), Some(PAYMENT_FAILED));
}

#[tokio::test]
async fn failed_payment_confirmation_reaches_error_from_paying() {
    let chain = Arc::new(
        MockChain::new(50_000_000, 50_000_000)
            .fail_payment_confirmation(ChainError::Rpc("execution reverted: page inactive".into())),
    );
    let flow = flow_for(&chain);
    let mut rx = flow.transitions();

    assert_ok!(flow.start_payment("alice", dec!(5), "").await);

    assert_eq!(
        drain_states(&mut rx),
        vec![FlowState::Idle, FlowState::Paying, FlowState::Error]
    );
    assert_eq!(flow.error_message().as_deref(), Some("execution reverted: page inactive"));
}

#[tokio::test]
async fn failed_balance_read_surfaces_rpc_message() {
    let chain = Arc::new(
        MockChain::new(0, 0).fail_balance(ChainError::Rpc("connection refused".into())),
    );
    let flow = flow_for(&chain);

    assert_ok!(flow.start_payment("alice", dec!(5), "").await);

    assert_eq!(flow.state(), FlowState::Error);
    assert_eq!(flow.error_message().as_deref(), Some("connection refused"));
    assert!(chain.approve_calls().is_empty());
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_read() {
    let chain = Arc::new(MockChain::new(50_000_000, 0));
    let flow = flow_for(&chain);

    assert_eq!(
        assert_err!(flow.start_payment("  ", dec!(10), "").await),
        IntentError::EmptyHandle
    );
    assert_eq!(
        assert_err!(flow.start_payment("alice", dec!(-1), "").await),
        IntentError::NonPositiveAmount(dec!(-1))
    );
    assert!(chain.calls().is_empty());
    assert_eq!(flow.state(), FlowState::Idle);
}

#[tokio::test]
async fn allowance_is_reread_on_every_attempt() {
    let chain = Arc::new(MockChain::new(50_000_000, 20_000_000));
    let flow = flow_for(&chain);

    assert_eq!(
        assert_ok!(flow.start_payment("alice", dec!(10), "").await),
        FlowState::Success
    );
    assert!(chain.approve_calls().is_empty());

    // Revoked between attempts
    chain.set_allowance(0);
    assert_eq!(
        assert_ok!(flow.start_payment("alice", dec!(10), "").await),
        FlowState::Success
    );

    let allowance_reads = chain
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::ReadAllowance(..)))
        .count();
    assert_eq!(allowance_reads, 2);
    assert_eq!(chain.approve_calls().len(), 1);
    assert_eq!(chain.payment_calls().len(), 2);
}

#[tokio::test]
async fn retry_after_error_starts_from_scratch() {
    let chain = Arc::new(MockChain::new(5_000_000, 0));
    let flow = flow_for(&chain);

    assert_ok!(flow.start_payment("alice", dec!(10), "").await);
    assert_eq!(flow.state(), FlowState::Error);

    let state = assert_ok!(flow.start_payment("alice", dec!(2), "").await);
    assert_eq!(state, FlowState::Success);
    assert_eq!(flow.error_message(), None);
}

#[tokio::test]
async fn reset_clears_error_and_intent() {
    let chain = Arc::new(MockChain::new(5_000_000, 0));
    let flow = flow_for(&chain);

    assert_ok!(flow.start_payment("alice", dec!(10), "thanks").await);
    assert!(flow.status().intent.is_some());

    flow.reset();

    let status = flow.status();
    assert_eq!(status.state, FlowState::Idle);
    assert_eq!(status.error_message, None);
    assert_eq!(status.intent, None);
}

#[tokio::test]
async fn reset_from_success_and_idle() {
    let chain = Arc::new(MockChain::new(50_000_000, 50_000_000));
    let flow = flow_for(&chain);

    flow.reset();
    assert_eq!(flow.state(), FlowState::Idle);

    assert_ok!(flow.start_payment("alice", dec!(1), "").await);
    assert_eq!(flow.state(), FlowState::Success);
    flow.reset();
    assert_eq!(flow.state(), FlowState::Idle);
    assert_eq!(flow.status().payment_tx, None);
}

#[tokio::test]
async fn reset_while_approving_drops_the_payment() {
    let gate = Arc::new(Notify::new());
    let chain = Arc::new(MockChain::new(50_000_000, 0).gate_approvals(gate.clone()));
    let flow = flow_for(&chain);
    let mut status = flow.subscribe();

    let intent = assert_ok!(onclick_pay::models::PaymentIntent::new("alice", dec!(10), ""));
    let attempt = flow.spawn(intent);

    assert_ok!(status.wait_for(|s| s.approval_tx.is_some()).await);
    assert_eq!(flow.state(), FlowState::Approving);

    flow.reset();
    gate.notify_one();

    // Superseded attempts leave the flow where reset put it
    assert_eq!(assert_ok!(attempt.await), FlowState::Idle);
    assert_eq!(flow.state(), FlowState::Idle);
    assert!(chain.payment_calls().is_empty());
    assert_eq!(chain.approve_calls().len(), 1);
}

#[tokio::test]
async fn reset_while_paying_returns_to_idle() {
    let gate = Arc::new(Notify::new());
    let chain = Arc::new(MockChain::new(50_000_000, 50_000_000).gate_payments(gate.clone()));
    let flow = flow_for(&chain);
    let mut status = flow.subscribe();

    let intent = assert_ok!(onclick_pay::models::PaymentIntent::new("alice", dec!(10), ""));
    let attempt = flow.spawn(intent);

    assert_ok!(status.wait_for(|s| s.payment_tx.is_some()).await);
    assert_eq!(flow.state(), FlowState::Paying);

    flow.reset();
    assert_eq!(flow.state(), FlowState::Idle);
    gate.notify_one();

    // The submitted payment may still land; the flow stays where reset put it
    assert_eq!(assert_ok!(attempt.await), FlowState::Idle);
    let status = flow.status();
    assert_eq!(status.state, FlowState::Idle);
    assert_eq!(status.payment_tx, None);
    assert_eq!(chain.payment_calls().len(), 1);
}

#[tokio::test]
async fn newer_start_supersedes_running_attempt() {
    let gate = Arc::new(Notify::new());
    let chain = Arc::new(MockChain::new(50_000_000, 0).gate_approvals(gate.clone()));
    let flow = flow_for(&chain);
    let mut status = flow.subscribe();

    let intent = assert_ok!(onclick_pay::models::PaymentIntent::new("alice", dec!(10), ""));
    let first = flow.spawn(intent);
    assert_ok!(status.wait_for(|s| s.approval_tx.is_some()).await);

    chain.set_allowance(50_000_000);
    assert_eq!(
        assert_ok!(flow.start_payment("bob", dec!(3), "").await),
        FlowState::Success
    );
    gate.notify_one();

    // The replaced attempt does not report the newer attempt's outcome
    assert_eq!(assert_ok!(first.await), FlowState::Idle);
    assert_eq!(flow.state(), FlowState::Success);
    assert_eq!(
        chain.payment_calls(),
        vec![Call::Payment("bob".into(), usdc(3_000_000), "".into())]
    );
}

#[tokio::test]
async fn try_spawn_refuses_while_an_attempt_is_unsettled() {
    let chain = Arc::new(MockChain::new(50_000_000, 50_000_000));
    let flow = flow_for(&chain);

    let alice = assert_ok!(onclick_pay::models::PaymentIntent::new("alice", dec!(10), ""));
    let bob = assert_ok!(onclick_pay::models::PaymentIntent::new("bob", dec!(3), ""));

    let first = flow.try_spawn(alice.clone()).expect("flow is free");
    assert!(flow.try_spawn(bob.clone()).is_none());
    assert_eq!(flow.status().intent, Some(alice));

    assert_eq!(assert_ok!(first.await), FlowState::Success);
    let second = flow.try_spawn(bob).expect("settled flow is free");
    assert_eq!(assert_ok!(second.await), FlowState::Success);
    assert_eq!(chain.payment_calls().len(), 2);
}
