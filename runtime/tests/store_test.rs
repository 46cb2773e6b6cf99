//! Integration tests for the Store runtime
//!
//! Covers the action → reducer → effect → feedback loop, handle tracking,
//! action broadcast and close semantics.

use std::time::Duration;
use tally_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use tally_runtime::{Store, StoreError};

#[derive(Debug, Clone, Default)]
struct PingState {
    pings: u32,
    pongs: u32,
    log: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PingAction {
    /// Increment `pings`, answer with a `Pong` after `delay_ms`
    Ping { delay_ms: u64 },
    /// Fed back by the ping effect
    Pong,
    /// Two concurrent effects, each logging once
    Fanout,
    Log(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct PingReducer;

impl Reducer for PingReducer {
    type State = PingState;
    type Action = PingAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PingAction::Ping { delay_ms } => {
                state.pings += 1;
                smallvec![Effect::Future(Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    Some(PingAction::Pong)
                }))]
            },
            PingAction::Pong => {
                state.pongs += 1;
                SmallVec::new()
            },
            PingAction::Fanout => smallvec![
                Effect::Future(Box::pin(async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Some(PingAction::Log("slow"))
                })),
                Effect::Future(Box::pin(async { Some(PingAction::Log("fast")) })),
                Effect::None,
            ],
            PingAction::Log(entry) => {
                state.log.push(entry);
                SmallVec::new()
            },
        }
    }
}

fn store() -> Store<PingState, PingAction, (), PingReducer> {
    Store::new(PingState::default(), PingReducer, ())
}

#[tokio::test]
async fn reducer_changes_are_visible_before_effects_finish() {
    let store = store();

    let mut handle = store
        .send(PingAction::Ping { delay_ms: 50 })
        .await
        .unwrap_or_else(|e| unreachable!("store is open: {e}"));

    assert_eq!(store.state(|s| (s.pings, s.pongs)).await, (1, 0));
    assert_eq!(handle.pending(), 1);

    handle.wait().await;
    assert_eq!(store.state(|s| (s.pings, s.pongs)).await, (1, 1));
}

#[tokio::test]
async fn handle_covers_every_effect_of_one_send() {
    let store = store();

    let mut handle = store
        .send(PingAction::Fanout)
        .await
        .unwrap_or_else(|e| unreachable!("store is open: {e}"));
    assert_eq!(handle.pending(), 2);
    assert!(handle.wait_with_timeout(Duration::from_secs(1)).await.is_ok());

    assert_eq!(store.state(|s| s.log.clone()).await, vec!["fast", "slow"]);
}

#[tokio::test]
async fn feedback_actions_are_broadcast_after_reduction() {
    let store = store();
    let mut actions = store.subscribe_actions();

    let mut handle = store
        .send(PingAction::Ping { delay_ms: 1 })
        .await
        .unwrap_or_else(|e| unreachable!("store is open: {e}"));

    let received = tokio::time::timeout(Duration::from_secs(1), actions.recv()).await;
    assert!(matches!(received, Ok(Ok(PingAction::Pong))));
    assert_eq!(store.state(|s| s.pongs).await, 1);
    handle.wait().await;
}

#[tokio::test]
async fn wait_with_timeout_reports_slow_effects() {
    let store = store();

    let mut handle = store
        .send(PingAction::Ping { delay_ms: 500 })
        .await
        .unwrap_or_else(|e| unreachable!("store is open: {e}"));

    let result = handle.wait_with_timeout(Duration::from_millis(20)).await;
    assert_eq!(result, Err(StoreError::Timeout));
}

#[tokio::test]
async fn closed_store_rejects_actions() {
    let store = store();
    store.close();

    let result = store.send(PingAction::Pong).await;

    assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    assert_eq!(store.state(|s| s.pongs).await, 0);
}

#[tokio::test]
async fn feedback_after_close_is_dropped() {
    let store = store();

    let mut handle = store
        .send(PingAction::Ping { delay_ms: 30 })
        .await
        .unwrap_or_else(|e| unreachable!("store is open: {e}"));
    store.close();
    handle.wait().await;

    assert_eq!(store.state(|s| (s.pings, s.pongs)).await, (1, 0));
    assert_eq!(store.pending_effects(), 0);
}
