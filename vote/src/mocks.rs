//! Test doubles for the vote environment.
//!
//! Public so integration tests and the demo binary can script service
//! outcomes without a backend.

use crate::environment::{
    IdentityProvider, Notifier, ServiceFuture, ServiceResult, VoteReceipt, VoteService,
    VoteSubmission,
};
use crate::types::{Identity, Notice, TargetId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Identity provider with a fixed answer
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    identity: Option<Identity>,
}

impl StaticIdentity {
    /// Always signed in as `user_id`
    #[must_use]
    pub fn signed_in(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            identity: Some(Identity::new(user_id, token)),
        }
    }

    /// Always signed out
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { identity: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current(&self) -> Option<Identity> {
        self.identity.clone()
    }
}

/// Vote service answering from a queue of scripted outcomes
///
/// Once the queue is drained every call succeeds with a bare
/// acknowledgement. Every call is logged, retries included.
#[derive(Debug, Clone, Default)]
pub struct ScriptedVoteService {
    outcomes: Arc<Mutex<VecDeque<ServiceResult<VoteReceipt>>>>,
    calls: Arc<Mutex<Vec<VoteSubmission>>>,
    latency: Option<Duration>,
}

impl ScriptedVoteService {
    /// A service that acknowledges everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A service answering with `outcomes` in order
    #[must_use]
    pub fn with_outcomes(outcomes: impl IntoIterator<Item = ServiceResult<VoteReceipt>>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into_iter().collect())),
            ..Self::default()
        }
    }

    /// Wait `latency` before answering each call
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue another outcome
    pub fn push_outcome(&self, outcome: ServiceResult<VoteReceipt>) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Submissions received so far
    #[must_use]
    pub fn calls(&self) -> Vec<VoteSubmission> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of submissions received
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl VoteService for ScriptedVoteService {
    fn submit_vote(&self, submission: VoteSubmission) -> ServiceFuture<VoteReceipt> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(submission);

        let outcome = self
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(VoteReceipt::acknowledged()));
        let latency = self.latency;

        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            outcome
        })
    }
}

/// Notifier that keeps every notice it is given
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<(TargetId, Notice)>>>,
}

impl RecordingNotifier {
    /// An empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices delivered so far, oldest first
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, notice)| notice.clone())
            .collect()
    }

    /// Number of notices delivered
    #[must_use]
    pub fn count(&self) -> usize {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, target: &TargetId, notice: &Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((target.clone(), notice.clone()));
    }
}
