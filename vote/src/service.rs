//! In-memory vote service.
//!
//! Stands in for the persistence backend in the demo binary and in tests.
//! Each user holds at most one vote per target. Counts are kept per target,
//! including votes seeded from outside (other users).
//!
//! Replays are recognised per user and target: only the last submission a
//! user applied to a target is remembered, so request ids issued by
//! different clients never collide.

use crate::environment::{ServiceFuture, VoteReceipt, VoteService, VoteServiceError, VoteSubmission};
use crate::reducer::reduce;
use crate::types::{TargetId, UserId, UserVote, VoteAction, VoteState};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tally_core::environment::{Clock, SystemClock};
use tokio::sync::Mutex;
use uuid::Uuid;

/// A user's stored vote on a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    /// What was voted on
    pub target_id: TargetId,
    /// Who voted
    pub user_id: UserId,
    /// The stored vote; unvoting deletes the record
    pub vote: VoteAction,
    /// Submission that last changed the record
    pub request_id: Uuid,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// The last submission a user applied to a target
#[derive(Debug, Clone, Copy)]
struct AppliedRequest {
    request_id: Uuid,
    action: VoteAction,
    receipt: VoteReceipt,
}

#[derive(Debug, Default)]
struct Ledger {
    tokens: HashMap<String, UserId>,
    records: HashMap<(TargetId, UserId), VoteRecord>,
    counts: HashMap<TargetId, (u64, u64)>,
    last_applied: HashMap<(TargetId, UserId), AppliedRequest>,
}

impl Ledger {
    fn tally(&self, target_id: &TargetId, user_id: &UserId) -> VoteState {
        let (likes, dislikes) = self.counts.get(target_id).copied().unwrap_or_default();
        let vote = self
            .records
            .get(&(target_id.clone(), user_id.clone()))
            .map_or(UserVote::None, |record| record.vote.into());
        VoteState::new(likes, dislikes).with_vote(vote)
    }
}

/// Vote service backed by process memory
#[derive(Clone)]
pub struct InMemoryVoteService {
    ledger: Arc<Mutex<Ledger>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryVoteService {
    /// Create an empty service using the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty service stamping records with `clock`
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(Ledger::default())),
            clock,
        }
    }

    /// Accept `token` as a credential for `user_id`
    pub async fn register_token(&self, token: impl Into<String>, user_id: impl Into<UserId>) {
        self.ledger
            .lock()
            .await
            .tokens
            .insert(token.into(), user_id.into());
    }

    /// Preload counts cast by users this service has no records for
    pub async fn seed_target(&self, target_id: &TargetId, likes: u64, dislikes: u64) {
        self.ledger
            .lock()
            .await
            .counts
            .insert(target_id.clone(), (likes, dislikes));
    }

    /// Current counts on `target_id` and `user_id`'s vote
    pub async fn tally_for(&self, target_id: &TargetId, user_id: &UserId) -> VoteState {
        self.ledger.lock().await.tally(target_id, user_id)
    }

    /// The stored record for a user, if they have voted
    pub async fn record(&self, target_id: &TargetId, user_id: &UserId) -> Option<VoteRecord> {
        self.ledger
            .lock()
            .await
            .records
            .get(&(target_id.clone(), user_id.clone()))
            .cloned()
    }

    async fn apply(&self, submission: VoteSubmission) -> Result<VoteReceipt, VoteServiceError> {
        let mut ledger = self.ledger.lock().await;

        let user_id = ledger
            .tokens
            .get(&submission.token)
            .cloned()
            .ok_or(VoteServiceError::Unauthorized)?;

        let target_id = submission.target_id;
        let key = (target_id.clone(), user_id.clone());

        let replayed = ledger
            .last_applied
            .get(&key)
            .copied()
            .filter(|applied| applied.request_id == submission.request_id);

        if let Some(applied) = replayed {
            if applied.action != submission.action {
                tracing::warn!(
                    %target_id,
                    %user_id,
                    request_id = %submission.request_id,
                    "Request id reused for a different vote"
                );
                return Err(VoteServiceError::Rejected {
                    reason: "request id already used for a different vote".to_string(),
                });
            }
            tracing::debug!(
                request_id = %submission.request_id,
                "Replayed submission, returning original receipt"
            );
            return Ok(applied.receipt);
        }

        let before = ledger.tally(&target_id, &user_id);
        let after = reduce(before, submission.action);

        ledger
            .counts
            .insert(target_id.clone(), (after.likes, after.dislikes));

        match after.current_user_vote.as_action() {
            Some(vote) => {
                ledger.records.insert(
                    key.clone(),
                    VoteRecord {
                        target_id: target_id.clone(),
                        user_id: user_id.clone(),
                        vote,
                        request_id: submission.request_id,
                        updated_at: self.clock.now(),
                    },
                );
            },
            None => {
                ledger.records.remove(&key);
            },
        }

        let receipt = VoteReceipt::with_tally(after);
        ledger.last_applied.insert(
            key,
            AppliedRequest {
                request_id: submission.request_id,
                action: submission.action,
                receipt,
            },
        );

        tracing::debug!(
            %target_id,
            %user_id,
            action = %submission.action,
            likes = after.likes,
            dislikes = after.dislikes,
            "Recorded vote"
        );

        Ok(receipt)
    }
}

impl Default for InMemoryVoteService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVoteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVoteService").finish_non_exhaustive()
    }
}

impl VoteService for InMemoryVoteService {
    fn submit_vote(&self, submission: VoteSubmission) -> ServiceFuture<VoteReceipt> {
        let service = self.clone();
        Box::pin(async move { service.apply(submission).await })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tally_testing::test_clock;

    const TOKEN: &str = "token-1";

    async fn service() -> (InMemoryVoteService, TargetId) {
        let service = InMemoryVoteService::with_clock(Arc::new(test_clock()));
        let target = TargetId::new("anime-42");
        service.register_token(TOKEN, "user-1").await;
        service.seed_target(&target, 10, 2).await;
        (service, target)
    }

    fn submission(n: u64, target: &TargetId, action: VoteAction) -> VoteSubmission {
        VoteSubmission {
            request_id: Uuid::from_u64_pair(0, n),
            target_id: target.clone(),
            action,
            token: TOKEN.to_string(),
        }
    }

    #[tokio::test]
    async fn like_then_switch_then_undo() {
        let (service, target) = service().await;
        let user = UserId::new("user-1");

        let liked = service
            .submit_vote(submission(1, &target, VoteAction::Like))
            .await
            .unwrap();
        assert_eq!(
            liked.authoritative,
            Some(VoteState::new(11, 2).with_vote(UserVote::Like))
        );

        service
            .submit_vote(submission(2, &target, VoteAction::Dislike))
            .await
            .unwrap();
        let record = service.record(&target, &user).await.unwrap();
        assert_eq!(record.vote, VoteAction::Dislike);
        assert_eq!(record.request_id, Uuid::from_u64_pair(0, 2));
        assert_eq!(record.updated_at, test_clock().now());

        service
            .submit_vote(submission(3, &target, VoteAction::Dislike))
            .await
            .unwrap();
        assert_eq!(service.record(&target, &user).await, None);
        assert_eq!(service.tally_for(&target, &user).await, VoteState::new(10, 2));
    }

    #[tokio::test]
    async fn replayed_request_is_applied_once() {
        let (service, target) = service().await;

        let first = service
            .submit_vote(submission(7, &target, VoteAction::Like))
            .await
            .unwrap();
        let replay = service
            .submit_vote(submission(7, &target, VoteAction::Like))
            .await
            .unwrap();

        assert_eq!(first, replay);
        assert_eq!(
            service.tally_for(&target, &UserId::new("user-1")).await,
            VoteState::new(11, 2).with_vote(UserVote::Like)
        );
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let (service, target) = service().await;
        let mut anonymous = submission(1, &target, VoteAction::Like);
        anonymous.token = "forged".to_string();

        let result = service.submit_vote(anonymous).await;

        assert_eq!(result, Err(VoteServiceError::Unauthorized));
        assert_eq!(
            service.tally_for(&target, &UserId::new("user-1")).await,
            VoteState::new(10, 2)
        );
    }

    #[tokio::test]
    async fn users_vote_independently() {
        let (service, target) = service().await;
        service.register_token("token-2", "user-2").await;

        service
            .submit_vote(submission(1, &target, VoteAction::Like))
            .await
            .unwrap();
        let mut other = submission(2, &target, VoteAction::Like);
        other.token = "token-2".to_string();
        let receipt = service.submit_vote(other).await.unwrap();

        assert_eq!(
            receipt.authoritative,
            Some(VoteState::new(12, 2).with_vote(UserVote::Like))
        );
    }

    #[tokio::test]
    async fn same_request_id_from_another_user_is_a_new_vote() {
        let (service, target) = service().await;
        service.register_token("token-2", "user-2").await;

        service
            .submit_vote(submission(1, &target, VoteAction::Like))
            .await
            .unwrap();
        // Each client numbers its own requests, so ids repeat across users
        let mut other = submission(1, &target, VoteAction::Dislike);
        other.token = "token-2".to_string();
        let receipt = service.submit_vote(other).await.unwrap();

        assert_eq!(
            receipt.authoritative,
            Some(VoteState::new(11, 3).with_vote(UserVote::Dislike))
        );
        assert_eq!(
            service.tally_for(&target, &UserId::new("user-1")).await,
            VoteState::new(11, 3).with_vote(UserVote::Like)
        );
        assert_eq!(
            service.record(&target, &UserId::new("user-2")).await.unwrap().vote,
            VoteAction::Dislike
        );
    }

    #[tokio::test]
    async fn same_request_id_on_another_target_is_a_new_vote() {
        let (service, target) = service().await;
        let episode = TargetId::new("episode-7");

        service
            .submit_vote(submission(1, &target, VoteAction::Like))
            .await
            .unwrap();
        let receipt = service
            .submit_vote(submission(1, &episode, VoteAction::Like))
            .await
            .unwrap();

        assert_eq!(
            receipt.authoritative,
            Some(VoteState::new(1, 0).with_vote(UserVote::Like))
        );
    }

    #[tokio::test]
    async fn reused_request_id_with_a_different_vote_is_rejected() {
        let (service, target) = service().await;

        service
            .submit_vote(submission(4, &target, VoteAction::Like))
            .await
            .unwrap();
        let result = service
            .submit_vote(submission(4, &target, VoteAction::Dislike))
            .await;

        assert!(matches!(result, Err(VoteServiceError::Rejected { .. })));
        assert_eq!(
            service.tally_for(&target, &UserId::new("user-1")).await,
            VoteState::new(11, 2).with_vote(UserVote::Like)
        );
    }

    #[tokio::test]
    async fn replay_memory_holds_one_entry_per_user_and_target() {
        let (service, target) = service().await;

        for n in 1..=5 {
            service
                .submit_vote(submission(n, &target, VoteAction::Like))
                .await
                .unwrap();
        }

        assert_eq!(service.ledger.lock().await.last_applied.len(), 1);
        // Five toggles end liked
        assert_eq!(
            service.tally_for(&target, &UserId::new("user-1")).await,
            VoteState::new(11, 2).with_vote(UserVote::Like)
        );
    }
}
