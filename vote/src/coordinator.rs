//! Optimistic vote coordination.
//!
//! The coordinator is a reducer over [`VoteView`]. A button press is applied
//! to the displayed tally immediately, then confirmed with the vote service
//! through an effect. The service outcome comes back as an action:
//! acceptance clears the pending submission, rejection restores the tally
//! captured before the press and raises a notice.
//!
//! Only one submission per view is in flight at a time. Presses arriving
//! while one is pending are ignored, which is what a disabled button does.

use crate::environment::{VoteEnvironment, VoteReceipt, VoteServiceError, VoteSubmission};
use crate::reducer::{VoteTransition, reduce};
use crate::types::{Notice, VoteAction, VoteSeed, VoteState};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tally_core::{SmallVec, async_effect, effect::Effect, reducer::Reducer, smallvec};
use tally_runtime::retry::retry_with_predicate;
use uuid::Uuid;

/// A submission the service has not answered yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightVote {
    /// Idempotency key sent with the submission
    pub request_id: Uuid,
    /// The button that was pressed
    pub action: VoteAction,
    /// Tally shown before the press, restored on rejection
    pub previous: VoteState,
    /// When the press happened
    pub started_at: DateTime<Utc>,
}

/// State of one rendered vote control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteView {
    /// Displayed counts and viewer vote (optimistic)
    pub tally: VoteState,
    /// Pending submission, if any
    pub in_flight: Option<InFlightVote>,
    /// Number of reseeds applied since mount
    pub generation: u64,
}

impl VoteView {
    /// View for a freshly rendered control
    #[must_use]
    pub fn from_seed(seed: VoteSeed) -> Self {
        Self {
            tally: seed.into(),
            in_flight: None,
            generation: 0,
        }
    }

    /// Whether a submission is awaiting the service
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Take the in-flight submission if it is the one `request_id` answers
    fn settle(&mut self, request_id: Uuid) -> Option<InFlightVote> {
        match self.in_flight {
            Some(in_flight) if in_flight.request_id == request_id => self.in_flight.take(),
            _ => None,
        }
    }
}

/// Inputs to the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorAction {
    /// The viewer pressed a vote button
    HandleVote {
        /// Which button
        action: VoteAction,
    },

    /// The service recorded a submission
    VoteAccepted {
        /// The submission answered
        request_id: Uuid,
        /// What the service reported
        receipt: VoteReceipt,
    },

    /// The service did not record a submission
    VoteRejected {
        /// The submission answered
        request_id: Uuid,
        /// Why
        error: VoteServiceError,
    },

    /// Authoritative data was reloaded
    ///
    /// Replaces the displayed tally. A submission still in flight is
    /// superseded and its eventual answer is ignored.
    Reseed {
        /// Fresh counts
        seed: VoteSeed,
    },
}

/// Reducer coordinating optimistic votes with the vote service
#[derive(Debug, Clone, Copy, Default)]
pub struct VoteCoordinator;

impl VoteCoordinator {
    /// Creates a new `VoteCoordinator`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn handle_vote(
        state: &mut VoteView,
        action: VoteAction,
        env: &VoteEnvironment,
    ) -> SmallVec<[Effect<CoordinatorAction>; 4]> {
        let Some(identity) = env.identity.current() else {
            tracing::debug!(target_id = %env.target_id, %action, "Vote blocked: not signed in");
            metrics::counter!("vote.login_required.total").increment(1);
            return smallvec![notify(env, Notice::LoginRequired)];
        };

        if let Some(in_flight) = state.in_flight {
            tracing::debug!(
                target_id = %env.target_id,
                %action,
                pending_request = %in_flight.request_id,
                "Vote ignored: submission already in flight"
            );
            metrics::counter!("vote.ignored.in_flight").increment(1);
            return SmallVec::new();
        }

        let previous = state.tally;
        let transition = VoteTransition::of(previous.current_user_vote, action);
        let request_id = env.ids.next_id();

        state.tally = reduce(previous, action);
        state.in_flight = Some(InFlightVote {
            request_id,
            action,
            previous,
            started_at: env.clock.now(),
        });

        tracing::debug!(
            target_id = %env.target_id,
            user_id = %identity.user_id,
            %action,
            transition = transition.as_str(),
            %request_id,
            likes = state.tally.likes,
            dislikes = state.tally.dislikes,
            "Applied optimistic vote"
        );
        metrics::counter!("vote.submissions.total", "transition" => transition.as_str())
            .increment(1);

        smallvec![submit(
            env,
            VoteSubmission {
                request_id,
                target_id: env.target_id.clone(),
                action,
                token: identity.token,
            },
        )]
    }
}

/// Effect delivering a notice
fn notify(env: &VoteEnvironment, notice: Notice) -> Effect<CoordinatorAction> {
    let notifier = Arc::clone(&env.notifier);
    let target_id = env.target_id.clone();

    async_effect! {
        notifier.notify(&target_id, &notice);
        None
    }
}

/// Effect submitting a vote, retrying transient failures
fn submit(env: &VoteEnvironment, submission: VoteSubmission) -> Effect<CoordinatorAction> {
    let service = Arc::clone(&env.service);
    let policy = env.retry_policy.clone();
    let timeout = env.submit_timeout;

    async_effect! {
        let request_id = submission.request_id;

        let result = retry_with_predicate(
            &policy,
            "submit_vote",
            || {
                let service = Arc::clone(&service);
                let submission = submission.clone();
                async move {
                    tokio::time::timeout(timeout, service.submit_vote(submission))
                        .await
                        .unwrap_or(Err(VoteServiceError::Timeout))
                }
            },
            VoteServiceError::is_transient,
        )
        .await;

        Some(match result {
            Ok(receipt) => CoordinatorAction::VoteAccepted { request_id, receipt },
            Err(error) => CoordinatorAction::VoteRejected { request_id, error },
        })
    }
}

impl Reducer for VoteCoordinator {
    type State = VoteView;
    type Action = CoordinatorAction;
    type Environment = VoteEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CoordinatorAction::HandleVote { action } => Self::handle_vote(state, action, env),

            CoordinatorAction::VoteAccepted {
                request_id,
                receipt,
            } => {
                let Some(in_flight) = state.settle(request_id) else {
                    tracing::debug!(%request_id, "Ignoring answer to superseded submission");
                    return SmallVec::new();
                };

                if let Some(authoritative) = receipt.authoritative {
                    if authoritative != state.tally {
                        tracing::debug!(
                            target_id = %env.target_id,
                            optimistic = ?state.tally,
                            ?authoritative,
                            "Adopting authoritative tally"
                        );
                    }
                    state.tally = authoritative;
                }

                let elapsed = env.clock.now() - in_flight.started_at;
                tracing::debug!(
                    target_id = %env.target_id,
                    %request_id,
                    elapsed_ms = elapsed.num_milliseconds(),
                    "Vote confirmed"
                );
                SmallVec::new()
            },

            CoordinatorAction::VoteRejected { request_id, error } => {
                let Some(in_flight) = state.settle(request_id) else {
                    tracing::debug!(%request_id, error = %error, "Ignoring failure of superseded submission");
                    return SmallVec::new();
                };

                state.tally = in_flight.previous;

                tracing::warn!(
                    target_id = %env.target_id,
                    %request_id,
                    action = %in_flight.action,
                    error = %error,
                    "Vote submission failed, restored previous tally"
                );
                metrics::counter!("vote.submissions.rejected").increment(1);
                metrics::counter!("vote.rollbacks.total").increment(1);

                smallvec![notify(
                    env,
                    Notice::SubmissionFailed {
                        reason: error.to_string(),
                    },
                )]
            },

            CoordinatorAction::Reseed { seed } => {
                if let Some(in_flight) = state.in_flight.take() {
                    tracing::debug!(
                        request_id = %in_flight.request_id,
                        "Reseed supersedes in-flight submission"
                    );
                }
                state.tally = seed.into();
                state.generation += 1;
                SmallVec::new()
            },
        }
    }
}
