//! Collaborators injected into the vote coordinator.
//!
//! The coordinator never reaches for ambient state: who is signed in, where
//! votes are persisted and how the user is told about problems all arrive
//! through [`VoteEnvironment`].

use crate::config::VoteConfig;
use crate::types::{Identity, Notice, TargetId, VoteAction, VoteState};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tally_core::environment::{Clock, IdGenerator, SystemClock, UuidGenerator};
use tally_runtime::retry::RetryPolicy;
use thiserror::Error;
use uuid::Uuid;

/// Vote service result
pub type ServiceResult<T> = Result<T, VoteServiceError>;

/// Boxed future returned by [`VoteService`] calls
pub type ServiceFuture<T> = Pin<Box<dyn Future<Output = ServiceResult<T>> + Send>>;

/// Why the vote service did not record a vote
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteServiceError {
    /// The caller token was missing, expired or unknown
    #[error("not signed in")]
    Unauthorized,

    /// The service refused the vote
    #[error("vote rejected: {reason}")]
    Rejected {
        /// Reason reported by the service
        reason: String,
    },

    /// The request did not reach the service or the response was lost
    #[error("network error: {0}")]
    Network(String),

    /// No response within the submit timeout
    #[error("vote service timed out")]
    Timeout,
}

impl VoteServiceError {
    /// Whether resubmitting the same request may succeed
    ///
    /// Only failures where the service may never have seen the request are
    /// transient. Submissions carry a request id, so the service ignores
    /// a replay of a request it already applied.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout)
    }
}

/// One vote sent to the service
#[derive(Clone, PartialEq, Eq)]
pub struct VoteSubmission {
    /// Idempotency key, identical across retries of the same press
    pub request_id: Uuid,
    /// What is being voted on
    pub target_id: TargetId,
    /// The button pressed
    pub action: VoteAction,
    /// Caller token from the viewer's [`Identity`]
    pub token: String,
}

impl std::fmt::Debug for VoteSubmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteSubmission")
            .field("request_id", &self.request_id)
            .field("target_id", &self.target_id)
            .field("action", &self.action)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Acknowledgement of a recorded vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteReceipt {
    /// Server-side counts and viewer vote after applying the submission,
    /// when the service reports them
    pub authoritative: Option<VoteState>,
}

impl VoteReceipt {
    /// A bare success with no counts attached
    #[must_use]
    pub const fn acknowledged() -> Self {
        Self {
            authoritative: None,
        }
    }

    /// A success carrying the authoritative tally
    #[must_use]
    pub const fn with_tally(tally: VoteState) -> Self {
        Self {
            authoritative: Some(tally),
        }
    }
}

/// Persistence boundary for votes
///
/// Implementations must keep at most one effective vote per user and target,
/// and must treat a repeated `request_id` as the same submission.
pub trait VoteService: Send + Sync {
    /// Record the viewer's button press
    ///
    /// # Errors
    ///
    /// Returns a [`VoteServiceError`] when the vote was not recorded.
    fn submit_vote(&self, submission: VoteSubmission) -> ServiceFuture<VoteReceipt>;
}

/// Source of the signed-in viewer
pub trait IdentityProvider: Send + Sync {
    /// The current viewer, `None` when signed out
    fn current(&self) -> Option<Identity>;
}

/// Channel for user-facing notices (toasts, banners)
pub trait Notifier: Send + Sync {
    /// Show `notice` for the vote control on `target`
    fn notify(&self, target: &TargetId, notice: &Notice);
}

/// Notifier that writes notices to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, target: &TargetId, notice: &Notice) {
        tracing::info!(target_id = %target, notice = %notice, "Vote notice");
    }
}

/// Everything the coordinator needs for one vote control
#[derive(Clone)]
pub struct VoteEnvironment {
    /// The entity this control votes on
    pub target_id: TargetId,
    /// Where votes are persisted
    pub service: Arc<dyn VoteService>,
    /// Who is signed in
    pub identity: Arc<dyn IdentityProvider>,
    /// Where notices go
    pub notifier: Arc<dyn Notifier>,
    /// Timestamps for in-flight submissions
    pub clock: Arc<dyn Clock>,
    /// Request ids for submissions
    pub ids: Arc<dyn IdGenerator>,
    /// Retries for transient submission failures
    pub retry_policy: RetryPolicy,
    /// Per-attempt deadline for the service call
    pub submit_timeout: Duration,
}

impl VoteEnvironment {
    /// Default per-attempt submit timeout
    pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create an environment with the system clock, random request ids,
    /// the default retry policy and a 5 second submit timeout
    #[must_use]
    pub fn new(
        target_id: TargetId,
        service: Arc<dyn VoteService>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            target_id,
            service,
            identity,
            notifier,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
            retry_policy: RetryPolicy::default(),
            submit_timeout: Self::DEFAULT_SUBMIT_TIMEOUT,
        }
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the request id generator
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Replace the submit timeout
    #[must_use]
    pub const fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    /// Apply retry and timeout settings from configuration
    #[must_use]
    pub fn with_config(self, config: &VoteConfig) -> Self {
        self.with_retry_policy(config.retry_policy())
            .with_submit_timeout(config.submit_timeout())
    }
}

impl std::fmt::Debug for VoteEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteEnvironment")
            .field("target_id", &self.target_id)
            .field("retry_policy", &self.retry_policy)
            .field("submit_timeout", &self.submit_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_delivery_failures_are_transient() {
        assert!(VoteServiceError::Timeout.is_transient());
        assert!(VoteServiceError::Network("reset".to_string()).is_transient());
        assert!(!VoteServiceError::Unauthorized.is_transient());
        assert!(
            !VoteServiceError::Rejected {
                reason: "locked".to_string()
            }
            .is_transient()
        );
    }

    #[test]
    fn submission_debug_hides_token() {
        let submission = VoteSubmission {
            request_id: Uuid::nil(),
            target_id: TargetId::new("episode-7"),
            action: VoteAction::Like,
            token: "secret".to_string(),
        };
        assert!(!format!("{submission:?}").contains("secret"));
    }
}
