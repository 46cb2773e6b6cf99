//! # Tally Vote
//!
//! Optimistic like/dislike voting built on the Tally reducer architecture.
//!
//! A vote control shows counts immediately when a button is pressed and
//! confirms with the vote service in the background. If the service does
//! not record the vote, the display reverts and the viewer is told.
//!
//! ## Layers
//!
//! - [`reducer`]: the pure toggle/switch rules over [`VoteState`]
//! - [`coordinator`]: identity check, optimistic apply, submission, rollback
//! - [`widget`]: the mounted control a view talks to
//! - [`service`]: an in-memory [`VoteService`] keeping one vote per user
//!
//! ## Example
//!
//! ```ignore
//! use tally_vote::{VoteAction, VoteEnvironment, VoteSeed, VoteWidget};
//!
//! let seed = VoteSeed::from_json(r#"{"likes":10,"dislikes":2,"currentUserVote":null}"#)?;
//! let widget = VoteWidget::mount(seed, env);
//!
//! let mut handle = widget.handle_vote(VoteAction::Like).await;
//! assert_eq!(widget.tally().await.likes, 11); // shown before the service answers
//! handle.wait().await;
//! ```

/// Environment variable configuration
pub mod config;

/// Optimistic submission and rollback
pub mod coordinator;

/// Injected collaborators and the service boundary
pub mod environment;

/// Test doubles for the environment
pub mod mocks;

/// Vote transition rules
pub mod reducer;

/// In-memory vote persistence
pub mod service;

/// Domain types
pub mod types;

/// The mounted vote control
pub mod widget;

pub use config::{ConfigError, VoteConfig};
pub use coordinator::{CoordinatorAction, InFlightVote, VoteCoordinator, VoteView};
pub use environment::{
    IdentityProvider, Notifier, TracingNotifier, VoteEnvironment, VoteReceipt, VoteService,
    VoteServiceError, VoteSubmission,
};
pub use reducer::{VoteReducer, VoteTransition, reduce};
pub use service::{InMemoryVoteService, VoteRecord};
pub use types::{
    Identity, Notice, SeedError, TargetId, UserId, UserVote, VoteAction, VoteSeed, VoteState,
};
pub use widget::{VoteDisplay, VoteWidget};
