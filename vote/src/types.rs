//! Domain types for optimistic voting.
//!
//! A voteable target (an anime, an episode, a comment) carries a like count,
//! a dislike count, and the current viewer's own vote. The client holds a
//! derived copy of those numbers; the server keeps the authoritative ones.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the user asked for when pressing a vote button
///
/// There is no "remove" action: pressing the button matching the current
/// vote again removes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    /// Thumbs up
    Like,
    /// Thumbs down
    Dislike,
}

impl VoteAction {
    /// Wire name (`"like"` / `"dislike"`)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }

    /// The other button
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Like => Self::Dislike,
            Self::Dislike => Self::Like,
        }
    }
}

impl std::fmt::Display for VoteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The viewer's current vote on a target
///
/// Serialized as `"like"`, `"dislike"` or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<VoteAction>", into = "Option<VoteAction>")]
pub enum UserVote {
    /// Not voted (`Unvoted`)
    #[default]
    None,
    /// Liked
    Like,
    /// Disliked
    Dislike,
}

impl UserVote {
    /// The action this vote corresponds to, if any
    #[must_use]
    pub const fn as_action(self) -> Option<VoteAction> {
        match self {
            Self::None => None,
            Self::Like => Some(VoteAction::Like),
            Self::Dislike => Some(VoteAction::Dislike),
        }
    }

    /// Whether the viewer has no vote on the target
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<VoteAction> for UserVote {
    fn from(action: VoteAction) -> Self {
        match action {
            VoteAction::Like => Self::Like,
            VoteAction::Dislike => Self::Dislike,
        }
    }
}

impl From<Option<VoteAction>> for UserVote {
    fn from(action: Option<VoteAction>) -> Self {
        action.map_or(Self::None, Self::from)
    }
}

impl From<UserVote> for Option<VoteAction> {
    fn from(vote: UserVote) -> Self {
        vote.as_action()
    }
}

/// Counts and the viewer's vote for one target
///
/// Counts are unsigned; every decrement saturates at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteState {
    /// Number of likes
    pub likes: u64,
    /// Number of dislikes
    pub dislikes: u64,
    /// What the current viewer has voted
    pub current_user_vote: UserVote,
}

impl VoteState {
    /// Counts with no vote from the viewer
    #[must_use]
    pub const fn new(likes: u64, dislikes: u64) -> Self {
        Self {
            likes,
            dislikes,
            current_user_vote: UserVote::None,
        }
    }

    /// Same counts, different viewer vote
    #[must_use]
    pub const fn with_vote(mut self, vote: UserVote) -> Self {
        self.current_user_vote = vote;
        self
    }

    /// The count an action adds to
    #[must_use]
    pub const fn count(&self, action: VoteAction) -> u64 {
        match action {
            VoteAction::Like => self.likes,
            VoteAction::Dislike => self.dislikes,
        }
    }

    pub(crate) const fn count_mut(&mut self, action: VoteAction) -> &mut u64 {
        match action {
            VoteAction::Like => &mut self.likes,
            VoteAction::Dislike => &mut self.dislikes,
        }
    }
}

/// Errors from parsing a render-time seed
#[derive(Debug, Error)]
pub enum SeedError {
    /// Not valid seed JSON (missing field, negative count, unknown vote)
    #[error("invalid vote seed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The viewer's vote is not reflected in the counts
    #[error("seed marks the viewer as having voted {vote} but the {vote} count is zero")]
    VoteNotCounted {
        /// The vote with a zero count
        vote: VoteAction,
    },
}

/// Initial counts supplied when a vote control is rendered
///
/// ```json
/// { "likes": 10, "dislikes": 2, "currentUserVote": "like" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSeed {
    /// Number of likes
    pub likes: u64,
    /// Number of dislikes
    pub dislikes: u64,
    /// The viewer's stored vote, `null` when unvoted
    #[serde(default)]
    pub current_user_vote: UserVote,
}

impl VoteSeed {
    /// Parse and validate a seed payload
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Malformed`] for invalid JSON and
    /// [`SeedError::VoteNotCounted`] when the viewer's vote has a zero count.
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        let seed: Self = serde_json::from_str(json)?;
        seed.validate()?;
        Ok(seed)
    }

    /// Check that the viewer's vote is part of the counts
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::VoteNotCounted`] when it is not.
    pub fn validate(&self) -> Result<(), SeedError> {
        match self.current_user_vote.as_action() {
            Some(vote) if VoteState::from(*self).count(vote) == 0 => {
                Err(SeedError::VoteNotCounted { vote })
            },
            _ => Ok(()),
        }
    }
}

impl From<VoteSeed> for VoteState {
    fn from(seed: VoteSeed) -> Self {
        Self {
            likes: seed.likes,
            dislikes: seed.dislikes,
            current_user_vote: seed.current_user_vote,
        }
    }
}

impl From<VoteState> for VoteSeed {
    fn from(state: VoteState) -> Self {
        Self {
            likes: state.likes,
            dislikes: state.dislikes,
            current_user_vote: state.current_user_vote,
        }
    }
}

/// Identifier of a voteable entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(String);

impl TargetId {
    /// Wrap an identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap an identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The signed-in viewer, as handed to the coordinator
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// Who is voting
    pub user_id: UserId,
    /// Bearer token the vote service authenticates
    pub token: String,
}

impl Identity {
    /// Build an identity
    #[must_use]
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// User-facing notification raised by the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// A vote was attempted while signed out
    LoginRequired,
    /// The service did not accept a vote; the display was restored
    SubmissionFailed {
        /// Why the submission failed
        reason: String,
    },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoginRequired => f.write_str("Sign in to vote"),
            Self::SubmissionFailed { reason } => write!(f, "Your vote was not saved: {reason}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn seed_parses_null_vote() {
        let seed = VoteSeed::from_json(r#"{"likes":10,"dislikes":2,"currentUserVote":null}"#).unwrap();
        assert_eq!(VoteState::from(seed), VoteState::new(10, 2));
    }

    #[test]
    fn seed_parses_stored_vote() {
        let seed =
            VoteSeed::from_json(r#"{"likes":3,"dislikes":0,"currentUserVote":"like"}"#).unwrap();
        assert_eq!(seed.current_user_vote, UserVote::Like);
    }

    #[test]
    fn seed_without_vote_field_is_unvoted() {
        let seed = VoteSeed::from_json(r#"{"likes":1,"dislikes":1}"#).unwrap();
        assert!(seed.current_user_vote.is_none());
    }

    #[test]
    fn seed_rejects_negative_counts() {
        let result = VoteSeed::from_json(r#"{"likes":-1,"dislikes":0,"currentUserVote":null}"#);
        assert!(matches!(result, Err(SeedError::Malformed(_))));
    }

    #[test]
    fn seed_rejects_unknown_vote_kind() {
        let result = VoteSeed::from_json(r#"{"likes":1,"dislikes":0,"currentUserVote":"love"}"#);
        assert!(matches!(result, Err(SeedError::Malformed(_))));
    }

    #[test]
    fn seed_rejects_uncounted_vote() {
        let result =
            VoteSeed::from_json(r#"{"likes":4,"dislikes":0,"currentUserVote":"dislike"}"#);
        assert!(matches!(
            result,
            Err(SeedError::VoteNotCounted {
                vote: VoteAction::Dislike
            })
        ));
    }

    #[test]
    fn state_serializes_like_a_seed() {
        let state = VoteState::new(11, 2).with_vote(UserVote::Like);
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"likes":11,"dislikes":2,"currentUserVote":"like"}"#);
    }

    #[test]
    fn identity_debug_hides_token() {
        let identity = Identity::new("user-1", "secret-token");
        let debug = format!("{identity:?}");
        assert!(debug.contains("user-1"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn notice_messages() {
        assert_eq!(Notice::LoginRequired.to_string(), "Sign in to vote");
        let failed = Notice::SubmissionFailed {
            reason: "Gateway timeout".to_string(),
        };
        assert_eq!(failed.to_string(), "Your vote was not saved: Gateway timeout");
    }
}
