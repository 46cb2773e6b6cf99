//! Optimistic vote transitions.
//!
//! The rules are the same on both sides of the wire: the client applies
//! them to show a vote immediately, the in-memory service applies them to
//! its stored record.
//!
//! | current \ action | Like                | Dislike                |
//! |------------------|---------------------|------------------------|
//! | Unvoted          | new vote → Liked    | new vote → Disliked    |
//! | Liked            | undo → Unvoted      | switch → Disliked      |
//! | Disliked         | switch → Liked      | undo → Unvoted         |

use crate::types::{UserVote, VoteAction, VoteState};
use tally_core::{SmallVec, effect::Effect, reducer::Reducer};

/// How an action relates to the vote it is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// No prior vote
    NewVote,
    /// Same button pressed again
    Undo,
    /// The opposite button pressed
    Switch,
}

impl VoteTransition {
    /// Classify `action` against the viewer's `current` vote
    #[must_use]
    pub const fn of(current: UserVote, action: VoteAction) -> Self {
        match (current, action) {
            (UserVote::None, _) => Self::NewVote,
            (UserVote::Like, VoteAction::Like) | (UserVote::Dislike, VoteAction::Dislike) => {
                Self::Undo
            },
            (UserVote::Like, VoteAction::Dislike) | (UserVote::Dislike, VoteAction::Like) => {
                Self::Switch
            },
        }
    }

    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewVote => "new_vote",
            Self::Undo => "undo",
            Self::Switch => "switch",
        }
    }
}

/// Compute the state after the viewer presses `action`
///
/// Decrements clamp at zero, so a desynchronized state (a vote whose count
/// is already zero) never produces a negative count.
#[must_use]
pub fn reduce(state: VoteState, action: VoteAction) -> VoteState {
    let mut next = state;

    match VoteTransition::of(state.current_user_vote, action) {
        VoteTransition::NewVote => {
            increment(&mut next, action);
            next.current_user_vote = action.into();
        },
        VoteTransition::Undo => {
            decrement(&mut next, action);
            next.current_user_vote = UserVote::None;
        },
        VoteTransition::Switch => {
            increment(&mut next, action);
            decrement(&mut next, action.opposite());
            next.current_user_vote = action.into();
        },
    }

    next
}

fn increment(state: &mut VoteState, action: VoteAction) {
    let count = state.count_mut(action);
    *count = count.saturating_add(1);
}

fn decrement(state: &mut VoteState, action: VoteAction) {
    let count = state.count_mut(action);
    *count = count.saturating_sub(1);
}

impl VoteState {
    /// Method form of [`reduce`]
    #[must_use]
    pub fn apply(self, action: VoteAction) -> Self {
        reduce(self, action)
    }
}

/// [`reduce`] as a [`Reducer`], for use with a `Store` or `ReducerTest`
///
/// Knows nothing about who is voting and never produces effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoteReducer;

impl VoteReducer {
    /// Creates a new `VoteReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for VoteReducer {
    type State = VoteState;
    type Action = VoteAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        *state = reduce(*state, action);
        SmallVec::new()
    }
}
