//! The vote control a view renders.
//!
//! [`VoteWidget`] owns the [`Store`] running the coordinator for one target.
//! The view reads [`VoteDisplay`] snapshots and forwards button presses.
//! After [`VoteWidget::unmount`] the store is closed: presses are ignored
//! and answers to submissions still in flight are dropped.

use crate::coordinator::{CoordinatorAction, VoteCoordinator, VoteView};
use crate::environment::VoteEnvironment;
use crate::types::{UserVote, VoteAction, VoteSeed, VoteState};
use serde::Serialize;
use tally_runtime::{EffectHandle, Store};
use tokio::sync::broadcast;

type VoteStore = Store<VoteView, CoordinatorAction, VoteEnvironment, VoteCoordinator>;

/// What the control shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDisplay {
    /// Displayed like count
    pub likes: u64,
    /// Displayed dislike count
    pub dislikes: u64,
    /// Which button is highlighted
    pub current_user_vote: UserVote,
    /// `false` while a submission is pending
    pub controls_enabled: bool,
}

impl From<&VoteView> for VoteDisplay {
    fn from(view: &VoteView) -> Self {
        Self {
            likes: view.tally.likes,
            dislikes: view.tally.dislikes,
            current_user_vote: view.tally.current_user_vote,
            controls_enabled: !view.is_pending(),
        }
    }
}

/// A mounted like/dislike control
#[derive(Clone)]
pub struct VoteWidget {
    store: VoteStore,
}

impl VoteWidget {
    /// Mount a control showing `seed`
    #[must_use]
    pub fn mount(seed: VoteSeed, env: VoteEnvironment) -> Self {
        tracing::info!(
            target_id = %env.target_id,
            likes = seed.likes,
            dislikes = seed.dislikes,
            current_user_vote = ?seed.current_user_vote,
            "Mounted vote control"
        );

        Self {
            store: Store::new(VoteView::from_seed(seed), VoteCoordinator::new(), env),
        }
    }

    /// Forward a button press
    ///
    /// Returns a handle that completes once the submission and everything
    /// it triggers (rollback, notices) has finished. After unmount the press
    /// is ignored and an already completed handle is returned.
    pub async fn handle_vote(&self, action: VoteAction) -> EffectHandle {
        self.dispatch(CoordinatorAction::HandleVote { action }).await
    }

    /// Replace the displayed counts with freshly loaded ones
    pub async fn reseed(&self, seed: VoteSeed) -> EffectHandle {
        self.dispatch(CoordinatorAction::Reseed { seed }).await
    }

    async fn dispatch(&self, action: CoordinatorAction) -> EffectHandle {
        match self.store.send(action).await {
            Ok(handle) => handle,
            Err(error) => {
                tracing::debug!(%error, "Ignoring input to unmounted vote control");
                EffectHandle::completed()
            },
        }
    }

    /// Snapshot for rendering
    pub async fn display(&self) -> VoteDisplay {
        self.store.state(|view| VoteDisplay::from(view)).await
    }

    /// Displayed counts and viewer vote
    pub async fn tally(&self) -> VoteState {
        self.store.state(|view| view.tally).await
    }

    /// Full coordinator state
    pub async fn view(&self) -> VoteView {
        self.store.state(|view| *view).await
    }

    /// Service answers and other actions produced by effects
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorAction> {
        self.store.subscribe_actions()
    }

    /// Tear the control down
    ///
    /// Submissions already sent keep running, but their outcome no longer
    /// changes what was displayed.
    pub fn unmount(&self) {
        self.store.close();
    }

    /// Whether the control still accepts input
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !self.store.is_closed()
    }
}

impl std::fmt::Debug for VoteWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteWidget")
            .field("mounted", &self.is_mounted())
            .field("pending_effects", &self.store.pending_effects())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::InFlightVote;
    use tally_testing::test_clock;
    use uuid::Uuid;

    #[test]
    fn display_disables_controls_while_pending() {
        let mut view = VoteView::from_seed(VoteState::new(3, 1).into());
        assert!(VoteDisplay::from(&view).controls_enabled);

        view.in_flight = Some(InFlightVote {
            request_id: Uuid::nil(),
            action: VoteAction::Like,
            previous: view.tally,
            started_at: tally_core::environment::Clock::now(&test_clock()),
        });
        let display = VoteDisplay::from(&view);
        assert!(!display.controls_enabled);
        assert_eq!((display.likes, display.dislikes), (3, 1));
    }
}
