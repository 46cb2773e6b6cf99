//! Vote control demo binary
//!
//! Walks one viewer through like, switch and undo against the in-memory
//! service, then shows the signed-out and failing-service paths.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tally_vote::mocks::{ScriptedVoteService, StaticIdentity};
use tally_vote::{
    InMemoryVoteService, TargetId, TracingNotifier, UserId, VoteAction, VoteConfig,
    VoteEnvironment, VoteSeed, VoteServiceError, VoteWidget,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const WAIT: Duration = Duration::from_secs(10);

async fn press(widget: &VoteWidget, action: VoteAction) -> anyhow::Result<()> {
    println!("\n>>> Pressing: {action}");
    let mut handle = widget.handle_vote(action).await;

    let shown = widget.display().await;
    println!(
        "Shown immediately: {} likes, {} dislikes, vote {:?}, controls enabled: {}",
        shown.likes, shown.dislikes, shown.current_user_vote, shown.controls_enabled
    );

    handle
        .wait_with_timeout(WAIT)
        .await
        .context("vote submission did not settle")?;

    let settled = widget.display().await;
    println!(
        "After service answered: {} likes, {} dislikes, vote {:?}",
        settled.likes, settled.dislikes, settled.current_user_vote
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = VoteConfig::from_env();
    config.validate().context("invalid vote configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Vote Control Demo ===");

    let target = TargetId::new("anime-42");
    let seed = VoteSeed::from_json(r#"{"likes":10,"dislikes":2,"currentUserVote":null}"#)?;

    // Signed-in viewer against the in-memory service
    let service = InMemoryVoteService::new();
    service.register_token("token-1", "user-1").await;
    service.seed_target(&target, seed.likes, seed.dislikes).await;

    let env = VoteEnvironment::new(
        target.clone(),
        Arc::new(service.clone()),
        Arc::new(StaticIdentity::signed_in("user-1", "token-1")),
        Arc::new(TracingNotifier),
    )
    .with_config(&config);

    let widget = VoteWidget::mount(seed, env.clone());
    for action in [VoteAction::Like, VoteAction::Dislike, VoteAction::Dislike] {
        press(&widget, action).await?;
    }
    widget.unmount();

    let stored = service.tally_for(&target, &UserId::new("user-1")).await;
    println!("\nService tally: {} likes, {} dislikes", stored.likes, stored.dislikes);

    // Signed-out viewer
    println!("\n--- Signed out ---");
    let anonymous = VoteWidget::mount(
        seed,
        VoteEnvironment {
            identity: Arc::new(StaticIdentity::anonymous()),
            ..env.clone()
        },
    );
    press(&anonymous, VoteAction::Like).await?;

    // Service refuses the vote
    println!("\n--- Service rejects ---");
    let failing = ScriptedVoteService::with_outcomes([Err(VoteServiceError::Rejected {
        reason: "voting is closed for this title".to_string(),
    })]);
    let rejected = VoteWidget::mount(
        seed,
        VoteEnvironment {
            service: Arc::new(failing),
            ..env
        },
    );
    press(&rejected, VoteAction::Like).await?;

    println!("\n=== Demo Complete ===");
    Ok(())
}
