use confessions_core::{ConfessionId, FeedSnapshot, LikeState, ToggleOutcome};

use crate::cli::SessionArgs;
use crate::commands::common::{open_session, parse_confession_id};
use crate::error::CliError;

pub async fn run_like(id: &str, args: &SessionArgs) -> Result<(), CliError> {
    let id = parse_confession_id(id)?;

    let session = open_session(args).await?;
    let outcome = session.toggle_like(id).await?;

    println!("{}", describe_toggle(id, outcome, &session.snapshot().await));
    Ok(())
}

pub fn describe_toggle(id: ConfessionId, outcome: ToggleOutcome, snapshot: &FeedSnapshot) -> String {
    let count = snapshot.get(id).map_or(0, |confession| confession.like_count);
    let likes = if count == 1 { "like" } else { "likes" };

    match outcome {
        ToggleOutcome::Applied(LikeState::Liked) => {
            format!("Liked confession {id} ({count} {likes})")
        }
        ToggleOutcome::Applied(LikeState::Unliked) => {
            format!("Removed like from confession {id} ({count} {likes})")
        }
        ToggleOutcome::InFlight => format!("A like on confession {id} is still pending"),
        ToggleOutcome::NotFound => format!("Confession {id} not found"),
    }
}
