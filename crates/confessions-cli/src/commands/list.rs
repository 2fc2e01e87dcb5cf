use confessions_core::util::unix_millis_now;

use crate::cli::SessionArgs;
use crate::commands::common::{
    confession_to_list_item, format_confession_count, format_confession_lines, open_session,
    ConfessionListItem,
};
use crate::error::CliError;

pub async fn run_list(limit: usize, as_json: bool, args: &SessionArgs) -> Result<(), CliError> {
    let session = open_session(args).await?;
    let snapshot = session.snapshot().await;
    let now_ms = unix_millis_now();

    if as_json {
        let json_items = snapshot
            .confessions
            .iter()
            .take(limit)
            .map(|confession| {
                confession_to_list_item(confession, snapshot.is_liked(confession.id), now_ms)
            })
            .collect::<Vec<ConfessionListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if snapshot.confessions.is_empty() {
        println!("No confessions yet. Be the first to share!");
    } else {
        println!("{}", format_confession_count(snapshot.confessions.len()));
        for line in format_confession_lines(&snapshot, limit, now_ms) {
            println!("{line}");
        }
    }

    Ok(())
}
