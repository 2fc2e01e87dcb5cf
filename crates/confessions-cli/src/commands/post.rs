use crate::cli::SessionArgs;
use crate::commands::common::{open_session, resolve_confession_text};
use crate::error::CliError;

pub async fn run_post(content_parts: &[String], args: &SessionArgs) -> Result<(), CliError> {
    let text = resolve_confession_text(content_parts)?;

    let session = open_session(args).await?;
    let confession = session.post(&text).await?;

    println!("{}", confession.id);
    Ok(())
}
