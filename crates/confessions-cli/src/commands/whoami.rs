use serde::Serialize;

use confessions_core::Identity;

use crate::cli::SessionArgs;
use crate::commands::common::open_session;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct WhoamiItem<'a> {
    pub backend: &'static str,
    pub identity: &'a Identity,
}

pub async fn run_whoami(as_json: bool, args: &SessionArgs) -> Result<(), CliError> {
    let session = open_session(args).await?;
    let item = WhoamiItem {
        backend: session.store().label(),
        identity: session.identity(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("{} ({} store)", item.identity, item.backend);
    }
    Ok(())
}
