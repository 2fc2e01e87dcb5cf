use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use confessions_core::db::{Database, LibSqlConfessionStore, LibSqlKeyValueStore};
use confessions_core::identity::{FileHostProbe, IdentityResolver, PollingHost};
use confessions_core::store::SupabaseStore;
use confessions_core::util::normalize_text_option;
use confessions_core::{
    Backend, ClientConfig, Confession, ConfessionId, ConfessionService, FeedSnapshot,
};
use serde::Serialize;

use crate::cli::SessionArgs;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// A started session over whichever backend the profile selects.
pub type Session = ConfessionService<Backend>;

#[derive(Debug, Serialize)]
pub struct ConfessionListItem {
    pub id: ConfessionId,
    pub preview: String,
    pub text: String,
    pub like_count: u32,
    pub liked: bool,
    pub created_at: i64,
    pub relative_time: String,
}

/// Load the profile, resolve the identity and load the first feed page.
pub async fn open_session(args: &SessionArgs) -> Result<Session, CliError> {
    let profiles = CliProfilesConfig::load()?;
    let profile_name = profiles.resolve_profile_name(args.profile.as_deref());
    let config = client_config_from(args, profiles.profile(&profile_name))?;
    let db_path = resolve_db_path(args.db_path.clone());
    open_session_with(&db_path, &config).await
}

pub async fn open_session_with(db_path: &Path, config: &ClientConfig) -> Result<Session, CliError> {
    let db = Arc::new(Database::open(db_path).await?);

    let backend = match config.supabase()? {
        Some((url, anon_key)) => Backend::Hosted(SupabaseStore::new(url, anon_key)?),
        None => Backend::Local(LibSqlConfessionStore::new(Arc::clone(&db))),
    };

    let host = config.host_context_path.as_ref().map(|path| {
        let probe = FileHostProbe::new(path.clone());
        tracing::debug!("Discovering host identity from {}", probe.path().display());
        PollingHost::new(probe, config.discovery_poll_interval())
    });
    let identity = IdentityResolver::new(
        LibSqlKeyValueStore::new(db),
        host,
        config.discovery_timeout(),
    )
    .resolve()
    .await;

    tracing::debug!("Opening {} session as {}", backend.label(), identity);
    Ok(ConfessionService::start(backend, identity, config).await)
}

/// Merge flags, profile and environment into a client config.
///
/// `--local` drops the hosted store; otherwise the profile wins over
/// `SUPABASE_URL`/`SUPABASE_ANON_KEY`.
pub fn client_config_from(
    args: &SessionArgs,
    profile: Option<&CliProfile>,
) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::default();

    if !args.local {
        config.supabase_url = profile
            .and_then(CliProfile::supabase_url)
            .or_else(|| normalize_text_option(env::var("SUPABASE_URL").ok()));
        config.supabase_anon_key = profile
            .and_then(CliProfile::supabase_anon_key)
            .or_else(|| normalize_text_option(env::var("SUPABASE_ANON_KEY").ok()));
    }

    config.host_context_path = args
        .host_context
        .clone()
        .or_else(|| profile.and_then(|profile| profile.host_context_path.clone()))
        .or_else(|| env::var_os("CONFESSIONS_HOST_CONTEXT").map(PathBuf::from));

    config.validate()?;
    Ok(config)
}

pub fn format_confession_lines(snapshot: &FeedSnapshot, limit: usize, now_ms: i64) -> Vec<String> {
    snapshot
        .confessions
        .iter()
        .take(limit)
        .map(|confession| {
            let marker = if snapshot.is_liked(confession.id) {
                "♥"
            } else {
                "♡"
            };
            let preview = confession_preview(confession, 60);
            let relative_time = format_relative_time(confession.created_at, now_ms);
            format!(
                "{:>6}  {marker} {:>4}  {preview:<60}  {relative_time}",
                confession.id.get(),
                confession.like_count
            )
        })
        .collect()
}

pub fn format_confession_count(count: usize) -> String {
    if count == 1 {
        "1 confession".to_string()
    } else {
        format!("{count} confessions")
    }
}

pub fn confession_to_list_item(
    confession: &Confession,
    liked: bool,
    now_ms: i64,
) -> ConfessionListItem {
    ConfessionListItem {
        id: confession.id,
        preview: confession_preview(confession, 80),
        text: confession.text.clone(),
        like_count: confession.like_count,
        liked,
        created_at: confession.created_at,
        relative_time: format_relative_time(confession.created_at, now_ms),
    }
}

pub fn confession_preview(confession: &Confession, max_chars: usize) -> String {
    let collapsed = confession
        .preview(usize::MAX)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff >= day {
        plural_ago(diff / day, "day")
    } else if diff >= hour {
        plural_ago(diff / hour, "hour")
    } else if diff >= minute {
        plural_ago(diff / minute, "minute")
    } else {
        "Just now".to_string()
    }
}

fn plural_ago(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

pub fn parse_confession_id(raw: &str) -> Result<ConfessionId, CliError> {
    raw.parse::<ConfessionId>()
        .map_err(|_| CliError::InvalidConfessionId(raw.trim().to_string()))
}

pub fn resolve_confession_text(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    if let Some(content) = capture_editor_input()? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input() -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_confession_file_path();
    std::fs::write(&temp_file, "")?;

    let launch_result = launch_editor(&editor, &temp_file);
    let content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn create_temp_confession_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("confession-{}-{now}.txt", std::process::id()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("CONFESSIONS_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("confessions")
        .join("confessions.db")
}
