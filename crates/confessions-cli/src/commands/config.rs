use std::env;
use std::path::PathBuf;

use confessions_core::config::resolve_optional_supabase_config;
use confessions_core::util::{is_http_url, normalize_text_option};

use crate::cli::ConfigCommands;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Values given on the command line for `config init`.
#[derive(Debug, Default)]
pub struct ProfileInit {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub host_context_path: Option<PathBuf>,
    pub no_activate: bool,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            host_context_path,
            no_activate,
        } => run_config_init(
            global_profile,
            ProfileInit {
                supabase_url,
                supabase_anon_key,
                host_context_path,
                no_activate,
            },
        ),
    }
}

pub fn run_config_init(profile_name: Option<&str>, init: ProfileInit) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load()?;
    let profile_name = init_profile(&mut config, profile_name, init)?;

    let path = config.save()?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let hosted = config
        .profile(&profile_name)
        .is_some_and(|profile| profile.supabase_url().is_some());
    if hosted {
        println!("Profile '{profile_name}' uses the hosted Supabase store.");
    } else {
        println!("Profile '{profile_name}' has no Supabase project; confessions stay in the local database.");
    }

    Ok(())
}

/// Merge flags > environment > existing profile into `config`.
///
/// Returns the name of the profile that was written.
pub fn init_profile(
    config: &mut CliProfilesConfig,
    profile_name: Option<&str>,
    init: ProfileInit,
) -> Result<String, CliError> {
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let supabase_url = normalize_text_option(init.supabase_url)
        .or_else(|| normalize_text_option(env::var("SUPABASE_URL").ok()))
        .or_else(|| existing.supabase_url());
    let supabase_anon_key = normalize_text_option(init.supabase_anon_key)
        .or_else(|| normalize_text_option(env::var("SUPABASE_ANON_KEY").ok()))
        .or_else(|| existing.supabase_anon_key());
    let host_context_path = init
        .host_context_path
        .filter(|path| !path.as_os_str().is_empty())
        .or(existing.host_context_path);

    let merged = CliProfile {
        supabase_url,
        supabase_anon_key,
        host_context_path,
    };
    validate_profile(&merged)?;
    config.set_profile(&profile_name, merged);

    if !init.no_activate {
        config.active_profile = Some(profile_name.clone());
    }
    Ok(profile_name)
}

fn validate_profile(profile: &CliProfile) -> Result<(), CliError> {
    let pair = resolve_optional_supabase_config(profile.supabase_url(), profile.supabase_anon_key())
        .map_err(|error| CliError::Config(error.to_string()))?;
    if let Some((url, _)) = pair {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
    }
    Ok(())
}
