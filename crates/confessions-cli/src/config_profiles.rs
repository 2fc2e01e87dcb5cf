//! Named CLI profiles, stored as JSON under the user config directory.
//!
//! A profile says which store a session talks to (a Supabase project, or the
//! local database when none is set) and where to look for a host context.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use confessions_core::util::normalize_text_option;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROFILE_ENV_VAR: &str = "CONFESSIONS_PROFILE";
const PROFILES_FILE: &str = "cli-config.json";
const FALLBACK_PROFILE: &str = "default";

/// Failure reading or writing the profiles file.
#[derive(Debug, Error)]
pub enum ProfileFileError {
    #[error("Failed to read profiles at {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Profiles at {path} are not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to write profiles at {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to encode profiles: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliProfilesConfig {
    pub version: u32,
    pub active_profile: Option<String>,
    pub profiles: BTreeMap<String, CliProfile>,
}

impl Default for CliProfilesConfig {
    fn default() -> Self {
        Self {
            version: 1,
            active_profile: None,
            profiles: BTreeMap::new(),
        }
    }
}

/// Store and identity settings for one profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliProfile {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub host_context_path: Option<PathBuf>,
}

pub fn profiles_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("confessions")
        .join(PROFILES_FILE)
}

/// Trimmed profile name, or `None` when blank.
pub fn clean_profile_name(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, ProfileFileError> {
        Self::load_from_path(&profiles_path())
    }

    /// A missing file yields an empty config.
    pub fn load_from_path(path: &Path) -> Result<Self, ProfileFileError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ProfileFileError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Self =
            serde_json::from_str(&raw).map_err(|source| ProfileFileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(config.cleaned())
    }

    pub fn save(&self) -> Result<PathBuf, ProfileFileError> {
        let path = profiles_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ProfileFileError> {
        let encoded = serde_json::to_string_pretty(&self.clone().cleaned())?;
        let write_error = |source| ProfileFileError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(path, encoded).map_err(write_error)
    }

    /// `--profile` flag, then `CONFESSIONS_PROFILE`, then the active profile.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        let from_env = std::env::var(PROFILE_ENV_VAR).ok();
        self.pick_profile_name(explicit, from_env.as_deref())
    }

    fn pick_profile_name(&self, explicit: Option<&str>, from_env: Option<&str>) -> String {
        [explicit, from_env, self.active_profile.as_deref()]
            .into_iter()
            .find_map(clean_profile_name)
            .unwrap_or_else(|| FALLBACK_PROFILE.to_string())
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn set_profile(&mut self, name: &str, profile: CliProfile) {
        self.profiles.insert(name.to_string(), profile);
    }

    fn cleaned(mut self) -> Self {
        self.active_profile = clean_profile_name(self.active_profile.as_deref());
        self.profiles = self
            .profiles
            .into_iter()
            .map(|(name, profile)| (name, profile.cleaned()))
            .collect();
        self
    }
}

impl CliProfile {
    pub fn supabase_url(&self) -> Option<String> {
        normalize_text_option(self.supabase_url.clone())
    }

    pub fn supabase_anon_key(&self) -> Option<String> {
        normalize_text_option(self.supabase_anon_key.clone())
    }

    fn cleaned(self) -> Self {
        Self {
            supabase_url: normalize_text_option(self.supabase_url),
            supabase_anon_key: normalize_text_option(self.supabase_anon_key),
            host_context_path: self
                .host_context_path
                .filter(|path| !path.as_os_str().is_empty()),
        }
    }
}
