//! Application-level configuration: room identity, song lifecycle timings, the
//! star reaction allow-list, message templates and feature flags.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use tracing::{info, warn};

use crate::services::{
    announcement::DEFAULT_SONG_STATS_TEMPLATE, reactions::DEFAULT_STAR_REACTIONS,
};

/// Default location on disk where the bot looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/room.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ROOM_MIRROR_CONFIG_PATH";
/// Environment variables overriding individual fields.
const ROOM_UUID_ENV: &str = "ROOM_UUID";
const BOT_USER_UUID_ENV: &str = "BOT_USER_UUID";
const ACTIONS_URL_ENV: &str = "ROOM_MIRROR_ACTIONS_URL";
const ACTIONS_TOKEN_ENV: &str = "ROOM_MIRROR_ACTIONS_TOKEN";

/// How long a song must keep playing before the bot casts its automatic upvote.
pub const DEFAULT_SONG_DWELL: Duration = Duration::from_secs(90);
/// How long a finished song stays open for late votes before it is announced.
pub const DEFAULT_ANNOUNCEMENT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared by a room session.
pub struct AppConfig {
    /// Room the bot is connected to.
    pub room_uuid: String,
    /// Identity the bot acts as when casting votes.
    pub bot_user_uuid: String,
    /// How long a song must play before the automatic upvote.
    pub song_dwell: Duration,
    /// Settle delay between archiving a song and announcing it.
    pub announcement_delay: Duration,
    /// Reaction symbols counted as star votes.
    pub star_reactions: Vec<String>,
    /// Template of the end-of-song stats message.
    pub song_stats_template: String,
    /// Cast an automatic upvote once a song has played for [`AppConfig::song_dwell`].
    pub auto_upvote: bool,
    /// Announce the final tally of every finished song.
    pub announce_song_stats: bool,
    /// Base URL of the chat backend; actions are only logged when unset.
    pub actions_base_url: Option<String>,
    /// Bearer token sent to the chat backend.
    pub actions_token: Option<String>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults, then
    /// apply environment overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded room config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };
        config.with_env_overrides()
    }

    /// Parse a JSON configuration; absent fields keep their defaults.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(raw).map(Into::into)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(room) = non_empty_env(ROOM_UUID_ENV) {
            self.room_uuid = room;
        }
        if let Some(user) = non_empty_env(BOT_USER_UUID_ENV) {
            self.bot_user_uuid = user;
        }
        if let Some(url) = non_empty_env(ACTIONS_URL_ENV) {
            self.actions_base_url = Some(url);
        }
        if let Some(token) = non_empty_env(ACTIONS_TOKEN_ENV) {
            self.actions_token = Some(token);
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    room_uuid: String,
    bot_user_uuid: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    song_dwell_secs: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    announcement_delay_secs: Duration,
    star_reactions: Vec<String>,
    templates: RawTemplates,
    features: RawFeatures,
    actions: RawActions,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            room_uuid: "room".into(),
            bot_user_uuid: "bot".into(),
            song_dwell_secs: DEFAULT_SONG_DWELL,
            announcement_delay_secs: DEFAULT_ANNOUNCEMENT_DELAY,
            star_reactions: DEFAULT_STAR_REACTIONS.map(String::from).to_vec(),
            templates: RawTemplates::default(),
            features: RawFeatures::default(),
            actions: RawActions::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawTemplates {
    song_stats: String,
}

impl Default for RawTemplates {
    fn default() -> Self {
        Self {
            song_stats: DEFAULT_SONG_STATS_TEMPLATE.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawFeatures {
    auto_upvote: bool,
    announce_song_stats: bool,
}

impl Default for RawFeatures {
    fn default() -> Self {
        Self {
            auto_upvote: true,
            announce_song_stats: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawActions {
    base_url: Option<String>,
    token: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            room_uuid: value.room_uuid,
            bot_user_uuid: value.bot_user_uuid,
            song_dwell: value.song_dwell_secs,
            announcement_delay: value.announcement_delay_secs,
            star_reactions: value.star_reactions,
            song_stats_template: value.templates.song_stats,
            auto_upvote: value.features.auto_upvote,
            announce_song_stats: value.features.announce_song_stats,
            actions_base_url: value.actions.base_url,
            actions_token: value.actions.token,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config.song_dwell, Duration::from_secs(90));
        assert_eq!(config.announcement_delay, DEFAULT_ANNOUNCEMENT_DELAY);
        assert_eq!(config.star_reactions.len(), DEFAULT_STAR_REACTIONS.len());
        assert!(config.auto_upvote);
        assert!(config.announce_song_stats);
        assert_eq!(config.song_stats_template, DEFAULT_SONG_STATS_TEMPLATE);
        assert!(config.actions_base_url.is_none());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let config = AppConfig::from_json_str(
            r#"{
                "roomUuid": "lounge",
                "songDwellSecs": 30,
                "starReactions": ["star"],
                "features": {"autoUpvote": false},
                "actions": {"baseUrl": "http://chat.local/api"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.room_uuid, "lounge");
        assert_eq!(config.song_dwell, Duration::from_secs(30));
        assert_eq!(config.star_reactions, vec!["star".to_string()]);
        assert!(!config.auto_upvote);
        assert!(config.announce_song_stats);
        assert_eq!(config.actions_base_url.as_deref(), Some("http://chat.local/api"));
    }

    #[test]
    fn malformed_duration_is_an_error() {
        assert!(AppConfig::from_json_str(r#"{"songDwellSecs": "soon"}"#).is_err());
    }
}
