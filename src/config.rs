//! Application-level configuration loading: phase durations, scoring and turn policy.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{services::turn_policy::PlayerPolicyKind, state::state_machine::PhaseSchedule};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PRODUCT_REVIEW_BACK_CONFIG_PATH";
/// Points awarded to the author of the winning comment.
pub const DEFAULT_WINNER_POINTS: i32 = 10;
/// Buffered events per room before slow SSE subscribers start lagging.
const DEFAULT_ROOM_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Durations of the timed round phases.
    pub schedule: PhaseSchedule,
    /// Score delta granted to the round winner.
    pub winner_points: i32,
    /// Rule choosing the acting player of each round.
    pub player_policy: PlayerPolicyKind,
    /// Capacity of each lobby's broadcast channel.
    pub room_capacity: usize,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        winner_points = config.winner_points,
                        policy = ?config.player_policy,
                        "loaded configuration"
                    );
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
        }
    }

    /// Parse a JSON document; absent keys keep their default value.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schedule: PhaseSchedule::default(),
            winner_points: DEFAULT_WINNER_POINTS,
            player_policy: PlayerPolicyKind::default(),
            room_capacity: DEFAULT_ROOM_CAPACITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    phase_durations_secs: RawDurations,
    winner_points: Option<i32>,
    player_policy: Option<PlayerPolicyKind>,
    room_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDurations {
    product_submission: Option<u64>,
    commenting: Option<u64>,
    voting: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let durations = value.phase_durations_secs;
        let seconds = |raw: Option<u64>, fallback: Duration| {
            raw.map(Duration::from_secs).unwrap_or(fallback)
        };

        Self {
            schedule: PhaseSchedule {
                product_submission: seconds(
                    durations.product_submission,
                    defaults.schedule.product_submission,
                ),
                commenting: seconds(durations.commenting, defaults.schedule.commenting),
                voting: seconds(durations.voting, defaults.schedule.voting),
            },
            winner_points: value.winner_points.unwrap_or(defaults.winner_points),
            player_policy: value.player_policy.unwrap_or(defaults.player_policy),
            room_capacity: value
                .room_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.room_capacity),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.schedule, PhaseSchedule::default());
        assert_eq!(config.winner_points, DEFAULT_WINNER_POINTS);
        assert_eq!(config.player_policy, PlayerPolicyKind::FirstJoined);
        assert_eq!(config.room_capacity, DEFAULT_ROOM_CAPACITY);
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let config = AppConfig::from_json(
            r#"{
                "phase_durations_secs": { "voting": 45 },
                "winner_points": 25,
                "player_policy": "round_robin"
            }"#,
        )
        .unwrap();

        assert_eq!(config.schedule.voting, Duration::from_secs(45));
        assert_eq!(config.schedule.commenting, Duration::from_secs(60));
        assert_eq!(config.winner_points, 25);
        assert_eq!(config.player_policy, PlayerPolicyKind::RoundRobin);
    }

    #[test]
    fn zero_room_capacity_is_ignored() {
        let config = AppConfig::from_json(r#"{ "room_capacity": 0 }"#).unwrap();
        assert_eq!(config.room_capacity, DEFAULT_ROOM_CAPACITY);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(AppConfig::from_json(r#"{ "winner_points": "ten" }"#).is_err());
    }
}
