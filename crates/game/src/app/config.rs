use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skirmish_sim::SimConfig;
use thiserror::Error;

pub(crate) const CONFIG_ENV_VAR: &str = "SKIRMISH_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GameConfig {
    pub(crate) sim: SimConfig,
    pub(crate) run: RunConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct RunConfig {
    pub(crate) target_tps: u32,
    pub(crate) max_frame_delta_ms: u64,
    pub(crate) max_ticks_per_frame: u32,
    /// Simulated seconds before the runner stops.
    pub(crate) run_seconds: u64,
    /// Pace frames against the wall clock instead of stepping as fast as possible.
    pub(crate) realtime: bool,
    pub(crate) metrics_log_interval_ms: u64,
    /// Winning starts New Game+ instead of a fresh game.
    pub(crate) game_plus_on_win: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta_ms: 250,
            max_ticks_per_frame: 5,
            run_seconds: 60,
            realtime: false,
            metrics_log_interval_ms: 1000,
            game_plus_on_win: true,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config json at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads the file named by `SKIRMISH_CONFIG`, or the defaults when unset.
pub(crate) fn load_from_env() -> Result<GameConfig, ConfigError> {
    match env::var(CONFIG_ENV_VAR) {
        Ok(path) => load_from_path(Path::new(&path)),
        Err(env::VarError::NotPresent) => Ok(GameConfig::default()),
        Err(source) => Err(ConfigError::EnvVar {
            var: CONFIG_ENV_VAR,
            source,
        }),
    }
}

pub(crate) fn load_from_path(path: &Path) -> Result<GameConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_json(&raw)
}

fn parse_config_json(raw: &str) -> Result<GameConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        ConfigError::Parse {
            path: if path.is_empty() { ".".to_string() } else { path },
            source: error.into_inner(),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = parse_config_json("{}").expect("parse");
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.run.target_tps, 60);
        assert_eq!(config.sim.progression.final_round, 13);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("skirmish.json");
        fs::write(
            &path,
            r#"{ "sim": { "seed": 7, "progression": { "final_round": 5 } }, "run": { "run_seconds": 3 } }"#,
        )
        .expect("write config");

        let config = load_from_path(&path).expect("load");
        assert_eq!(config.sim.seed, Some(7));
        assert_eq!(config.sim.progression.final_round, 5);
        assert_eq!(config.sim.progression.boss_every, 4);
        assert_eq!(config.run.run_seconds, 3);
        assert!(config.run.game_plus_on_win);
    }

    #[test]
    fn type_error_names_the_json_path() {
        let err = parse_config_json(r#"{ "sim": { "map": { "tiles_x": "wide" } } }"#)
            .expect_err("bad type");
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, "sim.map.tiles_x"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_reports_its_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("absent.json");
        let err = load_from_path(&path).expect_err("missing file");
        assert!(err.to_string().contains("absent.json"));
    }
}
