use crate::domain::{NodeId, SimulationConfig};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

// Runtime/server settings (not simulation tuning; that lives in `SimulationConfig`).

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub fn http_port() -> u16 {
    env::var("ORRERY_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3003)
}

pub fn snapshot_path() -> PathBuf {
    env::var("ORRERY_SNAPSHOT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("snapshots/default.json"))
}

pub fn node_id() -> NodeId {
    NodeId::new(env::var("ORRERY_NODE_ID").unwrap_or_else(|_| "sim-0".to_string()))
}

/// Defaults unless `ORRERY_CONFIG` names a TOML file; missing keys keep their defaults.
pub fn simulation_config() -> Result<SimulationConfig, ConfigError> {
    match env::var("ORRERY_CONFIG") {
        Ok(path) => load_simulation_config(Path::new(&path)),
        Err(_) => Ok(SimulationConfig::default()),
    }
}

pub fn load_simulation_config(path: &Path) -> Result<SimulationConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_simulation_config(&text).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_simulation_config(text: &str) -> Result<SimulationConfig, toml::de::Error> {
    toml::from_str(text)
}

// Warp queries that outlive this are reported as failed.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(2);
