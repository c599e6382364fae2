use crate::error::ConfigError;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "taskboard";

/// What can appear in `config.toml`. Every key is optional.
#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub search_debounce_ms: Option<u64>,
    pub toast_ms: Option<u64>,
    pub log_dir: Option<PathBuf>,
    pub token_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub search_debounce: Duration,
    pub toast_duration: Duration,
    pub log_dir: PathBuf,
    pub token_path: PathBuf,
}

pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let raw = fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

impl Config {
    /// Loads `.env`, the config file, then applies environment overrides.
    pub fn load() -> Result<Config, ConfigError> {
        dotenv::dotenv().ok();

        let path = config_file_path();
        let file = read_file_config(&path)?;
        Config::resolve(
            file,
            env::var("TASKBOARD_API_URL").ok(),
            env::var("TASKBOARD_TOKEN_PATH").ok().map(PathBuf::from),
            &path,
        )
    }

    pub fn resolve(
        file: FileConfig,
        env_api_url: Option<String>,
        env_token_path: Option<PathBuf>,
        file_path: &Path,
    ) -> Result<Config, ConfigError> {
        let api_url = env_api_url
            .or(file.api_url)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiUrl(file_path.display().to_string()))?;

        Ok(Config {
            api_url: api_url.trim_end_matches('/').to_string(),
            search_debounce: Duration::from_millis(file.search_debounce_ms.unwrap_or(500)),
            toast_duration: Duration::from_millis(file.toast_ms.unwrap_or(3000)),
            log_dir: file.log_dir.unwrap_or_else(data_dir),
            token_path: env_token_path
                .or(file.token_path)
                .unwrap_or_else(|| data_dir().join("access_token")),
        })
    }
}
