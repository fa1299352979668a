use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub web: WebConfig,
    pub storage: StorageConfig,
    pub search: SearchDefaults,
    pub catalog: CatalogConfig,
    pub geocoder: GeocoderConfig,
    pub download: DownloadConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind: String,
    /// Chat sessions idle for longer than this are dropped.
    #[serde(deserialize_with = "deserialize_duration")]
    pub session_ttl: Duration,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            session_ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub destination_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            destination_dir: PathBuf::from("downloads"),
        }
    }
}

/// Defaults applied when a request leaves window, box size or cloud ceiling open.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    pub day_window: u32,
    pub bbox_offset: f64,
    pub cloud_ceiling: f64,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            day_window: 10,
            bbox_offset: 0.2,
            cloud_ceiling: 20.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub url: String,
    pub sar_collection: String,
    pub optical_collection: String,
    pub page_limit: u32,
    pub max_pages: u32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: "https://earth-search.aws.element84.com/v1".to_string(),
            sar_collection: "sentinel-1-grd".to_string(),
            optical_collection: "sentinel-2-l2a".to_string(),
            page_limit: 50,
            max_pages: 4,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub url: String,
    pub user_agent: String,
    #[serde(deserialize_with = "deserialize_duration")]
    pub min_interval: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("scene-o-mat/", env!("CARGO_PKG_VERSION")).to_string(),
            min_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_iterations: usize,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_iterations: 5,
            timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Loads the file if given, otherwise starts from defaults. A missing
    /// `llm.api_key` is filled from `OPENAI_API_KEY`.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Config::default(),
        };
        if config.llm.api_key.is_none() {
            config.llm.api_key = std::env::var(API_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let search = &self.search;
        if search.day_window == 0 {
            return Err(invalid("search.day_window", "must be at least 1"));
        }
        if !search.bbox_offset.is_finite() || search.bbox_offset < 0.0 {
            return Err(invalid("search.bbox_offset", "must be a non-negative number"));
        }
        if !(0.0..=100.0).contains(&search.cloud_ceiling) {
            return Err(invalid("search.cloud_ceiling", "must be within 0..100"));
        }
        if self.catalog.page_limit == 0 {
            return Err(invalid("catalog.page_limit", "must be at least 1"));
        }
        if self.web.session_ttl.is_zero() {
            return Err(invalid("web.session_ttl", "must be greater than zero"));
        }
        if self.llm.max_iterations == 0 {
            return Err(invalid("llm.max_iterations", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.to_string(),
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}
