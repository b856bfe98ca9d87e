use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::matching::DEFAULT_DIMENSIONS;

/// Default embedding model (768-dimension output)
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
/// Default embedding endpoint
const DEFAULT_EMBEDDING_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Environment variable holding the embedding API key
const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Default embedding request timeout in seconds
const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;
/// Default number of recipe suggestions per match request
const DEFAULT_MATCH_K: usize = 5;
/// Default HTTP listen address
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Configuration for the embedding provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g. "text-embedding-004")
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Base endpoint of the embedContent API
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Expected embedding dimension
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
        }
    }
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_endpoint() -> String {
    DEFAULT_EMBEDDING_ENDPOINT.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_dimensions() -> usize {
    DEFAULT_DIMENSIONS
}

fn default_embedding_timeout_secs() -> u64 {
    DEFAULT_EMBEDDING_TIMEOUT_SECS
}

/// Configuration for match requests
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Suggestions returned when the caller doesn't ask for a count
    #[serde(default = "default_match_k")]
    pub default_k: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            default_k: DEFAULT_MATCH_K,
        }
    }
}

fn default_match_k() -> usize {
    DEFAULT_MATCH_K
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Index artifact file, relative to the base directory
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// ID map artifact file, relative to the base directory
    #[serde(default = "default_id_map_file")]
    pub id_map_file: String,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub matching: MatchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            index_file: default_index_file(),
            id_map_file: default_id_map_file(),
            embedding: EmbeddingConfig::default(),
            matching: MatchConfig::default(),
            base_path: PathBuf::default(),
        }
    }
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_index_file() -> String {
    "recipes.index".to_string()
}

fn default_id_map_file() -> String {
    "recipes_id_map.json".to_string()
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        if self.embedding.dimensions == 0 {
            bail!("embedding.dimensions must be greater than 0");
        }
        if self.embedding.timeout_secs == 0 {
            bail!("embedding.timeout_secs must be greater than 0");
        }
        if self.matching.default_k == 0 {
            bail!("matching.default_k must be greater than 0");
        }
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            bail!(
                "listen_addr '{}' is not a valid socket address",
                self.listen_addr
            );
        }
        Ok(())
    }

    pub fn load_with(base_path: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(base_path)
            .with_context(|| format!("couldnt create base directory {}", base_path.display()))?;

        let config_path = base_path.join("config.yaml");

        // create new if does not exist
        if !config_path.exists() {
            std::fs::write(&config_path, serde_yml::to_string(&Self::default())?)?;
        }

        let config_str =
            std::fs::read_to_string(&config_path).context("couldnt read config file")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = self.base_path.join("config.yaml");
        std::fs::write(&config_path, serde_yml::to_string(&self)?)?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn index_path(&self) -> PathBuf {
        self.base_path.join(&self.index_file)
    }

    pub fn id_map_path(&self) -> PathBuf {
        self.base_path.join(&self.id_map_file)
    }

    pub fn recipes_path(&self) -> PathBuf {
        self.base_path.join("recipes.json")
    }

    pub fn pantry_path(&self) -> PathBuf {
        self.base_path.join("pantry.csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_creates_default_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_with(tmp.path()).unwrap();

        assert!(tmp.path().join("config.yaml").exists());
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(config.matching.default_k, 5);
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_reload_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        {
            Config::load_with(tmp.path()).unwrap();
        }
        let config = Config::load_with(tmp.path()).unwrap();
        assert_eq!(config.embedding.model, "text-embedding-004");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.yaml"),
            "matching:\n  default_k: 0\n",
        )
        .unwrap();

        assert!(Config::load_with(tmp.path()).is_err());
    }

    #[test]
    fn test_artifact_paths_join_base() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_with(tmp.path()).unwrap();

        assert_eq!(config.index_path(), tmp.path().join("recipes.index"));
        assert_eq!(config.id_map_path(), tmp.path().join("recipes_id_map.json"));
    }
}
