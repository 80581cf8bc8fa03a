use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Key naming the search backend base URL
pub const SEARCH_INDEX_URL_KEY: &str = "search.index.url";

/// Environment variable naming an optional TOML configuration file
pub const CONFIG_PATH_ENV: &str = "DOCINDEX_CONFIG";

const ENV_PREFIX: &str = "DOCINDEX";

/// Provider id of the backend that `search.index.url` selects
pub const SEARCH_PROVIDER_ID: &str = "solr";

/// Every configuration key this crate reads
pub fn configuration_keys() -> &'static [&'static str] {
    &[SEARCH_INDEX_URL_KEY]
}

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub index: IndexConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the Solr core, e.g. `http://localhost:8983/solr/lds`
    #[serde(default)]
    pub url: Option<String>,
}

impl Config {
    /// Load configuration from `DOCINDEX_CONFIG` (if set) and environment
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load_from(Path::new(&path)),
            Err(_) => Self::build(None),
        }
    }

    /// Load configuration from a TOML file, with environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IndexError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        Self::build(Some(path))
    }

    fn build(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
        }

        // DOCINDEX_SEARCH__INDEX__URL -> search.index.url
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Build from a flat property map such as `{"search.index.url": "..."}`.
    /// Unrecognised keys are ignored.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let mut builder = config::Config::builder();
        for key in configuration_keys() {
            if let Some(value) = properties.get(*key) {
                builder = builder.set_override(*key, value.as_str())?;
            }
        }
        Ok(builder.build()?.try_deserialize()?)
    }

    /// The configured backend URL, validated
    pub fn index_url(&self) -> Result<&str> {
        let url = self
            .search
            .index
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                IndexError::Configuration(format!("Missing required key '{}'", SEARCH_INDEX_URL_KEY))
            })?;

        reqwest::Url::parse(url).map_err(|e| {
            IndexError::Configuration(format!(
                "Invalid value for '{}' ({}): {}",
                SEARCH_INDEX_URL_KEY, url, e
            ))
        })?;

        Ok(url)
    }
}
