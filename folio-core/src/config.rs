use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::DATA_PATH;
use crate::form::DEFAULT_RELAY_ENDPOINT;
use crate::render::PLACEHOLDER_IMAGE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parsing(#[from] toml::de::Error),
}

/// Contents of `folio.toml`.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct Config {
    pub site: Option<SiteConfig>,
    pub form: Option<FormConfig>,
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&data)?;

        Ok(config)
    }

    pub fn site(&self) -> SiteConfig {
        self.site.clone().unwrap_or_default()
    }

    pub fn form(&self) -> FormConfig {
        self.form.clone().unwrap_or_default()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    /// Content document, relative to the source directory.
    pub data_path: String,
    /// Image used for projects without one.
    pub placeholder_image: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            data_path: DATA_PATH.to_string(),
            placeholder_image: PLACEHOLDER_IMAGE.to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FormConfig {
    pub relay_endpoint: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            relay_endpoint: DEFAULT_RELAY_ENDPOINT.to_string(),
        }
    }
}
