use std::path::{Path, PathBuf};

use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the content document lives, relative to the page.
pub const DATA_PATH: &str = "data/site.json";

/// The whole content document. Loaded once per page and never mutated.
///
/// Missing fields fall back to empty values instead of failing the parse, so a
/// sparse document renders as blank sections.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct SiteData {
    pub basics: Basics,
    pub skills: Vec<String>,
    pub projects: Vec<Project>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub contact: Contact,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Basics {
    pub name: String,
    pub title: String,
    pub summary: String,
    pub location: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub avatar: Option<String>,
    pub socials: Vec<Social>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Social {
    pub label: String,
    pub url: String,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub description: String,
    pub link: String,
    pub image: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Experience {
    pub company: String,
    pub role: String,
    pub start: String,
    pub end: String,
    pub description: String,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Education {
    pub school: String,
    pub degree: String,
    pub start: String,
    pub end: String,
}

/// Destination for the contact relay. Independent of `basics.email`.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Contact {
    pub email: String,
}

#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("could not load site data: {url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not load site data: {0}")]
    Network(#[from] reqwest::Error),

    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("site data is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Something that can hand back the raw content document.
#[allow(async_fn_in_trait)]
pub trait DataSource {
    async fn fetch(&self) -> Result<String, DataLoadError>;
}

/// Fetches the document over HTTP, always asking for a fresh copy.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    /// Points at `data/site.json` under `base_url`.
    pub fn new(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self::with_url(format!("{base}/{DATA_PATH}"))
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DataSource for HttpSource {
    async fn fetch(&self) -> Result<String, DataLoadError> {
        log::debug!("Fetching {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataLoadError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Reads the document straight from disk. Used by the build pipeline.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DataSource for FileSource {
    async fn fetch(&self) -> Result<String, DataLoadError> {
        log::debug!("Reading {}", self.path.display());
        std::fs::read_to_string(&self.path).map_err(|source| DataLoadError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Fetches and parses the content document. One attempt, no retry.
pub async fn load_data<S: DataSource>(source: &S) -> Result<SiteData, DataLoadError> {
    let body = source.fetch().await?;
    let data: SiteData = serde_json::from_str(&body)?;
    Ok(data)
}
