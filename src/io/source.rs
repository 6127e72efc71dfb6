use std::{fmt, path::PathBuf, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;
use futures::future::BoxFuture;

use crate::types::Category;

/// Where a feature collection document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    File(PathBuf),
    Url(String),
    Inline(Bytes), // Already in memory (bundled static data, tests)
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::File(path) => write!(f, "{}", path.display()),
            SourceLocation::Url(url) => f.write_str(url),
            SourceLocation::Inline(bytes) => write!(f, "<inline {} bytes>", bytes.len()),
        }
    }
}

/// A logical collection name ("facilities", "waste-banks", ...) plus its retrieval location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub name: String,
    pub location: SourceLocation,
    /// Category applied to every feature of this collection, overriding property lookup.
    pub default_category: Option<Category>,
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, location: SourceLocation) -> Self {
        Self { name: name.into(), location, default_category: None }
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(name, SourceLocation::File(path.into()))
    }

    pub fn url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, SourceLocation::Url(url.into()))
    }

    pub fn inline(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self::new(name, SourceLocation::Inline(bytes.into()))
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.default_category = Some(category);
        self
    }
}

impl FromStr for SourceDescriptor {
    type Err = anyhow::Error;

    /// Parse `name=location[@category]`; locations starting with `http(s)://` are URLs.
    fn from_str(s: &str) -> Result<Self> {
        let (name, rest) = s.split_once('=')
            .ok_or_else(|| anyhow!("Expected 'name=location[@category]', got '{s}'"))?;
        let name = name.trim();
        if name.is_empty() { bail!("Source name must not be empty in '{s}'") }

        // Only treat the suffix as a category if it parses as one (URLs may contain '@').
        let (location, category) = match rest.rsplit_once('@') {
            Some((loc, cat)) => match cat.parse::<Category>() {
                Ok(category) => (loc, Some(category)),
                Err(_) => (rest, None),
            },
            None => (rest, None),
        };
        if location.is_empty() { bail!("Source location must not be empty in '{s}'") }

        let location = if location.starts_with("http://") || location.starts_with("https://") {
            SourceLocation::Url(location.to_string())
        } else {
            SourceLocation::File(PathBuf::from(location))
        };

        Ok(Self { name: name.to_string(), location, default_category: category })
    }
}

/// Retrieves raw source documents. Each call is independent; the store runs them concurrently.
pub trait SourceFetcher: Send + Sync {
    fn fetch<'a>(&'a self, source: &'a SourceDescriptor) -> BoxFuture<'a, Result<Bytes>>;
}

/// Reads files with `tokio::fs` and URLs with `reqwest` (feature `download`).
#[derive(Debug, Clone, Default)]
pub struct DefaultFetcher {
    #[cfg(feature = "download")]
    client: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new() -> Self { Self::default() }

    #[cfg(feature = "download")]
    async fn fetch_url(&self, url: &str) -> Result<Bytes> {
        let response = self.client.get(url).send().await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        response.bytes().await.with_context(|| format!("Failed to read body of {url}"))
    }

    #[cfg(not(feature = "download"))]
    async fn fetch_url(&self, url: &str) -> Result<Bytes> {
        bail!("Cannot fetch {url}: built without the 'download' feature")
    }
}

impl SourceFetcher for DefaultFetcher {
    fn fetch<'a>(&'a self, source: &'a SourceDescriptor) -> BoxFuture<'a, Result<Bytes>> {
        Box::pin(async move {
            match &source.location {
                SourceLocation::File(path) => tokio::fs::read(path).await
                    .map(Bytes::from)
                    .with_context(|| format!("Failed to read {}", path.display())),
                SourceLocation::Url(url) => self.fetch_url(url).await,
                SourceLocation::Inline(bytes) => Ok(bytes.clone()),
            }
        })
    }
}
