//! Domain error kinds.
//!
//! Only `SourceFetchError` is a hard failure; the others are reported as
//! status values from interactive operations and never abort anything.

use std::{fmt, sync::Arc};

use thiserror::Error;

/// A named source could not be retrieved or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("source '{collection}' failed: {reason}")]
pub struct SourceFetchError {
    pub collection: String,
    pub reason: String,
}

impl SourceFetchError {
    pub(crate) fn new(collection: &str, err: &anyhow::Error) -> Self {
        // `{:#}` keeps the whole context chain on one line
        Self { collection: collection.to_string(), reason: format!("{err:#}") }
    }
}

/// Administrative hierarchy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminLevel {
    District,
    Subdistrict,
    Block,
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdminLevel::District => "district",
            AdminLevel::Subdistrict => "subdistrict",
            AdminLevel::Block => "block",
        })
    }
}

/// A child level was set while its parent level is still "all".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot set {level} while {parent} is 'all'")]
pub struct InvalidSelectionTransition {
    pub level: AdminLevel,
    pub parent: AdminLevel,
}

/// A specific layer could not be drawn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("layer '{layer}' could not be drawn: {reason}")]
pub struct LayerDrawFailure {
    pub layer: Arc<str>,
    pub reason: String,
}

impl LayerDrawFailure {
    pub(crate) fn new(layer: &Arc<str>, reason: impl Into<String>) -> Self {
        Self { layer: layer.clone(), reason: reason.into() }
    }
}

/// Why a renderer refused a primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),
    #[error("invalid tile source: {0}")]
    InvalidTileSource(String),
    #[error("renderer unavailable")]
    Unavailable,
}
