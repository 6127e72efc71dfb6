//! Engine configuration, read from a JSON document.
//!
//! Every field has a default so a partial document (or none at all) is valid.

use std::{collections::HashMap, path::Path};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{layers::BasemapSource, types::Category};

/// Ordered candidate property keys; the first key present with a usable value wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeKeys {
    pub id: Vec<String>,
    pub category: Vec<String>,
    pub district: Vec<String>,
    pub subdistrict: Vec<String>,
    pub block: Vec<String>,
    pub name: Vec<String>,
    pub capacity: Vec<String>,
    pub usage: Vec<String>,
    pub composition: Vec<String>,
    pub timestamp: Vec<String>,
    pub volume: Vec<String>,
    pub population: Vec<String>,
}

fn keys(list: &[&str]) -> Vec<String> { list.iter().map(|s| s.to_string()).collect() }

impl Default for AttributeKeys {
    fn default() -> Self {
        Self {
            id: keys(&["id", "fid", "OBJECTID"]),
            category: keys(&["category", "kategori", "jenis", "NAMOBJ"]),
            district: keys(&["district", "kecamatan", "KECAMATAN", "WADMKC"]),
            subdistrict: keys(&["subdistrict", "kelurahan", "KELURAHAN", "WADMKD"]),
            block: keys(&["block", "rt", "RT"]),
            name: keys(&["name", "nama", "NAMA", "REMARK"]),
            capacity: keys(&["capacity", "kapasitas"]),
            usage: keys(&["usage", "terpakai", "volume_terisi"]),
            composition: keys(&["composition", "komposisi"]),
            timestamp: keys(&["timestamp", "date", "tanggal"]),
            volume: keys(&["volume", "tonase", "weight"]),
            population: keys(&["population", "penduduk", "jumlah_penduduk"]),
        }
    }
}

/// Shape of the radius -> covered-percent mapping between the clamp bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CoverageCurve {
    /// Straight line from `floor_percent` at `min_radius_m` to `ceiling_percent` at `max_radius_m`.
    Linear,
    /// Exponential approach to the ceiling; `rate_per_km` controls how fast it saturates.
    Saturating { rate_per_km: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub min_radius_m: f64,
    pub max_radius_m: f64,
    pub floor_percent: f64,
    pub ceiling_percent: f64,
    pub city_population: f64,
    pub curve: CoverageCurve,
    pub circle_segments: usize, // vertices in each buffer polygon
}

impl CoverageConfig {
    /// Radius range and percent bounds must be ordered and finite.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.min_radius_m.is_finite() && self.max_radius_m.is_finite(), "coverage radii must be finite");
        ensure!(self.min_radius_m > 0.0 && self.min_radius_m <= self.max_radius_m,
            "coverage radius range [{}, {}] is invalid", self.min_radius_m, self.max_radius_m);
        ensure!((0.0..=100.0).contains(&self.floor_percent) && (0.0..=100.0).contains(&self.ceiling_percent),
            "coverage percent bounds must lie in [0, 100]");
        ensure!(self.floor_percent <= self.ceiling_percent,
            "coverage floor ({}) exceeds ceiling ({})", self.floor_percent, self.ceiling_percent);
        ensure!(self.city_population.is_finite() && self.city_population >= 0.0, "city_population must be non-negative");
        ensure!(self.circle_segments >= 3, "circle_segments must be at least 3");
        if let CoverageCurve::Saturating { rate_per_km } = self.curve {
            ensure!(rate_per_km.is_finite() && rate_per_km > 0.0, "saturating rate must be positive");
        }
        Ok(())
    }
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            min_radius_m: 100.0,
            max_radius_m: 2_000.0,
            floor_percent: 20.0,
            ceiling_percent: 95.0,
            city_population: 1_650_000.0,
            curve: CoverageCurve::Linear,
            circle_segments: 48,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub merge_precision: u32, // decimal places of lon/lat that identify one location
    pub min_radius_px: f64,
    pub max_radius_px: f64,
}

impl HeatmapConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.merge_precision <= 9, "merge_precision above 9 decimal places is meaningless");
        ensure!(self.min_radius_px.is_finite() && self.max_radius_px.is_finite(), "heatmap radii must be finite");
        ensure!(self.min_radius_px >= 0.0 && self.min_radius_px <= self.max_radius_px, "heatmap radius range is invalid");
        Ok(())
    }
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self { merge_precision: 5, min_radius_px: 6.0, max_radius_px: 30.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub attributes: AttributeKeys,
    pub category_aliases: HashMap<String, Category>,
    pub coverage_categories: Vec<Category>,
    pub coverage: CoverageConfig,
    pub heatmap: HeatmapConfig,
    pub basemaps: Vec<BasemapSource>,
    pub default_basemap: Option<String>,
    pub default_layers: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            attributes: AttributeKeys::default(),
            category_aliases: HashMap::new(),
            coverage_categories: vec![Category::WasteBank, Category::ReduceReuseRecycle],
            coverage: CoverageConfig::default(),
            heatmap: HeatmapConfig::default(),
            basemaps: Vec::new(),
            default_basemap: None,
            default_layers: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s).context("Failed to parse engine configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration document from disk.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration: {}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Check the invariants the analyzers rely on.
    pub fn validate(&self) -> Result<()> {
        self.coverage.validate()?;
        self.heatmap.validate()?;

        if let Some(id) = &self.default_basemap {
            ensure!(self.basemaps.iter().any(|b| &b.id == id), "default basemap '{id}' is not configured");
        }
        Ok(())
    }

    /// Look up a configured basemap by id.
    pub fn basemap(&self, id: &str) -> Option<&BasemapSource> {
        self.basemaps.iter().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_document_overrides_only_given_fields() {
        let config = EngineConfig::from_json_str(r#"{
            "coverage": { "max_radius_m": 5000, "curve": { "kind": "saturating", "rate_per_km": 1.5 } },
            "category_aliases": { "Depo": "collection_point" }
        }"#).unwrap();
        assert_eq!(config.coverage.max_radius_m, 5000.0);
        assert_eq!(config.coverage.min_radius_m, 100.0);
        assert_eq!(config.coverage.curve, CoverageCurve::Saturating { rate_per_km: 1.5 });
        assert_eq!(config.category_aliases.get("Depo"), Some(&Category::CollectionPoint));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = EngineConfig::from_json_str(r#"{ "coverage": { "floor_percent": 90, "ceiling_percent": 50 } }"#);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_unknown_default_basemap() {
        let err = EngineConfig::from_json_str(r#"{ "default_basemap": "osm" }"#);
        assert!(err.is_err());
    }

    #[test]
    fn bundled_config_is_valid() {
        let config = EngineConfig::from_json_str(include_str!("../config/engine.json")).unwrap();
        assert_eq!(config.basemap("osm").map(|b| b.max_zoom), Some(19));
        assert_eq!(config.category_aliases.get("TPST"), Some(&Category::CollectionPoint));
        assert_eq!(config.default_layers, ["facilities", "waste-banks"]);
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "heatmap": { "merge_precision": 4 } }"#).unwrap();
        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.heatmap.merge_precision, 4);
    }
}
