use std::{collections::HashMap, fmt, str::FromStr};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Facility / feature category.
/// Anything that does not match a known spelling lands in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CollectionPoint,        // Regular collection point (TPS)
    ReduceReuseRecycle,     // Reduce-reuse-recycle point (TPS3R)
    WasteBank,              // Bank sampah
    Composting,             // Composting site
    UnauthorizedDump,       // TPS liar
    AdministrativeBoundary, // Polygon boundary, not a facility
    Unknown,                // Unrecognized upstream category string
}

/// Built-in spellings, matched exactly (after trimming surrounding whitespace).
const ALIASES: &[(&str, Category)] = &[
    ("collection_point", Category::CollectionPoint),
    ("collection-point", Category::CollectionPoint),
    ("TPS", Category::CollectionPoint),
    ("reduce_reuse_recycle", Category::ReduceReuseRecycle),
    ("reduce-reuse-recycle", Category::ReduceReuseRecycle),
    ("TPS3R", Category::ReduceReuseRecycle),
    ("TPS 3R", Category::ReduceReuseRecycle),
    ("waste_bank", Category::WasteBank),
    ("waste-bank", Category::WasteBank),
    ("Bank Sampah", Category::WasteBank),
    ("composting", Category::Composting),
    ("Komposting", Category::Composting),
    ("Rumah Kompos", Category::Composting),
    ("unauthorized_dump", Category::UnauthorizedDump),
    ("unauthorized-dump", Category::UnauthorizedDump),
    ("TPS Liar", Category::UnauthorizedDump),
    ("administrative_boundary", Category::AdministrativeBoundary),
    ("administrative-boundary", Category::AdministrativeBoundary),
    ("Batas Administrasi", Category::AdministrativeBoundary),
];

impl Category {
    pub fn to_str(&self) -> &'static str {
        match self {
            Category::CollectionPoint => "collection_point",
            Category::ReduceReuseRecycle => "reduce_reuse_recycle",
            Category::WasteBank => "waste_bank",
            Category::Composting => "composting",
            Category::UnauthorizedDump => "unauthorized_dump",
            Category::AdministrativeBoundary => "administrative_boundary",
            Category::Unknown => "unknown",
        }
    }

    pub fn order() -> [Category; 7] {
        [
            Category::CollectionPoint,
            Category::ReduceReuseRecycle,
            Category::WasteBank,
            Category::Composting,
            Category::UnauthorizedDump,
            Category::AdministrativeBoundary,
            Category::Unknown,
        ]
    }

    /// True for categories that describe a physical facility (not boundaries).
    pub fn is_facility(&self) -> bool {
        !matches!(self, Category::AdministrativeBoundary | Category::Unknown)
    }

    /// Counts that may only be shown to privileged roles.
    pub fn is_sensitive(&self) -> bool { matches!(self, Category::UnauthorizedDump) }

    /// Resolve a raw upstream string, consulting `extra` aliases before the built-in table.
    /// Never fails: unrecognized strings map to `Unknown`.
    pub fn resolve(raw: &str, extra: &HashMap<String, Category>) -> Self {
        let raw = raw.trim();
        if let Some(category) = extra.get(raw) { return *category }
        ALIASES.iter()
            .find(|(alias, _)| *alias == raw)
            .map(|(_, category)| *category)
            .unwrap_or(Category::Unknown)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    /// Strict parse used for configuration and CLI input.
    fn from_str(s: &str) -> Result<Self> {
        match Category::resolve(s, &HashMap::new()) {
            Category::Unknown if s.trim() != "unknown" => Err(anyhow!("Unknown category: {s}")),
            category => Ok(category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_canonical_and_source_spellings() {
        let none = HashMap::new();
        assert_eq!(Category::resolve("waste_bank", &none), Category::WasteBank);
        assert_eq!(Category::resolve("Bank Sampah", &none), Category::WasteBank);
        assert_eq!(Category::resolve(" TPS3R ", &none), Category::ReduceReuseRecycle);
        assert_eq!(Category::resolve("TPS Liar", &none), Category::UnauthorizedDump);
    }

    #[test]
    fn near_misses_are_unknown() {
        let none = HashMap::new();
        assert_eq!(Category::resolve("bank sampah", &none), Category::Unknown);
        assert_eq!(Category::resolve("Pasar", &none), Category::Unknown);
        assert_eq!(Category::resolve("", &none), Category::Unknown);
    }

    #[test]
    fn extra_aliases_take_precedence() {
        let extra = HashMap::from([("Depo".to_string(), Category::CollectionPoint)]);
        assert_eq!(Category::resolve("Depo", &extra), Category::CollectionPoint);
    }

    #[test]
    fn strict_parse_rejects_unknown_strings() {
        assert_eq!("composting".parse::<Category>().unwrap(), Category::Composting);
        assert_eq!("unknown".parse::<Category>().unwrap(), Category::Unknown);
        assert!("landfill".parse::<Category>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for category in Category::order() {
            assert_eq!(category.to_string().parse::<Category>().unwrap(), category);
        }
    }
}
