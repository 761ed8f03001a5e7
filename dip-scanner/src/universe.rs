//! Stock universe catalog.
//!
//! Static, curated NSE constituent lists keyed by index breadth. The
//! default documents are compiled into the binary; a directory of
//! `<universe>.json` files can replace any of them at startup.
//!
//! Lookups never fail: an unknown universe id resolves to the configured
//! default universe.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use dip_common::config::ScannerConfig;

const NIFTY_50: &str = include_str!("../data/universe/nifty50.json");
const NIFTY_100: &str = include_str!("../data/universe/nifty100.json");
const NIFTY_200: &str = include_str!("../data/universe/nifty200.json");
const NIFTY_500: &str = include_str!("../data/universe/nifty500.json");

// ============================================================================
// Catalog Types
// ============================================================================

/// Market-cap bucket attached to each catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketCap {
    Large,
    Mid,
    Small,
    Micro,
}

impl MarketCap {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Large => "large",
            Self::Mid => "mid",
            Self::Small => "small",
            Self::Micro => "micro",
        }
    }
}

impl std::fmt::Display for MarketCap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketCap {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "large" => Ok(Self::Large),
            "mid" => Ok(Self::Mid),
            "small" => Ok(Self::Small),
            "micro" => Ok(Self::Micro),
            _ => Err(format!("Unknown market cap bucket: {}", s)),
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRef {
    /// Provider ticker (e.g., "RELIANCE.NS")
    pub symbol: String,
    /// Display name
    pub name: String,
    /// Sector label (e.g., "banking")
    pub sector: String,
    /// Market-cap bucket
    #[serde(rename = "marketCap")]
    pub market_cap: MarketCap,
}

/// Universe identifier (index breadth).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniverseId {
    Nifty50,
    Nifty100,
    Nifty200,
    Nifty500,
}

impl UniverseId {
    pub const ALL: [UniverseId; 4] = [
        UniverseId::Nifty50,
        UniverseId::Nifty100,
        UniverseId::Nifty200,
        UniverseId::Nifty500,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nifty50 => "nifty50",
            Self::Nifty100 => "nifty100",
            Self::Nifty200 => "nifty200",
            Self::Nifty500 => "nifty500",
        }
    }

    /// Human-readable index name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Nifty50 => "Nifty 50",
            Self::Nifty100 => "Nifty 100",
            Self::Nifty200 => "Nifty 200",
            Self::Nifty500 => "Nifty 500",
        }
    }

    fn embedded_document(&self) -> &'static str {
        match self {
            Self::Nifty50 => NIFTY_50,
            Self::Nifty100 => NIFTY_100,
            Self::Nifty200 => NIFTY_200,
            Self::Nifty500 => NIFTY_500,
        }
    }
}

impl std::fmt::Display for UniverseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UniverseId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nifty50" => Ok(Self::Nifty50),
            "nifty100" => Ok(Self::Nifty100),
            "nifty200" => Ok(Self::Nifty200),
            "nifty500" => Ok(Self::Nifty500),
            _ => Err(format!("Unknown universe: {}", s)),
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Read-only collection of universes, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    universes: HashMap<UniverseId, Vec<StockRef>>,
    default: UniverseId,
}

impl Catalog {
    /// Build the catalog from the compiled-in documents.
    pub fn embedded(default: UniverseId) -> Result<Self> {
        let mut universes = HashMap::new();
        for id in UniverseId::ALL {
            let stocks = parse_document(id, id.embedded_document())?;
            universes.insert(id, stocks);
        }

        Ok(Self { universes, default })
    }

    /// Build the catalog for the service: embedded documents, replaced by
    /// `<universe_dir>/<id>.json` where such a file exists.
    pub fn load(config: &ScannerConfig) -> Result<Self> {
        let default = config
            .default_universe
            .parse::<UniverseId>()
            .map_err(anyhow::Error::msg)?;
        let mut catalog = Self::embedded(default)?;

        if let Some(dir) = &config.universe_dir {
            catalog.apply_overrides(dir)?;
        }

        for id in UniverseId::ALL {
            debug!(universe = %id, stocks = catalog.get(id).len(), "Universe loaded");
        }

        Ok(catalog)
    }

    /// Replace universes with documents found in `dir`.
    pub fn apply_overrides(&mut self, dir: &Path) -> Result<()> {
        for id in UniverseId::ALL {
            let path = dir.join(format!("{}.json", id.as_str()));
            if !path.exists() {
                continue;
            }

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read universe file {}", path.display()))?;
            let stocks = parse_document(id, &content)
                .with_context(|| format!("Invalid universe file {}", path.display()))?;

            info!(universe = %id, stocks = stocks.len(), path = %path.display(), "Universe overridden");
            self.universes.insert(id, stocks);
        }

        Ok(())
    }

    /// Universe used for unknown ids.
    pub fn default_universe(&self) -> UniverseId {
        self.default
    }

    /// Resolve a requested id, substituting the default for unknown ones.
    pub fn resolve(&self, requested: &str) -> UniverseId {
        requested.parse().unwrap_or(self.default)
    }

    /// Constituents of a universe.
    pub fn get(&self, id: UniverseId) -> &[StockRef] {
        self.universes.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a universe by its requested id.
    ///
    /// Returns the universe that was actually used alongside its entries.
    pub fn list_universe(&self, requested: &str) -> (UniverseId, &[StockRef]) {
        let id = self.resolve(requested);
        (id, self.get(id))
    }
}

/// Parse and check one universe document.
fn parse_document(id: UniverseId, content: &str) -> Result<Vec<StockRef>> {
    let stocks: Vec<StockRef> = serde_json::from_str(content)
        .with_context(|| format!("Failed to parse universe {}", id))?;

    if stocks.is_empty() {
        bail!("Universe {} is empty", id);
    }

    if let Some(bad) = stocks
        .iter()
        .find(|s| s.symbol.trim().is_empty() || s.name.trim().is_empty())
    {
        bail!("Universe {} has an entry without symbol or name: {:?}", id, bad);
    }

    Ok(stocks)
}

// ============================================================================
// Tests
// ============================================================================
