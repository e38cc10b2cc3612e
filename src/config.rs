//! # Engine configuration
//!
//! TOML-backed settings for matching and lead capture:
//! - Loads from `config/engine.toml` (or `$ZAPBOT_CONFIG_PATH`).
//! - Falls back to a built-in seed when no file is present.
//! - `$ZAPBOT_DAILY_LIMIT` overrides the capture limit, clamped to `1..=50`.
//!
//! Per-run inputs (niche, location, source) live in [`CaptureSettings`];
//! everything reusable across runs lives in [`EngineConfig`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::lead::LeadSource;
use crate::matcher::DEFAULT_MATCH_LIMIT;

pub const DEFAULT_CONFIG_PATH: &str = "config/engine.toml";
pub const ENV_CONFIG_PATH: &str = "ZAPBOT_CONFIG_PATH";
pub const ENV_DAILY_LIMIT: &str = "ZAPBOT_DAILY_LIMIT";

/// Hard cap from the product: never capture more than 50 leads per day.
pub const MAX_DAILY_LIMIT: u32 = 50;

const DEFAULT_DEDUP_SIMILARITY: f32 = 0.90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    Company,
    Individual,
    #[default]
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenderFilter {
    Male,
    Female,
    #[default]
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

/// Audience filters applied by the scraping collaborator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaptureFilters {
    #[serde(default)]
    pub business_type: BusinessType,
    #[serde(default)]
    pub age_range: Option<AgeRange>,
    #[serde(default)]
    pub gender: GenderFilter,
}

/// Reusable capture defaults (the config-file side).
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureDefaults {
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default)]
    pub niches: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub sources: Vec<LeadSource>,
    #[serde(default)]
    pub filters: CaptureFilters,
}

fn default_daily_limit() -> u32 {
    MAX_DAILY_LIMIT
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            daily_limit: MAX_DAILY_LIMIT,
            niches: Vec::new(),
            locations: Vec::new(),
            sources: Vec::new(),
            filters: CaptureFilters::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_match_limit")]
    pub match_limit: usize,
    /// Normalized-Levenshtein threshold above which two captured leads are
    /// considered the same contact.
    #[serde(default = "default_dedup_similarity")]
    pub dedup_similarity: f32,
    #[serde(default)]
    pub capture: CaptureDefaults,
}

fn default_match_limit() -> usize {
    DEFAULT_MATCH_LIMIT
}

fn default_dedup_similarity() -> f32 {
    DEFAULT_DEDUP_SIMILARITY
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_limit: DEFAULT_MATCH_LIMIT,
            dedup_similarity: DEFAULT_DEDUP_SIMILARITY,
            capture: CaptureDefaults::default(),
        }
    }
}

impl EngineConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: EngineConfig = toml::from_str(s).context("parsing engine config TOML")?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load from `$ZAPBOT_CONFIG_PATH` or the default path; falls back to
    /// built-in defaults when the file is missing or unparseable.
    pub fn load() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = Self::load_from_file(&path);
        if let Some(limit) = parse_daily_limit_env(std::env::var(ENV_DAILY_LIMIT).ok()) {
            cfg.capture.daily_limit = limit;
        }
        cfg
    }

    /// Load configuration from a TOML file. Falls back to defaults on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => Self::from_toml_str(&s).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    fn sanitize(&mut self) {
        self.capture.daily_limit = self.capture.daily_limit.clamp(1, MAX_DAILY_LIMIT);
        self.dedup_similarity = self.dedup_similarity.clamp(0.0, 1.0);
        if self.match_limit == 0 {
            self.match_limit = DEFAULT_MATCH_LIMIT;
        }
    }
}

/// One capture run: the form inputs plus the effective limit and filters.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub niche: String,
    pub location: String,
    pub source: LeadSource,
    pub daily_limit: u32,
    pub filters: CaptureFilters,
}

impl CaptureSettings {
    pub fn new(
        niche: impl Into<String>,
        location: impl Into<String>,
        source: LeadSource,
    ) -> Self {
        Self {
            niche: niche.into(),
            location: location.into(),
            source,
            daily_limit: MAX_DAILY_LIMIT,
            filters: CaptureFilters::default(),
        }
    }

    pub fn with_daily_limit(mut self, limit: u32) -> Self {
        self.daily_limit = limit.clamp(1, MAX_DAILY_LIMIT);
        self
    }

    /// A run needs a niche and a location before it can start.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.niche.trim().is_empty(), "capture niche is required");
        anyhow::ensure!(
            !self.location.trim().is_empty(),
            "capture location is required"
        );
        Ok(())
    }
}

// parse optional integer env and clamp to 1..=MAX_DAILY_LIMIT
fn parse_daily_limit_env(raw: Option<String>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .map(|v| v.clamp(1, MAX_DAILY_LIMIT))
}
