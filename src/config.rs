//! Build configuration: where the index goes and which sources feed it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::SourceKind;
use crate::{Error, Result};

/// Default artifact path.
pub const DEFAULT_OUTPUT: &str = "mitu.db";

/// One input file and how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>, kind: SourceKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Ordered list of sources and the output path.
///
/// Sources are ingested in list order, and later sources override earlier
/// ones field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_output")]
    pub output: PathBuf,
    pub sources: Vec<SourceSpec>,
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            sources: vec![
                SourceSpec::new("resources/geocoding/en/1.txt", SourceKind::Masterlist),
                SourceSpec::new("resources/geocoding/en/custom.txt", SourceKind::Geocoding),
                SourceSpec::new("resources/timezones/map_data.txt", SourceKind::Timezone),
                SourceSpec::new("resources/timezones/custom_tz.txt", SourceKind::Timezone),
            ],
        }
    }
}

impl BuildConfig {
    /// Parse a YAML configuration.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML configuration file.
    ///
    /// Relative paths in the file are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Prefix every relative path with `base`.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        if self.output.is_relative() {
            self.output = base.join(&self.output);
        }
        for source in &mut self.sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
    }

    /// Check the source list.
    ///
    /// Masterlist sources must come before any geocoding source, since
    /// bare geocoding values are classified by the country prefixes the
    /// masterlist registers.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(Error::Config("no sources configured".to_string()));
        }

        let mut seen_geocoding = false;
        for source in &self.sources {
            match source.kind {
                SourceKind::Geocoding => seen_geocoding = true,
                SourceKind::Masterlist if seen_geocoding => {
                    return Err(Error::Config(format!(
                        "masterlist source {:?} must be listed before geocoding sources",
                        source.path
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
