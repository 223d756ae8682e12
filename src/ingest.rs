//! Prefix data file parser.
//!
//! Source files are line oriented: `prefix|value`, with blank lines and
//! `#` comments ignored. How `value` is interpreted depends on the
//! [`SourceKind`] of the file.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::config::BuildConfig;
use crate::trie::{RecordFragment, TrieBuilder};
use crate::Result;

/// Interpretation of a source file's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Canonical geocoding list. Bare values name a country or region and
    /// register their prefix as a country prefix.
    Masterlist,
    /// Derived geocoding data: `city, state`, or a bare city/region name.
    Geocoding,
    /// Zone names, optionally `&`-joined alternatives.
    Timezone,
}

impl SourceKind {
    /// Get the internal name of this source kind.
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Masterlist => "masterlist",
            SourceKind::Geocoding => "geocoding",
            SourceKind::Timezone => "timezone",
        }
    }
}

/// Line counts for one ingested source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Data lines merged into the trie
    pub accepted: usize,
    /// Blank, comment and malformed lines
    pub ignored: usize,
    /// The source could not be opened and was skipped
    pub skipped: bool,
}

/// Feeds source files into a [`TrieBuilder`] in a fixed order.
#[derive(Debug, Default)]
pub struct Ingestor {
    builder: TrieBuilder,
    country_prefixes: AHashSet<String>,
}

impl Ingestor {
    pub fn new() -> Self {
        Self::with_builder(TrieBuilder::new())
    }

    pub fn with_builder(builder: TrieBuilder) -> Self {
        Self {
            builder,
            country_prefixes: AHashSet::new(),
        }
    }

    /// Ingest every source of `config`, in order.
    pub fn run(config: &BuildConfig) -> Result<TrieBuilder> {
        config.validate()?;

        let mut ingestor = Self::new();
        for source in &config.sources {
            ingestor.ingest_file(&source.path, source.kind)?;
        }
        Ok(ingestor.into_builder())
    }

    /// Ingest one file. A file that cannot be opened is logged and skipped.
    pub fn ingest_file(&mut self, path: &Path, kind: SourceKind) -> Result<IngestStats> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("Skipping {} source {:?}: {}", kind.name(), path, e);
                return Ok(IngestStats {
                    skipped: true,
                    ..IngestStats::default()
                });
            }
        };

        let stats = self.ingest_reader(file, kind)?;
        log::debug!(
            "Ingested {} source {:?}: {} accepted, {} ignored",
            kind.name(),
            path,
            stats.accepted,
            stats.ignored
        );
        Ok(stats)
    }

    /// Ingest lines from a reader.
    ///
    /// Lines are split on raw bytes and decoded lossily, so a badly encoded
    /// line keeps its prefix. A read error ends the source early; lines read
    /// so far are kept.
    pub fn ingest_reader<R: Read>(&mut self, reader: R, kind: SourceKind) -> Result<IngestStats> {
        let mut stats = IngestStats::default();

        for line in BufReader::new(reader).split(b'\n') {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    log::warn!("Stopped reading {} source: {}", kind.name(), e);
                    break;
                }
            };
            let line = String::from_utf8_lossy(&line);

            if self.ingest_line(&line, kind)? {
                stats.accepted += 1;
            } else {
                stats.ignored += 1;
            }
        }

        Ok(stats)
    }

    /// Ingest a single line. Returns whether it carried a record.
    pub fn ingest_line(&mut self, line: &str, kind: SourceKind) -> Result<bool> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() || line.starts_with('#') {
            return Ok(false);
        }
        let (prefix, value) = match line.split_once('|') {
            Some(parts) => parts,
            None => return Ok(false),
        };

        let digits: String = prefix.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Ok(false);
        }

        let fragment = match kind {
            SourceKind::Timezone => RecordFragment::new().timezone(value.trim()),
            SourceKind::Masterlist | SourceKind::Geocoding => match value.split_once(',') {
                Some((city, state)) => RecordFragment::new().city(city.trim()).state(state.trim()),
                None if kind == SourceKind::Masterlist => {
                    self.country_prefixes.insert(digits.clone());
                    RecordFragment::new().state(value.trim())
                }
                None if self.has_country_prefix(&digits) => {
                    RecordFragment::new().city(value.trim())
                }
                None => RecordFragment::new().state(value.trim()),
            },
        };

        self.builder.insert(&digits, fragment)?;
        Ok(true)
    }

    /// Whether a proper leading prefix of `digits` is a registered country prefix.
    fn has_country_prefix(&self, digits: &str) -> bool {
        (1..digits.len()).any(|n| self.country_prefixes.contains(&digits[..n]))
    }

    pub fn builder(&self) -> &TrieBuilder {
        &self.builder
    }

    pub fn into_builder(self) -> TrieBuilder {
        self.builder
    }
}
