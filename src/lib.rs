//! mitu - offline phone number prefix lookup.
//!
//! Maps E.164 number prefixes to city, state/region and timezone using a
//! compact binary index that is built ahead of time and memory-mapped at
//! query time.
//!
//! # Features
//!
//! - **Digit trie builder**: merge `prefix|value` records field by field
//! - **Flat binary index**: pointer-free node and record arrays plus a string pool
//! - **Integrity checks**: magic, exact version, CRC-32 and section bounds
//!   are validated before any lookup
//! - **Longest-prefix lookup**: O(digits), no allocation per query
//! - **Timezone resolution**: zone names are resolved once at open time
//!
//! # Quick Start
//!
//! ```ignore
//! use mitu::{IndexWriter, PhoneIndex, RecordFragment, TrieBuilder};
//! use std::path::Path;
//!
//! let mut trie = TrieBuilder::new();
//! trie.insert("1212", RecordFragment::new().city("New York").state("NY"))?;
//! trie.insert("1212555", RecordFragment::new().timezone("America/New_York"))?;
//! IndexWriter::new().write_to(&trie, Path::new("mitu.db"))?;
//!
//! let index = PhoneIndex::open(Path::new("mitu.db"))?;
//! let result = index.lookup("12125550100");
//! ```
//!
//! # Building from data files
//!
//! ```ignore
//! use mitu::{BuildConfig, Ingestor, IndexWriter};
//!
//! let config = BuildConfig::load(Path::new("build.yaml"))?;
//! let trie = Ingestor::run(&config)?;
//! IndexWriter::new().write_to(&trie, &config.output)?;
//! ```

mod error;

pub mod binary;
pub mod config;
pub mod ingest;
pub mod lookup;
pub mod trie;

// Re-export core types
pub use error::{Error, IntegrityError, Result};

pub use binary::{IndexStats, IndexWriter, PhoneIndex, FORMAT_VERSION};
pub use config::{BuildConfig, SourceSpec};
pub use ingest::{IngestStats, Ingestor, SourceKind};
pub use lookup::{sanitize_digits, Location, LookupResult, TimeFormat, MAX_DIGITS};
pub use trie::{RecordFragment, StringPool, TrieBuilder};
