//! Binary index format: a flattened digit trie that can be memory-mapped.
//!
//! # File Structure
//!
//! ```text
//! +------------------+
//! |     HEADER       |  20 bytes: magic, version, node_count, record_count, checksum
//! +------------------+
//! |   NODE ARRAY     |  node_count * 44 bytes (10 child slots + record slot)
//! +------------------+
//! |  RECORD ARRAY    |  record_count * 12 bytes (city, state, timezone offsets)
//! +------------------+
//! |   STRING POOL    |  remaining bytes, NUL-terminated strings
//! +------------------+
//! ```
//!
//! Node 0 is the root. Every index and offset is an `i32`, with `-1`
//! meaning absent.

mod format;
mod reader;
pub mod writer;


pub use format::*;
pub use reader::{primary_zone_name, PhoneIndex, ZoneCache, ZONE_SEPARATOR};
pub use writer::{flatten, IndexStats, IndexWriter};
