//! Memory-mapped index reader.
//!
//! [`PhoneIndex::open`] runs every integrity check once. After that the
//! sections are only reached through bounds-checked accessors, because
//! a checksum-valid file can still carry child or record indices that point
//! nowhere.

use ahash::AHashMap;
use chrono_tz::Tz;
use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;

use super::format::*;
use crate::error::IntegrityError;
use crate::{Error, Result};

/// Separator between alternative zone names in a timezone string.
pub const ZONE_SEPARATOR: char = '&';

/// First of the `&`-separated alternatives of a timezone string.
pub fn primary_zone_name(full: &str) -> &str {
    full.split(ZONE_SEPARATOR).next().unwrap_or(full)
}

/// Section boundaries derived from a validated header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    node_count: usize,
    record_count: usize,
    records_start: usize,
    pool_start: usize,
}

impl Layout {
    /// Check the declared counts against the real file size.
    ///
    /// The pool is never declared: it is whatever follows the record array.
    fn validate(header: &IndexHeader, file_len: usize) -> std::result::Result<Self, IntegrityError> {
        let node_count = header.node_count as usize;
        let record_count = header.record_count as usize;

        if node_count == 0 {
            return Err(IntegrityError::MalformedLayout("index has no root node"));
        }
        let nodes_len = node_count
            .checked_mul(NODE_SIZE)
            .ok_or(IntegrityError::MalformedLayout("node section size overflows"))?;
        let records_len = record_count
            .checked_mul(RECORD_SIZE)
            .ok_or(IntegrityError::MalformedLayout("record section size overflows"))?;
        let records_start = HEADER_SIZE
            .checked_add(nodes_len)
            .ok_or(IntegrityError::MalformedLayout("node section size overflows"))?;
        let pool_start = records_start
            .checked_add(records_len)
            .ok_or(IntegrityError::MalformedLayout("record section size overflows"))?;

        if pool_start > file_len {
            return Err(IntegrityError::MalformedLayout(
                "declared sections exceed file size",
            ));
        }

        Ok(Self {
            node_count,
            record_count,
            records_start,
            pool_start,
        })
    }
}

/// Timezone handles resolved once per distinct zone name.
///
/// A name that does not resolve is kept as `None`, so it degrades the
/// timezone of matching lookups without failing the open.
#[derive(Debug, Default)]
pub struct ZoneCache {
    zones: AHashMap<String, Option<Tz>>,
}

impl ZoneCache {
    fn resolve_all(index: &PhoneIndex) -> Self {
        let mut zones = AHashMap::new();
        for idx in 0..index.record_count() {
            let record = match FlatRecord::read(index.records(), idx) {
                Some(record) => record,
                None => break,
            };
            if record.tz_off == ABSENT {
                continue;
            }
            let name = primary_zone_name(index.get_string(record.tz_off));
            if zones.contains_key(name) {
                continue;
            }
            let zone = match name.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(e) => {
                    log::warn!("Unresolvable timezone {:?}: {}", name, e);
                    None
                }
            };
            zones.insert(name.to_owned(), zone);
        }
        Self { zones }
    }

    /// Resolved zone for `name`, or `None` if unknown or unresolvable.
    pub fn get(&self, name: &str) -> Option<Tz> {
        self.zones.get(name).copied().flatten()
    }

    /// Whether `name` was referenced by the index but failed to resolve.
    pub fn is_unresolvable(&self, name: &str) -> bool {
        matches!(self.zones.get(name), Some(None))
    }

    /// Number of distinct zone names referenced by the index.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Memory-mapped phone prefix index.
///
/// The mapping is read-only and released when the index is dropped.
/// Lookups take `&self` and may run concurrently.
pub struct PhoneIndex {
    mmap: Mmap,
    header: IndexHeader,
    layout: Layout,
    zones: ZoneCache,
}

impl PhoneIndex {
    /// Open and validate an index file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(empty_file());
        }
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_mmap(mmap)
    }

    /// Open an index from bytes.
    ///
    /// This writes the data to a temp file and then memory-maps it.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        use std::io::Write;

        if data.is_empty() {
            return Err(empty_file());
        }

        let mut temp_file = tempfile::tempfile()?;
        temp_file.write_all(&data)?;

        let mmap = unsafe { Mmap::map(&temp_file)? };
        Self::from_mmap(mmap)
    }

    fn from_mmap(mmap: Mmap) -> Result<Self> {
        let header = IndexHeader::from_bytes(&mmap)?;
        header.validate()?;

        let computed = payload_checksum(&mmap[HEADER_SIZE..]);
        if computed != header.checksum {
            return Err(IntegrityError::ChecksumMismatch {
                stored: header.checksum,
                computed,
            }
            .into());
        }

        let layout = Layout::validate(&header, mmap.len())?;

        let mut index = Self {
            mmap,
            header,
            layout,
            zones: ZoneCache::default(),
        };
        index.zones = ZoneCache::resolve_all(&index);

        log::info!(
            "Opened index: {} nodes, {} records, {} pool bytes, {} zones",
            index.node_count(),
            index.record_count(),
            index.pool_size(),
            index.zones.len()
        );
        Ok(index)
    }

    /// Get the file header.
    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    pub fn node_count(&self) -> usize {
        self.layout.node_count
    }

    pub fn record_count(&self) -> usize {
        self.layout.record_count
    }

    /// Size of the string pool in bytes.
    pub fn pool_size(&self) -> usize {
        self.mmap.len() - self.layout.pool_start
    }

    pub fn zones(&self) -> &ZoneCache {
        &self.zones
    }

    /// Resolved zone for a primary zone name.
    pub fn zone(&self, name: &str) -> Option<Tz> {
        self.zones.get(name)
    }

    /// Resolve a pool offset to its string.
    ///
    /// Returns [`UNKNOWN`] for [`ABSENT`], for offsets outside the pool, and
    /// for entries with no terminating NUL before the end of the pool.
    pub fn get_string(&self, offset: i32) -> &str {
        let pool = self.pool();
        let start = match usize::try_from(offset) {
            Ok(start) if start < pool.len() => start,
            _ => return UNKNOWN,
        };
        let rest = &pool[start..];
        match rest.iter().position(|&b| b == 0) {
            Some(end) => std::str::from_utf8(&rest[..end]).unwrap_or(UNKNOWN),
            None => UNKNOWN,
        }
    }

    /// Child of `node` for `digit`, if it exists and is a valid node index.
    #[inline]
    pub(crate) fn child(&self, node: usize, digit: usize) -> Option<usize> {
        if node >= self.layout.node_count || digit >= FANOUT {
            return None;
        }
        let next = read_i32(self.nodes(), child_slot_offset(node, digit))?;
        usize::try_from(next)
            .ok()
            .filter(|&n| n < self.layout.node_count)
    }

    /// Record attached to `node`, if its record index is valid.
    #[inline]
    pub(crate) fn record_of(&self, node: usize) -> Option<FlatRecord> {
        if node >= self.layout.node_count {
            return None;
        }
        let idx = read_i32(self.nodes(), record_slot_offset(node))?;
        let idx = usize::try_from(idx)
            .ok()
            .filter(|&i| i < self.layout.record_count)?;
        FlatRecord::read(self.records(), idx)
    }

    fn nodes(&self) -> &[u8] {
        self.mmap
            .get(HEADER_SIZE..self.layout.records_start)
            .unwrap_or_default()
    }

    fn records(&self) -> &[u8] {
        self.mmap
            .get(self.layout.records_start..self.layout.pool_start)
            .unwrap_or_default()
    }

    fn pool(&self) -> &[u8] {
        self.mmap.get(self.layout.pool_start..).unwrap_or_default()
    }
}

impl std::fmt::Debug for PhoneIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhoneIndex")
            .field("header", &self.header)
            .field("pool_size", &self.pool_size())
            .field("zones", &self.zones.len())
            .finish()
    }
}

fn empty_file() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "index file is empty",
    ))
}
