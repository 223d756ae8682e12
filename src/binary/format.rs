//! Binary format constants and structures.
//!
//! All integers are little-endian and fixed-width. Nothing is padded, and
//! nothing is read by casting pointers into the mapping: every field goes
//! through the bounds-checked helpers at the bottom of this module.

use crate::error::IntegrityError;

/// Magic constant identifying a mitu index ("MITU").
pub const MAGIC: u32 = 0x4D49_5455;

/// Current format version. Readers accept this exact value only.
pub const FORMAT_VERSION: u32 = 1;

/// Header size in bytes (five packed u32 fields).
pub const HEADER_SIZE: usize = 20;

/// Number of child slots per node, one per decimal digit.
pub const FANOUT: usize = 10;

/// Serialized node size: 10 child slots plus the record slot.
pub const NODE_SIZE: usize = (FANOUT + 1) * 4;

/// Serialized record size: city, state and timezone offsets.
pub const RECORD_SIZE: usize = 3 * 4;

/// Encoding of "no child", "no record" and "no string".
pub const ABSENT: i32 = -1;

/// Returned for string offsets that are absent or do not resolve.
pub const UNKNOWN: &str = "Unknown";

/// Fixed-size file header.
///
/// `checksum` is the bitwise complement of the CRC-32 of everything that
/// follows the header: node array, record array, then pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub magic: u32,
    pub version: u32,
    pub node_count: u32,
    pub record_count: u32,
    pub checksum: u32,
}

impl IndexHeader {
    /// Create a header for the current format.
    pub fn new(node_count: u32, record_count: u32, checksum: u32) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            node_count,
            record_count,
            checksum,
        }
    }

    /// Decode a header from the start of `data`.
    pub fn from_bytes(data: &[u8]) -> Result<Self, IntegrityError> {
        if data.len() < HEADER_SIZE {
            return Err(IntegrityError::TruncatedHeader {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        let field = |i: usize| read_u32(data, i * 4).unwrap_or_default();
        Ok(Self {
            magic: field(0),
            version: field(1),
            node_count: field(2),
            record_count: field(3),
            checksum: field(4),
        })
    }

    /// Encode the header.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let fields = [
            self.magic,
            self.version,
            self.node_count,
            self.record_count,
            self.checksum,
        ];
        for (chunk, value) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Validate the header magic and version.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        if self.magic != MAGIC {
            return Err(IntegrityError::BadMagic(self.magic));
        }
        if self.version != FORMAT_VERSION {
            return Err(IntegrityError::VersionMismatch {
                found: self.version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(())
    }
}

/// Serialized trie node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatNode {
    /// Node index per digit, or [`ABSENT`]
    pub children: [i32; FANOUT],
    /// Index into the record array, or [`ABSENT`]
    pub record_idx: i32,
}

impl Default for FlatNode {
    fn default() -> Self {
        Self {
            children: [ABSENT; FANOUT],
            record_idx: ABSENT,
        }
    }
}

impl FlatNode {
    pub fn write_to(&self, out: &mut Vec<u8>) {
        for child in &self.children {
            out.extend_from_slice(&child.to_le_bytes());
        }
        out.extend_from_slice(&self.record_idx.to_le_bytes());
    }

    /// Decode the node at `index` from a node section.
    pub fn read(nodes: &[u8], index: usize) -> Option<Self> {
        let base = index.checked_mul(NODE_SIZE)?;
        let mut node = Self::default();
        for (digit, slot) in node.children.iter_mut().enumerate() {
            *slot = read_i32(nodes, base + digit * 4)?;
        }
        node.record_idx = read_i32(nodes, base + FANOUT * 4)?;
        Some(node)
    }
}

/// Serialized metadata record: three string pool offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatRecord {
    pub city_off: i32,
    pub state_off: i32,
    pub tz_off: i32,
}

impl Default for FlatRecord {
    fn default() -> Self {
        Self {
            city_off: ABSENT,
            state_off: ABSENT,
            tz_off: ABSENT,
        }
    }
}

impl FlatRecord {
    /// Whether every field is absent.
    pub fn is_empty(&self) -> bool {
        self.city_off == ABSENT && self.state_off == ABSENT && self.tz_off == ABSENT
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.city_off.to_le_bytes());
        out.extend_from_slice(&self.state_off.to_le_bytes());
        out.extend_from_slice(&self.tz_off.to_le_bytes());
    }

    /// Decode the record at `index` from a record section.
    pub fn read(records: &[u8], index: usize) -> Option<Self> {
        let base = index.checked_mul(RECORD_SIZE)?;
        Some(Self {
            city_off: read_i32(records, base)?,
            state_off: read_i32(records, base + 4)?,
            tz_off: read_i32(records, base + 8)?,
        })
    }
}

/// Byte offset of `digit`'s child slot of node `index` within the node section.
#[inline]
pub fn child_slot_offset(index: usize, digit: usize) -> usize {
    index * NODE_SIZE + digit * 4
}

/// Byte offset of the record slot of node `index` within the node section.
#[inline]
pub fn record_slot_offset(index: usize) -> usize {
    index * NODE_SIZE + FANOUT * 4
}

/// Read a little-endian `i32` at `offset`, or `None` if out of bounds.
#[inline]
pub fn read_i32(data: &[u8], offset: usize) -> Option<i32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(i32::from_le_bytes(bytes.try_into().ok()?))
}

/// Read a little-endian `u32` at `offset`, or `None` if out of bounds.
#[inline]
pub fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// Checksum stored in the header for the given payload (inverted CRC-32).
pub fn payload_checksum(payload: &[u8]) -> u32 {
    !crc32fast::hash(payload)
}
