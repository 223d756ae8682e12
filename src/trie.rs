//! Build-time digit trie and string pool.
//!
//! The trie is a plain owned tree: every node owns its children through
//! `Box`, and nothing is shared. It is the only mutable state of a build and
//! is discarded once [`crate::binary::IndexWriter`] has flattened it.

use ahash::AHashMap;

use crate::binary::{FlatRecord, ABSENT, FANOUT};
use crate::{Error, Result};

/// Largest pool size addressable by a non-negative `i32` offset.
const MAX_POOL_SIZE: usize = i32::MAX as usize;

/// Append-only buffer of NUL-terminated strings addressed by byte offset.
///
/// Offsets never move once handed out. Identical strings share one entry.
#[derive(Debug)]
pub struct StringPool {
    bytes: Vec<u8>,
    interned: AHashMap<String, i32>,
    limit: usize,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    pub fn new() -> Self {
        Self::with_limit(MAX_POOL_SIZE)
    }

    pub(crate) fn with_limit(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            interned: AHashMap::new(),
            limit: limit.min(MAX_POOL_SIZE),
        }
    }

    /// Add a string and return its offset.
    ///
    /// Empty strings are not stored and yield `None`. Anything after an
    /// embedded NUL would be unreachable by readers, so it is dropped here.
    pub fn intern(&mut self, s: &str) -> Result<Option<i32>> {
        let s = match s.find('\0') {
            Some(end) => &s[..end],
            None => s,
        };
        if s.is_empty() {
            return Ok(None);
        }
        if let Some(&offset) = self.interned.get(s) {
            return Ok(Some(offset));
        }

        let offset = self.bytes.len();
        let end = offset + s.len() + 1;
        if end > self.limit {
            return Err(Error::PoolOverflow { size: end });
        }

        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);

        let offset = offset as i32;
        self.interned.insert(s.to_owned(), offset);
        Ok(Some(offset))
    }

    /// Resolve an offset handed out by [`StringPool::intern`].
    pub fn get(&self, offset: i32) -> Option<&str> {
        let start = usize::try_from(offset).ok()?;
        let rest = self.bytes.get(start..)?;
        let end = rest.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&rest[..end]).ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Partial metadata supplied for one prefix.
///
/// `None` fields leave whatever the node already carries untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFragment<'a> {
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    pub timezone: Option<&'a str>,
}

impl<'a> RecordFragment<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn city(mut self, city: &'a str) -> Self {
        self.city = Some(city);
        self
    }

    pub fn state(mut self, state: &'a str) -> Self {
        self.state = Some(state);
        self
    }

    pub fn timezone(mut self, timezone: &'a str) -> Self {
        self.timezone = Some(timezone);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.state.is_none() && self.timezone.is_none()
    }
}

/// Pool offsets carried by a trie node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeRecord {
    pub city: Option<i32>,
    pub state: Option<i32>,
    pub timezone: Option<i32>,
}

impl NodeRecord {
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.state.is_none() && self.timezone.is_none()
    }

    pub fn to_flat(self) -> FlatRecord {
        FlatRecord {
            city_off: self.city.unwrap_or(ABSENT),
            state_off: self.state.unwrap_or(ABSENT),
            tz_off: self.timezone.unwrap_or(ABSENT),
        }
    }
}

/// A node of the build-time trie.
#[derive(Debug, Default)]
pub struct TrieNode {
    pub(crate) children: [Option<Box<TrieNode>>; FANOUT],
    pub(crate) record: NodeRecord,
}

impl TrieNode {
    pub fn child(&self, digit: usize) -> Option<&TrieNode> {
        self.children.get(digit)?.as_deref()
    }

    pub fn record(&self) -> &NodeRecord {
        &self.record
    }
}

/// Accumulates prefix records into a digit trie.
#[derive(Debug)]
pub struct TrieBuilder {
    root: TrieNode,
    pool: StringPool,
    node_count: usize,
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieBuilder {
    pub fn new() -> Self {
        Self {
            root: TrieNode::default(),
            pool: StringPool::new(),
            node_count: 1,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_pool(pool: StringPool) -> Self {
        Self {
            pool,
            ..Self::new()
        }
    }

    /// Merge `fragment` into the node for `prefix`, creating the path as needed.
    ///
    /// Non-digit characters in `prefix` are skipped. Each field present in
    /// the fragment replaces that field of the node; other fields are kept.
    /// A prefix without digits addresses the root, which never matches, so
    /// it is ignored.
    pub fn insert(&mut self, prefix: &str, fragment: RecordFragment<'_>) -> Result<()> {
        if !prefix.bytes().any(|b| b.is_ascii_digit()) {
            log::debug!("Ignoring record without digits: {:?}", prefix);
            return Ok(());
        }

        let city = intern_field(&mut self.pool, fragment.city)?;
        let state = intern_field(&mut self.pool, fragment.state)?;
        let timezone = intern_field(&mut self.pool, fragment.timezone)?;

        let mut created = 0;
        let mut node = &mut self.root;
        for b in prefix.bytes().filter(u8::is_ascii_digit) {
            let slot = &mut node.children[(b - b'0') as usize];
            if slot.is_none() {
                created += 1;
            }
            node = &mut **slot.get_or_insert_with(Box::default);
        }
        self.node_count += created;

        let record = &mut node.record;
        if city.is_some() {
            record.city = city;
        }
        if state.is_some() {
            record.state = state;
        }
        if timezone.is_some() {
            record.timezone = timezone;
        }
        Ok(())
    }

    /// Find the node for `prefix` (non-digits skipped).
    pub fn find(&self, prefix: &str) -> Option<&TrieNode> {
        prefix
            .bytes()
            .filter(u8::is_ascii_digit)
            .try_fold(&self.root, |node, b| node.child((b - b'0') as usize))
    }

    /// Resolve the strings stored for exactly `prefix`.
    pub fn get(&self, prefix: &str) -> Option<(Option<&str>, Option<&str>, Option<&str>)> {
        let record = self.find(prefix)?.record;
        let resolve = |off: Option<i32>| off.and_then(|o| self.pool.get(o));
        Some((
            resolve(record.city),
            resolve(record.state),
            resolve(record.timezone),
        ))
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    pub fn pool(&self) -> &StringPool {
        &self.pool
    }

    /// Number of nodes including the root.
    pub fn node_count(&self) -> usize {
        self.node_count
    }
}

fn intern_field(pool: &mut StringPool, value: Option<&str>) -> Result<Option<i32>> {
    match value {
        Some(v) => pool.intern(v),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_offsets_are_stable() {
        let mut pool = StringPool::new();
        let a = pool.intern("New York").unwrap().unwrap();
        let b = pool.intern("NY").unwrap().unwrap();

        assert_eq!(a, 0);
        assert_eq!(b, "New York".len() as i32 + 1);
        assert_eq!(pool.as_bytes(), b"New York\0NY\0");
        assert_eq!(pool.get(a), Some("New York"));
        assert_eq!(pool.get(b), Some("NY"));
    }

    #[test]
    fn test_pool_interns_duplicates() {
        let mut pool = StringPool::new();
        let a = pool.intern("America/Chicago").unwrap();
        let len = pool.len();
        let b = pool.intern("America/Chicago").unwrap();

        assert_eq!(a, b);
        assert_eq!(pool.len(), len);
    }

    #[test]
    fn test_pool_empty_string_is_absent() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern("").unwrap(), None);
        assert_eq!(pool.intern("\0tail").unwrap(), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_pool_truncates_at_embedded_nul() {
        let mut pool = StringPool::new();
        let off = pool.intern("Paris\0garbage").unwrap().unwrap();
        assert_eq!(pool.get(off), Some("Paris"));
        assert_eq!(pool.len(), "Paris".len() + 1);
    }

    #[test]
    fn test_pool_overflow() {
        let mut pool = StringPool::with_limit(8);
        assert!(pool.intern("abc").unwrap().is_some()); // 4 bytes
        assert!(pool.intern("def").unwrap().is_some()); // 8 bytes
        match pool.intern("g") {
            Err(Error::PoolOverflow { size }) => assert_eq!(size, 10),
            other => panic!("expected overflow, got {:?}", other),
        }
        // Nothing was appended by the failed call
        assert_eq!(pool.len(), 8);
    }

    #[test]
    fn test_insert_creates_path() {
        let mut trie = TrieBuilder::new();
        trie.insert("1212", RecordFragment::new().city("New York").state("NY"))
            .unwrap();

        assert_eq!(trie.node_count(), 5);
        assert!(trie.find("121").unwrap().record().is_empty());
        assert_eq!(
            trie.get("1212"),
            Some((Some("New York"), Some("NY"), None))
        );
        assert!(trie.find("1213").is_none());
    }

    #[test]
    fn test_insert_skips_non_digits() {
        let mut trie = TrieBuilder::new();
        trie.insert("+1 (212)", RecordFragment::new().state("NY"))
            .unwrap();

        assert_eq!(trie.get("1212"), Some((None, Some("NY"), None)));
        assert_eq!(trie.node_count(), 5);
    }

    #[test]
    fn test_insert_without_digits_is_ignored() {
        let mut trie = TrieBuilder::new();
        trie.insert("abc", RecordFragment::new().city("Nowhere"))
            .unwrap();

        assert_eq!(trie.node_count(), 1);
        assert!(trie.root().record().is_empty());
        assert!(trie.pool().is_empty());
    }

    #[test]
    fn test_insert_merges_per_field() {
        let mut trie = TrieBuilder::new();
        trie.insert("44", RecordFragment::new().city("London").state("UK-generic"))
            .unwrap();
        trie.insert("44", RecordFragment::new().timezone("Europe/London"))
            .unwrap();
        trie.insert("44", RecordFragment::new().state("United Kingdom"))
            .unwrap();

        assert_eq!(
            trie.get("44"),
            Some((
                Some("London"),
                Some("United Kingdom"),
                Some("Europe/London")
            ))
        );
        assert_eq!(trie.node_count(), 3);
    }

    #[test]
    fn test_empty_field_does_not_clear() {
        let mut trie = TrieBuilder::new();
        trie.insert("33", RecordFragment::new().state("France"))
            .unwrap();
        trie.insert("33", RecordFragment::new().state(""))
            .unwrap();

        assert_eq!(trie.get("33"), Some((None, Some("France"), None)));
    }

    #[test]
    fn test_record_to_flat() {
        let record = NodeRecord {
            city: Some(4),
            state: None,
            timezone: Some(0),
        };
        assert_eq!(
            record.to_flat(),
            FlatRecord {
                city_off: 4,
                state_off: ABSENT,
                tz_off: 0
            }
        );
        assert!(NodeRecord::default().to_flat().is_empty());
    }
}
