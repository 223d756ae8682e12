//! Index writer: flattens the build-time trie into the binary artifact.

use std::fs;
use std::path::Path;

use super::format::*;
use crate::trie::{TrieBuilder, TrieNode};
use crate::{Error, Result};

/// Sizes of a written index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub node_count: usize,
    pub record_count: usize,
    pub pool_size: usize,
    pub file_size: usize,
}

/// Binary index writer.
pub struct IndexWriter {
    buffer: Vec<u8>,
}

impl Default for IndexWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexWriter {
    /// Create a new writer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(1024 * 1024), // 1MB initial
        }
    }

    /// Serialize the trie: header, node array, record array, string pool.
    pub fn write(&mut self, trie: &TrieBuilder) -> Result<Vec<u8>> {
        let (nodes, records) = flatten(trie.root())?;
        let pool = trie.pool().as_bytes();
        if pool.len() > i32::MAX as usize {
            return Err(Error::PoolOverflow { size: pool.len() });
        }

        self.buffer.clear();

        // Reserve space for header
        self.buffer.resize(HEADER_SIZE, 0);

        self.buffer.reserve(nodes.len() * NODE_SIZE + records.len() * RECORD_SIZE + pool.len());
        for node in &nodes {
            node.write_to(&mut self.buffer);
        }
        for record in &records {
            record.write_to(&mut self.buffer);
        }
        self.buffer.extend_from_slice(pool);

        let checksum = payload_checksum(&self.buffer[HEADER_SIZE..]);
        let header = IndexHeader::new(nodes.len() as u32, records.len() as u32, checksum);
        self.buffer[..HEADER_SIZE].copy_from_slice(&header.to_bytes());

        Ok(std::mem::take(&mut self.buffer))
    }

    /// Serialize the trie and write it to `path`.
    ///
    /// The artifact is written next to `path` under a `.tmp` suffix and
    /// renamed into place, so `path` never holds a partial index.
    pub fn write_to(&mut self, trie: &TrieBuilder, path: &Path) -> Result<IndexStats> {
        let data = self.write(trie)?;
        let header = IndexHeader::from_bytes(&data)?;

        let mut temp_path = path.as_os_str().to_owned();
        temp_path.push(".tmp");

        if let Err(e) = fs::write(&temp_path, &data).and_then(|_| fs::rename(&temp_path, path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        let stats = IndexStats {
            node_count: header.node_count as usize,
            record_count: header.record_count as usize,
            pool_size: trie.pool().len(),
            file_size: data.len(),
        };
        log::info!(
            "Wrote index {:?}: {} nodes, {} records, {} pool bytes ({} bytes total)",
            path,
            stats.node_count,
            stats.record_count,
            stats.pool_size,
            stats.file_size
        );
        Ok(stats)
    }
}

/// Flatten the trie into index-addressed node and record arrays.
///
/// Pass one walks breadth-first, so the root gets id 0 and every node's id
/// is its position in the visit order. Children of a node are queued
/// contiguously in digit order, which is all pass two needs to turn child
/// pointers into ids: it only remembers where each node's children start.
pub fn flatten(root: &TrieNode) -> Result<(Vec<FlatNode>, Vec<FlatRecord>)> {
    let mut queue: Vec<&TrieNode> = vec![root];
    let mut first_child: Vec<usize> = Vec::new();
    let mut nodes: Vec<FlatNode> = Vec::new();
    let mut records: Vec<FlatRecord> = Vec::new();

    let mut next = 0;
    while next < queue.len() {
        let node = queue[next];
        next += 1;

        let mut flat = FlatNode::default();
        if !node.record.is_empty() {
            flat.record_idx = to_index(records.len())?;
            records.push(node.record.to_flat());
        }
        nodes.push(flat);

        first_child.push(queue.len());
        queue.extend(node.children.iter().flatten().map(|child| &**child));
    }
    to_index(queue.len())?;

    for (id, node) in queue.iter().enumerate() {
        let mut child_id = first_child[id];
        for (digit, child) in node.children.iter().enumerate() {
            if child.is_some() {
                nodes[id].children[digit] = to_index(child_id)?;
                child_id += 1;
            }
        }
    }

    Ok((nodes, records))
}

fn to_index(value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::NodeOverflow { count: value })
}
