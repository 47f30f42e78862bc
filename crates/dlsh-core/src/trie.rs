#![forbid(unsafe_code)]

//! Prefix index over every command line ever accepted.
//!
//! Nodes live in a [`Slab`] arena and refer to each other by [`NodeId`]. Each
//! node stores its parent id, so the line ending at a node is rebuilt by
//! walking up to the root; no node stores a full string.
//!
//! Besides the tree, the trie keeps the chronological list of inserted lines
//! as node ids. The same node can appear many times in that list; recall and
//! suggestion ranking both work off list positions, so the most recent use of
//! a line is what counts.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use slab::Slab;

use crate::priority_heap::{HeapKind, PriorityHeap};

/// Handle to a node in a [`Trie`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrieError {
    /// A line-list position past the composing slot.
    IndexOutOfRange { index: usize, len: usize },
    /// The line was never inserted.
    NotFound(String),
}

impl fmt::Display for TrieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "history index {index} out of range (0..={len})")
            }
            Self::NotFound(line) => write!(f, "no history entry {line:?}"),
        }
    }
}

impl std::error::Error for TrieError {}

#[derive(Debug, Clone)]
struct TrieNode {
    ch: char,
    parent: Option<NodeId>,
    children: BTreeMap<char, NodeId>,
    word: bool,
}

impl TrieNode {
    fn new(ch: char, parent: Option<NodeId>) -> Self {
        Self {
            ch,
            parent,
            children: BTreeMap::new(),
            word: false,
        }
    }
}

/// Arena-backed character trie with an insertion-ordered line list.
#[derive(Debug, Clone)]
pub struct Trie {
    nodes: Slab<TrieNode>,
    root: NodeId,
    lines: Vec<NodeId>,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Slab::new();
        let root = NodeId(nodes.insert(TrieNode::new('\0', None)));
        Self {
            nodes,
            root,
            lines: Vec::new(),
        }
    }

    /// Number of entries in the line list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Record `line` as the newest entry and return its word node.
    pub fn insert(&mut self, line: &str) -> NodeId {
        let mut cur = self.root;
        for ch in line.chars() {
            cur = match self.nodes[cur.0].children.get(&ch) {
                Some(&child) => child,
                None => {
                    let child = NodeId(self.nodes.insert(TrieNode::new(ch, Some(cur))));
                    self.nodes[cur.0].children.insert(ch, child);
                    child
                }
            };
        }
        self.nodes[cur.0].word = true;
        self.lines.push(cur);
        cur
    }

    /// Node at `prefix`'s end, if that path exists.
    #[must_use]
    pub fn find(&self, prefix: &str) -> Option<NodeId> {
        prefix.chars().try_fold(self.root, |cur, ch| {
            self.nodes[cur.0].children.get(&ch).copied()
        })
    }

    #[must_use]
    pub fn contains(&self, line: &str) -> bool {
        self.find(line).is_some_and(|id| self.nodes[id.0].word)
    }

    /// Rank the stored lines that extend `prefix`.
    ///
    /// Returns `None` for an empty prefix and an empty heap when no stored line
    /// starts with it. Each distinct matching line appears once, weighted by
    /// the position of its most recent use, in a max-heap.
    #[must_use]
    pub fn search(&self, prefix: &str) -> Option<PriorityHeap<NodeId>> {
        if prefix.is_empty() {
            return None;
        }
        let mut heap = PriorityHeap::new(HeapKind::Max);
        let Some(start) = self.find(prefix) else {
            return Some(heap);
        };

        let mut latest: HashMap<NodeId, usize> = HashMap::new();
        for (index, &id) in self.lines.iter().enumerate() {
            latest.insert(id, index);
        }

        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.word
                && let Some(&index) = latest.get(&id)
            {
                if let Err(err) = heap.insert(id, index) {
                    crate::debug!(%err, index, "candidate dropped");
                    debug_assert!(false, "fresh heap refused a candidate: {err}");
                }
            }
            stack.extend(node.children.values().copied());
        }
        Some(heap)
    }

    /// Node recorded at `index`; `None` at the composing slot (`index == len`).
    pub fn node_at(&self, index: usize) -> Result<Option<NodeId>, TrieError> {
        match index.cmp(&self.lines.len()) {
            std::cmp::Ordering::Less => Ok(Some(self.lines[index])),
            std::cmp::Ordering::Equal => Ok(None),
            std::cmp::Ordering::Greater => Err(TrieError::IndexOutOfRange {
                index,
                len: self.lines.len(),
            }),
        }
    }

    /// Line recorded at `index`; empty at the composing slot.
    pub fn line_at(&self, index: usize) -> Result<String, TrieError> {
        Ok(self
            .node_at(index)?
            .map(|id| self.line_of(id))
            .unwrap_or_default())
    }

    /// Rebuild the string ending at `id` by walking parent links.
    #[must_use]
    pub fn line_of(&self, id: NodeId) -> String {
        let mut chars = Vec::new();
        let mut cur = Some(id);
        while let Some(node_id) = cur {
            let Some(node) = self.nodes.get(node_id.0) else {
                break;
            };
            if node.parent.is_some() {
                chars.push(node.ch);
            }
            cur = node.parent;
        }
        chars.iter().rev().collect()
    }

    /// Every stored line in key order, once each.
    #[must_use]
    pub fn words(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.word {
                out.push(self.line_of(id));
            }
            // Reverse so the smallest key is popped first.
            stack.extend(node.children.values().rev().copied());
        }
        out
    }

    /// Lines in insertion order, repeats included.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.lines.iter().map(|&id| self.line_of(id))
    }

    /// Forget `line` entirely and prune the branch it leaves unused.
    pub fn delete(&mut self, line: &str) -> Result<(), TrieError> {
        let id = self
            .find(line)
            .filter(|id| self.nodes[id.0].word)
            .ok_or_else(|| TrieError::NotFound(line.to_string()))?;

        self.lines.retain(|&entry| entry != id);
        self.nodes[id.0].word = false;

        let mut cur = id;
        while cur != self.root {
            let node = &self.nodes[cur.0];
            if node.word || !node.children.is_empty() {
                break;
            }
            let (ch, parent) = (node.ch, node.parent);
            self.nodes.remove(cur.0);
            let Some(parent) = parent else { break };
            self.nodes[parent.0].children.remove(&ch);
            cur = parent;
        }
        Ok(())
    }

    /// Live arena nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
