//! Sparse tree of placeholders built from dotted headers.
//!
//! Interior nodes are created on demand while a path is walked; leaves hold
//! the slot index of the placeholder bound to that position.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::path::{Path, SEPARATOR_STR};
use crate::{Error, Result};

pub type Slot = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Slot),
    Branch(Branch),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Branch {
    children: IndexMap<SmolStr, Node>,
}

impl Branch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn get(&self, segment: &str) -> Option<&Node> {
        self.children.get(segment)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, SmolStr, Node> {
        self.children.iter()
    }

    /// Return the child branch under `segment`, creating it when absent.
    ///
    /// Fails with `None` when a leaf already occupies `segment`.
    pub fn get_or_create_child(&mut self, segment: &SmolStr) -> Option<&mut Branch> {
        let child = self
            .children
            .entry(segment.clone())
            .or_insert_with(|| Node::Branch(Branch::new()));
        match child {
            Node::Branch(branch) => Some(branch),
            Node::Leaf(_) => None,
        }
    }

    /// Bind `slot` at `path`, replacing any leaf or subtree already there.
    pub fn set(&mut self, path: &Path, slot: Slot) -> Result<Slot> {
        let mut branch = self;
        for (depth, segment) in path.parents().iter().enumerate() {
            branch = match branch.get_or_create_child(segment.as_smol_str()) {
                Some(child) => child,
                None => return Err(conflict(path, depth)),
            };
        }
        branch
            .children
            .insert(path.last().as_smol_str().clone(), Node::Leaf(slot));
        Ok(slot)
    }
}

fn conflict(path: &Path, depth: usize) -> Error {
    let prefix = path.parents()[..=depth]
        .iter()
        .map(|segment| segment.as_str())
        .collect::<Vec<_>>()
        .join(SEPARATOR_STR);
    Error::PathConflict {
        header: path.to_string(),
        prefix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf<'a>(branch: &'a Branch, dotted: &str) -> Option<&'a Node> {
        let path = Path::parse(dotted);
        let mut current = branch;
        for segment in path.parents() {
            match current.get(segment.as_str())? {
                Node::Branch(next) => current = next,
                Node::Leaf(_) => return None,
            }
        }
        current.get(path.last().as_str())
    }

    #[test]
    fn set_creates_intermediate_nodes() {
        let mut root = Branch::new();
        root.set(&Path::parse("a.0.def"), 0).unwrap();
        root.set(&Path::parse("a.1"), 1).unwrap();
        root.set(&Path::parse("status"), 2).unwrap();

        assert_eq!(root.len(), 2);
        assert_eq!(leaf(&root, "a.0.def"), Some(&Node::Leaf(0)));
        assert_eq!(leaf(&root, "a.1"), Some(&Node::Leaf(1)));
        assert_eq!(leaf(&root, "status"), Some(&Node::Leaf(2)));
        let keys: Vec<&str> = root.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["a", "status"]);
    }

    #[test]
    fn set_same_path_overwrites() {
        let mut root = Branch::new();
        root.set(&Path::parse("a.b"), 0).unwrap();
        root.set(&Path::parse("a.b"), 1).unwrap();
        assert_eq!(leaf(&root, "a.b"), Some(&Node::Leaf(1)));
    }

    #[test]
    fn leaf_replaces_subtree() {
        let mut root = Branch::new();
        root.set(&Path::parse("a.b"), 0).unwrap();
        root.set(&Path::parse("a"), 1).unwrap();
        assert_eq!(root.get("a"), Some(&Node::Leaf(1)));
    }

    #[test]
    fn descending_through_leaf_conflicts() {
        let mut root = Branch::new();
        root.set(&Path::parse("a"), 0).unwrap();
        let err = root.set(&Path::parse("a.b.c"), 1).unwrap_err();
        match err {
            Error::PathConflict { header, prefix } => {
                assert_eq!(header, "a.b.c");
                assert_eq!(prefix, "a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
