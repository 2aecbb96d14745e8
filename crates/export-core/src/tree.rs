//! Arena of discovered pages
//!
//! Nodes refer to each other by index, so a parent never owns its children
//! and the whole tree can be walked without recursion limits. Ids are unique
//! across the arena; inserting an id twice means the remote hierarchy has a
//! cycle or lists a page under two parents.

use std::collections::HashMap;

use crate::error::{ExportError, Result};
use crate::models::PageRef;

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub page: PageRef,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct ContentTree {
    nodes: Vec<TreeNode>,
    index: HashMap<u64, usize>,
    /// Ancestors of the root that are not themselves exported
    base_ancestors: Vec<PageRef>,
}

impl ContentTree {
    pub const ROOT: usize = 0;

    pub fn new(root: PageRef, base_ancestors: Vec<PageRef>) -> Result<Self> {
        if base_ancestors.iter().any(|a| a.id == root.id) {
            return Err(ExportError::Structure(format!(
                "page {} appears in its own ancestor chain",
                root.id
            )));
        }

        let mut index = HashMap::new();
        index.insert(root.id, Self::ROOT);

        Ok(Self {
            nodes: vec![TreeNode {
                page: root,
                parent: None,
                children: Vec::new(),
            }],
            index,
            base_ancestors,
        })
    }

    /// Add `page` as the last child of `parent`, returning its index
    pub fn insert_child(&mut self, parent: usize, page: PageRef) -> Result<usize> {
        if parent >= self.nodes.len() {
            return Err(ExportError::Structure(format!(
                "no tree node at index {}",
                parent
            )));
        }

        if let Some(&existing) = self.index.get(&page.id) {
            let first_parent = self.nodes[existing]
                .parent
                .map(|p| self.nodes[p].page.id.to_string())
                .unwrap_or_else(|| "the export root".to_string());
            return Err(ExportError::Structure(format!(
                "page {} under page {} was already reached under {}",
                page.id, self.nodes[parent].page.id, first_parent
            )));
        }

        let idx = self.nodes.len();
        self.index.insert(page.id, idx);
        self.nodes.push(TreeNode {
            page,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
        Ok(idx)
    }

    pub fn node(&self, idx: usize) -> &TreeNode {
        &self.nodes[idx]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.index.contains_key(&id)
    }

    /// Full ancestor chain of a node, root first, excluding the node itself
    pub fn ancestors(&self, idx: usize) -> Vec<PageRef> {
        let mut chain = Vec::new();
        let mut current = self.nodes[idx].parent;
        while let Some(p) = current {
            chain.push(self.nodes[p].page.clone());
            current = self.nodes[p].parent;
        }
        chain.reverse();

        let mut full = self.base_ancestors.clone();
        full.extend(chain);
        full
    }

    /// Node indices with every parent before its children, siblings in order
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.nodes[idx].children.iter().rev());
        }
        order
    }
}
