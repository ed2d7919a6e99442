// Arena of scenario nodes for one match
//
// Parents own their children through id lists; the parent link is a plain id
// lookup so nothing here forms an ownership cycle. Re-rooting keeps the
// matching subtree and drops every other node.

use std::collections::{HashMap, HashSet};

use crate::agent::BoardDims;
use crate::config::GameRulesConfig;
use crate::scenario::{self, MoveOdds, Outcome, Scenario};

pub type NodeId = u64;

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub scenario: Scenario,
    pub parent: Option<NodeId>,
    /// `None` until the node has been expanded
    pub children: Option<Vec<NodeId>>,
    /// Absolute depth since the tree was created
    depth: u32,
}

/// Result of handing the tree a newly observed state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reroot {
    /// The observed state already is the root
    Unchanged,
    /// A predicted child matched and became the root, keeping its subtree
    Reused,
    /// Nothing matched; the observed state is a fresh, childless root
    Restarted,
}

#[derive(Debug)]
pub struct ScenarioTree {
    dims: BoardDims,
    nodes: HashMap<NodeId, TreeNode>,
    root: NodeId,
    next_id: NodeId,
}

impl ScenarioTree {
    pub fn new(dims: BoardDims, root: Scenario) -> Self {
        let mut tree = ScenarioTree {
            dims,
            nodes: HashMap::new(),
            root: 0,
            next_id: 0,
        };
        tree.root = tree.insert(root, None, 1);
        tree
    }

    fn insert(&mut self, scenario: Scenario, parent: Option<NodeId>, depth: u32) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            TreeNode {
                scenario,
                parent,
                children: None,
                depth,
            },
        );
        id
    }

    pub fn dims(&self) -> BoardDims {
        self.dims
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[&self.root]
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth relative to the current root, root = 1
    pub fn age(&self, id: NodeId) -> Option<u32> {
        let node = self.nodes.get(&id)?;
        Some(node.depth + 1 - self.root().depth)
    }

    /// Creates the children of `id`, folds their outcomes into it and every
    /// ancestor, and returns the new child ids.
    ///
    /// Unknown or already expanded nodes yield nothing.
    pub fn expand(&mut self, id: NodeId, rules: &GameRulesConfig) -> Vec<NodeId> {
        let (children, depth) = match self.nodes.get(&id) {
            Some(node) if node.children.is_none() => {
                (node.scenario.create_children(&self.dims, rules), node.depth)
            }
            _ => return Vec::new(),
        };

        let child_ids: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.insert(child, Some(id), depth + 1))
            .collect();

        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = Some(child_ids.clone());
        }
        self.propagate_from(id);

        child_ids
    }

    /// Recomputes `id` and each ancestor as the mean of its children
    fn propagate_from(&mut self, id: NodeId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.nodes.get(&current) else {
                break;
            };
            let parent = node.parent;

            let mean = node.children.as_ref().and_then(|children| {
                Outcome::mean(
                    children
                        .iter()
                        .filter_map(|child| self.nodes.get(child))
                        .map(|child| &child.scenario.outcome),
                )
            });

            if let (Some(mean), Some(node)) = (mean, self.nodes.get_mut(&current)) {
                node.scenario.outcome = mean;
            }
            cursor = parent;
        }
    }

    /// Whether the parent chain of `id` ends at the current root
    pub fn is_rooted(&self, id: NodeId) -> bool {
        let mut cursor = id;
        loop {
            match self.nodes.get(&cursor) {
                None => return false,
                Some(node) => match node.parent {
                    Some(parent) => cursor = parent,
                    None => return cursor == self.root,
                },
            }
        }
    }

    /// Swaps the root for the observed state, reusing a matching child
    pub fn reroot(&mut self, observed: Scenario) -> Reroot {
        let root = self.root();
        if root.scenario.id == observed.id {
            return Reroot::Unchanged;
        }

        let reused = root.children.as_ref().and_then(|children| {
            children
                .iter()
                .copied()
                .find(|child| self.nodes.get(child).map(|n| n.scenario.id) == Some(observed.id))
        });

        match reused {
            Some(child) => {
                self.root = child;
                if let Some(node) = self.nodes.get_mut(&child) {
                    node.parent = None;
                }
                self.prune_to_root();
                Reroot::Reused
            }
            None => {
                self.nodes.clear();
                self.root = self.insert(observed, None, 1);
                Reroot::Restarted
            }
        }
    }

    fn prune_to_root(&mut self) {
        let mut keep = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !keep.insert(id) {
                continue;
            }
            if let Some(children) = self.nodes.get(&id).and_then(|n| n.children.as_ref()) {
                stack.extend(children.iter().copied());
            }
        }
        self.nodes.retain(|id, _| keep.contains(id));
    }

    pub fn children_of(&self, id: NodeId) -> Vec<&Scenario> {
        self.nodes
            .get(&id)
            .and_then(|node| node.children.as_ref())
            .map(|children| {
                children
                    .iter()
                    .filter_map(|child| self.nodes.get(child))
                    .map(|child| &child.scenario)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Per-move estimates for the controlled agent out of the root
    pub fn move_odds(&self) -> Vec<MoveOdds> {
        scenario::move_odds(&self.children_of(self.root))
    }
}
