//! # Graph Module
//!
//! Typed graphs built from a [`Structure`](crate::core::models::structure::Structure) and a
//! set of contacts, ready to be decorated by feature modules.
//!
//! ## Overview
//!
//! A [`Graph`] is either residue-level or atom-level, never both. Its nodes are keyed by a
//! tagged [`NodeKey`] and its edges by an unordered [`Pair`] of node keys. Every node and edge
//! carries a [`Features`] map that starts empty and is filled in by the feature dispatcher.
//!
//! - [`pair`] - Unordered pairs with swap-symmetric equality and hashing
//! - [`features`] - Named scalar and vector feature values
//! - [`builder`] - Construction of interface and variant graphs

pub mod builder;
pub mod features;
pub mod pair;

use crate::core::models::ids::{AtomId, ResidueId};
use features::Features;
use pair::Pair;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Granularity of a graph's nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphLevel {
    Residue,
    Atomic,
}

impl fmt::Display for GraphLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphLevel::Residue => f.write_str("residue"),
            GraphLevel::Atomic => f.write_str("atomic"),
        }
    }
}

/// Identity of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    Residue(ResidueId),
    Atom(AtomId),
}

impl NodeKey {
    pub fn level(&self) -> GraphLevel {
        match self {
            NodeKey::Residue(_) => GraphLevel::Residue,
            NodeKey::Atom(_) => GraphLevel::Atomic,
        }
    }
}

impl From<ResidueId> for NodeKey {
    fn from(id: ResidueId) -> Self {
        NodeKey::Residue(id)
    }
}

impl From<AtomId> for NodeKey {
    fn from(id: AtomId) -> Self {
        NodeKey::Atom(id)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Cannot add a {found} node to a {expected}-level graph")]
    MixedLevels {
        expected: GraphLevel,
        found: GraphLevel,
    },
    #[error("Edge endpoint {0:?} is not a node of the graph")]
    MissingEndpoint(NodeKey),
    #[error("Residue {0:?} is not part of the structure")]
    UnknownResidue(ResidueId),
}

/// A residue- or atom-level graph with per-node and per-edge features.
///
/// Nodes and edges keep their insertion order, which the builders make deterministic.
#[derive(Debug, Clone)]
pub struct Graph {
    id: String,
    level: GraphLevel,
    nodes: Vec<(NodeKey, Features)>,
    node_index: HashMap<NodeKey, usize>,
    edges: Vec<(Pair<NodeKey>, Features)>,
    edge_index: HashMap<Pair<NodeKey>, usize>,
    targets: BTreeMap<String, f64>,
}

impl Graph {
    pub fn new(id: &str, level: GraphLevel) -> Self {
        Self {
            id: id.to_string(),
            level,
            nodes: Vec::new(),
            node_index: HashMap::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
            targets: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn level(&self) -> GraphLevel {
        self.level
    }

    /// Adds a node; adding an existing node is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MixedLevels`] when the key's level differs from the graph's.
    pub fn add_node(&mut self, key: impl Into<NodeKey>) -> Result<(), GraphError> {
        let key = key.into();
        if key.level() != self.level {
            return Err(GraphError::MixedLevels {
                expected: self.level,
                found: key.level(),
            });
        }
        if !self.node_index.contains_key(&key) {
            self.node_index.insert(key, self.nodes.len());
            self.nodes.push((key, Features::new()));
        }
        Ok(())
    }

    /// Adds an edge between two existing nodes; adding an existing edge is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingEndpoint`] when either endpoint is not a node.
    pub fn add_edge(&mut self, edge: Pair<NodeKey>) -> Result<(), GraphError> {
        for endpoint in edge.items() {
            if !self.node_index.contains_key(&endpoint) {
                return Err(GraphError::MissingEndpoint(endpoint));
            }
        }
        if !self.edge_index.contains_key(&edge) {
            self.edge_index.insert(edge, self.edges.len());
            self.edges.push((edge, Features::new()));
        }
        Ok(())
    }

    pub fn contains_node(&self, key: NodeKey) -> bool {
        self.node_index.contains_key(&key)
    }

    pub fn contains_edge(&self, edge: &Pair<NodeKey>) -> bool {
        self.edge_index.contains_key(edge)
    }

    /// Position of a node in insertion order.
    pub fn node_position(&self, key: NodeKey) -> Option<usize> {
        self.node_index.get(&key).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.iter().map(|(key, _)| *key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Features)> {
        self.nodes.iter().map(|(key, features)| (*key, features))
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = (NodeKey, &mut Features)> {
        self.nodes.iter_mut().map(|(key, features)| (*key, features))
    }

    pub fn edges(&self) -> impl Iterator<Item = (Pair<NodeKey>, &Features)> {
        self.edges.iter().map(|(edge, features)| (*edge, features))
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = (Pair<NodeKey>, &mut Features)> {
        self.edges.iter_mut().map(|(edge, features)| (*edge, features))
    }

    pub fn node_features(&self, key: NodeKey) -> Option<&Features> {
        self.node_position(key).map(|i| &self.nodes[i].1)
    }

    pub fn node_features_mut(&mut self, key: NodeKey) -> Option<&mut Features> {
        self.node_position(key).map(|i| &mut self.nodes[i].1)
    }

    pub fn edge_features(&self, edge: &Pair<NodeKey>) -> Option<&Features> {
        self.edge_index.get(edge).map(|&i| &self.edges[i].1)
    }

    pub fn set_target(&mut self, name: &str, value: f64) {
        self.targets.insert(name.to_string(), value);
    }

    pub fn targets(&self) -> &BTreeMap<String, f64> {
        &self.targets
    }
}
