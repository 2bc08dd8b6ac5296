//! # Core Module
//!
//! Data models and algorithms shared by every layer of gnnprep.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, residues, chains and whole structures,
//!   plus the amino-acid property table
//! - **File I/O** ([`io`]) - PDB coordinate reading, PSSM tables and the graph record archive
//! - **Contact Search** ([`contacts`]) - Residue and atom contacts between two chains
//! - **Graphs** ([`graph`]) - Residue- and atom-level graphs with named node and edge features
//! - **Geometry** ([`utils`]) - Distance predicates used when building edges

pub mod contacts;
pub mod graph;
pub mod io;
pub mod models;
pub mod utils;
