//! # Core Models Module
//!
//! Arena-backed representation of one protein structure model.
//!
//! ## Key Components
//!
//! - [`atom`] - Atoms with element, occupancy and coordinates
//! - [`residue`] - Residues and their position (number and insertion code) in a chain
//! - [`chain`] - Chains as ordered residue lists
//! - [`structure`] - The whole model and its lookup helpers
//! - [`builder`] - Assembles a [`structure::Structure`] from raw atom records
//! - [`amino_acid`] - Static physico-chemical properties of the 20 canonical amino acids
//! - [`ids`] - Stable arena keys for atoms, residues and chains
//!
//! ## Usage
//!
//! ```ignore
//! use gnnprep::core::io::pdb::PdbFile;
//! use gnnprep::core::models::builder::build_structure;
//!
//! let records = PdbFile::read_records_from_path("1ATN.pdb")?;
//! let structure = build_structure("1ATN", &records)?;
//! let chain = structure.find_chain_by_id("A").unwrap();
//! ```

pub mod amino_acid;
pub mod atom;
pub mod builder;
pub mod chain;
pub mod ids;
pub mod residue;
pub mod structure;
