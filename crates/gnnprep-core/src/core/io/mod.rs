//! Reading structure and scoring inputs, and persisting finished graphs.
//!
//! - [`pdb`] reads fixed-column PDB coordinate records into raw atom rows and structures.
//! - [`pssm`] loads per-chain position-specific scoring tables from CSV.
//! - [`archive`] writes, reads and merges the append-friendly graph record container.

pub mod archive;
pub mod pdb;
pub mod pssm;
