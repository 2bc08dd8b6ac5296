//! # gnnprep Core Library
//!
//! Turns protein structures into feature-annotated graphs ready for graph neural network
//! training, and stores them in a compact, mergeable archive format.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture so that each layer can be tested
//! on its own.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Structure`, `Graph`), readers for
//!   PDB coordinates and PSSM tables, residue contact search and the graph record archive.
//!
//! - **[`engine`]: The Feature Core.** Feature modules, their selection and dispatch, and
//!   the per-query deadline, cancellation and progress plumbing around them.
//!
//! - **[`workflows`]: The Public API.** Queries, query collections and the parallel
//!   processing run that turns a collection into one or more archives.

pub mod core;
pub mod engine;
pub mod workflows;
