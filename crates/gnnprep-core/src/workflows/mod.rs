//! # Workflows Module
//!
//! The public entry points of gnnprep: describe graphs as [`query::Query`] values, gather
//! them in a [`collection::QueryCollection`] and process the collection into graph record
//! archives.
//!
//! ## Architecture
//!
//! - **Queries** ([`query`]) - Interface and variant queries, their parameters and ids
//! - **Collections** ([`collection`]) - Unique id assignment and the parallel processing run
//! - **Pipeline** ([`pipeline`]) - Structure reading, contact search, graph construction and
//!   feature dispatch for a single query
//!
//! ## Usage
//!
//! ```ignore
//! use gnnprep::core::graph::GraphLevel;
//! use gnnprep::engine::config::ProcessConfigBuilder;
//! use gnnprep::engine::deadline::CancellationToken;
//! use gnnprep::engine::progress::ProgressReporter;
//! use gnnprep::workflows::collection::QueryCollection;
//! use gnnprep::workflows::query::Query;
//!
//! let mut collection = QueryCollection::new();
//! collection.add(Query::interface("1ATN.pdb", GraphLevel::Residue, "A", "B"), true);
//!
//! let config = ProcessConfigBuilder::new().features("all").build()?;
//! let report = collection.process(&config, &ProgressReporter::new(), &CancellationToken::new())?;
//! ```

pub mod collection;
pub mod pipeline;
pub mod query;
