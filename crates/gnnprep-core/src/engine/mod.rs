//! # Engine Module
//!
//! Runs feature modules on graphs, under a per-query deadline and a shared cancellation
//! flag.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Validated settings of a processing run
//! - **Feature Modules** ([`features`]) - The module trait, the built-in modules and their
//!   selection into a dispatch plan
//! - **Time Limits** ([`deadline`]) - Query deadlines and cooperative cancellation
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Per-query and per-run error types

pub mod config;
pub mod deadline;
pub mod error;
pub mod features;
pub mod progress;
