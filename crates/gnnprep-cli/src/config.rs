//! Query manifest handling: the on-disk format, built-in defaults and the merge of
//! command-line flags over manifest settings.

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;
