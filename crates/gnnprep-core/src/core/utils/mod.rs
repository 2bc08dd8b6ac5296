//! Small geometric helpers shared by the contact resolver, graph builder and feature modules.

pub mod geometry;
