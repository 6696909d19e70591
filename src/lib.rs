//! Unsplittable flow routing over capacitated networks.
//!
//! Every demand is routed over exactly one path, chosen by a binary MILP that
//! minimizes total carried traffic subject to flow conservation and link
//! capacities.

pub mod config;
pub mod domain;
pub mod error;
pub mod optimizer;
pub mod telemetry;
