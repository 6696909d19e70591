//! Solver Backends
//!
//! Implementations of [`SolverBackend`](super::SolverBackend):
//! - good_lp: MILP through good_lp, engine picked by [`SolverKind`]

pub mod milp;

pub use milp::*;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// MILP engine used by the good_lp backend.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Pure Rust branch and bound (default, always compiled with `optimization`)
    #[default]
    Microlp,
    /// HiGHS (requires the `highs` feature)
    Highs,
}
