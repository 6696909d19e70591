use thiserror::Error;

use crate::optimizer::{SolveStatus, SolverKind};

/// Failures of a single solve-and-route invocation. All of them are fatal for
/// the invocation; the routing of the topology is left cleared.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("An optimal solution was not found (solver status: {status})")]
    InfeasibleOrSuboptimalSolution { status: SolveStatus },

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("Inconsistent solution for demand {demand}: {reason}")]
    InconsistentSolution { demand: usize, reason: String },

    #[error("Primal values for variable block '{0}' are missing")]
    MissingVariableBlock(String),

    #[error("Demand-link matrix has shape {found:?}, expected {expected:?}")]
    MatrixShape {
        expected: (usize, usize),
        found: (usize, usize),
    },
}

/// Faults of the solver backend itself, as opposed to a non-optimal answer.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver '{0}' is not available in this build")]
    Unavailable(SolverKind),

    #[error("Solver '{backend}' failed: {message}")]
    Backend { backend: SolverKind, message: String },
}

/// Network store loading and validation errors.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    #[error("Invalid capacity {value} on link {origin} -> {destination}")]
    InvalidCapacity {
        origin: String,
        destination: String,
        value: f64,
    },

    #[error("Invalid offered traffic {value} for demand {ingress} -> {egress}")]
    InvalidTraffic {
        ingress: String,
        egress: String,
        value: f64,
    },

    #[error("Unsupported network file format: '{0}' (expected toml or json)")]
    UnsupportedFormat(String),

    #[error("Failed to read network file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML network file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON network file: {0}")]
    Json(#[from] serde_json::Error),
}
