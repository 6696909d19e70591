use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::model::{FlowModel, VariableBlock};
use crate::domain::DemandLinkMatrix;
use crate::error::{RoutingError, SolverError};

/// Solver verdict. Anything but `Optimal` aborts routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// Interrupted, limit reached, or any other non-optimal termination.
    NotOptimal,
}

/// Status plus primal values in model variable order (empty unless optimal).
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub values: Vec<f64>,
}

impl SolveOutcome {
    pub fn optimal(values: Vec<f64>) -> Self {
        Self {
            status: SolveStatus::Optimal,
            values,
        }
    }

    pub fn not_optimal(status: SolveStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Primal values of one variable block as a rows × cols matrix.
    pub fn primal_matrix(&self, block: &VariableBlock) -> Result<DemandLinkMatrix, RoutingError> {
        let end = block.offset + block.len();
        let values = self
            .values
            .get(block.offset..end)
            .ok_or_else(|| RoutingError::MissingVariableBlock(block.name.to_string()))?;
        DemandLinkMatrix::from_shape_vec((block.rows, block.cols), values.to_vec())
            .map_err(|_| RoutingError::MissingVariableBlock(block.name.to_string()))
    }
}

/// A MILP solver able to solve a [`FlowModel`].
///
/// Returns `Ok` with a non-optimal status for infeasible or unbounded models;
/// `Err` is reserved for faults of the backend itself.
#[cfg_attr(test, mockall::automock)]
pub trait SolverBackend: Send + Sync {
    fn solve(&self, model: &FlowModel) -> Result<SolveOutcome, SolverError>;
}
