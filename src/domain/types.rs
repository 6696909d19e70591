use ndarray::Array2;
use serde::{Deserialize, Serialize};
use strum::Display;

use super::Demand;

/// Demand × link matrix of per-flow values (rows are demands, columns are links).
///
/// Used both for the binary routing decisions `x[d][l]` and for carried
/// traffic volumes `V[d][l]` read back from a solver.
pub type DemandLinkMatrix = Array2<f64>;

/// Role a node plays for one demand in the flow-conservation constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NodeRole {
    Ingress,
    Egress,
    Transit,
}

impl NodeRole {
    /// Ingress is checked first, so a demand with ingress == egress makes the
    /// node an ingress and the model infeasible.
    pub fn of(node: usize, demand: &Demand) -> Self {
        if node == demand.ingress {
            NodeRole::Ingress
        } else if node == demand.egress {
            NodeRole::Egress
        } else {
            NodeRole::Transit
        }
    }

    /// Required outgoing minus incoming routing decisions at the node.
    pub fn net_outflow(&self) -> f64 {
        match self {
            NodeRole::Ingress => 1.0,
            NodeRole::Egress => -1.0,
            NodeRole::Transit => 0.0,
        }
    }
}
