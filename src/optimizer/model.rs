//! Unsplittable flow MILP formulation.
//!
//! For D demands and E links the model has:
//! - binary routing decisions `x[d][l]`
//! - continuous carried volumes `V[d][l] >= 0`
//! - linkage `V[d][l] - v_d * x[d][l] == 0` (exact because `x` is binary)
//! - flow conservation per node and demand: `sum(x out) - sum(x in)` is
//!   +1 at the ingress, -1 at the egress, 0 elsewhere
//! - capacity per link: `sum_d V[d][l] <= capacity(l)`
//! - objective: minimize `sum(V)`, the total carried traffic
//!
//! The model is a plain data structure so that it can be inspected in tests
//! and handed to any [`SolverBackend`](super::SolverBackend).

use itertools::iproduct;
use serde::Serialize;
use strum::Display;
use tracing::{debug, warn};

use crate::domain::{NodeRole, Topology};
use crate::error::RoutingError;

pub const X_BLOCK: &str = "x";
pub const V_BLOCK: &str = "V";

/// D×E size above which the builder warns about model size.
pub const DEFAULT_SCALABILITY_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum VariableKind {
    Binary,
    Continuous,
}

/// A demand × link shaped group of variables sharing kind and bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableBlock {
    pub name: &'static str,
    pub kind: VariableKind,
    pub lower: f64,
    pub upper: f64,
    pub rows: usize,
    pub cols: usize,
    /// Position of the first variable of this block in the model's variable order.
    pub offset: usize,
}

impl VariableBlock {
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        self.offset + row * self.cols + col
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum Sense {
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "<=")]
    LessOrEqual,
    #[strum(serialize = ">=")]
    GreaterOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintKind {
    Linkage { demand: usize, link: usize },
    FlowConservation { node: usize, demand: usize, role: NodeRole },
    Capacity { link: usize },
}

/// `sum(coefficient * variable) <sense> rhs`, variables referenced by model index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    pub terms: Vec<(usize, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(i, c)| c * values[i]).sum()
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs(values);
        match self.sense {
            Sense::Equal => (lhs - self.rhs).abs() <= tolerance,
            Sense::LessOrEqual => lhs <= self.rhs + tolerance,
            Sense::GreaterOrEqual => lhs >= self.rhs - tolerance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ObjectiveSense {
    Minimize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub terms: Vec<(usize, f64)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub variables: usize,
    pub binary_variables: usize,
    pub constraints: usize,
    pub linkage_constraints: usize,
    pub conservation_constraints: usize,
    pub capacity_constraints: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowModel {
    pub x: VariableBlock,
    pub v: VariableBlock,
    pub constraints: Vec<LinearConstraint>,
    pub objective: Objective,
}

impl FlowModel {
    /// Variable blocks in variable order.
    pub fn blocks(&self) -> [&VariableBlock; 2] {
        [&self.x, &self.v]
    }

    pub fn block(&self, name: &str) -> Option<&VariableBlock> {
        self.blocks().into_iter().find(|b| b.name == name)
    }

    pub fn num_variables(&self) -> usize {
        self.x.len() + self.v.len()
    }

    /// Evaluate the objective for a full primal vector.
    pub fn objective_value(&self, values: &[f64]) -> Result<f64, RoutingError> {
        if values.len() < self.num_variables() {
            return Err(RoutingError::MissingVariableBlock(self.v.name.to_string()));
        }
        Ok(self.objective.terms.iter().map(|&(i, c)| c * values[i]).sum())
    }

    /// Constraints not satisfied by `values` within `tolerance`.
    pub fn violated_constraints<'a>(
        &'a self,
        values: &'a [f64],
        tolerance: f64,
    ) -> impl Iterator<Item = &'a LinearConstraint> + 'a {
        self.constraints
            .iter()
            .filter(move |c| !c.is_satisfied(values, tolerance))
    }

    pub fn stats(&self) -> ModelStats {
        let mut stats = ModelStats {
            variables: self.num_variables(),
            binary_variables: self
                .blocks()
                .iter()
                .filter(|b| b.kind == VariableKind::Binary)
                .map(|b| b.len())
                .sum(),
            constraints: self.constraints.len(),
            ..Default::default()
        };
        for c in &self.constraints {
            match c.kind {
                ConstraintKind::Linkage { .. } => stats.linkage_constraints += 1,
                ConstraintKind::FlowConservation { .. } => stats.conservation_constraints += 1,
                ConstraintKind::Capacity { .. } => stats.capacity_constraints += 1,
            }
        }
        stats
    }
}

/// Builds a [`FlowModel`] from a topology snapshot. Pure and deterministic:
/// constraints come out as linkage, then conservation, then capacity, each in
/// index order.
#[derive(Debug, Clone, Copy)]
pub struct ModelBuilder {
    scalability_limit: usize,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self {
            scalability_limit: DEFAULT_SCALABILITY_LIMIT,
        }
    }
}

impl ModelBuilder {
    pub fn new(scalability_limit: usize) -> Self {
        Self { scalability_limit }
    }

    /// Linkage constraints grow with D*E and dominate model size.
    pub fn exceeds_scalability_limit(&self, demands: usize, links: usize) -> bool {
        demands.saturating_mul(links) > self.scalability_limit
    }

    pub fn build<T: Topology + ?Sized>(&self, topology: &T) -> FlowModel {
        let demands = topology.demands();
        let links = topology.links();
        let (n_demands, n_links) = (demands.len(), links.len());

        if self.exceeds_scalability_limit(n_demands, n_links) {
            warn!(
                demands = n_demands,
                links = n_links,
                limit = self.scalability_limit,
                "flow model exceeds scalability limit, solve may be slow"
            );
        }

        let x = VariableBlock {
            name: X_BLOCK,
            kind: VariableKind::Binary,
            lower: 0.0,
            upper: 1.0,
            rows: n_demands,
            cols: n_links,
            offset: 0,
        };
        let v = VariableBlock {
            name: V_BLOCK,
            kind: VariableKind::Continuous,
            lower: 0.0,
            upper: f64::INFINITY,
            rows: n_demands,
            cols: n_links,
            offset: x.len(),
        };

        let mut constraints = Vec::with_capacity(
            n_demands * n_links + topology.number_of_nodes() * n_demands + n_links,
        );

        for (demand, link) in iproduct!(demands, links) {
            constraints.push(LinearConstraint {
                kind: ConstraintKind::Linkage {
                    demand: demand.index,
                    link: link.index,
                },
                terms: vec![
                    (v.index(demand.index, link.index), 1.0),
                    (x.index(demand.index, link.index), -demand.offered_traffic),
                ],
                sense: Sense::Equal,
                rhs: 0.0,
            });
        }

        for (node, demand) in iproduct!(topology.nodes(), demands) {
            let role = NodeRole::of(node.index, demand);
            let outgoing = node
                .outgoing_links
                .iter()
                .map(|&l| (x.index(demand.index, l), 1.0));
            let incoming = node
                .incoming_links
                .iter()
                .map(|&l| (x.index(demand.index, l), -1.0));
            constraints.push(LinearConstraint {
                kind: ConstraintKind::FlowConservation {
                    node: node.index,
                    demand: demand.index,
                    role,
                },
                terms: outgoing.chain(incoming).collect(),
                sense: Sense::Equal,
                rhs: role.net_outflow(),
            });
        }

        for link in links {
            constraints.push(LinearConstraint {
                kind: ConstraintKind::Capacity { link: link.index },
                terms: demands
                    .iter()
                    .map(|d| (v.index(d.index, link.index), 1.0))
                    .collect(),
                sense: Sense::LessOrEqual,
                rhs: link.capacity,
            });
        }

        let objective = Objective {
            sense: ObjectiveSense::Minimize,
            terms: (v.offset..v.offset + v.len()).map(|i| (i, 1.0)).collect(),
        };

        let model = FlowModel {
            x,
            v,
            constraints,
            objective,
        };
        debug!(stats = ?model.stats(), "flow model built");
        model
    }
}

/// Build the flow model with default builder settings.
pub fn build_model<T: Topology + ?Sized>(topology: &T) -> FlowModel {
    ModelBuilder::default().build(topology)
}
