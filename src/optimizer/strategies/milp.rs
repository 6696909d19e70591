//! MILP (Mixed-Integer Linear Programming) Backend
//!
//! Translates a backend-neutral [`FlowModel`] into a good_lp problem and solves
//! it with the configured engine:
//! - binary `x` and continuous `V` blocks become good_lp variables, in model order
//! - every linear constraint becomes a good_lp constraint with the same sense
//! - the objective is minimised
//!
//! Infeasible and unbounded models are reported as non-optimal outcomes; any
//! other solver error is a backend fault.

use tracing::debug;

use super::SolverKind;
use crate::error::SolverError;
use crate::optimizer::model::FlowModel;
use crate::optimizer::{SolveOutcome, SolverBackend};

#[cfg(feature = "optimization")]
use good_lp::{
    constraint, variable, Constraint, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable, VariableDefinition,
};

#[cfg(feature = "optimization")]
use crate::optimizer::model::{LinearConstraint, ObjectiveSense, Sense, VariableBlock, VariableKind};
#[cfg(feature = "optimization")]
use crate::optimizer::SolveStatus;

#[cfg(feature = "optimization")]
const CONSTANT_TOLERANCE: f64 = 1e-9;

/// MILP backend using good_lp.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpBackend {
    /// Engine to hand the problem to (microlp, HiGHS)
    solver_type: SolverKind,
}

impl GoodLpBackend {
    pub fn new(solver_type: SolverKind) -> Self {
        Self { solver_type }
    }

    pub fn solver_type(&self) -> SolverKind {
        self.solver_type
    }
}

#[cfg(feature = "optimization")]
impl SolverBackend for GoodLpBackend {
    fn solve(&self, model: &FlowModel) -> Result<SolveOutcome, SolverError> {
        // Without links every constraint is a constant: it holds or the model is infeasible.
        if model.num_variables() == 0 {
            if model.violated_constraints(&[], CONSTANT_TOLERANCE).next().is_some() {
                debug!(solver = %self.solver_type, "constant constraint violated, skipping solver");
                return Ok(SolveOutcome::not_optimal(SolveStatus::Infeasible));
            }
            return Ok(SolveOutcome::optimal(Vec::new()));
        }

        let mut problem = ProblemVariables::new();
        let mut vars = Vec::with_capacity(model.num_variables());
        for block in model.blocks() {
            vars.extend(problem.add_vector(variable_definition(block), block.len()));
        }

        let objective = linear_expression(&vars, &model.objective.terms);
        let unsolved = match model.objective.sense {
            ObjectiveSense::Minimize => problem.minimise(objective),
        };

        let constraints: Vec<Constraint> = model
            .constraints
            .iter()
            .map(|c| to_constraint(c, &vars))
            .collect();

        debug!(
            solver = %self.solver_type,
            variables = vars.len(),
            constraints = constraints.len(),
            "submitting flow model"
        );

        match self.solver_type {
            SolverKind::Microlp => solve_with(
                unsolved.using(good_lp::microlp),
                constraints,
                &vars,
                self.solver_type,
            ),
            #[cfg(feature = "highs")]
            SolverKind::Highs => solve_with(
                unsolved.using(good_lp::highs),
                constraints,
                &vars,
                self.solver_type,
            ),
            #[cfg(not(feature = "highs"))]
            SolverKind::Highs => Err(SolverError::Unavailable(SolverKind::Highs)),
        }
    }
}

#[cfg(not(feature = "optimization"))]
impl SolverBackend for GoodLpBackend {
    fn solve(&self, _model: &FlowModel) -> Result<SolveOutcome, SolverError> {
        Err(SolverError::Unavailable(self.solver_type))
    }
}

#[cfg(feature = "optimization")]
fn variable_definition(block: &VariableBlock) -> VariableDefinition {
    let definition = match block.kind {
        VariableKind::Binary => variable().binary(),
        VariableKind::Continuous => variable(),
    }
    .min(block.lower);

    if block.upper.is_finite() {
        definition.max(block.upper)
    } else {
        definition
    }
}

#[cfg(feature = "optimization")]
fn linear_expression(vars: &[Variable], terms: &[(usize, f64)]) -> Expression {
    terms.iter().map(|&(i, coefficient)| coefficient * vars[i]).sum()
}

#[cfg(feature = "optimization")]
fn to_constraint(c: &LinearConstraint, vars: &[Variable]) -> Constraint {
    let lhs = linear_expression(vars, &c.terms);
    match c.sense {
        Sense::Equal => constraint!(lhs == c.rhs),
        Sense::LessOrEqual => constraint!(lhs <= c.rhs),
        Sense::GreaterOrEqual => constraint!(lhs >= c.rhs),
    }
}

#[cfg(feature = "optimization")]
fn solve_with<M>(
    mut problem: M,
    constraints: Vec<Constraint>,
    vars: &[Variable],
    solver: SolverKind,
) -> Result<SolveOutcome, SolverError>
where
    M: SolverModel<Error = ResolutionError>,
{
    for c in constraints {
        problem = problem.with(c);
    }

    match problem.solve() {
        Ok(solution) => {
            let values: Vec<f64> = vars.iter().map(|&v| solution.value(v)).collect();
            debug!(%solver, "solver reported an optimal solution");
            Ok(SolveOutcome::optimal(values))
        }
        Err(ResolutionError::Infeasible) => Ok(SolveOutcome::not_optimal(SolveStatus::Infeasible)),
        Err(ResolutionError::Unbounded) => Ok(SolveOutcome::not_optimal(SolveStatus::Unbounded)),
        Err(other) => Err(SolverError::Backend {
            backend: solver,
            message: other.to_string(),
        }),
    }
}
