//! Solve orchestration: clear, build, solve, decode, commit.
//!
//! One invocation either commits a full routing or fails; on failure the
//! topology's routing is left cleared, not restored.

use serde::Serialize;
use strum::Display;
use tracing::{debug, info, info_span, warn};

use super::model::ModelBuilder;
use super::{GoodLpBackend, SolverBackend};
use crate::config::Config;
use crate::domain::{DemandLinkMatrix, Routing, Topology, DEFAULT_BINARY_THRESHOLD};
use crate::error::RoutingError;

const OBJECTIVE_TOLERANCE: f64 = 1e-6;

/// Phases of one solve, used for log context only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
enum SolvePhase {
    Building,
    Solving,
    Committing,
    Done,
    Failed,
}

/// Clear-then-commit routing update.
///
/// Opening the transaction clears the routing; [`commit`](Self::commit)
/// installs the new one. Dropping it without committing leaves the topology
/// with no routing.
pub struct RoutingTransaction<'a, T: Topology + ?Sized> {
    topology: &'a mut T,
}

impl<'a, T: Topology + ?Sized> RoutingTransaction<'a, T> {
    pub fn begin(topology: &'a mut T) -> Self {
        topology.clear_routing();
        Self { topology }
    }

    pub fn topology(&self) -> &T {
        self.topology
    }

    /// Decode `x` and commit one path per demand (unsplit routing).
    pub fn commit(self, x: &DemandLinkMatrix, threshold: f64) -> Result<Routing, RoutingError> {
        self.topology.set_routing_from_demand_link_matrix(x, threshold)
    }
}

/// Outcome of a successful solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingResult {
    /// Sum over links of the traffic they carry.
    pub total_carried_traffic: f64,
    /// Objective value of the MILP solution.
    pub objective_value: f64,
    pub routing: Routing,
}

impl RoutingResult {
    pub fn summary(&self) -> String {
        format!(
            "Total carried traffic in the links: {}",
            self.total_carried_traffic
        )
    }
}

/// Algorithm parameter descriptor: name, default value, description.
pub type AlgorithmParameter = (String, String, String);

/// Minimum carried traffic unsplittable flow routing.
pub struct UnsplittableFlowRouter {
    backend: Box<dyn SolverBackend>,
    builder: ModelBuilder,
    binary_threshold: f64,
}

impl UnsplittableFlowRouter {
    pub fn new(backend: Box<dyn SolverBackend>) -> Self {
        Self {
            backend,
            builder: ModelBuilder::default(),
            binary_threshold: DEFAULT_BINARY_THRESHOLD,
        }
    }

    /// Router with the configured good_lp engine, threshold and model size limit.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(Box::new(GoodLpBackend::new(cfg.solver.backend)))
            .with_builder(ModelBuilder::new(cfg.routing.scalability_limit))
            .with_binary_threshold(cfg.routing.binary_threshold)
    }

    pub fn with_builder(mut self, builder: ModelBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_binary_threshold(mut self, threshold: f64) -> Self {
        self.binary_threshold = threshold;
        self
    }

    pub fn description(&self) -> &'static str {
        "Flow Formulation Constraints"
    }

    /// The algorithm takes no parameters.
    pub fn parameters(&self) -> Vec<AlgorithmParameter> {
        Vec::new()
    }

    /// Run the algorithm and return the carried traffic summary.
    pub fn execute<T: Topology + ?Sized>(&self, topology: &mut T) -> Result<String, RoutingError> {
        self.solve_and_route(topology).map(|result| result.summary())
    }

    pub fn solve_and_route<T: Topology + ?Sized>(
        &self,
        topology: &mut T,
    ) -> Result<RoutingResult, RoutingError> {
        let span = info_span!(
            "solve_and_route",
            nodes = topology.number_of_nodes(),
            links = topology.number_of_links(),
            demands = topology.number_of_demands(),
        );
        let _guard = span.enter();

        let result = self.run(topology);
        match &result {
            Ok(r) => {
                debug!(phase = %SolvePhase::Done, "routing committed");
                info!(
                    total_carried_traffic = r.total_carried_traffic,
                    routes = r.routing.routes().len(),
                    "unsplittable flow routing complete"
                );
            }
            Err(e) => warn!(phase = %SolvePhase::Failed, error = %e, "unsplittable flow routing failed"),
        }
        result
    }

    fn run<T: Topology + ?Sized>(&self, topology: &mut T) -> Result<RoutingResult, RoutingError> {
        let transaction = RoutingTransaction::begin(topology);

        debug!(phase = %SolvePhase::Building, "building flow model");
        let model = self.builder.build(transaction.topology());

        debug!(phase = %SolvePhase::Solving, "solving flow model");
        let outcome = self.backend.solve(&model)?;
        if !outcome.is_optimal() {
            return Err(RoutingError::InfeasibleOrSuboptimalSolution {
                status: outcome.status,
            });
        }

        debug!(phase = %SolvePhase::Committing, "decoding routing decisions");
        let objective_value = model.objective_value(&outcome.values)?;
        let x = outcome.primal_matrix(&model.x)?;
        let routing = transaction.commit(&x, self.binary_threshold)?;

        let total_carried_traffic = routing.total_carried_traffic();
        let scale = objective_value.abs().max(1.0);
        if (total_carried_traffic - objective_value).abs() > OBJECTIVE_TOLERANCE * scale {
            warn!(
                total_carried_traffic,
                objective_value, "carried traffic differs from solver objective"
            );
        }

        Ok(RoutingResult {
            total_carried_traffic,
            objective_value,
            routing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Network, Route};
    use crate::error::SolverError;
    use crate::optimizer::{MockSolverBackend, SolveOutcome, SolveStatus, SolverKind};

    /// A -> B -> C, demand A -> C of 7.
    fn line() -> Network {
        let mut network = Network::new();
        let a = network.add_node("A");
        let b = network.add_node("B");
        let c = network.add_node("C");
        network.add_link(a, b, 10.0).unwrap();
        network.add_link(b, c, 10.0).unwrap();
        network.add_demand(a, c, 7.0).unwrap();
        network
    }

    /// x = [1, 1], V = [7, 7]
    fn line_solution() -> Vec<f64> {
        vec![1.0, 1.0, 7.0, 7.0]
    }

    fn stale_routing() -> Routing {
        Routing::new(vec![Route {
            demand: 0,
            links: vec![1],
            carried_traffic: 99.0,
        }])
    }

    fn router_returning(outcome: Result<SolveOutcome, SolverError>) -> UnsplittableFlowRouter {
        let mut backend = MockSolverBackend::new();
        backend.expect_solve().times(1).return_once(move |_| outcome);
        UnsplittableFlowRouter::new(Box::new(backend))
    }

    #[test]
    fn test_commits_decoded_routing() {
        let mut network = line();
        let router = router_returning(Ok(SolveOutcome::optimal(line_solution())));

        let result = router.solve_and_route(&mut network).unwrap();

        assert_eq!(result.total_carried_traffic, 14.0);
        assert_eq!(result.objective_value, 14.0);
        assert_eq!(result.routing.route_for(0).unwrap().links, vec![0, 1]);
        assert_eq!(network.routing(), Some(&result.routing));
        assert_eq!(network.link_carried_traffic(), vec![7.0, 7.0]);
    }

    #[test]
    fn test_execute_summary() {
        let mut network = line();
        let router = router_returning(Ok(SolveOutcome::optimal(line_solution())));

        let summary = router.execute(&mut network).unwrap();
        assert_eq!(summary, "Total carried traffic in the links: 14");
    }

    #[test]
    fn test_non_optimal_clears_and_commits_nothing() {
        let mut network = line();
        network.set_routing(stale_routing());
        let router = router_returning(Ok(SolveOutcome::not_optimal(SolveStatus::Infeasible)));

        let err = router.solve_and_route(&mut network).unwrap_err();

        assert!(matches!(
            err,
            RoutingError::InfeasibleOrSuboptimalSolution {
                status: SolveStatus::Infeasible
            }
        ));
        assert!(network.routing().is_none());
    }

    #[test]
    fn test_backend_fault_propagates() {
        let mut network = line();
        let router = router_returning(Err(SolverError::Unavailable(SolverKind::Highs)));

        let err = router.solve_and_route(&mut network).unwrap_err();
        assert!(matches!(err, RoutingError::Solver(SolverError::Unavailable(_))));
        assert!(network.routing().is_none());
    }

    #[test]
    fn test_inconsistent_solution_commits_nothing() {
        let mut network = line();
        network.set_routing(stale_routing());
        // Only A -> B selected: egress never reached.
        let router = router_returning(Ok(SolveOutcome::optimal(vec![1.0, 0.0, 7.0, 0.0])));

        let err = router.solve_and_route(&mut network).unwrap_err();
        assert!(matches!(err, RoutingError::InconsistentSolution { demand: 0, .. }));
        assert!(network.routing().is_none());
    }

    #[test]
    fn test_self_demand_never_committed() {
        let mut network = Network::new();
        let a = network.add_node("A");
        network.add_demand(a, a, 5.0).unwrap();
        // A backend claiming optimality for a model it cannot satisfy.
        let router = router_returning(Ok(SolveOutcome::optimal(Vec::new())));

        let err = router.solve_and_route(&mut network).unwrap_err();
        assert!(matches!(err, RoutingError::InconsistentSolution { demand: 0, .. }));
        assert!(network.routing().is_none());
    }

    #[test]
    fn test_short_primal_vector_rejected() {
        let mut network = line();
        let router = router_returning(Ok(SolveOutcome::optimal(vec![1.0, 1.0])));

        let err = router.solve_and_route(&mut network).unwrap_err();
        assert!(matches!(err, RoutingError::MissingVariableBlock(_)));
    }

    #[test]
    fn test_prior_routing_has_no_effect() {
        let mut fresh = line();
        let mut stale = line();
        stale.set_routing(stale_routing());

        let first = router_returning(Ok(SolveOutcome::optimal(line_solution())))
            .solve_and_route(&mut fresh)
            .unwrap();
        let second = router_returning(Ok(SolveOutcome::optimal(line_solution())))
            .solve_and_route(&mut stale)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(fresh.routing(), stale.routing());
    }

    #[test]
    fn test_backend_sees_cleared_topology_model() {
        let mut network = line();
        let mut backend = MockSolverBackend::new();
        backend
            .expect_solve()
            .withf(|model| model.stats().linkage_constraints == 2 && model.x.rows == 1)
            .times(1)
            .return_once(|_| Ok(SolveOutcome::optimal(line_solution())));

        UnsplittableFlowRouter::new(Box::new(backend))
            .solve_and_route(&mut network)
            .unwrap();
    }

    #[test]
    fn test_transaction_phases_are_inspectable() {
        let mut network = line();
        network.set_routing(stale_routing());

        let transaction = RoutingTransaction::begin(&mut network);
        assert!(transaction.topology().routing().is_none());

        let x = ndarray::array![[1.0, 1.0]];
        let routing = transaction.commit(&x, DEFAULT_BINARY_THRESHOLD).unwrap();
        assert_eq!(network.routing(), Some(&routing));
    }

    #[test]
    fn test_dropped_transaction_leaves_routing_cleared() {
        let mut network = line();
        network.set_routing(stale_routing());
        drop(RoutingTransaction::begin(&mut network));
        assert!(network.routing().is_none());
    }

    #[test]
    fn test_descriptor() {
        let router = UnsplittableFlowRouter::new(Box::new(MockSolverBackend::new()));
        assert_eq!(router.description(), "Flow Formulation Constraints");
        assert!(router.parameters().is_empty());
    }
}
