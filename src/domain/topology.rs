use super::{Demand, DemandLinkMatrix, Link, Node, Routing};
use crate::error::RoutingError;
use super::decode::decode_routing;

/// Read access to a network snapshot plus the two routing mutations the
/// router needs: clear everything, and replace with a new routing.
///
/// Indices are stable and zero based: `nodes()[i].index == i`, and likewise
/// for links and demands.
pub trait Topology {
    fn nodes(&self) -> &[Node];
    fn links(&self) -> &[Link];
    fn demands(&self) -> &[Demand];

    /// Currently committed routing, if any.
    fn routing(&self) -> Option<&Routing>;

    /// Drop all routing information. Safe to call on a network without routing.
    fn clear_routing(&mut self);

    /// Replace the committed routing.
    fn set_routing(&mut self, routing: Routing);

    fn number_of_nodes(&self) -> usize {
        self.nodes().len()
    }

    fn number_of_links(&self) -> usize {
        self.links().len()
    }

    fn number_of_demands(&self) -> usize {
        self.demands().len()
    }

    /// Commit one path per demand from a demand × link decision matrix.
    ///
    /// Entries above `threshold` count as selected. Nothing is committed when
    /// any demand fails to decode.
    fn set_routing_from_demand_link_matrix(
        &mut self,
        x: &DemandLinkMatrix,
        threshold: f64,
    ) -> Result<Routing, RoutingError> {
        let routing = decode_routing(&*self, x, threshold)?;
        self.set_routing(routing.clone());
        Ok(routing)
    }
}
