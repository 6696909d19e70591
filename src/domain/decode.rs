//! Turning a binary demand × link matrix back into per-demand paths.
//!
//! Solvers return binaries as floats (0.9999998, 1e-9, ...), so a link counts
//! as selected when its value exceeds a threshold, 0.5 by default.
//!
//! The selected links of a demand are expected to form exactly one simple
//! ingress to egress path. This is checked rather than trusted: the path is
//! the hop-shortest walk over the selected links, found breadth first with
//! ties broken by link index. Selected links off that path can only be
//! zero-cost cycles of a zero-traffic demand and are dropped.

use std::collections::{HashMap, VecDeque};
use tracing::warn;

use super::{DemandLinkMatrix, Link, Route, Routing, Topology};
use crate::error::RoutingError;

pub const DEFAULT_BINARY_THRESHOLD: f64 = 0.5;

/// Links selected for one demand, in link index order.
pub fn selected_links(x: &DemandLinkMatrix, demand: usize, threshold: f64) -> Vec<usize> {
    x.row(demand)
        .iter()
        .enumerate()
        .filter(|&(_, &value)| value > threshold)
        .map(|(link, _)| link)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathReconstruction {
    /// Links from ingress to egress in traversal order.
    pub path: Vec<usize>,
    /// Selected links not on the path.
    pub dropped: Vec<usize>,
}

/// Reconstruct the simple ingress to egress path induced by `selected` links.
///
/// Returns `None` when the selected links do not connect ingress to egress,
/// and when ingress and egress are the same node: no set of links satisfies
/// conservation for such a demand.
pub fn reconstruct_path(
    links: &[Link],
    selected: &[usize],
    ingress: usize,
    egress: usize,
) -> Option<PathReconstruction> {
    if ingress == egress {
        return None;
    }

    let mut ordered = selected.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    // predecessor link per node reached, keyed by node index
    let mut reached_by: HashMap<usize, Option<usize>> = HashMap::from([(ingress, None)]);
    let mut queue = VecDeque::from([ingress]);

    while let Some(node) = queue.pop_front() {
        if node == egress {
            break;
        }
        for &l in &ordered {
            let link = &links[l];
            if link.origin == node && !reached_by.contains_key(&link.destination) {
                reached_by.insert(link.destination, Some(l));
                queue.push_back(link.destination);
            }
        }
    }

    if !reached_by.contains_key(&egress) {
        return None;
    }

    let mut path = Vec::new();
    let mut node = egress;
    while let Some(Some(l)) = reached_by.get(&node) {
        path.push(*l);
        node = links[*l].origin;
    }
    path.reverse();

    let dropped = ordered.into_iter().filter(|l| !path.contains(l)).collect();
    Some(PathReconstruction { path, dropped })
}

/// Decode a full routing from the `x` matrix of a topology's flow model.
///
/// Each route carries the demand's whole offered traffic.
pub fn decode_routing<T: Topology + ?Sized>(
    topology: &T,
    x: &DemandLinkMatrix,
    threshold: f64,
) -> Result<Routing, RoutingError> {
    let expected = (topology.number_of_demands(), topology.number_of_links());
    if x.dim() != expected {
        return Err(RoutingError::MatrixShape {
            expected,
            found: x.dim(),
        });
    }

    let links = topology.links();
    let mut routes = Vec::with_capacity(expected.0);
    for demand in topology.demands() {
        let selected = selected_links(x, demand.index, threshold);
        let reconstruction = reconstruct_path(links, &selected, demand.ingress, demand.egress)
            .ok_or_else(|| RoutingError::InconsistentSolution {
                demand: demand.index,
                reason: format!(
                    "selected links {selected:?} do not connect node {} to node {}",
                    demand.ingress, demand.egress
                ),
            })?;

        if !reconstruction.dropped.is_empty() {
            warn!(
                demand = demand.index,
                offered_traffic = demand.offered_traffic,
                dropped = ?reconstruction.dropped,
                "dropping selected links that are not on the demand path"
            );
        }

        routes.push(Route {
            demand: demand.index,
            links: reconstruction.path,
            carried_traffic: demand.offered_traffic,
        });
    }
    Ok(Routing::new(routes))
}
