use serde::{Deserialize, Serialize};

use super::Link;

/// Single path carrying the whole volume of one demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub demand: usize,
    /// Link indices in traversal order, ingress first.
    pub links: Vec<usize>,
    pub carried_traffic: f64,
}

impl Route {
    pub fn hops(&self) -> usize {
        self.links.len()
    }

    /// Node sequence visited by the route, starting at the origin of the first link.
    pub fn nodes(&self, links: &[Link]) -> Vec<usize> {
        let mut nodes = Vec::with_capacity(self.links.len() + 1);
        if let Some(first) = self.links.first() {
            nodes.push(links[*first].origin);
        }
        nodes.extend(self.links.iter().map(|l| links[*l].destination));
        nodes
    }
}

/// Committed unsplit routing: at most one route per demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Routing {
    routes: Vec<Route>,
}

impl Routing {
    pub fn new(mut routes: Vec<Route>) -> Self {
        routes.sort_by_key(|r| r.demand);
        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route_for(&self, demand: usize) -> Option<&Route> {
        self.routes
            .binary_search_by_key(&demand, |r| r.demand)
            .ok()
            .map(|i| &self.routes[i])
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Traffic carried on each link, summed over the routes traversing it.
    pub fn link_carried_traffic(&self, number_of_links: usize) -> Vec<f64> {
        let mut carried = vec![0.0; number_of_links];
        for route in &self.routes {
            for &link in &route.links {
                carried[link] += route.carried_traffic;
            }
        }
        carried
    }

    pub fn total_carried_traffic(&self) -> f64 {
        self.routes
            .iter()
            .map(|r| r.carried_traffic * r.hops() as f64)
            .sum()
    }
}
