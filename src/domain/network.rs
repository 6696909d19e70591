//! In-memory network store.
//!
//! Networks are described in TOML or JSON files where nodes are referenced by
//! name; loading resolves names to indices and builds the per-node incoming and
//! outgoing link sets.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::{Route, Routing, Topology};
use crate::error::TopologyError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub index: usize,
    pub name: String,
    pub incoming_links: Vec<usize>,
    pub outgoing_links: Vec<usize>,
}

/// Directed capacitated link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub index: usize,
    pub origin: usize,
    pub destination: usize,
    pub capacity: f64,
}

/// Point-to-point traffic requirement with a fixed volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    pub index: usize,
    pub ingress: usize,
    pub egress: usize,
    pub offered_traffic: f64,
}

/// On-disk network description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkFile {
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
    #[serde(default)]
    pub demands: Vec<DemandEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEntry {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEntry {
    pub origin: String,
    pub destination: String,
    pub capacity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandEntry {
    pub ingress: String,
    pub egress: String,
    pub offered_traffic: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: Vec<Node>,
    links: Vec<Link>,
    demands: Vec<Demand>,
    routing: Option<Routing>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a network file, picking the format from the extension (`.toml` or `.json`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TopologyError> {
        let path = path.as_ref();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if !matches!(extension, "toml" | "json") {
            return Err(TopologyError::UnsupportedFormat(extension.to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let file: NetworkFile = if extension == "toml" {
            toml::from_str(&contents)?
        } else {
            serde_json::from_str(&contents)?
        };
        let network = Self::from_file(file)?;
        debug!(
            path = %path.display(),
            nodes = network.nodes.len(),
            links = network.links.len(),
            demands = network.demands.len(),
            "network loaded"
        );
        Ok(network)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, TopologyError> {
        Self::from_file(toml::from_str(contents)?)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, TopologyError> {
        Self::from_file(serde_json::from_str(contents)?)
    }

    pub fn from_file(file: NetworkFile) -> Result<Self, TopologyError> {
        let mut network = Self::new();
        let mut by_name = HashMap::with_capacity(file.nodes.len());
        for entry in &file.nodes {
            if by_name.contains_key(entry.name.as_str()) {
                return Err(TopologyError::DuplicateNode(entry.name.clone()));
            }
            by_name.insert(entry.name.as_str(), network.add_node(&entry.name));
        }

        let resolve = |name: &str| {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| TopologyError::UnknownNode(name.to_string()))
        };

        for entry in &file.links {
            let origin = resolve(&entry.origin)?;
            let destination = resolve(&entry.destination)?;
            network.add_link(origin, destination, entry.capacity)?;
        }
        for entry in &file.demands {
            let ingress = resolve(&entry.ingress)?;
            let egress = resolve(&entry.egress)?;
            network.add_demand(ingress, egress, entry.offered_traffic)?;
        }
        Ok(network)
    }

    pub fn add_node(&mut self, name: impl Into<String>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node {
            index,
            name: name.into(),
            incoming_links: Vec::new(),
            outgoing_links: Vec::new(),
        });
        index
    }

    pub fn add_link(
        &mut self,
        origin: usize,
        destination: usize,
        capacity: f64,
    ) -> Result<usize, TopologyError> {
        self.check_node(origin)?;
        self.check_node(destination)?;
        if !capacity.is_finite() || capacity < 0.0 {
            return Err(TopologyError::InvalidCapacity {
                origin: self.nodes[origin].name.clone(),
                destination: self.nodes[destination].name.clone(),
                value: capacity,
            });
        }

        let index = self.links.len();
        self.links.push(Link {
            index,
            origin,
            destination,
            capacity,
        });
        self.nodes[origin].outgoing_links.push(index);
        self.nodes[destination].incoming_links.push(index);
        Ok(index)
    }

    /// Ingress equal to egress is accepted; such a demand can never be routed.
    pub fn add_demand(
        &mut self,
        ingress: usize,
        egress: usize,
        offered_traffic: f64,
    ) -> Result<usize, TopologyError> {
        self.check_node(ingress)?;
        self.check_node(egress)?;
        if !offered_traffic.is_finite() || offered_traffic < 0.0 {
            return Err(TopologyError::InvalidTraffic {
                ingress: self.nodes[ingress].name.clone(),
                egress: self.nodes[egress].name.clone(),
                value: offered_traffic,
            });
        }

        let index = self.demands.len();
        self.demands.push(Demand {
            index,
            ingress,
            egress,
            offered_traffic,
        });
        Ok(index)
    }

    fn check_node(&self, index: usize) -> Result<(), TopologyError> {
        if index < self.nodes.len() {
            Ok(())
        } else {
            Err(TopologyError::UnknownNode(format!("#{index}")))
        }
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Carried traffic per link under the committed routing (all zero when unrouted).
    pub fn link_carried_traffic(&self) -> Vec<f64> {
        match &self.routing {
            Some(routing) => routing.link_carried_traffic(self.links.len()),
            None => vec![0.0; self.links.len()],
        }
    }

    pub fn total_carried_traffic(&self) -> f64 {
        self.link_carried_traffic().iter().sum()
    }

    /// Carried traffic over capacity per link.
    ///
    /// An unused link reports 0. A zero-capacity link carrying traffic, which
    /// only a routing installed through `set_routing` can produce, reports
    /// `f64::INFINITY`.
    pub fn link_utilization(&self) -> Vec<f64> {
        self.link_carried_traffic()
            .into_iter()
            .zip(&self.links)
            .map(|(carried, link)| {
                if carried == 0.0 {
                    0.0
                } else if link.capacity == 0.0 {
                    f64::INFINITY
                } else {
                    carried / link.capacity
                }
            })
            .collect()
    }

    /// Human readable node path of a route, e.g. `A -> B -> C`.
    pub fn describe_route(&self, route: &Route) -> String {
        route
            .nodes(&self.links)
            .into_iter()
            .map(|n| self.nodes[n].name.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl Topology for Network {
    fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn links(&self) -> &[Link] {
        &self.links
    }

    fn demands(&self) -> &[Demand] {
        &self.demands
    }

    fn routing(&self) -> Option<&Routing> {
        self.routing.as_ref()
    }

    fn clear_routing(&mut self) {
        self.routing = None;
    }

    fn set_routing(&mut self, routing: Routing) {
        self.routing = Some(routing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoutingError;
    use ndarray::array;

    const LINE: &str = r#"
        nodes = [{ name = "A" }, { name = "B" }, { name = "C" }]

        [[links]]
        origin = "A"
        destination = "B"
        capacity = 10.0

        [[links]]
        origin = "B"
        destination = "C"
        capacity = 10.0

        [[demands]]
        ingress = "A"
        egress = "C"
        offered_traffic = 7.0
    "#;

    #[test]
    fn test_load_toml_builds_link_sets() {
        let network = Network::from_toml_str(LINE).unwrap();

        assert_eq!(network.number_of_nodes(), 3);
        assert_eq!(network.number_of_links(), 2);
        assert_eq!(network.number_of_demands(), 1);

        let b = network.node_by_name("B").unwrap();
        assert_eq!(b.incoming_links, vec![0]);
        assert_eq!(b.outgoing_links, vec![1]);
        assert_eq!(network.demands()[0].ingress, 0);
        assert_eq!(network.demands()[0].egress, 2);
    }

    #[test]
    fn test_load_json() {
        let json = r#"{
            "nodes": [{"name": "X"}, {"name": "Y"}],
            "links": [{"origin": "X", "destination": "Y", "capacity": 4.5}],
            "demands": []
        }"#;
        let network = Network::from_json_str(json).unwrap();
        assert_eq!(network.links()[0].capacity, 4.5);
        assert!(network.demands().is_empty());
    }

    #[test]
    fn test_unknown_node_rejected() {
        let toml = r#"
            nodes = [{ name = "A" }]
            links = [{ origin = "A", destination = "Z", capacity = 1.0 }]
        "#;
        let err = Network::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, TopologyError::UnknownNode(ref n) if n == "Z"));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let toml = r#"nodes = [{ name = "A" }, { name = "A" }]"#;
        assert!(matches!(
            Network::from_toml_str(toml),
            Err(TopologyError::DuplicateNode(_))
        ));
    }

    #[test]
    fn test_negative_capacity_rejected() {
        let mut network = Network::new();
        let a = network.add_node("A");
        let b = network.add_node("B");
        assert!(matches!(
            network.add_link(a, b, -1.0),
            Err(TopologyError::InvalidCapacity { .. })
        ));
        assert!(matches!(
            network.add_demand(a, b, f64::NAN),
            Err(TopologyError::InvalidTraffic { .. })
        ));
    }

    #[test]
    fn test_self_demand_accepted() {
        let mut network = Network::new();
        let a = network.add_node("A");
        assert!(network.add_demand(a, a, 1.0).is_ok());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = Network::load("network.yaml").unwrap_err();
        assert!(matches!(err, TopologyError::UnsupportedFormat(ref e) if e == "yaml"));

        let err = Network::load("does-not-exist.toml").unwrap_err();
        assert!(matches!(err, TopologyError::Io(_)));
    }

    #[test]
    fn test_routing_lifecycle() {
        let mut network = Network::from_toml_str(LINE).unwrap();
        assert_eq!(network.link_carried_traffic(), vec![0.0, 0.0]);

        network.set_routing(Routing::new(vec![Route {
            demand: 0,
            links: vec![0, 1],
            carried_traffic: 7.0,
        }]));
        assert_eq!(network.total_carried_traffic(), 14.0);
        assert_eq!(network.link_utilization(), vec![0.7, 0.7]);

        let route = network.routing().unwrap().route_for(0).unwrap().clone();
        assert_eq!(network.describe_route(&route), "A -> B -> C");

        network.clear_routing();
        network.clear_routing();
        assert!(network.routing().is_none());
        assert_eq!(network.total_carried_traffic(), 0.0);
    }

    #[test]
    fn test_utilization_of_zero_capacity_link() {
        let mut network = Network::new();
        let a = network.add_node("A");
        let b = network.add_node("B");
        network.add_link(a, b, 0.0).unwrap();
        network.add_link(a, b, 0.0).unwrap();
        network.add_demand(a, b, 3.0).unwrap();
        assert_eq!(network.link_utilization(), vec![0.0, 0.0]);

        network.set_routing(Routing::new(vec![Route {
            demand: 0,
            links: vec![0],
            carried_traffic: 3.0,
        }]));
        assert_eq!(network.link_utilization(), vec![f64::INFINITY, 0.0]);
    }

    #[test]
    fn test_set_routing_from_matrix() {
        let mut network = Network::from_toml_str(LINE).unwrap();

        let routing = network
            .set_routing_from_demand_link_matrix(&array![[0.9999, 1.0]], 0.5)
            .unwrap();
        assert_eq!(routing.route_for(0).unwrap().links, vec![0, 1]);
        assert_eq!(network.routing(), Some(&routing));

        // A failed decode leaves the committed routing untouched.
        let err = network
            .set_routing_from_demand_link_matrix(&array![[1.0, 0.0]], 0.5)
            .unwrap_err();
        assert!(matches!(err, RoutingError::InconsistentSolution { demand: 0, .. }));
        assert_eq!(network.routing(), Some(&routing));
    }
}
