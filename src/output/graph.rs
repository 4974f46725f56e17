//! The module responsible for writing the network map to file.
use super::results::{SolvedModel, max_utilisation};
use crate::system::{AreaID, LineID, NodeID};
use crate::units::UnitType;
use anyhow::Result;
use petgraph::Directed;
use petgraph::dot::Dot;
use petgraph::graph::Graph;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::fs::File;
use std::io::Write as IoWrite;
use std::path::Path;

/// A graph of the transmission network
pub type NetworkGraph = Graph<NetworkNode, NetworkEdge, Directed>;

/// A node of the network, labelled with its area
#[derive(Debug, PartialEq)]
pub struct NetworkNode {
    id: NodeID,
    area: AreaID,
}

impl Display for NetworkNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.area)
    }
}

/// A line, labelled with its transfer capacity and the highest utilisation over all load levels
#[derive(Debug, PartialEq)]
pub struct NetworkEdge {
    line: LineID,
    ttc: f64,
    utilisation: f64,
}

impl Display for NetworkEdge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} MW, {:.0}%",
            self.line,
            self.ttc,
            self.utilisation * 100.0
        )
    }
}

/// Build a graph of the network with the solved utilisation of each line
pub fn build_network_graph(staged: &SolvedModel) -> NetworkGraph {
    let system = &staged.model.system;
    let utilisation = max_utilisation(staged);

    let mut graph = NetworkGraph::new();
    let indices: HashMap<_, _> = system
        .nodes
        .values()
        .map(|node| {
            let idx = graph.add_node(NetworkNode {
                id: node.id.clone(),
                area: node.area.clone(),
            });
            (&node.id, idx)
        })
        .collect();

    for line in system.lines.values() {
        graph.add_edge(
            indices[&line.from],
            indices[&line.to],
            NetworkEdge {
                line: line.id.clone(),
                ttc: line.ttc.value(),
                utilisation: utilisation.get(&line.id).copied().unwrap_or_default(),
            },
        );
    }

    graph
}

/// Save the network map as a DOT file
pub fn write_network_map(staged: &SolvedModel, file_path: &Path) -> Result<()> {
    let graph = build_network_graph(staged);
    let dot = Dot::new(&graph);
    let mut file = File::create(file_path)?;
    write!(file, "{dot}")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model, weights};
    use crate::model::Model;
    use crate::output::results::tests::solve;
    use crate::weights::WeightStore;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn network_graph_has_nodes_and_lines(model: Model, weights: WeightStore) {
        let staged = solve(&model, weights);
        let graph = build_network_graph(&staged);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);

        let edge = graph.edge_weights().next().unwrap();
        assert_eq!(edge.to_string(), "north_south_c1: 50 MW, 2%");
    }

    #[rstest]
    fn write_network_map_works(model: Model, weights: WeightStore) {
        let staged = solve(&model, weights);
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("network_map_simple.dot");
        write_network_map(&staged, &file_path).unwrap();

        let contents = std::fs::read_to_string(file_path).unwrap();
        assert!(contents.starts_with("digraph {"));
        assert!(contents.contains("label = \"north (A1)\""));
    }
}
