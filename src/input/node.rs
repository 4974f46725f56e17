//! Code for reading network nodes from a CSV file.
use super::{input_err_msg, read_csv};
use crate::system::{Node, NodeID, NodeMap};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const NODES_FILE_NAME: &str = "nodes.csv";

#[derive(Debug, PartialEq, Deserialize)]
struct NodeRaw {
    node: String,
    area: String,
}

/// Read nodes from the specified model directory
pub fn read_nodes(model_dir: &Path) -> Result<NodeMap> {
    let file_path = model_dir.join(NODES_FILE_NAME);
    let nodes_csv = read_csv(&file_path)?;
    read_nodes_from_iter(nodes_csv).with_context(|| input_err_msg(&file_path))
}

fn read_nodes_from_iter<I>(iter: I) -> Result<NodeMap>
where
    I: Iterator<Item = NodeRaw>,
{
    let mut nodes = NodeMap::new();
    for raw in iter {
        let id: NodeID = raw.node.into();
        let node = Node {
            id: id.clone(),
            area: raw.area.into(),
        };
        ensure!(nodes.insert(id.clone(), node).is_none(), "Duplicate node {id}");
    }

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_nodes_from_iter_works() {
        let raw = [
            NodeRaw {
                node: "north".into(),
                area: "A1".into(),
            },
            NodeRaw {
                node: "south".into(),
                area: "A1".into(),
            },
        ];
        let nodes = read_nodes_from_iter(raw.into_iter()).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes["south"].area.to_string(), "A1");
    }

    #[test]
    fn read_nodes_duplicate() {
        let raw = [
            NodeRaw {
                node: "north".into(),
                area: "A1".into(),
            },
            NodeRaw {
                node: "north".into(),
                area: "A2".into(),
            },
        ];
        assert!(read_nodes_from_iter(raw.into_iter()).is_err());
    }
}
