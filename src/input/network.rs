//! Code for reading transmission lines from a CSV file.
use super::{input_err_msg, read_csv_optional};
use crate::system::{Line, LineMap, NodeID, NodeMap};
use crate::toggle::deserialise_toggle;
use crate::units::{Money, Power, UnitType};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const NETWORK_FILE_NAME: &str = "network.csv";

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct LineRaw {
    from: String,
    to: String,
    circuit: String,
    ttc: Power,
    #[serde(default)]
    fixed_cost: Money,
    #[serde(deserialize_with = "deserialise_toggle")]
    switching: bool,
}

/// Read transmission lines from the specified model directory.
///
/// A case without a network file is a single-node system.
pub fn read_lines(model_dir: &Path, nodes: &NodeMap) -> Result<LineMap> {
    let file_path = model_dir.join(NETWORK_FILE_NAME);
    let lines_csv = read_csv_optional(&file_path)?;
    read_lines_from_iter(lines_csv, nodes).with_context(|| input_err_msg(&file_path))
}

fn lookup_node(nodes: &NodeMap, node: &str) -> Result<NodeID> {
    nodes
        .get_key_value(node)
        .map(|(id, _)| id.clone())
        .with_context(|| format!("Unknown node {node}"))
}

fn read_lines_from_iter<I>(iter: I, nodes: &NodeMap) -> Result<LineMap>
where
    I: Iterator<Item = LineRaw>,
{
    let mut lines = LineMap::new();
    for raw in iter {
        let from = lookup_node(nodes, &raw.from)?;
        let to = lookup_node(nodes, &raw.to)?;
        ensure!(from != to, "Line {from}-{to} connects a node to itself");

        let id = Line::make_id(&from, &to, &raw.circuit);
        ensure!(
            raw.ttc.is_finite() && raw.ttc > Power(0.0),
            "Transfer capacity of line {id} must be a finite number greater than zero"
        );
        ensure!(
            raw.fixed_cost >= Money(0.0),
            "Fixed cost of line {id} cannot be negative"
        );

        let line = Line {
            id: id.clone(),
            from,
            to,
            circuit: raw.circuit,
            ttc: raw.ttc,
            fixed_cost: raw.fixed_cost,
            switching: raw.switching,
        };
        ensure!(lines.insert(id.clone(), line).is_none(), "Duplicate line {id}");
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::nodes;
    use rstest::{fixture, rstest};

    #[fixture]
    fn raw() -> LineRaw {
        LineRaw {
            from: "north".into(),
            to: "south".into(),
            circuit: "c1".into(),
            ttc: Power(50.0),
            fixed_cost: Money(0.0),
            switching: false,
        }
    }

    #[rstest]
    fn read_lines_from_iter_works(raw: LineRaw, nodes: NodeMap) {
        let lines = read_lines_from_iter([raw].into_iter(), &nodes).unwrap();
        let line = &lines["north_south_c1"];
        assert_eq!(line.ttc, Power(50.0));
        assert!(!line.is_candidate());
    }

    #[rstest]
    #[case::unknown_node(LineRaw { to: "east".into(), ..raw() })]
    #[case::self_loop(LineRaw { to: "north".into(), ..raw() })]
    #[case::zero_ttc(LineRaw { ttc: Power(0.0), ..raw() })]
    #[case::negative_cost(LineRaw { fixed_cost: Money(-1.0), ..raw() })]
    fn read_lines_invalid(#[case] bad: LineRaw, nodes: NodeMap) {
        assert!(read_lines_from_iter([bad].into_iter(), &nodes).is_err());
    }

    #[rstest]
    fn read_lines_parallel_circuits(raw: LineRaw, nodes: NodeMap) {
        let second = LineRaw {
            circuit: "c2".into(),
            ..raw.clone()
        };
        let lines = read_lines_from_iter([raw, second].into_iter(), &nodes).unwrap();
        assert_eq!(lines.len(), 2);
    }
}
