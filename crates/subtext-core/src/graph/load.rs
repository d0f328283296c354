use std::fs;
use std::path::Path;

use super::types::Graph;
use crate::error::{Result, SubtextError};

/// Load a combined graph snapshot from disk.
///
/// The file is a single JSON document with top-level `nodes` and `edges`
/// arrays, produced by the offline ingestion pipeline that stitches together
/// LAS curve headers, USGS site metadata and EIA production records into one
/// graph. There is no incremental update path — a new snapshot replaces the
/// old one wholesale.
pub fn load_graph(path: impl AsRef<Path>) -> Result<Graph> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .map_err(|e| SubtextError::GraphLoad(format!("{}: {e}", path.display())))?;
    let graph: Graph =
        serde_json::from_str(&raw).map_err(|e| SubtextError::GraphLoad(format!("{}: {e}", path.display())))?;
    validate_edge_endpoints(&graph)?;
    Ok(graph)
}

/// Every edge endpoint must resolve to a loaded node; a dangling edge is a
/// fatal load-time error rather than something traversal silently ignores.
fn validate_edge_endpoints(graph: &Graph) -> Result<()> {
    let node_ids: std::collections::HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &graph.edges {
        if !node_ids.contains(edge.source.as_str()) {
            return Err(SubtextError::GraphLoad(format!(
                "edge {:?} -> {:?} references unknown source node {:?}",
                edge.source, edge.target, edge.source
            )));
        }
        if !node_ids.contains(edge.target.as_str()) {
            return Err(SubtextError::GraphLoad(format!(
                "edge {:?} -> {:?} references unknown target node {:?}",
                edge.source, edge.target, edge.target
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_nodes_and_edges_from_a_well_formed_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"nodes": [{{"id": "w1", "type": "las_document", "attributes": {{}}}}], "edges": []}}"#
        )
        .unwrap();

        let graph = load_graph(file.path()).unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, "w1");
    }

    #[test]
    fn missing_file_returns_graph_load_error() {
        let err = load_graph("/nonexistent/graph.json").unwrap_err();
        assert!(matches!(err, SubtextError::GraphLoad(_)));
    }

    #[test]
    fn dangling_edge_endpoint_is_a_fatal_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"nodes": [{{"id": "w1", "type": "las_document", "attributes": {{}}}}], "edges": [{{"source": "missing-curve", "target": "w1", "type": "describes"}}]}}"#
        )
        .unwrap();

        let err = load_graph(file.path()).unwrap_err();
        assert!(matches!(err, SubtextError::GraphLoad(_)));
    }
}
