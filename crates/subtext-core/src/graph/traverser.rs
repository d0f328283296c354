use std::collections::{HashMap, HashSet};

use super::types::{Edge, Graph, Node, TraversalDirection};

/// Indexed view over a loaded [`Graph`] supporting constant-time neighbor
/// lookups and breadth-first expansion. Built once at startup; all indices
/// are computed eagerly in [`GraphTraverser::new`] because the graph is a
/// static snapshot, not a live store.
pub struct GraphTraverser {
    nodes_by_id: HashMap<String, Node>,
    outgoing: HashMap<String, Vec<(String, String)>>,
    incoming: HashMap<String, Vec<(String, String)>>,
    well_to_curves: HashMap<String, Vec<String>>,
    curve_to_well: HashMap<String, String>,
    well_mnemonics: HashMap<String, HashSet<String>>,
}

impl GraphTraverser {
    pub fn new(graph: Graph) -> Self {
        let mut nodes_by_id = HashMap::with_capacity(graph.nodes.len());
        for node in graph.nodes {
            nodes_by_id.insert(node.id.clone(), node);
        }

        let (outgoing, incoming) = index_edges(&graph.edges);
        let (well_to_curves, curve_to_well, well_mnemonics) =
            index_well_curve_relationships(&nodes_by_id, &incoming);

        Self {
            nodes_by_id,
            outgoing,
            incoming,
            well_to_curves,
            curve_to_well,
            well_mnemonics,
        }
    }

    pub fn get_node(&self, node_id: &str) -> Option<&Node> {
        self.nodes_by_id.get(node_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes_by_id.values()
    }

    /// Nodes connected to `start` via edges, optionally filtered by edge type.
    pub fn connected_nodes(
        &self,
        start: &str,
        edge_type: Option<&str>,
        direction: TraversalDirection,
    ) -> Vec<&Node> {
        let index = match direction {
            TraversalDirection::Outgoing => &self.outgoing,
            TraversalDirection::Incoming => &self.incoming,
            TraversalDirection::Both => {
                let mut combined = self.connected_nodes(start, edge_type, TraversalDirection::Outgoing);
                combined.extend(self.connected_nodes(start, edge_type, TraversalDirection::Incoming));
                return combined;
            }
        };

        index
            .get(start)
            .into_iter()
            .flatten()
            .filter(|(_, e_type)| edge_type.map(|want| want == e_type).unwrap_or(true))
            .filter_map(|(target, _)| self.nodes_by_id.get(target))
            .collect()
    }

    pub fn curves_for_well(&self, well_node_id: &str) -> Vec<&Node> {
        self.connected_nodes(well_node_id, Some("describes"), TraversalDirection::Incoming)
    }

    pub fn well_for_curve(&self, curve_node_id: &str) -> Option<&Node> {
        self.connected_nodes(curve_node_id, Some("describes"), TraversalDirection::Outgoing)
            .into_iter()
            .next()
    }

    pub fn measurements_for_site(&self, site_node_id: &str) -> Vec<&Node> {
        self.connected_nodes(site_node_id, Some("reports_on"), TraversalDirection::Incoming)
    }

    pub fn site_for_measurement(&self, measurement_node_id: &str) -> Option<&Node> {
        self.connected_nodes(measurement_node_id, Some("reports_on"), TraversalDirection::Outgoing)
            .into_iter()
            .next()
    }

    pub fn mnemonics_for_well(&self, well_node_id: &str) -> HashSet<String> {
        self.well_mnemonics.get(well_node_id).cloned().unwrap_or_default()
    }

    pub fn wells_with_mnemonic(&self, mnemonic: &str) -> Vec<&str> {
        let target = mnemonic.to_uppercase();
        self.well_mnemonics
            .iter()
            .filter(|(_, mnemonics)| mnemonics.contains(&target))
            .map(|(well_id, _)| well_id.as_str())
            .collect()
    }

    pub fn curves_for_well_ids(&self, well_node_id: &str) -> &[String] {
        self.well_to_curves.get(well_node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn well_for_curve_id(&self, curve_node_id: &str) -> Option<&str> {
        self.curve_to_well.get(curve_node_id).map(String::as_str)
    }

    /// Expand a set of seed nodes by following edges breadth-first.
    ///
    /// `max_hops == 0` returns only the seeds. Each layer is fully explored
    /// before the next begins; a node already visited in an earlier layer
    /// (including as a seed) is never re-added.
    pub fn expand_search_results<'a>(
        &'a self,
        seed_nodes: &[&'a Node],
        direction: Option<TraversalDirection>,
        max_hops: u32,
    ) -> Vec<&'a Node> {
        let mut expanded: Vec<&Node> = seed_nodes.to_vec();
        let mut visited: HashSet<&str> = seed_nodes.iter().map(|n| n.id.as_str()).collect();
        let mut current_layer: Vec<&str> = seed_nodes.iter().map(|n| n.id.as_str()).collect();

        for _ in 0..max_hops {
            let mut next_layer = Vec::new();
            for node_id in &current_layer {
                self.expand_one_direction(
                    node_id,
                    direction,
                    TraversalDirection::Outgoing,
                    &mut visited,
                    &mut expanded,
                    &mut next_layer,
                );
                self.expand_one_direction(
                    node_id,
                    direction,
                    TraversalDirection::Incoming,
                    &mut visited,
                    &mut expanded,
                    &mut next_layer,
                );
            }
            if next_layer.is_empty() {
                break;
            }
            current_layer = next_layer;
        }

        expanded
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_one_direction<'a>(
        &'a self,
        node_id: &str,
        requested: Option<TraversalDirection>,
        this_direction: TraversalDirection,
        visited: &mut HashSet<&'a str>,
        expanded: &mut Vec<&'a Node>,
        next_layer: &mut Vec<&'a str>,
    ) {
        let wants_this_direction = match requested {
            None => true,
            Some(TraversalDirection::Both) => true,
            Some(d) => d == this_direction,
        };
        if !wants_this_direction {
            return;
        }

        for node in self.connected_nodes(node_id, None, this_direction) {
            if visited.insert(node.id.as_str()) {
                expanded.push(node);
                next_layer.push(node.id.as_str());
            }
        }
    }

    /// Summary of edge counts by type for a node, used by relationship debugging.
    pub fn relationship_summary(&self, node_id: &str) -> Option<RelationshipSummary> {
        let node = self.get_node(node_id)?;
        let mut outgoing_by_type: HashMap<String, usize> = HashMap::new();
        for (_, e_type) in self.outgoing.get(node_id).into_iter().flatten() {
            *outgoing_by_type.entry(e_type.clone()).or_insert(0) += 1;
        }
        let mut incoming_by_type: HashMap<String, usize> = HashMap::new();
        for (_, e_type) in self.incoming.get(node_id).into_iter().flatten() {
            *incoming_by_type.entry(e_type.clone()).or_insert(0) += 1;
        }
        Some(RelationshipSummary {
            node_id: node_id.to_string(),
            node_kind: node.kind.clone(),
            outgoing_by_type,
            incoming_by_type,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RelationshipSummary {
    pub node_id: String,
    pub node_kind: String,
    pub outgoing_by_type: HashMap<String, usize>,
    pub incoming_by_type: HashMap<String, usize>,
}

type EdgeIndex = HashMap<String, Vec<(String, String)>>;

fn index_edges(edges: &[Edge]) -> (EdgeIndex, EdgeIndex) {
    let mut outgoing: EdgeIndex = HashMap::new();
    let mut incoming: EdgeIndex = HashMap::new();

    for edge in edges {
        outgoing
            .entry(edge.source.clone())
            .or_default()
            .push((edge.target.clone(), edge.relation.clone()));
        incoming
            .entry(edge.target.clone())
            .or_default()
            .push((edge.source.clone(), edge.relation.clone()));
    }

    (outgoing, incoming)
}

type WellIndices = (
    HashMap<String, Vec<String>>,
    HashMap<String, String>,
    HashMap<String, HashSet<String>>,
);

fn index_well_curve_relationships(nodes_by_id: &HashMap<String, Node>, incoming: &EdgeIndex) -> WellIndices {
    let mut well_to_curves: HashMap<String, Vec<String>> = HashMap::new();
    let mut curve_to_well: HashMap<String, String> = HashMap::new();
    let mut well_mnemonics: HashMap<String, HashSet<String>> = HashMap::new();

    for (node_id, node) in nodes_by_id {
        if node.kind != "las_document" {
            continue;
        }

        let mut curve_ids = Vec::new();
        let mut mnemonics = HashSet::new();

        for (source_id, edge_type) in incoming.get(node_id).into_iter().flatten() {
            if edge_type != "describes" {
                continue;
            }
            let Some(curve) = nodes_by_id.get(source_id) else { continue };
            if curve.kind != "las_curve" {
                continue;
            }
            curve_to_well.insert(source_id.clone(), node_id.clone());
            if let Some(m) = curve.mnemonic() {
                mnemonics.insert(m);
            }
            curve_ids.push(source_id.clone());
        }

        well_to_curves.insert(node_id.clone(), curve_ids);
        well_mnemonics.insert(node_id.clone(), mnemonics);
    }

    (well_to_curves, curve_to_well, well_mnemonics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::AttributeValue;
    use std::collections::HashMap as StdHashMap;

    fn node(id: &str, kind: &str, attrs: &[(&str, AttributeValue)]) -> Node {
        let mut attributes = StdHashMap::new();
        for (k, v) in attrs {
            attributes.insert(k.to_string(), v.clone());
        }
        Node { id: id.to_string(), kind: kind.to_string(), attributes }
    }

    fn sample_graph() -> Graph {
        Graph {
            nodes: vec![
                node("well-1", "las_document", &[]),
                node("curve-1", "las_curve", &[("mnemonic", AttributeValue::Text("GR".into()))]),
                node("curve-2", "las_curve", &[("mnemonic", AttributeValue::Text("NPHI".into()))]),
            ],
            edges: vec![
                Edge { source: "curve-1".into(), target: "well-1".into(), relation: "describes".into() },
                Edge { source: "curve-2".into(), target: "well-1".into(), relation: "describes".into() },
            ],
        }
    }

    #[test]
    fn curves_for_well_follows_incoming_describes_edges() {
        let traverser = GraphTraverser::new(sample_graph());
        let curves = traverser.curves_for_well("well-1");
        assert_eq!(curves.len(), 2);
    }

    #[test]
    fn well_for_curve_follows_outgoing_describes_edge() {
        let traverser = GraphTraverser::new(sample_graph());
        let well = traverser.well_for_curve("curve-1").unwrap();
        assert_eq!(well.id, "well-1");
    }

    #[test]
    fn mnemonics_for_well_are_uppercased_and_deduped() {
        let traverser = GraphTraverser::new(sample_graph());
        let mnemonics = traverser.mnemonics_for_well("well-1");
        assert!(mnemonics.contains("GR"));
        assert!(mnemonics.contains("NPHI"));
    }

    #[test]
    fn expand_search_results_zero_hops_returns_seed_only() {
        let traverser = GraphTraverser::new(sample_graph());
        let seed = traverser.get_node("curve-1").unwrap();
        let expanded = traverser.expand_search_results(&[seed], None, 0);
        assert_eq!(expanded.len(), 1);
    }

    #[test]
    fn expand_search_results_one_hop_reaches_well() {
        let traverser = GraphTraverser::new(sample_graph());
        let seed = traverser.get_node("curve-1").unwrap();
        let expanded = traverser.expand_search_results(&[seed], None, 1);
        assert!(expanded.iter().any(|n| n.id == "well-1"));
    }

    #[test]
    fn expand_search_results_never_revisits_a_node() {
        let traverser = GraphTraverser::new(sample_graph());
        let seed = traverser.get_node("curve-1").unwrap();
        let expanded = traverser.expand_search_results(&[seed], None, 5);
        let mut ids: Vec<_> = expanded.iter().map(|n| n.id.clone()).collect();
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(before, ids.len());
    }
}
