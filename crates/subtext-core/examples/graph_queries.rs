//! Query a combined LAS/USGS/EIA graph snapshot directly through
//! `GraphTraverser`, without going through the retrieval pipeline.

use subtext_core::graph::{load_graph, GraphTraverser, TraversalDirection};

const FIXTURE: &str = r#"{
  "nodes": [
    {"id": "force2020-well-15_9-13", "type": "las_document", "attributes": {"WELL": "Statfjord"}},
    {"id": "curve-gr", "type": "las_curve", "attributes": {"mnemonic": "GR"}},
    {"id": "curve-rdep", "type": "las_curve", "attributes": {"mnemonic": "RDEP"}}
  ],
  "edges": [
    {"source": "curve-gr", "target": "force2020-well-15_9-13", "type": "describes"},
    {"source": "curve-rdep", "target": "force2020-well-15_9-13", "type": "describes"}
  ]
}"#;

fn main() {
    let path = std::env::temp_dir().join(format!("subtext-graph-queries-example-{}.json", std::process::id()));
    std::fs::write(&path, FIXTURE).expect("write example fixture");

    let graph = load_graph(&path).expect("graph loads");
    let traverser = GraphTraverser::new(graph);

    let well_id = "force2020-well-15_9-13";
    let curves = traverser.curves_for_well(well_id);
    println!("well {well_id} has {} curves", curves.len());
    for curve in &curves {
        println!("  curve {} (mnemonic {:?})", curve.id, curve.mnemonic());
    }

    let mnemonics = traverser.mnemonics_for_well(well_id);
    println!("mnemonics: {mnemonics:?}");

    if let Some(well) = traverser.get_node(well_id) {
        let expanded = traverser.expand_search_results(&[well], Some(TraversalDirection::Incoming), 1);
        println!("one-hop incoming expansion from {well_id}: {} node(s)", expanded.len());
    }

    if let Some(summary) = traverser.relationship_summary(well_id) {
        println!("relationship summary: {summary:?}");
    }

    let _ = std::fs::remove_file(&path);
}
