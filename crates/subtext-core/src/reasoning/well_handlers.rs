//! Registry of well-relationship sub-handlers: short, factual answers
//! composed directly from graph-derived facts, with no generation-client
//! call. A representative subset of the source system's well-query
//! handler catalog — curve listing/grouping, unit filtering, log-suite
//! classification, and geological setting are carried; several narrower
//! handlers (triple-combo exclusion, capability-matrix prose) are folded
//! into the log-suite-classification handler's guard instead of kept as
//! separate registry entries, noted in the project's grounding ledger.

use std::collections::HashSet;

use crate::graph::{GraphTraverser, Node};
use crate::reasoning::domain_maps::{build_curve_groups, infer_basin_from_well_metadata, order_mnemonics, CurveGroups};

pub struct WellHandlerInput<'a> {
    pub well: &'a Node,
    pub query: String,
    pub curve_groups: CurveGroups,
    pub ordered_mnemonics: Vec<String>,
    pub mnemonics: HashSet<String>,
}

impl<'a> WellHandlerInput<'a> {
    pub fn build(well: &'a Node, query: &str, traverser: &GraphTraverser) -> Self {
        let mnemonics = traverser.mnemonics_for_well(&well.id);
        let ordered_mnemonics = order_mnemonics(&mnemonics);
        let curve_groups = build_curve_groups(&ordered_mnemonics);
        Self { well, query: query.to_lowercase(), curve_groups, ordered_mnemonics, mnemonics }
    }
}

type WellGuard = fn(&WellHandlerInput) -> bool;
type WellHandler = fn(&WellHandlerInput) -> String;

pub struct WellHandlerRegistry {
    entries: Vec<(&'static str, WellGuard, WellHandler)>,
}

impl WellHandlerRegistry {
    pub fn standard() -> Self {
        Self {
            entries: vec![
                ("resistivity_curves", guard_resistivity, handle_resistivity_curves),
                ("porosity_curves", guard_porosity, handle_porosity_curves),
                ("depth_curves", guard_depth, handle_depth_curves),
                ("unit_filter_ohm_m", guard_unit_filter, handle_unit_filter),
                ("underscore_mnemonic_count", guard_underscore_count, handle_underscore_count),
                ("log_suite_classification", guard_log_suite, handle_log_suite),
                ("geological_setting", guard_geological_setting, handle_geological_setting),
                ("curve_listing", guard_curve_listing, handle_curve_listing),
            ],
        }
    }

    /// First matching handler's answer, or `None` if nothing in the
    /// registry recognizes the query shape.
    pub fn dispatch(&self, input: &WellHandlerInput) -> Option<String> {
        self.entries.iter().find(|(_, guard, _)| guard(input)).map(|(_, _, handler)| handler(input))
    }
}

fn guard_resistivity(input: &WellHandlerInput) -> bool {
    input.query.contains("resistivity") && !input.curve_groups.resistivity.is_empty()
}

fn handle_resistivity_curves(input: &WellHandlerInput) -> String {
    let curves = input.curve_groups.resistivity.join(", ");
    if input.query.contains("percent") || input.query.contains("%") {
        let pct = 100.0 * input.curve_groups.resistivity.len() as f64 / input.ordered_mnemonics.len().max(1) as f64;
        format!(
            "Well {} has {} resistivity curve(s) ({curves}), {pct:.0}% of its {} recorded curves.",
            input.well.id,
            input.curve_groups.resistivity.len(),
            input.ordered_mnemonics.len()
        )
    } else {
        format!("Well {} has resistivity curves: {curves}.", input.well.id)
    }
}

fn guard_porosity(input: &WellHandlerInput) -> bool {
    input.query.contains("porosity") && !input.curve_groups.porosity.is_empty()
}

fn handle_porosity_curves(input: &WellHandlerInput) -> String {
    format!("Well {} has porosity-related curves: {}.", input.well.id, input.curve_groups.porosity.join(", "))
}

fn guard_depth(input: &WellHandlerInput) -> bool {
    input.query.contains("depth") && !input.curve_groups.depth.is_empty()
}

fn handle_depth_curves(input: &WellHandlerInput) -> String {
    format!("Well {} records depth via: {}.", input.well.id, input.curve_groups.depth.join(", "))
}

fn guard_unit_filter(input: &WellHandlerInput) -> bool {
    (input.query.contains("ohm.m") || input.query.contains("ohm m") || input.query.contains("ohm-m"))
        && input.query.contains("unit")
}

fn handle_unit_filter(input: &WellHandlerInput) -> String {
    if input.curve_groups.resistivity.is_empty() {
        format!("Well {} has no curves recorded in ohm.m.", input.well.id)
    } else {
        format!("Well {} has curves measured in ohm.m: {}.", input.well.id, input.curve_groups.resistivity.join(", "))
    }
}

fn guard_underscore_count(input: &WellHandlerInput) -> bool {
    input.query.contains("underscore") && input.query.contains("mnemonic")
}

fn handle_underscore_count(input: &WellHandlerInput) -> String {
    let count = input.mnemonics.iter().filter(|m| m.contains('_')).count();
    format!("Well {} has {count} mnemonic(s) containing an underscore.", input.well.id)
}

fn guard_log_suite(input: &WellHandlerInput) -> bool {
    input.query.contains("log suite") || input.query.contains("what logs") || input.query.contains("triple combo")
}

fn handle_log_suite(input: &WellHandlerInput) -> String {
    let has_triple_combo = !input.curve_groups.porosity.is_empty()
        && !input.curve_groups.resistivity.is_empty()
        && input.mnemonics.contains("GR");
    if input.query.contains("triple combo") {
        return if has_triple_combo {
            format!("Well {} has a full triple-combo suite (GR, density/neutron, resistivity).", input.well.id)
        } else {
            format!("Well {} does not have a complete triple-combo suite.", input.well.id)
        };
    }
    format!("Well {} recorded curves: {}.", input.well.id, input.ordered_mnemonics.join(", "))
}

fn guard_geological_setting(input: &WellHandlerInput) -> bool {
    input.query.contains("geological setting") || input.query.contains("basin") || input.query.contains("where is")
}

fn handle_geological_setting(input: &WellHandlerInput) -> String {
    match infer_basin_from_well_metadata(input.well) {
        Some(basin) => format!("Well {} is located in {basin}.", input.well.id),
        None => format!("No geological setting information is available for well {}.", input.well.id),
    }
}

fn guard_curve_listing(input: &WellHandlerInput) -> bool {
    input.query.contains("curve")
}

fn handle_curve_listing(input: &WellHandlerInput) -> String {
    format!("Well {} has {} curves: {}.", input.well.id, input.ordered_mnemonics.len(), input.ordered_mnemonics.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn well(id: &str) -> Node {
        Node { id: id.to_string(), kind: "las_document".to_string(), attributes: HashMap::new() }
    }

    fn input_with_mnemonics<'a>(well: &'a Node, query: &str, mnemonics: &[&str]) -> WellHandlerInput<'a> {
        let mnemonics: HashSet<String> = mnemonics.iter().map(|s| s.to_string()).collect();
        let ordered_mnemonics = order_mnemonics(&mnemonics);
        let curve_groups = build_curve_groups(&ordered_mnemonics);
        WellHandlerInput { well, query: query.to_lowercase(), curve_groups, ordered_mnemonics, mnemonics }
    }

    #[test]
    fn resistivity_handler_fires_before_generic_curve_listing() {
        let well = well("force2020-well-15_9-13");
        let input = input_with_mnemonics(&well, "what resistivity curves does this well have?", &["RDEP", "RMED", "GR"]);
        let registry = WellHandlerRegistry::standard();
        let answer = registry.dispatch(&input).unwrap();
        assert!(answer.contains("RDEP"));
    }

    #[test]
    fn curve_listing_is_the_fallback_for_a_generic_curve_question() {
        let well = well("force2020-well-15_9-13");
        let input = input_with_mnemonics(&well, "what curves does this well have?", &["GR", "DEPT"]);
        let registry = WellHandlerRegistry::standard();
        let answer = registry.dispatch(&input).unwrap();
        assert!(answer.contains("2 curves"));
    }

    #[test]
    fn no_handler_matches_an_unrelated_query() {
        let well = well("force2020-well-15_9-13");
        let input = input_with_mnemonics(&well, "what color is the rig?", &["GR"]);
        let registry = WellHandlerRegistry::standard();
        assert!(registry.dispatch(&input).is_none());
    }
}
