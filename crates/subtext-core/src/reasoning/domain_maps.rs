//! Fixed petrophysics/domain lookup tables shared by well handlers,
//! attribute extraction, and aggregation.

use std::collections::HashSet;

use crate::graph::Node;

/// Stable preferred mnemonic ordering: well-identity and lithology curves
/// first, then common petrophysical logs, then everything else
/// alphabetically.
pub const PRIMARY_MNEMONIC_ORDER: &[&str] = &[
    "DEPT",
    "FORCE_2020_LITHOFACIES_LITHOLOGY",
    "FORCE_2020_LITHOFACIES_CONFIDENCE",
    "CALI",
    "MUDWEIGHT",
    "ROP",
    "RHOB",
    "GR",
    "SGR",
    "NPHI",
    "DTC",
    "DTS",
    "DRHO",
    "PEF",
    "BS",
    "DCAL",
    "RDEP",
    "RMED",
    "RSHA",
    "RXO",
    "SP",
];

/// Order `mnemonics` by [`PRIMARY_MNEMONIC_ORDER`] first, then alphabetical
/// remainder for anything not in the preference list.
pub fn order_mnemonics(mnemonics: &HashSet<String>) -> Vec<String> {
    let mut ordered = Vec::new();
    for preferred in PRIMARY_MNEMONIC_ORDER {
        if mnemonics.contains(*preferred) {
            ordered.push((*preferred).to_string());
        }
    }
    let mut remainder: Vec<String> =
        mnemonics.iter().filter(|m| !PRIMARY_MNEMONIC_ORDER.contains(&m.as_str())).cloned().collect();
    remainder.sort();
    ordered.extend(remainder);
    ordered
}

/// Grouped mnemonic sets used by well-relationship handlers to answer
/// "what depth/porosity/resistivity curves does this well have" questions
/// without a generation-client call.
#[derive(Debug, Clone, Default)]
pub struct CurveGroups {
    pub depth: Vec<String>,
    pub porosity: Vec<String>,
    pub resistivity: Vec<String>,
    pub lithology: Vec<String>,
}

pub fn build_curve_groups(ordered_mnemonics: &[String]) -> CurveGroups {
    let mut groups = CurveGroups::default();
    for m in ordered_mnemonics {
        match m.as_str() {
            "DEPT" => groups.depth.push(m.clone()),
            "NPHI" | "RHOB" | "PEF" => groups.porosity.push(m.clone()),
            "RDEP" | "RMED" | "RSHA" | "RXO" => groups.resistivity.push(m.clone()),
            "FORCE_2020_LITHOFACIES_LITHOLOGY" | "FORCE_2020_LITHOFACIES_CONFIDENCE" => {
                groups.lithology.push(m.clone())
            }
            _ => {}
        }
    }
    groups
}

/// (abbreviation, full name) pairs for the 50 US states plus DC.
pub const US_STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"), ("AK", "Alaska"), ("AZ", "Arizona"), ("AR", "Arkansas"),
    ("CA", "California"), ("CO", "Colorado"), ("CT", "Connecticut"), ("DE", "Delaware"),
    ("FL", "Florida"), ("GA", "Georgia"), ("HI", "Hawaii"), ("ID", "Idaho"),
    ("IL", "Illinois"), ("IN", "Indiana"), ("IA", "Iowa"), ("KS", "Kansas"),
    ("KY", "Kentucky"), ("LA", "Louisiana"), ("ME", "Maine"), ("MD", "Maryland"),
    ("MA", "Massachusetts"), ("MI", "Michigan"), ("MN", "Minnesota"), ("MS", "Mississippi"),
    ("MO", "Missouri"), ("MT", "Montana"), ("NE", "Nebraska"), ("NV", "Nevada"),
    ("NH", "New Hampshire"), ("NJ", "New Jersey"), ("NM", "New Mexico"), ("NY", "New York"),
    ("NC", "North Carolina"), ("ND", "North Dakota"), ("OH", "Ohio"), ("OK", "Oklahoma"),
    ("OR", "Oregon"), ("PA", "Pennsylvania"), ("RI", "Rhode Island"), ("SC", "South Carolina"),
    ("SD", "South Dakota"), ("TN", "Tennessee"), ("TX", "Texas"), ("UT", "Utah"),
    ("VT", "Vermont"), ("VA", "Virginia"), ("WA", "Washington"), ("WV", "West Virginia"),
    ("WI", "Wisconsin"), ("WY", "Wyoming"), ("DC", "District of Columbia"),
];

/// Full US state name mentioned anywhere in the lowercased query, if any.
pub fn detect_state_name_in_query(query: &str) -> Option<&'static str> {
    let q = query.to_lowercase();
    US_STATES.iter().find(|(_, name)| q.contains(&name.to_lowercase())).map(|(_, name)| *name)
}

/// Pluralized human label for each entity type, used by COUNT aggregation.
pub fn entity_label(entity_type: &str) -> &'static str {
    match entity_type {
        "las_document" => "wells",
        "las_curve" => "curves",
        "usgs_site" => "monitoring sites",
        "usgs_measurement" => "measurements",
        "eia_record" => "production records",
        _ => "records",
    }
}

/// Best-effort basin/region description inferred from a well node's
/// attributes, for the well-handler "geological setting" answer.
pub fn infer_basin_from_well_metadata(node: &Node) -> Option<String> {
    let site = node.attribute("site").and_then(crate::graph::AttributeValue::coerce_string);
    if let Some(site) = &site {
        if site.to_lowercase().contains("sleipner") {
            return Some("Sleipner area of the Norwegian North Sea".to_string());
        }
    }
    if let Some(block) = node.attribute("block").and_then(crate::graph::AttributeValue::coerce_string) {
        return Some(format!("Norwegian North Sea (block {block})"));
    }
    if node.id.to_lowercase().contains("force2020") || node.id.to_lowercase().contains("15_9") {
        return Some("Norwegian Continental Shelf".to_string());
    }
    None
}

/// Canonicalize ASCII spellings of `ohm.m` ("ohm m", "ohm-m", "ohmm") to a
/// single displayable form.
pub fn normalize_unit2(unit: &str) -> String {
    let lower = unit.to_lowercase();
    let collapsed: String = lower.chars().filter(|c| !c.is_whitespace() && *c != '.' && *c != '-').collect();
    if collapsed == "ohmm" {
        "ohm.m".to_string()
    } else {
        unit.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn order_mnemonics_prefers_primary_order_then_alphabetical() {
        let set: HashSet<String> = ["ZZZ", "GR", "DEPT", "AAA"].iter().map(|s| s.to_string()).collect();
        let ordered = order_mnemonics(&set);
        assert_eq!(ordered, vec!["DEPT", "GR", "AAA", "ZZZ"]);
    }

    #[test]
    fn normalize_unit2_canonicalizes_ohm_m_variants() {
        assert_eq!(normalize_unit2("ohm.m"), "ohm.m");
        assert_eq!(normalize_unit2("ohm m"), "ohm.m");
        assert_eq!(normalize_unit2("ohm-m"), "ohm.m");
        assert_eq!(normalize_unit2("percent"), "percent");
    }

    #[test]
    fn detect_state_name_matches_full_name() {
        assert_eq!(detect_state_name_in_query("wells in North Dakota"), Some("North Dakota"));
        assert_eq!(detect_state_name_in_query("wells in the ocean"), None);
    }

    #[test]
    fn infer_basin_defaults_to_none_without_hints() {
        let node = Node { id: "well-1".to_string(), kind: "las_document".to_string(), attributes: HashMap::new() };
        assert!(infer_basin_from_well_metadata(&node).is_none());
    }
}
