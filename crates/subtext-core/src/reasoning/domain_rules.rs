//! Hand-written petrophysics short-circuits: fixed factual sentences for a
//! handful of recurring conceptual questions that don't need retrieval at
//! all. Tried in order; first hit wins.

type DomainRule = fn(&str) -> Option<&'static str>;

const RULES: &[DomainRule] = &[
    nphi_purpose,
    gr_interpretation,
    rhob_purpose,
    neutron_density_crossover,
    gas_bearing_identification,
    lithology_tools,
];

fn contains_all(q: &str, needles: &[&str]) -> bool {
    needles.iter().all(|n| q.contains(n))
}

fn nphi_purpose(q: &str) -> Option<&'static str> {
    if q.contains("nphi") || (q.contains("neutron") && q.contains("porosity")) {
        Some(
            "NPHI is the neutron porosity log, which measures the hydrogen index of the \
             formation to estimate pore space filled with fluid — it's a core input for \
             porosity and lithology interpretation.",
        )
    } else {
        None
    }
}

fn gr_interpretation(q: &str) -> Option<&'static str> {
    if q.contains("gamma ray") || q == "gr" || (q.contains(" gr ") || q.starts_with("gr ") || q.ends_with(" gr")) {
        Some(
            "The gamma ray (GR) log measures natural radioactivity and is mainly used to \
             distinguish shale (higher radioactivity) from cleaner reservoir rock like \
             sandstone or carbonate (lower radioactivity).",
        )
    } else {
        None
    }
}

fn rhob_purpose(q: &str) -> Option<&'static str> {
    if q.contains("rhob") || (q.contains("bulk density") && q.contains("log")) {
        Some(
            "RHOB is the bulk density log, measuring the overall density of the formation \
             including rock matrix and fluid-filled pore space — combined with NPHI it helps \
             identify lithology and gas effect.",
        )
    } else {
        None
    }
}

fn neutron_density_crossover(q: &str) -> Option<&'static str> {
    if contains_all(q, &["neutron", "density"]) && (q.contains("crossover") || q.contains("cross over")) {
        Some(
            "A neutron-density crossover, where the neutron porosity curve reads lower than \
             density porosity, is a classic indicator of gas in the pore space, since gas \
             lowers the neutron response more than it lowers density.",
        )
    } else {
        None
    }
}

fn gas_bearing_identification(q: &str) -> Option<&'static str> {
    if q.contains("gas") && (q.contains("identify") || q.contains("how do you know") || q.contains("how can you tell"))
    {
        Some(
            "Gas-bearing intervals are typically identified by a neutron-density crossover, \
             a gamma ray low enough to indicate clean reservoir rock, and often a resistivity \
             increase relative to surrounding water-bearing zones.",
        )
    } else {
        None
    }
}

fn lithology_tools(q: &str) -> Option<&'static str> {
    if q.contains("lithology") && (q.contains("determine") || q.contains("tool") || q.contains("log")) {
        Some(
            "Lithology is typically interpreted from a combination of gamma ray, neutron \
             porosity, bulk density, and photoelectric factor (PEF) logs, cross-checked \
             against any available core or cuttings description.",
        )
    } else {
        None
    }
}

/// Try each rule in order against the lowercased query; first hit wins.
pub fn apply_domain_rules(query: &str) -> Option<&'static str> {
    let q = query.to_lowercase();
    RULES.iter().find_map(|rule| rule(&q))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nphi_question_gets_the_nphi_rule() {
        assert!(apply_domain_rules("What is NPHI used for?").unwrap().contains("neutron porosity"));
    }

    #[test]
    fn crossover_rule_fires_before_generic_gas_rule() {
        let answer = apply_domain_rules("What does a neutron density crossover mean for gas?").unwrap();
        assert!(answer.contains("crossover"));
    }

    #[test]
    fn unrelated_query_has_no_domain_rule() {
        assert!(apply_domain_rules("What is the capital of France?").is_none());
    }
}
