/// Fixed domain-synonym map used to widen recall for vocabulary-mismatch-
/// prone queries. Applied only to the text that gets embedded
/// (`state.query` itself is left untouched), and only when a trigger term
/// appears and the query isn't an aggregation- or specific-id-style lookup
/// that would just get diluted by it.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("energy", &["power", "fuel", "hydrocarbon", "petroleum"]),
    ("subsurface", &["underground", "downhole", "subterranean"]),
    ("surface water", &["streamflow", "river", "hydrology"]),
    ("gamma ray", &["GR", "natural radioactivity log"]),
    ("porosity", &["NPHI", "pore space", "void fraction"]),
    ("density", &["RHOB", "bulk density"]),
    ("resistivity", &["RDEP", "RMED", "ohm.m log"]),
];

fn is_aggregation_style(query: &str) -> bool {
    let q = query.to_lowercase();
    ["how many", "count", "total", "sum of", "list all"].iter().any(|p| q.contains(p))
}

fn is_specific_id_query(query: &str) -> bool {
    query.chars().any(|c| c.is_ascii_digit()) && (query.contains('/') || query.contains('_') || query.contains('-'))
}

pub fn should_expand_query(query: &str) -> bool {
    if is_aggregation_style(query) || is_specific_id_query(query) {
        return false;
    }
    let q = query.to_lowercase();
    SYNONYMS.iter().any(|(trigger, _)| q.contains(trigger))
}

/// Append comma-separated synonyms for each matched trigger term, so the
/// embedded text has a better chance of landing near documents using
/// different vocabulary for the same concept.
pub fn expand_query_with_synonyms(query: &str) -> String {
    let q = query.to_lowercase();
    let mut extra_terms = Vec::new();
    for (trigger, synonyms) in SYNONYMS {
        if q.contains(trigger) {
            extra_terms.extend(synonyms.iter().copied());
        }
    }
    if extra_terms.is_empty() {
        query.to_string()
    } else {
        format!("{query} ({})", extra_terms.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_queries_are_never_expanded() {
        assert!(!should_expand_query("How many gamma ray curves are there?"));
    }

    #[test]
    fn specific_well_id_queries_are_never_expanded() {
        assert!(!should_expand_query("curves for well 15/9-13"));
    }

    #[test]
    fn vocabulary_mismatch_prone_query_expands() {
        assert!(should_expand_query("What is porosity used for?"));
        let expanded = expand_query_with_synonyms("What is porosity used for?");
        assert!(expanded.contains("NPHI"));
    }

    #[test]
    fn query_without_a_trigger_term_is_unchanged() {
        assert_eq!(expand_query_with_synonyms("hello world"), "hello world");
    }
}
