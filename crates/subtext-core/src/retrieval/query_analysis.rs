use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::graph::TraversalDirection;
use crate::retrieval::config as cfg;
use crate::retrieval::state::{AggregationType, RelationshipDetection, RelationshipType, TraversalStrategy};

/// Regex patterns compiled once at process startup and shared across every
/// query, rather than recompiled per call.
static WELL_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+/\d+[-_]\d+\w*|\d+_\d+[-_]\d+\w*)").unwrap());
static SITE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{8}\b").unwrap());

static WELL_TO_CURVES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)curves?\s+(for|of|on|in)\s+well|well.*curves?|what curves").unwrap());
static CURVE_TO_WELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)which well|what well.*(curve|mnemonic)|well (for|of|has) (curve|mnemonic)").unwrap());
static SITE_TO_MEASUREMENTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)measurements?\s+(for|of|at|in)\s+site|site.*measurements?").unwrap());
static MEASUREMENT_TO_SITE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)which site|what site.*measurement|site (for|of) measurement").unwrap());
static CURVE_TO_DOCUMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)document.*curve|curve.*document|las file.*curve").unwrap());

const KNOWN_MNEMONICS: &[&str] = &[
    "DEPT", "GR", "SGR", "NPHI", "RHOB", "DTC", "DTS", "DRHO", "PEF", "CALI", "BS", "DCAL",
    "RDEP", "RMED", "RSHA", "RXO", "SP", "MUDWEIGHT", "ROP", "FORCE_2020_LITHOFACIES_LITHOLOGY",
    "FORCE_2020_LITHOFACIES_CONFIDENCE",
];

/// Ordered `(type, matcher)` table. First match wins — keeps cyclomatic
/// complexity bounded as new aggregation types are added, per the source
/// system's config-driven detector design.
fn detect_aggregation_type(query: &str) -> Option<AggregationType> {
    let q = query.to_lowercase();

    if q.contains("what data") && q.contains("available") {
        return Some(AggregationType::Count);
    }

    if is_comparison_query(&q) {
        return Some(AggregationType::Comparison);
    }
    if is_range_query(&q) {
        return Some(AggregationType::Range);
    }
    if contains_any(&q, &["most recent", "latest", "newest", "maximum", "highest"]) {
        return Some(AggregationType::Max);
    }
    if contains_any(&q, &["oldest", "earliest", "minimum", "lowest"]) {
        return Some(AggregationType::Min);
    }
    if contains_any(&q, &["how many", "count", "number of", "total number"]) {
        return Some(AggregationType::Count);
    }
    if contains_any(&q, &["list all", "show all", "what are all", "enumerate"]) {
        return Some(AggregationType::List);
    }
    if contains_any(&q, &["different", "unique", "distinct", "various"]) {
        return Some(AggregationType::Distinct);
    }
    if contains_any(&q, &["total production", "sum of", "combined"]) {
        return Some(AggregationType::Sum);
    }
    None
}

fn is_comparison_query(q: &str) -> bool {
    (q.contains("which") && (q.contains("more") || q.contains("most")))
        || q.contains("are there more")
        || contains_any(q, &["more records", "more data", "more measurements", "more curves"])
}

fn is_range_query(q: &str) -> bool {
    q.contains("range")
        || (q.contains("span") && (q.contains("year") || q.contains("time") || q.contains("period")))
        || contains_any(q, &["how many years", "number of years"])
        || contains_any(q, &["years of data", "year span"])
        || (q.contains("difference between") && (q.contains("max") || q.contains("maximum")))
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

struct RelationshipPattern {
    kind: RelationshipType,
    pattern: &'static Lazy<Regex>,
    keywords: &'static [&'static str],
}

static RELATIONSHIP_PATTERNS: &[RelationshipPattern] = &[
    RelationshipPattern { kind: RelationshipType::WellToCurves, pattern: &WELL_TO_CURVES_RE, keywords: &["curves for", "curves of", "curves in"] },
    RelationshipPattern { kind: RelationshipType::CurveToWell, pattern: &CURVE_TO_WELL_RE, keywords: &["which well has", "well for mnemonic"] },
    RelationshipPattern { kind: RelationshipType::SiteToMeasurements, pattern: &SITE_TO_MEASUREMENTS_RE, keywords: &["measurements at", "measurements for site"] },
    RelationshipPattern { kind: RelationshipType::MeasurementToSite, pattern: &MEASUREMENT_TO_SITE_RE, keywords: &["site for measurement"] },
    RelationshipPattern { kind: RelationshipType::CurveToDocument, pattern: &CURVE_TO_DOCUMENT_RE, keywords: &["document for curve"] },
];

/// Detect a well/site relationship shape in the query, extract recognized
/// entity ids, and score confidence additively (clamped to `[0, 1]`, per
/// the spec's resolved open question): `+0.6` pattern match, `+0.2`
/// relationship-keyword hit, `+0.1` per entity kind found (up to `+0.2`),
/// `+0.1` synergy bonus when both a pattern and an entity are present.
pub fn detect_relationship_query(query: &str) -> RelationshipDetection {
    let q = query.to_lowercase();

    let well_ids: Vec<String> = WELL_ID_RE
        .find_iter(query)
        .map(|m| m.as_str().replace('/', "_"))
        .collect();
    let site_codes: Vec<String> = SITE_CODE_RE.find_iter(query).map(|m| m.as_str().to_string()).collect();
    let mnemonics: Vec<String> = KNOWN_MNEMONICS
        .iter()
        .filter(|m| {
            let upper = query.to_uppercase();
            upper.contains(*m)
        })
        .map(|m| m.to_string())
        .collect();

    let mut best: Option<(&RelationshipPattern, bool)> = None;
    for rel in RELATIONSHIP_PATTERNS {
        let pattern_match = rel.pattern.is_match(query);
        let keyword_hit = rel.keywords.iter().any(|k| q.contains(k));
        if pattern_match || keyword_hit {
            let mut confidence = 0.0;
            if pattern_match {
                confidence += 0.6;
            }
            if keyword_hit {
                confidence += 0.2;
            }
            let entity_kinds_found =
                [!well_ids.is_empty(), !site_codes.is_empty(), !mnemonics.is_empty()].iter().filter(|b| **b).count();
            confidence += (entity_kinds_found.min(2) as f64) * 0.1;
            if pattern_match && entity_kinds_found > 0 {
                confidence += 0.1;
            }

            if best.map(|(_, existing)| confidence > existing).unwrap_or(true) {
                best = Some((rel, confidence));
            }
        }
    }

    let (relationship_type, confidence) = match best {
        Some((rel, confidence)) => (Some(rel.kind), confidence.clamp(0.0, 1.0)),
        None => (None, 0.0),
    };

    let apply_traversal = confidence >= cfg::MIN_TRAVERSAL_CONFIDENCE;
    let seed_kinds: Vec<String> = match relationship_type {
        Some(RelationshipType::WellToCurves) => vec!["las_curve".to_string()],
        Some(RelationshipType::CurveToWell) => vec!["las_document".to_string()],
        _ => Vec::new(),
    };
    let relation_name = relationship_type.map(relationship_type_name);
    let max_hops = cfg::traversal_hops(relation_name, &seed_kinds);
    let direction = relationship_type.map(|rt| match rt {
        RelationshipType::WellToCurves | RelationshipType::CurveToWell => TraversalDirection::Both,
        _ => TraversalDirection::Both,
    });

    RelationshipDetection {
        relationship_type,
        confidence,
        well_ids,
        site_codes,
        mnemonics,
        traversal_strategy: TraversalStrategy {
            apply_traversal,
            max_hops,
            direction,
            edge_type: relationship_type.map(relationship_edge_type),
        },
    }
}

fn relationship_type_name(rt: RelationshipType) -> &'static str {
    match rt {
        RelationshipType::WellToCurves => "well_to_curves",
        RelationshipType::CurveToWell => "curve_to_well",
        RelationshipType::SiteToMeasurements => "site_to_measurements",
        RelationshipType::MeasurementToSite => "measurement_to_site",
        RelationshipType::CurveToDocument => "curve_to_document",
    }
}

fn relationship_edge_type(rt: RelationshipType) -> String {
    match rt {
        RelationshipType::WellToCurves | RelationshipType::CurveToWell => "describes".to_string(),
        RelationshipType::SiteToMeasurements | RelationshipType::MeasurementToSite => "reports_on".to_string(),
        RelationshipType::CurveToDocument => "describes".to_string(),
    }
}

const ENTITY_FILTER_KEYWORDS: &[(&[&str], &str)] = &[
    (&["production", "eia", "barrels", "mcf"], "eia_record"),
    (&["usgs site", "monitoring site", "streamflow site"], "usgs_site"),
    (&["streamflow", "discharge", "gauge reading", "measurement"], "usgs_measurement"),
    (&["gamma ray", "nphi", "rhob", "curve", "mnemonic", "log"], "las_curve"),
    (&["well", "las file", "borehole"], "las_document"),
];

/// Entity-type filter inferred from keyword hits, unless the caller already
/// supplied one.
pub fn detect_entity_filter(query: &str, caller_override: Option<&str>) -> Option<String> {
    if caller_override.is_some() {
        return caller_override.map(str::to_string);
    }
    let q = query.to_lowercase();
    ENTITY_FILTER_KEYWORDS.iter().find(|(keywords, _)| keywords.iter().any(|k| q.contains(k))).map(|(_, kind)| kind.to_string())
}

/// Normalized well identifier extracted from anywhere in the query, `/`
/// mapped to `_`.
pub fn detect_well_id_filter(query: &str) -> Option<String> {
    WELL_ID_RE.find(query).map(|m| m.as_str().replace('/', "_"))
}

pub struct QueryAnalysis {
    pub aggregation_type: Option<AggregationType>,
    pub relationship: RelationshipDetection,
    pub auto_filter: Option<BTreeMap<String, String>>,
    pub well_id_filter: Option<String>,
}

pub fn analyze(query: &str, caller_entity_filter: Option<&str>) -> QueryAnalysis {
    let aggregation_type = detect_aggregation_type(query);
    let relationship = detect_relationship_query(query);
    let entity = detect_entity_filter(query, caller_entity_filter);
    let auto_filter = entity.map(|kind| {
        let mut m = BTreeMap::new();
        m.insert("entity_type".to_string(), kind);
        m
    });
    let well_id_filter = detect_well_id_filter(query);

    QueryAnalysis { aggregation_type, relationship, auto_filter, well_id_filter }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn how_many_wells_detects_count() {
        assert_eq!(detect_aggregation_type("How many wells are there?"), Some(AggregationType::Count));
    }

    #[test]
    fn which_well_has_more_curves_detects_comparison_before_count() {
        assert_eq!(
            detect_aggregation_type("Which well has more curves recorded?"),
            Some(AggregationType::Comparison)
        );
    }

    #[test]
    fn how_many_years_is_range_not_count() {
        assert_eq!(detect_aggregation_type("How many years of data do we have?"), Some(AggregationType::Range));
    }

    #[test]
    fn plain_question_has_no_aggregation_type() {
        assert_eq!(detect_aggregation_type("What is NPHI used for?"), None);
    }

    #[test]
    fn well_id_filter_normalizes_slash_to_underscore() {
        assert_eq!(detect_well_id_filter("curves for well 15/9-13"), Some("15_9-13".to_string()));
    }

    #[test]
    fn well_to_curves_relationship_has_high_confidence_with_well_id() {
        let d = detect_relationship_query("What curves are available for well 15/9-13?");
        assert_eq!(d.relationship_type, Some(RelationshipType::WellToCurves));
        assert!(d.confidence >= cfg::MEDIUM_RELATIONSHIP_CONFIDENCE);
        assert_eq!(d.well_ids, vec!["15_9-13".to_string()]);
    }

    #[test]
    fn confidence_never_exceeds_one() {
        let d = detect_relationship_query("What curves for well 15/9-13 curves for well 15/9-13?");
        assert!(d.confidence <= 1.0);
    }

    #[test]
    fn unrelated_query_has_zero_confidence_and_no_relationship() {
        let d = detect_relationship_query("What is the weather today?");
        assert!(d.relationship_type.is_none());
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn auto_filter_detects_curve_keywords() {
        let filter = detect_entity_filter("What gamma ray curves exist?", None);
        assert_eq!(filter, Some("las_curve".to_string()));
    }

    #[test]
    fn auto_filter_respects_caller_override() {
        let filter = detect_entity_filter("What gamma ray curves exist?", Some("usgs_site"));
        assert_eq!(filter, Some("usgs_site".to_string()));
    }
}
