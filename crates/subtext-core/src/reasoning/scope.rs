//! In/out-of-scope taxonomy and defusion-response generation.

const IN_SCOPE_TOPICS: &[(&str, &[&str])] = &[
    ("energy", &["oil", "gas", "petroleum", "hydrocarbon", "production", "barrels", "mcf", "eia"]),
    ("subsurface", &["well", "borehole", "las file", "curve", "mnemonic", "lithology", "porosity", "resistivity"]),
    ("surface_water", &["streamflow", "discharge", "gauge", "usgs", "river", "hydrology", "monitoring site"]),
    ("geospatial", &["basin", "block", "north sea", "site code", "coordinates", "region"]),
];

const OUT_OF_SCOPE_TOPICS: &[(&str, &[&str])] = &[
    ("politics", &["election", "president", "senator", "congress", "political party"]),
    ("entertainment", &["movie", "celebrity", "tv show", "actor", "music album"]),
    ("weather", &["weather", "forecast", "temperature today", "will it rain", "weather tomorrow"]),
    ("sports", &["football", "basketball", "world cup", "olympics", "baseball score"]),
    ("general_trivia", &["capital of", "who invented", "how old is", "when was the telephone"]),
];

#[derive(Debug, Clone)]
pub struct ScopeCheck {
    pub in_scope: bool,
    pub category: Option<String>,
    pub confidence: f64,
}

fn best_match(query: &str, table: &[(&str, &[&str])]) -> Option<(String, f64)> {
    let q = query.to_lowercase();
    let mut best: Option<(String, usize)> = None;
    for (category, keywords) in table {
        let hits = keywords.iter().filter(|k| q.contains(*k)).count();
        if hits > 0 && best.as_ref().map(|(_, h)| hits > *h).unwrap_or(true) {
            best = Some((category.to_string(), hits));
        }
    }
    best.map(|(category, hits)| (category, (0.75 + 0.1 * (hits.saturating_sub(1)) as f64).min(1.0)))
}

/// Keyword-only scope check, mirroring the original system's two keyword
/// tables. Falls back to "in scope, low confidence" when neither table
/// matches decisively, so unrelated queries aren't silently defused.
pub fn check_query_scope(query: &str) -> ScopeCheck {
    if let Some((category, confidence)) = best_match(query, OUT_OF_SCOPE_TOPICS) {
        if best_match(query, IN_SCOPE_TOPICS).is_none() {
            return ScopeCheck { in_scope: false, category: Some(category), confidence };
        }
    }
    if let Some((category, confidence)) = best_match(query, IN_SCOPE_TOPICS) {
        return ScopeCheck { in_scope: true, category: Some(category), confidence };
    }
    ScopeCheck { in_scope: true, category: None, confidence: 0.3 }
}

/// Friendly redirect naming the detected out-of-scope category. Begins with
/// "This question appears to be about {category}" so the category is the
/// first thing a caller can match on.
pub fn generate_defusion_response(category: &str) -> String {
    let readable = category.replace('_', " ");
    format!(
        "This question appears to be about {readable}, which is outside what I can help with. \
         I'm built to answer questions about energy and subsurface data — wells, curves, \
         production records, and surface water measurements."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_scope_energy_query() {
        let check = check_query_scope("how much oil production was reported in North Dakota?");
        assert!(check.in_scope);
        assert_eq!(check.category.as_deref(), Some("energy"));
    }

    #[test]
    fn out_of_scope_sports_query() {
        let check = check_query_scope("who won the world cup final?");
        assert!(!check.in_scope);
        assert_eq!(check.category.as_deref(), Some("sports"));
    }

    #[test]
    fn ambiguous_query_defaults_in_scope_low_confidence() {
        let check = check_query_scope("tell me something interesting");
        assert!(check.in_scope);
        assert!(check.confidence < 0.5);
    }

    #[test]
    fn defusion_message_names_the_category() {
        let msg = generate_defusion_response("general_trivia");
        assert!(msg.contains("general trivia"));
    }

    #[test]
    fn weather_query_is_out_of_scope_with_high_confidence() {
        let check = check_query_scope("What is the weather today?");
        assert!(!check.in_scope);
        assert_eq!(check.category.as_deref(), Some("weather"));
        assert!(check.confidence > 0.7);

        let msg = generate_defusion_response(&check.category.unwrap());
        assert!(msg.starts_with("This question appears to be about weather"));
    }
}
