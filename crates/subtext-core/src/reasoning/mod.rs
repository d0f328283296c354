mod aggregation;
mod attribute_extraction;
mod domain_maps;
mod domain_rules;
mod field_extraction;
mod orchestrator;
mod scope;
mod well_handlers;

pub use aggregation::{handle_aggregation, handle_relationship_aware_aggregation};
pub use attribute_extraction::{detect_attribute_query, should_use_structured_extraction, structured_extraction_answer, AttributeKind};
pub use domain_maps::{build_curve_groups, detect_state_name_in_query, entity_label, order_mnemonics, CurveGroups};
pub use domain_rules::apply_domain_rules;
pub use field_extraction::extract_field_from_query;
pub use orchestrator::{ReasoningContext, ReasoningOrchestrator, ReasoningStrategy};
pub use scope::{check_query_scope, generate_defusion_response, ScopeCheck};
pub use well_handlers::{WellHandlerInput, WellHandlerRegistry};
