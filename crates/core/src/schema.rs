//! Schema-validated model output.
//!
//! Model replies are free text; every structured node output goes through
//! [`parse_structured`] which extracts the JSON object, deserializes it and
//! runs the type's semantic checks.

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// A type the model is asked to produce as JSON.
pub trait StructuredOutput: DeserializeOwned + JsonSchema + Send + 'static {
    /// Name used in prompts, logs and `ValidationExhausted`.
    const SCHEMA_NAME: &'static str;

    /// Semantic checks beyond what deserialization enforces.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Outcome of validating one model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation<T> {
    Valid(T),
    Invalid(String),
}

impl<T> Validation<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Parse a raw model reply into `T`.
///
/// Accepts bare JSON, JSON inside a fenced code block, or an object embedded
/// in prose (first `{` to last `}`). Reasoning blocks (`<think>...</think>`)
/// are ignored.
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Validation<T> {
    let cleaned = strip_think_blocks(raw);
    let candidates = json_candidates(&cleaned);
    if candidates.is_empty() {
        return Validation::Invalid(format!("no JSON object found in reply for {}", T::SCHEMA_NAME));
    }

    let mut last_error = String::new();
    for candidate in candidates {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => match value.validate() {
                Ok(()) => return Validation::Valid(value),
                Err(reason) => last_error = reason,
            },
            Err(e) => last_error = e.to_string(),
        }
    }
    Validation::Invalid(last_error)
}

/// Prompt snippet describing the JSON the model must return.
pub fn format_instructions<T: StructuredOutput>() -> String {
    let schema = SchemaSettings::draft07()
        .with(|s| s.inline_subschemas = true)
        .into_generator()
        .into_root_schema_for::<T>();
    let rendered = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Respond with a single JSON object that conforms to this JSON schema ({}). \
         Do not add commentary outside the JSON.\n```json\n{}\n```",
        T::SCHEMA_NAME,
        rendered
    )
}

fn strip_think_blocks(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn json_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        candidates.push(trimmed);
    }

    // Fenced blocks: ```json ... ``` or ``` ... ```
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        match body.find("```") {
            Some(close) => {
                let block = body[..close].trim();
                if block.starts_with('{') {
                    candidates.push(block);
                }
                rest = &body[close + 3..];
            }
            None => break,
        }
    }

    if let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) {
        if first < last {
            candidates.push(text[first..=last].trim());
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QueryCategory, RoutingDecision};

    const ROUTING: &str = r#"{"query_type":"theory","target_agents":["theory_explainer"],"reasoning":"concept","needs_memory":false,"needs_tools":true}"#;

    #[test]
    fn test_parse_bare_json() {
        let Validation::Valid(decision) = parse_structured::<RoutingDecision>(ROUTING) else {
            panic!("bare JSON rejected");
        };
        assert_eq!(decision.query_type, QueryCategory::Theory);
        assert_eq!(decision.priority, 1);
        assert!(decision.needs_tools);
    }

    #[test]
    fn test_parse_fenced_and_embedded() {
        let fenced = format!("Here you go:\n```json\n{}\n```\nThanks", ROUTING);
        assert!(parse_structured::<RoutingDecision>(&fenced).is_valid());

        let embedded = format!("The routing is {} as requested.", ROUTING);
        assert!(parse_structured::<RoutingDecision>(&embedded).is_valid());

        let thinking = format!("<think>maybe {{code}}?</think>{}", ROUTING);
        assert!(parse_structured::<RoutingDecision>(&thinking).is_valid());
    }

    #[test]
    fn test_parse_rejects_bad_enum_and_priority() {
        let bad_enum = ROUTING.replace("theory", "poetry");
        assert!(!parse_structured::<RoutingDecision>(&bad_enum).is_valid());

        let bad_priority = ROUTING.replace("\"needs_memory\"", "\"priority\":7,\"needs_memory\"");
        match parse_structured::<RoutingDecision>(&bad_priority) {
            Validation::Invalid(reason) => assert!(reason.contains("priority")),
            Validation::Valid(_) => panic!("priority 7 accepted"),
        }
    }

    #[test]
    fn test_parse_no_json() {
        assert!(!parse_structured::<RoutingDecision>("I cannot answer that").is_valid());
    }

    #[test]
    fn test_format_instructions_mentions_fields() {
        let text = format_instructions::<RoutingDecision>();
        assert!(text.contains("RoutingDecision"));
        assert!(text.contains("query_type"));
        assert!(text.contains("needs_memory"));
    }
}
