//! Prompt rendering.
//!
//! Node prompts are Tera templates rendered one-off with string variables.
//! Anything that may contain braces (schemas, user text, retrieved context)
//! must be passed as a variable, never spliced into the template body.

use crate::error::{Error, Result};
use std::collections::HashMap;
use tera::{Context, Tera};

/// Render a prompt template with the provided variables.
///
/// # Example
/// ```ignore
/// let mut vars = HashMap::new();
/// vars.insert("request".to_string(), "What is RAG?".to_string());
/// let prompt = render_prompt("Question: {{ request }}", &vars)?;
/// assert_eq!(prompt, "Question: What is RAG?");
/// ```
pub fn render_prompt(template: &str, vars: &HashMap<String, String>) -> Result<String> {
    let mut context = Context::new();
    for (key, value) in vars {
        context.insert(key, value);
    }
    Tera::one_off(template, &context, false).map_err(|e| Error::Template(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_simple_prompt() {
        let mut vars = HashMap::new();
        vars.insert("request".to_string(), "What is a multi-agent system?".to_string());
        vars.insert("schema".to_string(), r#"{"type":"object"}"#.to_string());

        let prompt = render_prompt("Q: {{ request }}\nSchema: {{ schema }}", &vars).unwrap();

        assert_eq!(prompt, "Q: What is a multi-agent system?\nSchema: {\"type\":\"object\"}");
    }

    #[test]
    fn test_render_optional_block() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), String::new());

        let prompt = render_prompt("{% if context %}Context: {{ context }}{% endif %}Go", &vars).unwrap();

        assert_eq!(prompt, "Go");
    }

    #[test]
    fn test_render_missing_variable_is_error() {
        let vars = HashMap::new();
        let err = render_prompt("Hello {{ name }}", &vars).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }
}
