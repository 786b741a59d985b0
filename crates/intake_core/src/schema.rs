//! crates/intake_core/src/schema.rs
//!
//! The target shape for structured model output. Both structured calls in the
//! pipeline ask for a list of strings, optionally wrapped in a named field.

use serde_json::Value;

use crate::ports::{PortError, PortResult};

/// Describes a list of strings the model must return as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringListSchema {
    /// Wrapping object field, e.g. `{"predicted_interests": [...]}`. `None` for a bare array.
    pub field: Option<&'static str>,
    pub description: &'static str,
}

impl StringListSchema {
    pub const fn object(field: &'static str, description: &'static str) -> Self {
        Self {
            field: Some(field),
            description,
        }
    }

    pub const fn array(description: &'static str) -> Self {
        Self {
            field: None,
            description,
        }
    }

    /// Output instructions appended to the prompt.
    pub fn instructions(&self) -> String {
        match self.field {
            Some(field) => format!(
                "Respond with ONLY a JSON object of the form {{\"{field}\": [\"...\", \"...\"]}} where \"{field}\" holds {}. No prose, no markdown.",
                self.description
            ),
            None => format!(
                "Respond with ONLY a JSON array of strings, each one {}. No prose, no markdown.",
                self.description
            ),
        }
    }

    /// Decodes a raw completion into the list, tolerating a markdown code fence.
    pub fn decode(&self, raw: &str) -> PortResult<Vec<String>> {
        let body = strip_code_fence(raw);
        let value: Value = serde_json::from_str(body)
            .map_err(|e| PortError::InvalidResponse(format!("not valid JSON: {}", e)))?;

        let list = match (self.field, &value) {
            (Some(field), Value::Object(map)) => map.get(field).ok_or_else(|| {
                PortError::InvalidResponse(format!("missing field '{}'", field))
            })?,
            // Models occasionally drop the wrapper; accept the bare list.
            (_, Value::Array(_)) => &value,
            _ => {
                return Err(PortError::InvalidResponse(
                    "expected a JSON list of strings".to_string(),
                ))
            }
        };

        let items = list
            .as_array()
            .ok_or_else(|| PortError::InvalidResponse("expected a JSON array".to_string()))?;

        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| PortError::InvalidResponse(format!("non-string item: {}", item)))
            })
            .collect()
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the optional language tag on the opening fence line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const APPS: StringListSchema = StringListSchema::object("predicted_interests", "applications");
    const QUERIES: StringListSchema = StringListSchema::array("a search query");

    #[test]
    fn decodes_wrapped_object() {
        let list = APPS
            .decode(r#"{"predicted_interests": ["a", " b "]}"#)
            .unwrap();
        assert_eq!(list, vec!["a", "b"]);
    }

    #[test]
    fn decodes_fenced_array() {
        let raw = "```json\n[\"x supplier\", \"y manufacturer\"]\n```";
        assert_eq!(QUERIES.decode(raw).unwrap(), vec!["x supplier", "y manufacturer"]);
    }

    #[test]
    fn accepts_bare_array_for_object_schema() {
        assert_eq!(APPS.decode(r#"["only"]"#).unwrap(), vec!["only"]);
    }

    #[test]
    fn rejects_missing_field() {
        let err = APPS.decode(r#"{"other": []}"#).unwrap_err();
        assert!(matches!(err, PortError::InvalidResponse(_)));
    }

    #[test]
    fn rejects_non_string_items() {
        assert!(QUERIES.decode("[1, 2]").is_err());
    }

    #[test]
    fn instructions_name_the_field() {
        assert!(APPS.instructions().contains("\"predicted_interests\""));
    }
}
