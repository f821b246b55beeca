//! Contract template rendering and tamper-evidence hashing.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Replace `{{field}}` placeholders with values from the merge data object.
/// Unknown placeholders are left in place so they surface during review.
pub fn render_template(content: &str, merge_data: &Value) -> String {
    let mut rendered = content.to_string();
    if let Value::Object(fields) = merge_data {
        for (key, value) in fields {
            let placeholder = format!("{{{{{}}}}}", key);
            let replacement = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rendered = rendered.replace(&placeholder, &replacement);
        }
    }
    rendered
}

/// SHA-256 of the rendered content, hex-encoded.
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replaces_merge_fields() {
        let rendered = render_template(
            "This agreement is between {{coach_name}} and {{client_name}}.",
            &json!({"coach_name": "Dana", "client_name": "Alex"}),
        );
        assert_eq!(rendered, "This agreement is between Dana and Alex.");
    }

    #[test]
    fn non_string_values_are_serialized() {
        let rendered = render_template(
            "Sessions: {{session_count}}",
            &json!({"session_count": 12}),
        );
        assert_eq!(rendered, "Sessions: 12");
    }

    #[test]
    fn unknown_placeholders_survive() {
        let rendered = render_template("Hello {{missing}}", &json!({}));
        assert_eq!(rendered, "Hello {{missing}}");
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = content_hash("signed content");
        let b = content_hash("signed content");
        let c = content_hash("signed content.");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
