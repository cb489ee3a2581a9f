//! Placeholder template rendering.
//!
//! Templates use `{{name}}` tokens. A token's inner text must be a
//! single word (letters, digits, underscore); anything else, including
//! `{{ spaced }}` or unbalanced braces, is left verbatim. Placeholders
//! with no value render as the empty string, never as the raw token.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::recipient::Recipient;

/// Fallback company value when the recipient has none; keeps "at
/// {{company}}" phrasings readable.
const COMPANY_FALLBACK: &str = "there";

/// Renders a template against a variable map.
#[must_use]
pub fn render(template: &str, variables: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            // No closing braces left anywhere; emit the rest verbatim
            break;
        };

        let inner = &after[..end];
        if is_placeholder_name(inner) {
            out.push_str(&rest[..start]);
            if let Some(value) = variables.get(inner) {
                out.push_str(value);
            }
            rest = &after[end + 2..];
        } else {
            // Not a token; emit one brace and rescan so a real token
            // starting one character later (e.g. `{{{name}}}`) still hits
            out.push_str(&rest[..=start]);
            rest = &rest[start + 1..];
        }
    }

    out.push_str(rest);
    out
}

/// Lists the distinct placeholder names in a template, in order of
/// first appearance.
#[must_use]
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };

        let inner = &after[..end];
        if is_placeholder_name(inner) {
            if !names.iter().any(|n| n == inner) {
                names.push(inner.to_string());
            }
            rest = &after[end + 2..];
        } else {
            rest = &rest[start + 1..];
        }
    }

    names
}

/// Returns the placeholder names a template uses that `available` does
/// not provide. Empty means the template is fully covered.
#[must_use]
pub fn validate_template(template: &str, available: &[&str]) -> Vec<String> {
    extract_variables(template)
        .into_iter()
        .filter(|name| !available.iter().any(|a| a == name))
        .collect()
}

/// Builds the variable map for a recipient: `name` (falling back to the
/// email local part), `email`, `company` (falling back to
/// "there"), then the recipient's extended variables.
#[must_use]
pub fn recipient_variables(recipient: &Recipient) -> BTreeMap<String, String> {
    let mut variables = BTreeMap::new();
    variables.insert("name".to_string(), recipient.display_name().to_string());
    variables.insert("email".to_string(), recipient.email.clone());
    variables.insert(
        "company".to_string(),
        recipient
            .company
            .clone()
            .unwrap_or_else(|| COMPANY_FALLBACK.to_string()),
    );

    for (key, value) in &recipient.variables {
        variables.insert(key.clone(), value_to_string(value));
    }

    variables
}

fn is_placeholder_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Renders a JSON value the way it should appear in mail text: strings
/// bare, everything else in JSON notation.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::campaign::CampaignId;
    use crate::recipient::RecipientId;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let rendered = render(
            "Hi {{name}}, greetings from {{company}}!",
            &vars(&[("name", "Alice"), ("company", "Acme")]),
        );
        assert_eq!(rendered, "Hi Alice, greetings from Acme!");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        assert_eq!(render("Hi {{name}}!", &vars(&[])), "Hi !");
    }

    #[test]
    fn test_non_word_inner_left_verbatim() {
        let v = vars(&[("name", "Alice")]);
        assert_eq!(render("{{ name }}", &v), "{{ name }}");
        assert_eq!(render("{{first name}}", &v), "{{first name}}");
        assert_eq!(render("{{}}", &v), "{{}}");
    }

    #[test]
    fn test_unbalanced_braces_left_verbatim() {
        let v = vars(&[("name", "Alice")]);
        assert_eq!(render("Hi {{name", &v), "Hi {{name");
        assert_eq!(render("Hi name}}", &v), "Hi name}}");
    }

    #[test]
    fn test_adjacent_and_repeated_tokens() {
        let v = vars(&[("a", "1"), ("b", "2")]);
        assert_eq!(render("{{a}}{{b}}{{a}}", &v), "121");
    }

    #[test]
    fn test_literal_braces_before_token() {
        let v = vars(&[("name", "Alice")]);
        // The inner "{" disqualifies the first candidate; the real token
        // after it still renders
        assert_eq!(render("{{{name}}}", &v), "{Alice}");
    }

    #[test]
    fn test_extract_variables_unique_in_order() {
        assert_eq!(
            extract_variables("{{b}} then {{a}} then {{b}}"),
            vec!["b".to_string(), "a".to_string()]
        );
        assert!(extract_variables("no tokens {{ here }}").is_empty());
    }

    #[test]
    fn test_validate_template_reports_missing() {
        let missing = validate_template("{{name}} at {{company}} re {{role}}", &[
            "name", "email", "company",
        ]);
        assert_eq!(missing, vec!["role".to_string()]);
    }

    #[test]
    fn test_recipient_variables_defaults() {
        let r = Recipient::new(RecipientId::new("r1"), CampaignId::new("c1"), "alice@x.com")
            .unwrap();
        let v = recipient_variables(&r);
        assert_eq!(v.get("name").map(String::as_str), Some("alice"));
        assert_eq!(v.get("email").map(String::as_str), Some("alice@x.com"));
        assert_eq!(v.get("company").map(String::as_str), Some("there"));
    }

    #[test]
    fn test_recipient_variables_extended_bag() {
        let r = Recipient::new(RecipientId::new("r1"), CampaignId::new("c1"), "a@x.com")
            .unwrap()
            .with_name("Alice")
            .with_company("Acme")
            .with_variable("role", "CTO")
            .with_variable("seats", 40);
        let v = recipient_variables(&r);
        assert_eq!(v.get("name").map(String::as_str), Some("Alice"));
        assert_eq!(v.get("company").map(String::as_str), Some("Acme"));
        assert_eq!(v.get("role").map(String::as_str), Some("CTO"));
        assert_eq!(v.get("seats").map(String::as_str), Some("40"));
    }

    proptest::proptest! {
        #[test]
        fn prop_placeholder_free_render_is_identity(s in "[A-Za-z0-9 .,!}-]{0,64}") {
            proptest::prop_assert_eq!(render(&s, &BTreeMap::new()), s);
        }

        #[test]
        fn prop_unknown_placeholders_always_erased(
            literals in proptest::collection::vec("[a-z ]{0,8}", 1..6),
            names in proptest::collection::vec("[a-z_]{1,8}", 1..6),
        ) {
            let mut template = String::new();
            let mut expected = String::new();
            for (literal, name) in literals.iter().zip(&names) {
                template.push_str(literal);
                template.push_str("{{");
                template.push_str(name);
                template.push_str("}}");
                expected.push_str(literal);
            }
            proptest::prop_assert_eq!(render(&template, &BTreeMap::new()), expected);
        }

        #[test]
        fn prop_rerendering_rendered_output_changes_nothing(
            literals in proptest::collection::vec("[a-z ]{0,8}", 1..6),
            names in proptest::collection::vec("[a-z_]{1,8}", 1..6),
            values in proptest::collection::vec("[A-Za-z0-9 ]{0,8}", 1..6),
        ) {
            let mut template = String::new();
            for (literal, name) in literals.iter().zip(&names) {
                template.push_str(literal);
                template.push_str("{{");
                template.push_str(name);
                template.push_str("}}");
            }
            // Values cover only a prefix of the names; the rest render empty
            let vars: BTreeMap<String, String> = names
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect();

            let once = render(&template, &vars);
            proptest::prop_assert_eq!(render(&once, &vars), once);
        }
    }
}
