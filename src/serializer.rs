//! Document emission
//!
//! Expression values (leading `=`) are formula text for the host
//! application and must appear unquoted in the output, with any embedded
//! single quotes intact. The emitter would otherwise quote such values
//! whenever they contain characters that are special in the text format, so
//! single quotes are protected with a placeholder before emission and a
//! line-by-line cleanup pass unwraps quoted expression lines afterwards.

use crate::error::Result;
use regex::Regex;
use serde_yaml::Value;

/// Stand-in for single quotes inside expression strings during emission.
const QUOTE_PLACEHOLDER: &str = "__CTLFIX_QUOTE__";

/// Serialize the processed tree back to text.
pub fn to_yaml_string(document: &Value) -> Result<String> {
    let protected = protect_expressions(document);
    let emitted = serde_yaml::to_string(&protected)?;
    Ok(cleanup_expression_lines(&emitted))
}

/// Replace single quotes inside expression strings with the placeholder so
/// the emitter neither doubles nor escapes them.
fn protect_expressions(value: &Value) -> Value {
    match value {
        Value::String(text) if text.starts_with('=') && text.contains('\'') => {
            Value::String(text.replace('\'', QUOTE_PLACEHOLDER))
        }
        Value::Sequence(items) => {
            Value::Sequence(items.iter().map(protect_expressions).collect())
        }
        Value::Mapping(mapping) => Value::Mapping(
            mapping
                .iter()
                .map(|(k, v)| (k.clone(), protect_expressions(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Strip wrapping quotes from quoted expression lines and restore the
/// placeholder everywhere so it can never leak into the output.
fn cleanup_expression_lines(text: &str) -> String {
    // `Key: '=expr'`, `- '=expr'`, in either quote style
    let quoted_expr =
        Regex::new(r#"^(\s*(?:- )?[^:]+:\s+|\s*-\s+)(['"])(=.*)(['"])\s*$"#).unwrap();

    let mut result = String::with_capacity(text.len());
    for line in text.lines() {
        match quoted_expr.captures(line) {
            Some(caps) if caps[2] == caps[4] => {
                let body = match &caps[2] {
                    "'" => caps[3].replace("''", "'"),
                    _ => caps[3].replace("\\\"", "\"").replace("\\\\", "\\"),
                };
                result.push_str(&caps[1]);
                result.push_str(&body);
            }
            _ => result.push_str(line),
        }
        result.push('\n');
    }

    result.replace(QUOTE_PLACEHOLDER, "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Mapping;

    fn mapping_of(pairs: &[(&str, &str)]) -> Value {
        let mut m = Mapping::new();
        for (k, v) in pairs {
            m.insert(
                Value::String(k.to_string()),
                Value::String(v.to_string()),
            );
        }
        Value::Mapping(m)
    }

    #[test]
    fn expressions_are_not_quoted() {
        let doc = mapping_of(&[("Text", "=Parent.DisplayName"), ("X", "=40")]);
        let out = to_yaml_string(&doc).unwrap();
        assert!(out.contains("Text: =Parent.DisplayName\n"));
        assert!(out.contains("X: =40\n"));
    }

    #[test]
    fn embedded_single_quotes_survive() {
        let doc = mapping_of(&[("Weight", "='TextCanvas.Weight'.Semibold")]);
        let out = to_yaml_string(&doc).unwrap();
        assert!(out.contains("Weight: ='TextCanvas.Weight'.Semibold\n"));
        assert!(!out.contains(QUOTE_PLACEHOLDER));
        assert!(!out.contains("''"));
    }

    #[test]
    fn expressions_forcing_quotes_are_unwrapped() {
        // ": " inside the expression makes the emitter quote the scalar
        let doc = mapping_of(&[(
            "OnReset",
            "=If(Self.Value = \"\", Notify(\"Error: empty\", NotificationType.Error))",
        )]);
        let out = to_yaml_string(&doc).unwrap();
        assert!(out.contains(
            "OnReset: =If(Self.Value = \"\", Notify(\"Error: empty\", NotificationType.Error))\n"
        ));
    }

    #[test]
    fn mixed_quotes_inside_forced_quoting() {
        let doc = mapping_of(&[("Mode", "=If(true, \"a: b\", 'TextInputCanvas.Mode'.Single)")]);
        let out = to_yaml_string(&doc).unwrap();
        assert!(out.contains("Mode: =If(true, \"a: b\", 'TextInputCanvas.Mode'.Single)\n"));
    }

    #[test]
    fn non_expression_strings_keep_normal_quoting() {
        let doc = mapping_of(&[("Note", "hello: world")]);
        let out = to_yaml_string(&doc).unwrap();
        // Still a quoted plain string; only expressions are unwrapped
        assert!(out.contains("'hello: world'") || out.contains("\"hello: world\""));
    }

    #[test]
    fn expression_sequence_items_are_unwrapped() {
        let doc = Value::Sequence(vec![Value::String(
            "=If(a, \"x: y\", 'z')".to_string(),
        )]);
        let out = to_yaml_string(&doc).unwrap();
        assert!(out.contains("- =If(a, \"x: y\", 'z')\n"));
    }

    #[test]
    fn output_reparses_to_the_same_tree() {
        let doc = mapping_of(&[
            ("Text", "=Parent.DisplayName"),
            ("Weight", "='TextCanvas.Weight'.Semibold"),
            ("Plain", "no expression here"),
        ]);
        let out = to_yaml_string(&doc).unwrap();
        let reparsed: Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn nested_structure_roundtrip() {
        let input = "\
- Form1:
    Control: Form@2.4.2
    Properties:
      DataSource: =Employee_Info
      Mode: =\"'TextInputCanvas.Mode'.TextInputModeSingleLine\"
    Children:
      - DataCardKey1:
          Control: Text@0.0.50
          Properties:
            Weight: ='TextCanvas.Weight'.Semibold
";
        let doc: Value = serde_yaml::from_str(input).unwrap();
        let out = to_yaml_string(&doc).unwrap();
        let reparsed: Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(reparsed, doc);
    }
}
