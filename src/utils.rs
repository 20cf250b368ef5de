//! String helpers shared across the naming passes

/// Extract a clean field name from a `DataField` binding expression.
///
/// Bindings arrive as formula fragments like `="Name"`; the `=`, `'` and `"`
/// characters are stripped, everything else is kept verbatim.
pub fn field_name_from_binding(binding: &str) -> String {
    binding
        .chars()
        .filter(|c| !matches!(c, '=' | '\'' | '"'))
        .collect()
}

/// Remove a trailing run of ASCII digits (`Button12` -> `Button`).
pub fn strip_trailing_digits(name: &str) -> &str {
    name.trim_end_matches(|c: char| c.is_ascii_digit())
}

/// Convert a string to PascalCase.
///
/// Non-ASCII characters are dropped first, then the string is split on runs
/// of whitespace and underscores; each word keeps its first letter uppercased
/// and the rest lowercased.
pub fn to_pascal_case(s: &str) -> String {
    let ascii: String = s.chars().filter(char::is_ascii).collect();

    ascii
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect()
}

/// Whether a character can be part of a formula identifier.
pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_name_from_binding() {
        assert_eq!(field_name_from_binding("=\"Name\""), "Name");
        assert_eq!(field_name_from_binding("='PhoneNumber'"), "PhoneNumber");
        assert_eq!(field_name_from_binding("Plain"), "Plain");
        assert_eq!(field_name_from_binding(""), "");
    }

    #[test]
    fn test_strip_trailing_digits() {
        assert_eq!(strip_trailing_digits("Button12"), "Button");
        assert_eq!(strip_trailing_digits("DataCardValue1"), "DataCardValue");
        assert_eq!(strip_trailing_digits("NoDigits"), "NoDigits");
        assert_eq!(strip_trailing_digits("123"), "");
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("my control"), "MyControl");
        assert_eq!(to_pascal_case("my_control_name"), "MyControlName");
        assert_eq!(to_pascal_case("Button"), "Button");
        // A single camel-cased word is one word: the tail is lowercased
        assert_eq!(to_pascal_case("DataCardKey"), "Datacardkey");
        assert_eq!(to_pascal_case(""), "");
    }

    #[test]
    fn test_to_pascal_case_strips_non_ascii() {
        assert_eq!(to_pascal_case("ラベル label"), "Label");
    }
}
