//! Name generation for controls
//!
//! Computes a convention-conforming name from a control's type, its own
//! data-field binding, and the field context inherited from an enclosing
//! data card, then enforces document-wide uniqueness.

use crate::error::{Error, Result};
use crate::types::{prefix_for_type, FieldContext, TransformContext, DATA_CARD_TYPE, FORM_TYPE};
use crate::utils::{field_name_from_binding, strip_trailing_digits, to_pascal_case};

/// Hard stop for the collision counter. Reaching it means the document is
/// pathological; failing beats spinning.
const NAME_COUNTER_LIMIT: usize = 10_000;

/// Generate the unique replacement name for one control.
///
/// The candidate is chosen in three stages: parent-context pattern rules
/// (when the control sits inside a data card), type-specific fallbacks, and
/// a screen-name suffix. A numeric counter resolves case-insensitive
/// collisions against every name already assigned in this run. The
/// `original -> final` pair is recorded in the run's name table when the
/// two differ.
pub fn generate_name(
    ctx: &mut TransformContext,
    original_name: &str,
    control_type: &str,
    field_binding: Option<&str>,
    parent_type: Option<&str>,
    screen_name: Option<&str>,
    parent_field: Option<&FieldContext>,
) -> Result<String> {
    let base_name = strip_trailing_digits(original_name);

    let field_name = field_binding.map(field_name_from_binding).unwrap_or_default();

    let prefix = prefix_for_type(control_type);

    let mut new_name = String::new();

    // Pattern rules keyed off the enclosing data card's field
    if let Some(parent) = parent_field {
        let parent_field_name = parent.field_name();
        log::debug!(
            "parent field '{}' in scope for '{}'",
            parent_field_name,
            original_name
        );

        if parent_type.map_or(false, |t| t.contains(DATA_CARD_TYPE)) {
            new_name = match control_type {
                "Text" if base_name.contains("DataCardKey") => {
                    format!("lbl{parent_field_name}Key")
                }
                "TextInput" if base_name.contains("DataCardValue") => {
                    format!("txt{parent_field_name}")
                }
                "Text" if base_name.contains("ErrorMessage") => {
                    format!("lbl{parent_field_name}Error")
                }
                "Text" if base_name.contains("StarVisible") => {
                    format!("lbl{parent_field_name}Required")
                }
                "DatePicker" if base_name.contains("DataCardValue") => {
                    format!("dte{parent_field_name}")
                }
                "ComboBox" if base_name.contains("DataCardValue") => {
                    format!("cmb{parent_field_name}")
                }
                "CheckBox" if base_name.contains("DataCardValue") => {
                    format!("chk{parent_field_name}")
                }
                _ => format!("{prefix}{parent_field_name}"),
            };
        }
    }

    // Fallback rules when no parent-context pattern applied
    if new_name.is_empty() {
        new_name = if control_type == DATA_CARD_TYPE && !field_name.is_empty() {
            format!("crd{field_name}")
        } else if control_type == FORM_TYPE && original_name.contains("Form") {
            "frmMain".to_string()
        } else if !field_name.is_empty() {
            format!("{prefix}{field_name}")
        } else {
            format!("{prefix}{}", to_pascal_case(base_name))
        };
    }

    // Screen suffix, with the trailing "Screen" literal and punctuation removed
    if let Some(screen) = screen_name.filter(|s| !s.is_empty()) {
        if control_type != FORM_TYPE {
            let suffix: String = screen
                .strip_suffix("Screen")
                .unwrap_or(screen)
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect();
            new_name.push_str(&suffix);
        }
    }

    // Counter suffix until the name is free, case-insensitively
    let mut unique_name = new_name.clone();
    let mut counter = 1;
    while ctx.generated_names.contains(&unique_name.to_lowercase()) {
        if counter > NAME_COUNTER_LIMIT {
            return Err(Error::NameExhaustion {
                name: new_name,
                limit: NAME_COUNTER_LIMIT,
            });
        }
        unique_name = format!("{new_name}{counter}");
        counter += 1;
    }

    ctx.generated_names.insert(unique_name.to_lowercase());

    if original_name != unique_name {
        ctx.name_table.record(original_name, &unique_name);
    }

    Ok(unique_name)
}
