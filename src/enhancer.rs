//! Property enhancement rules
//!
//! Each rule is independently toggled through [`Options`] and only ever
//! fills in properties that are absent from the bag; existing values are
//! never overwritten. The input bag is cloned, never mutated.

use crate::types::{FieldContext, DATA_CARD_TYPE, FORM_TYPE};
use crate::Options;
use regex::Regex;
use serde_yaml::{Mapping, Value};

/// Properties that may embed a data-source reference token.
const DATA_SOURCE_PROPS: [&str; 5] = ["DataSource", "Default", "DisplayName", "Items", "MaxLength"];

pub struct PropertyEnhancer {
    data_source_token: Regex,
}

impl PropertyEnhancer {
    pub fn new() -> Self {
        Self {
            data_source_token: Regex::new(r"\[@([a-zA-Z0-9_]+)\]").unwrap(),
        }
    }

    /// Apply every enabled rule to a copy of `properties`.
    ///
    /// Returns the new bag and one human-readable tag per property changed,
    /// in rule evaluation order.
    pub fn enhance(
        &self,
        properties: &Mapping,
        control_type: &str,
        parent_type: Option<&str>,
        field_context: Option<&FieldContext>,
        original_name: &str,
        options: &Options,
    ) -> (Mapping, Vec<String>) {
        let mut props = properties.clone();
        let mut changes = Vec::new();

        self.apply_display_mode(&mut props, control_type, options, &mut changes);
        self.apply_content_language(&mut props, control_type, options, &mut changes);
        self.apply_parent_display(&mut props, control_type, parent_type, options, &mut changes);
        self.apply_data_source_fix(&mut props, options, &mut changes);
        self.apply_card_enhancements(
            &mut props,
            control_type,
            parent_type,
            field_context,
            original_name,
            options,
            &mut changes,
        );

        (props, changes)
    }

    fn apply_display_mode(
        &self,
        props: &mut Mapping,
        control_type: &str,
        options: &Options,
        changes: &mut Vec<String>,
    ) {
        if !options.display_mode || control_type == FORM_TYPE || has(props, "DisplayMode") {
            return;
        }

        match control_type {
            "Button" | "ComboBox" | "TextInput" | "DatePicker" => {
                set_expr(
                    props,
                    "DisplayMode",
                    "=If(frmMain.Mode=FormMode.View, DisplayMode.Disabled, DisplayMode.Edit)",
                );
                changes.push("DisplayMode".to_string());
            }
            "Text" => {
                set_expr(props, "DisplayMode", "=DisplayMode.View");
                changes.push("DisplayMode".to_string());
            }
            _ => {}
        }
    }

    fn apply_content_language(
        &self,
        props: &mut Mapping,
        control_type: &str,
        options: &Options,
        changes: &mut Vec<String>,
    ) {
        if !options.content_language || has(props, "ContentLanguage") {
            return;
        }

        if control_type == "Text" || control_type == "TextInput" {
            set_expr(
                props,
                "ContentLanguage",
                &format!("=\"{}\"", options.content_language_value),
            );
            changes.push("ContentLanguage".to_string());
        }
    }

    fn apply_parent_display(
        &self,
        props: &mut Mapping,
        control_type: &str,
        parent_type: Option<&str>,
        options: &Options,
        changes: &mut Vec<String>,
    ) {
        if !options.parent_display || !parent_contains_card(parent_type) {
            return;
        }

        if control_type == "Text" && !has(props, "Text") {
            set_expr(props, "Text", "=Parent.DisplayName");
            changes.push("Text (Parent.DisplayName)".to_string());
        } else if matches!(control_type, "TextInput" | "DatePicker" | "ComboBox")
            && !has(props, "AccessibleLabel")
        {
            set_expr(props, "AccessibleLabel", "=Parent.DisplayName");
            changes.push("AccessibleLabel".to_string());
        }
    }

    fn apply_data_source_fix(
        &self,
        props: &mut Mapping,
        options: &Options,
        changes: &mut Vec<String>,
    ) {
        if !options.data_source_fix || options.data_source_name.is_empty() {
            return;
        }

        let replacement = format!("[@{}]", options.data_source_name);
        for prop in DATA_SOURCE_PROPS {
            let Some(Value::String(original)) = props.get(prop) else {
                continue;
            };
            let updated = self
                .data_source_token
                .replace_all(original, replacement.as_str());
            if updated != *original {
                let updated = updated.into_owned();
                set_expr(props, prop, &updated);
                changes.push(format!("{prop} (DataSource)"));
            }
        }
    }

    fn apply_card_enhancements(
        &self,
        props: &mut Mapping,
        control_type: &str,
        parent_type: Option<&str>,
        field_context: Option<&FieldContext>,
        original_name: &str,
        options: &Options,
        changes: &mut Vec<String>,
    ) {
        if !options.card_enhancement {
            return;
        }
        let Some(context) = field_context else {
            return;
        };
        let field_name = context.field_name();

        // The card itself
        if control_type == DATA_CARD_TYPE {
            if !has(props, "DisplayName") {
                let data_source = if options.data_source_name.is_empty() {
                    crate::DEFAULT_DATA_SOURCE
                } else {
                    &options.data_source_name
                };
                set_expr(
                    props,
                    "DisplayName",
                    &format!(
                        "=DataSourceInfo([@{data_source}],DataSourceInfo.DisplayName,'{field_name}')"
                    ),
                );
                changes.push("DisplayName".to_string());
            }

            if !has(props, "Tooltip") {
                set_expr(props, "Tooltip", &format!("=\"Enter {field_name} information\""));
                changes.push("Tooltip".to_string());
            }

            if !has(props, "ShowInfo") && context.required {
                props.insert(Value::String("ShowInfo".to_string()), Value::Bool(true));
                changes.push("ShowInfo".to_string());
            }
        }

        // Controls sitting inside a card
        if !parent_contains_card(parent_type) {
            return;
        }

        if control_type == "TextInput" {
            if !has(props, "HintText") {
                set_expr(props, "HintText", &format!("=\"Enter {field_name} here...\""));
                changes.push("HintText".to_string());
            }

            if context.required && !has(props, "Reset") {
                set_expr(props, "Reset", "=true");
                changes.push("Reset".to_string());

                if !has(props, "OnReset") {
                    set_expr(
                        props,
                        "OnReset",
                        &format!(
                            "=If(Self.Value = \"\", Notify(\"Please enter a value for {field_name}\", NotificationType.Error))"
                        ),
                    );
                    changes.push("OnReset".to_string());
                }
            }

            if !has(props, "BorderColor") {
                set_expr(
                    props,
                    "BorderColor",
                    "=If(Parent.Error, RGBA(209, 49, 53, 1), RGBA(0, 18, 107, 1))",
                );
                changes.push("BorderColor".to_string());
            }
        }

        if control_type == "ComboBox" {
            if !has(props, "PlaceholderText") {
                set_expr(
                    props,
                    "PlaceholderText",
                    &format!("=\"Select {field_name}...\""),
                );
                changes.push("PlaceholderText".to_string());
            }

            if !has(props, "SearchHintText") {
                set_expr(
                    props,
                    "SearchHintText",
                    &format!("=\"Search {field_name}...\""),
                );
                changes.push("SearchHintText".to_string());
            }
        }

        if control_type == "DatePicker" {
            if !has(props, "DateTimeFormat") {
                set_expr(props, "DateTimeFormat", "=DateTimeFormat.ShortDate");
                changes.push("DateTimeFormat".to_string());
            }

            if !has(props, "Format") {
                set_expr(props, "Format", "=DateTimeFormat.ShortDate");
                changes.push("Format".to_string());
            }
        }

        // Validation error labels
        if control_type == "Text" && original_name.to_lowercase().contains("errormessage") {
            if !has(props, "Color") {
                set_expr(props, "Color", "=RGBA(209, 49, 53, 1)");
                changes.push("Color".to_string());
            }

            if !has(props, "FontWeight") {
                set_expr(props, "FontWeight", "=FontWeight.Semibold");
                changes.push("FontWeight".to_string());
            }
        }

        // Required-star indicators
        if control_type == "Text" && original_name.to_lowercase().contains("starvisible") {
            if !has(props, "Color") {
                set_expr(props, "Color", "=RGBA(209, 49, 53, 1)");
                changes.push("Color".to_string());
            }

            if !has(props, "Visible") && context.required {
                set_expr(props, "Visible", "=true");
                changes.push("Visible".to_string());
            }
        }
    }
}

impl Default for PropertyEnhancer {
    fn default() -> Self {
        Self::new()
    }
}

fn parent_contains_card(parent_type: Option<&str>) -> bool {
    parent_type.map_or(false, |t| t.contains(DATA_CARD_TYPE))
}

fn has(props: &Mapping, key: &str) -> bool {
    props.contains_key(key)
}

fn set_expr(props: &mut Mapping, key: &str, value: &str) {
    props.insert(
        Value::String(key.to_string()),
        Value::String(value.to_string()),
    );
}
