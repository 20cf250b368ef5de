//! Recursive document walk
//!
//! Drives the name generator and property enhancer over every control in
//! the parsed tree, threading parent type, screen name, and field context
//! downward, and carries the second pass that rewrites expression
//! references after all renames are known.

use crate::enhancer::PropertyEnhancer;
use crate::error::Result;
use crate::naming::generate_name;
use crate::references::ReferenceRewriter;
use crate::types::{
    ChangeLogEntry, FieldContext, FieldContextRef, ReferenceUpdate, TransformContext,
    DATA_CARD_TYPE,
};
use crate::Options;
use serde_yaml::{Mapping, Value};
use std::rc::Rc;

/// Key carrying the control descriptor (`TypeName@version`).
const CONTROL_KEY: &str = "Control";
const PROPERTIES_KEY: &str = "Properties";
const CHILDREN_KEY: &str = "Children";
const DATA_FIELD_KEY: &str = "DataField";

/// Expression context strings in the reference report are clipped to this
/// many characters.
const REPORT_CONTEXT_LEN: usize = 30;

pub struct TreeWalker<'a> {
    options: &'a Options,
    enhancer: PropertyEnhancer,
    pub ctx: TransformContext,
    pub change_log: Vec<ChangeLogEntry>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self {
            options,
            enhancer: PropertyEnhancer::new(),
            ctx: TransformContext::new(),
            change_log: Vec::new(),
        }
    }

    /// First pass: rename controls and enhance properties over the whole
    /// document.
    pub fn process(&mut self, document: &Value) -> Result<Value> {
        self.process_node(document, None, None, None)
    }

    fn process_node(
        &mut self,
        node: &Value,
        parent_type: Option<&str>,
        screen_name: Option<&str>,
        parent_field: Option<&FieldContextRef>,
    ) -> Result<Value> {
        match node {
            Value::Sequence(items) => {
                let mut result = Vec::with_capacity(items.len());
                for item in items {
                    result.push(self.process_node(item, parent_type, screen_name, parent_field)?);
                }
                Ok(Value::Sequence(result))
            }
            Value::Mapping(mapping) => {
                self.process_mapping(mapping, parent_type, screen_name, parent_field)
            }
            other => Ok(other.clone()),
        }
    }

    fn process_mapping(
        &mut self,
        mapping: &Mapping,
        parent_type: Option<&str>,
        screen_name: Option<&str>,
        parent_field: Option<&FieldContextRef>,
    ) -> Result<Value> {
        // A container introduces a screen context when one of its keys names
        // a screen; the first match applies to every entry of the container.
        let detected_screen = mapping.iter().find_map(|(key, value)| match key {
            Value::String(name)
                if (value.is_mapping() || value.is_sequence())
                    && name.to_lowercase().contains("screen") =>
            {
                Some(name.as_str())
            }
            _ => None,
        });
        let current_screen = detected_screen.or(screen_name);

        let mut result = Mapping::new();

        for (key, value) in mapping {
            let control = match (key, value) {
                (Value::String(name), Value::Mapping(body)) => {
                    control_descriptor(body).map(|descriptor| (name, body, descriptor))
                }
                _ => None,
            };

            let Some((name, body, descriptor)) = control else {
                result.insert(
                    key.clone(),
                    self.process_node(value, parent_type, current_screen, parent_field)?,
                );
                continue;
            };

            let control_type = descriptor.split('@').next().unwrap_or(descriptor).to_string();
            let properties = body.get(PROPERTIES_KEY).and_then(Value::as_mapping);
            let data_field = properties
                .and_then(|props| props.get(DATA_FIELD_KEY))
                .and_then(Value::as_str);

            // A data-bound card starts a fresh field context for its own
            // subtree; everything else shares the inherited one.
            let own_context = if control_type == DATA_CARD_TYPE {
                data_field
                    .filter(|binding| !binding.is_empty())
                    .map(|binding| {
                        let context = build_field_context(name, &control_type, binding, properties);
                        log::debug!(
                            "data card context created: {} -> {}",
                            name,
                            context.data_field
                        );
                        Rc::new(context)
                    })
            } else {
                None
            };
            let field_context = own_context.as_ref().or(parent_field);

            let new_key = generate_name(
                &mut self.ctx,
                name,
                &control_type,
                data_field,
                parent_type,
                current_screen,
                field_context.map(Rc::as_ref),
            )?;

            let mut processed = body.clone();
            let mut property_changes = Vec::new();

            if let Some(props) = properties {
                let (enhanced, changes) = self.enhancer.enhance(
                    props,
                    &control_type,
                    parent_type,
                    field_context.map(Rc::as_ref),
                    name,
                    self.options,
                );
                processed.insert(
                    Value::String(PROPERTIES_KEY.to_string()),
                    Value::Mapping(enhanced),
                );
                property_changes = changes;
            }

            if *name != new_key || !property_changes.is_empty() {
                self.change_log.push(ChangeLogEntry {
                    original: name.clone(),
                    fixed: new_key.clone(),
                    control_type: control_type.clone(),
                    property_changes: property_changes.clone(),
                    parent_field_name: field_context.map(|context| context.field_name()),
                });
            }

            if let Some(children) = body.get(CHILDREN_KEY) {
                let processed_children = self.process_node(
                    children,
                    Some(&control_type),
                    current_screen,
                    field_context,
                )?;
                processed.insert(
                    Value::String(CHILDREN_KEY.to_string()),
                    processed_children,
                );
            }

            result.insert(Value::String(new_key), Value::Mapping(processed));
        }

        Ok(Value::Mapping(result))
    }

    /// Second pass: rewrite renamed references inside every property bag of
    /// the already-processed tree.
    pub fn update_property_references(
        &mut self,
        node: &Value,
        rewriter: &ReferenceRewriter,
    ) -> Value {
        match node {
            Value::Sequence(items) => Value::Sequence(
                items
                    .iter()
                    .map(|item| self.update_property_references(item, rewriter))
                    .collect(),
            ),
            Value::Mapping(mapping) => {
                let mut result = Mapping::new();
                for (key, value) in mapping {
                    let is_properties =
                        matches!(key, Value::String(name) if name == PROPERTIES_KEY);
                    let updated = if is_properties && value.is_mapping() {
                        self.rewrite_property_bag(value.as_mapping().unwrap(), rewriter)
                    } else if value.is_mapping() || value.is_sequence() {
                        self.update_property_references(value, rewriter)
                    } else {
                        value.clone()
                    };
                    result.insert(key.clone(), updated);
                }
                Value::Mapping(result)
            }
            other => other.clone(),
        }
    }

    fn rewrite_property_bag(&mut self, props: &Mapping, rewriter: &ReferenceRewriter) -> Value {
        let mut result = Mapping::new();
        for (key, value) in props {
            let updated = match value {
                Value::String(text) => {
                    let outcome = rewriter.rewrite(text);
                    if !outcome.changed.is_empty() {
                        log::debug!("rewrote references in: {}", text);
                        self.ctx.reference_updates.push(ReferenceUpdate {
                            context: clip(text, REPORT_CONTEXT_LEN),
                            detail: outcome.changed.join(", "),
                        });
                    }
                    Value::String(outcome.value)
                }
                other => other.clone(),
            };
            result.insert(key.clone(), updated);
        }
        Value::Mapping(result)
    }
}

fn control_descriptor(body: &Mapping) -> Option<&str> {
    body.get(CONTROL_KEY).and_then(Value::as_str)
}

fn build_field_context(
    name: &str,
    control_type: &str,
    binding: &str,
    properties: Option<&Mapping>,
) -> FieldContext {
    let get_string = |key: &str| {
        properties
            .and_then(|props| props.get(key))
            .and_then(Value::as_str)
            .map(|s| s.to_string())
    };

    let required = properties
        .and_then(|props| props.get("Required"))
        .map_or(false, |value| match value {
            Value::Bool(flag) => *flag,
            Value::String(text) => text == "true" || text == "=true",
            _ => false,
        });

    FieldContext {
        data_field: binding.to_string(),
        display_name: get_string("DisplayName"),
        required,
        default: get_string("Default"),
        max_length: get_string("MaxLength"),
        control_type: control_type.to_string(),
        original_name: name.to_string(),
    }
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn walk(text: &str, options: &Options) -> (Value, Vec<ChangeLogEntry>, TransformContext) {
        let mut walker = TreeWalker::new(options);
        let tree = walker.process(&parse(text)).unwrap();
        (tree, walker.change_log, walker.ctx)
    }

    fn top_keys(value: &Value) -> Vec<String> {
        value
            .as_mapping()
            .unwrap()
            .iter()
            .filter_map(|(k, _)| k.as_str().map(|s| s.to_string()))
            .collect()
    }

    #[test]
    fn renames_control_and_keeps_position() {
        let doc = "\
Before: 1
Button1:
  Control: Button@0.0.45
After: 2
";
        let (tree, log, _) = walk(doc, &Options::default());
        assert_eq!(top_keys(&tree), vec!["Before", "btnButton", "After"]);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].original, "Button1");
        assert_eq!(log[0].fixed, "btnButton");
        assert_eq!(log[0].control_type, "Button");
    }

    #[test]
    fn field_context_flows_to_grandchildren() {
        let doc = "\
- Form1:
    Control: Form@2.4.2
    Children:
      - Name_DataCard1:
          Control: TypedDataCard@1.0.6
          Properties:
            DataField: '=\"Name\"'
            Required: =true
          Children:
            - DataCardKey1:
                Control: Text@0.0.50
            - DataCardValue1:
                Control: TextInput@0.0.53
";
        let (tree, log, _) = walk(doc, &Options::default());

        let originals: Vec<_> = log.iter().map(|e| e.original.as_str()).collect();
        let fixed: Vec<_> = log.iter().map(|e| e.fixed.as_str()).collect();
        assert_eq!(
            originals,
            vec!["Form1", "Name_DataCard1", "DataCardKey1", "DataCardValue1"]
        );
        assert_eq!(fixed, vec!["frmMain", "crdName", "lblNameKey", "txtName"]);

        // Children entries carry the card's field name
        assert_eq!(log[2].parent_field_name.as_deref(), Some("Name"));
        assert_eq!(log[3].parent_field_name.as_deref(), Some("Name"));

        // The renamed tree keeps the nesting shape
        let form = tree[0].get("frmMain").expect("renamed form present");
        let card = form["Children"][0].get("crdName").expect("renamed card");
        assert!(card["Children"][0].get("lblNameKey").is_some());
        assert!(card["Children"][1].get("txtName").is_some());
    }

    #[test]
    fn sibling_cards_get_their_own_context() {
        let doc = "\
- Form1:
    Control: Form@2.4.2
    Children:
      - EmployeeData_Card:
          Control: TypedDataCard@1.0.6
          Properties:
            DataField: '=\"EmployeeData\"'
          Children:
            - DataCardValue1:
                Control: TextInput@0.0.53
      - PhoneNumber_Card:
          Control: TypedDataCard@1.0.6
          Properties:
            DataField: '=\"PhoneNumber\"'
          Children:
            - DataCardValue2:
                Control: TextInput@0.0.53
";
        let (_, log, _) = walk(doc, &Options::default());
        let fixed: Vec<_> = log.iter().map(|e| e.fixed.as_str()).collect();
        assert_eq!(
            fixed,
            vec!["frmMain", "crdEmployeeData", "txtEmployeeData", "crdPhoneNumber", "txtPhoneNumber"]
        );
    }

    #[test]
    fn screen_name_suffixes_descendants() {
        let doc = "\
HomeScreen:
  Button1:
    Control: Button@0.0.45
";
        let (_, log, _) = walk(doc, &Options::default());
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].fixed, "btnButtonHome");
    }

    #[test]
    fn unbound_card_inherits_parent_context() {
        // A card without a DataField does not replace the inherited context
        let doc = "\
- Outer_Card:
    Control: TypedDataCard@1.0.6
    Properties:
      DataField: '=\"Outer\"'
    Children:
      - Inner_Card:
          Control: TypedDataCard@1.0.6
          Children:
            - DataCardValue1:
                Control: TextInput@0.0.53
";
        let (_, log, _) = walk(doc, &Options::default());
        let fixed: Vec<_> = log.iter().map(|e| e.fixed.as_str()).collect();
        // Inner card is named through the parent-context rule, and the
        // text input still sees the outer field
        assert_eq!(fixed, vec!["crdOuter", "crdOuter1", "txtOuter"]);
    }

    #[test]
    fn required_flag_normalization() {
        for (required_yaml, expected) in [
            ("Required: true", true),
            ("Required: 'true'", true),
            ("Required: '=true'", true),
            ("Required: false", false),
            ("Required: '=false'", false),
        ] {
            let doc = format!(
                "\
- Card1:
    Control: TypedDataCard@1.0.6
    Properties:
      DataField: '=\"Name\"'
      {required_yaml}
    Children:
      - StarVisible1:
          Control: Text@0.0.50
          Properties:
            X: =1
"
            );
            let options = Options {
                card_enhancement: true,
                ..Options::default()
            };
            let (tree, _, _) = walk(&doc, &options);
            let star = &tree[0]["crdName"]["Children"][0]["lblNameRequired"];
            let visible = star["Properties"].get("Visible").is_some();
            assert_eq!(visible, expected, "case: {required_yaml}");
        }
    }

    #[test]
    fn reference_pass_rewrites_property_bags_only() {
        let options = Options::default();
        let doc = "\
- Form1:
    Control: Form@2.4.2
    Properties:
      OnSuccess: =Select(Button1)
    Children:
      - Button1:
          Control: Button@0.0.45
    Note: Button1 stays untouched outside Properties
";
        let mut walker = TreeWalker::new(&options);
        let processed = walker.process(&parse(doc)).unwrap();
        let rewriter = ReferenceRewriter::new(&walker.ctx.name_table, None);
        let updated = walker.update_property_references(&processed, &rewriter);

        let form = &updated[0]["frmMain"];
        assert_eq!(
            form["Properties"]["OnSuccess"].as_str(),
            Some("=Select(btnButton)")
        );
        assert_eq!(
            form["Note"].as_str(),
            Some("Button1 stays untouched outside Properties")
        );
        assert_eq!(walker.ctx.reference_updates.len(), 1);
        assert_eq!(walker.ctx.reference_updates[0].context, "=Select(Button1)");
    }

    #[test]
    fn reference_report_clips_long_expressions() {
        let options = Options::default();
        let doc = "\
- Form1:
    Control: Form@2.4.2
    Properties:
      OnSuccess: =Notify(Button1.Text & \" was pressed here\")
    Children:
      - Button1:
          Control: Button@0.0.45
";
        let mut walker = TreeWalker::new(&options);
        let processed = walker.process(&parse(doc)).unwrap();
        let rewriter = ReferenceRewriter::new(&walker.ctx.name_table, None);
        walker.update_property_references(&processed, &rewriter);

        let report = &walker.ctx.reference_updates[0];
        assert!(report.context.ends_with("..."));
        assert_eq!(report.context.chars().count(), 30);
    }

    #[test]
    fn scalar_documents_pass_through() {
        let options = Options::default();
        let mut walker = TreeWalker::new(&options);
        let tree = walker.process(&parse("42")).unwrap();
        assert_eq!(tree, parse("42"));
        assert!(walker.change_log.is_empty());
    }
}
