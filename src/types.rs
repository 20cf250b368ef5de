//! Core types for the control naming tool

use serde::Serialize;
use std::collections::HashSet;
use std::rc::Rc;

/// Control type that carries the data-field binding for its subtree.
pub const DATA_CARD_TYPE: &str = "TypedDataCard";

/// Control type that anchors a form; never receives a screen suffix.
pub const FORM_TYPE: &str = "Form";

/// Naming prefix for a control type.
///
/// Unknown types fall back to `ctl`.
pub fn prefix_for_type(control_type: &str) -> &'static str {
    match control_type {
        "Form" => "frm",
        "TypedDataCard" => "crd",
        "Text" => "lbl",
        "TextInput" => "txt",
        "ComboBox" => "cmb",
        "DatePicker" => "dte",
        "Button" => "btn",
        "Image" => "img",
        "Gallery" => "gal",
        "Canvas" => "can",
        "Icon" => "ico",
        "Rectangle" => "shp",
        "CheckBox" => "chk",
        "RadioButton" => "rad",
        "Slider" => "sld",
        "Toggle" => "tgl",
        "Timer" => "tmr",
        "List" => "lst",
        "HTML" => "htm",
        "PCF" => "pcf",
        "Container" => "con",
        "Card" => "crd",
        _ => "ctl",
    }
}

/// Field binding context created at a data-bound card and shared, unchanged,
/// with every control in its subtree.
///
/// Contexts are immutable after construction; descendants hold the same
/// `Rc` instance rather than copies.
#[derive(Debug, Clone)]
pub struct FieldContext {
    /// Raw `DataField` binding, e.g. `="Name"`
    pub data_field: String,
    /// `DisplayName` expression of the card, if present
    pub display_name: Option<String>,
    /// Required flag, normalized from `true` / `"true"` / `"=true"`
    pub required: bool,
    /// `Default` expression of the card, if present
    pub default: Option<String>,
    /// `MaxLength` expression of the card, if present
    pub max_length: Option<String>,
    /// Type of the control that created this context
    pub control_type: String,
    /// Name the creating control had before renaming
    pub original_name: String,
}

impl FieldContext {
    /// The bound field name with binding punctuation stripped.
    pub fn field_name(&self) -> String {
        crate::utils::field_name_from_binding(&self.data_field)
    }
}

/// One control whose name or properties changed during a run.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeLogEntry {
    pub original: String,
    pub fixed: String,
    pub control_type: String,
    pub property_changes: Vec<String>,
    pub parent_field_name: Option<String>,
}

/// One rewritten expression, reported for display.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceUpdate {
    /// The expression before rewriting, truncated for display
    pub context: String,
    /// Human-readable list of the replacements applied
    pub detail: String,
}

/// Ordered original-name to final-name mapping built during the walk.
///
/// Iteration order is pre-order traversal order. Values are unique
/// case-insensitively across the run; recording the same original twice
/// updates the value in place and keeps the first-insertion position.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NameTable {
    entries: Vec<(String, String)>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, original: &str, fixed: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(o, _)| o == original) {
            entry.1 = fixed.to_string();
        } else {
            self.entries
                .push((original.to_string(), fixed.to_string()));
        }
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(o, _)| o == original)
            .map(|(_, f)| f.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(o, f)| (o.as_str(), f.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-run transform state, created fresh for every invocation of
/// [`process_document`](crate::process_document) and discarded afterwards.
#[derive(Debug, Default)]
pub struct TransformContext {
    /// Lower-cased names already assigned in this run
    pub generated_names: HashSet<String>,
    /// Original-name to final-name mapping
    pub name_table: NameTable,
    /// Expressions touched by the reference pass
    pub reference_updates: Vec<ReferenceUpdate>,
}

impl TransformContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Shared handle to a field context, as threaded through the tree walk.
pub type FieldContextRef = Rc<FieldContext>;
