//! Canvas App Control Naming Tool
//!
//! A processor for the YAML serialization of a canvas app's visual tree
//! that renames controls to a conventional scheme and tidies selected
//! properties along the way.
//!
//! # Features
//!
//! - Type-based naming prefixes (`txt`, `btn`, `lbl`, ...) with
//!   document-wide uniqueness
//! - Parent-derived names for controls inside data cards
//!   (`DataCardValue1` under the `Name` card becomes `txtName`)
//! - Screen-name suffixes for controls below a screen container
//! - Optional property enhancement rules (display mode, content language,
//!   parent display names, data-source normalization, card UX fill-ins)
//! - Expression-reference rewriting so formulas keep pointing at the
//!   renamed controls
//!
//! # Basic Usage
//!
//! ```rust
//! use ctlfix::{process_document, Options};
//!
//! let input = "- Button1:\n    Control: Button@0.0.45\n";
//! let outcome = process_document(input, &Options::default()).unwrap();
//! assert!(outcome.yaml.contains("btnButton"));
//! ```
//!
//! # Processing Pipeline
//!
//! 1. **Parse** - the document text becomes a YAML value tree
//! 2. **Walk** - controls are renamed and their properties enhanced,
//!    producing a change log and an original-to-final name table
//! 3. **Rewrite** - expression references to renamed controls are patched
//!    (skipped when reference updating is disabled)
//! 4. **Emit** - the tree is serialized with expression quoting cleaned up

pub mod error;
pub mod types;
pub mod utils;

pub mod naming;
pub mod enhancer;
pub mod references;
pub mod walker;
pub mod serializer;
pub mod cli;

use std::fs;

// Re-export commonly used types and functions
pub use cli::Cli;
pub use enhancer::PropertyEnhancer;
pub use error::{Error, Result};
pub use references::{ReferenceRewriter, RewriteResult};
pub use serializer::to_yaml_string;
pub use types::{
    ChangeLogEntry, FieldContext, NameTable, ReferenceUpdate, TransformContext,
};
pub use walker::TreeWalker;

/// Tool version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Data source assumed when none is configured.
pub const DEFAULT_DATA_SOURCE: &str = "Employee_Info";

/// Transform options and settings
///
/// Every rule is independent; the naming walk itself always runs.
#[derive(Debug, Clone)]
pub struct Options {
    /// Fill in `DisplayMode` expressions by control family
    pub display_mode: bool,

    /// Fill in `ContentLanguage` on text controls
    pub content_language: bool,

    /// Language code used by the content-language rule
    pub content_language_value: String,

    /// Point labels and accessibility text at `Parent.DisplayName` inside
    /// data cards
    pub parent_display: bool,

    /// Fill in card UX properties (tooltips, hints, validation styling)
    pub card_enhancement: bool,

    /// Normalize `[@DataSource]` reference tokens
    pub data_source_fix: bool,

    /// Target identifier for the data-source rules
    pub data_source_name: String,

    /// Whether the reference-rewriting pass runs at all
    pub reference_update: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            display_mode: false,
            content_language: false,
            content_language_value: "en".to_string(),
            parent_display: false,
            card_enhancement: false,
            data_source_fix: false,
            data_source_name: DEFAULT_DATA_SOURCE.to_string(),
            reference_update: true,
        }
    }
}

/// Everything one processing run produces.
#[derive(Debug)]
pub struct ProcessOutcome {
    /// The rewritten document text
    pub yaml: String,
    /// One entry per control whose name or properties changed
    pub change_log: Vec<ChangeLogEntry>,
    /// Original-name to final-name mapping
    pub name_table: NameTable,
    /// Expressions touched by the reference pass
    pub reference_updates: Vec<ReferenceUpdate>,
}

/// Process a document: rename controls, enhance properties, rewrite
/// references, and re-emit the text.
///
/// All run state lives in this call; concurrent invocations share nothing.
pub fn process_document(input: &str, options: &Options) -> Result<ProcessOutcome> {
    let document: serde_yaml::Value = serde_yaml::from_str(input)?;

    if document.is_null() {
        return Err(Error::EmptyDocument);
    }

    let mut tree_walker = TreeWalker::new(options);
    let processed = tree_walker.process(&document)?;

    let final_tree = if options.reference_update {
        let data_source = options
            .data_source_fix
            .then(|| options.data_source_name.as_str());
        let rewriter = ReferenceRewriter::new(&tree_walker.ctx.name_table, data_source);
        tree_walker.update_property_references(&processed, &rewriter)
    } else {
        processed
    };

    let yaml = to_yaml_string(&final_tree)?;

    log::info!(
        "processed document: {} renames, {} property bags touched",
        tree_walker.ctx.name_table.len(),
        tree_walker.change_log.len()
    );

    Ok(ProcessOutcome {
        yaml,
        change_log: tree_walker.change_log,
        name_table: tree_walker.ctx.name_table,
        reference_updates: tree_walker.ctx.reference_updates,
    })
}

/// Process `input` and write the result to `output`.
pub fn process_file(input: &str, output: &str, options: &Options) -> Result<ProcessOutcome> {
    let text = fs::read_to_string(input).map_err(|_| Error::FileNotFound {
        path: input.to_string(),
    })?;

    let outcome = process_document(&text, options)?;
    fs::write(output, &outcome.yaml)?;

    Ok(outcome)
}
