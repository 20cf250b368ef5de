//! Expression reference rewriting
//!
//! After the renaming walk, formula expressions elsewhere in the document
//! still mention controls by their old names. The rewriter patches every
//! occurrence, both as a dotted receiver (`DataCardValue1.Text`) and as a
//! standalone identifier, and can normalize `[@DataSource]` tokens on the
//! way through.

use crate::types::NameTable;
use regex::{Captures, Regex};

/// One renamed control, with its occurrence patterns precompiled.
struct NamePatterns {
    old: String,
    new: String,
    /// `Old.` in receiver position
    dot: Regex,
    /// `Old` bounded by non-identifier characters or string edges
    word: Regex,
}

/// Result of rewriting one expression.
pub struct RewriteResult {
    pub value: String,
    /// Human-readable descriptions of the replacements applied, for display
    pub changed: Vec<String>,
}

pub struct ReferenceRewriter {
    patterns: Vec<NamePatterns>,
    data_source_token: Regex,
    data_source: Option<String>,
}

impl ReferenceRewriter {
    /// Build a rewriter for one run's name table. `data_source` enables the
    /// `[@ident]` normalization when set.
    pub fn new(name_table: &NameTable, data_source: Option<&str>) -> Self {
        let patterns = name_table
            .iter()
            .map(|(old, new)| {
                let escaped = regex::escape(old);
                NamePatterns {
                    old: old.to_string(),
                    new: new.to_string(),
                    dot: Regex::new(&format!(r"(^|[^a-zA-Z0-9_]){escaped}\.")).unwrap(),
                    word: Regex::new(&format!(
                        r"(^|[^a-zA-Z0-9_]){escaped}([^a-zA-Z0-9_]|$)"
                    ))
                    .unwrap(),
                }
            })
            .collect();

        Self {
            patterns,
            data_source_token: Regex::new(r"\[@([a-zA-Z0-9_]+)\]").unwrap(),
            data_source: data_source
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
        }
    }

    /// Rewrite a single property value.
    ///
    /// Only expression strings (leading `=`) are touched; anything else is
    /// returned unchanged, byte for byte.
    pub fn rewrite(&self, value: &str) -> RewriteResult {
        if !value.starts_with('=') {
            return RewriteResult {
                value: value.to_string(),
                changed: Vec::new(),
            };
        }

        let mut updated = value.to_string();
        let mut changed = Vec::new();

        for pattern in &self.patterns {
            if pattern.dot.is_match(&updated) {
                changed.push(format!("{}.* -> {}.*", pattern.old, pattern.new));
            }
            updated = pattern
                .dot
                .replace_all(&updated, |caps: &Captures| {
                    format!("{}{}.", &caps[1], pattern.new)
                })
                .into_owned();

            if pattern.word.is_match(&updated) {
                changed.push(format!("{} -> {}", pattern.old, pattern.new));
            }
            updated = pattern
                .word
                .replace_all(&updated, |caps: &Captures| {
                    format!("{}{}{}", &caps[1], pattern.new, &caps[2])
                })
                .into_owned();
        }

        if let Some(data_source) = &self.data_source {
            let target = format!("[@{data_source}]");
            let mut replaced_tokens = Vec::new();
            updated = self
                .data_source_token
                .replace_all(&updated, |caps: &Captures| {
                    if &caps[0] == target {
                        caps[0].to_string()
                    } else {
                        replaced_tokens.push(format!("{} -> {}", &caps[0], target));
                        target.clone()
                    }
                })
                .into_owned();
            changed.extend(replaced_tokens);
        }

        RewriteResult {
            value: updated,
            changed,
        }
    }
}
