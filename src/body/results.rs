// src/body/results.rs

use serde::Serialize;

use super::patch::ResultsPatch;
use crate::core::html::escape_text;
use crate::core::sanitize::cell_text;
use crate::core::Markup;

/// One "Resultado" cell that was rewritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppliedResult {
    /// Row label as it reads in the table.
    pub label: String,
    /// Patch entry that matched it.
    pub patch_label: String,
    pub value: String,
}

/// Which path produced the new body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Matching result cells were rewritten in place.
    Table { body: String, applied: Vec<AppliedResult>, unmatched: Vec<String> },
    /// No table: the body was replaced with `label: value` lines.
    FlatText { body: String },
    /// Empty patch: the input is returned as is.
    Unchanged { body: String },
}

impl WriteOutcome {
    pub fn body(&self) -> &str {
        match self {
            WriteOutcome::Table { body, .. }
            | WriteOutcome::FlatText { body }
            | WriteOutcome::Unchanged { body } => body,
        }
    }

    pub fn into_body(self) -> String {
        match self {
            WriteOutcome::Table { body, .. }
            | WriteOutcome::FlatText { body }
            | WriteOutcome::Unchanged { body } => body,
        }
    }

    /// Patch labels that matched no row. Only the table path can leave any.
    pub fn unmatched(&self) -> &[String] {
        match self {
            WriteOutcome::Table { unmatched, .. } => unmatched,
            _ => &[],
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            WriteOutcome::Table { .. } => "table",
            WriteOutcome::FlatText { .. } => "flat_text",
            WriteOutcome::Unchanged { .. } => "unchanged",
        }
    }
}

pub fn apply_results(html: &str, patch: &ResultsPatch) -> String {
    write_results(html, patch).into_body()
}

pub fn write_results(html: &str, patch: &ResultsPatch) -> WriteOutcome {
    if patch.is_empty() {
        return WriteOutcome::Unchanged { body: html.to_string() };
    }

    let doc = Markup::new(html);
    let Some(table) = doc.first_block("table") else {
        logd!("Results: no table, writing {} flat line(s)", patch.len());
        return WriteOutcome::FlatText { body: flat_text(patch) };
    };

    let mut used = vec![false; patch.len()];
    let mut applied = Vec::new();
    let mut edits: Vec<(std::ops::Range<usize>, String)> = Vec::new();

    for cells in super::data_rows(&doc, table) {
        let label = cell_text(cells[0].inner(html));
        let Some((ix, value)) = patch.lookup(&label) else { continue };
        used[ix] = true;
        edits.push((cells[1].inner_range(), escape_text(value)));
        applied.push(AppliedResult {
            patch_label: patch.labels().nth(ix).unwrap_or_default().to_string(),
            value: value.to_string(),
            label,
        });
    }

    let unmatched: Vec<String> = patch
        .labels()
        .zip(&used)
        .filter(|(_, hit)| !**hit)
        .map(|(label, _)| label.to_string())
        .collect();

    logd!("Results: {} cell(s) rewritten, {} label(s) unmatched", applied.len(), unmatched.len());
    WriteOutcome::Table { body: splice(html, &edits), applied, unmatched }
}

/// Replace each range with its text. Ranges are ascending and disjoint.
fn splice(src: &str, edits: &[(std::ops::Range<usize>, String)]) -> String {
    let mut out = String::with_capacity(src.len() + edits.iter().map(|(_, t)| t.len()).sum::<usize>());
    let mut pos = 0usize;
    for (range, text) in edits {
        out.push_str(&src[pos..range.start]);
        out.push_str(text);
        pos = range.end;
    }
    out.push_str(&src[pos..]);
    out
}

fn flat_text(patch: &ResultsPatch) -> String {
    patch
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}
