// src/body/mod.rs
//! # Experiment body module
//!
//! eLabFTW stores an experiment's content as one HTML string. Lab templates use
//! a result table inside that string as a de facto form: one row per analyte,
//! with the columns
//!
//! ```text
//! Parâmetro | Resultado | Unidade | Referência | Observação
//! ```
//!
//! This module reads that table into [`Field`]s and writes result values back
//! into it.
//!
//! ## What lives here
//! - **Reading** (`fields`): first table → ordered fields, with a `{{token}}`
//!   placeholder scan when there is no usable table.
//! - **Writing** (`results`): rewrite only the "Resultado" cells whose row label
//!   matches a [`ResultsPatch`] entry; every other byte of the document stays
//!   as it was.
//! - **Patches** (`patch`): ordered label → value maps and the label matching
//!   rules.
//!
//! ## What does **not** live here
//! - Fetching or saving bodies. See `elab` and `gateway`.
//!
//! ## Conventions & invariants
//! - A data row is a `<tr>` with at least two `<td>` cells. Rows made of `<th>`
//!   cells, or a single spanning `<td>`, are section headers.
//! - Both directions derive keys with [`crate::core::normalize_key`], so a key
//!   handed out by `fields` always finds its row again in `results`.
//! - Nothing here returns an error. Malformed input degrades to "no fields" or
//!   "nothing matched", and the outcome enums say which path ran.

pub mod fields;
pub mod patch;
pub mod results;

pub use fields::{extract_fields, parse_fields, Extraction, Field};
pub use patch::ResultsPatch;
pub use results::{apply_results, write_results, AppliedResult, WriteOutcome};

use crate::core::{Markup, TagBlock};

/// `<td>` cells of every data row in `table`, in document order.
pub(crate) fn data_rows(doc: &Markup<'_>, table: TagBlock) -> Vec<Vec<TagBlock>> {
    doc.blocks_within("tr", table.inner_range())
        .into_iter()
        .map(|tr| doc.blocks_within("td", tr.inner_range()))
        .filter(|cells| cells.len() >= 2)
        .collect()
}
