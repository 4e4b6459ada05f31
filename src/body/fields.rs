// src/body/fields.rs

use serde::{Deserialize, Serialize};

use crate::config::consts::HEADER_LABELS;
use crate::core::sanitize::{clean_cell, normalize_key};
use crate::core::Markup;

/// One analyte row of a result table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub label: String,
    pub unit: String,
    pub reference: String,
    pub observation: String,
    pub value: String,
}

impl Field {
    /// A field known only by name, as found in a `{{placeholder}}`.
    pub fn placeholder(label: &str) -> Self {
        Self { key: normalize_key(label), label: label.to_string(), ..Self::default() }
    }
}

/// Which path produced the fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    /// The first table yielded data rows.
    Table(Vec<Field>),
    /// A table exists but has no data rows; fields come from placeholders.
    TableNoFields(Vec<Field>),
    /// No table; fields come from placeholders.
    NoTable(Vec<Field>),
}

impl Extraction {
    pub fn fields(&self) -> &[Field] {
        match self {
            Extraction::Table(f) | Extraction::TableNoFields(f) | Extraction::NoTable(f) => f,
        }
    }

    pub fn into_fields(self) -> Vec<Field> {
        match self {
            Extraction::Table(f) | Extraction::TableNoFields(f) | Extraction::NoTable(f) => f,
        }
    }

    pub fn from_table(&self) -> bool {
        matches!(self, Extraction::Table(_))
    }

    pub fn source(&self) -> &'static str {
        match self {
            Extraction::Table(_) => "table",
            Extraction::TableNoFields(_) => "table_no_fields",
            Extraction::NoTable(_) => "no_table",
        }
    }
}

pub fn parse_fields(html: &str) -> Vec<Field> {
    extract_fields(html).into_fields()
}

pub fn extract_fields(html: &str) -> Extraction {
    let doc = Markup::new(html);

    let Some(table) = doc.first_block("table") else {
        let fields = placeholder_fields(html);
        logd!("Body: no table, {} placeholder field(s)", fields.len());
        return Extraction::NoTable(fields);
    };

    let fields: Vec<Field> = super::data_rows(&doc, table)
        .iter()
        .filter_map(|cells| {
            let col = |i: usize| cells.get(i).map(|c| clean_cell(c.inner(html))).unwrap_or_default();
            field_from_columns(col(0), col(1), col(2), col(3), col(4))
        })
        .collect();

    if fields.is_empty() {
        let fields = placeholder_fields(html);
        logd!("Body: table without data rows, {} placeholder field(s)", fields.len());
        Extraction::TableNoFields(fields)
    } else {
        logd!("Body: {} field(s) from table", fields.len());
        Extraction::Table(fields)
    }
}

fn field_from_columns(
    label: String,
    value: String,
    unit: String,
    reference: String,
    observation: String,
) -> Option<Field> {
    if label.is_empty() || is_header_label(&label) {
        return None;
    }
    let key = normalize_key(&label);
    if key.is_empty() {
        return None;
    }
    Some(Field { key, label, unit, reference, observation, value })
}

fn is_header_label(label: &str) -> bool {
    let low = label.trim().to_lowercase();
    HEADER_LABELS.contains(&low.as_str())
}

/// Distinct `{{ name }}` tokens in first-appearance order.
pub fn placeholder_names(html: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = html;

    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else { break };
        let inner = &after[..close];
        // `{{a {{b}}` — the token is the innermost one.
        if let Some(nested) = inner.rfind("{{") {
            rest = &after[nested..];
            continue;
        }
        let name = inner.trim();
        if !name.is_empty() && !name.contains('}') && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &after[close + 2..];
    }
    names
}

fn placeholder_fields(html: &str) -> Vec<Field> {
    placeholder_names(html)
        .iter()
        .map(|name| Field::placeholder(name))
        .filter(|f| !f.key.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_distinct_and_trimmed() {
        let html = "<p>{{ agendamento_id }} {{tipo_amostra}} {{agendamento_id}} {{}} {{ }}</p>";
        assert_eq!(placeholder_names(html), vec!["agendamento_id", "tipo_amostra"]);
    }

    #[test]
    fn nested_braces_pick_inner_token() {
        assert_eq!(placeholder_names("{{a {{b}} c}}"), vec!["b"]);
        assert!(placeholder_names("{{ never closed").is_empty());
    }

    #[test]
    fn header_labels_match_case_insensitively() {
        assert!(is_header_label("PARÂMETRO"));
        assert!(is_header_label("Série Branca"));
        assert!(!is_header_label("Glicose"));
    }

    #[test]
    fn extraction_reports_its_path() {
        assert!(matches!(extract_fields("<p>{{x}}</p>"), Extraction::NoTable(ref f) if f.len() == 1));
        assert!(matches!(
            extract_fields("<table><tr><th>A</th><th>B</th></tr></table>{{x}}"),
            Extraction::TableNoFields(ref f) if f.len() == 1
        ));
        assert!(extract_fields("<table><tr><td>Ureia</td><td></td></tr></table>").from_table());
    }
}
