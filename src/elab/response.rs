// src/elab/response.rs
// Shaping of eLabFTW responses. Different API versions wrap lists, report
// created ids and name status fields differently; these helpers absorb that.

use serde_json::Value;

use crate::config::consts::{ERROR_BODY_MAX, FALLBACK_TEMPLATE_ID, UNKNOWN_STATUS};

use super::error::{ElabError, ElabResult};
use super::Template;

/// A completed 2xx response, detached from the HTTP client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }
}

pub fn join_url(base: &str, path: &str) -> String {
    join!(base.trim_end_matches('/'), "/", path.trim_start_matches('/'))
}

/// Error detail for a failed call: the body, cut to a readable length.
pub fn error_detail(text: &str, status: u16) -> String {
    if text.trim().is_empty() {
        return format!("status={status}");
    }
    if text.chars().count() > ERROR_BODY_MAX {
        let cut: String = text.chars().take(ERROR_BODY_MAX).collect();
        return join!(cut, "... (truncated)");
    }
    text.to_string()
}

/// Paginated endpoints answer either a bare array or an object wrapping one.
pub fn to_list(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            for key in ["items", "data", "results"] {
                if let Some(Value::Array(items)) = map.remove(key) {
                    return items;
                }
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

/// Integer id of an object; numeric strings count too.
pub fn value_id(v: &Value) -> Option<u64> {
    match v.get("id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Id of a created resource from its JSON body (`{"id": 42}`).
pub fn id_from_body(reply: &Reply) -> Option<u64> {
    reply.json()?.get("id")?.as_u64()
}

/// Id from a `Location: .../experiments/42` header.
pub fn id_from_location(location: &str) -> Option<u64> {
    let tail = location.trim().trim_end_matches('/').rsplit('/').next()?;
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}

/// Find an item by exact (trimmed) title among recent items.
pub fn id_by_title(items: &[Value], title: &str) -> Option<u64> {
    let title = title.trim();
    items
        .iter()
        .find(|item| item.get("title").and_then(Value::as_str).map(str::trim) == Some(title))
        .and_then(value_id)
}

fn title_of(v: &Value) -> &str {
    v.get("title").and_then(Value::as_str).unwrap_or("")
}

/// Case-insensitive, trimmed title match.
pub fn find_by_title<'a>(items: &'a [Value], title: &str) -> Option<&'a Value> {
    let wanted = title.trim().to_lowercase();
    items.iter().find(|item| title_of(item).trim().to_lowercase() == wanted)
}

/// Pick the template titled `title`, or the fallback template.
pub fn select_template(items: &[Value], title: &str) -> ElabResult<Template> {
    if let Some(found) = find_by_title(items, title) {
        return Ok(Template::from_value(found));
    }
    if let Some(fallback) = items.iter().find(|t| value_id(t) == Some(FALLBACK_TEMPLATE_ID)) {
        logw!("Template '{}' not found; using fallback id {}", title, FALLBACK_TEMPLATE_ID);
        return Ok(Template::from_value(fallback));
    }
    Err(ElabError::TemplateNotFound { title: title.to_string(), fallback: FALLBACK_TEMPLATE_ID })
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Human status of an experiment object.
pub fn status_text(exp: &Value) -> String {
    for key in ["status_name", "status_label"] {
        if let Some(v) = exp.get(key).filter(|v| truthy(v)) {
            return scalar_text(v);
        }
    }
    match exp.get("status") {
        Some(v) if !v.is_null() => scalar_text(v),
        _ => s!(UNKNOWN_STATUS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn urls_join_with_one_slash() {
        assert_eq!(join_url("https://e.test/api/v2/", "/experiments"), "https://e.test/api/v2/experiments");
        assert_eq!(join_url("https://e.test/api/v2", "items_types"), "https://e.test/api/v2/items_types");
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let long = "x".repeat(700);
        let detail = error_detail(&long, 500);
        assert!(detail.ends_with("... (truncated)"));
        assert_eq!(detail.chars().count(), 600 + "... (truncated)".len());
        assert_eq!(error_detail("", 502), "status=502");
        assert_eq!(error_detail("nope", 400), "nope");
    }

    #[test]
    fn lists_unwrap_common_envelopes() {
        assert_eq!(to_list(json!([1, 2])).len(), 2);
        assert_eq!(to_list(json!({"items": [1]})).len(), 1);
        assert_eq!(to_list(json!({"data": [1, 2, 3]})).len(), 3);
        assert_eq!(to_list(json!({"results": []})).len(), 0);
        assert!(to_list(json!({"items": "x"})).is_empty());
        assert!(to_list(json!("x")).is_empty());
    }

    #[test]
    fn created_ids_from_body_then_location() {
        let reply = Reply { status: 201, location: None, body: br#"{"id": 42}"#.to_vec() };
        assert_eq!(id_from_body(&reply), Some(42));

        let reply = Reply { status: 201, location: None, body: b"created".to_vec() };
        assert_eq!(id_from_body(&reply), None);

        assert_eq!(id_from_location("https://e.test/api/v2/experiments/17"), Some(17));
        assert_eq!(id_from_location("/api/v2/experiments/17/"), Some(17));
        assert_eq!(id_from_location("/api/v2/experiments/new"), None);
    }

    #[test]
    fn ids_found_by_title() {
        let items = vec![json!({"id": 3, "title": "Other"}), json!({"id": "9", "title": " Mine "})];
        assert_eq!(id_by_title(&items, "Mine"), Some(9));
        assert_eq!(id_by_title(&items, "mine"), None);
    }

    #[test]
    fn template_falls_back_to_default_id() {
        let items = vec![
            json!({"id": 1, "title": "Default", "body": "<p>d</p>"}),
            json!({"id": 5, "title": "Análise Clínica Teste", "body": "<table></table>"}),
        ];
        assert_eq!(select_template(&items, "análise clínica teste ").unwrap().id, 5);
        assert_eq!(select_template(&items, "Urina").unwrap().id, 1);
        assert!(matches!(
            select_template(&items[1..], "Urina"),
            Err(ElabError::TemplateNotFound { .. })
        ));
    }

    #[test]
    fn status_prefers_named_fields() {
        assert_eq!(status_text(&json!({"status_name": "Running", "status": 2})), "Running");
        assert_eq!(status_text(&json!({"status_name": "", "status_label": "Done"})), "Done");
        assert_eq!(status_text(&json!({"status": 3})), "3");
        assert_eq!(status_text(&json!({})), "desconhecido");
    }
}
