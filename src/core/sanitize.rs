// src/core/sanitize.rs

/// Decode the handful of entities rich-text editors actually emit:
/// the named basics plus decimal/hex numeric references.
/// Unknown entities are kept verbatim.
pub fn normalize_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').filter(|&semi| semi <= 10) {
            Some(semi) => match decode_entity(&tail[1..semi]) {
                Some(ch) => {
                    out.push(ch);
                    rest = &tail[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            },
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "nbsp" => Some(' '),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            // A non-breaking space reads as a plain space in labels.
            if code == 0xA0 { Some(' ') } else { char::from_u32(code) }
        }
    }
}

pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Machine key for a row label: lower-case, every run of characters outside
/// `[a-z0-9]` becomes one `_`, no leading/trailing `_`.
///
/// Keys computed when a template is read and when results are written must
/// agree, so this is the only implementation in the crate.
pub fn normalize_key(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_us = false;
    for ch in label.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_us && !out.is_empty() { out.push('_'); }
            pending_us = false;
            out.push(ch);
        } else {
            pending_us = true;
        }
    }
    out
}

/// Visible text of a cell's inner HTML: tags dropped, entities decoded,
/// whitespace collapsed.
pub fn cell_text(inner_html: &str) -> String {
    normalize_ws(&normalize_entities(&super::html::strip_tags(inner_html)))
}

/// `cell_text` with the malformed-markup defense applied: inline styles
/// inside the cell, or angle brackets surviving the strip, blank the cell.
pub fn clean_cell(inner_html: &str) -> String {
    if super::html::to_lower(inner_html).contains("style=") {
        return s!();
    }
    let text = cell_text(inner_html);
    if text.contains('<') || text.contains('>') {
        return s!();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_underscored_ascii() {
        assert_eq!(normalize_key("Glicose"), "glicose");
        assert_eq!(normalize_key("  Hemácias (milhões/mm³) "), "hem_cias_milh_es_mm");
        assert_eq!(normalize_key("VCM - fL"), "vcm_fl");
        assert_eq!(normalize_key("__a__b__"), "a_b");
        assert_eq!(normalize_key("!!!"), "");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn keys_are_idempotent() {
        for label in ["Série Branca", "  ureia  ", "T4 livre (ng/dL)", "a--b", "ÅÄÖ", "x_y"] {
            let once = normalize_key(label);
            assert_eq!(normalize_key(&once), once, "label {label:?}");
        }
    }

    #[test]
    fn entities_decode_once() {
        assert_eq!(normalize_entities("a&nbsp;b &amp;lt; &#233; &#xE9;"), "a b &lt; é é");
        assert_eq!(normalize_entities("R&D & co"), "R&D & co");
        assert_eq!(normalize_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn clean_cell_blanks_styled_or_broken_markup() {
        assert_eq!(clean_cell(r#"<span style="color:red">x</span>"#), "");
        assert_eq!(clean_cell("5 &lt; 7"), "");
        assert_eq!(clean_cell("<b>broken"), "broken");
        assert_eq!(clean_cell("ok<i"), "");
        assert_eq!(clean_cell(" <strong>Glicose</strong>&nbsp;"), "Glicose");
    }
}
