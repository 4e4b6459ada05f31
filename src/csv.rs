// src/csv.rs
use std::io::{self, Write};
use std::mem::take;

/* ---------------- Parsing ---------------- */

/// Minimal CSV parser (quotes + CRLF tolerant). Blank lines are skipped.
pub fn parse_rows(text: &str, sep: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = s!();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next(); // doubled quote
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == sep && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    // Flush a trailing row even if quotes were unterminated.
    row.push(field);
    if !(row.len() == 1 && row[0].is_empty()) {
        rows.push(row);
    }

    rows
}

/// Split off the first row when it equals `expected` (case-insensitive).
pub fn split_header(mut rows: Vec<Vec<String>>, expected: &[&str]) -> (Option<Vec<String>>, Vec<Vec<String>>) {
    let is_header = rows.first().is_some_and(|first| {
        first.len() == expected.len() && first.iter().zip(expected).all(|(a, b)| a.trim().eq_ignore_ascii_case(b))
    });
    if is_header {
        let header = rows.remove(0);
        return (Some(header), rows);
    }
    (None, rows)
}

/* ---------------- Writing ---------------- */

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single row to any writer.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        let cell = cell.as_ref();
        if !first {
            write!(w, "{}", sep)?;
        } else {
            first = false;
        }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Header plus rows as one string.
pub fn rows_to_string(header: &[&str], rows: &[Vec<String>], sep: char) -> String {
    let mut buf: Vec<u8> = Vec::new();

    let _ = write_row(&mut buf, header, sep);
    for r in rows {
        let _ = write_row(&mut buf, r, sep);
    }

    match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_fields_survive() {
        let rows = parse_rows("a,\"b, c\",\"say \"\"hi\"\"\"\r\n\n1,2,3", ',');
        assert_eq!(rows, vec![vec!["a", "b, c", "say \"hi\""], vec!["1", "2", "3"]]);
    }

    #[test]
    fn header_is_split_only_when_it_matches() {
        let rows = parse_rows("ID,Name\n1,Ana\n", ',');
        let (h, r) = split_header(rows, &["id", "name"]);
        assert_eq!(h, Some(vec![s!("ID"), s!("Name")]));
        assert_eq!(r.len(), 1);

        let (h, r) = split_header(parse_rows("1,Ana\n", ','), &["id", "name"]);
        assert!(h.is_none());
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn written_rows_parse_back() {
        let rows = vec![vec![s!("1"), s!("Silva, Ana"), s!("x\"y")]];
        let text = rows_to_string(&["id", "name", "note"], &rows, ',');
        let (_, parsed) = split_header(parse_rows(&text, ','), &["id", "name", "note"]);
        assert_eq!(parsed, rows);
    }
}
