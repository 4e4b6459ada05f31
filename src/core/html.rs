// src/core/html.rs
// Low-level HTML scanning helpers.
// No DOM, just case-insensitive tag-block spans over the raw text. Every
// offset refers to the original string so callers can splice edits back in
// without re-serializing anything they did not touch.

use std::ops::Range;

/// Byte span of one `<tag ...>INNER</tag>` block.
///
/// When the closing tag is omitted (legal for `<tr>`/`<td>`), the block ends
/// where the next sibling opens, and `inner_end == end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagBlock {
    pub start: usize,
    pub inner_start: usize,
    pub inner_end: usize,
    pub end: usize,
}

impl TagBlock {
    pub fn outer<'a>(&self, s: &'a str) -> &'a str {
        &s[self.start..self.end]
    }

    pub fn inner<'a>(&self, s: &'a str) -> &'a str {
        &s[self.inner_start..self.inner_end]
    }

    pub fn inner_range(&self) -> Range<usize> {
        self.inner_start..self.inner_end
    }
}

/// A document plus its ASCII-lowercased twin. ASCII lowercasing keeps byte
/// offsets identical, so positions found in `lc` index `src` directly.
pub struct Markup<'a> {
    src: &'a str,
    lc: String,
}

impl<'a> Markup<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, lc: to_lower(src) }
    }

    /// First `<tag>` block in the document. Same-name nesting is balanced,
    /// so a table inside a cell does not end the outer table early.
    pub fn first_block(&self, tag: &str) -> Option<TagBlock> {
        let tag = to_lower(tag);
        let limit = self.lc.len();
        let start = find_open(&self.lc, &tag, 0, limit)?;
        let inner_start = open_tag_end(self.src, start)?;

        let mut depth = 1usize;
        let mut pos = inner_start;
        loop {
            let next_open = find_open(&self.lc, &tag, pos, limit);
            let next_close = find_close(&self.lc, &tag, pos, limit);
            match (next_open, next_close) {
                (Some(o), Some(c)) if o < c => {
                    depth += 1;
                    pos = open_tag_end(self.src, o).unwrap_or(limit);
                }
                (_, Some(c)) => {
                    let close_end = close_tag_end(self.src, c);
                    depth -= 1;
                    if depth == 0 {
                        return Some(TagBlock { start, inner_start, inner_end: c, end: close_end });
                    }
                    pos = close_end;
                }
                // Unterminated: the block runs to the end of the document.
                (_, None) => {
                    return Some(TagBlock { start, inner_start, inner_end: limit, end: limit });
                }
            }
        }
    }

    /// All `<tag>` blocks whose opening tag starts inside `range`.
    /// A missing closing tag is implied by the next `<tag` or the end of `range`.
    /// Tags inside a nested `<table>` belong to that table and are skipped.
    pub fn blocks_within(&self, tag: &str, range: Range<usize>) -> Vec<TagBlock> {
        let tag = to_lower(tag);
        let limit = range.end.min(self.lc.len());
        let mut out = Vec::new();
        let mut pos = range.start;

        while let Some(start) = find_open(&self.lc, &tag, pos, limit) {
            let Some(inner_start) = open_tag_end(self.src, start).filter(|&e| e <= limit) else {
                break;
            };
            let (inner_end, end) = self.block_end(&tag, inner_start, limit);
            let block = TagBlock { start, inner_start, inner_end, end };
            pos = block.end.max(inner_start);
            out.push(block);
        }
        out
    }

    /// `(inner_end, end)` of the block whose content starts at `from`.
    fn block_end(&self, tag: &str, from: usize, limit: usize) -> (usize, usize) {
        let same = tag != "table";
        let mut nested = 0usize;
        let mut pos = from;
        loop {
            let mut next: Option<(usize, Edge)> = None;
            let mut consider = |at: Option<usize>, edge: Edge| {
                if let Some(at) = at {
                    if next.map_or(true, |(n, _)| at < n) {
                        next = Some((at, edge));
                    }
                }
            };
            consider(find_open(&self.lc, "table", pos, limit), Edge::TableOpen);
            consider(find_close(&self.lc, "table", pos, limit), Edge::TableClose);
            if same {
                consider(find_open(&self.lc, tag, pos, limit), Edge::Open);
                consider(find_close(&self.lc, tag, pos, limit), Edge::Close);
            }

            let Some((at, edge)) = next else {
                return (limit, limit);
            };
            match edge {
                Edge::TableOpen => {
                    nested += 1;
                    pos = open_tag_end(self.src, at).unwrap_or(limit);
                }
                Edge::TableClose if nested > 0 => {
                    nested -= 1;
                    pos = close_tag_end(self.src, at);
                }
                // `</table>` of an enclosing table: implied close.
                Edge::TableClose if same => return (at, at),
                Edge::TableClose => return (at, close_tag_end(self.src, at).min(limit)),
                Edge::Open | Edge::Close if nested > 0 => pos = at + 1,
                // Next sibling: implied close.
                Edge::Open => return (at, at),
                Edge::Close => return (at, close_tag_end(self.src, at).min(limit)),
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Open,
    Close,
    TableOpen,
    TableClose,
}

/// Fast ASCII-only lowercasing for tag/attribute matching.
pub fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

fn is_name_end(b: Option<&u8>) -> bool {
    matches!(b, None | Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r' | b'\x0c'))
}

/// Next `<tag` in `lc[from..limit]` whose name is not a prefix of a longer one
/// (`<tr` must not match `<track`).
fn find_open(lc: &str, tag: &str, from: usize, limit: usize) -> Option<usize> {
    find_named(lc, &join!("<", tag), from, limit)
}

fn find_close(lc: &str, tag: &str, from: usize, limit: usize) -> Option<usize> {
    find_named(lc, &join!("</", tag), from, limit)
}

fn find_named(lc: &str, pat: &str, from: usize, limit: usize) -> Option<usize> {
    let bytes = lc.as_bytes();
    let mut pos = from;
    while pos < limit {
        let at = pos + lc.get(pos..limit)?.find(pat)?;
        if is_name_end(bytes.get(at + pat.len())) {
            return Some(at);
        }
        pos = at + pat.len();
    }
    None
}

/// Offset just past the `>` closing the tag that starts at `start`.
/// Quoted attribute values may contain `>`.
pub fn open_tag_end(s: &str, start: usize) -> Option<usize> {
    let b = s.as_bytes();
    let mut i = start + 1;
    let mut in_s = false; // '
    let mut in_d = false; // "
    while i < b.len() {
        match b[i] {
            b'\'' if !in_d => in_s = !in_s,
            b'"' if !in_s => in_d = !in_d,
            b'>' if !in_s && !in_d => return Some(i + 1),
            _ => {}
        }
        i += 1;
    }
    None
}

fn close_tag_end(s: &str, start: usize) -> usize {
    match s[start..].find('>') {
        Some(rel) => start + rel + 1,
        None => s.len(),
    }
}

/// Remove markup, leaving a space where each tag was, then collapse whitespace.
///
/// Only `<` followed by a letter, `/`, `!` or `?` starts a tag; a stray `<`
/// (e.g. "5 < 7") stays as text, as does an unterminated tag.
pub fn strip_tags<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref();
    let b = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0usize;
    let mut copied = 0usize;

    while i < b.len() {
        if b[i] == b'<' && b.get(i + 1).is_some_and(|&n| n.is_ascii_alphabetic() || matches!(n, b'/' | b'!' | b'?')) {
            if let Some(end) = open_tag_end(s, i) {
                out.push_str(&s[copied..i]);
                out.push(' ');
                i = end;
                copied = end;
                continue;
            }
            break;
        }
        i += 1;
    }
    out.push_str(&s[copied..]);
    super::sanitize::normalize_ws(&out)
}

/// Escape text for placement between tags.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
