#![forbid(unsafe_code)]

use std::collections::BTreeSet;

/// Extracts every page title a block's text refers to: `[[Title]]`,
/// `#[[Title]]` and bare `#word` forms. Bracketed titles are taken
/// verbatim (trimmed, no nesting); a bare tag runs to the next
/// whitespace, `#` or opening bracket, with trailing punctuation
/// stripped.
pub fn referenced_titles(text: &str) -> BTreeSet<String> {
    let mut titles = BTreeSet::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' if bytes.get(i + 1) == Some(&b'[') => {
                let body = &text[i + 2..];
                let Some(end) = body.find("]]") else {
                    i += 2;
                    continue;
                };
                let inner = body[..end].trim();
                if inner.contains("[[") {
                    // Nested opener: rescan from just past this one.
                    i += 2;
                    continue;
                }
                if !inner.is_empty() {
                    titles.insert(inner.to_string());
                }
                i += 2 + end + 2;
            }
            b'#' => {
                let body = &text[i + 1..];
                if body.starts_with("[[") {
                    // Bracketed form, the `[[` arm picks up the title.
                    i += 1;
                    continue;
                }
                let run_len = body
                    .find(|c: char| c.is_whitespace() || c == '[' || c == '#')
                    .unwrap_or(body.len());
                if run_len == 0 {
                    i += 1;
                    continue;
                }
                let word = body[..run_len].trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
                if !word.is_empty() {
                    titles.insert(word.to_string());
                }
                i += 1 + run_len;
            }
            _ => i += 1,
        }
    }
    titles
}

/// Second-stage filter: a referencing block counts for the tag tree only
/// when its text carries the tag-mark form for that exact title, not
/// just a plain `[[Title]]` link.
pub fn has_tag_mark(text: &str, title: &str) -> bool {
    text.contains(&format!("#{title}")) || text.contains(&format!("#[[{title}]]"))
}
