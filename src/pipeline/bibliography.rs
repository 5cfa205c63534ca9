//! Bibliography normalization: split `Title: Subtitle` into two fields.
//!
//! ABNT reference formatting needs the subtitle in its own field (it is set
//! in a different face), but authors habitually write the whole thing into
//! `title`. This stage parses the work's BibTeX source, rewrites every entry
//! whose title contains a colon, and persists the result to
//! `xxx-referencias.bib` — the file the LaTeX run actually cites from.
//!
//! Unlike section rendering, parsing here is all-or-nothing: a malformed
//! entry means the bibliography as a whole cannot be trusted, so the error
//! propagates instead of producing a silently truncated `.bib`.
//!
//! The parser is a small hand-rolled scanner (entry header via regex, field
//! values via balanced-brace scanning). It understands regular entries,
//! `@comment` blocks, quoted and braced values, and `#` concatenation —
//! enough to round-trip the bibliographies real works carry without pulling
//! in a full BibTeX grammar.

use crate::error::Md2AbntError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

/// Name of the normalized bibliography artifact inside the output directory.
pub const BIBLIOGRAPHY_FILE: &str = "xxx-referencias.bib";

/// One BibTeX entry, fields in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry kind without the `@`, e.g. `book`, `article`.
    pub kind: String,
    /// Citation key.
    pub key: String,
    /// `(name, value)` pairs; values stored without their outer delimiters.
    pub fields: Vec<(String, String)>,
}

impl Entry {
    /// Value of the named field, case-insensitive per BibTeX convention.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn set_field(&mut self, name: &str, value: String) {
        if let Some(slot) = self
            .fields
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            slot.1 = value;
        } else {
            self.fields.push((name.to_string(), value));
        }
    }
}

/// Normalize a BibTeX source: parse, apply the title-split rule to every
/// entry, serialize back.
pub fn normalize(source: &str) -> Result<String, Md2AbntError> {
    let mut entries = parse(source)?;
    for entry in &mut entries {
        normalize_entry(entry);
    }
    Ok(to_bibtex(&entries))
}

/// Normalize `work.bibliography_source` and persist it to
/// `<output_dir>/xxx-referencias.bib`, overwriting any prior content.
pub fn write_normalized(source: &str, output_dir: &Path) -> Result<(), Md2AbntError> {
    let normalized = normalize(source)?;
    let path = output_dir.join(BIBLIOGRAPHY_FILE);
    debug!(path = %path.display(), "writing normalized bibliography");
    std::fs::write(&path, normalized)
        .map_err(|source| Md2AbntError::ArtifactWrite { path, source })
}

/// Apply the title rule in place: split on the first colon, strip a
/// matching outer brace pair, trim both halves.
fn normalize_entry(entry: &mut Entry) {
    let Some(title) = entry.field("title") else {
        return;
    };
    let Some((main_title, subtitle)) = split_title(title) else {
        return;
    };
    entry.set_field("title", main_title);
    entry.set_field("subtitle", subtitle);
}

/// Split a `Title: Subtitle` string, or `None` when there is no colon.
///
/// A title wrapped in outer braces (`{A: B}`, the BibTeX idiom protecting
/// capitalization) loses the `{` from the left half and the `}` from the
/// right half before trimming, so `{Systems: Design Patterns}` yields
/// `("Systems", "Design Patterns")`.
fn split_title(title: &str) -> Option<(String, String)> {
    let (mut left, mut right) = title.split_once(':')?;
    if title.starts_with('{') && title.ends_with('}') {
        left = left.strip_prefix('{').unwrap_or(left);
        right = right.strip_suffix('}').unwrap_or(right);
    }
    Some((left.trim().to_string(), right.trim().to_string()))
}

// ── Parser ───────────────────────────────────────────────────────────────

static RE_ENTRY_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@([A-Za-z]+)\s*\{\s*([^,\s{}]+)\s*,").unwrap());

static RE_FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*)\s*=\s*").unwrap());

/// Parse a BibTeX source into entries.
///
/// Text between entries is comment per BibTeX convention and is dropped,
/// including stray `@` signs that do not open an entry (an email address in
/// a note, say); `@comment{…}` blocks are skipped. An entry that opens with
/// a recognized `@kind{key,` header but is malformed inside fails the whole
/// parse.
pub fn parse(source: &str) -> Result<Vec<Entry>, Md2AbntError> {
    let mut entries = Vec::new();
    let mut pos = 0usize;

    while let Some(at) = source[pos..].find('@') {
        let start = pos + at;
        let rest = &source[start..];

        if is_comment_block(rest) {
            pos = skip_balanced_group(source, start)?;
            continue;
        }

        let Some(caps) = RE_ENTRY_HEADER.captures(rest) else {
            pos = start + 1;
            continue;
        };
        let kind = caps[1].to_ascii_lowercase();
        let key = caps[2].to_string();
        let mut cursor = start + caps.get(0).map(|m| m.end()).unwrap_or(0);

        let mut fields = Vec::new();
        loop {
            cursor = skip_whitespace(source, cursor);
            match source.as_bytes().get(cursor) {
                Some(b'}') => {
                    cursor += 1;
                    break;
                }
                Some(_) => {}
                None => {
                    return Err(Md2AbntError::BibliographyParse {
                        offset: cursor,
                        detail: format!("entry '{key}' is not closed"),
                    });
                }
            }

            let field_caps = RE_FIELD_NAME.captures(&source[cursor..]).ok_or_else(|| {
                Md2AbntError::BibliographyParse {
                    offset: cursor,
                    detail: format!("expected 'field = value' in entry '{key}'"),
                }
            })?;
            let name = field_caps[1].to_ascii_lowercase();
            cursor += field_caps.get(0).map(|m| m.end()).unwrap_or(0);

            let (value, after_value) = parse_value(source, cursor)?;
            cursor = skip_whitespace(source, after_value);
            fields.push((name, value));

            // Fields are comma-separated; a trailing comma before '}' is fine.
            if source.as_bytes().get(cursor) == Some(&b',') {
                cursor += 1;
            } else if source.as_bytes().get(cursor) != Some(&b'}') {
                return Err(Md2AbntError::BibliographyParse {
                    offset: cursor,
                    detail: format!("expected ',' or '}}' after a field of entry '{key}'"),
                });
            }
        }

        entries.push(Entry { kind, key, fields });
        pos = cursor;
    }

    Ok(entries)
}

/// Parse one field value starting at `pos`, following `#` concatenations.
/// Returns the assembled value (outer delimiters stripped) and the index
/// just past it.
fn parse_value(source: &str, pos: usize) -> Result<(String, usize), Md2AbntError> {
    let mut parts = Vec::new();
    let mut cursor = skip_whitespace(source, pos);

    loop {
        match source.as_bytes().get(cursor) {
            Some(b'{') => {
                let end = skip_balanced_group(source, cursor)?;
                parts.push(source[cursor + 1..end - 1].to_string());
                cursor = end;
            }
            Some(b'"') => {
                let end = find_string_end(source, cursor)?;
                parts.push(source[cursor + 1..end].to_string());
                cursor = end + 1;
            }
            Some(_) => {
                let rest = &source[cursor..];
                let len = rest
                    .find(|c: char| c == ',' || c == '}' || c == '#' || c.is_whitespace())
                    .unwrap_or(rest.len());
                if len == 0 {
                    return Err(Md2AbntError::BibliographyParse {
                        offset: cursor,
                        detail: "empty field value".into(),
                    });
                }
                parts.push(rest[..len].to_string());
                cursor += len;
            }
            None => {
                return Err(Md2AbntError::BibliographyParse {
                    offset: cursor,
                    detail: "unterminated field value".into(),
                });
            }
        }

        cursor = skip_whitespace(source, cursor);
        if source.as_bytes().get(cursor) == Some(&b'#') {
            cursor = skip_whitespace(source, cursor + 1);
        } else {
            break;
        }
    }

    Ok((parts.concat(), cursor))
}

/// True when `rest` (positioned at an `@`) opens a `@comment{…}` block.
/// Compared bytewise so a multi-byte character right after the `@` cannot
/// split a char boundary.
fn is_comment_block(rest: &str) -> bool {
    match rest.as_bytes().get(..8) {
        Some(prefix) if prefix.eq_ignore_ascii_case(b"@comment") => {
            rest[8..].trim_start().starts_with('{')
        }
        _ => false,
    }
}

/// Given `pos` at or before a `{`, return the index just past its matching
/// `}`.
fn skip_balanced_group(source: &str, pos: usize) -> Result<usize, Md2AbntError> {
    let open = source[pos..]
        .find('{')
        .map(|i| pos + i)
        .ok_or_else(|| Md2AbntError::BibliographyParse {
            offset: pos,
            detail: "expected '{'".into(),
        })?;
    let mut depth = 0usize;
    for (i, b) in source.as_bytes().iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i + 1);
                }
            }
            _ => {}
        }
    }
    Err(Md2AbntError::BibliographyParse {
        offset: open,
        detail: "unbalanced brace".into(),
    })
}

/// Given `pos` at an opening `"`, return the index of the closing `"`.
/// Quotes inside braces do not terminate the string (BibTeX rule).
fn find_string_end(source: &str, pos: usize) -> Result<usize, Md2AbntError> {
    let mut depth = 0usize;
    for (i, b) in source.as_bytes().iter().enumerate().skip(pos + 1) {
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'"' if depth == 0 => return Ok(i),
            _ => {}
        }
    }
    Err(Md2AbntError::BibliographyParse {
        offset: pos,
        detail: "unterminated quoted value".into(),
    })
}

fn skip_whitespace(source: &str, pos: usize) -> usize {
    source[pos..]
        .find(|c: char| !c.is_whitespace())
        .map(|i| pos + i)
        .unwrap_or(source.len())
}

// ── Serializer ───────────────────────────────────────────────────────────

/// Serialize entries back to BibTeX. Values are brace-delimited except for
/// plain numbers, which BibTeX accepts bare.
pub fn to_bibtex(entries: &[Entry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push('@');
        out.push_str(&entry.kind);
        out.push('{');
        out.push_str(&entry.key);
        out.push_str(",\n");
        for (name, value) in &entry.fields {
            if value.bytes().all(|b| b.is_ascii_digit()) && !value.is_empty() {
                out.push_str(&format!("  {name} = {value},\n"));
            } else {
                out.push_str(&format!("  {name} = {{{value}}},\n"));
            }
        }
        out.push_str("}\n\n");
    }
    out
}
