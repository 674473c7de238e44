//! Source column names arrive human-readable ("Member #", "Date/Time");
//! templates need identifier-safe keys. Normalization supplements, it never
//! replaces: both spellings map to the same value afterwards.

use crate::context::Context;

/// Add an identifier-safe alias for every key in the record. Existing keys
/// are preserved; when an alias collides with an existing key the alias
/// value wins (last write).
pub fn normalize_keys(record: &Context) -> Context {
    let mut out = record.clone();
    for (key, value) in record {
        out.insert(normalize_key(key), value.clone());
    }
    out
}

/// Lowercase, spaces and slashes to underscores, `#` to "num", `?` dropped,
/// anything else outside `[a-z0-9_]` dropped.
fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.to_lowercase().chars() {
        match c {
            ' ' | '/' => out.push('_'),
            '#' => out.push_str("num"),
            '?' => {}
            c if c.is_ascii_alphanumeric() || c == '_' => out.push(c),
            _ => {}
        }
    }
    out
}
