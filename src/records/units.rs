//! Unit identifiers and supervisory-role contacts. Unit numbers are
//! 7-digit codes (district:3, division:2, unit:2) embedded in a free-text
//! competency field as `Unit: NNNNNNN`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::context::{title_case, Context};

static UNIT_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)unit:\s*(\d+)").expect("unit number pattern is valid"));

/// The supervisory-role name columns a unit table may carry: flotilla
/// commander and member-training staff officer.
pub const SUPERVISORY_ROLES: [&str; 2] = ["FC", "FSO-MT"];

/// Name suffixes skipped when shortening a raw name for display.
const NAME_SUFFIXES: [&str; 8] = ["JR", "JR.", "SR", "SR.", "II", "III", "IV", "V"];

/// Flotilla abbreviations stripped from unit names, as they appear after
/// title-casing. Longer variants come first so the period forms match.
const FLOTILLA_ABBREVIATIONS: [&str; 5] = [" Flotilla", " Flot.", " Flot", " Flt.", " Flt"];

/// Pull the embedded unit number out of a free-text field.
pub fn extract_unit_number(text: &str) -> Option<String> {
    UNIT_NUMBER_RE
        .captures(text)
        .map(|captures| captures[1].to_string())
}

/// `0131102` -> `013-11-02`. Anything that is not exactly seven ASCII
/// digits has no pretty form.
pub fn pretty_unit_number(raw: &str) -> Option<String> {
    if raw.len() == 7 && raw.bytes().all(|b| b.is_ascii_digit()) {
        Some(format!("{}-{}-{}", &raw[0..3], &raw[3..5], &raw[5..7]))
    } else {
        None
    }
}

/// Title-case a raw unit name and normalize whatever flotilla abbreviation
/// the source used to the spelled-out "Flotilla" suffix.
pub fn prettify_unit_name(raw: &str) -> String {
    let mut name = title_case(raw.trim());
    for abbreviation in FLOTILLA_ABBREVIATIONS {
        if let Some(stripped) = name.strip_suffix(abbreviation) {
            name = stripped.to_string();
            break;
        }
    }
    if !name.ends_with("Flotilla") {
        name.push_str(" Flotilla");
    }
    name
}

fn is_name_suffix(token: &str) -> bool {
    NAME_SUFFIXES
        .iter()
        .any(|suffix| suffix.eq_ignore_ascii_case(token))
}

fn name_tokens(raw: &str) -> Vec<&str> {
    raw.split_whitespace()
        .filter(|token| !is_name_suffix(token))
        .collect()
}

/// Shorten a raw contact name to "First Last", title-cased, skipping
/// generational suffixes. Returns `None` when fewer than two tokens remain.
pub fn display_name(raw: &str) -> Option<String> {
    let tokens = name_tokens(raw);
    if tokens.len() < 2 {
        return None;
    }
    Some(format!(
        "{} {}",
        title_case(tokens[0]),
        title_case(tokens[tokens.len() - 1])
    ))
}

/// Resolve a contact's email by exact case-insensitive first/last name
/// match against the email table. First match wins.
pub fn resolve_role_email(raw_name: &str, email_rows: &[Context]) -> Option<String> {
    let tokens = name_tokens(raw_name);
    if tokens.len() < 2 {
        return None;
    }
    let first = tokens[0];
    let last = tokens[tokens.len() - 1];

    let matched = email_rows.iter().find(|row| {
        cell_str(row, "First Name").trim().eq_ignore_ascii_case(first)
            && cell_str(row, "Last Name").trim().eq_ignore_ascii_case(last)
    })?;

    matched
        .get("Email")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn cell_str<'a>(row: &'a Context, key: &str) -> &'a str {
    row.get(key).and_then(Value::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_unit_number_from_free_text() {
        assert_eq!(
            extract_unit_number("Unit: 0131102 | DOE. JOHN | AUXCT"),
            Some("0131102".to_string())
        );
        assert_eq!(
            extract_unit_number("unit:0140203"),
            Some("0140203".to_string())
        );
        assert_eq!(extract_unit_number("no unit here"), None);
    }

    #[test]
    fn pretty_format_requires_exactly_seven_digits() {
        assert_eq!(pretty_unit_number("0131102"), Some("013-11-02".to_string()));
        assert_eq!(pretty_unit_number("0140203"), Some("014-02-03".to_string()));
        assert_eq!(pretty_unit_number("013110"), None);
        assert_eq!(pretty_unit_number("01311021"), None);
        assert_eq!(pretty_unit_number("013110a"), None);
        assert_eq!(pretty_unit_number(""), None);
    }

    #[test]
    fn prettified_unit_names_always_end_in_flotilla() {
        assert_eq!(
            prettify_unit_name("WOODS HOLE FLOTILLA"),
            "Woods Hole Flotilla"
        );
        assert_eq!(prettify_unit_name("CASCO BAY FLOT"), "Casco Bay Flotilla");
        assert_eq!(prettify_unit_name("CASCO BAY FLOT."), "Casco Bay Flotilla");
        assert_eq!(prettify_unit_name("PORTLAND FLT"), "Portland Flotilla");
        assert_eq!(prettify_unit_name("PORTLAND FLT."), "Portland Flotilla");
        assert_eq!(prettify_unit_name("BASS RIVER"), "Bass River Flotilla");
    }

    #[test]
    fn display_name_is_first_plus_last_non_suffix() {
        assert_eq!(display_name("JOHN DOE"), Some("John Doe".to_string()));
        assert_eq!(
            display_name("JOHN A DOE JR"),
            Some("John Doe".to_string())
        );
        assert_eq!(
            display_name("MARY ANN VAN BUREN III"),
            Some("Mary Buren".to_string())
        );
        assert_eq!(display_name("MADONNA"), None);
        assert_eq!(display_name("DOE JR."), None);
        assert_eq!(display_name(""), None);
    }

    #[test]
    fn resolves_role_email_case_insensitively() {
        let rows: Vec<Context> = vec![
            [
                ("First Name".to_string(), json!("Jane")),
                ("Last Name".to_string(), json!("Smith")),
                ("Email".to_string(), json!("jane.smith@example.com")),
            ]
            .into_iter()
            .collect(),
            [
                ("First Name".to_string(), json!("John")),
                ("Last Name".to_string(), json!("Doe")),
                ("Email".to_string(), json!("john.doe@example.com")),
            ]
            .into_iter()
            .collect(),
        ];

        assert_eq!(
            resolve_role_email("JOHN DOE", &rows),
            Some("john.doe@example.com".to_string())
        );
        assert_eq!(
            resolve_role_email("JOHN A DOE JR", &rows),
            Some("john.doe@example.com".to_string())
        );
        assert_eq!(resolve_role_email("JIM DOE", &rows), None);
        assert_eq!(resolve_role_email("MADONNA", &rows), None);
    }
}
