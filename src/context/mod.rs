//! Per-member template context construction.
//!
//! Each stage receives the accumulated context and returns an extended one;
//! stages only ever add keys. The fixed order is: key normalization, date
//! context, name formatting, uniform inspection, course warnings.

pub mod courses;
pub mod dates;
pub mod inspection;
pub mod keys;

use chrono::{Local, NaiveDate};
use serde_json::Value;

pub use courses::{CourseCatalog, CourseDefinition, CourseWarning};

/// A flat key -> value mapping handed to the templating layer. Insertion
/// order follows source column order.
pub type Context = serde_json::Map<String, Value>;

/// Build the full template context for one member record.
pub fn normalize_template_context(
    record: &Context,
    catalog: Option<&CourseCatalog>,
    extraction_date: Option<&str>,
) -> Context {
    normalize_template_context_at(
        record,
        catalog,
        extraction_date,
        Local::now().date_naive(),
    )
}

/// Same as [`normalize_template_context`] with an explicit "today" so the
/// date rules can be pinned in tests.
pub fn normalize_template_context_at(
    record: &Context,
    catalog: Option<&CourseCatalog>,
    extraction_date: Option<&str>,
    today: NaiveDate,
) -> Context {
    let ctx = keys::normalize_keys(record);
    let ctx = dates::add_date_context_at(ctx, extraction_date, today);
    let ctx = format_names(ctx);
    let ctx = inspection::check_uniform_inspection_at(ctx, today);
    courses::process_course_warnings_at(ctx, catalog, extraction_date, today)
}

/// Title-case a member-facing string from an all-caps source export. An
/// alphabetic character is uppercased when it starts a run of alphabetic
/// characters and lowercased otherwise.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Add `first_name_titlecase` for a friendlier greeting, leaving the
/// original first name untouched for member-info display.
pub fn format_names(mut ctx: Context) -> Context {
    let first_name = lookup(&ctx, "first_name")
        .or_else(|| lookup(&ctx, "First Name"))
        .cloned();

    let value = match &first_name {
        Some(Value::String(s)) if is_all_uppercase(s) => Value::String(title_case(s)),
        Some(v) => v.clone(),
        None => Value::Null,
    };
    ctx.insert("first_name_titlecase".to_string(), value);
    ctx
}

fn is_all_uppercase(s: &str) -> bool {
    s.chars().any(|c| c.is_uppercase()) && !s.chars().any(|c| c.is_lowercase())
}

/// Fetch a usable value for `key`: present, non-null, and not an empty
/// string. The normalized key is probed before the original-cased one by
/// callers, so the earlier pipeline stage's value wins.
pub(crate) fn lookup<'a>(ctx: &'a Context, key: &str) -> Option<&'a Value> {
    match ctx.get(key) {
        Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(v),
        None => None,
    }
}

/// Stringify a cell the way it would print: strings as-is, numbers and
/// booleans via their display form, null as empty.
pub(crate) fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
