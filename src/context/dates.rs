//! Calendar reference values for template logic: current-year boundaries,
//! the extraction date, and the rolling 365-day horizon.

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde_json::Value;
use tracing::warn;

use crate::context::Context;

/// Every source date in the member exports uses this format.
pub const DATE_FMT: &str = "%m/%d/%Y";

/// Add date context keys. An unparseable `extraction_date` logs a warning
/// and falls back to today as the reference date.
pub fn add_date_context(ctx: Context, extraction_date: Option<&str>) -> Context {
    add_date_context_at(ctx, extraction_date, Local::now().date_naive())
}

pub fn add_date_context_at(
    mut ctx: Context,
    extraction_date: Option<&str>,
    today: NaiveDate,
) -> Context {
    let parsed = extraction_date.map(|raw| (raw, NaiveDate::parse_from_str(raw, DATE_FMT)));

    let reference_date = match &parsed {
        Some((_, Ok(date))) => *date,
        Some((raw, Err(_))) => {
            warn!("Invalid extraction date format: {raw}. Using today.");
            today
        }
        None => today,
    };

    let year = today.year();
    ctx.insert("current_year".to_string(), Value::from(year));
    ctx.insert(
        "current_year_start".to_string(),
        Value::from(format!("1/1/{year}")),
    );
    ctx.insert(
        "current_year_end".to_string(),
        Value::from(format!("12/31/{year}")),
    );

    // A valid extraction date is echoed back verbatim; anything else
    // becomes today's date.
    let echoed = match &parsed {
        Some((raw, Ok(_))) => (*raw).to_string(),
        _ => today.format(DATE_FMT).to_string(),
    };
    ctx.insert("extraction_date".to_string(), Value::from(echoed));

    let plus_365 = reference_date + Duration::days(365);
    ctx.insert(
        "extraction_plus_365".to_string(),
        Value::from(plus_365.format(DATE_FMT).to_string()),
    );

    ctx
}
