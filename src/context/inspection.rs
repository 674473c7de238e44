//! Uniform inspection renewal rule. An inspection dated before January 1 of
//! the current year has lapsed; exempt members never need one.

use chrono::{Datelike, Local, NaiveDate};
use serde_json::Value;
use tracing::debug;

use crate::context::dates::DATE_FMT;
use crate::context::{lookup, value_to_string, Context};

pub fn check_uniform_inspection(ctx: Context) -> Context {
    check_uniform_inspection_at(ctx, Local::now().date_naive())
}

/// Always sets three keys: `uniform_inspection` (cleaned date or null),
/// `uniform_exempt` (bool), `needs_uniform_inspection` (bool). An
/// unparseable inspection date is cleared rather than propagated.
pub fn check_uniform_inspection_at(mut ctx: Context, today: NaiveDate) -> Context {
    let inspection = lookup(&ctx, "uniform_inspection")
        .or_else(|| lookup(&ctx, "Uniform Inspection"))
        .cloned();
    let exempt_flag = lookup(&ctx, "uniform_exempt")
        .or_else(|| lookup(&ctx, "Uniform Exempt"))
        .cloned();

    let is_exempt = exempt_flag
        .map(|v| matches!(value_to_string(&v).trim(), "1" | "1.0"))
        .unwrap_or(false);

    let mut needs_inspection = true;
    let mut inspection_out = inspection.clone().unwrap_or(Value::Null);

    if is_exempt {
        needs_inspection = false;
    } else {
        let raw = inspection
            .as_ref()
            .map(value_to_string)
            .filter(|s| !s.trim().is_empty() && !s.trim().eq_ignore_ascii_case("nan"));

        match raw {
            Some(raw) => match NaiveDate::parse_from_str(raw.trim(), DATE_FMT) {
                Ok(date) => {
                    let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1)
                        .expect("January 1 is always a valid date");
                    needs_inspection = date < year_start;
                }
                Err(_) => {
                    debug!("Could not parse uniform inspection date: {raw}");
                    needs_inspection = true;
                    inspection_out = Value::Null;
                }
            },
            None => {
                inspection_out = Value::Null;
            }
        }
    }

    ctx.insert("uniform_inspection".to_string(), inspection_out);
    ctx.insert("uniform_exempt".to_string(), Value::Bool(is_exempt));
    ctx.insert(
        "needs_uniform_inspection".to_string(),
        Value::Bool(needs_inspection),
    );
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(pairs: &[(&str, Value)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn mid_2025() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn exempt_member_needs_no_inspection() {
        for flag in [json!(1), json!("1"), json!("1.0"), json!(1.0)] {
            let result =
                check_uniform_inspection_at(ctx(&[("uniform_exempt", flag.clone())]), mid_2025());
            assert_eq!(result["uniform_exempt"], json!(true), "flag {flag}");
            assert_eq!(result["needs_uniform_inspection"], json!(false));
        }
    }

    #[test]
    fn non_exempt_flags_defer_to_date() {
        for flag in [json!(0), json!("0"), json!("2"), json!("yes")] {
            let result =
                check_uniform_inspection_at(ctx(&[("uniform_exempt", flag.clone())]), mid_2025());
            assert_eq!(result["uniform_exempt"], json!(false), "flag {flag}");
            assert_eq!(result["needs_uniform_inspection"], json!(true));
        }
    }

    #[test]
    fn current_year_inspection_is_valid() {
        let result = check_uniform_inspection_at(
            ctx(&[
                ("uniform_inspection", json!("2/20/2025")),
                ("uniform_exempt", json!(0)),
            ]),
            mid_2025(),
        );
        assert_eq!(result["needs_uniform_inspection"], json!(false));
        assert_eq!(result["uniform_inspection"], json!("2/20/2025"));
    }

    #[test]
    fn prior_year_inspection_has_lapsed() {
        let result = check_uniform_inspection_at(
            ctx(&[
                ("uniform_inspection", json!("12/15/2024")),
                ("uniform_exempt", json!(0)),
            ]),
            mid_2025(),
        );
        assert_eq!(result["needs_uniform_inspection"], json!(true));
    }

    #[test]
    fn january_first_boundary_counts_as_current() {
        let result = check_uniform_inspection_at(
            ctx(&[("uniform_inspection", json!("1/1/2025"))]),
            mid_2025(),
        );
        assert_eq!(result["needs_uniform_inspection"], json!(false));

        let result = check_uniform_inspection_at(
            ctx(&[("uniform_inspection", json!("12/31/2024"))]),
            mid_2025(),
        );
        assert_eq!(result["needs_uniform_inspection"], json!(true));
    }

    #[test]
    fn missing_inspection_forces_renewal() {
        let result = check_uniform_inspection_at(ctx(&[("uniform_exempt", json!(0))]), mid_2025());
        assert_eq!(result["needs_uniform_inspection"], json!(true));
        assert_eq!(result["uniform_inspection"], Value::Null);
    }

    #[test]
    fn nan_inspection_is_cleared() {
        for raw in ["nan", "NaN", "  ", ""] {
            let result = check_uniform_inspection_at(
                ctx(&[("uniform_inspection", json!(raw))]),
                mid_2025(),
            );
            assert_eq!(result["uniform_inspection"], Value::Null, "raw {raw:?}");
            assert_eq!(result["needs_uniform_inspection"], json!(true));
        }
    }

    #[test]
    fn unparseable_inspection_is_cleared_and_forces_renewal() {
        let result = check_uniform_inspection_at(
            ctx(&[("uniform_inspection", json!("sometime last spring"))]),
            mid_2025(),
        );
        assert_eq!(result["uniform_inspection"], Value::Null);
        assert_eq!(result["needs_uniform_inspection"], json!(true));
    }

    #[test]
    fn exempt_member_passes_inspection_value_through() {
        let result = check_uniform_inspection_at(
            ctx(&[
                ("uniform_inspection", json!("not-a-date")),
                ("uniform_exempt", json!("1")),
            ]),
            mid_2025(),
        );
        assert_eq!(result["uniform_inspection"], json!("not-a-date"));
        assert_eq!(result["needs_uniform_inspection"], json!(false));
    }

    #[test]
    fn normalized_key_wins_over_original() {
        let result = check_uniform_inspection_at(
            ctx(&[
                ("uniform_inspection", json!("2/20/2025")),
                ("Uniform Inspection", json!("12/15/2024")),
            ]),
            mid_2025(),
        );
        assert_eq!(result["needs_uniform_inspection"], json!(false));
    }
}
