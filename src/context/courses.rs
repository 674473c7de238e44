//! Course due-date rule engine. Each member row carries one integer
//! day-offset per course code, anchored to the extraction date; the engine
//! turns those into overdue / due-soon warnings for the template.

use std::path::Path;

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::dates::DATE_FMT;
use crate::context::Context;
use crate::error::Result;

/// Courses whose day-offset of zero means "due by December 31 of the
/// current year" rather than "due on the extraction date": Suicide
/// Prevention, Civil Rights Awareness, and SAPRR.
const YEAR_END_ANCHORED_CODES: [&str; 3] = ["SP_100643", "CRA_502319", "SAPRR_502379"];

/// One row of the course reference table.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseDefinition {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "EnrollmentCode", default)]
    pub enrollment_code: Option<String>,
}

/// The course reference table, loaded once per run and read-only after.
/// Warning lists preserve its row order.
#[derive(Debug, Clone, Default)]
pub struct CourseCatalog {
    courses: Vec<CourseDefinition>,
}

impl CourseCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let mut courses = Vec::new();
        for row in reader.deserialize() {
            let mut course: CourseDefinition = row?;
            course.code = course.code.trim().to_string();
            courses.push(course);
        }
        Ok(CourseCatalog { courses })
    }

    /// Load the catalog when a path was given. An absent or unreadable
    /// source degrades to "no course warnings", it is not an error; only
    /// a file that exists but fails to load is worth a warning.
    pub fn load_optional(path: Option<&str>) -> Option<Self> {
        let path = path?;
        if !Path::new(path).exists() {
            return None;
        }
        match Self::load(path) {
            Ok(catalog) => Some(catalog),
            Err(e) => {
                warn!("Failed to load courses CSV '{path}': {e}");
                None
            }
        }
    }

    pub fn courses(&self) -> &[CourseDefinition] {
        &self.courses
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

/// A classified warning for one course. A course produces at most one
/// warning per member.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CourseWarning {
    Overdue {
        code: String,
        title: String,
        url: String,
        enrollment_code: String,
        days_overdue: i64,
    },
    DueSoon {
        code: String,
        title: String,
        url: String,
        enrollment_code: String,
        days_until_due: i64,
        due_date: String,
    },
}

pub fn process_course_warnings(
    ctx: Context,
    catalog: Option<&CourseCatalog>,
    extraction_date: Option<&str>,
) -> Context {
    process_course_warnings_at(ctx, catalog, extraction_date, Local::now().date_naive())
}

/// Evaluate every catalog course against the member's day-offset fields and
/// set the four warning keys. Courses with missing or unparseable offsets
/// are skipped, never fatal.
pub fn process_course_warnings_at(
    mut ctx: Context,
    catalog: Option<&CourseCatalog>,
    extraction_date: Option<&str>,
    today: NaiveDate,
) -> Context {
    // Unlike the date-context stage, an unparseable extraction date falls
    // back to today without a log line.
    let reference_date = extraction_date
        .and_then(|raw| NaiveDate::parse_from_str(raw, DATE_FMT).ok())
        .unwrap_or(today);

    let mut overdue: Vec<CourseWarning> = Vec::new();
    let mut due_soon: Vec<CourseWarning> = Vec::new();

    if let Some(catalog) = catalog {
        for course in catalog.courses() {
            let Some(value) = ctx.get(course.code.as_str()).filter(|v| !v.is_null()) else {
                continue;
            };
            let Some(days) = parse_day_offset(value) else {
                debug!(
                    "Could not parse days_until_due for course {}: {value}",
                    course.code
                );
                continue;
            };
            match classify_course(course, days, reference_date, today) {
                Some(warning @ CourseWarning::Overdue { .. }) => overdue.push(warning),
                Some(warning) => due_soon.push(warning),
                None => {}
            }
        }
    }

    ctx.insert("courses_overdue".to_string(), warnings_value(&overdue));
    ctx.insert("courses_due_soon".to_string(), warnings_value(&due_soon));
    ctx.insert(
        "has_overdue_courses".to_string(),
        Value::Bool(!overdue.is_empty()),
    );
    ctx.insert(
        "has_due_soon_courses".to_string(),
        Value::Bool(!due_soon.is_empty()),
    );
    ctx
}

/// Classify one course's day-offset. Exactly one of overdue, due-soon, or
/// no-warning holds.
pub fn classify_course(
    course: &CourseDefinition,
    days: i64,
    reference_date: NaiveDate,
    today: NaiveDate,
) -> Option<CourseWarning> {
    // Offsets too large for the calendar are skipped like unparseable ones.
    let Some(due_date) = Duration::try_days(days)
        .and_then(|delta| reference_date.checked_add_signed(delta))
    else {
        debug!("Day offset {days} for course {} is out of range", course.code);
        return None;
    };
    let days_from_today = (due_date - today).num_days();
    let enrollment_code = course.enrollment_code.clone().unwrap_or_default();

    // Year-end anchored courses with a zero offset override the generic
    // due-date arithmetic entirely.
    if days == 0 && YEAR_END_ANCHORED_CODES.contains(&course.code.as_str()) {
        let year_end = NaiveDate::from_ymd_opt(today.year(), 12, 31)
            .expect("December 31 is always a valid date");
        return Some(CourseWarning::DueSoon {
            code: course.code.clone(),
            title: course.title.clone(),
            url: course.url.clone(),
            enrollment_code,
            days_until_due: (year_end - today).num_days(),
            due_date: year_end.format(DATE_FMT).to_string(),
        });
    }

    if days_from_today < 0 {
        return Some(CourseWarning::Overdue {
            code: course.code.clone(),
            title: course.title.clone(),
            url: course.url.clone(),
            enrollment_code,
            days_overdue: days_from_today.abs(),
        });
    }

    if days_from_today <= 365 {
        return Some(CourseWarning::DueSoon {
            code: course.code.clone(),
            title: course.title.clone(),
            url: course.url.clone(),
            enrollment_code,
            days_until_due: days_from_today,
            due_date: due_date.format(DATE_FMT).to_string(),
        });
    }

    None
}

/// Parse an integer day-offset out of a cell. Float strings truncate
/// toward zero the way the source exports round-trip them.
fn parse_day_offset(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f.trunc() as i64),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }
        _ => None,
    }
}

fn warnings_value(warnings: &[CourseWarning]) -> Value {
    serde_json::to_value(warnings).unwrap_or(Value::Array(Vec::new()))
}
