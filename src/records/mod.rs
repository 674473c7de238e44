//! Member record loading and multi-source reconciliation.
//!
//! The training export is the required spine; email and unit reference
//! tables, when supplied, are left-joined onto it. Unresolved references
//! keep nulls. The only fatal failures are a missing or unparseable
//! training source.

pub mod table;
pub mod units;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::context::{title_case, value_to_string, Context};
use crate::error::{MailerError, Result};
use table::Table;

/// Join key column in the training table.
const MEMBER_KEY_TRAINING: &str = "Member #";
/// Join key column in the email table.
const MEMBER_KEY_EMAIL: &str = "Member ID";
/// Unit join key, derived for training rows and native to the unit table.
const UNIT_KEY: &str = "Unit Number";
/// The free-text column embedding `Unit: NNNNNNN`. Matched by substring
/// since exports append arrows or whitespace to the header.
const UNIT_SOURCE_COLUMN: &str = "Unit/Member/Competency/Status";

/// Manages member records joined from CSV sources.
pub struct MemberDatabase {
    training_csv: PathBuf,
    email_csv: Option<PathBuf>,
    units_csv: Option<PathBuf>,
    members: Option<Vec<Context>>,
}

impl MemberDatabase {
    pub fn new(
        training_csv: impl AsRef<Path>,
        email_csv: Option<&str>,
        units_csv: Option<&str>,
    ) -> Self {
        MemberDatabase {
            training_csv: training_csv.as_ref().to_path_buf(),
            email_csv: email_csv.map(PathBuf::from),
            units_csv: units_csv.map(PathBuf::from),
            members: None,
        }
    }

    /// Load and join the member records. Missing optional sources silently
    /// disable their enrichment.
    pub fn load(&mut self) -> Result<()> {
        if !self.training_csv.exists() {
            return Err(MailerError::MemberData(format!(
                "Training database not found: {}",
                self.training_csv.display()
            )));
        }

        let mut training =
            Table::from_path(&self.training_csv).map_err(|source| MailerError::MemberDataParse {
                kind: "training",
                path: self.training_csv.display().to_string(),
                source,
            })?;

        training.trim_column(MEMBER_KEY_TRAINING);
        annotate_unit_numbers(&mut training);

        let email_table = match load_optional(&self.email_csv, "email")? {
            Some(mut table) => {
                table.trim_column(MEMBER_KEY_EMAIL);
                Some(table)
            }
            None => None,
        };

        if let Some(units_table) = load_optional(&self.units_csv, "units")? {
            join_units(
                &mut training,
                units_table,
                email_table.as_ref().map(Table::rows),
            );
        }

        if let Some(email_table) = email_table {
            join_email(&mut training, email_table);
        }

        info!("Loaded {} member records", training.rows().len());
        self.members = Some(training.into_rows());
        Ok(())
    }

    /// All joined member records.
    pub fn get_all_members(&mut self) -> Result<Vec<Context>> {
        if self.members.is_none() {
            self.load()?;
        }
        Ok(self.members.clone().unwrap_or_default())
    }

    /// Filter members by exact stringified equality on the given columns.
    /// Criteria naming unknown columns are ignored.
    pub fn filter_members(&mut self, criteria: &[(String, String)]) -> Result<Vec<Context>> {
        let members = self.get_all_members()?;
        Ok(members
            .into_iter()
            .filter(|row| {
                criteria.iter().all(|(column, wanted)| match row.get(column) {
                    Some(value) => value_to_string(value) == *wanted,
                    None => true,
                })
            })
            .collect())
    }
}

fn load_optional(path: &Option<PathBuf>, kind: &'static str) -> Result<Option<Table>> {
    match path {
        Some(path) if path.exists() => {
            let table = Table::from_path(path).map_err(|source| MailerError::MemberDataParse {
                kind,
                path: path.display().to_string(),
                source,
            })?;
            Ok(Some(table))
        }
        _ => Ok(None),
    }
}

/// Derive `Unit Number` and `Unit Number Pretty` for every training row
/// from the free-text competency column. No match means null, not an error.
fn annotate_unit_numbers(training: &mut Table) {
    let Some(source_col) = training.find_header(UNIT_SOURCE_COLUMN).map(str::to_string) else {
        return;
    };
    training.add_header(UNIT_KEY);
    training.add_header("Unit Number Pretty");

    for row in training.rows_mut() {
        let unit_number = row
            .get(&source_col)
            .and_then(Value::as_str)
            .and_then(units::extract_unit_number);
        let pretty = unit_number
            .as_deref()
            .and_then(units::pretty_unit_number);
        row.insert(UNIT_KEY.to_string(), opt_string(unit_number));
        row.insert("Unit Number Pretty".to_string(), opt_string(pretty));
    }
}

/// Left-join the unit reference table onto training rows by unit number,
/// carrying its raw columns plus prettified names and supervisory-role
/// contact derivations.
fn join_units(training: &mut Table, units_table: Table, email_rows: Option<&[Context]>) {
    // Columns every training row will receive, resolved or null.
    let mut unit_columns: Vec<String> = Vec::new();
    for col in units_table.headers() {
        if col == UNIT_KEY {
            continue;
        }
        unit_columns.push(col.clone());
        if col == "Unit Name" {
            unit_columns.push("Unit Name Pretty".to_string());
        }
    }
    for role in units::SUPERVISORY_ROLES {
        if units_table.has_header(&format!("{role} Name")) {
            unit_columns.push(format!("{role} Name Pretty"));
            unit_columns.push(format!("{role} Display Name"));
            if email_rows.is_some() {
                unit_columns.push(format!("{role} Email"));
            }
        }
    }

    let renames = collision_renames(training, &unit_columns, "Unit");
    for col in &unit_columns {
        training.add_header(&renames[col]);
    }

    // Enrichment per unit number. The literal string "nan" is a missing
    // unit number, not a unit.
    let mut by_unit: HashMap<String, Context> = HashMap::new();
    for row in units_table.rows() {
        let number = row
            .get(UNIT_KEY)
            .map(value_to_string)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if number.is_empty() || number == "nan" {
            continue;
        }

        let mut enrichment = Context::new();
        for (col, value) in row {
            if col == UNIT_KEY {
                continue;
            }
            enrichment.insert(col.clone(), value.clone());
            if col == "Unit Name" {
                let pretty = value.as_str().map(units::prettify_unit_name);
                enrichment.insert("Unit Name Pretty".to_string(), opt_string(pretty));
            }
        }
        for role in units::SUPERVISORY_ROLES {
            let name_col = format!("{role} Name");
            let Some(raw_name) = row.get(&name_col).and_then(Value::as_str) else {
                continue;
            };
            enrichment.insert(
                format!("{role} Name Pretty"),
                Value::String(title_case(raw_name)),
            );
            enrichment.insert(
                format!("{role} Display Name"),
                opt_string(units::display_name(raw_name)),
            );
            if let Some(email_rows) = email_rows {
                enrichment.insert(
                    format!("{role} Email"),
                    opt_string(units::resolve_role_email(raw_name, email_rows)),
                );
            }
        }

        by_unit.entry(number).or_insert(enrichment);
    }

    for row in training.rows_mut() {
        let key = row.get(UNIT_KEY).map(value_to_string).unwrap_or_default();
        let enrichment = by_unit.get(&key);
        for col in &unit_columns {
            let value = enrichment
                .and_then(|e| e.get(col))
                .cloned()
                .unwrap_or(Value::Null);
            row.insert(renames[col].clone(), value);
        }
    }
}

/// Left-join the email table onto training rows by member identifier.
/// Unmatched training rows keep nulls for every email-sourced column.
fn join_email(training: &mut Table, email_table: Table) {
    let email_columns: Vec<String> = email_table.headers().to_vec();
    let renames = collision_renames(training, &email_columns, "Email");
    for col in &email_columns {
        training.add_header(&renames[col]);
    }

    let mut by_member: HashMap<String, &Context> = HashMap::new();
    for row in email_table.rows() {
        let key = row
            .get(MEMBER_KEY_EMAIL)
            .map(value_to_string)
            .unwrap_or_default();
        if key.is_empty() {
            continue;
        }
        by_member.entry(key).or_insert(row);
    }

    for row in training.rows_mut() {
        let key = row
            .get(MEMBER_KEY_TRAINING)
            .map(value_to_string)
            .unwrap_or_default();
        let matched = by_member.get(key.as_str()).copied();
        for col in &email_columns {
            let value = matched
                .and_then(|m| m.get(col))
                .cloned()
                .unwrap_or(Value::Null);
            row.insert(renames[col].clone(), value);
        }
    }
}

/// Non-key incoming columns that collide with an existing column are
/// renamed with a source-qualified suffix instead of positional suffixes.
fn collision_renames(
    training: &Table,
    columns: &[String],
    source: &str,
) -> HashMap<String, String> {
    columns
        .iter()
        .map(|col| {
            let renamed = if training.has_header(col) {
                format!("{col} ({source})")
            } else {
                col.clone()
            };
            (col.clone(), renamed)
        })
        .collect()
}

fn opt_string(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}
