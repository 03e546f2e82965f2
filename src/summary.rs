//! The in-memory summary model: claimant profile, event timeline, custom tables.
//!
//! A [`MedicalSummary`] is the only state handed from the extraction stage to
//! the report renderer. Every field is optional; an empty summary is valid
//! and renders as a report full of `N/A`.
//!
//! Extraction results arrive as untyped JSON. [`MedicalSummary::from_extraction`]
//! is the single gate they pass through: unknown keys, wrongly typed fields and
//! ragged custom tables are rejected with
//! [`SummaryError::MalformedExtraction`] before anything is rendered.

use crate::error::SummaryError;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A date as supplied by the extractor.
///
/// Values that look like `YYYY-MM-DD` deserialize as [`DateValue::Date`];
/// anything else is kept verbatim so the renderer can print it as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Date(NaiveDate),
    Text(String),
}

impl From<NaiveDate> for DateValue {
    fn from(d: NaiveDate) -> Self {
        DateValue::Date(d)
    }
}

impl From<&str> for DateValue {
    fn from(s: &str) -> Self {
        DateValue::Text(s.to_string())
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            DateValue::Text(s) => f.write_str(s),
        }
    }
}

/// Structured claimant attributes extracted from the case file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClaimantProfile {
    pub claimant_name: Option<String>,
    pub ssn: Option<String>,
    pub date_of_birth: Option<DateValue>,
    /// Alleged onset date (AOD).
    pub alleged_onset_date: Option<DateValue>,
    /// Date last insured (DLI).
    pub date_last_insured: Option<DateValue>,
    pub age_at_aod: Option<u32>,
    pub current_age: Option<u32>,
    pub education: Option<String>,
    pub claim_title: Option<String>,
    pub notes: Option<String>,
}

impl ClaimantProfile {
    /// Every field as `(field_name, value)` in declaration order.
    pub fn fields(&self) -> Vec<(&'static str, Option<String>)> {
        let date = |d: &Option<DateValue>| d.as_ref().map(ToString::to_string);
        vec![
            ("claimant_name", self.claimant_name.clone()),
            ("ssn", self.ssn.clone()),
            ("date_of_birth", date(&self.date_of_birth)),
            ("alleged_onset_date", date(&self.alleged_onset_date)),
            ("date_last_insured", date(&self.date_last_insured)),
            ("age_at_aod", self.age_at_aod.map(|a| a.to_string())),
            ("current_age", self.current_age.map(|a| a.to_string())),
            ("education", self.education.clone()),
            ("claim_title", self.claim_title.clone()),
            ("notes", self.notes.clone()),
        ]
    }
}

/// One row of the timeline. The renderer keeps the order it is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MedicalEvent {
    pub date: Option<DateValue>,
    pub provider: Option<String>,
    pub reason: Option<String>,
    /// Source reference such as `page 12/504`.
    pub reference: Option<String>,
}

/// A single cell of a custom table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
}

impl CellValue {
    /// `true` for null cells and blank strings.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Flag(_) | CellValue::Number(_) => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Flag(b)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Flag(true) => f.write_str("Yes"),
            CellValue::Flag(false) => f.write_str("No"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// A custom-table row: column name → cell, in column order.
pub type TableRow = IndexMap<String, CellValue>;

/// Custom tables keyed by their (free-form) name.
pub type CustomTables = IndexMap<String, Vec<TableRow>>;

/// Combined data structure for one generated medical summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MedicalSummary {
    pub profile: ClaimantProfile,
    pub events: Vec<MedicalEvent>,
    pub custom_tables: CustomTables,
}

impl MedicalSummary {
    /// Build a summary from an extractor's raw JSON, enforcing the schema.
    pub fn from_extraction(value: serde_json::Value) -> Result<Self, SummaryError> {
        if !value.is_object() {
            return Err(SummaryError::MalformedExtraction(format!(
                "expected a JSON object at the top level, got {}",
                json_kind(&value)
            )));
        }
        let summary: MedicalSummary = serde_json::from_value(value)
            .map_err(|e| SummaryError::MalformedExtraction(e.to_string()))?;
        summary.validate()?;
        Ok(summary)
    }

    /// Check the invariants serde cannot express.
    ///
    /// Table and column names must be non-blank, and every row of a table
    /// must carry exactly the columns of its first row.
    pub fn validate(&self) -> Result<(), SummaryError> {
        for (name, rows) in &self.custom_tables {
            if name.trim().is_empty() {
                return Err(SummaryError::MalformedExtraction(
                    "custom table with a blank name".into(),
                ));
            }
            let Some(first) = rows.first() else {
                continue;
            };
            for (i, row) in rows.iter().enumerate() {
                if row.keys().any(|k| k.trim().is_empty()) {
                    return Err(SummaryError::MalformedExtraction(format!(
                        "table '{name}' row {i} has a blank column name"
                    )));
                }
                let same_columns =
                    row.len() == first.len() && first.keys().all(|k| row.contains_key(k));
                if !same_columns {
                    return Err(SummaryError::MalformedExtraction(format!(
                        "table '{name}' row {i} has columns {:?}, expected {:?}",
                        row.keys().collect::<Vec<_>>(),
                        first.keys().collect::<Vec<_>>()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_is_an_empty_summary() {
        let s = MedicalSummary::from_extraction(json!({})).unwrap();
        assert_eq!(s, MedicalSummary::default());
    }

    #[test]
    fn iso_dates_become_dates_and_others_stay_text() {
        let s = MedicalSummary::from_extraction(json!({
            "profile": {"date_of_birth": "1970-03-04", "alleged_onset_date": "spring 2019"},
        }))
        .unwrap();
        assert_eq!(
            s.profile.date_of_birth,
            Some(DateValue::Date(NaiveDate::from_ymd_opt(1970, 3, 4).unwrap()))
        );
        assert_eq!(
            s.profile.alleged_onset_date,
            Some(DateValue::Text("spring 2019".into()))
        );
    }

    #[test]
    fn unknown_profile_field_is_rejected() {
        let err = MedicalSummary::from_extraction(json!({
            "profile": {"favourite_colour": "blue"}
        }))
        .unwrap_err();
        assert!(matches!(err, SummaryError::MalformedExtraction(_)));
    }

    #[test]
    fn string_age_is_rejected() {
        let err = MedicalSummary::from_extraction(json!({
            "profile": {"current_age": "52"}
        }))
        .unwrap_err();
        assert!(matches!(err, SummaryError::MalformedExtraction(_)));
    }

    #[test]
    fn top_level_array_is_rejected() {
        let err = MedicalSummary::from_extraction(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("an array"), "got: {err}");
    }

    #[test]
    fn ragged_table_is_rejected() {
        let err = MedicalSummary::from_extraction(json!({
            "custom_tables": {
                "Medications": [
                    {"name": "ibuprofen", "dose": "200mg"},
                    {"name": "naproxen"}
                ]
            }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("Medications"), "got: {err}");
    }

    #[test]
    fn nested_cell_is_rejected() {
        let err = MedicalSummary::from_extraction(json!({
            "custom_tables": {"T": [{"a": {"b": 1}}]}
        }))
        .unwrap_err();
        assert!(matches!(err, SummaryError::MalformedExtraction(_)));
    }

    #[test]
    fn table_columns_keep_their_order() {
        let s = MedicalSummary::from_extraction(json!({
            "custom_tables": {
                "Education History": [
                    {"school": "Lincoln High", "special_ed": false, "grade": 11}
                ]
            }
        }))
        .unwrap();
        let row = &s.custom_tables["Education History"][0];
        let cols: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(cols, vec!["school", "special_ed", "grade"]);
        assert_eq!(row["special_ed"], CellValue::Flag(false));
        assert_eq!(row["grade"].to_string(), "11");
    }

    #[test]
    fn profile_fields_are_in_declaration_order() {
        let profile = ClaimantProfile {
            notes: Some("n".into()),
            current_age: Some(40),
            ..Default::default()
        };
        let fields = profile.fields();
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[0].0, "claimant_name");
        assert_eq!(fields[6], ("current_age", Some("40".to_string())));
        assert_eq!(fields[9], ("notes", Some("n".to_string())));
    }
}
