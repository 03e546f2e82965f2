//! Value formatting shared by the markdown and DOCX writers.

use crate::summary::{CellValue, ClaimantProfile, CustomTables, DateValue};
use chrono::{NaiveDate, NaiveTime};

/// Placeholder for missing values in the markdown report.
pub const NOT_AVAILABLE: &str = "N/A";

/// `value`, or `N/A` when absent or empty.
pub fn or_na(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => NOT_AVAILABLE,
    }
}

/// `claimant_name` → `Claimant Name`.
pub fn title_case(field: &str) -> String {
    field
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Render a date as `MM/DD/YYYY`.
///
/// Free text is parsed as an ISO date (or the date part of an ISO datetime)
/// and reformatted; text that does not parse is returned unchanged. A missing
/// date is the empty string.
pub fn format_date(value: Option<&DateValue>) -> String {
    match value {
        None => String::new(),
        Some(DateValue::Date(d)) => us_date(*d),
        Some(DateValue::Text(s)) => match parse_iso(s.trim()) {
            Some(d) => us_date(d),
            None => s.clone(),
        },
    }
}

fn us_date(d: NaiveDate) -> String {
    d.format("%m/%d/%Y").to_string()
}

/// Strict `YYYY-MM-DD`, optionally followed by `THH:MM:SS` or ` HH:MM:SS`.
fn parse_iso(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    let shape_ok = bytes[..10]
        .iter()
        .enumerate()
        .all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return None;
    }
    let (date, time) = s.split_at(10);
    match time.as_bytes().first() {
        None => {}
        Some(b'T' | b' ') => {
            NaiveTime::parse_from_str(&time[1..], "%H:%M:%S").ok()?;
        }
        Some(_) => return None,
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Age for the DOCX header block: decimal string cut to its first two chars.
// FIXME: the two-char cut only matters for ages >= 100; confirm with report
// owners before dropping it.
pub fn format_age(age: Option<u32>) -> String {
    age.map(|a| a.to_string().chars().take(2).collect())
        .unwrap_or_default()
}

/// Special-education status line for the DOCX header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialEducation {
    pub status: String,
    pub detail: String,
}

impl SpecialEducation {
    /// Header text: the status, with the detail in parentheses unless it
    /// is missing or just repeats the profile notes.
    pub fn header_text(&self, notes: Option<&str>) -> String {
        let detail = self.detail.trim();
        let repeats_notes = notes.map(str::trim) == Some(detail);
        if detail.is_empty() || detail == NOT_AVAILABLE || repeats_notes {
            self.status.clone()
        } else {
            format!("{} ({})", self.status, detail)
        }
    }
}

impl Default for SpecialEducation {
    fn default() -> Self {
        Self {
            status: "No".into(),
            detail: NOT_AVAILABLE.into(),
        }
    }
}

/// Infer special-education status from the profile notes and education tables.
///
/// Notes mentioning "special ed" set status `Yes` with the full notes as the
/// detail. The first row of an "education" table with a "special" column then
/// overrides that: its status cell (text verbatim, booleans as Yes/No) and the
/// row's other non-empty cells joined by ", ".
pub fn special_education(profile: &ClaimantProfile, tables: &CustomTables) -> SpecialEducation {
    let mut result = SpecialEducation::default();

    if let Some(notes) = profile.notes.as_deref() {
        let lower = notes.to_lowercase();
        if lower.contains("special ed") || lower.contains("special education") {
            result = SpecialEducation {
                status: "Yes".into(),
                detail: notes.to_string(),
            };
        }
    }

    let education_tables = tables
        .iter()
        .filter(|(name, _)| name.to_lowercase().contains("education"));
    for (_, rows) in education_tables {
        for row in rows {
            let Some((key, value)) = row
                .iter()
                .find(|(k, _)| k.to_lowercase().contains("special"))
            else {
                continue;
            };
            let Some(status) = status_value(value) else {
                continue;
            };
            let detail = row
                .iter()
                .filter(|(k, v)| *k != key && !v.is_empty())
                .map(|(_, v)| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return SpecialEducation { status, detail };
        }
    }

    result
}

fn status_value(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Flag(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        CellValue::Text(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
