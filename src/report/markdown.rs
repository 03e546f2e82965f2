//! The markdown report.
//!
//! ```text
//! # Medical Summary
//!
//! ## Claimant Profile
//! - **Claimant Name**: Jane Doe
//! - **Ssn**: N/A
//! ...
//!
//! ## Timeline of Medical Events
//! - 2020-01-15 | Dr. Lee | Back pain | page 3/40
//! ```
//!
//! Dates are printed as stored. Custom tables, if any, follow the timeline
//! as GFM tables. There is no trailing newline.

use crate::report::format::{or_na, title_case};
use crate::summary::{CustomTables, MedicalSummary};

/// Render the whole report.
pub fn render(summary: &MedicalSummary) -> String {
    let mut lines: Vec<String> = vec![
        "# Medical Summary".into(),
        String::new(),
        "## Claimant Profile".into(),
    ];

    for (field, value) in summary.profile.fields() {
        lines.push(format!(
            "- **{}**: {}",
            title_case(field),
            or_na(value.as_deref())
        ));
    }

    lines.push(String::new());
    lines.push("## Timeline of Medical Events".into());
    for event in &summary.events {
        let date = event.date.as_ref().map(ToString::to_string);
        lines.push(format!(
            "- {} | {} | {} | {}",
            or_na(date.as_deref()),
            or_na(event.provider.as_deref()),
            or_na(event.reason.as_deref()),
            or_na(event.reference.as_deref()),
        ));
    }

    push_custom_tables(&mut lines, &summary.custom_tables);
    lines.join("\n")
}

fn push_custom_tables(lines: &mut Vec<String>, tables: &CustomTables) {
    for (name, rows) in tables {
        lines.push(String::new());
        lines.push(format!("## {name}"));
        let Some(first) = rows.first() else {
            continue;
        };
        let columns: Vec<&String> = first.keys().collect();
        lines.push(String::new());
        lines.push(table_line(columns.iter().map(|c| c.as_str())));
        lines.push(table_line(columns.iter().map(|_| "---")));
        for row in rows {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| row.get(*c).map(ToString::to_string).unwrap_or_default())
                .collect();
            lines.push(table_line(cells.iter().map(String::as_str)));
        }
    }
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let escaped: Vec<String> = cells
        .map(|c| c.replace('|', "\\|").replace('\n', " "))
        .collect();
    format!("| {} |", escaped.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{CellValue, ClaimantProfile, MedicalEvent, TableRow};
    use chrono::NaiveDate;

    #[test]
    fn empty_summary_renders_all_na() {
        let md = render(&MedicalSummary::default());
        let expected = "# Medical Summary\n\n## Claimant Profile\n\
            - **Claimant Name**: N/A\n\
            - **Ssn**: N/A\n\
            - **Date Of Birth**: N/A\n\
            - **Alleged Onset Date**: N/A\n\
            - **Date Last Insured**: N/A\n\
            - **Age At Aod**: N/A\n\
            - **Current Age**: N/A\n\
            - **Education**: N/A\n\
            - **Claim Title**: N/A\n\
            - **Notes**: N/A\n\
            \n## Timeline of Medical Events";
        assert_eq!(md, expected);
    }

    #[test]
    fn events_keep_order_and_default_missing_fields() {
        let summary = MedicalSummary {
            profile: ClaimantProfile {
                claimant_name: Some("Jane Doe".into()),
                age_at_aod: Some(47),
                ..Default::default()
            },
            events: vec![
                MedicalEvent {
                    date: Some(NaiveDate::from_ymd_opt(2020, 1, 15).unwrap().into()),
                    provider: Some("Dr. Lee".into()),
                    reason: Some("Back pain".into()),
                    reference: Some("page 3/40".into()),
                },
                MedicalEvent {
                    reason: Some("ER visit".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let md = render(&summary);
        assert!(md.contains("- **Claimant Name**: Jane Doe\n"));
        assert!(md.contains("- **Age At Aod**: 47\n"));
        assert!(md.ends_with(
            "- 2020-01-15 | Dr. Lee | Back pain | page 3/40\n- N/A | N/A | ER visit | N/A"
        ));
    }

    #[test]
    fn custom_tables_follow_the_timeline() {
        let mut row = TableRow::new();
        row.insert("drug".into(), "Gabapentin".into());
        row.insert("dose".into(), "300 | 600 mg".into());
        row.insert("active".into(), CellValue::Flag(true));
        let mut summary = MedicalSummary::default();
        summary.custom_tables.insert("Medications".into(), vec![row]);

        let md = render(&summary);
        assert!(md.ends_with(
            "## Timeline of Medical Events\n\n## Medications\n\n\
             | drug | dose | active |\n\
             | --- | --- | --- |\n\
             | Gabapentin | 300 \\| 600 mg | Yes |"
        ));
    }
}
