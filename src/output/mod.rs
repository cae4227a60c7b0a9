//! Output formatting for CLI results

use colored::Colorize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

use crate::session::SessionReport;

/// Format data as a table
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    if data.is_empty() {
        return "No results found.".to_string();
    }

    let mut table = Table::new(data);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

/// Row in the per-author breakdown table
#[derive(Tabled)]
struct AuthorRow {
    #[tabled(rename = "FOLDER")]
    folder: String,
    #[tabled(rename = "UPLOADED")]
    uploaded: usize,
    #[tabled(rename = "FAILED")]
    failed: usize,
    #[tabled(rename = "NOTE")]
    note: String,
}

/// Render a session report for the terminal: a colored headline plus a
/// per-author table when the session spanned several authors.
pub fn render_report(report: &SessionReport) -> String {
    let headline = if report.total == 0 {
        "No eligible photos were processed.".yellow().to_string()
    } else if report.all_succeeded() {
        format!("All {} photos uploaded.", report.success_count)
            .green()
            .to_string()
    } else if report.total_failure() {
        format!("All {} photos failed.", report.failure_count)
            .red()
            .to_string()
    } else {
        format!(
            "{} uploaded, {} failed.",
            report.success_count, report.failure_count
        )
        .yellow()
        .to_string()
    };

    if report.per_user.len() <= 1 {
        return headline;
    }

    let rows: Vec<AuthorRow> = report
        .per_user
        .iter()
        .map(|u| AuthorRow {
            folder: u.folder_name.clone(),
            uploaded: u.success_count,
            failed: u.failure_count,
            note: u.resolution_error.clone().unwrap_or_default(),
        })
        .collect();

    format!("{}\n{}", headline, format_table(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuthorReport;

    #[derive(Tabled)]
    struct TestRow {
        #[tabled(rename = "ID")]
        id: String,
    }

    #[test]
    fn test_format_table_empty() {
        let items: Vec<TestRow> = vec![];
        assert_eq!(format_table(&items), "No results found.");
    }

    #[test]
    fn test_format_table_renders_rows() {
        let items = vec![TestRow {
            id: "123".to_string(),
        }];
        let result = format_table(&items);
        assert!(result.contains("ID"));
        assert!(result.contains("123"));
    }

    #[test]
    fn test_render_report_single_author_is_one_line() {
        let report = SessionReport {
            success_count: 4,
            failure_count: 0,
            total: 4,
            per_user: vec![AuthorReport {
                folder_name: "alice_42".to_string(),
                success_count: 4,
                failure_count: 0,
                resolution_error: None,
            }],
        };

        let rendered = render_report(&report);
        assert!(rendered.contains("4 photos uploaded"));
        assert!(!rendered.contains("FOLDER"));
    }

    #[test]
    fn test_render_report_multi_author_includes_table() {
        let report = SessionReport {
            success_count: 3,
            failure_count: 2,
            total: 5,
            per_user: vec![
                AuthorReport {
                    folder_name: "alice_42".to_string(),
                    success_count: 3,
                    failure_count: 0,
                    resolution_error: None,
                },
                AuthorReport {
                    folder_name: "bob_7".to_string(),
                    success_count: 0,
                    failure_count: 2,
                    resolution_error: Some("backend unavailable".to_string()),
                },
            ],
        };

        let rendered = render_report(&report);
        assert!(rendered.contains("FOLDER"));
        assert!(rendered.contains("alice_42"));
        assert!(rendered.contains("backend unavailable"));
    }
}
