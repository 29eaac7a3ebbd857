use std::fmt::Write;

use registry_core::{ListViewModel, RowView, Severity};

use super::effects::Alert;

const NAME_WIDTH: usize = 32;

/// Plain-text rendering of one list page.
pub fn render_list(view: &ListViewModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.title);
    let _ = writeln!(out, "{}", "=".repeat(view.title.chars().count().max(1)));

    if let Some(error) = &view.error {
        let _ = writeln!(out, "! {error}");
        if let Some(cause) = &view.error_cause {
            let _ = writeln!(out, "  cause: {cause}");
        }
        return out;
    }
    if let Some(message) = &view.empty_message {
        let _ = writeln!(out, "{message}");
        return out;
    }

    let id_width = view
        .rows
        .iter()
        .map(|row| row.id.chars().count())
        .max()
        .unwrap_or(0)
        .max(2);
    let _ = writeln!(out, "{:<id_width$}  {:<NAME_WIDTH$}  Details", "ID", "Name");
    for row in &view.rows {
        let _ = writeln!(
            out,
            "{:<id_width$}  {:<NAME_WIDTH$}  {}",
            row.id,
            truncate(&row.name, NAME_WIDTH),
            details(row)
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", view.page_label);
    if !view.showing_label.is_empty() {
        let _ = writeln!(out, "{}", view.showing_label);
    }
    out
}

pub fn render_alert(alert: &Alert) -> String {
    match alert.severity {
        Severity::Success => format!("[ok] {}", alert.text),
        Severity::Error => format!("[error] {}", alert.text),
    }
}

fn details(row: &RowView) -> String {
    let mut parts: Vec<String> = row
        .details
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(field, value)| format!("{field}={value}"))
        .collect();
    if row.deleting {
        parts.push("(deleting)".to_string());
    }
    parts.join(", ")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
