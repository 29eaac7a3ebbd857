use std::cmp::Ordering;

use crate::{ListPageState, NormalizedRecord, SortDir, SortKey};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListViewModel {
    pub title: String,
    pub rows: Vec<RowView>,
    pub page: u32,
    pub total_pages: u32,
    /// "Page 2 of 3".
    pub page_label: String,
    /// "Showing 11 to 20 of 25 items", empty when nothing is shown.
    pub showing_label: String,
    pub has_next: bool,
    pub has_previous: bool,
    pub loading: bool,
    /// Inline error panel shown in place of the table.
    pub error: Option<String>,
    /// Underlying failure reported with `error`, when known.
    pub error_cause: Option<String>,
    /// Shown when the page loaded but nothing matches.
    pub empty_message: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: String,
    pub name: String,
    /// Remaining canonical fields in alphabetical order.
    pub details: Vec<(String, String)>,
    pub deleting: bool,
}

pub(crate) fn build_view(state: &ListPageState) -> ListViewModel {
    let pagination = state.pagination();
    let label = state.kind().label();

    let needle = state.search().trim().to_lowercase();
    let mut visible: Vec<&NormalizedRecord> = state
        .records()
        .iter()
        .filter(|record| needle.is_empty() || matches_search(record, &needle))
        .collect();
    let (key, dir) = state.sort();
    visible.sort_by(|a, b| {
        let ordering = compare(a, b, key);
        match dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });

    let rows: Vec<RowView> = visible
        .into_iter()
        .map(|record| RowView {
            id: record.id.clone(),
            name: record.name().to_string(),
            details: record
                .fields
                .iter()
                .filter(|(field, _)| field.as_str() != "name")
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect(),
            deleting: state.is_deleting(&record.id),
        })
        .collect();

    let (first, last, total) = pagination.showing_range(state.records().len());
    let showing_label = if first == 0 {
        String::new()
    } else {
        format!("Showing {first} to {last} of {total} items")
    };

    let empty_message = (state.error().is_none() && !state.is_loading() && rows.is_empty())
        .then(|| {
            if state.records().is_empty() {
                format!("No {label} found.")
            } else {
                format!("No {label} match \"{}\".", state.search().trim())
            }
        });

    ListViewModel {
        title: capitalize(label),
        rows,
        page: pagination.page,
        total_pages: pagination.total_pages,
        page_label: format!("Page {} of {}", pagination.page, pagination.total_pages),
        showing_label,
        has_next: pagination.has_next(),
        has_previous: pagination.has_previous(),
        loading: state.is_loading(),
        error: state.error().map(str::to_string),
        error_cause: state.error_cause().map(str::to_string),
        empty_message,
        dirty: state.is_dirty(),
    }
}

fn matches_search(record: &NormalizedRecord, needle: &str) -> bool {
    record
        .fields
        .values()
        .any(|value| value.to_lowercase().contains(needle))
}

fn compare(a: &NormalizedRecord, b: &NormalizedRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a
            .name()
            .to_lowercase()
            .cmp(&b.name().to_lowercase())
            .then_with(|| compare_ids(&a.id, &b.id)),
        SortKey::Id => compare_ids(&a.id, &b.id),
        SortKey::Newest => compare_ids(&b.id, &a.id),
    }
}

/// Numeric ids compare as numbers, anything else lexically.
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
