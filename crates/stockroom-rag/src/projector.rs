//! Canonical text projection of catalog records.
//!
//! The projected text is both what gets embedded and what answer grounding
//! matches against, so the output for a given record must never change
//! between builds.

use stockroom_catalog::{CatalogRecord, ResolvedLocation};

const USE_CASE_SEPARATOR: &str = ", ";
const LOCATION_SEPARATOR: &str = " - ";

/// Render a record and its location as labelled lines.
///
/// Line order is fixed: category, subcategory, brand, model, technical
/// description, use cases, location. Empty values drop their line entirely.
#[must_use]
pub fn project(record: &CatalogRecord, location: Option<&ResolvedLocation>) -> String {
    let mut lines = Vec::with_capacity(7);

    push_line(&mut lines, "Category", Some(&record.category));
    push_line(&mut lines, "Subcategory", record.subcategory.as_deref());
    push_line(&mut lines, "Brand", record.brand.as_deref());
    push_line(&mut lines, "Model", record.model.as_deref());

    let details = &record.technical_details;
    push_line(&mut lines, "Technical Details", details.description.as_deref());
    let use_cases = non_empty(details.use_cases.iter().map(String::as_str));
    if !use_cases.is_empty() {
        lines.push(format!("Use Cases: {}", use_cases.join(USE_CASE_SEPARATOR)));
    }

    if let Some(loc) = location {
        let parts = non_empty([loc.shelf.as_deref(), loc.container.as_deref()].into_iter().flatten());
        if !parts.is_empty() {
            lines.push(format!("Location: {}", parts.join(LOCATION_SEPARATOR)));
        }
    }

    lines.join("\n")
}

fn push_line(lines: &mut Vec<String>, label: &str, value: Option<&str>) {
    if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
        lines.push(format!("{label}: {v}"));
    }
}

fn non_empty<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    values.map(str::trim).filter(|v| !v.is_empty()).collect()
}
