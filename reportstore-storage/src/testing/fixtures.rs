//! Report document fixtures

use serde_json::{json, Value};

use crate::document::{Attachment, ReportDocument};

/// A live report with no metadata and no attachment
pub fn plain_report(id: &str) -> Value {
    to_value(ReportDocument::new(id, format!("Report {}", id)))
}

/// A report flagged for purge
pub fn deleted_report(id: &str) -> Value {
    to_value(ReportDocument::new(id, format!("Report {}", id)).mark_deleted())
}

/// A report carrying one metadata entry
pub fn report_with_metadata(id: &str, field: &str, value: Value) -> Value {
    to_value(ReportDocument::new(id, format!("Report {}", id)).with_metadata(field, value))
}

/// A report with an embedded base64 attachment payload
pub fn attached_report(id: &str, file_name: &str, data: &str) -> Value {
    to_value(
        ReportDocument::new(id, format!("Report {}", id)).with_attachment(Attachment::embedded(file_name, data)),
    )
}

fn to_value(report: ReportDocument) -> Value {
    serde_json::to_value(report).unwrap_or_else(|e| json!({ "fixture_error": e.to_string() }))
}
