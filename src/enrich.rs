use tracing::debug;

use crate::model::{ProgressIndicator, Row};

const DEFAULT_PERCENT: &str = "100%";

/// Width for the row's progress bar: its first `percent` attribute, with a
/// `%` appended to bare numbers, or full width when absent.
pub fn progress_width(row: &Row) -> String {
    match row.percent.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => {
            if value.parse::<f64>().is_ok() {
                format!("{}%", value)
            } else {
                value.to_string()
            }
        }
        _ => DEFAULT_PERCENT.to_string(),
    }
}

/// Attaches a progress indicator to warning rows, prepended into the last
/// warning cell. Returns whether the row's indicator changed; calling it
/// again on an enriched row is a no-op.
pub fn enrich(row: &mut Row) -> bool {
    let wanted = if row.is_warning() {
        row.cells
            .iter()
            .rposition(|cell| cell.warning)
            .map(|cell| ProgressIndicator {
                cell,
                width: progress_width(row),
                action_required: row.action_required,
            })
    } else {
        None
    };

    if row.progress == wanted {
        return false;
    }
    debug!(row = %row.key, indicator = ?wanted, "progress indicator updated");
    row.progress = wanted;
    true
}
