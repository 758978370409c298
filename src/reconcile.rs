use serde::Serialize;
use tracing::debug;

use crate::diff::{diff_tables, RowChange, TableDiff};
use crate::enrich::enrich;
use crate::footer::{remove_no_results_row, sync, visible_count};
use crate::model::{Table, FLASH_CLASS, UPDATED_CLASS};
use crate::template::Translations;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// A row-action dropdown is expanded in the live table.
    MenuOpen,
    /// A confirmation dialog is on screen.
    ConfirmVisible,
    /// The table was unmounted between fetch and merge.
    Detached,
    /// The fetched page does not contain the table.
    NotInPage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Skipped(SkipReason),
    Unchanged,
    Changed,
}

/// User interaction state that blocks a reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Interaction {
    pub menu_open: bool,
    pub confirm_visible: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub table_id: String,
    pub outcome: Outcome,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
    pub enriched: Vec<String>,
    pub flashed: Vec<String>,
    pub actions: Vec<String>,
    pub visible_count: usize,
}

impl ReconciliationResult {
    fn new(table_id: &str, outcome: Outcome) -> Self {
        Self {
            table_id: table_id.to_string(),
            outcome,
            added: Vec::new(),
            removed: Vec::new(),
            changed: Vec::new(),
            enriched: Vec::new(),
            flashed: Vec::new(),
            actions: Vec::new(),
            visible_count: 0,
        }
    }

    pub fn skipped(table_id: &str, reason: SkipReason) -> Self {
        Self::new(table_id, Outcome::Skipped(reason))
    }

    pub fn is_changed(&self) -> bool {
        self.outcome == Outcome::Changed
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Outcome::Skipped(_))
    }
}

/// One reconciliation pass of `live` against `fresh`.
///
/// Skipped entirely while the user is mid-interaction. Otherwise the
/// previous pass's `updated`/`flash` markers are cleared, the diff is
/// computed and applied, and on any change the footer, placeholder and
/// striping are re-synced and every updated row flashes.
pub fn reconcile(
    live: &mut Table,
    fresh: &Table,
    interaction: Interaction,
    translations: &Translations,
) -> ReconciliationResult {
    if interaction.menu_open || live.menu_open {
        debug!(table = %live.id, "row menu open; skipping refresh");
        return ReconciliationResult::skipped(&live.id, SkipReason::MenuOpen);
    }
    if interaction.confirm_visible {
        debug!(table = %live.id, "confirmation visible; skipping refresh");
        return ReconciliationResult::skipped(&live.id, SkipReason::ConfirmVisible);
    }

    for row in live.rows.iter_mut() {
        row.remove_class(UPDATED_CLASS);
        row.remove_class(FLASH_CLASS);
    }

    let diff = diff_tables(live, fresh);
    apply_diff(live, diff, translations)
}

/// Applies a computed diff to the live model.
pub fn apply_diff(
    live: &mut Table,
    diff: TableDiff,
    translations: &Translations,
) -> ReconciliationResult {
    let mut result = ReconciliationResult::new(&live.id, Outcome::Unchanged);
    let mut placeholder_removed = false;

    for change in diff.rows {
        match change {
            RowChange::Removed { key } => {
                live.rows.retain(|row| row.key != key);
                result.removed.push(key);
            }
            RowChange::Added { mut row } => {
                if !placeholder_removed {
                    placeholder_removed = true;
                    remove_no_results_row(live);
                }
                row.add_class(UPDATED_CLASS);
                if enrich(&mut row) {
                    result.enriched.push(row.key.clone());
                }
                result.added.push(row.key.clone());
                live.rows.insert(0, row);
            }
            RowChange::Changed { mut row } => {
                let index = match live.position(&row.key) {
                    Some(index) => index,
                    None => continue,
                };
                row.selected = live.rows[index].selected;
                row.add_class(UPDATED_CLASS);
                if enrich(&mut row) {
                    result.enriched.push(row.key.clone());
                }
                result.changed.push(row.key.clone());
                live.rows[index] = row;
            }
        }
    }

    for action in diff.actions {
        if let Some(existing) = live.actions.iter_mut().find(|existing| existing.id == action.id) {
            result.actions.push(action.id.clone());
            *existing = action;
        }
    }

    let changed = !(result.added.is_empty()
        && result.removed.is_empty()
        && result.changed.is_empty()
        && result.actions.is_empty());

    if changed {
        result.outcome = Outcome::Changed;
        sync(live, translations);
        for row in live.rows.iter_mut().filter(|row| row.is_updated()) {
            row.add_class(FLASH_CLASS);
            result.flashed.push(row.key.clone());
        }
    }
    result.visible_count = visible_count(live);
    result
}
