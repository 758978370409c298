use serde::Serialize;

use crate::model::Table;
use crate::template::{fallback_confirm_body, render_confirm_body, ConfirmParams, Translations};

/// Where an action button lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionScope {
    /// Batch button above the table; acts on every checked row.
    Table,
    /// Button inside one row's action column.
    Row(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfirmDialog {
    pub title: String,
    pub body: String,
}

fn quoted(name: &str) -> String {
    format!(" \"{}\"", name)
}

/// Names the objects an action will touch, from the rows' `data-display`.
pub fn confirm_params(table: &Table, scope: &ActionScope, help: &str) -> ConfirmParams {
    let selection_list = match scope {
        ActionScope::Table => table
            .rows
            .iter()
            .filter(|row| row.selected)
            .filter_map(|row| row.display.as_deref())
            .map(quoted)
            .collect::<Vec<_>>(),
        ActionScope::Row(key) => table
            .row(key)
            .and_then(|row| row.display.as_deref())
            .map(quoted)
            .into_iter()
            .collect(),
    };
    ConfirmParams {
        selection: selection_list.join(","),
        selection_list,
        help: help.to_string(),
    }
}

/// Title and body for the confirmation of `action_label`. An action that
/// carries its own confirmation message uses it verbatim; without a body
/// template the plain fallback text is used.
pub fn confirm_dialog(
    table: &Table,
    scope: &ActionScope,
    action_label: &str,
    help: &str,
    custom_message: Option<&str>,
    translations: &Translations,
) -> ConfirmDialog {
    let title = translations.confirm_title(action_label.trim());
    let body = match custom_message {
        Some(message) => message.to_string(),
        None => {
            let params = confirm_params(table, scope, help);
            match translations.confirm_body.as_deref() {
                Some(template) => render_confirm_body(&params, template),
                None => fallback_confirm_body(&params),
            }
        }
    };
    ConfirmDialog { title, body }
}
