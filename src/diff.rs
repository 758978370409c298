use std::collections::{HashMap, HashSet};

use crate::model::{Row, Table, TableAction};

#[derive(Clone, Debug, PartialEq)]
pub enum RowChange {
    Removed { key: String },
    Added { row: Row },
    Changed { row: Row },
}

impl RowChange {
    pub fn key(&self) -> &str {
        match self {
            RowChange::Removed { key } => key,
            RowChange::Added { row } | RowChange::Changed { row } => &row.key,
        }
    }
}

/// Everything that separates a live table from freshly fetched markup.
///
/// Row changes are ordered for application: removals first, then additions
/// and replacements in reverse document order of the fresh table, so that
/// prepending each addition reproduces the server's ordering at the top.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableDiff {
    pub rows: Vec<RowChange>,
    pub actions: Vec<TableAction>,
}

impl TableDiff {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.actions.is_empty()
    }
}

/// Compares two snapshots by row key. Keys are matched as plain strings.
pub fn diff_tables(live: &Table, fresh: &Table) -> TableDiff {
    let fresh_keys = fresh
        .rows
        .iter()
        .map(|row| row.key.as_str())
        .collect::<HashSet<_>>();
    let live_rows = live
        .rows
        .iter()
        .map(|row| (row.key.as_str(), row))
        .collect::<HashMap<_, _>>();

    let mut rows = live
        .rows
        .iter()
        .filter(|row| !fresh_keys.contains(row.key.as_str()))
        .map(|row| RowChange::Removed {
            key: row.key.clone(),
        })
        .collect::<Vec<_>>();

    for fresh_row in fresh.rows.iter().rev() {
        match live_rows.get(fresh_row.key.as_str()) {
            None => rows.push(RowChange::Added {
                row: fresh_row.clone(),
            }),
            Some(live_row) if live_row.differs_from(fresh_row) => rows.push(RowChange::Changed {
                row: fresh_row.clone(),
            }),
            Some(_) => {}
        }
    }

    let actions = fresh
        .actions
        .iter()
        .filter(|action| {
            live.actions
                .iter()
                .any(|existing| existing.id == action.id && existing.html != action.html)
        })
        .cloned()
        .collect();

    TableDiff { rows, actions }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_tables_produce_no_changes() {
        let table = Table::new("t").with_rows(vec![
            Row::new("a").with_cell("one"),
            Row::new("b").with_cell("two"),
        ]);
        assert!(diff_tables(&table, &table.clone()).is_empty());
    }

    #[test]
    fn whitespace_only_differences_are_ignored() {
        let live = Table::new("t").with_rows(vec![Row::new("a").with_cell("  one\n  ")]);
        let fresh = Table::new("t").with_rows(vec![Row::new("a").with_cell("one")]);
        assert!(diff_tables(&live, &fresh).is_empty());
    }

    #[test]
    fn warning_flag_alone_forces_replacement() {
        let live = Table::new("t").with_rows(vec![Row::new("a").with_cell("Active")]);
        let fresh = Table::new("t").with_rows(vec![Row::new("a")
            .with_cell("Active")
            .with_class("warning")]);
        let diff = diff_tables(&live, &fresh);
        assert_eq!(diff.rows.len(), 1);
        assert!(matches!(diff.rows[0], RowChange::Changed { .. }));
    }

    #[test]
    fn keys_with_selector_characters_match_literally() {
        let key = "port:eth0.100[#1]";
        let live = Table::new("t").with_rows(vec![Row::new(key).with_cell("up")]);
        let fresh = Table::new("t").with_rows(vec![Row::new(key).with_cell("down")]);
        let diff = diff_tables(&live, &fresh);
        assert_eq!(diff.rows.len(), 1);
        assert_eq!(diff.rows[0].key(), key);
    }

    #[test]
    fn removals_precede_reversed_upserts() {
        let live = Table::new("t").with_rows(vec![Row::new("a"), Row::new("gone")]);
        let fresh = Table::new("t").with_rows(vec![Row::new("x"), Row::new("a"), Row::new("y")]);
        let keys = diff_tables(&live, &fresh)
            .rows
            .iter()
            .map(|change| change.key().to_string())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["gone", "y", "x"]);
    }

    #[test]
    fn only_actions_present_on_both_sides_are_synced() {
        let mut live = Table::new("t");
        live.actions = vec![TableAction {
            id: "create".into(),
            html: "<a id=\"create\" class=\"btn\">Create</a>".into(),
        }];
        let mut fresh = Table::new("t");
        fresh.actions = vec![
            TableAction {
                id: "create".into(),
                html: "<a id=\"create\" class=\"btn disabled\">Create (quota exceeded)</a>".into(),
            },
            TableAction {
                id: "delete".into(),
                html: "<a id=\"delete\" class=\"btn\">Delete</a>".into(),
            },
        ];
        let diff = diff_tables(&live, &fresh);
        assert_eq!(diff.actions.len(), 1);
        assert_eq!(diff.actions[0].id, "create");
    }
}
