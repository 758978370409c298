use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{Result, SyncError};
use crate::footer::restripe;
use crate::model::Table;
use crate::sorters::{SortKey, SortKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Ascending),
            "desc" | "descending" => Some(SortDirection::Descending),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Extracted sort keys for one table, built lazily on the first sort and
/// dropped whenever a refresh changes the rows.
#[derive(Clone, Debug, Default)]
pub struct SortIndex {
    kinds: Vec<SortKind>,
    cache: Option<HashMap<String, Vec<SortKey>>>,
    active: Option<(usize, SortDirection)>,
}

impl SortIndex {
    pub fn for_table(table: &Table) -> Self {
        Self {
            kinds: table.columns.iter().map(|column| column.kind).collect(),
            cache: None,
            active: None,
        }
    }

    pub fn kinds(&self) -> &[SortKind] {
        &self.kinds
    }

    pub fn active(&self) -> Option<(usize, SortDirection)> {
        self.active
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Direction for a header click: toggles the active column, starts other
    /// columns ascending.
    pub fn next_direction(&self, column: usize) -> SortDirection {
        match self.active {
            Some((active, direction)) if active == column => direction.toggled(),
            _ => SortDirection::Ascending,
        }
    }

    pub fn sort(&mut self, table: &mut Table, column: usize, direction: SortDirection) -> Result<()> {
        let kind = match self.kinds.get(column) {
            Some(kind) => *kind,
            None => {
                return Err(SyncError::InvalidColumn {
                    table: table.id.clone(),
                    column,
                })
            }
        };
        if !kind.is_sortable() {
            return Err(SyncError::UnsortableColumn {
                table: table.id.clone(),
                column,
            });
        }

        let kinds = &self.kinds;
        let cache = self.cache.get_or_insert_with(|| {
            table
                .rows
                .iter()
                .map(|row| {
                    let keys = kinds
                        .iter()
                        .enumerate()
                        .map(|(index, kind)| {
                            row.cells
                                .get(index)
                                .map_or(SortKey::Missing, |cell| kind.extract(cell))
                        })
                        .collect();
                    (row.key.clone(), keys)
                })
                .collect()
        });

        let missing = SortKey::Missing;
        table.rows.sort_by(|a, b| {
            let left = key_at(cache, &a.key, column).unwrap_or(&missing);
            let right = key_at(cache, &b.key, column).unwrap_or(&missing);
            let ordering: Ordering = left.compare(right);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });

        self.active = Some((column, direction));
        restripe(table);
        Ok(())
    }
}

fn key_at<'a>(
    cache: &'a HashMap<String, Vec<SortKey>>,
    row_key: &str,
    column: usize,
) -> Option<&'a SortKey> {
    cache.get(row_key).and_then(|keys| keys.get(column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, Column, Row};

    fn sized_table() -> Table {
        let mut table = Table::new("volumes");
        table.columns = vec![
            Column {
                label: "Name".into(),
                kind: SortKind::Text,
            },
            Column {
                label: "Size".into(),
                kind: SortKind::Size,
            },
            Column {
                label: "Actions".into(),
                kind: SortKind::Unsortable,
            },
        ];
        table.rows = vec![
            Row::new("v1").with_cell("data").with_cell("1 MB").with_cell(""),
            Row::new("v2").with_cell("boot").with_cell("2 KB").with_cell(""),
            Row::new("v3").with_cell("Archive").with_cell("1 KB").with_cell(""),
        ];
        table
    }

    #[test]
    fn sorts_by_extracted_size() {
        let mut table = sized_table();
        let mut index = SortIndex::for_table(&table);
        index.sort(&mut table, 1, SortDirection::Ascending).unwrap();
        assert_eq!(table.keys(), vec!["v3", "v2", "v1"]);
        index.sort(&mut table, 1, SortDirection::Descending).unwrap();
        assert_eq!(table.keys(), vec!["v1", "v2", "v3"]);
        assert!(table.rows[0].has_class("even"));
    }

    #[test]
    fn text_sort_ignores_case() {
        let mut table = sized_table();
        let mut index = SortIndex::for_table(&table);
        index.sort(&mut table, 0, SortDirection::Ascending).unwrap();
        assert_eq!(table.keys(), vec!["v3", "v2", "v1"]);
    }

    #[test]
    fn rejects_unsortable_and_unknown_columns() {
        let mut table = sized_table();
        let mut index = SortIndex::for_table(&table);
        assert!(matches!(
            index.sort(&mut table, 2, SortDirection::Ascending),
            Err(SyncError::UnsortableColumn { .. })
        ));
        assert!(matches!(
            index.sort(&mut table, 9, SortDirection::Ascending),
            Err(SyncError::InvalidColumn { .. })
        ));
    }

    #[test]
    fn stale_cache_is_rebuilt_after_invalidate() {
        let mut table = sized_table();
        let mut index = SortIndex::for_table(&table);
        index.sort(&mut table, 1, SortDirection::Ascending).unwrap();
        assert!(index.is_cached());

        table.rows[0].cells[1] = Cell::new("9 GB");
        index.invalidate();
        index.sort(&mut table, 1, SortDirection::Ascending).unwrap();
        assert_eq!(table.keys(), vec!["v2", "v1", "v3"]);
    }

    #[test]
    fn header_clicks_toggle_direction() {
        let mut table = sized_table();
        let mut index = SortIndex::for_table(&table);
        assert_eq!(index.next_direction(1), SortDirection::Ascending);
        index.sort(&mut table, 1, SortDirection::Ascending).unwrap();
        assert_eq!(index.next_direction(1), SortDirection::Descending);
        assert_eq!(index.next_direction(0), SortDirection::Ascending);
    }
}
