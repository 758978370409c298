use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use datatable_sync::index::SortDirection;
use datatable_sync::limit::limit_href;
use datatable_sync::model::{Column, ProgressIndicator, Row};
use datatable_sync::{PageEvent, ReconciliationResult, TableState};

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableSummaryPayload {
    pub(crate) id: String,
    pub(crate) rows: usize,
    pub(crate) visible: usize,
    pub(crate) count_text: String,
}

impl TableSummaryPayload {
    pub(crate) fn from_state(state: &TableState) -> Self {
        Self {
            id: state.table.id.clone(),
            rows: state.table.rows.len(),
            visible: state.table.visible_rows().count(),
            count_text: state.table.count_text.clone(),
        }
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TablesPayload {
    pub(crate) upstream: String,
    pub(crate) last_refresh_ms: Option<u64>,
    pub(crate) tables: Vec<TableSummaryPayload>,
    pub(crate) ts: u64,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ColumnPayload {
    pub(crate) label: String,
    pub(crate) sortable: bool,
}

impl From<&Column> for ColumnPayload {
    fn from(column: &Column) -> Self {
        Self {
            label: column.label.clone(),
            sortable: column.kind.is_sortable(),
        }
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProgressPayload {
    pub(crate) cell: usize,
    pub(crate) width: String,
    pub(crate) action_required: bool,
}

impl From<&ProgressIndicator> for ProgressPayload {
    fn from(progress: &ProgressIndicator) -> Self {
        Self {
            cell: progress.cell,
            width: progress.width.clone(),
            action_required: progress.action_required,
        }
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RowPayload {
    pub(crate) key: String,
    pub(crate) classes: Vec<String>,
    pub(crate) cells: Vec<String>,
    pub(crate) display: Option<String>,
    pub(crate) selected: bool,
    pub(crate) progress: Option<ProgressPayload>,
}

impl From<&Row> for RowPayload {
    fn from(row: &Row) -> Self {
        Self {
            key: row.key.clone(),
            classes: row.classes.clone(),
            cells: row.cells.iter().map(|cell| cell.text.clone()).collect(),
            display: row.display.clone(),
            selected: row.selected,
            progress: row.progress.as_ref().map(ProgressPayload::from),
        }
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FilterPayload {
    pub(crate) value: String,
    pub(crate) label: String,
    pub(crate) active: bool,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LimitPayload {
    pub(crate) count: u32,
    pub(crate) title: String,
    pub(crate) href: Option<String>,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SortPayload {
    pub(crate) column: usize,
    pub(crate) direction: &'static str,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TablePayload {
    pub(crate) id: String,
    pub(crate) columns: Vec<ColumnPayload>,
    pub(crate) rows: Vec<RowPayload>,
    pub(crate) count_text: String,
    pub(crate) placeholder: Option<String>,
    pub(crate) filters: Vec<FilterPayload>,
    pub(crate) limits: Vec<LimitPayload>,
    pub(crate) sort: Option<SortPayload>,
    pub(crate) query: Option<String>,
    pub(crate) category: Option<String>,
    pub(crate) ts: u64,
}

impl TablePayload {
    /// Visible rows of `state` in display order, with limit links resolved
    /// against the upstream page.
    pub(crate) fn from_state(state: &TableState, upstream: &Url, ts: u64) -> Self {
        let table = &state.table;
        let limits = table
            .limit_options
            .iter()
            .map(|option| LimitPayload {
                count: option.count,
                title: option.title.clone(),
                href: limit_href(upstream.as_str(), table, option.count).unwrap_or_else(|err| {
                    warn!(%err, table = %table.id, "could not build limit link");
                    None
                }),
            })
            .collect();

        Self {
            id: table.id.clone(),
            columns: table.columns.iter().map(ColumnPayload::from).collect(),
            rows: table.visible_rows().map(RowPayload::from).collect(),
            count_text: table.count_text.clone(),
            placeholder: table.placeholder.as_ref().map(|row| row.html.clone()),
            filters: table
                .filter_buttons
                .iter()
                .map(|button| FilterPayload {
                    value: button.value.clone(),
                    label: button.label.clone(),
                    active: button.active,
                })
                .collect(),
            limits,
            sort: state.index.active().map(|(column, direction)| SortPayload {
                column,
                direction: match direction {
                    SortDirection::Ascending => "asc",
                    SortDirection::Descending => "desc",
                },
            }),
            query: state
                .search
                .as_ref()
                .map(|search| search.query().to_string())
                .filter(|query| !query.is_empty()),
            category: state.category.clone(),
            ts,
        }
    }
}

/// Query string of `/api/tables/{id}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TableParams {
    pub(crate) q: Option<String>,
    pub(crate) category: Option<String>,
    pub(crate) sort: Option<usize>,
    pub(crate) dir: Option<String>,
}

impl TableParams {
    /// The view requested by the query, as events against table `id`.
    pub(crate) fn events(&self, id: &str) -> Vec<PageEvent> {
        let mut events = Vec::new();
        if let Some(category) = self.category.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
            events.push(PageEvent::CategorySelected {
                table: id.to_string(),
                category: category.to_string(),
            });
        }
        if let Some(query) = self.q.as_deref() {
            events.push(PageEvent::SearchInput {
                table: id.to_string(),
                query: query.to_string(),
            });
        }
        if let Some(column) = self.sort {
            events.push(PageEvent::SortRequested {
                table: id.to_string(),
                column,
                direction: Some(
                    self.dir
                        .as_deref()
                        .and_then(SortDirection::parse)
                        .unwrap_or(SortDirection::Ascending),
                ),
            });
        }
        events
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshPayload {
    pub(crate) mounted: Vec<String>,
    pub(crate) results: Vec<ReconciliationResult>,
    pub(crate) ts: u64,
}

impl RefreshPayload {
    pub(crate) fn has_changes(&self) -> bool {
        !self.mounted.is_empty() || self.results.iter().any(ReconciliationResult::is_changed)
    }
}
