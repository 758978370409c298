//! The registry of every data table mounted on a page.
//!
//! A [`Page`] owns each table's live model together with its sort index,
//! quick search and category filter. Tables are mounted from page markup or
//! from lazily loaded panels, refreshed from fresh markup, and driven by
//! [`PageEvent`]s coming from the user.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use crate::enrich::enrich;
use crate::error::{Result, SyncError};
use crate::filter::{initial_category, narrow_to_category, select_category};
use crate::footer::sync;
use crate::index::{SortDirection, SortIndex};
use crate::markup::parse_tables;
use crate::model::{SearchMode, Table, FLASH_CLASS};
use crate::poller::RefreshTicket;
use crate::reconcile::{reconcile, Interaction, ReconciliationResult, SkipReason};
use crate::search::QuickSearch;
use crate::template::{EmptyRowTemplate, Translations};

/// Anything that can report whether a blocking dialog is on screen.
pub trait Modal {
    fn is_visible(&self) -> bool;
}

impl<F> Modal for F
where
    F: Fn() -> bool,
{
    fn is_visible(&self) -> bool {
        self()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PageEvent {
    SearchInput { table: String, query: String },
    CategorySelected { table: String, category: String },
    /// `direction` of `None` toggles like a header click.
    SortRequested {
        table: String,
        column: usize,
        direction: Option<SortDirection>,
    },
    MenuToggled { table: String, open: bool },
    RowSelected { table: String, row: String, selected: bool },
    SelectAll { table: String, selected: bool },
}

impl PageEvent {
    pub fn table_id(&self) -> &str {
        match self {
            PageEvent::SearchInput { table, .. }
            | PageEvent::CategorySelected { table, .. }
            | PageEvent::SortRequested { table, .. }
            | PageEvent::MenuToggled { table, .. }
            | PageEvent::RowSelected { table, .. }
            | PageEvent::SelectAll { table, .. } => table,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TableState {
    pub table: Table,
    pub index: SortIndex,
    pub search: Option<QuickSearch>,
    pub category: Option<String>,
    pub panel: Option<String>,
    epoch: u64,
}

impl TableState {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[derive(Debug)]
pub struct Page {
    translations: Translations,
    empty_template: Option<EmptyRowTemplate>,
    tables: BTreeMap<String, TableState>,
    loaded_panels: HashSet<String>,
    next_epoch: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Translations::default())
    }
}

impl Page {
    pub fn new(translations: Translations) -> Self {
        Self {
            empty_template: Some(translations.empty_row_template()),
            translations,
            tables: BTreeMap::new(),
            loaded_panels: HashSet::new(),
            next_epoch: 0,
        }
    }

    /// Tables mounted afterwards never get a generated "no items" row. A
    /// row the server rendered itself is kept and reused.
    pub fn without_empty_rows(mut self) -> Self {
        self.empty_template = None;
        self
    }

    pub fn translations(&self) -> &Translations {
        &self.translations
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_ids(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableState> {
        self.tables.values()
    }

    pub fn state(&self, id: &str) -> Option<&TableState> {
        self.tables.get(id)
    }

    pub fn table(&self, id: &str) -> Option<&Table> {
        self.tables.get(id).map(|state| &state.table)
    }

    /// Mounts every data table found in `html`; returns their ids.
    pub fn mount(&mut self, html: &str) -> Vec<String> {
        parse_tables(html)
            .into_iter()
            .map(|table| self.mount_table(table, None))
            .collect()
    }

    /// Mounts the tables of a lazily shown panel. Runs once per panel until
    /// the panel is unmounted; later calls return `None`.
    pub fn mount_panel(&mut self, panel_id: &str, html: &str) -> Option<Vec<String>> {
        if !self.loaded_panels.insert(panel_id.to_string()) {
            debug!(panel = panel_id, "panel already mounted");
            return None;
        }
        Some(
            parse_tables(html)
                .into_iter()
                .map(|table| self.mount_table(table, Some(panel_id)))
                .collect(),
        )
    }

    pub fn mount_table(&mut self, mut table: Table, panel: Option<&str>) -> String {
        let template = self.empty_template.clone().or_else(|| server_empty_row(&table));
        table.empty_template = template;
        for row in table.rows.iter_mut() {
            enrich(row);
        }
        let category = initial_category(&table);
        if let Some(category) = &category {
            select_category(&mut table, category);
        }

        self.next_epoch += 1;
        let id = table.id.clone();
        let mut state = TableState {
            index: SortIndex::for_table(&table),
            search: table.search.map(QuickSearch::new),
            category,
            panel: panel.map(str::to_string),
            epoch: self.next_epoch,
            table,
        };
        let visible = refilter(&mut state, &self.translations);
        info!(table = %id, rows = state.table.rows.len(), visible, "table mounted");
        if self.tables.insert(id.clone(), state).is_some() {
            debug!(table = %id, "replaced previously mounted table");
        }
        id
    }

    pub fn unmount(&mut self, id: &str) -> Option<Table> {
        let removed = self.tables.remove(id).map(|state| state.table);
        if removed.is_some() {
            info!(table = id, "table unmounted");
        }
        removed
    }

    /// Tears down a panel's tables and lets the panel mount again later.
    pub fn unmount_panel(&mut self, panel_id: &str) -> Vec<String> {
        self.loaded_panels.remove(panel_id);
        let ids = self
            .tables
            .iter()
            .filter(|(_, state)| state.panel.as_deref() == Some(panel_id))
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();
        for id in &ids {
            self.unmount(id);
        }
        ids
    }

    /// Snapshot of mount epochs, taken before fetching fresh markup.
    pub fn ticket(&self) -> RefreshTicket {
        RefreshTicket::new(
            self.tables
                .iter()
                .map(|(id, state)| (id.clone(), state.epoch))
                .collect(),
        )
    }

    /// Reconciles every table named in `ticket` against the same table in
    /// `html`. Tables remounted or torn down since the ticket was taken, and
    /// tables the page no longer contains, are skipped and left untouched.
    pub fn refresh(
        &mut self,
        html: &str,
        ticket: &RefreshTicket,
        modal: &dyn Modal,
    ) -> Vec<ReconciliationResult> {
        let interaction = Interaction {
            menu_open: false,
            confirm_visible: modal.is_visible(),
        };
        let mut fresh = parse_tables(html)
            .into_iter()
            .map(|table| (table.id.clone(), table))
            .collect::<HashMap<_, _>>();
        let mut ids = ticket.table_ids().collect::<Vec<_>>();
        ids.sort_unstable();

        let translations = &self.translations;
        let tables = &mut self.tables;
        ids.into_iter()
            .map(|id| {
                let state = match tables.get_mut(id) {
                    Some(state) if Some(state.epoch) == ticket.epoch(id) => state,
                    _ => {
                        debug!(table = id, "table detached during refresh");
                        return ReconciliationResult::skipped(id, SkipReason::Detached);
                    }
                };
                let fresh_table = match fresh.remove(id) {
                    Some(table) => table,
                    None => {
                        debug!(table = id, "table missing from fetched page");
                        return ReconciliationResult::skipped(id, SkipReason::NotInPage);
                    }
                };
                if state.table.empty_template.is_none() {
                    state.table.empty_template = server_empty_row(&fresh_table);
                }
                let mut result = reconcile(&mut state.table, &fresh_table, interaction, translations);
                if result.is_changed() {
                    state.index.invalidate();
                    if let Some(search) = state.search.as_mut() {
                        search.invalidate();
                    }
                    result.visible_count = refilter(state, translations);
                    info!(
                        table = id,
                        added = result.added.len(),
                        removed = result.removed.len(),
                        changed = result.changed.len(),
                        "table reconciled"
                    );
                }
                result
            })
            .collect()
    }

    /// Drops the `flash` marker from `keys` once their highlight has run.
    /// The `updated` marker stays until the next pass.
    pub fn clear_flash(&mut self, table_id: &str, keys: &[String]) -> usize {
        let state = match self.tables.get_mut(table_id) {
            Some(state) => state,
            None => return 0,
        };
        let mut cleared = 0;
        for row in state.table.rows.iter_mut() {
            if row.has_class(FLASH_CLASS) && keys.contains(&row.key) {
                row.remove_class(FLASH_CLASS);
                cleared += 1;
            }
        }
        cleared
    }

    pub fn handle(&mut self, event: PageEvent) -> Result<&TableState> {
        let translations = &self.translations;
        let state = self
            .tables
            .get_mut(event.table_id())
            .ok_or_else(|| SyncError::UnknownTable(event.table_id().to_string()))?;

        match event {
            PageEvent::SearchInput { query, .. } => {
                state
                    .search
                    .get_or_insert_with(|| QuickSearch::new(SearchMode::Literal))
                    .set_query(&query);
                refilter(state, translations);
            }
            PageEvent::CategorySelected { category, .. } => {
                select_category(&mut state.table, &category);
                state.category = Some(category);
                refilter(state, translations);
            }
            PageEvent::SortRequested {
                column, direction, ..
            } => {
                let direction = direction.unwrap_or_else(|| state.index.next_direction(column));
                state.index.sort(&mut state.table, column, direction)?;
            }
            PageEvent::MenuToggled { open, .. } => {
                state.table.menu_open = open;
            }
            PageEvent::RowSelected {
                table, row, selected,
            } => match state.table.row_mut(&row) {
                Some(live) => live.selected = selected,
                None => return Err(SyncError::UnknownRow { table, row }),
            },
            PageEvent::SelectAll { selected, .. } => {
                state.table.select_visible(selected);
            }
        }
        Ok(state)
    }
}

fn server_empty_row(table: &Table) -> Option<EmptyRowTemplate> {
    table
        .placeholder
        .as_ref()
        .map(|row| EmptyRowTemplate::Markup(row.html.clone()))
}

/// Recomputes row visibility from the active search and category, then
/// syncs count, placeholder and striping.
fn refilter(state: &mut TableState, translations: &Translations) -> usize {
    let count = match state.search.as_mut() {
        Some(search) => search.apply(&mut state.table, translations),
        None => {
            for row in state.table.rows.iter_mut() {
                row.hidden = false;
            }
            sync(&mut state.table, translations)
        }
    };
    match state.category.as_deref() {
        Some(category) => {
            narrow_to_category(&mut state.table, category);
            sync(&mut state.table, translations)
        }
        None => count,
    }
}
