//! Live refresh, sorting and filtering for server-rendered dashboard tables.
//!
//! The engine works on parsed [`Table`] models so it runs the same natively
//! and in the browser; the `wasm32` build adds the DOM glue on top.

pub mod confirm;
pub mod diff;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod footer;
pub mod index;
pub mod limit;
pub mod markup;
pub mod model;
pub mod page;
pub mod poller;
pub mod reconcile;
pub mod search;
pub mod sorters;
pub mod template;

#[cfg(target_arch = "wasm32")]
mod wasm_app;

#[cfg(target_arch = "wasm32")]
pub use wasm_app::*;

pub use diff::{diff_tables, RowChange, TableDiff};
pub use error::{Result, SyncError};
pub use index::{SortDirection, SortIndex};
pub use markup::{parse_table, parse_tables};
pub use model::{Cell, Row, Table};
pub use page::{Modal, Page, PageEvent, TableState};
pub use poller::{RefreshGate, RefreshTicket};
pub use reconcile::{reconcile, Interaction, Outcome, ReconciliationResult, SkipReason};
pub use sorters::{SortKey, SortKind};
pub use template::Translations;
