use crate::sorters::SortKind;
use crate::template::EmptyRowTemplate;

pub const UPDATED_CLASS: &str = "updated";
pub const FLASH_CLASS: &str = "flash";
pub const WARNING_CLASS: &str = "warning";
pub const EMPTY_CLASS: &str = "empty";
pub const CATEGORY_PREFIX: &str = "category-";
pub const STRIPE_CLASSES: [&str; 2] = ["even", "odd"];

/// Collapses whitespace runs so rows rendered with different indentation
/// still compare equal.
pub fn normalize_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub text: String,
    pub hidden: bool,
    pub actions: bool,
    pub warning: bool,
    /// Text of the first `<li>` when the cell renders a list.
    pub list_item: Option<String>,
    /// `data-seconds` of an inner time-since span.
    pub seconds: Option<f64>,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub(crate) fn searchable(&self) -> bool {
        !self.hidden && !self.actions
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub label: String,
    pub kind: SortKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressIndicator {
    /// Index of the cell the indicator is prepended into.
    pub cell: usize,
    pub width: String,
    pub action_required: bool,
}

impl ProgressIndicator {
    pub fn to_html(&self) -> String {
        let icon = if self.action_required {
            "<span class=\"fa fa-question-circle progress-bar-text\"></span>"
        } else {
            ""
        };
        format!(
            "<div class=\"progress-text horizon-loading-bar\">\
             <div class=\"progress progress-striped active\">\
             <div class=\"progress-bar\" style=\"width: {}\"></div>\
             </div>{}</div>",
            self.width, icon
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    pub key: String,
    pub classes: Vec<String>,
    pub cells: Vec<Cell>,
    pub selected: bool,
    pub hidden: bool,
    pub display: Option<String>,
    pub percent: Option<String>,
    pub action_required: bool,
    /// Outer HTML of the `<tr>` as last received from the server.
    pub html: String,
    pub progress: Option<ProgressIndicator>,
}

impl Row {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_cell(mut self, text: impl Into<String>) -> Self {
        self.cells.push(Cell::new(text));
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|value| value == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|value| value != class);
    }

    pub fn is_warning(&self) -> bool {
        self.has_class(WARNING_CLASS)
    }

    pub fn is_updated(&self) -> bool {
        self.has_class(UPDATED_CLASS)
    }

    pub fn category(&self) -> Option<&str> {
        self.classes
            .iter()
            .find_map(|class| class.strip_prefix(CATEGORY_PREFIX))
    }

    pub fn text(&self) -> String {
        let joined = self
            .cells
            .iter()
            .map(|cell| cell.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        normalize_text(&joined)
    }

    /// Whether `fresh` must replace this row: the text, the warning flag or,
    /// on warning rows, the progress percentage moved.
    pub fn differs_from(&self, fresh: &Row) -> bool {
        if self.is_warning() != fresh.is_warning() {
            return true;
        }
        if fresh.is_warning() && self.percent != fresh.percent {
            return true;
        }
        self.text() != fresh.text()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Placeholder {
    pub colspan: usize,
    pub html: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableAction {
    pub id: String,
    pub html: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterButton {
    pub value: String,
    pub label: String,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LimitOption {
    pub count: u32,
    pub title: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Query is matched as escaped literal text.
    Literal,
    /// Query is compiled as a regular expression.
    Pattern,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionSummary {
    pub any_selected: bool,
    pub all_selected: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub id: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub placeholder: Option<Placeholder>,
    pub empty_template: Option<EmptyRowTemplate>,
    pub actions: Vec<TableAction>,
    pub filter_buttons: Vec<FilterButton>,
    pub limit_options: Vec<LimitOption>,
    pub pagination_param: Option<String>,
    pub limit_param: Option<String>,
    pub search: Option<SearchMode>,
    pub menu_open: bool,
    /// Rendered into both the header and footer count slots.
    pub count_text: String,
}

impl Table {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn row(&self, key: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.key == key)
    }

    pub fn row_mut(&mut self, key: &str) -> Option<&mut Row> {
        self.rows.iter_mut().find(|row| row.key == key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.key == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.key.as_str()).collect()
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|row| !row.hidden)
    }

    pub fn colspan(&self) -> usize {
        self.columns.len().max(1)
    }

    pub fn selection_summary(&self) -> SelectionSummary {
        let selected = self.rows.iter().filter(|row| row.selected).count();
        SelectionSummary {
            any_selected: selected > 0,
            all_selected: !self.rows.is_empty() && selected == self.rows.len(),
        }
    }

    /// Header checkbox semantics: only rows currently shown change state.
    pub fn select_visible(&mut self, selected: bool) {
        for row in self.rows.iter_mut().filter(|row| !row.hidden) {
            row.selected = selected;
        }
    }
}
