//! Reads server-rendered dashboard markup into [`Table`] snapshots.
//!
//! Parsing is lenient: anything that is not recognisable as a data table or a
//! keyed row is skipped, so a malformed page simply yields fewer rows.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::model::{
    normalize_text, Cell, Column, FilterButton, LimitOption, Placeholder, Row, SearchMode, Table,
    TableAction, EMPTY_CLASS,
};
use crate::sorters::SortKind;

fn selector(source: &str) -> Selector {
    Selector::parse(source).unwrap()
}

static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table.datatable"));
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| selector("thead th"));
static BODY_ROW: LazyLock<Selector> = LazyLock::new(|| selector("tbody > tr"));
static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static SECONDS: LazyLock<Selector> = LazyLock::new(|| selector("span[data-seconds]"));
static PERCENT: LazyLock<Selector> = LazyLock::new(|| selector("[percent]"));
static ACTION_REQUIRED: LazyLock<Selector> =
    LazyLock::new(|| selector(".btn-action-required"));
static ROW_CHECKBOX: LazyLock<Selector> = LazyLock::new(|| selector(".table-row-multi-select"));
static OPEN_MENU: LazyLock<Selector> =
    LazyLock::new(|| selector(".actions_column .btn-group.open"));
static TABLE_ACTION: LazyLock<Selector> = LazyLock::new(|| selector(".table_actions > .btn[id]"));
static FILTER_BUTTON: LazyLock<Selector> = LazyLock::new(|| selector("div.table_filter button"));
static LIMIT_LINK: LazyLock<Selector> =
    LazyLock::new(|| selector("div.table_limit ul.dropdown-menu > li > a[data-count]"));
static SEARCH_INPUT: LazyLock<Selector> =
    LazyLock::new(|| selector("div.table_search.client input"));
static PATTERN_SEARCH_INPUT: LazyLock<Selector> =
    LazyLock::new(|| selector("div.table_search_fixedwithquery.client input"));

/// Every `table.datatable` carrying an id, in document order.
pub fn parse_tables(html: &str) -> Vec<Table> {
    let document = Html::parse_document(html);
    document.select(&TABLE).filter_map(table_from_element).collect()
}

/// The table with `id`, or an empty table of that id when the markup does not
/// contain it.
pub fn parse_table(html: &str, id: &str) -> Table {
    let document = Html::parse_document(html);
    document
        .select(&TABLE)
        .find(|element| element.value().attr("id") == Some(id))
        .and_then(table_from_element)
        .unwrap_or_else(|| Table::new(id))
}

fn table_from_element(element: ElementRef<'_>) -> Option<Table> {
    let id = element.value().attr("id")?.to_string();
    let columns = element
        .select(&HEADER_CELL)
        .filter(|th| !has_class(th, "table_header"))
        .map(|th| Column {
            label: element_text(&th),
            kind: SortKind::from_column(has_class(&th, "sortable"), th.value().attr("data-type")),
        })
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    let mut placeholder = None;
    for tr in element.select(&BODY_ROW) {
        if has_class(&tr, EMPTY_CLASS) {
            if placeholder.is_none() {
                placeholder = Some(Placeholder {
                    colspan: placeholder_colspan(&tr).unwrap_or_else(|| columns.len().max(1)),
                    html: tr.html(),
                });
            }
            continue;
        }
        if let Some(row) = row_from_element(&tr) {
            if seen.insert(row.key.clone()) {
                rows.push(row);
            }
        }
    }

    let search = if element.select(&PATTERN_SEARCH_INPUT).next().is_some() {
        Some(SearchMode::Pattern)
    } else if element.select(&SEARCH_INPUT).next().is_some() {
        Some(SearchMode::Literal)
    } else {
        None
    };

    Some(Table {
        id,
        columns,
        rows,
        placeholder,
        empty_template: None,
        actions: element
            .select(&TABLE_ACTION)
            .filter_map(|action| {
                Some(TableAction {
                    id: action.value().attr("id")?.to_string(),
                    html: action.html(),
                })
            })
            .collect(),
        filter_buttons: element
            .select(&FILTER_BUTTON)
            .map(|button| FilterButton {
                value: button.value().attr("value").unwrap_or_default().to_string(),
                label: element_text(&button),
                active: has_class(&button, "active"),
            })
            .collect(),
        limit_options: element
            .select(&LIMIT_LINK)
            .filter_map(|link| {
                let count = link.value().attr("data-count")?.trim().parse::<u32>().ok()?;
                let title = link
                    .value()
                    .attr("title")
                    .map(str::to_string)
                    .unwrap_or_else(|| element_text(&link));
                Some(LimitOption { count, title })
            })
            .collect(),
        pagination_param: non_empty_attr(&element, "data-pagination-param"),
        limit_param: non_empty_attr(&element, "data-limit-param"),
        search,
        menu_open: element.select(&OPEN_MENU).next().is_some(),
        count_text: String::new(),
    })
}

fn row_from_element(tr: &ElementRef<'_>) -> Option<Row> {
    let key = tr.value().attr("id")?;
    if key.is_empty() {
        return None;
    }
    let cells = tr
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "td")
        .map(|td| cell_from_element(&td))
        .collect();

    Some(Row {
        key: key.to_string(),
        classes: tr.value().classes().map(str::to_string).collect(),
        cells,
        selected: tr
            .select(&ROW_CHECKBOX)
            .next()
            .map(|checkbox| checkbox.value().attr("checked").is_some())
            .unwrap_or(false),
        hidden: false,
        display: tr.value().attr("data-display").map(str::to_string),
        percent: tr
            .select(&PERCENT)
            .next()
            .and_then(|element| element.value().attr("percent"))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()),
        action_required: tr.select(&ACTION_REQUIRED).next().is_some(),
        html: tr.html(),
        progress: None,
    })
}

fn cell_from_element(td: &ElementRef<'_>) -> Cell {
    Cell {
        text: element_text(td),
        hidden: has_class(td, "hidden"),
        actions: has_class(td, "actions_column"),
        warning: has_class(td, "warning"),
        list_item: td.select(&LIST_ITEM).next().map(|li| element_text(&li)),
        seconds: td
            .select(&SECONDS)
            .next()
            .and_then(|span| span.value().attr("data-seconds"))
            .and_then(|value| value.trim().parse::<f64>().ok()),
    }
}

fn placeholder_colspan(tr: &ElementRef<'_>) -> Option<usize> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .find_map(|td| td.value().attr("colspan"))
        .and_then(|value| value.trim().parse::<usize>().ok())
}

fn element_text(element: &ElementRef<'_>) -> String {
    normalize_text(&element.text().collect::<String>())
}

fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|value| value == class)
}

fn non_empty_attr(element: &ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_row_keys_keep_the_first() {
        let table = parse_table(
            r#"<table class="datatable" id="volumes"><tbody>
                 <tr id="volumes__row__1"><td>data</td></tr>
                 <tr id="volumes__row__1"><td>copy</td></tr>
                 <tr id="volumes__row__2"><td>logs</td></tr>
               </tbody></table>"#,
            "volumes",
        );
        assert_eq!(table.keys(), vec!["volumes__row__1", "volumes__row__2"]);
        assert_eq!(table.rows[0].cells[0].text, "data");
    }

    #[test]
    fn unkeyed_rows_are_skipped() {
        let table = parse_table(
            r#"<table class="datatable" id="volumes"><tbody>
                 <tr><td>no key</td></tr>
                 <tr id=""><td>empty key</td></tr>
                 <tr class="empty"><td colspan="3">No items to display.</td></tr>
               </tbody></table>"#,
            "volumes",
        );
        assert!(table.rows.is_empty());
        assert_eq!(table.placeholder.as_ref().map(|row| row.colspan), Some(3));
    }

    #[test]
    fn missing_table_parses_as_empty() {
        assert!(parse_tables("<p>Session expired</p>").is_empty());
        let table = parse_table("<p>Session expired</p>", "volumes");
        assert_eq!(table.id, "volumes");
        assert!(table.rows.is_empty());
    }
}
