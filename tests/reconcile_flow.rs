use datatable_sync::{Outcome, Page, PageEvent, ReconciliationResult, SkipReason};

fn instances_page(rows: &[(&str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(key, name)| {
            format!(
                r#"<tr id="instances__row__{key}"><td><input type="checkbox" class="table-row-multi-select"></td><td>{name}</td></tr>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><table class="datatable" id="instances">
          <thead><tr><th class="multi_select_column"></th><th class="sortable">Name</th></tr></thead>
          <tbody>{body}</tbody>
        </table></body></html>"#
    )
}

fn no_modal() -> bool {
    false
}

fn refresh(page: &mut Page, html: &str) -> ReconciliationResult {
    let ticket = page.ticket();
    let mut results = page.refresh(html, &ticket, &no_modal);
    assert_eq!(results.len(), 1);
    results.remove(0)
}

fn select(page: &mut Page, key: &str) {
    page.handle(PageEvent::RowSelected {
        table: "instances".into(),
        row: format!("instances__row__{key}"),
        selected: true,
    })
    .expect("row exists");
}

#[test]
fn removed_changed_and_new_rows_are_merged() {
    let mut page = Page::default();
    page.mount(&instances_page(&[("a", "alpha"), ("b", "beta"), ("c", "gamma")]));
    select(&mut page, "a");

    let result = refresh(
        &mut page,
        &instances_page(&[("a", "alpha"), ("c", "gamma-2"), ("d", "delta")]),
    );

    assert_eq!(result.outcome, Outcome::Changed);
    assert_eq!(result.removed, vec!["instances__row__b"]);
    assert_eq!(result.changed, vec!["instances__row__c"]);
    assert_eq!(result.added, vec!["instances__row__d"]);
    assert_eq!(result.visible_count, 3);

    let table = page.table("instances").expect("mounted");
    assert_eq!(
        table.keys(),
        vec!["instances__row__d", "instances__row__a", "instances__row__c"]
    );
    assert_eq!(table.count_text, "Displaying 3 items");

    let alpha = table.row("instances__row__a").expect("kept");
    assert!(alpha.selected);
    assert!(!alpha.is_updated());
    assert!(table.row("instances__row__c").expect("replaced").is_updated());
    assert!(table.row("instances__row__d").expect("added").is_updated());
}

#[test]
fn identical_markup_is_a_no_op() {
    let html = instances_page(&[("a", "alpha"), ("b", "beta")]);
    let mut page = Page::default();
    page.mount(&html);

    let first = refresh(&mut page, &html);
    assert_eq!(first.outcome, Outcome::Unchanged);
    assert!(first.flashed.is_empty());

    let changed = instances_page(&[("a", "alpha"), ("b", "beta-2")]);
    assert!(refresh(&mut page, &changed).is_changed());
    let again = refresh(&mut page, &changed);
    assert_eq!(again.outcome, Outcome::Unchanged);
    assert!(again.flashed.is_empty());
}

#[test]
fn selection_survives_row_replacement() {
    let mut page = Page::default();
    page.mount(&instances_page(&[("a", "alpha"), ("b", "beta")]));
    select(&mut page, "b");

    refresh(&mut page, &instances_page(&[("a", "alpha"), ("b", "beta (resizing)")]));

    let table = page.table("instances").expect("mounted");
    let beta = table.row("instances__row__b").expect("replaced");
    assert!(beta.selected);
    assert_eq!(beta.cells[1].text, "beta (resizing)");
}

#[test]
fn placeholder_present_exactly_when_nothing_is_visible() {
    let mut page = Page::default();
    page.mount(&instances_page(&[("a", "alpha")]));

    let passes = [
        instances_page(&[]),
        instances_page(&[]),
        instances_page(&[("b", "beta"), ("c", "gamma")]),
        instances_page(&[("c", "gamma")]),
        instances_page(&[]),
    ];
    for html in &passes {
        refresh(&mut page, html);
        let table = page.table("instances").expect("mounted");
        let visible = table.visible_rows().count();
        assert_eq!(table.placeholder.is_some(), visible == 0, "after {html}");
        if visible == 0 {
            assert_eq!(table.count_text, "");
        }
    }
}

#[test]
fn search_survives_a_changed_pass() {
    let mut page = Page::default();
    page.mount(&instances_page(&[("a", "alpha"), ("b", "beta")]));
    page.handle(PageEvent::SearchInput {
        table: "instances".into(),
        query: "alp".into(),
    })
    .expect("search");

    let result = refresh(
        &mut page,
        &instances_page(&[("a", "alpha"), ("b", "beta"), ("c", "alpine")]),
    );
    assert_eq!(result.visible_count, 2);

    let table = page.table("instances").expect("mounted");
    let visible: Vec<&str> = table.visible_rows().map(|row| row.key.as_str()).collect();
    assert_eq!(visible, vec!["instances__row__c", "instances__row__a"]);
    assert_eq!(table.count_text, "Displaying 2 items");
}

#[test]
fn open_menu_defers_the_merge() {
    let mut page = Page::default();
    page.mount(&instances_page(&[("a", "alpha")]));
    page.handle(PageEvent::MenuToggled {
        table: "instances".into(),
        open: true,
    })
    .expect("menu");

    let result = refresh(&mut page, &instances_page(&[]));
    assert!(result.is_skipped());
    assert_eq!(page.table("instances").map(|table| table.rows.len()), Some(1));
}

const VOLUMES_TAB: &str = r#"<div id="tab-volumes"><table class="datatable" id="volumes">
  <thead><tr><th class="sortable">Name</th></tr></thead>
  <tbody>
    <tr id="volumes__row__1"><td>data</td></tr>
    <tr id="volumes__row__2"><td>logs</td></tr>
  </tbody>
</table></div>"#;

#[test]
fn tables_missing_from_the_fetched_page_are_left_alone() {
    let mut page = Page::default();
    page.mount(&instances_page(&[("a", "alpha")]));
    page.mount_panel("tab-volumes", VOLUMES_TAB).expect("first mount");

    let ticket = page.ticket();
    let results = page.refresh(
        &instances_page(&[("a", "alpha"), ("b", "beta")]),
        &ticket,
        &no_modal,
    );

    let volumes = results
        .iter()
        .find(|result| result.table_id == "volumes")
        .expect("volumes result");
    assert_eq!(volumes.outcome, Outcome::Skipped(SkipReason::NotInPage));
    let table = page.table("volumes").expect("still mounted");
    assert_eq!(table.keys(), vec!["volumes__row__1", "volumes__row__2"]);
    assert!(table.placeholder.is_none());

    let instances = results
        .iter()
        .find(|result| result.table_id == "instances")
        .expect("instances result");
    assert_eq!(instances.added, vec!["instances__row__b"]);
}

#[test]
fn unrelated_page_keeps_every_table() {
    let mut page = Page::default();
    page.mount(&instances_page(&[("a", "alpha"), ("b", "beta")]));

    let result = refresh(&mut page, "<html><body><form id=\"login\"></form></body></html>");
    assert!(result.is_skipped());
    assert!(!result.is_changed());
    assert_eq!(page.table("instances").map(|table| table.rows.len()), Some(2));
}

#[test]
fn present_table_with_unreadable_rows_counts_as_empty() {
    let mut page = Page::default();
    page.mount(&instances_page(&[("a", "alpha"), ("b", "beta")]));

    let garbage = r#"<table class="datatable" id="instances">
      <thead><tr><th class="multi_select_column"></th><th class="sortable">Name</th></tr></thead>
      <tbody><tr><td>%%%</td></tr><tr id=""><td><b>broken</td></tr></tbody>
    </table>"#;
    let result = refresh(&mut page, garbage);

    assert_eq!(result.outcome, Outcome::Changed);
    assert_eq!(result.removed.len(), 2);
    let table = page.table("instances").expect("mounted");
    assert!(table.rows.is_empty());
    assert!(table.placeholder.is_some());
}
