use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gloo_timers::callback::{Interval, Timeout};
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlTemplateElement};

use crate::confirm::{confirm_dialog, ActionScope};
use crate::index::SortDirection;
use crate::limit::limit_query;
use crate::model::{Table, FLASH_CLASS};
use crate::page::{Page, PageEvent};
use crate::poller::{RefreshGate, DEFAULT_REFRESH_INTERVAL_MS};
use crate::reconcile::ReconciliationResult;
use crate::search::{Debouncer, DEFAULT_SEARCH_DELAY_MS};
use crate::template::Translations;

const CONFIG_ELEMENT_ID: &str = "datatable-config";
const REFRESH_URL_META: &str = "meta[name=\"datatable-refresh-url\"]";
const FLASH_DURATION_MS: u32 = 1500;
const TABLE_SELECTOR: &str = "table.datatable";
const ROW_SELECTOR: &str = "tbody > tr[id]";
const SEARCH_INPUT_SELECTOR: &str =
    "div.table_search.client input, div.table_search_fixedwithquery.client input";
const FILTER_BUTTON_SELECTOR: &str = "div.table_filter button";
const LIMIT_LINK_SELECTOR: &str = "div.table_limit ul.dropdown-menu > li > a";
const SORTABLE_HEADER_SELECTOR: &str = "thead th.sortable";
const ROW_CHECKBOX_SELECTOR: &str = ".table-row-multi-select";
const HEADER_CHECKBOX_CLASS: &str = "multi-select-header";
const OPEN_MENU_SELECTOR: &str = ".actions_column .btn-group.open";
const VISIBLE_MODAL_SELECTOR: &str = ".modal.in, .modal.show";
const BATCH_BUTTON_SELECTOR: &str = ".table_actions button[data-batch-action=\"true\"]";
const COUNT_SELECTOR: &str = "thead span.table_count, tfoot span.table_count";
const PROGRESS_SELECTOR: &str = ".progress-text.horizon-loading-bar";

thread_local! {
    static APP: RefCell<Option<Rc<RefCell<AppState>>>> = const { RefCell::new(None) };
}

#[derive(Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ClientConfig {
    refresh_interval_ms: u32,
    search_delay_ms: u32,
    refresh_url: Option<String>,
    empty_rows: bool,
    translations: Translations,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS as u32,
            search_delay_ms: DEFAULT_SEARCH_DELAY_MS as u32,
            refresh_url: None,
            empty_rows: true,
            translations: Translations::default(),
        }
    }
}

struct AppState {
    document: Document,
    page: Page,
    config: ClientConfig,
    gate: Rc<RefreshGate>,
    refresh_timer: Option<Interval>,
    debouncers: HashMap<String, Debouncer>,
    search_timers: HashMap<String, Timeout>,
}

fn read_config(document: &Document) -> ClientConfig {
    let mut config = document
        .get_element_by_id(CONFIG_ELEMENT_ID)
        .and_then(|el| el.text_content())
        .filter(|text| !text.trim().is_empty())
        .and_then(|text| js_sys::JSON::parse(&text).ok())
        .and_then(|value| serde_wasm_bindgen::from_value::<ClientConfig>(value).ok())
        .unwrap_or_default();
    if config.refresh_url.is_none() {
        config.refresh_url = document
            .query_selector(REFRESH_URL_META)
            .ok()
            .flatten()
            .and_then(|meta| meta.get_attribute("content"))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
    }
    config
}

fn warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}

fn js_error_message(err: JsValue, fallback: &str) -> String {
    if let Some(message) = err.as_string() {
        return message;
    }
    if let Ok(error) = err.dyn_into::<js_sys::Error>() {
        return error.message().into();
    }
    fallback.to_string()
}

fn elements(parent: &Element, selector: &str) -> Vec<Element> {
    let nodes = match parent.query_selector_all(selector) {
        Ok(nodes) => nodes,
        Err(_) => return Vec::new(),
    };
    (0..nodes.length())
        .filter_map(|index| nodes.item(index))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

/// Rows of a rendered table keyed by their literal id.
fn row_elements(table_el: &Element) -> HashMap<String, Element> {
    elements(table_el, ROW_SELECTOR)
        .into_iter()
        .map(|tr| (tr.id(), tr))
        .collect()
}

fn header_cells(table_el: &Element) -> Vec<Element> {
    elements(table_el, "thead th")
        .into_iter()
        .filter(|th| !th.class_list().contains("table_header"))
        .collect()
}

fn table_id_of(el: &Element) -> Option<String> {
    el.closest(TABLE_SELECTOR).ok().flatten().map(|table| table.id())
}

fn element_from_html(document: &Document, html: &str) -> Option<Element> {
    let template = document
        .create_element("template")
        .ok()?
        .dyn_into::<HtmlTemplateElement>()
        .ok()?;
    template.set_inner_html(html);
    template.content().first_element_child()
}

fn modal_visible(document: &Document) -> bool {
    matches!(document.query_selector(VISIBLE_MODAL_SELECTOR), Ok(Some(_)))
}

fn render_progress(tr: &Element, progress_html: Option<(usize, String)>) {
    for indicator in elements(tr, PROGRESS_SELECTOR) {
        indicator.remove();
    }
    if let Some((cell, html)) = progress_html {
        let cells = elements(tr, ":scope > td");
        if let Some(td) = cells.get(cell) {
            let _ = td.insert_adjacent_html("afterbegin", &html);
        }
    }
}

fn render_sort_headers(table_el: &Element, active: Option<(usize, SortDirection)>) {
    for (index, th) in header_cells(table_el).iter().enumerate() {
        match active {
            Some((column, direction)) if column == index => {
                let value = match direction {
                    SortDirection::Ascending => "ascending",
                    SortDirection::Descending => "descending",
                };
                let _ = th.set_attribute("aria-sort", value);
            }
            _ => {
                let _ = th.remove_attribute("aria-sort");
            }
        }
    }
}

/// Enables batch actions only while something is checked, and mirrors the
/// selection into the header checkbox.
fn validate_buttons(table_el: &Element, table: &Table) {
    let summary = table.selection_summary();
    for button in elements(table_el, BATCH_BUTTON_SELECTOR) {
        let _ = button
            .class_list()
            .toggle_with_force("disabled", !summary.any_selected);
    }
    let header = format!("{}.{}", ROW_CHECKBOX_SELECTOR, HEADER_CHECKBOX_CLASS);
    for checkbox in elements(table_el, &header) {
        if let Ok(input) = checkbox.dyn_into::<HtmlInputElement>() {
            input.set_checked(summary.all_selected);
        }
    }
}

/// Writes the model's presentation state onto the rendered table: row order,
/// classes, visibility, checkboxes, progress bars, placeholder and counts.
fn render_table(document: &Document, table: &Table) {
    let table_el = match document.get_element_by_id(&table.id) {
        Some(el) => el,
        None => return,
    };
    let body = match table_el.query_selector("tbody").ok().flatten() {
        Some(body) => body,
        None => return,
    };
    for placeholder in elements(&body, "tr.empty") {
        placeholder.remove();
    }

    let rows = row_elements(&table_el);
    for row in &table.rows {
        let tr = match rows.get(&row.key) {
            Some(tr) => tr,
            None => continue,
        };
        tr.set_class_name(&row.classes.join(" "));
        if let Some(tr) = tr.dyn_ref::<HtmlElement>() {
            tr.set_hidden(row.hidden);
        }
        if let Ok(Some(checkbox)) = tr.query_selector(ROW_CHECKBOX_SELECTOR) {
            if let Ok(input) = checkbox.dyn_into::<HtmlInputElement>() {
                input.set_checked(row.selected);
            }
        }
        render_progress(
            tr,
            row.progress
                .as_ref()
                .map(|progress| (progress.cell, progress.to_html())),
        );
        let _ = body.append_child(tr);
    }

    if let Some(placeholder) = &table.placeholder {
        let _ = body.insert_adjacent_html("beforeend", &placeholder.html);
    }
    for slot in elements(&table_el, COUNT_SELECTOR) {
        slot.set_text_content(Some(&table.count_text));
    }
    for button in elements(&table_el, FILTER_BUTTON_SELECTOR) {
        let value = button.get_attribute("value").unwrap_or_default();
        let active = table
            .filter_buttons
            .iter()
            .any(|filter| filter.active && filter.value == value);
        let _ = button.class_list().toggle_with_force("active", active);
    }
    validate_buttons(&table_el, table);
}

/// Replays one reconciliation onto the DOM: drops removed rows, swaps in
/// replaced rows and actions, prepends new rows.
fn patch_rows(document: &Document, table_el: &Element, table: &Table, result: &ReconciliationResult) {
    let mut rows = row_elements(table_el);
    for key in &result.removed {
        if let Some(tr) = rows.remove(key) {
            tr.remove();
        }
    }

    let body = match table_el.query_selector("tbody").ok().flatten() {
        Some(body) => body,
        None => return,
    };
    for key in result.added.iter().chain(result.changed.iter()) {
        let fresh = match table
            .row(key)
            .and_then(|row| element_from_html(document, &row.html))
        {
            Some(fresh) => fresh,
            None => continue,
        };
        match rows.get(key) {
            Some(existing) => {
                let _ = existing.replace_with_with_node_1(&fresh);
            }
            None => {
                let _ = body.prepend_with_node_1(&fresh);
            }
        }
    }

    for action_id in &result.actions {
        let action = match table.actions.iter().find(|action| &action.id == action_id) {
            Some(action) => action,
            None => continue,
        };
        if let Some(existing) = elements(table_el, ".table_actions > .btn")
            .into_iter()
            .find(|el| &el.id() == action_id)
        {
            existing.set_outer_html(&action.html);
        }
    }
}

/// Ends the highlight in both the DOM and the model, so later renders do not
/// replay it.
fn schedule_flash_removal(state_rc: &Rc<RefCell<AppState>>, table_el: Element, keys: Vec<String>) {
    if keys.is_empty() {
        return;
    }
    let state_rc = Rc::clone(state_rc);
    let timeout = Timeout::new(FLASH_DURATION_MS, move || {
        if let Ok(mut state) = state_rc.try_borrow_mut() {
            state.page.clear_flash(&table_el.id(), &keys);
        }
        let rows = row_elements(&table_el);
        for key in &keys {
            if let Some(tr) = rows.get(key) {
                let _ = tr.class_list().remove_1(FLASH_CLASS);
            }
        }
    });
    timeout.forget();
}

fn apply_results(
    state_rc: &Rc<RefCell<AppState>>,
    state: &AppState,
    results: &[ReconciliationResult],
) {
    for result in results.iter().filter(|result| result.is_changed()) {
        let (table, table_el) = match (
            state.page.table(&result.table_id),
            state.document.get_element_by_id(&result.table_id),
        ) {
            (Some(table), Some(table_el)) => (table, table_el),
            _ => continue,
        };
        patch_rows(&state.document, &table_el, table, result);
        render_table(&state.document, table);
        schedule_flash_removal(state_rc, table_el, result.flashed.clone());
    }
}

async fn fetch_text(url: &str) -> Result<String, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let response = JsFuture::from(window.fetch_with_str(url)).await?;
    let response: web_sys::Response = response.dyn_into()?;
    if !response.ok() {
        return Err(JsValue::from_str(&format!("refresh returned HTTP {}", response.status())));
    }
    let text = JsFuture::from(response.text()?).await?;
    text.as_string()
        .ok_or_else(|| JsValue::from_str("refresh body is not text"))
}

fn refresh_url(state: &AppState) -> Option<String> {
    state
        .config
        .refresh_url
        .clone()
        .or_else(|| web_sys::window().and_then(|window| window.location().href().ok()))
}

fn refresh_tables(state_rc: Rc<RefCell<AppState>>) {
    let (document, gate, url, ticket) = {
        let state = state_rc.borrow();
        let url = match refresh_url(&state) {
            Some(url) => url,
            None => return,
        };
        (state.document.clone(), state.gate.clone(), url, state.page.ticket())
    };
    if ticket.is_empty() {
        return;
    }

    spawn_local(async move {
        let _pass = match gate.try_begin(modal_visible(&document)) {
            Some(pass) => pass,
            None => return,
        };
        match fetch_text(&url).await {
            Ok(html) => {
                let mut guard = state_rc.borrow_mut();
                let state = &mut *guard;
                let modal_document = document.clone();
                let results = state
                    .page
                    .refresh(&html, &ticket, &move || modal_visible(&modal_document));
                apply_results(&state_rc, state, &results);
            }
            Err(err) => warn(&js_error_message(err, "table refresh failed")),
        }
    });
}

fn start_refresh(state_rc: Rc<RefCell<AppState>>) {
    let interval_ms = {
        let mut state = state_rc.borrow_mut();
        if let Some(timer) = state.refresh_timer.take() {
            timer.cancel();
        }
        state.config.refresh_interval_ms
    };
    if interval_ms == 0 {
        return;
    }
    let tick_state = state_rc.clone();
    let timer = Interval::new(interval_ms, move || {
        refresh_tables(tick_state.clone());
    });
    state_rc.borrow_mut().refresh_timer = Some(timer);
}

/// Runs `event` against the page and re-renders the table it targets.
fn dispatch(state_rc: &Rc<RefCell<AppState>>, event: PageEvent) {
    let mut guard = state_rc.borrow_mut();
    let state = &mut *guard;
    match state.page.handle(event) {
        Ok(table_state) => {
            render_table(&state.document, &table_state.table);
            if let Some(table_el) = state.document.get_element_by_id(&table_state.table.id) {
                render_sort_headers(&table_el, table_state.index.active());
            }
        }
        Err(err) => warn(&err.to_string()),
    }
}

fn run_search(state_rc: &Rc<RefCell<AppState>>, table_id: &str) {
    let query = {
        let mut state = state_rc.borrow_mut();
        let now = js_sys::Date::now() as u64;
        match state
            .debouncers
            .get_mut(table_id)
            .and_then(|debouncer| debouncer.due(now))
        {
            Some(query) => query,
            None => return,
        }
    };
    dispatch(
        state_rc,
        PageEvent::SearchInput {
            table: table_id.to_string(),
            query,
        },
    );
}

fn queue_search(state_rc: &Rc<RefCell<AppState>>, table_id: String, query: String) {
    let delay = {
        let mut state = state_rc.borrow_mut();
        let delay = state.config.search_delay_ms;
        state
            .debouncers
            .entry(table_id.clone())
            .or_insert_with(|| Debouncer::new(u64::from(delay)))
            .push(query, js_sys::Date::now() as u64);
        delay
    };
    let state_clone = state_rc.clone();
    let timer_table = table_id.clone();
    let timer = Timeout::new(delay, move || {
        run_search(&state_clone, &timer_table);
    });
    state_rc.borrow_mut().search_timers.insert(table_id, timer);
}

fn clear_search(state_rc: &Rc<RefCell<AppState>>, table_id: String) {
    {
        let mut state = state_rc.borrow_mut();
        state.search_timers.remove(&table_id);
        state.debouncers.remove(&table_id);
    }
    dispatch(
        state_rc,
        PageEvent::SearchInput {
            table: table_id,
            query: String::new(),
        },
    );
}

fn handle_input(state_rc: &Rc<RefCell<AppState>>, event: web_sys::Event) {
    let input = match event
        .target()
        .and_then(|target| target.dyn_into::<HtmlInputElement>().ok())
    {
        Some(input) => input,
        None => return,
    };
    if !input.matches(SEARCH_INPUT_SELECTOR).unwrap_or(false) {
        return;
    }
    if let Some(table_id) = table_id_of(&input) {
        queue_search(state_rc, table_id, input.value());
    }
}

fn handle_keydown(state_rc: &Rc<RefCell<AppState>>, event: web_sys::Event) {
    let key_event = match event.dyn_into::<web_sys::KeyboardEvent>() {
        Ok(event) => event,
        Err(_) => return,
    };
    if key_event.key() != "Escape" {
        return;
    }
    let input = match key_event
        .target()
        .and_then(|target| target.dyn_into::<HtmlInputElement>().ok())
    {
        Some(input) if input.matches(SEARCH_INPUT_SELECTOR).unwrap_or(false) => input,
        _ => return,
    };
    input.set_value("");
    if let Some(table_id) = table_id_of(&input) {
        clear_search(state_rc, table_id);
    }
}

fn handle_limit_click(link: &Element, event: &web_sys::Event) {
    let table_el = match link.closest(TABLE_SELECTOR).ok().flatten() {
        Some(table_el) => table_el,
        None => return,
    };
    let (count, limit_param) = match (
        link.get_attribute("data-count")
            .and_then(|count| count.trim().parse::<u32>().ok()),
        table_el.get_attribute("data-limit-param"),
    ) {
        (Some(count), Some(param)) => (count, param),
        _ => return,
    };
    event.prevent_default();
    let pagination_param = table_el
        .get_attribute("data-pagination-param")
        .unwrap_or_default();
    if let Some(window) = web_sys::window() {
        let location = window.location();
        let query = limit_query(
            &location.search().unwrap_or_default(),
            &pagination_param,
            &limit_param,
            count,
        );
        if let Err(err) = location.set_search(&query) {
            warn(&js_error_message(err, "could not apply page size"));
        }
    }
}

fn sync_menus(state_rc: &Rc<RefCell<AppState>>) {
    let events = {
        let state = state_rc.borrow();
        state
            .page
            .tables()
            .filter_map(|table_state| {
                let table_el = state.document.get_element_by_id(&table_state.table.id)?;
                let open = matches!(table_el.query_selector(OPEN_MENU_SELECTOR), Ok(Some(_)));
                (open != table_state.table.menu_open).then(|| PageEvent::MenuToggled {
                    table: table_state.table.id.clone(),
                    open,
                })
            })
            .collect::<Vec<_>>()
    };
    for event in events {
        dispatch(state_rc, event);
    }
}

fn handle_click(state_rc: &Rc<RefCell<AppState>>, event: web_sys::Event) {
    let target = match event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok())
    {
        Some(target) => target,
        None => return,
    };

    // Menus toggle in their own click handlers; look once they have run.
    let menu_state = state_rc.clone();
    Timeout::new(0, move || sync_menus(&menu_state)).forget();

    if let Ok(Some(link)) = target.closest(LIMIT_LINK_SELECTOR) {
        handle_limit_click(&link, &event);
        return;
    }
    if let Ok(Some(button)) = target.closest(FILTER_BUTTON_SELECTOR) {
        if let (Some(table), Some(category)) = (table_id_of(&button), button.get_attribute("value")) {
            dispatch(state_rc, PageEvent::CategorySelected { table, category });
        }
        return;
    }
    if let Ok(Some(th)) = target.closest(SORTABLE_HEADER_SELECTOR) {
        let table_el = match th.closest(TABLE_SELECTOR).ok().flatten() {
            Some(table_el) => table_el,
            None => return,
        };
        if let Some(column) = header_cells(&table_el).iter().position(|cell| cell.is_same_node(Some(&th))) {
            dispatch(
                state_rc,
                PageEvent::SortRequested {
                    table: table_el.id(),
                    column,
                    direction: None,
                },
            );
        }
    }
}

fn handle_change(state_rc: &Rc<RefCell<AppState>>, event: web_sys::Event) {
    let input = match event
        .target()
        .and_then(|target| target.dyn_into::<HtmlInputElement>().ok())
    {
        Some(input) if input.matches(ROW_CHECKBOX_SELECTOR).unwrap_or(false) => input,
        _ => return,
    };
    let table = match table_id_of(&input) {
        Some(table) => table,
        None => return,
    };
    let selected = input.checked();
    let event = if input.class_list().contains(HEADER_CHECKBOX_CLASS) {
        PageEvent::SelectAll { table, selected }
    } else {
        match input.closest("tr").ok().flatten() {
            Some(tr) => PageEvent::RowSelected {
                table,
                row: tr.id(),
                selected,
            },
            None => return,
        }
    };
    dispatch(state_rc, event);
}

fn listen(document: &Document, event_name: &str, state_rc: Rc<RefCell<AppState>>, handler: fn(&Rc<RefCell<AppState>>, web_sys::Event)) {
    let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
        handler(&state_rc, event);
    }) as Box<dyn FnMut(web_sys::Event)>);
    let _ = document.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
    closure.forget();
}

fn bind_events(document: &Document, state_rc: Rc<RefCell<AppState>>) {
    listen(document, "input", state_rc.clone(), handle_input);
    listen(document, "keydown", state_rc.clone(), handle_keydown);
    listen(document, "click", state_rc.clone(), handle_click);
    listen(document, "change", state_rc, handle_change);
}

fn with_app<T>(f: impl FnOnce(&Rc<RefCell<AppState>>) -> Option<T>) -> Option<T> {
    APP.with(|app| app.borrow().as_ref().and_then(f))
}

/// Mounts the tables of a lazily loaded panel (tab) once.
#[wasm_bindgen(js_name = mountPanel)]
pub fn mount_panel(panel: Element) {
    with_app(|state_rc| {
        let mut guard = state_rc.borrow_mut();
        let state = &mut *guard;
        let ids = state.page.mount_panel(&panel.id(), &panel.outer_html())?;
        for id in ids {
            if let Some(table) = state.page.table(&id) {
                render_table(&state.document, table);
            }
        }
        Some(())
    });
}

#[wasm_bindgen(js_name = unmountPanel)]
pub fn unmount_panel(panel_id: &str) {
    with_app(|state_rc| {
        state_rc.borrow_mut().page.unmount_panel(panel_id);
        Some(())
    });
}

/// Title and body for confirming the action behind `action`, or `null` when
/// it does not belong to a mounted table.
#[wasm_bindgen(js_name = confirmDialog)]
pub fn confirm_dialog_for(action: Element) -> JsValue {
    let table_id = match table_id_of(&action) {
        Some(id) => id,
        None => return JsValue::NULL,
    };
    let scope = match action.closest(".table_actions, .table_actions_menu") {
        Ok(Some(_)) => ActionScope::Table,
        _ => match action.closest("tr").ok().flatten() {
            Some(tr) => ActionScope::Row(tr.id()),
            None => return JsValue::NULL,
        },
    };
    let label = action.text_content().unwrap_or_default();
    let help = action.get_attribute("help_text").unwrap_or_default();
    let custom = action.get_attribute("data-confirm");
    with_app(|state_rc| {
        let state = state_rc.borrow();
        let table = state.page.table(&table_id)?;
        let dialog = confirm_dialog(
            table,
            &scope,
            &label,
            &help,
            custom.as_deref(),
            state.page.translations(),
        );
        serde_wasm_bindgen::to_value(&dialog).ok()
    })
    .unwrap_or(JsValue::NULL)
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let config = read_config(&document);

    let mut page = Page::new(config.translations.clone());
    if !config.empty_rows {
        page = page.without_empty_rows();
    }
    let markup = document
        .document_element()
        .map(|root| root.outer_html())
        .unwrap_or_default();
    for id in page.mount(&markup) {
        if let Some(table) = page.table(&id) {
            render_table(&document, table);
        }
    }

    let state = AppState {
        document: document.clone(),
        page,
        config,
        gate: Rc::new(RefreshGate::new()),
        refresh_timer: None,
        debouncers: HashMap::new(),
        search_timers: HashMap::new(),
    };
    let state_rc = Rc::new(RefCell::new(state));
    APP.with(|app| *app.borrow_mut() = Some(state_rc.clone()));

    bind_events(&document, state_rc.clone());
    start_refresh(state_rc);
    Ok(())
}
