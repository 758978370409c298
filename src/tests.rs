use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use url::Url;

use datatable_sync::Translations;

use crate::config::Config;
use crate::constants::DEFAULT_STATIC_DIR;
use crate::models::{RefreshPayload, TableParams};
use crate::server::build_router;
use crate::state::{AppState, StreamEvent};
use crate::upstream::UpstreamClient;

const PAGE: &str = r#"
    <table class="datatable" id="instances">
      <thead><tr>
        <th class="multi_select_column"><input type="checkbox" class="table-row-multi-select"></th>
        <th class="sortable">Name</th>
        <th class="sortable" data-type="size">Size</th>
      </tr></thead>
      <tbody>
        <tr id="instances__row__1"><td><input type="checkbox" class="table-row-multi-select"></td><td>web</td><td>2 GB</td></tr>
        <tr id="instances__row__2"><td><input type="checkbox" class="table-row-multi-select"></td><td>db</td><td>20 GB</td></tr>
        <tr id="instances__row__3"><td><input type="checkbox" class="table-row-multi-select"></td><td>cache</td><td>512 MB</td></tr>
      </tbody>
    </table>"#;

fn test_config() -> Config {
    Config {
        upstream_url: Url::parse("http://127.0.0.1:1/project/instances/").expect("upstream url"),
        upstream_cookie: None,
        port: 0,
        refresh_interval: Duration::from_millis(1000),
        request_timeout: Duration::from_millis(200),
        heartbeat: Duration::from_millis(1000),
        static_dir: DEFAULT_STATIC_DIR.to_string(),
        disable_background: true,
        translations: Translations::default(),
    }
}

fn test_state() -> Arc<AppState> {
    let config = test_config();
    let upstream = UpstreamClient::new(
        config.upstream_url.clone(),
        config.upstream_cookie.clone(),
        config.request_timeout,
    )
    .expect("upstream client");
    AppState::new(config, upstream)
}

async fn mounted_state() -> Arc<AppState> {
    let state = test_state();
    let mounted = state.page.write().await.mount(PAGE);
    assert_eq!(mounted, vec!["instances"]);
    state
}

fn test_app(state: Arc<AppState>) -> axum::Router {
    build_router(state, DEFAULT_STATIC_DIR.to_string())
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .expect("response");
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec();
    (status, body)
}

async fn get_json(app: axum::Router, uri: &str) -> serde_json::Value {
    let (status, body) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
    serde_json::from_slice(&body).expect("json body")
}

fn row_names(value: &serde_json::Value) -> Vec<String> {
    value["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .map(|row| row["cells"][1].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let (status, body) = get(test_app(test_state()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn tables_list_is_empty_before_first_refresh() {
    let value = get_json(test_app(test_state()), "/api/tables").await;
    assert_eq!(value["upstream"], "http://127.0.0.1:1/project/instances/");
    assert!(value["lastRefreshMs"].is_null());
    assert_eq!(value["tables"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn tables_list_summarizes_mounted_tables() {
    let state = mounted_state().await;
    state.record_refresh(4242);

    let app = test_app(state);
    let response = app
        .oneshot(Request::builder().uri("/api/tables").body(Body::empty()).unwrap())
        .await
        .expect("tables response");
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("application/json")
    );
    let body = response.into_body().collect().await.expect("body").to_bytes();
    let value: serde_json::Value = serde_json::from_slice(&body).expect("json");

    assert_eq!(value["lastRefreshMs"], 4242);
    let table = &value["tables"][0];
    assert_eq!(table["id"], "instances");
    assert_eq!(table["rows"], 3);
    assert_eq!(table["visible"], 3);
    assert_eq!(table["countText"], "Displaying 3 items");
}

#[tokio::test]
async fn table_view_sorts_sizes_by_magnitude() {
    let app = test_app(mounted_state().await);
    let value = get_json(app, "/api/tables/instances?sort=2&dir=desc").await;
    assert_eq!(row_names(&value), vec!["db", "web", "cache"]);
    assert_eq!(value["sort"]["column"], 2);
    assert_eq!(value["sort"]["direction"], "desc");
    assert_eq!(value["columns"][0]["sortable"], false);
}

#[tokio::test]
async fn table_view_search_updates_count() {
    let app = test_app(mounted_state().await);
    let value = get_json(app, "/api/tables/instances?q=DB").await;
    assert_eq!(row_names(&value), vec!["db"]);
    assert_eq!(value["countText"], "Displaying 1 item");
    assert_eq!(value["query"], "DB");
}

#[tokio::test]
async fn table_view_does_not_mutate_the_mirror() {
    let state = mounted_state().await;
    get_json(test_app(Arc::clone(&state)), "/api/tables/instances?q=web&sort=1").await;

    let page = state.page.read().await;
    let table = page.table("instances").expect("mirrored");
    assert_eq!(table.visible_rows().count(), 3);
    assert_eq!(
        table.keys(),
        vec!["instances__row__1", "instances__row__2", "instances__row__3"]
    );
}

#[tokio::test]
async fn unknown_table_is_not_found() {
    let (status, body) = get(test_app(mounted_state().await), "/api/tables/volumes").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(String::from_utf8_lossy(&body).contains("volumes"));
}

#[tokio::test]
async fn unsortable_column_is_bad_request() {
    let app = test_app(mounted_state().await);
    let (status, _) = get(app.clone(), "/api/tables/instances?sort=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(app, "/api/tables/instances?sort=9").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn options_request_carries_cors_headers() {
    let app = test_app(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/tables")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("options response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn refresh_broadcast_reaches_subscribers() {
    let state = test_state();
    let mut rx = state.sender.subscribe();
    state.broadcast_refresh(RefreshPayload {
        mounted: vec!["instances".to_string()],
        results: Vec::new(),
        ts: 7,
    });
    match rx.recv().await.expect("event") {
        StreamEvent::Refresh(payload) => {
            assert!(payload.has_changes());
            assert_eq!(payload.ts, 7);
        }
        _ => panic!("expected a refresh event"),
    }
}

#[test]
fn table_params_order_category_before_search_and_sort() {
    let params = TableParams {
        q: Some("web".to_string()),
        category: Some(" compute ".to_string()),
        sort: Some(1),
        dir: None,
    };
    let events = params.events("instances");
    assert_eq!(events.len(), 3);
    assert!(matches!(
        &events[0],
        datatable_sync::PageEvent::CategorySelected { category, .. } if category == "compute"
    ));
    assert!(matches!(
        &events[2],
        datatable_sync::PageEvent::SortRequested {
            direction: Some(datatable_sync::SortDirection::Ascending),
            ..
        }
    ));
}
