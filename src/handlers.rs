use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

use datatable_sync::{Page, SyncError};

use crate::models::{TablePayload, TableParams, TableSummaryPayload, TablesPayload};
use crate::state::{AppState, StreamEvent};
use crate::util::now_ms;

pub(crate) async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn options_handler() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, cors_headers())
}

async fn tables_payload(state: &AppState) -> TablesPayload {
    let page = state.page.read().await;
    TablesPayload {
        upstream: state.upstream.url().to_string(),
        last_refresh_ms: state.last_refresh_ms(),
        tables: page.tables().map(TableSummaryPayload::from_state).collect(),
        ts: now_ms(),
    }
}

pub(crate) async fn tables_handler(State(state): State<Arc<AppState>>) -> Response {
    json_response(&tables_payload(&state).await)
}

/// One mirrored table, optionally filtered, searched and sorted. The view is
/// computed on a copy; the mirrored state itself is never changed by readers.
pub(crate) async fn table_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<TableParams>,
) -> Response {
    let table = {
        let page = state.page.read().await;
        page.table(&id).cloned()
    };
    let table = match table {
        Some(table) => table,
        None => return sync_error_response(SyncError::UnknownTable(id)),
    };

    let mut view = Page::new(state.config.translations.clone());
    view.mount_table(table, None);
    for event in params.events(&id) {
        if let Err(err) = view.handle(event) {
            return sync_error_response(err);
        }
    }

    match view.state(&id) {
        Some(table_state) => json_response(&TablePayload::from_state(
            table_state,
            state.upstream.url(),
            now_ms(),
        )),
        None => sync_error_response(SyncError::UnknownTable(id)),
    }
}

pub(crate) async fn table_stream(State(state): State<Arc<AppState>>) -> Response {
    let stream_state = Arc::clone(&state);
    let heartbeat = state.config.heartbeat;

    let stream = stream! {
        let mut rx = stream_state.sender.subscribe();

        yield Ok::<_, Infallible>(Event::default().comment("stream-open"));

        let snapshot = tables_payload(&stream_state).await;
        if let Some(event) = json_event("snapshot", &snapshot) {
            yield Ok::<_, Infallible>(event);
        }

        loop {
            match rx.recv().await {
                Ok(StreamEvent::Refresh(payload)) => {
                    if let Some(event) = json_event("refresh", &payload) {
                        yield Ok::<_, Infallible>(event);
                    }
                }
                Ok(StreamEvent::Error(message)) => {
                    let json = serde_json::json!({ "message": message }).to_string();
                    yield Ok::<_, Infallible>(Event::default().event("error").data(json));
                }
                Ok(StreamEvent::Shutdown) => break,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "table stream lagged; skipping messages");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    let sse = Sse::new(stream).keep_alive(KeepAlive::new().interval(heartbeat).text("heartbeat"));
    let mut response = sse.into_response();
    apply_stream_headers(&mut response);
    response
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Option<Event> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(Event::default().event(name).data(json)),
        Err(err) => {
            warn!(?err, event = name, "failed to serialize stream payload");
            None
        }
    }
}

fn json_response<T: Serialize>(payload: &T) -> Response {
    let body = match serde_json::to_string(payload) {
        Ok(body) => body,
        Err(err) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };
    let mut headers = cors_headers();
    headers.insert("Content-Type", HeaderValue::from_static("application/json"));
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));
    (StatusCode::OK, headers, body).into_response()
}

fn sync_error_response(err: SyncError) -> Response {
    let status = match err {
        SyncError::UnknownTable(_) | SyncError::UnknownRow { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    error_response(status, err.to_string())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, cors_headers(), message).into_response()
}

fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type"),
    );
    headers
}

fn apply_stream_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.extend(cors_headers());
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-cache, no-transform"),
    );
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));
    headers.insert("X-Accel-Buffering", HeaderValue::from_static("no"));
}
