#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use portpicker::pick_unused_port;
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::time::sleep;

pub const INSTANCES_PAGE: &str = r#"<html><body>
<table class="datatable" id="instances">
  <thead><tr><th class="sortable">Name</th><th class="sortable" data-type="size">Size</th></tr></thead>
  <tbody>
    <tr id="instances__row__1"><td>web</td><td>2 GB</td></tr>
    <tr id="instances__row__2"><td>db</td><td>20 GB</td></tr>
  </tbody>
</table>
</body></html>"#;

/// Dashboard stand-in whose page can be swapped while the mirror polls it.
pub struct StubUpstream {
    page: Arc<RwLock<String>>,
    url: String,
}

impl StubUpstream {
    pub async fn spawn(initial: &str) -> Self {
        let page = Arc::new(RwLock::new(initial.to_string()));
        let port = pick_unused_port().expect("free upstream port");
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .expect("bind upstream");
        let app = Router::new()
            .route("/project/instances/", get(serve_page))
            .with_state(Arc::clone(&page));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            page,
            url: format!("http://127.0.0.1:{}/project/instances/", port),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_page(&self, html: &str) {
        *self.page.write().expect("stub page lock") = html.to_string();
    }
}

async fn serve_page(State(page): State<Arc<RwLock<String>>>) -> Html<String> {
    Html(page.read().expect("stub page lock").clone())
}

pub struct TestServer {
    child: Child,
    base_url: String,
}

impl TestServer {
    /// Mirror with background refresh disabled.
    pub async fn spawn() -> Self {
        Self::spawn_with(&[("DISABLE_BACKGROUND_TASKS", "1")]).await
    }

    /// Mirror polling `upstream` every 100ms.
    pub async fn spawn_polling(upstream: &StubUpstream) -> Self {
        Self::spawn_with(&[
            ("UPSTREAM_URL", upstream.url()),
            ("REFRESH_INTERVAL_MS", "100"),
        ])
        .await
    }

    async fn spawn_with(envs: &[(&str, &str)]) -> Self {
        let port = pick_unused_port().expect("free port");
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("datatable-sync"));
        cmd.env("PORT", port.to_string())
            .env("RUST_LOG", "warn")
            .envs(envs.iter().copied())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd.spawn().expect("spawn datatable-sync");
        let base_url = format!("http://127.0.0.1:{}", port);
        wait_for_ready(&base_url).await;

        Self { child, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

async fn wait_for_ready(base_url: &str) {
    let client = Client::new();
    let health_url = format!("{}/health", base_url);
    for _ in 0..50 {
        if let Ok(response) = client.get(&health_url).send().await {
            if response.status().is_success() {
                return;
            }
        }
        sleep(Duration::from_millis(100)).await;
    }
    panic!("server did not become ready at {}", health_url);
}
