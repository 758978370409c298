mod support;

use std::time::Duration;

use reqwest::Client;
use tokio::time::sleep;

#[tokio::test]
async fn http_endpoints_smoke() {
    let server = support::TestServer::spawn().await;
    let client = Client::new();

    let health = client
        .get(format!("{}/health", server.base_url()))
        .send()
        .await
        .expect("health request");
    assert!(health.status().is_success());
    assert_eq!(health.text().await.expect("health body"), "ok");

    let tables: serde_json::Value = client
        .get(format!("{}/api/tables", server.base_url()))
        .send()
        .await
        .expect("tables request")
        .json()
        .await
        .expect("tables json");
    assert_eq!(tables["tables"].as_array().map(Vec::len), Some(0));

    let missing = client
        .get(format!("{}/api/tables/instances", server.base_url()))
        .send()
        .await
        .expect("table request");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mirror_serves_polled_upstream_tables() {
    let upstream = support::StubUpstream::spawn(support::INSTANCES_PAGE).await;
    let server = support::TestServer::spawn_polling(&upstream).await;
    let client = Client::new();
    let url = format!("{}/api/tables/instances?sort=1&dir=desc", server.base_url());

    let mut view = None;
    for _ in 0..30 {
        let response = client.get(&url).send().await.expect("table request");
        if response.status().is_success() {
            view = Some(response.json::<serde_json::Value>().await.expect("table json"));
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
    let view = view.expect("table was never mirrored");

    let keys: Vec<&str> = view["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .filter_map(|row| row["key"].as_str())
        .collect();
    assert_eq!(keys, vec!["instances__row__2", "instances__row__1"]);
    assert_eq!(view["countText"], "Displaying 2 items");
}
