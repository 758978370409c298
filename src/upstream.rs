use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::http::header;
use url::Url;

/// Fetches dashboard pages whose tables are mirrored.
#[derive(Clone)]
pub(crate) struct UpstreamClient {
    client: reqwest::Client,
    url: Url,
    cookie: Option<String>,
}

impl UpstreamClient {
    pub(crate) fn new(url: Url, cookie: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build upstream client")?;
        Ok(Self { client, url, cookie })
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    pub(crate) async fn fetch_page(&self) -> Result<String> {
        let mut request = self
            .client
            .get(self.url.clone())
            .header(header::ACCEPT, "text/html")
            .header("X-Requested-With", "XMLHttpRequest");

        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await.context("upstream request failed")?;
        if !response.status().is_success() {
            return Err(anyhow!("upstream {} failed ({})", self.url, response.status()));
        }
        response.text().await.context("upstream body was not text")
    }
}
