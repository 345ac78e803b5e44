// HTTP transport for the feed backend.
// A small trait over GET/POST so the fetch logic can run against scripted responses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, StatusCode, Url,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use tracing::trace;

use crate::error::{Result, SubfeedError};

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends requests to the backend.
///
/// Non-2xx statuses are returned as responses, not errors; an `Err` means the
/// exchange itself failed (connect error, timeout, broken body).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        url: &Url,
        headers: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<TransportResponse>;

    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<TransportResponse>;
}

/// Transport backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("subfeed/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(SubfeedError::Http)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &Url,
        headers: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<TransportResponse> {
        let mut request = self.client.get(url.clone()).timeout(timeout);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        trace!(%url, %status, bytes = body.len(), "GET completed");

        Ok(TransportResponse { status, body })
    }

    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<TransportResponse> {
        let response = self
            .client
            .post(url.clone())
            .timeout(timeout)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        trace!(%url, %status, bytes = body.len(), "POST completed");

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_get_sends_headers_and_returns_non_2xx_as_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/subscriptions/videos")
            .match_header("authorization", "Bearer abc")
            .match_header("refresh_token", "r1")
            .match_header("expires_in", Matcher::Missing)
            .with_status(503)
            .with_body("busy")
            .create_async()
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let url = Url::parse(&format!("{}/subscriptions/videos", server.url())).unwrap();
        let headers = vec![
            ("Authorization", "Bearer abc".to_string()),
            ("refresh_token", "r1".to_string()),
        ];

        let response = transport
            .get(&url, &headers, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body, "busy");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/exchange-code")
            .match_body(Matcher::Json(serde_json::json!({"code": "c1"})))
            .with_status(200)
            .with_body(r#"{"access_token":"a"}"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let url = Url::parse(&format!("{}/api/exchange-code", server.url())).unwrap();

        let response = transport
            .post_json(&url, &serde_json::json!({"code": "c1"}), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(response.status.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_is_an_error() {
        let transport = ReqwestTransport::new().unwrap();
        // Grab a free port and release it so nothing is listening there
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = Url::parse(&format!("http://127.0.0.1:{}/subscriptions/videos", port)).unwrap();

        let result = transport.get(&url, &[], Duration::from_secs(2)).await;
        assert!(result.is_err());
    }
}
