use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hyper::header::ACCEPT;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request, Uri};
use tracing::debug;

use super::source::StateSource;
use crate::error::FetchError;
use crate::state::RawPayload;

/// Polls the balancer's state export (`/_internal/state`, `/servers`, ...)
/// with a plain GET.
pub struct HttpStateSource {
    endpoint: Uri,
    timeout: Duration,
    client: Client<HttpConnector, Body>,
    request_counter: AtomicU64,
}

impl HttpStateSource {
    pub fn new(endpoint: Uri, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            client: Client::new(),
            request_counter: AtomicU64::new(0),
        }
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    pub fn requests_issued(&self) -> u64 {
        self.request_counter.load(Ordering::Relaxed)
    }

    async fn get_json(&self) -> Result<RawPayload, FetchError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .body(Body::empty())
            .map_err(|_| FetchError::InvalidUri(self.endpoint.to_string()))?;

        let response = self.client.request(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl StateSource for HttpStateSource {
    async fn fetch(&self) -> Result<RawPayload, FetchError> {
        let req_id = self.request_counter.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(req_id, endpoint = %self.endpoint, "GET state");

        match tokio::time::timeout(self.timeout, self.get_json()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout.as_millis())),
        }
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}
