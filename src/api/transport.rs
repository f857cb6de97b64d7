use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::SET_COOKIE;
use thiserror::Error;

/// One configured backend URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, verify_tls: bool, timeout: Duration) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            verify_tls,
            timeout,
        }
    }
}

/// What the pool needs from an HTTP response
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub set_cookies: Vec<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError(e.to_string())
    }
}

/// Transport handle owned by a session
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError>;

    async fn post(&self, url: &str, body: String) -> Result<HttpResponse, TransportError>;
}

/// Builds one transport handle per endpoint
pub trait ClientFactory: Send + Sync {
    fn build(&self, endpoint: &Endpoint) -> Result<Arc<dyn HttpClient>, TransportError>;
}

/// Production factory backed by `reqwest`
#[derive(Debug, Default, Clone, Copy)]
pub struct ReqwestFactory;

impl ClientFactory for ReqwestFactory {
    fn build(&self, endpoint: &Endpoint) -> Result<Arc<dyn HttpClient>, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(endpoint.timeout)
            .danger_accept_invalid_certs(!endpoint.verify_tls)
            .build()?;
        Ok(Arc::new(ReqwestClient { client }))
    }
}

pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    async fn read(resp: reqwest::Response) -> Result<HttpResponse, TransportError> {
        let status = resp.status().as_u16();
        let set_cookies = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        let body = resp.text().await?;
        Ok(HttpResponse { status, set_cookies, body })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let mut req = self.client.get(url);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        Self::read(req.send().await?).await
    }

    async fn post(&self, url: &str, body: String) -> Result<HttpResponse, TransportError> {
        let resp = self.client.post(url).body(body).send().await?;
        Self::read(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_drops_trailing_slash() {
        let ep = Endpoint::new("https://apic-1.example.com/", true, Duration::from_secs(15));
        assert_eq!(ep.url, "https://apic-1.example.com");
    }

    #[test]
    fn success_range() {
        let ok = HttpResponse { status: 204, ..Default::default() };
        let redirect = HttpResponse { status: 302, ..Default::default() };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }
}
