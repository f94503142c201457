use bytes::Bytes;
use http_body_util::{BodyExt as _, Empty};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use super::tls::insecure_client_config;
use super::{HttpResponse, RequestTemplate, Result};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// TCP connect timeout. `None` leaves it to the OS.
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        // The OS-level TCP connect timeout can be very long (tens of seconds), which can cause
        // short runs to appear “hung” when the target host is unreachable.
        Self {
            connect_timeout: Some(Duration::from_secs(3)),
        }
    }
}

/// One client handle: its own keep-alive connection pool plus a per-call timeout.
///
/// Redirects are never followed and no `Accept-Encoding` is negotiated, so the status and body
/// observed are exactly what the target returned.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
    timeout: Option<Duration>,
}

impl HttpClient {
    pub fn new(opts: &ClientOptions) -> Result<Self> {
        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);
        http_connector.set_connect_timeout(opts.connect_timeout);
        http_connector.set_nodelay(true);

        let https_connector = HttpsConnectorBuilder::new()
            .with_tls_config(insecure_client_config()?)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let inner = Client::builder(TokioExecutor::new()).build(https_connector);

        Ok(Self {
            inner,
            timeout: None,
        })
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Bounds the whole exchange (connect, response head, body) of subsequent calls.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Sends one request built from `template` and drains the response body.
    ///
    /// Any HTTP status is a successful exchange; only transport failures are errors.
    pub async fn send(&self, template: &RequestTemplate) -> Result<HttpResponse> {
        let exchange = self.exchange(template);
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| Error::Timeout)?,
            None => exchange.await,
        }
    }

    async fn exchange(&self, template: &RequestTemplate) -> Result<HttpResponse> {
        let res: hyper::Response<Incoming> = self.inner.request(template.to_request()).await?;

        let (parts, mut body) = res.into_parts();
        let status = parts.status.as_u16();

        // Draining the body to its end returns the connection to the keep-alive pool.
        let mut body_len = 0u64;
        while let Some(frame) = body.frame().await {
            if let Some(data) = frame?.data_ref() {
                body_len += data.len() as u64;
            }
        }

        Ok(HttpResponse { status, body_len })
    }
}
