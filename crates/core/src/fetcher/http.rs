//! reqwest-backed HTTP transport.

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::identity::EgressRoute;

/// HTTP transport over reqwest.
///
/// reqwest binds proxies to a client, so one client is built lazily per
/// egress route and reused for every later request through that route.
pub struct ReqwestTransport {
    timeout: Duration,
    direct: Client,
    proxied: RwLock<HashMap<EgressRoute, Client>>,
}

impl ReqwestTransport {
    /// Create a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let direct = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            timeout,
            direct,
            proxied: RwLock::new(HashMap::new()),
        })
    }

    /// Client for `route`, building it on first use.
    async fn client_for(&self, route: &EgressRoute) -> Result<Client, TransportError> {
        if let Some(client) = self.proxied.read().await.get(route) {
            return Ok(client.clone());
        }

        // The route carries every request, whatever the profile URL scheme
        let proxy = Proxy::all(route.proxy_url())
            .map_err(|e| TransportError::Proxy(format!("invalid proxy {}: {}", route, e)))?;
        let client = Client::builder()
            .timeout(self.timeout)
            .proxy(proxy)
            .build()
            .map_err(|e| TransportError::Proxy(format!("failed to build client for {}: {}", route, e)))?;

        debug!(proxy = %route, "Built proxied HTTP client");
        let mut proxied = self.proxied.write().await;
        Ok(proxied.entry(route.clone()).or_insert(client).clone())
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = match &request.proxy {
            Some(route) => self.client_for(route).await?,
            None => self.direct.clone(),
        };

        let mut builder = client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_proxied_clients_are_cached_per_route() {
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let route = EgressRoute::new("127.0.0.1:10000");

        transport.client_for(&route).await.unwrap();
        transport.client_for(&route).await.unwrap();
        transport
            .client_for(&EgressRoute::new("127.0.0.1:10001"))
            .await
            .unwrap();

        assert_eq!(transport.proxied.read().await.len(), 2);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = ReqwestTransport::new(Duration::from_secs(2)).unwrap();
        let request = HttpRequest {
            url: format!("http://127.0.0.1:{}/alice", port),
            headers: vec![],
            proxy: None,
        };

        let err = transport.get(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[tokio::test]
    async fn test_plain_http_request_goes_through_route() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let route = EgressRoute::new(listener.local_addr().unwrap().to_string());

        let proxy = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
                .await
                .unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });

        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let request = HttpRequest {
            url: "http://profiles.invalid/alice".to_string(),
            headers: vec![("User-Agent".to_string(), "ua-test".to_string())],
            proxy: Some(route),
        };

        let response = transport.get(&request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "ok");

        let received = proxy.await.unwrap();
        assert!(
            received.starts_with("GET http://profiles.invalid/alice HTTP/1.1"),
            "unexpected request: {}",
            received
        );
    }
}
