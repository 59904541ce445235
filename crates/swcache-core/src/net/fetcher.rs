//! Network access for the lifecycle and the interceptor.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use tracing::debug;

use super::FetchError;
use crate::request::{Request, Scope};
use crate::response::{Response, ResponseType};

/// Reaches the network for one request.
///
/// A non-2xx status is not an error here; it comes back as a `Response`
/// and callers decide what to do with it. `Err` means no response at all.
/// Opaque responses carry status 0 and no headers or body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// reqwest-backed fetcher.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    scope: Scope,
}

impl HttpFetcher {
    /// Create a fetcher for `scope`. With no `timeout`, a hung request
    /// hangs until the server gives up.
    pub fn new(scope: Scope, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            scope,
        })
    }

    /// Classify a response the way a browser would see it from this scope
    fn classify(&self, url: &Url, headers: &header::HeaderMap) -> ResponseType {
        if self.scope.is_same_origin(url) {
            return ResponseType::Basic;
        }
        let allowed = headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::trim);
        match allowed {
            Some("*") => ResponseType::Cors,
            Some(origin) if origin == self.scope.origin_header_value() => ResponseType::Cors,
            _ => ResponseType::Opaque,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let response = self
            .client
            .request(request.method().clone(), request.url().clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let response_type = self.classify(&final_url, response.headers());
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        if response_type == ResponseType::Opaque {
            debug!(url = %request.url(), "Opaque network response");
            return Ok(Response::new(0, ResponseType::Opaque).with_url(final_url.to_string()));
        }

        debug!(
            url = %request.url(),
            status = status,
            response_type = %response_type,
            bytes = body.len(),
            "Network response"
        );

        Ok(Response::new(status, response_type)
            .with_url(final_url.to_string())
            .with_headers(headers)
            .with_body(body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_same_origin_is_basic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app/index.html"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<h1>fuel</h1>", "text/html"),
            )
            .mount(&server)
            .await;

        let scope = Scope::parse(&format!("{}/app/", server.uri())).unwrap();
        let fetcher = HttpFetcher::new(scope.clone(), None).unwrap();
        let response = fetcher
            .fetch(&scope.request("./index.html").unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.response_type(), ResponseType::Basic);
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.body(), b"<h1>fuel</h1>");
        assert!(response.is_cache_eligible());
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.js"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let scope = Scope::parse(&server.uri()).unwrap();
        let fetcher = HttpFetcher::new(scope.clone(), None).unwrap();
        let response = fetcher
            .fetch(&scope.request("/missing.js").unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 404);
        assert!(!response.is_cache_eligible());
    }

    #[tokio::test]
    async fn test_cross_origin_with_cors_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/npm/bootstrap.min.css"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("access-control-allow-origin", "*")
                    .set_body_string("body{}"),
            )
            .mount(&server)
            .await;

        let scope = Scope::parse("https://app.example/").unwrap();
        let fetcher = HttpFetcher::new(scope.clone(), None).unwrap();
        let url = format!("{}/npm/bootstrap.min.css", server.uri());
        let response = fetcher.fetch(&scope.request(&url).unwrap()).await.unwrap();

        assert_eq!(response.response_type(), ResponseType::Cors);
    }

    #[tokio::test]
    async fn test_cross_origin_with_matching_origin_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("access-control-allow-origin", "https://app.example"),
            )
            .mount(&server)
            .await;

        let scope = Scope::parse("https://app.example/").unwrap();
        let fetcher = HttpFetcher::new(scope.clone(), None).unwrap();
        let url = format!("{}/icon.png", server.uri());
        let response = fetcher.fetch(&scope.request(&url).unwrap()).await.unwrap();

        assert_eq!(response.response_type(), ResponseType::Cors);
    }

    #[tokio::test]
    async fn test_cross_origin_without_cors_is_opaque() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("access-control-allow-origin", "https://elsewhere.example"),
            )
            .mount(&server)
            .await;

        let scope = Scope::parse("https://app.example/").unwrap();
        let fetcher = HttpFetcher::new(scope.clone(), None).unwrap();
        let url = format!("{}/tracker.gif", server.uri());
        let response = fetcher.fetch(&scope.request(&url).unwrap()).await.unwrap();

        assert_eq!(response.response_type(), ResponseType::Opaque);
        assert_eq!(response.status(), 0);
        assert!(response.body().is_empty());
        assert!(response.headers().is_empty());
        assert!(!response.is_cache_eligible());
    }

    #[tokio::test]
    async fn test_configured_timeout_cuts_off_slow_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/slow.bin"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let scope = Scope::parse(&server.uri()).unwrap();
        let fetcher = HttpFetcher::new(scope.clone(), Some(Duration::from_millis(200))).unwrap();
        let result = fetcher.fetch(&scope.request("/data/slow.bin").unwrap()).await;

        match result {
            Err(FetchError::Network(e)) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_an_error() {
        // Bind then drop a listener so its port is closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let scope = Scope::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        let fetcher = HttpFetcher::new(scope.clone(), Some(Duration::from_secs(5))).unwrap();
        let result = fetcher.fetch(&scope.request("/data/x.bin").unwrap()).await;

        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
