use http::{HeaderMap, Method, Request, Version};
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};

use crate::errors::{FanoutError, Result};

/// Immutable copy of an inbound request, taken once before fan-out.
///
/// Branches only ever borrow it; the body is a `Bytes` so every branch gets
/// its own cursor over the same buffer.
#[derive(Clone, Debug)]
pub struct RequestSnapshot {
    pub method: Method,
    pub path_and_query: String,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestSnapshot {
    /// Reads the whole inbound body and copies method, target and headers verbatim.
    pub async fn capture<B>(request: Request<B>) -> Result<Self>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = request.into_parts();

        let body = body
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|e| FanoutError::RequestBodyError(e.to_string()))?;

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            method: parts.method,
            path_and_query,
            version: parts.version,
            headers: parts.headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::FailingBody;
    use http_body_util::Full;

    #[tokio::test]
    async fn test_capture_copies_request() {
        let request = Request::builder()
            .method(Method::PUT)
            .uri("http://proxy.local/v0.4/traces?lang=go")
            .header("x-datadog-trace-count", "3")
            .header("x-multi", "a")
            .header("x-multi", "b")
            .body(Full::new(Bytes::from_static(b"payload")))
            .unwrap();

        let snapshot = RequestSnapshot::capture(request).await.unwrap();

        assert_eq!(snapshot.method, Method::PUT);
        assert_eq!(snapshot.path_and_query, "/v0.4/traces?lang=go");
        assert_eq!(snapshot.body.as_ref(), b"payload");
        assert_eq!(snapshot.headers.get("x-datadog-trace-count").unwrap(), "3");

        let multi: Vec<_> = snapshot.headers.get_all("x-multi").iter().collect();
        assert_eq!(multi, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_capture_reports_body_read_error() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/v0.4/traces")
            .body(FailingBody)
            .unwrap();

        let err = RequestSnapshot::capture(request).await.unwrap_err();
        assert!(matches!(err, FanoutError::RequestBodyError(_)));
    }
}
