use http::header::{AUTHORIZATION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{HeaderMap, StatusCode, Uri, Version};
use http_body_util::{BodyExt, Full};
use hyper::Request;
use hyper::body::Bytes;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use shared::http::filter_hop_by_hop;
use std::time::Duration;
use tokio::time::timeout;

use crate::endpoint::Endpoint;
use crate::errors::{FanoutError, Result};
use crate::metrics_defs::UPSTREAM_REQUESTS;
use crate::snapshot::RequestSnapshot;

/// Process-wide outbound client, shared by every request and every branch.
pub type HttpClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Longest slice of an error response body kept in the failure reason.
const ERROR_BODY_SUMMARY_LEN: usize = 256;

/// A fully buffered 2xx response from one endpoint.
#[derive(Clone, Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Terminal result of one branch.
#[derive(Debug)]
pub enum ProxyOutcome {
    Success(UpstreamResponse),
    Failure(FanoutError),
}

pub fn build_client() -> Result<HttpClient> {
    let mut http_connector = HttpConnector::new();
    http_connector.enforce_http(false);

    let https_connector = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
        .map_err(|e| FanoutError::InternalError(format!("Failed to configure TLS: {e}")))?
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    Ok(Client::builder(TokioExecutor::new()).build(https_connector))
}

/// Joins two path segments with exactly one `/` between them.
pub fn join_url_path(base: &str, target: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        target.trim_start_matches('/')
    )
}

/// Sends `snapshot` to a single endpoint and captures the outcome.
///
/// The `timeout` covers the whole exchange: connecting, sending the request
/// and collecting the complete response body. When it elapses the in-flight
/// future is dropped, which closes the connection.
///
/// Emits exactly one log line describing the outcome.
pub async fn call(
    client: &HttpClient,
    snapshot: &RequestSnapshot,
    endpoint: &Endpoint,
    timeout: Duration,
) -> ProxyOutcome {
    match send(client, snapshot, endpoint, timeout).await {
        Ok(response) => {
            tracing::info!(
                endpoint = %endpoint,
                path = %snapshot.path_and_query,
                status = %response.status,
                body_len = response.body.len(),
                "Successfully proxied request"
            );
            shared::counter!(UPSTREAM_REQUESTS, "outcome" => "success").increment(1);
            ProxyOutcome::Success(response)
        }
        Err(e) => {
            tracing::warn!(
                endpoint = %endpoint,
                path = %snapshot.path_and_query,
                outcome = e.outcome_class(),
                error = %e,
                "Unable to proxy request"
            );
            shared::counter!(UPSTREAM_REQUESTS, "outcome" => e.outcome_class()).increment(1);
            ProxyOutcome::Failure(e)
        }
    }
}

async fn send(
    client: &HttpClient,
    snapshot: &RequestSnapshot,
    endpoint: &Endpoint,
    timeout_duration: Duration,
) -> Result<UpstreamResponse> {
    let request = build_upstream_request(snapshot, endpoint)?;

    let exchange = async {
        let response = client.request(request).await.map_err(|e| {
            FanoutError::UpstreamRequestFailed(endpoint.to_string(), e.to_string())
        })?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|e| FanoutError::ResponseBodyError(endpoint.to_string(), e.to_string()))?;

        Ok::<_, FanoutError>((parts, body))
    };

    let (parts, body) = timeout(timeout_duration, exchange)
        .await
        .map_err(|_| FanoutError::UpstreamTimeout(endpoint.to_string()))??;

    if !parts.status.is_success() {
        return Err(FanoutError::NonSuccessStatus {
            endpoint: endpoint.to_string(),
            status: parts.status,
            body: summarize_body(&body),
        });
    }

    Ok(UpstreamResponse {
        status: parts.status,
        version: parts.version,
        headers: parts.headers,
        body,
    })
}

/// Builds the outbound copy of the snapshot for one endpoint.
///
/// The snapshot itself is never touched: headers are cloned, and the body is a
/// new `Full` over the same shared buffer.
fn build_upstream_request(
    snapshot: &RequestSnapshot,
    endpoint: &Endpoint,
) -> Result<Request<Full<Bytes>>> {
    let uri: Uri = format!(
        "{}://{}{}",
        endpoint.scheme,
        endpoint.host,
        join_url_path(&endpoint.base_path, &snapshot.path_and_query)
    )
    .parse()
    .map_err(|e| FanoutError::InternalError(format!("Unable to build proxy target URL: {e}")))?;

    let mut headers = snapshot.headers.clone();
    filter_hop_by_hop(&mut headers, snapshot.version);
    // hyper derives these from the target URI and the buffered body
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);
    headers.remove(TRANSFER_ENCODING);
    if let Some(authorization) = &endpoint.authorization
        && !headers.contains_key(AUTHORIZATION)
    {
        headers.insert(AUTHORIZATION, authorization.clone());
    }

    let mut request = Request::builder()
        .method(snapshot.method.clone())
        .uri(uri)
        .body(Full::new(snapshot.body.clone()))
        .map_err(|e| FanoutError::InternalError(format!("Failed to build request: {e}")))?;
    *request.headers_mut() = headers;

    Ok(request)
}

fn summarize_body(body: &Bytes) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(ERROR_BODY_SUMMARY_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.into_owned(),
    }
}
