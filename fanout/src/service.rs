use http::StatusCode;
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response};
use shared::http::{filter_hop_by_hop, make_empty_response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use crate::dispatcher::Dispatcher;
use crate::errors::FanoutError;
use crate::http::UpstreamResponse;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use crate::routing::ProxyPaths;
use crate::snapshot::RequestSnapshot;

pub type ServiceBody = BoxBody<Bytes, FanoutError>;

/// Inbound side of the proxy: allowlist check, snapshot, fan-out, reply.
#[derive(Clone)]
pub struct FanoutService {
    paths: Arc<ProxyPaths>,
    dispatcher: Dispatcher,
}

impl FanoutService {
    pub fn new(paths: ProxyPaths, dispatcher: Dispatcher) -> Self {
        Self {
            paths: Arc::new(paths),
            dispatcher,
        }
    }

    pub async fn handle<B>(&self, request: Request<B>) -> Response<ServiceBody>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        if !self.paths.contains(request.uri().path()) {
            tracing::debug!(path = %request.uri().path(), "Path not proxied");
            return make_empty_response(StatusCode::OK);
        }

        let _inflight = InflightGuard::new();
        let start = Instant::now();
        let uri = request.uri().clone();

        let snapshot = match RequestSnapshot::capture(request).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(uri = %uri, error = %e, "Unable to read incoming request body");
                record_duration(StatusCode::SERVICE_UNAVAILABLE, start);
                return make_empty_response(StatusCode::SERVICE_UNAVAILABLE);
            }
        };

        let winner = self.dispatcher.fan_out(Arc::new(snapshot)).await.into_winner();

        let response = match winner {
            Some(winner) => winner_response(winner),
            None => {
                tracing::warn!(
                    uri = %uri,
                    endpoints = self.dispatcher.endpoints().len(),
                    "No endpoint returned a successful response"
                );
                make_empty_response(StatusCode::OK)
            }
        };

        record_duration(response.status(), start);
        response
    }
}

impl Service<Request<Incoming>> for FanoutService {
    type Response = Response<ServiceBody>;
    type Error = FanoutError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

/// The caller always sees 200 for a proxied winner, whatever 2xx the endpoint used.
fn winner_response(winner: UpstreamResponse) -> Response<ServiceBody> {
    let UpstreamResponse {
        version,
        mut headers,
        body,
        ..
    } = winner;

    filter_hop_by_hop(&mut headers, version);
    headers.remove(CONTENT_LENGTH);
    headers.remove(TRANSFER_ENCODING);

    let mut response = Response::new(Full::new(body).map_err(|e| match e {}).boxed());
    *response.headers_mut() = headers;
    response
}

fn record_duration(status: StatusCode, start: Instant) {
    shared::histogram!(REQUEST_DURATION, "status" => status.as_u16().to_string())
        .record(start.elapsed().as_secs_f64());
}

struct InflightGuard;

impl InflightGuard {
    fn new() -> Self {
        shared::gauge!(REQUESTS_INFLIGHT).increment(1.0);
        Self
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        shared::gauge!(REQUESTS_INFLIGHT).decrement(1.0);
    }
}
