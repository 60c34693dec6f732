//! Concurrent fan-out of one request snapshot to every endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{Id, JoinError, JoinSet};

use crate::endpoint::Endpoint;
use crate::http::{HttpClient, call};
use crate::metrics_defs::UPSTREAM_REQUESTS;
use crate::selector::ResponseSelector;
use crate::snapshot::RequestSnapshot;

/// Slack on top of the per-branch timeout before outstanding branches are
/// aborted by the dispatcher itself.
const GUARD_GRACE: Duration = Duration::from_secs(1);

/// Launches one branch per endpoint and folds their outcomes into a
/// [`ResponseSelector`].
///
/// Cheap to clone: the client pool and endpoint list are shared.
#[derive(Clone)]
pub struct Dispatcher {
    client: HttpClient,
    endpoints: Arc<[Endpoint]>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(client: HttpClient, endpoints: Vec<Endpoint>, timeout: Duration) -> Self {
        Self {
            client,
            endpoints: endpoints.into(),
            timeout,
        }
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Sends `snapshot` to every endpoint at once and waits for all branches.
    ///
    /// Outcomes are applied to the selector in completion order. A wholly
    /// failed fan-out is not an error: the returned selector simply has no
    /// winner. If this future is dropped, every in-flight branch is aborted
    /// along with the `JoinSet`.
    pub async fn fan_out(&self, snapshot: Arc<RequestSnapshot>) -> ResponseSelector {
        let mut join_set = JoinSet::new();
        let mut branch_endpoints: HashMap<Id, usize> = HashMap::new();

        for (idx, endpoint) in self.endpoints.iter().enumerate() {
            let client = self.client.clone();
            let endpoint = endpoint.clone();
            let snapshot = snapshot.clone();
            let timeout = self.timeout;

            let abort_handle = join_set
                .spawn(async move { call(&client, &snapshot, &endpoint, timeout).await });
            branch_endpoints.insert(abort_handle.id(), idx);
        }

        let mut selector = ResponseSelector::new();
        let guard = tokio::time::sleep(self.timeout + GUARD_GRACE);
        tokio::pin!(guard);

        loop {
            tokio::select! {
                joined = join_set.join_next_with_id() => match joined {
                    Some(Ok((id, outcome))) => {
                        branch_endpoints.remove(&id);
                        selector.update(outcome);
                    }
                    Some(Err(e)) => self.record_join_error(e, &mut branch_endpoints),
                    None => break,
                },
                _ = &mut guard => {
                    tracing::error!(
                        remaining = join_set.len(),
                        path = %snapshot.path_and_query,
                        "Fan-out guard deadline reached, aborting remaining branches"
                    );
                    join_set.abort_all();
                    break;
                }
            }
        }

        // Only aborted branches are left; drain them so their endpoints are reported.
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    branch_endpoints.remove(&id);
                    selector.update(outcome);
                }
                Err(e) => self.record_join_error(e, &mut branch_endpoints),
            }
        }

        selector
    }

    fn record_join_error(&self, e: JoinError, branch_endpoints: &mut HashMap<Id, usize>) {
        let endpoint = branch_endpoints
            .remove(&e.id())
            .map(|idx| self.endpoints[idx].to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if e.is_cancelled() {
            tracing::warn!(%endpoint, "Unable to proxy request: timeout");
            shared::counter!(UPSTREAM_REQUESTS, "outcome" => "timeout").increment(1);
        } else {
            tracing::error!(%endpoint, error = %e, "Fan-out branch panicked");
            shared::counter!(UPSTREAM_REQUESTS, "outcome" => "failure").increment(1);
        }
    }
}
