use crate::http::{ProxyOutcome, UpstreamResponse};

/// Keeps the best response seen so far for one inbound request.
///
/// Only successes compete. A success replaces the current best only when its
/// body is strictly longer, so among equal lengths the first one applied wins.
/// Updates take `&mut self`; the dispatcher is the single consumer that
/// applies outcomes one at a time as branches finish.
#[derive(Debug, Default)]
pub struct ResponseSelector {
    best: Option<UpstreamResponse>,
}

impl ResponseSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one branch outcome. Returns `true` if it became the new best.
    pub fn update(&mut self, outcome: ProxyOutcome) -> bool {
        let ProxyOutcome::Success(candidate) = outcome else {
            return false;
        };

        let replace = match &self.best {
            None => true,
            Some(best) => candidate.body.len() > best.body.len(),
        };

        if replace {
            self.best = Some(candidate);
        }
        replace
    }

    pub fn has_winner(&self) -> bool {
        self.best.is_some()
    }

    /// The winning response, if any branch succeeded.
    pub fn into_winner(self) -> Option<UpstreamResponse> {
        self.best
    }
}
