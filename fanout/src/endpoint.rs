//! Endpoint resolution.
//!
//! Raw endpoint strings from configuration are turned into [`Endpoint`]s once
//! at startup. Resolution is all-or-nothing: a single bad entry fails the whole
//! list so configuration mistakes surface before any traffic is served.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use http::HeaderValue;
use percent_encoding::percent_decode_str;
use std::fmt;
use url::Url;

use crate::errors::{FanoutError, Result};

/// Placeholder shown instead of a password in logs and errors.
const REDACTED: &str = "xxxxx";

/// A resolved proxy target. Only scheme, authority, credentials and base path
/// are kept; query and fragment of the raw string are discarded.
///
/// `Display` never shows the password: it prints `raw` as is when there is
/// no userinfo, otherwise the URL with the password replaced.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// The string exactly as it appeared in configuration
    pub raw: String,
    /// `http` or `https`
    pub scheme: String,
    /// Host with optional `:port`
    pub host: String,
    /// Never empty, defaults to `/`
    pub base_path: String,
    /// `Basic` credentials from the URL userinfo, if any
    pub authorization: Option<HeaderValue>,
    redacted: String,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |detail: String| FanoutError::InvalidEndpoint {
            raw: raw.to_string(),
            detail,
        };

        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };

        let mut url = Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;
        url.set_query(None);
        url.set_fragment(None);

        let scheme = match url.scheme() {
            "" => "http".to_string(),
            s @ ("http" | "https") => s.to_string(),
            other => return Err(invalid(format!("unsupported scheme: {other}"))),
        };

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(invalid("missing host".to_string())),
        };

        let base_path = match url.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        let authorization = basic_authorization(&url).map_err(invalid)?;

        let redacted = if authorization.is_none() {
            raw.to_string()
        } else {
            let mut shown = url.clone();
            if shown.password().is_some() {
                // Only fails for URLs that cannot carry userinfo at all
                let _ = shown.set_password(Some(REDACTED));
            }
            shown.to_string()
        };

        Ok(Self {
            raw: raw.to_string(),
            scheme,
            host,
            base_path,
            authorization,
            redacted,
        })
    }
}

/// Encodes the URL userinfo as an `Authorization: Basic` value.
fn basic_authorization(url: &Url) -> std::result::Result<Option<HeaderValue>, String> {
    if url.username().is_empty() && url.password().is_none() {
        return Ok(None);
    }

    let decode = |part: &str| {
        percent_decode_str(part)
            .decode_utf8()
            .map(|decoded| decoded.into_owned())
            .map_err(|e| format!("invalid userinfo: {e}"))
    };
    let username = decode(url.username())?;
    let password = decode(url.password().unwrap_or_default())?;

    let encoded = STANDARD.encode(format!("{username}:{password}"));
    let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
        .map_err(|e| format!("invalid userinfo: {e}"))?;
    value.set_sensitive(true);
    Ok(Some(value))
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("endpoint", &self.redacted)
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

/// Resolves every raw endpoint, preserving order and duplicates.
pub fn resolve<S: AsRef<str>>(raw_endpoints: &[S]) -> Result<Vec<Endpoint>> {
    raw_endpoints
        .iter()
        .map(|raw| Endpoint::parse(raw.as_ref()))
        .collect()
}
