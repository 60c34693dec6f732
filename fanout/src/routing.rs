use std::collections::HashSet;

/// Set of request paths that get fanned out.
///
/// Matching is exact after dropping one trailing slash on both sides, so
/// `/v0.4/traces` and `/v0.4/traces/` are the same entry.
#[derive(Clone, Debug, Default)]
pub struct ProxyPaths {
    paths: HashSet<String>,
}

impl ProxyPaths {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|p| normalize(p.as_ref().trim()).to_string())
                .collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(normalize(path))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn normalize(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let paths = ProxyPaths::new(["/v0.4/traces", "/profiling/v1/input/"]);

        assert!(paths.contains("/v0.4/traces"));
        assert!(paths.contains("/v0.4/traces/"));
        assert!(paths.contains("/profiling/v1/input"));
        assert!(paths.contains("/profiling/v1/input/"));

        assert!(!paths.contains("/v0.4/traces/extra"));
        assert!(!paths.contains("/v0.4"));
        assert!(!paths.contains("/V0.4/TRACES"));
        assert!(!paths.contains("/"));
    }

    #[test]
    fn test_root_and_duplicates() {
        let paths = ProxyPaths::new(["/", "/info", "/info/"]);
        assert_eq!(paths.len(), 2);
        assert!(paths.contains("/"));
        assert!(paths.contains("/info"));
        assert!(!paths.contains(""));
    }

    #[test]
    fn test_empty() {
        let paths = ProxyPaths::new(Vec::<String>::new());
        assert!(paths.is_empty());
        assert!(!paths.contains("/v0.4/traces"));
    }
}
