use ahash::AHashMap;

use super::classifier::{IngestPattern, IssueSubmission};
use crate::config::RemapConfig;

/// Replacement identifiers for a remapped project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub project_id: u64,
    pub key: String,
}

/// What to do with the URL of an admitted issue submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemapOutcome {
    /// Forward to this path and query instead
    Remapped(String),
    /// Forward as received
    Unchanged,
    /// No rule matched and unmapped submissions are dropped
    Rejected,
}

/// Immutable (project_id, key) -> (project_id, key) table.
#[derive(Debug, Clone, Default)]
pub struct RouteRemapper {
    // project_id (decimal, no leading zeros) -> key -> target
    routes: AHashMap<String, AHashMap<String, RouteTarget>>,
    drop_unmapped: bool,
}

impl RouteRemapper {
    pub fn new(config: &RemapConfig) -> Self {
        let mut routes: AHashMap<String, AHashMap<String, RouteTarget>> = AHashMap::new();
        for route in &config.routes {
            routes.entry(route.project_id.to_string()).or_default().insert(
                route.key.clone(),
                RouteTarget { project_id: route.target_project_id, key: route.target_key.clone() },
            );
        }
        Self { routes, drop_unmapped: config.drop_unmapped }
    }

    /// Look up the rule for `project_id` as written in the URL. `010` does not match a rule for
    /// project `10`.
    pub fn remap(&self, project_id: &str, key: &str) -> Option<&RouteTarget> {
        self.routes.get(project_id)?.get(key)
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(|keys| keys.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn resolve(
        &self,
        pattern: &IngestPattern,
        submission: &IssueSubmission,
        path_and_query: &str,
    ) -> RemapOutcome {
        match self.remap(&submission.project_id, &submission.key) {
            Some(target) => {
                RemapOutcome::Remapped(rewrite_path_and_query(pattern, path_and_query, target))
            }
            None if self.drop_unmapped => RemapOutcome::Rejected,
            None => RemapOutcome::Unchanged,
        }
    }
}

/// Swap the identifiers of an issue submission URL, keeping every other parameter in place.
///
/// Everything before the first `&` is the identifier part and is rebuilt from `target`.
pub fn rewrite_path_and_query(
    pattern: &IngestPattern,
    path_and_query: &str,
    target: &RouteTarget,
) -> String {
    let rest = path_and_query
        .find('&')
        .map(|idx| &path_and_query[idx..])
        .unwrap_or("");
    let mut url = pattern.issue_url(target.project_id, &target.key);
    url.push_str(rest);
    url
}
