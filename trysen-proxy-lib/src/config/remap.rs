use serde::Deserialize;

/// One project/key remapping rule
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RemapRoute {
    /// Project id found in the incoming URL
    pub project_id: u64,
    /// Project key found in the incoming URL
    pub key: String,
    /// Project id sent to the collector instead
    pub target_project_id: u64,
    /// Project key sent to the collector instead
    pub target_key: String,
}

/// Remapping configuration
///
/// Lets old releases keep reporting to a retired project without shipping a new build.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct RemapConfig {
    /// Drop admitted issue submissions with no matching rule
    /// The drop looks exactly like a rate-limit drop (held, then empty 200).
    /// Default: false (forward unchanged)
    #[serde(default)]
    pub drop_unmapped: bool,
    /// Remapping rules, at most one per (project_id, key)
    #[serde(default)]
    pub routes: Vec<RemapRoute>,
}
