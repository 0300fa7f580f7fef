use serde::Deserialize;

/// Issue submission URL shape
///
/// A request is an issue submission when it is a `POST` to
/// `/{prefix}/{project_id}/{endpoint}/?{key_param}={key}&...`
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// First path segment
    /// Default: "api"
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Path segment following the numeric project id
    /// Default: "store"
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Query parameter carrying the project key, must come first in the query
    /// Default: "sentry_key"
    #[serde(default = "default_key_param")]
    pub key_param: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            endpoint: default_endpoint(),
            key_param: default_key_param(),
        }
    }
}

fn default_prefix() -> String {
    "api".to_string()
}

fn default_endpoint() -> String {
    "store".to_string()
}

fn default_key_param() -> String {
    "sentry_key".to_string()
}
