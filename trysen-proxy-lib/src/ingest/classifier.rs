use http::Method;

use crate::config::IngestConfig;

/// Routing identifiers carried by an issue submission URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSubmission {
    /// Digits as they appear in the path, not normalized
    pub project_id: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Subject to admission control
    IssueSubmission(IssueSubmission),
    /// Proxied unconditionally
    NotApplicable,
}

/// Matcher for `/{prefix}/{project_id}/{endpoint}/?{key_param}={key}&...`.
///
/// The key must be the first query parameter, made of word characters, and followed by at
/// least one more parameter.
#[derive(Debug, Clone)]
pub struct IngestPattern {
    // "/api/"
    head: String,
    // "/store/?sentry_key="
    tail: String,
}

impl IngestPattern {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            head: format!("/{}/", config.prefix),
            tail: format!("/{}/?{}=", config.endpoint, config.key_param),
        }
    }

    pub fn classify(&self, method: &Method, path_and_query: &str) -> Classification {
        if *method != Method::POST {
            return Classification::NotApplicable;
        }
        self.parse(path_and_query)
            .map(Classification::IssueSubmission)
            .unwrap_or(Classification::NotApplicable)
    }

    fn parse(&self, path_and_query: &str) -> Option<IssueSubmission> {
        let rest = path_and_query.strip_prefix(self.head.as_str())?;

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        let (project_id, rest) = rest.split_at(digits);

        let rest = rest.strip_prefix(self.tail.as_str())?;
        let key_len = rest
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();
        if key_len == 0 {
            return None;
        }
        let (key, rest) = rest.split_at(key_len);
        if !rest.starts_with('&') {
            return None;
        }

        Some(IssueSubmission { project_id: project_id.to_string(), key: key.to_string() })
    }

    /// Leading part of an issue submission URL, up to and including the key.
    pub fn issue_url(&self, project_id: u64, key: &str) -> String {
        format!("{}{}{}{}", self.head, project_id, self.tail, key)
    }
}
