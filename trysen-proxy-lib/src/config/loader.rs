use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{ProxyError, Result};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| ProxyError::Config(format!("Failed to read config file: {e}")))?;
    load_from_str(&txt)
}

pub fn load_from_str(txt: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(txt)
        .map_err(|e| ProxyError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

fn is_word_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn is_path_segment(s: &str) -> bool {
    !s.is_empty() && !s.contains(['/', '?', '&', '#'])
}

pub fn validate_config(cfg: &Config) -> Result<()> {
    let origin: http::Uri = cfg.backend.origin.parse()?;
    if origin.scheme_str() != Some("http") {
        return Err(ProxyError::Config(format!(
            "Backend origin must use the http scheme: {}",
            cfg.backend.origin
        )));
    }
    if origin.authority().is_none() {
        return Err(ProxyError::Config(format!(
            "Backend origin has no host: {}",
            cfg.backend.origin
        )));
    }

    if let Some(tls) = &cfg.tls {
        if !Path::new(&tls.cert_path).exists() {
            return Err(ProxyError::Config(format!(
                "Certificate file not found: {}",
                tls.cert_path
            )));
        }
        if !Path::new(&tls.key_path).exists() {
            return Err(ProxyError::Config(format!("Key file not found: {}", tls.key_path)));
        }
    }

    let admission = &cfg.admission;
    if admission.interval_secs == 0 {
        return Err(ProxyError::Config("admission.interval_secs must be > 0".into()));
    }
    if admission.ceiling == 0 {
        return Err(ProxyError::Config("admission.ceiling must be > 0".into()));
    }
    if admission.base_limit == 0 {
        return Err(ProxyError::Config("admission.base_limit must be > 0".into()));
    }
    if admission.cache_capacity == 0 {
        return Err(ProxyError::Config("admission.cache_capacity must be > 0".into()));
    }

    let ingest = &cfg.ingest;
    if !is_path_segment(&ingest.prefix) || !is_path_segment(&ingest.endpoint) {
        return Err(ProxyError::Config(
            "ingest.prefix and ingest.endpoint must be single, non-empty path segments".into(),
        ));
    }
    if !is_word_token(&ingest.key_param) {
        return Err(ProxyError::Config(format!(
            "ingest.key_param must be a word token: {}",
            ingest.key_param
        )));
    }

    let mut seen = HashSet::new();
    for route in &cfg.remap.routes {
        if !is_word_token(&route.key) || !is_word_token(&route.target_key) {
            return Err(ProxyError::Config(format!(
                "Remap keys must be word tokens: {} -> {}",
                route.key, route.target_key
            )));
        }
        if !seen.insert((route.project_id, route.key.as_str())) {
            return Err(ProxyError::Config(format!(
                "Duplicate remap route for project {} key {}",
                route.project_id, route.key
            )));
        }
    }

    if cfg.timeout.connect_ms == 0 {
        return Err(ProxyError::Config("timeout.connect_ms must be > 0".into()));
    }
    if cfg.timeout.upstream_secs == 0 {
        return Err(ProxyError::Config("timeout.upstream_secs must be > 0".into()));
    }

    Ok(())
}
