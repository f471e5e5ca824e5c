use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{DEFAULT_API_BASE_URL, MAX_UPLOAD_BYTES, SESSION_SETTLE_DELAY_MS, UPLOAD_TIMEOUT_MS};

pub const MAX_SETTLE_DELAY_MS: u64 = 10_000;
pub const MAX_TIMEOUT_MS: u64 = 300_000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("settle delay {value}ms exceeds maximum of {max}ms")]
    SettleDelayTooLong { value: u64, max: u64 },

    #[error("upload timeout must be between 1 and {max}ms, got {value}")]
    InvalidUploadTimeout { value: u64, max: u64 },

    #[error("max upload size cannot be zero")]
    ZeroUploadLimit,
}

/// Shell-supplied settings. Everything has a working default so the core can
/// run before the shell sends `Event::Configure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Base for server-relative `original_file` paths. Falls back to
    /// `api_base_url`.
    pub media_base_url: Option<String>,
    /// Wait after a sign-in before the first fetch, so the provider has
    /// propagated the new token.
    pub session_settle_delay_ms: u64,
    /// JSON calls use the shell's `crux_http` timeout; only the upload,
    /// which can be slow on large scans, carries its own.
    pub upload_timeout_ms: u64,
    pub max_upload_bytes: u64,
    pub force_token_refresh: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            media_base_url: None,
            session_settle_delay_ms: SESSION_SETTLE_DELAY_MS,
            upload_timeout_ms: UPLOAD_TIMEOUT_MS,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            force_token_refresh: true,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_base(&self.api_base_url)?;
        if let Some(media) = &self.media_base_url {
            parse_base(media)?;
        }

        if self.session_settle_delay_ms > MAX_SETTLE_DELAY_MS {
            return Err(ConfigError::SettleDelayTooLong {
                value: self.session_settle_delay_ms,
                max: MAX_SETTLE_DELAY_MS,
            });
        }

        if self.upload_timeout_ms == 0 || self.upload_timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::InvalidUploadTimeout {
                value: self.upload_timeout_ms,
                max: MAX_TIMEOUT_MS,
            });
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::ZeroUploadLimit);
        }

        Ok(())
    }

    /// Joins an absolute API path (`/api/...`) onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        join(&self.api_base_url, path)
    }

    #[must_use]
    pub fn media_url(&self, path: &str) -> String {
        join(
            self.media_base_url.as_deref().unwrap_or(&self.api_base_url),
            path,
        )
    }
}

fn parse_base(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("base url cannot carry a query or fragment".to_string()));
    }
    Ok(url)
}

fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
