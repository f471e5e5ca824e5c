// lib.rs - Health report tracker core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod detail;
pub mod event;
pub mod model;
pub mod repository;
pub mod resolver;
pub mod summary;
pub mod upload;
pub mod view;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::ClientConfig;
pub use crux_core::App as CruxApp;
pub use event::Event;
pub use model::{ListState, Model, ReportId, ReportRecord, ReportType, Session};
pub use resolver::{resolve_file_url, ResolvedUrl};
pub use view::ViewModel;

pub const DEFAULT_API_BASE_URL: &str = "https://health-app-backend-v0.onrender.com";
pub const SESSION_SETTLE_DELAY_MS: u64 = 500;
pub const UPLOAD_TIMEOUT_MS: u64 = 120_000;
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const REPORTS_PATH: &str = "/api/reports/";
pub const UPLOAD_PATH: &str = "/api/upload/";

pub const MSG_AUTH_FAILED: &str = "Authentication failed. Please log in again.";
pub const MSG_FETCH_FAILED: &str = "Failed to fetch reports. Please try again.";
pub const MSG_DELETE_FAILED: &str = "Failed to delete report. Please try again.";
pub const MSG_NEEDS_LOGIN: &str = "Please log in to view reports.";
pub const MSG_LOGIN_FAILED: &str = "Login error. Try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// 401 from the API, or no token could be minted.
    Authentication,
    /// Transport-level failure: connection refused, DNS, timeout.
    Network,
    /// Any other non-2xx status, or a success body that did not decode.
    Server,
    /// Caller error; never surfaced to the user.
    Validation,
    /// The identity provider rejected an operation other than token minting.
    Identity,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Authentication => "AUTH_ERROR",
            Self::Network => "NETWORK_ERROR",
            Self::Server => "SERVER_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Identity => "IDENTITY_ERROR",
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }
}

/// Which user-visible operation an error belongs to. The same failure reads
/// differently on the list screen than it does after a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorScope {
    ListReports,
    DeleteReport,
    UploadReport,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
    pub http_status: Option<u16>,
    pub context: BTreeMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
            http_status: None,
            context: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Maps a non-2xx status. Only 401 is treated as an auth failure; every
    /// other status is a retry-eligible server error.
    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let kind = if status == 401 {
            ErrorKind::Authentication
        } else {
            ErrorKind::Server
        };

        let message = body
            .and_then(|b| serde_json::from_slice::<ApiErrorResponse>(b).ok())
            .and_then(ApiErrorResponse::into_message)
            .unwrap_or_else(|| format!("HTTP {status}"));

        Self::new(kind, message).with_status(status)
    }

    #[must_use]
    pub fn user_facing_message(&self, scope: ErrorScope) -> String {
        match (self.kind, scope) {
            (ErrorKind::Authentication, _) => MSG_AUTH_FAILED.into(),
            (_, ErrorScope::ListReports) => MSG_FETCH_FAILED.into(),
            (_, ErrorScope::DeleteReport) => MSG_DELETE_FAILED.into(),
            (_, ErrorScope::UploadReport) => format!("Upload failed: {}", self.message),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

/// Error envelope. The upload endpoint uses `error`, other endpoints `detail`
/// or `message`.
#[derive(Debug, Clone, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorResponse {
    fn into_message(self) -> Option<String> {
        self.error
            .or(self.detail)
            .or(self.message)
            .filter(|m| !m.trim().is_empty())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_401_is_authentication() {
        assert_eq!(AppError::from_http_status(401, None).kind, ErrorKind::Authentication);
        assert_eq!(AppError::from_http_status(403, None).kind, ErrorKind::Server);
        assert_eq!(AppError::from_http_status(500, None).kind, ErrorKind::Server);
    }

    #[test]
    fn status_message_prefers_error_body() {
        let err = AppError::from_http_status(400, Some(br#"{"error":"File too large"}"#.as_slice()));
        assert_eq!(err.message, "File too large");
        assert_eq!(err.http_status, Some(400));

        let err = AppError::from_http_status(502, Some(b"<html>bad gateway</html>".as_slice()));
        assert_eq!(err.message, "HTTP 502");
    }

    #[test]
    fn user_messages_per_operation() {
        let auth = AppError::from_http_status(401, None);
        let server = AppError::from_http_status(500, None);

        assert_eq!(auth.user_facing_message(ErrorScope::ListReports), MSG_AUTH_FAILED);
        assert_eq!(auth.user_facing_message(ErrorScope::DeleteReport), MSG_AUTH_FAILED);
        assert_eq!(server.user_facing_message(ErrorScope::ListReports), MSG_FETCH_FAILED);
        assert_eq!(server.user_facing_message(ErrorScope::DeleteReport), MSG_DELETE_FAILED);
        assert_eq!(
            server.user_facing_message(ErrorScope::UploadReport),
            "Upload failed: HTTP 500"
        );
    }

    #[test]
    fn retryable_kinds() {
        assert!(ErrorKind::Network.is_retryable());
        assert!(ErrorKind::Server.is_retryable());
        assert!(!ErrorKind::Authentication.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
    }

    #[test]
    fn display_includes_internal() {
        let err = AppError::new(ErrorKind::Network, "Network error").with_internal("refused");
        assert_eq!(err.to_string(), "[NETWORK_ERROR] Network error (internal: refused)");
    }
}
