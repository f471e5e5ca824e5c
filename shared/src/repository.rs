//! Requests against the report API and the mapping of their outcomes onto
//! [`AppError`]. Building and parsing are pure; the app drives the effects.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::capabilities::{
    ApiResult, BearerToken, FormPart, IdentityError, MultipartError, MultipartRequest,
    MultipartResult, ValidatedUrl,
};
use crate::config::ClientConfig;
use crate::model::{ReportId, ReportRecord};
use crate::upload::UploadSubmission;
use crate::{AppError, AppResult, ErrorKind, REPORTS_PATH, UPLOAD_PATH};

/// Body of a successful upload. Only the summary is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub ai_summary: Option<String>,
}

/// An authorized JSON call, sent through `crux_http`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    url: ValidatedUrl,
    token: BearerToken,
}

impl ApiCall {
    fn new(url: String, token: &BearerToken) -> AppResult<Self> {
        let url = ValidatedUrl::new(url).map_err(invalid_request)?;
        Ok(Self {
            url,
            token: token.clone(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token.expose())
    }
}

pub fn list_call(config: &ClientConfig, token: &BearerToken) -> AppResult<ApiCall> {
    ApiCall::new(config.endpoint(REPORTS_PATH), token)
}

pub fn delete_call(config: &ClientConfig, id: &ReportId, token: &BearerToken) -> AppResult<ApiCall> {
    if id.as_str().trim().is_empty() || id.as_str().contains('/') {
        return Err(AppError::new(ErrorKind::Validation, "Invalid report id")
            .with_context("report_id", id.as_str()));
    }
    ApiCall::new(config.endpoint(&format!("{REPORTS_PATH}{id}/")), token)
}

/// Multipart upload. No `Content-Type` header is set here; the shell adds
/// the multipart one with its boundary.
pub fn upload_request(
    config: &ClientConfig,
    token: &BearerToken,
    submission: &UploadSubmission,
) -> AppResult<MultipartRequest> {
    let parts = vec![
        FormPart::File {
            name: "original_file".to_string(),
            file: submission.file.clone(),
        },
        FormPart::Text {
            name: "report_type".to_string(),
            value: submission.report_type.as_str().to_string(),
        },
    ];

    MultipartRequest::post(config.endpoint(UPLOAD_PATH), parts)
        .and_then(|r| r.with_bearer(token.expose()))
        .and_then(|r| r.with_timeout_ms(config.upload_timeout_ms))
        .map_err(invalid_request)
}

pub fn parse_list_response(result: ApiResult) -> AppResult<Vec<ReportRecord>> {
    let body = api_body(result)?;
    let reports: Vec<ReportRecord> = serde_json::from_slice(&body).map_err(|e| {
        AppError::new(ErrorKind::Server, "Unexpected response from server")
            .with_internal(e.to_string())
    })?;
    debug!(count = reports.len(), "decoded report list");
    Ok(reports)
}

/// The delete endpoint answers 204 or 200 with an arbitrary body; only the
/// status matters.
pub fn parse_delete_response(result: ApiResult) -> AppResult<()> {
    api_body(result).map(|_| ())
}

/// A success without a JSON body still counts as a completed upload.
pub fn parse_upload_response(result: MultipartResult) -> AppResult<UploadReceipt> {
    let response = match result {
        Ok(response) if response.is_success() => response,
        Ok(response) => return Err(rejected(response.status_code(), response.body())),
        Err(e) => return Err(upload_error(&e)),
    };
    if response.body().is_empty() {
        return Ok(UploadReceipt::default());
    }
    Ok(serde_json::from_slice(response.body()).unwrap_or_else(|e| {
        warn!(error = %e, "upload response was not JSON");
        UploadReceipt::default()
    }))
}

/// Failing to mint a token means the request can never be authorized.
#[must_use]
pub fn token_error(error: &IdentityError) -> AppError {
    AppError::new(ErrorKind::Authentication, "Could not obtain an access token")
        .with_internal(error.to_string())
}

/// `crux_http` may hand a non-2xx back either as a response or as
/// `HttpError::Http`; both end up in the status mapping.
fn api_body(result: ApiResult) -> AppResult<Vec<u8>> {
    match result {
        Ok(mut response) => {
            let status = u16::from(response.status());
            let body = response.take_body().unwrap_or_default();
            if (200..300).contains(&status) {
                Ok(body)
            } else {
                Err(rejected(status, &body))
            }
        }
        Err(crux_http::Error::Http(http_error)) => Err(rejected(
            u16::from(http_error.code),
            http_error.body.as_deref().unwrap_or_default(),
        )),
        Err(e) => {
            warn!(error = %e, "request failed before a response");
            Err(AppError::new(ErrorKind::Network, "Network error").with_internal(e.to_string()))
        }
    }
}

fn rejected(status: u16, body: &[u8]) -> AppError {
    let error = AppError::from_http_status(status, Some(body));
    warn!(status, kind = error.code(), "request rejected");
    error
}

fn upload_error(error: &MultipartError) -> AppError {
    let kind = if error.is_transport() {
        ErrorKind::Network
    } else {
        ErrorKind::Validation
    };
    warn!(error = %error, "upload failed before a response");
    AppError::new(kind, "Network error").with_internal(error.to_string())
}

fn invalid_request(error: MultipartError) -> AppError {
    AppError::new(ErrorKind::Validation, "Could not build request").with_internal(error.to_string())
}
