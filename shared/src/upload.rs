use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{BearerToken, FileHandle};
use crate::model::ReportType;

pub const MSG_UPLOAD_SUCCEEDED: &str = "Report uploaded and processed successfully!";
pub const MSG_UPLOADING: &str = "Uploading...";

pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];
pub const ACCEPTED_CONTENT_TYPES: [&str; 4] =
    ["application/pdf", "image/jpeg", "image/jpg", "image/png"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadValidationError {
    #[error("Please select a file and report type.")]
    MissingInput,

    #[error("Unsupported file format. Please upload a PDF, JPG, JPEG or PNG file.")]
    UnsupportedFormat { name: String },

    #[error("File is too large. Maximum size is {max_mb}MB.")]
    TooLarge { size_bytes: u64, max_mb: u64 },

    #[error("Please log in first")]
    NotSignedIn,

    #[error("Invalid token format - not a valid JWT")]
    MalformedToken,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Succeeded {
        ai_summary: Option<String>,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadForm {
    pub file: Option<FileHandle>,
    pub report_type: Option<ReportType>,
    pub status: UploadStatus,
}

/// A validated submission, ready to be turned into a request once a token is
/// minted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSubmission {
    pub file: FileHandle,
    pub report_type: ReportType,
}

impl UploadForm {
    #[must_use]
    pub fn is_uploading(&self) -> bool {
        self.status == UploadStatus::Uploading
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.is_uploading() && self.file.is_some() && self.report_type.is_some()
    }

    pub fn select_file(&mut self, file: FileHandle) {
        self.file = Some(file);
    }

    pub fn clear_file(&mut self) {
        self.file = None;
    }

    pub fn select_report_type(&mut self, report_type: Option<ReportType>) {
        self.report_type = report_type.filter(|t| *t != ReportType::Unknown);
    }

    /// Checks the staged input. Does not change state.
    pub fn validate(&self, max_bytes: u64) -> Result<UploadSubmission, UploadValidationError> {
        let (Some(file), Some(report_type)) = (&self.file, self.report_type) else {
            return Err(UploadValidationError::MissingInput);
        };

        if !is_accepted_format(file) {
            return Err(UploadValidationError::UnsupportedFormat {
                name: file.name.clone(),
            });
        }

        if file.size_bytes > max_bytes {
            return Err(UploadValidationError::TooLarge {
                size_bytes: file.size_bytes,
                max_mb: max_bytes / (1024 * 1024),
            });
        }

        Ok(UploadSubmission {
            file: file.clone(),
            report_type,
        })
    }

    pub fn begin(&mut self) {
        self.status = UploadStatus::Uploading;
    }

    /// Success clears the staged input so the same file is not sent twice.
    pub fn succeed(&mut self, ai_summary: Option<String>) {
        self.file = None;
        self.report_type = None;
        self.status = UploadStatus::Succeeded { ai_summary };
    }

    pub fn fail(&mut self, reason: &str) {
        self.fail_with(format!("Upload failed: {reason}"));
    }

    /// Sets an already user-facing message as the failure status.
    pub fn fail_with(&mut self, message: String) {
        self.status = UploadStatus::Failed { message };
    }

    #[must_use]
    pub fn status_message(&self) -> Option<String> {
        match &self.status {
            UploadStatus::Idle => None,
            UploadStatus::Uploading => Some(MSG_UPLOADING.to_string()),
            UploadStatus::Succeeded { .. } => Some(MSG_UPLOAD_SUCCEEDED.to_string()),
            UploadStatus::Failed { message } => Some(message.clone()),
        }
    }
}

pub fn check_token(token: &BearerToken) -> Result<(), UploadValidationError> {
    if token.looks_like_jwt() {
        Ok(())
    } else {
        Err(UploadValidationError::MalformedToken)
    }
}

fn is_accepted_format(file: &FileHandle) -> bool {
    if let Some(content_type) = &file.content_type {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !essence.is_empty() {
            return ACCEPTED_CONTENT_TYPES.contains(&essence.as_str());
        }
    }

    file.name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
}
