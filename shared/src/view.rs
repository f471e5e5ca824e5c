use serde::{Deserialize, Serialize};

use crate::detail::{DetailContent, ImageState, MetadataField, IMAGE_LOAD_FAILED};
use crate::model::{ListState, Model, ReportRecord, ReportType};
use crate::resolver::resolve_with_config;
use crate::summary::{format_summary, SummaryBlock};
use crate::upload::UploadStatus;
use crate::{ErrorScope, MSG_NEEDS_LOGIN};

pub const MSG_LOADING_REPORTS: &str = "Loading reports...";
pub const MSG_NO_REPORTS: &str = "No reports yet";
pub const MSG_CONFIRM_DELETE: &str = "Delete this report?";
pub const DATE_PLACEHOLDER: &str = "N/A";
pub const SUMMARY_TITLE: &str = "AI Summary";
pub const REPORT_MODAL_TITLE: &str = "Medical Report";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProfileView {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReportRow {
    pub id: String,
    pub report_date: String,
    pub report_type: String,
    pub has_summary: bool,
    /// False when no file field resolved; the shell disables the image button.
    pub image_available: bool,
    pub deleting: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ReportsView {
    Loading { message: String },
    AuthRequired { message: String },
    Errored { message: String, retry_enabled: bool },
    Empty { message: String },
    Loaded { rows: Vec<ReportRow> },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConfirmDeleteView {
    pub report_id: String,
    pub prompt: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SummaryModalView {
    pub title: String,
    pub report_type: Option<String>,
    pub report_date: Option<String>,
    pub blocks: Vec<SummaryBlock>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ReportModalBody {
    Empty { message: String },
    Image {
        url: String,
        attempt: u32,
        loading: bool,
    },
    ImageFailed {
        message: String,
        original_url: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReportModalView {
    pub title: String,
    pub body: ReportModalBody,
    pub metadata: Vec<MetadataField>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadFileView {
    pub name: String,
    /// Two decimals, e.g. "1.25 MB".
    pub size: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadView {
    pub file: Option<UploadFileView>,
    pub report_type: Option<ReportType>,
    pub uploading: bool,
    pub can_submit: bool,
    pub status: Option<String>,
    pub succeeded: bool,
    pub ai_summary: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ViewModel {
    pub authenticated: bool,
    pub sign_in_pending: bool,
    pub profile: Option<ProfileView>,
    pub reports: ReportsView,
    pub confirm_delete: Option<ConfirmDeleteView>,
    pub notice: Option<String>,
    pub summary_modal: Option<SummaryModalView>,
    pub report_modal: Option<ReportModalView>,
    pub upload: UploadView,
    pub page_scroll_locked: bool,
}

#[must_use]
pub fn build(model: &Model) -> ViewModel {
    ViewModel {
        authenticated: model.is_authenticated(),
        sign_in_pending: model.sign_in_pending,
        profile: model.session.as_ref().map(|s| ProfileView {
            display_name: s.display_name.clone(),
            email: s.email.clone(),
            photo_url: s.photo_url.clone(),
        }),
        reports: reports_view(model),
        confirm_delete: model
            .delete_confirmation
            .as_ref()
            .map(|id| ConfirmDeleteView {
                report_id: id.to_string(),
                prompt: MSG_CONFIRM_DELETE.to_string(),
            }),
        notice: model.notice.clone(),
        summary_modal: model.summary.as_ref().map(|s| SummaryModalView {
            title: SUMMARY_TITLE.to_string(),
            report_type: (s.report_type != ReportType::Unknown)
                .then(|| s.report_type.as_str().to_uppercase()),
            report_date: s.report_date.clone().filter(|d| !d.trim().is_empty()),
            blocks: format_summary(s.summary.as_deref()),
        }),
        report_modal: report_modal_view(model),
        upload: upload_view(model),
        page_scroll_locked: model.page_scroll_locked,
    }
}

fn reports_view(model: &Model) -> ReportsView {
    match &model.list {
        ListState::Idle | ListState::Loading => ReportsView::Loading {
            message: MSG_LOADING_REPORTS.to_string(),
        },
        ListState::Errored(e) => ReportsView::Errored {
            message: e.user_facing_message(ErrorScope::ListReports),
            retry_enabled: !model.is_fetching(),
        },
        ListState::Loaded(_) if model.auth_required => ReportsView::AuthRequired {
            message: MSG_NEEDS_LOGIN.to_string(),
        },
        ListState::Loaded(reports) if reports.is_empty() => ReportsView::Empty {
            message: MSG_NO_REPORTS.to_string(),
        },
        ListState::Loaded(reports) => ReportsView::Loaded {
            rows: reports.iter().map(|r| report_row(model, r)).collect(),
        },
    }
}

fn report_row(model: &Model, record: &ReportRecord) -> ReportRow {
    ReportRow {
        id: record.id.to_string(),
        report_date: record
            .report_date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DATE_PLACEHOLDER)
            .to_string(),
        report_type: record.report_type.label().to_string(),
        has_summary: record
            .ai_summary
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty()),
        image_available: resolve_with_config(record, &model.config).is_resolved(),
        deleting: model.deletes_in_flight.contains(&record.id),
    }
}

fn report_modal_view(model: &Model) -> Option<ReportModalView> {
    let modal = model.detail.as_ref()?;
    let body = match &modal.content {
        DetailContent::NoRecord | DetailContent::NoUsableUrl => ReportModalBody::Empty {
            message: modal.empty_message().unwrap_or_default().to_string(),
        },
        DetailContent::Image {
            url,
            state: ImageState::Errored,
            ..
        } => ReportModalBody::ImageFailed {
            message: IMAGE_LOAD_FAILED.to_string(),
            original_url: url.clone(),
        },
        DetailContent::Image {
            url,
            state,
            attempt,
        } => ReportModalBody::Image {
            url: url.clone(),
            attempt: *attempt,
            loading: *state == ImageState::Loading,
        },
    };

    Some(ReportModalView {
        title: REPORT_MODAL_TITLE.to_string(),
        body,
        metadata: modal.metadata.clone(),
    })
}

fn upload_view(model: &Model) -> UploadView {
    let form = &model.upload;
    let (succeeded, ai_summary) = match &form.status {
        UploadStatus::Succeeded { ai_summary } => (true, ai_summary.clone()),
        _ => (false, None),
    };

    UploadView {
        file: form.file.as_ref().map(|f| UploadFileView {
            name: f.name.clone(),
            size: format_megabytes(f.size_bytes),
        }),
        report_type: form.report_type,
        uploading: form.is_uploading(),
        can_submit: form.can_submit(),
        status: form.status_message(),
        succeeded,
        ai_summary,
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}
