use serde::{Deserialize, Serialize};

use crate::capabilities::{
    ApiResult, BearerToken, FileHandle, IdentityError, MultipartResult, SubscriptionId,
    TimerOutput,
};
use crate::config::ClientConfig;
use crate::model::{ReportId, ReportType, Session};

/// How the detail modal was asked to close. All three take the same path.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseTrigger {
    Button,
    Overlay,
    Escape,
}

pub type TokenResult = Result<BearerToken, IdentityError>;

// --- Event enum: capability responses boxed to keep it small ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Lifecycle
    Mounted,
    Unmounted,
    Configure(Box<ClientConfig>),

    // Session
    SessionSubscribed(Box<Result<(SubscriptionId, Option<Session>), IdentityError>>),
    /// Pushed by the shell whenever the provider reports a new auth state.
    SessionChanged(Option<Box<Session>>),
    SessionSettled {
        epoch: u64,
        output: TimerOutput,
    },
    SignInRequested,
    SignInCompleted(Box<Result<Session, IdentityError>>),
    SignOutRequested,
    SignOutCompleted(Result<(), IdentityError>),

    // Report list
    ListTokenMinted {
        epoch: u64,
        result: Box<TokenResult>,
    },
    #[serde(skip)]
    ReportsFetched {
        epoch: u64,
        result: Box<ApiResult>,
    },
    RetryRequested,
    RefreshRequested,

    // Delete flow
    DeleteRequested {
        id: ReportId,
    },
    DeleteConfirmed,
    DeleteCancelled,
    DeleteTokenMinted {
        id: ReportId,
        result: Box<TokenResult>,
    },
    #[serde(skip)]
    ReportDeleted {
        id: ReportId,
        result: Box<ApiResult>,
    },
    DismissNotice,

    // Summary modal
    ViewSummary {
        id: ReportId,
    },
    CloseSummary,

    // Detail modal
    SelectReport {
        id: ReportId,
    },
    /// Opens the detail modal for whatever is selected, possibly nothing.
    OpenReportModal,
    CloseReportModal {
        trigger: CloseTrigger,
    },
    KeyPressed {
        key: String,
    },
    ReportImageLoaded {
        attempt: u32,
    },
    ReportImageFailed {
        attempt: u32,
    },
    RetryReportImage,

    // Upload
    UploadFileSelected(Box<FileHandle>),
    UploadFileCleared,
    UploadReportTypeSelected(Option<ReportType>),
    UploadSubmitted,
    UploadTokenMinted(Box<TokenResult>),
    UploadCompleted(Box<MultipartResult>),
}

impl Event {
    /// Variant name for log fields. Never includes payloads, which may carry
    /// tokens or personal data.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Event::Mounted => "mounted",
            Event::Unmounted => "unmounted",
            Event::Configure(_) => "configure",
            Event::SessionSubscribed(_) => "session_subscribed",
            Event::SessionChanged(_) => "session_changed",
            Event::SessionSettled { .. } => "session_settled",
            Event::SignInRequested => "sign_in_requested",
            Event::SignInCompleted(_) => "sign_in_completed",
            Event::SignOutRequested => "sign_out_requested",
            Event::SignOutCompleted(_) => "sign_out_completed",
            Event::ListTokenMinted { .. } => "list_token_minted",
            Event::ReportsFetched { .. } => "reports_fetched",
            Event::RetryRequested => "retry_requested",
            Event::RefreshRequested => "refresh_requested",
            Event::DeleteRequested { .. } => "delete_requested",
            Event::DeleteConfirmed => "delete_confirmed",
            Event::DeleteCancelled => "delete_cancelled",
            Event::DeleteTokenMinted { .. } => "delete_token_minted",
            Event::ReportDeleted { .. } => "report_deleted",
            Event::DismissNotice => "dismiss_notice",
            Event::ViewSummary { .. } => "view_summary",
            Event::CloseSummary => "close_summary",
            Event::SelectReport { .. } => "select_report",
            Event::OpenReportModal => "open_report_modal",
            Event::CloseReportModal { .. } => "close_report_modal",
            Event::KeyPressed { .. } => "key_pressed",
            Event::ReportImageLoaded { .. } => "report_image_loaded",
            Event::ReportImageFailed { .. } => "report_image_failed",
            Event::RetryReportImage => "retry_report_image",
            Event::UploadFileSelected(_) => "upload_file_selected",
            Event::UploadFileCleared => "upload_file_cleared",
            Event::UploadReportTypeSelected(_) => "upload_report_type_selected",
            Event::UploadSubmitted => "upload_submitted",
            Event::UploadTokenMinted(_) => "upload_token_minted",
            Event::UploadCompleted(_) => "upload_completed",
        }
    }

    /// Events produced by the core's own effects rather than by the user.
    #[must_use]
    pub fn is_effect_result(&self) -> bool {
        matches!(
            self,
            Event::SessionSubscribed(_)
                | Event::SessionSettled { .. }
                | Event::SignInCompleted(_)
                | Event::SignOutCompleted(_)
                | Event::ListTokenMinted { .. }
                | Event::ReportsFetched { .. }
                | Event::DeleteTokenMinted { .. }
                | Event::ReportDeleted { .. }
                | Event::UploadTokenMinted(_)
                | Event::UploadCompleted(_)
        )
    }
}
