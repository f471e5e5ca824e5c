use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::capabilities::{SubscriptionId, TimerId};
use crate::config::ClientConfig;
use crate::detail::DetailModal;
use crate::upload::UploadForm;
use crate::AppError;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(UserId);

/// Server-assigned report id. The API has sent both integers and strings, so
/// both decode; the canonical form is the string.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "RawReportId")]
pub struct ReportId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawReportId {
    Number(u64),
    Text(String),
}

impl From<RawReportId> for ReportId {
    fn from(raw: RawReportId) -> Self {
        match raw {
            RawReportId::Number(n) => Self(n.to_string()),
            RawReportId::Text(s) => Self(s),
        }
    }
}

impl ReportId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated user as reported by the identity provider. The bearer token
/// is deliberately absent: it is minted per request and never kept.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[serde(alias = "LAB", alias = "Lab")]
    Lab,
    #[serde(alias = "CT", alias = "Ct")]
    Ct,
    #[serde(alias = "MRI", alias = "Mri")]
    Mri,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ReportType {
    /// Wire value for the upload form field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lab => "lab",
            Self::Ct => "ct",
            Self::Mri => "mri",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Lab => "Lab",
            Self::Ct => "CT",
            Self::Mri => "MRI",
            Self::Unknown => "Unknown",
        }
    }
}

impl FromStr for ReportType {
    type Err = UnknownReportType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lab" => Ok(Self::Lab),
            "ct" => Ok(Self::Ct),
            "mri" => Ok(Self::Mri),
            _ => Err(UnknownReportType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown report type '{0}'")]
pub struct UnknownReportType(pub String);

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One uploaded report as returned by `GET /api/reports/`.
///
/// The file reference arrives under several names depending on which backend
/// revision produced the record; all of them are kept and
/// [`crate::resolver::resolve_file_url`] picks one. Non-string values in those
/// slots are dropped rather than failing the whole list.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReportRecord {
    pub id: ReportId,
    #[serde(default, alias = "reportType", deserialize_with = "lenient_report_type")]
    pub report_type: ReportType,
    #[serde(default, alias = "reportDate", deserialize_with = "lenient_string")]
    pub report_date: Option<String>,
    #[serde(default, alias = "createdAt", deserialize_with = "lenient_string")]
    pub created_at: Option<String>,

    #[serde(default, alias = "fileUrl", deserialize_with = "lenient_string")]
    pub file_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub file: Option<String>,
    #[serde(default, alias = "imageUrl", deserialize_with = "lenient_string")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    /// Server-relative upload path, e.g. `/media/reports/scan.png`.
    #[serde(default, alias = "originalFile", deserialize_with = "lenient_string")]
    pub original_file: Option<String>,

    #[serde(default, alias = "aiSummary", deserialize_with = "lenient_string")]
    pub ai_summary: Option<String>,
    #[serde(default, alias = "firstName", deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName", deserialize_with = "lenient_string")]
    pub last_name: Option<String>,
}

impl ReportRecord {
    pub fn new(id: ReportId, report_type: ReportType) -> Self {
        Self {
            id,
            report_type,
            report_date: None,
            created_at: None,
            file_url: None,
            file: None,
            image_url: None,
            url: None,
            original_file: None,
            ai_summary: None,
            first_name: None,
            last_name: None,
        }
    }

    #[must_use]
    pub fn patient_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Null, numbers and unrecognised names all become `Unknown`.
fn lenient_report_type<'de, D>(deserializer: D) -> Result<ReportType, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

/// List lifecycle exposed to the UI.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum ListState {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<ReportRecord>),
    Errored(AppError),
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Unmounted,
    /// Subscribe sent, provider has not answered yet.
    Mounting,
    Mounted {
        subscription: SubscriptionId,
    },
    TornDown,
}

/// Snapshot copied out of a record when its summary is opened, so the modal
/// keeps showing it even if the list is refetched underneath.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SummarySelection {
    pub summary: Option<String>,
    pub report_type: ReportType,
    pub report_date: Option<String>,
}

impl From<&ReportRecord> for SummarySelection {
    fn from(record: &ReportRecord) -> Self {
        Self {
            summary: record.ai_summary.clone(),
            report_type: record.report_type,
            report_date: record.report_date.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Model {
    pub config: ClientConfig,
    pub lifecycle: Lifecycle,

    pub session: Option<Session>,
    /// Bumped on every session change. Timers and fetches carry the epoch they
    /// were started under and are dropped when it no longer matches.
    pub session_epoch: u64,
    pub settle_timer: Option<TimerId>,
    pub auth_required: bool,
    pub sign_in_pending: bool,

    pub list: ListState,
    /// Epoch of the fetch currently in flight, if any.
    pub fetch_in_flight: Option<u64>,

    pub delete_confirmation: Option<ReportId>,
    pub deletes_in_flight: BTreeSet<ReportId>,
    /// One-shot message (alert); cleared by `DismissNotice`.
    pub notice: Option<String>,

    pub summary: Option<SummarySelection>,
    pub detail_selection: Option<ReportRecord>,
    pub detail: Option<DetailModal>,
    pub page_scroll_locked: bool,

    pub upload: UploadForm,
}

impl Model {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.lifecycle == Lifecycle::TornDown
    }

    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.fetch_in_flight.is_some()
    }

    #[must_use]
    pub fn reports(&self) -> &[ReportRecord] {
        match &self.list {
            ListState::Loaded(reports) => reports,
            _ => &[],
        }
    }

    #[must_use]
    pub fn find_report(&self, id: &ReportId) -> Option<&ReportRecord> {
        self.reports().iter().find(|r| &r.id == id)
    }

    /// Removes a report from a loaded list. Returns false when the list is not
    /// loaded or the id is absent.
    pub fn remove_report(&mut self, id: &ReportId) -> bool {
        match &mut self.list {
            ListState::Loaded(reports) => {
                let before = reports.len();
                reports.retain(|r| &r.id != id);
                reports.len() != before
            }
            _ => false,
        }
    }

    pub fn set_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }
}
