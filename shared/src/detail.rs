use serde::{Deserialize, Serialize};

use crate::model::{ReportRecord, ReportType};
use crate::resolver::{resolve_file_url, ResolvedUrl};

pub const NO_REPORT_DATA: &str = "No report data available";
pub const NO_IMAGE: &str = "No image available for this report";
pub const IMAGE_LOAD_FAILED: &str = "Error loading image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageState {
    Loading,
    Loaded,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailContent {
    /// Opened without a record.
    NoRecord,
    /// A record was supplied but none of its file fields resolved.
    NoUsableUrl,
    Image {
        url: String,
        state: ImageState,
        /// Incremented on every retry. The shell echoes it back with the load
        /// result so a late answer for an older attempt can be told apart.
        attempt: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    pub label: String,
    pub value: String,
}

/// State of one open detail modal. A fresh instance is built on every open, so
/// nothing carries over between openings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailModal {
    pub content: DetailContent,
    pub metadata: Vec<MetadataField>,
    /// Page scroll-lock in effect before the modal opened; restored on close.
    pub prior_scroll_lock: bool,
}

impl DetailModal {
    #[must_use]
    pub fn open(record: Option<&ReportRecord>, fallback: Option<&str>, prior_scroll_lock: bool) -> Self {
        let Some(record) = record else {
            return Self {
                content: DetailContent::NoRecord,
                metadata: Vec::new(),
                prior_scroll_lock,
            };
        };

        let content = match resolve_file_url(record, fallback) {
            ResolvedUrl::Resolved(url) => DetailContent::Image {
                url,
                state: ImageState::Loading,
                attempt: 0,
            },
            ResolvedUrl::Unresolved => DetailContent::NoUsableUrl,
        };

        Self {
            content,
            metadata: metadata_for(record),
            prior_scroll_lock,
        }
    }

    /// Returns whether the state changed. Results for any attempt other than
    /// the current one are ignored.
    pub fn image_loaded(&mut self, for_attempt: u32) -> bool {
        self.settle(for_attempt, ImageState::Loaded)
    }

    pub fn image_failed(&mut self, for_attempt: u32) -> bool {
        self.settle(for_attempt, ImageState::Errored)
    }

    /// Only valid from `Errored`; anything else is a no-op.
    pub fn retry(&mut self) -> bool {
        match &mut self.content {
            DetailContent::Image { state, attempt, .. } if *state == ImageState::Errored => {
                *state = ImageState::Loading;
                *attempt = attempt.saturating_add(1);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn image_state(&self) -> Option<ImageState> {
        match &self.content {
            DetailContent::Image { state, .. } => Some(*state),
            _ => None,
        }
    }

    /// Link for opening the image directly, offered once loading has failed.
    #[must_use]
    pub fn original_url(&self) -> Option<&str> {
        match &self.content {
            DetailContent::Image {
                url,
                state: ImageState::Errored,
                ..
            } => Some(url),
            _ => None,
        }
    }

    #[must_use]
    pub fn empty_message(&self) -> Option<&'static str> {
        match self.content {
            DetailContent::NoRecord => Some(NO_REPORT_DATA),
            DetailContent::NoUsableUrl => Some(NO_IMAGE),
            DetailContent::Image { .. } => None,
        }
    }

    fn settle(&mut self, for_attempt: u32, to: ImageState) -> bool {
        match &mut self.content {
            DetailContent::Image { state, attempt, .. }
                if *attempt == for_attempt && *state == ImageState::Loading =>
            {
                *state = to;
                true
            }
            _ => false,
        }
    }
}

fn metadata_for(record: &ReportRecord) -> Vec<MetadataField> {
    let present = |value: Option<&str>| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    };

    let report_type = (record.report_type != ReportType::Unknown)
        .then(|| record.report_type.label().to_string());

    [
        ("Report Type", report_type),
        ("Report Date", present(record.report_date.as_deref())),
        ("Patient", record.patient_name()),
        ("Uploaded", present(record.created_at.as_deref())),
    ]
    .into_iter()
    .filter_map(|(label, value)| {
        value.map(|value| MetadataField {
            label: label.to_string(),
            value,
        })
    })
    .collect()
}
