//! Check items and the options a batch is started with

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a queued check item, unique within one checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CheckItemId(pub u64);

impl fmt::Display for CheckItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Traffic-light quality rating reported by the checking service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityStatus {
    Green,
    Yellow,
    Red,
    #[serde(other)]
    Unknown,
}

impl QualityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityStatus::Green => "green",
            QualityStatus::Yellow => "yellow",
            QualityStatus::Red => "red",
            QualityStatus::Unknown => "unknown",
        }
    }
}

/// Report kinds a check can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportType {
    #[serde(rename = "scorecard")]
    Scorecard,
    #[serde(rename = "request_text")]
    RequestText,
}

impl ReportType {
    /// Parse the key the checking service uses in its `reports` map
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "scorecard" => Some(ReportType::Scorecard),
            "request_text" | "requestText" => Some(ReportType::RequestText),
            _ => None,
        }
    }
}

/// A link to a generated report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_authenticated: Option<String>,
}

impl Report {
    /// Prefer the authenticated link, which opens without a login prompt
    pub fn best_link(&self) -> &str {
        self.link_authenticated.as_deref().unwrap_or(&self.link)
    }
}

/// Progress of a single check item
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckItemState {
    /// Queued, not yet checked
    #[default]
    Pending,
    /// Checked successfully
    Checked {
        score: u32,
        status: QualityStatus,
        reports: BTreeMap<ReportType, Report>,
    },
    /// The check failed; `error` is shown to the user
    Failed { error: String },
}

/// A file queued for checking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckItem {
    pub id: CheckItemId,
    pub file: PathBuf,
    pub selected: bool,
    pub state: CheckItemState,
}

impl CheckItem {
    pub fn new(id: CheckItemId, file: impl Into<PathBuf>) -> Self {
        Self {
            id,
            file: file.into(),
            selected: true,
            state: CheckItemState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, CheckItemState::Pending)
    }

    /// Scorecard link, if the item has been checked and produced one
    pub fn scorecard(&self) -> Option<&Report> {
        match &self.state {
            CheckItemState::Checked { reports, .. } => reports.get(&ReportType::Scorecard),
            _ => None,
        }
    }
}

/// How the checking service should treat a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    #[default]
    Batch,
}

/// Options shared by every check of one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOptions {
    pub batch_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_profile_id: Option<String>,
    pub check_type: CheckType,
    pub report_types: Vec<ReportType>,
    pub disable_custom_field_validation: bool,
}

impl CheckOptions {
    /// Options for a fresh batch run with scorecard reports
    pub fn batch(guidance_profile_id: Option<String>) -> Self {
        Self {
            batch_id: new_batch_id(),
            guidance_profile_id,
            check_type: CheckType::Batch,
            report_types: vec![ReportType::RequestText, ReportType::Scorecard],
            disable_custom_field_validation: true,
        }
    }
}

/// Generate a batch id of the form `ac-<uuid>`
pub fn new_batch_id() -> String {
    format!("ac-{}", Uuid::new_v4())
}
