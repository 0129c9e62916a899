//! Election data model
//!
//! Snapshots as served by the backend. Timestamps are kept as the backend's
//! local date-time strings; the client never does arithmetic on them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Election lifecycle status, in lifecycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    Created,
    CandidatesImported,
    Started,
    Closed,
    ResultsPublished,
}

impl ElectionStatus {
    pub const ALL: [ElectionStatus; 5] = [
        ElectionStatus::Created,
        ElectionStatus::CandidatesImported,
        ElectionStatus::Started,
        ElectionStatus::Closed,
        ElectionStatus::ResultsPublished,
    ];

    /// Wire name, also used in `/elections/status/{status}`
    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionStatus::Created => "CREATED",
            ElectionStatus::CandidatesImported => "CANDIDATES_IMPORTED",
            ElectionStatus::Started => "STARTED",
            ElectionStatus::Closed => "CLOSED",
            ElectionStatus::ResultsPublished => "RESULTS_PUBLISHED",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ElectionStatus::Created => "Created",
            ElectionStatus::CandidatesImported => "Candidates Imported",
            ElectionStatus::Started => "Active",
            ElectionStatus::Closed => "Closed",
            ElectionStatus::ResultsPublished => "Results Published",
        }
    }

    /// Whether `action` is legal from this status. Advisory only; the
    /// backend has the final word.
    pub fn permits(&self, action: LifecycleAction) -> bool {
        *self == action.required_status()
    }

    pub fn is_terminal(&self) -> bool {
        *self == ElectionStatus::ResultsPublished
    }

    /// Whether the ledger holds data for an election in this status
    pub fn has_ledger(&self) -> bool {
        matches!(self, ElectionStatus::Started | ElectionStatus::Closed)
    }
}

impl fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElectionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('-', "_").to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| Error::Validation(format!("Unknown election status: {}", s)))
    }
}

/// Client-issued lifecycle transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    ImportCandidates,
    Start,
    Close,
}

impl LifecycleAction {
    pub const ALL: [LifecycleAction; 3] = [
        LifecycleAction::ImportCandidates,
        LifecycleAction::Start,
        LifecycleAction::Close,
    ];

    pub fn required_status(&self) -> ElectionStatus {
        match self {
            LifecycleAction::ImportCandidates => ElectionStatus::Created,
            LifecycleAction::Start => ElectionStatus::CandidatesImported,
            LifecycleAction::Close => ElectionStatus::Started,
        }
    }

    pub fn resulting_status(&self) -> ElectionStatus {
        match self {
            LifecycleAction::ImportCandidates => ElectionStatus::CandidatesImported,
            LifecycleAction::Start => ElectionStatus::Started,
            LifecycleAction::Close => ElectionStatus::Closed,
        }
    }

    /// Last path segment of the transition endpoint
    pub(crate) fn endpoint(&self) -> &'static str {
        match self {
            LifecycleAction::ImportCandidates => "import-candidates",
            LifecycleAction::Start => "start",
            LifecycleAction::Close => "close",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::ImportCandidates => write!(f, "import candidates"),
            LifecycleAction::Start => write!(f, "start"),
            LifecycleAction::Close => write!(f, "close"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionType {
    Parliamentary,
    LocalGovernment,
}

impl ElectionType {
    pub fn label(&self) -> &'static str {
        match self {
            ElectionType::Parliamentary => "Parliamentary",
            ElectionType::LocalGovernment => "Local Government",
        }
    }
}

impl FromStr for ElectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().replace('-', "_").to_ascii_uppercase().as_str() {
            "PARLIAMENTARY" => Ok(ElectionType::Parliamentary),
            "LOCAL_GOVERNMENT" | "LOCAL" => Ok(ElectionType::LocalGovernment),
            _ => Err(Error::Validation(format!("Unknown election type: {}", s))),
        }
    }
}

/// Party contesting an election
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: String,
    #[serde(rename = "partyCode")]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub leader: Option<String>,
    #[serde(default)]
    pub list_number: Option<u32>,
    #[serde(default)]
    pub candidate_count: u32,
}

/// Candidate on a party list or running independently
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub full_name: String,
    #[serde(default)]
    pub party_id: Option<String>,
    #[serde(default)]
    pub party_code: Option<String>,
    #[serde(default)]
    pub party_name: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub county_name: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub municipality_name: Option<String>,
    #[serde(default)]
    pub position_in_list: Option<u32>,
    #[serde(default)]
    pub independent: bool,
}

/// Election snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Election {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub election_type: Option<ElectionType>,
    pub status: ElectionStatus,
    pub election_date: String,
    pub registration_deadline: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub total_eligible_voters: u64,
    #[serde(default)]
    pub total_votes_cast: u64,
    /// Pre-computed by the backend when present
    #[serde(default)]
    pub turnout_percentage: Option<f64>,
    #[serde(default)]
    pub candidates_imported: bool,
    #[serde(default)]
    pub candidate_count: u32,
    #[serde(default)]
    pub party_count: u32,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub parties: Vec<Party>,
    /// Only present on detail responses
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
}

impl Election {
    /// Turnout, preferring the backend's figure
    pub fn turnout(&self) -> Turnout {
        if self.total_eligible_voters == 0 {
            return Turnout::Unavailable;
        }
        match self.turnout_percentage {
            Some(percent) if percent.is_finite() => Turnout::Percent(percent),
            _ => compute_turnout(self.total_votes_cast, self.total_eligible_voters),
        }
    }

    /// Actions legal from the current status
    pub fn available_actions(&self) -> Vec<LifecycleAction> {
        LifecycleAction::ALL
            .into_iter()
            .filter(|action| self.status.permits(*action))
            .collect()
    }
}

/// Derived turnout
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Turnout {
    Percent(f64),
    /// No eligible voters on record
    Unavailable,
}

impl Turnout {
    pub fn percent(&self) -> Option<f64> {
        match self {
            Turnout::Percent(p) => Some(*p),
            Turnout::Unavailable => None,
        }
    }
}

impl fmt::Display for Turnout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Turnout::Percent(p) => write!(f, "{:.1}%", p),
            Turnout::Unavailable => f.write_str("—"),
        }
    }
}

pub fn compute_turnout(votes_cast: u64, eligible_voters: u64) -> Turnout {
    if eligible_voters == 0 {
        return Turnout::Unavailable;
    }
    Turnout::Percent(votes_cast as f64 * 100.0 / eligible_voters as f64)
}

/// One page of a paged listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
    /// Zero-based page index
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.number + 1 >= self.total_pages
    }
}

/// Body of `POST /elections`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewElection {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub election_type: ElectionType,
    pub election_date: String,
    pub registration_deadline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_data_source: Option<String>,
}

impl NewElection {
    /// Required-field checks only
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("name is required".to_string()));
        }
        if self.election_date.trim().is_empty() {
            return Err(Error::Validation("election date is required".to_string()));
        }
        if self.registration_deadline.trim().is_empty() {
            return Err(Error::Validation("registration deadline is required".to_string()));
        }
        Ok(())
    }
}
