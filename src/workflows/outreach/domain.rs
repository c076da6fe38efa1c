use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for authored sequences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceId(pub String);

/// Identifier wrapper for candidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

/// Identifier for a local enrollment record, derived from the pair it joins.
/// Re-enrolling the same pair produces the same id, superseding the old
/// record in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrollmentId(pub String);

impl EnrollmentId {
    pub fn derive(candidate: &CandidateId, sequence: &SequenceId) -> Self {
        Self(format!("{}-{}", candidate.0, sequence.0))
    }
}

/// Opaque run identifier issued by the automation service on invoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunId(pub String);

/// Opaque credential authorizing cancellation of one automation run. Minted
/// locally, once per enroll call, and stable for the life of the enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationToken(pub String);

/// A candidate as the dashboard knows them. `status`, `progress`, and
/// `sequence` are display-only mirrors; once enrolled, the automation
/// service owns the authoritative state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub sequence: Option<String>,
}

impl Candidate {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or_default()
    }

    pub fn last_name(&self) -> String {
        self.name
            .split_whitespace()
            .skip(1)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Units the authoring surface may attach to a step delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelayUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl DelayUnit {
    const fn singular(self) -> &'static str {
        match self {
            DelayUnit::Minutes => "minute",
            DelayUnit::Hours => "hour",
            DelayUnit::Days => "day",
            DelayUnit::Weeks => "week",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "minute" | "minutes" => Some(DelayUnit::Minutes),
            "hour" | "hours" => Some(DelayUnit::Hours),
            "day" | "days" => Some(DelayUnit::Days),
            "week" | "weeks" => Some(DelayUnit::Weeks),
            _ => None,
        }
    }
}

/// A wait period between two sequence steps, normalized at the boundary so
/// that only well-formed durations ever reach a compiled program.
///
/// The wire form is the automation service's free-text spelling
/// (`"2 days"`, `"1 week"`); parsing rejects anything that does not match
/// and zero-valued waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDelay {
    pub value: u32,
    pub unit: DelayUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized delay '{0}': expected a count and unit such as \"2 days\" or \"1 week\"")]
pub struct DelayParseError(String);

impl FromStr for StepDelay {
    type Err = DelayParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.split_whitespace();
        let (Some(value), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(DelayParseError(raw.to_string()));
        };

        let value: u32 = value.parse().map_err(|_| DelayParseError(raw.to_string()))?;
        if value == 0 {
            return Err(DelayParseError(raw.to_string()));
        }
        let unit = DelayUnit::parse(&unit.to_ascii_lowercase())
            .ok_or_else(|| DelayParseError(raw.to_string()))?;

        Ok(Self { value, unit })
    }
}

impl fmt::Display for StepDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.value == 1 { "" } else { "s" };
        write!(f, "{} {}{}", self.value, self.unit.singular(), plural)
    }
}

impl Serialize for StepDelay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StepDelay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One step of an outreach sequence.
///
/// `delay` is meaningful only for steps after the first; the first step fires
/// as soon as the sequence starts regardless of this field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub id: u32,
    pub email_template: String,
    #[serde(default)]
    pub delay: Option<StepDelay>,
    #[serde(default)]
    pub check_status: bool,
}

/// An ordered outreach sequence as authored in the dashboard. Step order is
/// execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDefinition {
    pub id: SequenceId,
    pub name: String,
    pub steps: Vec<SequenceStep>,
}

/// Local mirror of a remote run's state, authoritative only until the next
/// status refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Cancelled,
    Error,
}

impl EnrollmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Cancelled => "cancelled",
            EnrollmentStatus::Error => "error",
        }
    }

    /// Map a status string reported by the automation service into the local
    /// enum. Returns `None` for vocabulary this service does not recognize;
    /// callers decide what an unknown value means (the lifecycle service
    /// forces such records into [`EnrollmentStatus::Error`]).
    pub fn from_remote(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" | "running" => Some(EnrollmentStatus::Active),
            "completed" | "complete" => Some(EnrollmentStatus::Completed),
            "cancelled" | "canceled" => Some(EnrollmentStatus::Cancelled),
            "error" | "failed" => Some(EnrollmentStatus::Error),
            _ => None,
        }
    }
}

/// An enrollment record tying one candidate to one sequence run. Created
/// exactly once per successful enroll call; a re-enrollment of the same pair
/// stores a fresh record (new run id, new token) under the same derived id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub candidate_id: CandidateId,
    pub sequence_id: SequenceId,
    pub candidate_name: String,
    pub sequence_name: String,
    pub start_date: NaiveDate,
    pub run_id: RunId,
    pub cancellation_token: CancellationToken,
    pub status: EnrollmentStatus,
}
