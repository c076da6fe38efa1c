use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{CandidateId, Enrollment, EnrollmentId, RunId, SequenceId};

/// Storage abstraction so the lifecycle service can be exercised in
/// isolation. The store only ever holds the latest record per enrollment id;
/// re-enrollments supersede, nothing is deleted.
pub trait EnrollmentRepository: Send + Sync {
    fn upsert(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError>;
    fn fetch(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, RepositoryError>;
    fn list(&self) -> Result<Vec<Enrollment>, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("enrollment not found")]
    NotFound,
    #[error("enrollment store unavailable: {0}")]
    Unavailable(String),
}

/// Caller-owned in-memory enrollment mapping. One per process; the three
/// lifecycle operations are its only writers.
#[derive(Debug, Default)]
pub struct InMemoryEnrollmentStore {
    records: Mutex<HashMap<EnrollmentId, Enrollment>>,
}

impl EnrollmentRepository for InMemoryEnrollmentStore {
    fn upsert(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("enrollment store poisoned".to_string()))?;
        guard.insert(enrollment.id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    fn fetch(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("enrollment store poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Enrollment>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("enrollment store poisoned".to_string()))?;
        let mut enrollments: Vec<Enrollment> = guard.values().cloned().collect();
        enrollments.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(enrollments)
    }
}

/// Sanitized representation of an enrollment for API responses. The
/// cancellation token never leaves the process; cancellation goes through
/// the service by enrollment id.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentView {
    pub id: EnrollmentId,
    pub candidate_id: CandidateId,
    pub sequence_id: SequenceId,
    pub candidate_name: String,
    pub sequence_name: String,
    pub start_date: NaiveDate,
    pub run_id: RunId,
    pub status: &'static str,
}

impl Enrollment {
    pub fn status_view(&self) -> EnrollmentView {
        EnrollmentView {
            id: self.id.clone(),
            candidate_id: self.candidate_id.clone(),
            sequence_id: self.sequence_id.clone(),
            candidate_name: self.candidate_name.clone(),
            sequence_name: self.sequence_name.clone(),
            start_date: self.start_date,
            run_id: self.run_id.clone(),
            status: self.status.label(),
        }
    }
}
