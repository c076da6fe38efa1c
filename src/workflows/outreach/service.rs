use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::warn;

use super::compiler::{SequenceCompiler, ValidationError};
use super::courier::{AutomationGateway, TransportError};
use super::domain::{
    Candidate, CandidateId, CancellationToken, Enrollment, EnrollmentId, EnrollmentStatus,
    SequenceDefinition, SequenceId,
};
use super::repository::{EnrollmentRepository, RepositoryError};

/// Service composing the compiler, automation gateway, and enrollment store.
/// Each operation performs at most one outbound call and never retries;
/// operations on distinct enrollments may run concurrently.
pub struct EnrollmentService<G, R> {
    compiler: SequenceCompiler,
    gateway: Arc<G>,
    repository: Arc<R>,
}

static TOKEN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Mint the one canonical cancellation token for an enroll call. The
/// process-wide serial keeps tokens unique even when the same pair is
/// re-enrolled back to back.
fn next_cancellation_token(sequence: &SequenceId, candidate: &CandidateId) -> CancellationToken {
    let serial = TOKEN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CancellationToken(format!("run-{}-{}-{serial:06}", sequence.0, candidate.0))
}

impl<G, R> EnrollmentService<G, R>
where
    G: AutomationGateway + 'static,
    R: EnrollmentRepository + 'static,
{
    pub fn new(compiler: SequenceCompiler, gateway: Arc<G>, repository: Arc<R>) -> Self {
        Self {
            compiler,
            gateway,
            repository,
        }
    }

    /// Enroll a candidate into a sequence starting on `start_date`.
    pub async fn enroll(
        &self,
        candidate: &Candidate,
        sequence: &SequenceDefinition,
        start_date: NaiveDate,
    ) -> Result<Enrollment, EnrollmentError> {
        self.enroll_as_of(candidate, sequence, start_date, Local::now().date_naive())
            .await
    }

    /// Enroll with an explicit "today" for the start-date check. Compilation
    /// (and therefore validation) happens before any network interaction; on
    /// any failure no record is created.
    pub async fn enroll_as_of(
        &self,
        candidate: &Candidate,
        sequence: &SequenceDefinition,
        start_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Enrollment, EnrollmentError> {
        if start_date < today {
            return Err(EnrollmentError::StartDateInPast {
                requested: start_date,
                today,
            });
        }

        let token = next_cancellation_token(&sequence.id, &candidate.id);
        let program = self
            .compiler
            .compile(sequence, candidate, start_date, &token)?;
        let run_id = self.gateway.invoke(&program).await?;

        let enrollment = Enrollment {
            id: EnrollmentId::derive(&candidate.id, &sequence.id),
            candidate_id: candidate.id.clone(),
            sequence_id: sequence.id.clone(),
            candidate_name: candidate.name.clone(),
            sequence_name: sequence.name.clone(),
            start_date,
            run_id,
            cancellation_token: token,
            status: EnrollmentStatus::Active,
        };

        Ok(self.repository.upsert(enrollment)?)
    }

    /// Cancel an active enrollment's remote run. Anything other than an
    /// active record is a state error and leaves the record untouched, as
    /// does a failed cancel call.
    pub async fn cancel(&self, id: &EnrollmentId) -> Result<Enrollment, EnrollmentError> {
        let mut enrollment = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        if enrollment.status != EnrollmentStatus::Active {
            return Err(EnrollmentError::InvalidState {
                current: enrollment.status,
            });
        }

        self.gateway.cancel(&enrollment.cancellation_token).await?;

        enrollment.status = EnrollmentStatus::Cancelled;
        Ok(self.repository.upsert(enrollment)?)
    }

    /// Refresh the local status mirror from the automation service.
    /// Unrecognized remote vocabulary forces the record into the error
    /// state rather than surfacing an exception; a failed status call leaves
    /// the record untouched.
    pub async fn refresh_status(&self, id: &EnrollmentId) -> Result<Enrollment, EnrollmentError> {
        let mut enrollment = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        let remote = self.gateway.run_status(&enrollment.run_id).await?;
        enrollment.status = match EnrollmentStatus::from_remote(&remote) {
            Some(status) => status,
            None => {
                warn!(
                    run_id = %enrollment.run_id.0,
                    remote = %remote,
                    "unrecognized automation run status"
                );
                EnrollmentStatus::Error
            }
        };

        Ok(self.repository.upsert(enrollment)?)
    }

    /// Fetch the local record without touching the automation service.
    pub fn get(&self, id: &EnrollmentId) -> Result<Enrollment, EnrollmentError> {
        Ok(self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    /// Every enrollment this process knows about, for the dashboard listing.
    pub fn enrollments(&self) -> Result<Vec<Enrollment>, EnrollmentError> {
        Ok(self.repository.list()?)
    }
}

/// Error raised by the enrollment lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("start date {requested} is before {today}")]
    StartDateInPast {
        requested: NaiveDate,
        today: NaiveDate,
    },
    #[error("enrollment is {}, expected an active run", .current.label())]
    InvalidState { current: EnrollmentStatus },
}
