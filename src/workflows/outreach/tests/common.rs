use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::config::OutreachConfig;
use crate::workflows::outreach::compiler::SequenceCompiler;
use crate::workflows::outreach::courier::{AutomationGateway, GatewayOperation, TransportError};
use crate::workflows::outreach::domain::{
    Candidate, CandidateId, CancellationToken, DelayUnit, RunId, SequenceDefinition, SequenceId,
    SequenceStep, StepDelay,
};
use crate::workflows::outreach::program::{AutomationProgram, DelayTiming, Instruction};
use crate::workflows::outreach::repository::InMemoryEnrollmentStore;
use crate::workflows::outreach::service::EnrollmentService;

pub(super) fn outreach_config() -> OutreachConfig {
    OutreachConfig {
        company_name: "Northwind Labs".to_string(),
        status_webhook_base: "https://api.recruitflow.io".to_string(),
        webhook_authorization: Some("Bearer {{env.RECRUIT_API_KEY}}".to_string()),
    }
}

pub(super) fn compiler() -> SequenceCompiler {
    SequenceCompiler::new(&outreach_config())
}

pub(super) fn candidate() -> Candidate {
    Candidate {
        id: CandidateId("c-100".to_string()),
        name: "Alex Johnson".to_string(),
        email: "alex@example.com".to_string(),
        position: None,
        status: Some("active".to_string()),
        progress: Some(0),
        sequence: None,
    }
}

pub(super) fn step(
    id: u32,
    template: &str,
    delay: Option<StepDelay>,
    check_status: bool,
) -> SequenceStep {
    SequenceStep {
        id,
        email_template: template.to_string(),
        delay,
        check_status,
    }
}

pub(super) fn days(value: u32) -> Option<StepDelay> {
    Some(StepDelay {
        value,
        unit: DelayUnit::Days,
    })
}

pub(super) fn welcome_sequence() -> SequenceDefinition {
    SequenceDefinition {
        id: SequenceId("seq-welcome".to_string()),
        name: "Welcome".to_string(),
        steps: vec![step(1, "Welcome Email", None, false)],
    }
}

pub(super) fn pipeline_sequence() -> SequenceDefinition {
    SequenceDefinition {
        id: SequenceId("seq-pipeline".to_string()),
        name: "Product Team Welcome Series".to_string(),
        steps: vec![
            step(1, "A", None, false),
            step(2, "B", days(2), true),
        ],
    }
}

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 20).expect("valid date")
}

pub(super) fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub(super) fn token() -> CancellationToken {
    CancellationToken("run-seq-pipeline-c-100-000001".to_string())
}

/// Compact view of a program's instruction stream for ordering asserts.
pub(super) fn action_names(program: &AutomationProgram) -> Vec<&'static str> {
    program
        .steps
        .iter()
        .map(|instruction| match instruction {
            Instruction::Delay(DelayTiming::Until { .. }) => "delay-until",
            Instruction::Delay(DelayTiming::Duration { .. }) => "delay",
            Instruction::Cancel { .. } => "cancel",
            Instruction::FetchData { .. } => "fetch-data",
            Instruction::Send { .. } => "send",
        })
        .collect()
}

#[derive(Default)]
pub(super) struct RecordingGateway {
    invocations: Mutex<Vec<AutomationProgram>>,
    cancelled: Mutex<Vec<CancellationToken>>,
    remote_status: Mutex<Option<String>>,
    run_serial: AtomicU64,
}

impl RecordingGateway {
    pub(super) fn invocations(&self) -> Vec<AutomationProgram> {
        self.invocations.lock().expect("gateway mutex poisoned").clone()
    }

    pub(super) fn cancelled(&self) -> Vec<CancellationToken> {
        self.cancelled.lock().expect("gateway mutex poisoned").clone()
    }

    pub(super) fn set_remote_status(&self, status: &str) {
        *self.remote_status.lock().expect("gateway mutex poisoned") = Some(status.to_string());
    }
}

#[async_trait]
impl AutomationGateway for RecordingGateway {
    async fn invoke(&self, program: &AutomationProgram) -> Result<RunId, TransportError> {
        self.invocations
            .lock()
            .expect("gateway mutex poisoned")
            .push(program.clone());
        let serial = self.run_serial.fetch_add(1, Ordering::Relaxed);
        Ok(RunId(format!("run-{serial:04}")))
    }

    async fn cancel(&self, token: &CancellationToken) -> Result<(), TransportError> {
        self.cancelled
            .lock()
            .expect("gateway mutex poisoned")
            .push(token.clone());
        Ok(())
    }

    async fn run_status(&self, _run_id: &RunId) -> Result<String, TransportError> {
        Ok(self
            .remote_status
            .lock()
            .expect("gateway mutex poisoned")
            .clone()
            .unwrap_or_else(|| "active".to_string()))
    }
}

/// Gateway that refuses every call, for failure-path tests.
pub(super) struct FailingGateway;

fn offline(operation: GatewayOperation) -> TransportError {
    TransportError::Rejected {
        operation,
        status: 503,
        detail: "automation service offline".to_string(),
    }
}

#[async_trait]
impl AutomationGateway for FailingGateway {
    async fn invoke(&self, _program: &AutomationProgram) -> Result<RunId, TransportError> {
        Err(offline(GatewayOperation::Invoke))
    }

    async fn cancel(&self, _token: &CancellationToken) -> Result<(), TransportError> {
        Err(offline(GatewayOperation::Cancel))
    }

    async fn run_status(&self, _run_id: &RunId) -> Result<String, TransportError> {
        Err(offline(GatewayOperation::Status))
    }
}

pub(super) fn build_service() -> (
    EnrollmentService<RecordingGateway, InMemoryEnrollmentStore>,
    Arc<RecordingGateway>,
    Arc<InMemoryEnrollmentStore>,
) {
    let gateway = Arc::new(RecordingGateway::default());
    let repository = Arc::new(InMemoryEnrollmentStore::default());
    let service = EnrollmentService::new(compiler(), gateway.clone(), repository.clone());
    (service, gateway, repository)
}

pub(super) fn build_failing_service() -> (
    EnrollmentService<FailingGateway, InMemoryEnrollmentStore>,
    Arc<InMemoryEnrollmentStore>,
) {
    let repository = Arc::new(InMemoryEnrollmentStore::default());
    let service = failing_service_with(repository.clone());
    (service, repository)
}

/// Pair a failing gateway with an existing store so failure paths can run
/// against records created by a healthy service.
pub(super) fn failing_service_with(
    repository: Arc<InMemoryEnrollmentStore>,
) -> EnrollmentService<FailingGateway, InMemoryEnrollmentStore> {
    EnrollmentService::new(compiler(), Arc::new(FailingGateway), repository)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
