use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::NaiveDate;

use crate::config::OutreachConfig;

use super::domain::{Candidate, CancellationToken, SequenceDefinition};
use super::program::{
    AutomationProgram, DelayTiming, Instruction, MergeStrategy, MessageData, OutboundMessage,
    Recipient, WebhookCall, WebhookMethod,
};

/// Fallback merged into send payloads when the candidate record carries no
/// open position.
const GENERIC_POSITION: &str = "the position";

/// A single problem found while validating a sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationIssue {
    #[error("sequence name is required")]
    NameRequired,
    #[error("at least one step is required")]
    StepsRequired,
    #[error("step {position}: email template is required")]
    MissingTemplate { position: usize },
    #[error("step {position}: id {id} is already used by an earlier step")]
    DuplicateStepId { position: usize, id: u32 },
}

/// Raised when a sequence fails compile-time checks. Carries every violation
/// found, not just the first, so the authoring surface can show them all at
/// once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sequence validation failed: ")?;
        for (index, issue) in self.issues.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Check a sequence against the authoring rules, collecting every violation.
pub fn validate_sequence(sequence: &SequenceDefinition) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    if sequence.name.trim().is_empty() {
        issues.push(ValidationIssue::NameRequired);
    }
    if sequence.steps.is_empty() {
        issues.push(ValidationIssue::StepsRequired);
    }

    let mut seen_ids = HashSet::new();
    for (index, step) in sequence.steps.iter().enumerate() {
        let position = index + 1;
        if step.email_template.trim().is_empty() {
            issues.push(ValidationIssue::MissingTemplate { position });
        }
        if !seen_ids.insert(step.id) {
            issues.push(ValidationIssue::DuplicateStepId {
                position,
                id: step.id,
            });
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { issues })
    }
}

/// Compiles authored sequences into automation programs. Pure and
/// deterministic: no clock, no I/O, no per-call state.
#[derive(Debug, Clone)]
pub struct SequenceCompiler {
    company_name: String,
    status_webhook_base: String,
    webhook_authorization: Option<String>,
}

impl SequenceCompiler {
    pub fn new(config: &OutreachConfig) -> Self {
        Self {
            company_name: config.company_name.clone(),
            status_webhook_base: config.status_webhook_base.trim_end_matches('/').to_string(),
            webhook_authorization: config.webhook_authorization.clone(),
        }
    }

    /// Compile a sequence for one candidate into the flattened instruction
    /// list the automation service executes:
    ///
    /// 1. a delay gating the run on `start_date`,
    /// 2. the cancellation registration, valid before the first send,
    /// 3. per step: an optional duration delay (suppressed for the first
    ///    step), an optional status fetch, and the send itself.
    pub fn compile(
        &self,
        sequence: &SequenceDefinition,
        candidate: &Candidate,
        start_date: NaiveDate,
        cancellation_token: &CancellationToken,
    ) -> Result<AutomationProgram, ValidationError> {
        validate_sequence(sequence)?;

        let mut steps = Vec::with_capacity(sequence.steps.len() * 2 + 2);
        steps.push(Instruction::Delay(DelayTiming::Until { until: start_date }));
        steps.push(Instruction::Cancel {
            cancelation_token: cancellation_token.clone(),
        });

        for (index, step) in sequence.steps.iter().enumerate() {
            if index > 0 {
                if let Some(delay) = step.delay {
                    steps.push(Instruction::Delay(DelayTiming::Duration { duration: delay }));
                }
            }

            if step.check_status {
                steps.push(Instruction::FetchData {
                    webhook: self.status_webhook(candidate),
                    merge_strategy: MergeStrategy::SoftMerge,
                });
            }

            steps.push(Instruction::Send {
                message: self.outbound_message(sequence, candidate, &step.email_template),
            });
        }

        Ok(AutomationProgram { steps })
    }

    fn status_webhook(&self, candidate: &Candidate) -> WebhookCall {
        let mut headers = BTreeMap::new();
        if let Some(authorization) = &self.webhook_authorization {
            headers.insert("Authorization".to_string(), authorization.clone());
        }

        WebhookCall {
            url: format!(
                "{}/candidates/{}/status",
                self.status_webhook_base, candidate.id.0
            ),
            method: WebhookMethod::Get,
            headers,
        }
    }

    fn outbound_message(
        &self,
        sequence: &SequenceDefinition,
        candidate: &Candidate,
        template: &str,
    ) -> OutboundMessage {
        OutboundMessage {
            to: Recipient {
                email: candidate.email.clone(),
                first_name: candidate.first_name().to_string(),
                last_name: candidate.last_name(),
            },
            template: template.to_string(),
            data: MessageData {
                candidate_name: candidate.name.clone(),
                position: candidate
                    .position
                    .clone()
                    .unwrap_or_else(|| GENERIC_POSITION.to_string()),
                company_name: self.company_name.clone(),
                sequence_name: sequence.name.clone(),
            },
        }
    }
}
