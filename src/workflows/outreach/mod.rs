//! Candidate outreach: sequence authoring, compilation into automation
//! programs, and enrollment lifecycle management against the Courier
//! automation service.

pub mod compiler;
pub mod courier;
pub mod domain;
pub mod library;
pub mod program;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use compiler::{validate_sequence, SequenceCompiler, ValidationError, ValidationIssue};
pub use courier::{AutomationGateway, CourierClient, GatewayOperation, TransportError};
pub use domain::{
    Candidate, CandidateId, CancellationToken, DelayParseError, DelayUnit, Enrollment,
    EnrollmentId, EnrollmentStatus, RunId, SequenceDefinition, SequenceId, SequenceStep, StepDelay,
};
pub use library::{SequenceLibrary, SequenceTemplate, EMAIL_TEMPLATES};
pub use program::{
    AutomationProgram, DelayTiming, Instruction, MergeStrategy, MessageData, OutboundMessage,
    Recipient, WebhookCall, WebhookMethod,
};
pub use repository::{
    EnrollmentRepository, EnrollmentView, InMemoryEnrollmentStore, RepositoryError,
};
pub use router::{outreach_router, EnrollmentRequest};
pub use service::{EnrollmentError, EnrollmentService};
