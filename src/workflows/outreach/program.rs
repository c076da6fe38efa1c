use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{CancellationToken, StepDelay};

/// The compiled, declarative instruction list consumed by the automation
/// service. Serialization produces exactly the service's wire format,
/// including its `cancelation_token` spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationProgram {
    pub steps: Vec<Instruction>,
}

impl AutomationProgram {
    /// The outbound messages in emission order, for inspection and tests.
    pub fn sends(&self) -> impl Iterator<Item = &OutboundMessage> {
        self.steps.iter().filter_map(|instruction| match instruction {
            Instruction::Send { message } => Some(message),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Instruction {
    Delay(DelayTiming),
    Cancel {
        cancelation_token: CancellationToken,
    },
    FetchData {
        webhook: WebhookCall,
        merge_strategy: MergeStrategy,
    },
    Send {
        message: OutboundMessage,
    },
}

/// A delay instruction either waits until a calendar date (the run gate) or
/// for a relative duration between steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DelayTiming {
    Until { until: NaiveDate },
    Duration { duration: StepDelay },
}

/// Read-only webhook the service calls to pull fresh data into the run's
/// evaluation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookCall {
    pub url: String,
    pub method: WebhookMethod,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookMethod {
    #[serde(rename = "GET")]
    Get,
}

/// How fetched data lands in the evaluation context. `SoftMerge` never
/// overwrites fields that are already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    SoftMerge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub to: Recipient,
    pub template: String,
    pub data: MessageData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Merge fields available to the email template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub candidate_name: String,
    pub position: String,
    pub company_name: String,
    pub sequence_name: String,
}
