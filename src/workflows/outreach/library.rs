use serde::Serialize;

use super::domain::{DelayUnit, SequenceDefinition, SequenceId, SequenceStep, StepDelay};

/// Email templates the delivery service recognizes. Steps referencing other
/// template names still compile; this catalog feeds the authoring surface's
/// pick list.
pub const EMAIL_TEMPLATES: &[&str] = &[
    "Welcome Email",
    "Background Form",
    "Interview Preparation",
    "Technical Assessment",
    "Team Introduction",
    "Next Steps",
];

/// A ready-made sequence recruiters can start from instead of authoring one
/// step by step.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceTemplate {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub steps: Vec<SequenceStep>,
}

impl SequenceTemplate {
    /// Materialize an editable sequence definition from this template.
    pub fn to_sequence(&self) -> SequenceDefinition {
        SequenceDefinition {
            id: SequenceId(self.key.to_string()),
            name: self.name.to_string(),
            steps: self.steps.clone(),
        }
    }
}

/// Catalog of the built-in sequence templates.
#[derive(Debug)]
pub struct SequenceLibrary {
    templates: Vec<SequenceTemplate>,
}

impl SequenceLibrary {
    pub fn standard() -> Self {
        Self {
            templates: standard_sequence_templates(),
        }
    }

    pub fn templates(&self) -> &[SequenceTemplate] {
        &self.templates
    }

    pub fn find(&self, key: &str) -> Option<&SequenceTemplate> {
        self.templates.iter().find(|template| template.key == key)
    }
}

fn delay(value: u32, unit: DelayUnit) -> Option<StepDelay> {
    Some(StepDelay { value, unit })
}

fn step(id: u32, template: &str, delay: Option<StepDelay>, check_status: bool) -> SequenceStep {
    SequenceStep {
        id,
        email_template: template.to_string(),
        delay,
        check_status,
    }
}

fn standard_sequence_templates() -> Vec<SequenceTemplate> {
    vec![
        SequenceTemplate {
            key: "technical-interview-pipeline",
            name: "Technical Interview Pipeline",
            description: "A sequence for technical candidates going through the interview process",
            steps: vec![
                step(1, "Initial Contact", None, false),
                step(2, "Technical Assessment", delay(2, DelayUnit::Days), true),
                step(3, "Interview Preparation", delay(3, DelayUnit::Days), true),
                step(4, "Follow-up", delay(1, DelayUnit::Weeks), true),
            ],
        },
        SequenceTemplate {
            key: "sales-team-onboarding",
            name: "Sales Team Onboarding",
            description: "A sequence for new sales team members",
            steps: vec![
                step(1, "Welcome Email", None, false),
                step(2, "Training Schedule", delay(1, DelayUnit::Days), false),
                step(3, "Product Overview", delay(3, DelayUnit::Days), false),
                step(4, "Sales Process", delay(5, DelayUnit::Days), false),
                step(5, "First Week Check-in", delay(1, DelayUnit::Weeks), true),
            ],
        },
        SequenceTemplate {
            key: "candidate-rejection",
            name: "Candidate Rejection",
            description: "A sequence for candidates who did not pass the interview",
            steps: vec![
                step(1, "Thank You Email", None, false),
                step(2, "Feedback Request", delay(1, DelayUnit::Weeks), false),
            ],
        },
    ]
}
