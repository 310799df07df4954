use serde::{Deserialize, Serialize};
use std::fmt;

use crate::applicant::Identity;

/// Position of a user in the application form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    SelectLanguage,
    MainMenu,
    AwaitingName,
    AwaitingAge,
    AwaitingGender,
    AwaitingBenefits,
    AwaitingResponsibility,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::SelectLanguage => "select_language",
            Step::MainMenu => "main_menu",
            Step::AwaitingName => "awaiting_name",
            Step::AwaitingAge => "awaiting_age",
            Step::AwaitingGender => "awaiting_gender",
            Step::AwaitingBenefits => "awaiting_benefits",
            Step::AwaitingResponsibility => "awaiting_responsibility",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text message received from a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub sender: Identity,
    /// Transport-level handle (e.g. a Telegram username), refreshed on entry.
    pub display_name: Option<String>,
    pub text: String,
}

impl Inbound {
    pub fn new(sender: Identity, text: impl Into<String>) -> Self {
        Self {
            sender,
            display_name: None,
            text: text.into(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Whether the message is the `/start` command, with or without a payload.
    pub fn is_start(&self) -> bool {
        let text = self.text.trim();
        text == "/start" || text.starts_with("/start ") || text.starts_with("/start@")
    }
}

/// Choice affordance rendered next to an outbound message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Markup {
    /// Leave whatever keyboard the user currently sees.
    #[default]
    None,
    /// Reply keyboard with grouped button rows.
    Keyboard { rows: Vec<Vec<String>>, one_time: bool },
    /// Remove the reply keyboard.
    RemoveKeyboard,
    /// Inline accept/reject buttons tagged with the applicant identity.
    Decision { applicant: Identity },
}

/// Message to deliver through the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub text: String,
    pub markup: Markup,
}

impl Outbound {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: Markup::None,
        }
    }

    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = markup;
        self
    }
}

/// Input rejected by a step. The step is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    Name,
    Age,
    Responsibility,
}

/// Status of one executed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Waiting for the user's next answer
    WaitingForInput,
    /// Input rejected, same step re-prompted
    Invalid(ValidationError),
    /// Application committed and handed to the reviewer
    Submitted,
}

/// Outcome of a single step handler
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Messages for the user who sent the input
    pub replies: Vec<Outbound>,
    /// Step to wait in after this turn
    pub next_step: Step,
    pub status: ExecutionStatus,
}

impl StepResult {
    pub fn advance(next_step: Step, replies: Vec<Outbound>) -> Self {
        Self {
            replies,
            next_step,
            status: ExecutionStatus::WaitingForInput,
        }
    }

    pub fn invalid(current: Step, error: ValidationError, reply: Outbound) -> Self {
        Self {
            replies: vec![reply],
            next_step: current,
            status: ExecutionStatus::Invalid(error),
        }
    }

    pub fn submitted(replies: Vec<Outbound>) -> Self {
        Self {
            replies,
            next_step: Step::MainMenu,
            status: ExecutionStatus::Submitted,
        }
    }
}
