//! Reviewer decisions.
//!
//! The reviewer receives each submitted application with two inline buttons
//! carrying a [`DecisionTag`]. Pressing one lands in [`ReviewerDesk::decide`],
//! which is the only code path that changes an application's status and the
//! only one that moves another user's conversation.

use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::{
    applicant::{ApplicantPatch, ApplicationStatus, Identity},
    catalog::{self, Prompt},
    error::{FlowError, Result},
    runner::FlowRunner,
    step::Outbound,
    transport::deliver_best_effort,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Accept,
    Reject,
}

impl ReviewDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewDecision::Accept => "accept",
            ReviewDecision::Reject => "reject",
        }
    }

    pub fn status(self) -> ApplicationStatus {
        match self {
            ReviewDecision::Accept => ApplicationStatus::Approved,
            ReviewDecision::Reject => ApplicationStatus::Rejected,
        }
    }

    /// Button caption on the reviewer's notification.
    pub fn caption(self) -> &'static str {
        match self {
            ReviewDecision::Accept => "Accept",
            ReviewDecision::Reject => "Reject",
        }
    }

    fn outcome(self) -> Prompt {
        match self {
            ReviewDecision::Accept => Prompt::Accepted,
            ReviewDecision::Reject => Prompt::Rejected,
        }
    }

    fn acknowledgement(self) -> &'static str {
        match self {
            ReviewDecision::Accept => "Application accepted.",
            ReviewDecision::Reject => "Applicant rejected.",
        }
    }
}

/// Callback payload linking a decision button to an applicant, encoded as
/// `admin:<accept|reject>:<user_id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionTag {
    pub decision: ReviewDecision,
    pub applicant: Identity,
}

impl DecisionTag {
    const PREFIX: &'static str = "admin";

    pub fn new(decision: ReviewDecision, applicant: Identity) -> Self {
        Self {
            decision,
            applicant,
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DecisionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            Self::PREFIX,
            self.decision.as_str(),
            self.applicant
        )
    }
}

impl FromStr for DecisionTag {
    type Err = FlowError;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = || FlowError::InvalidDecisionTag(raw.to_string());

        let mut parts = raw.splitn(3, ':');
        let (Some(prefix), Some(action), Some(id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if prefix != Self::PREFIX {
            return Err(invalid());
        }
        let decision = match action {
            "accept" => ReviewDecision::Accept,
            "reject" => ReviewDecision::Reject,
            _ => return Err(invalid()),
        };
        let applicant = id.parse().map_err(|_| invalid())?;
        Ok(Self::new(decision, applicant))
    }
}

/// Outcome reported back to the reviewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionReceipt {
    pub applicant: Identity,
    pub status: ApplicationStatus,
    pub acknowledgement: &'static str,
}

/// Short text answered to the reviewer when a decision could not be applied.
pub fn failure_acknowledgement(error: &FlowError) -> &'static str {
    match error {
        FlowError::ApplicantNotFound(_) => "Applicant not found.",
        FlowError::UnauthorizedReviewer(_) => "Only the reviewer can decide on applications.",
        FlowError::InvalidDecisionTag(_) => "Unknown action.",
        _ => "Decision failed.",
    }
}

/// Applies reviewer decisions.
#[derive(Clone)]
pub struct ReviewerDesk {
    runner: FlowRunner,
}

impl ReviewerDesk {
    pub fn new(runner: FlowRunner) -> Self {
        Self { runner }
    }

    /// Parse and apply a decision pressed by `actor`.
    pub async fn decide(&self, actor: Identity, raw_tag: &str) -> Result<DecisionReceipt> {
        let reviewer = self.runner.flow().reviewer();
        if actor != reviewer {
            warn!(actor = %actor, reviewer = %reviewer, "Decision from non-reviewer ignored");
            return Err(FlowError::UnauthorizedReviewer(actor));
        }
        let tag: DecisionTag = raw_tag.parse()?;
        self.apply(tag).await
    }

    /// Persist the decision, tell the applicant and put them back on the menu.
    ///
    /// Only the status column is written. Repeating a decision is harmless;
    /// the applicant is simply told again.
    pub async fn apply(&self, tag: DecisionTag) -> Result<DecisionReceipt> {
        let flow = self.runner.flow();

        let applicant = flow
            .applicants()
            .update_fields(
                tag.applicant,
                ApplicantPatch {
                    status: Some(tag.decision.status()),
                    ..Default::default()
                },
            )
            .await?;
        info!(
            user_id = %applicant.user_id,
            status = applicant.status.as_str(),
            "Reviewer decision recorded"
        );

        let language = applicant.effective_language();
        deliver_best_effort(
            flow.transport().as_ref(),
            applicant.user_id,
            [Outbound::new(catalog::text(tag.decision.outcome(), language))],
        )
        .await;

        self.runner.reset_to_menu(applicant.user_id, language).await?;

        Ok(DecisionReceipt {
            applicant: applicant.user_id,
            status: applicant.status,
            acknowledgement: tag.decision.acknowledgement(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_encoding_is_colon_delimited() {
        let tag = DecisionTag::new(ReviewDecision::Reject, Identity(123456789));
        assert_eq!(tag.encode(), "admin:reject:123456789");
        assert_eq!("admin:reject:123456789".parse::<DecisionTag>().unwrap(), tag);
    }

    #[test]
    fn malformed_tags_are_rejected() {
        for raw in [
            "admin_accept_1",
            "admin:approve:1",
            "admin:accept:",
            "admin:accept:abc",
            "user:accept:1",
            "admin:accept",
            "",
        ] {
            let err = raw.parse::<DecisionTag>().unwrap_err();
            assert!(matches!(err, FlowError::InvalidDecisionTag(_)), "{raw}");
        }
    }

    #[test]
    fn failure_acknowledgements() {
        assert_eq!(
            failure_acknowledgement(&FlowError::ApplicantNotFound(Identity(1))),
            "Applicant not found."
        );
        assert_eq!(
            failure_acknowledgement(&FlowError::StorageError("down".into())),
            "Decision failed."
        );
    }
}
