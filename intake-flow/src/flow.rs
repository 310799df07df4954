use std::sync::Arc;
use tracing::{error, info};

use crate::{
    applicant::{ApplicantPatch, ApplicantStore, ApplicationStatus, Identity},
    catalog::{self, Choices, Language, Prompt},
    error::{FlowError, Result},
    step::{Inbound, Markup, Outbound, Step, StepResult, ValidationError},
    storage::{Scratch, Session},
    transport::Transport,
};

/// The application form: one handler per [`Step`], selected by a `match`.
///
/// Handlers validate the input, write through to the applicant store on the
/// steps that persist and return the replies for the sender. The reviewer is
/// notified from here because the notification goes to a different identity.
pub struct ApplicationFlow {
    applicants: Arc<dyn ApplicantStore>,
    transport: Arc<dyn Transport>,
    reviewer: Identity,
    reviewer_language: Language,
}

impl ApplicationFlow {
    pub fn new(
        applicants: Arc<dyn ApplicantStore>,
        transport: Arc<dyn Transport>,
        reviewer: Identity,
    ) -> Self {
        Self {
            applicants,
            transport,
            reviewer,
            reviewer_language: Language::default(),
        }
    }

    pub fn with_reviewer_language(mut self, language: Language) -> Self {
        self.reviewer_language = language;
        self
    }

    pub fn applicants(&self) -> &Arc<dyn ApplicantStore> {
        &self.applicants
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn reviewer(&self) -> Identity {
        self.reviewer
    }

    /// First contact or `/start`: a user with a stored language lands on the
    /// menu, everyone else on the language picker.
    pub async fn enter(&self, inbound: &Inbound) -> Result<(Session, StepResult)> {
        let id = inbound.sender;
        let (mut applicant, created) = self.applicants.get_or_create(id).await?;
        if created {
            info!(user_id = %id, "Created applicant record");
        }

        if inbound.display_name.is_some() && applicant.display_name != inbound.display_name {
            applicant = self
                .applicants
                .update_fields(
                    id,
                    ApplicantPatch {
                        display_name: inbound.display_name.clone(),
                        ..Default::default()
                    },
                )
                .await?;
        }

        let (session, reply) = match applicant.language {
            Some(language) => (
                Session::new(id, Step::MainMenu, language),
                catalog::main_menu(language),
            ),
            None => {
                let language = Language::default();
                (
                    Session::new(id, Step::SelectLanguage, language),
                    catalog::language_picker(language),
                )
            }
        };

        info!(user_id = %id, step = %session.step, "Entered application flow");
        let result = StepResult::advance(session.step, vec![reply]);
        Ok((session, result))
    }

    /// Execute the handler of the session's current step and move the
    /// session to the step it returns.
    pub async fn execute_session(
        &self,
        session: &mut Session,
        inbound: &Inbound,
    ) -> Result<StepResult> {
        let input = inbound.text.as_str();
        let current = session.step;
        let result = match current {
            Step::SelectLanguage => self.select_language(session, input).await?,
            Step::MainMenu => main_menu(session, input),
            Step::AwaitingName => awaiting_name(session, input),
            Step::AwaitingAge => awaiting_age(session, input),
            Step::AwaitingGender => self.awaiting_gender(session, input).await?,
            Step::AwaitingBenefits => self.awaiting_benefits(session, input).await?,
            Step::AwaitingResponsibility => self.awaiting_responsibility(session, input).await?,
        };

        if result.next_step != current {
            info!(
                user_id = %session.user_id,
                from = %current,
                to = %result.next_step,
                "Step transition"
            );
        }
        session.step = result.next_step;
        Ok(result)
    }

    async fn select_language(&self, session: &mut Session, input: &str) -> Result<StepResult> {
        let language = Language::from_choice(input).unwrap_or_default();

        self.applicants.get_or_create(session.user_id).await?;
        self.applicants
            .update_fields(
                session.user_id,
                ApplicantPatch {
                    language: Some(language),
                    ..Default::default()
                },
            )
            .await?;

        session.language = language;
        Ok(StepResult::advance(
            Step::MainMenu,
            vec![catalog::main_menu(language)],
        ))
    }

    async fn awaiting_gender(&self, session: &mut Session, input: &str) -> Result<StepResult> {
        session.scratch.gender = Some(input.to_string());
        // Persisted right away so an abandoned form still shows the answer.
        self.applicants
            .update_fields(
                session.user_id,
                ApplicantPatch {
                    gender: Some(input.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        Ok(StepResult::advance(
            Step::AwaitingBenefits,
            vec![
                Outbound::new(catalog::text(Prompt::AskBenefits, session.language))
                    .with_markup(Markup::RemoveKeyboard),
            ],
        ))
    }

    async fn awaiting_benefits(&self, session: &mut Session, input: &str) -> Result<StepResult> {
        session.scratch.additional_benefits = Some(input.to_string());
        self.applicants
            .update_fields(
                session.user_id,
                ApplicantPatch {
                    additional_benefits: Some(input.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        Ok(StepResult::advance(
            Step::AwaitingResponsibility,
            vec![catalog::responsibility_picker(session.language)],
        ))
    }

    async fn awaiting_responsibility(
        &self,
        session: &mut Session,
        input: &str,
    ) -> Result<StepResult> {
        let language = session.language;
        let Some(quick_and_responsible) = catalog::responsibility_answer(input, language) else {
            let reply = catalog::responsibility_picker(language);
            return Ok(StepResult::invalid(
                Step::AwaitingResponsibility,
                ValidationError::Responsibility,
                Outbound::new(catalog::text(Prompt::InvalidResponsibility, language))
                    .with_markup(reply.markup),
            ));
        };
        session.scratch.quick_and_responsible = Some(quick_and_responsible);

        let patch = commit_patch(&session.scratch)?;
        let applicant = self.applicants.update_fields(session.user_id, patch).await?;
        info!(
            user_id = %session.user_id,
            quick_and_responsible,
            "Application committed"
        );

        // The record is already committed; a failed notification is only logged.
        let notification = Outbound::new(catalog::reviewer_summary(
            &applicant,
            self.reviewer_language,
        ))
        .with_markup(Markup::Decision {
            applicant: applicant.user_id,
        });
        if let Err(e) = self.transport.deliver(self.reviewer, notification).await {
            error!(
                user_id = %session.user_id,
                reviewer = %self.reviewer,
                error = %e,
                "Failed to notify reviewer"
            );
        }

        session.scratch = Scratch::default();
        Ok(StepResult::submitted(vec![
            Outbound::new(catalog::text(Prompt::ApplicationSubmitted, language)),
            catalog::main_menu(language),
        ]))
    }
}

fn main_menu(session: &mut Session, input: &str) -> StepResult {
    let language = session.language;
    let buttons = catalog::options(Choices::MainMenu, language);

    if input == buttons[0] {
        session.scratch = Scratch::default();
        StepResult::advance(
            Step::AwaitingName,
            vec![
                Outbound::new(catalog::text(Prompt::AskName, language))
                    .with_markup(Markup::RemoveKeyboard),
            ],
        )
    } else if input == buttons[1] {
        StepResult::advance(
            Step::MainMenu,
            vec![Outbound::new(catalog::text(Prompt::ContactUs, language))],
        )
    } else if input == buttons[2] {
        StepResult::advance(Step::SelectLanguage, vec![catalog::language_picker(language)])
    } else {
        StepResult::advance(Step::MainMenu, vec![catalog::main_menu(language)])
    }
}

fn awaiting_name(session: &mut Session, input: &str) -> StepResult {
    let name = input.trim();
    if name.is_empty() {
        return StepResult::invalid(
            Step::AwaitingName,
            ValidationError::Name,
            Outbound::new(catalog::text(Prompt::InvalidName, session.language)),
        );
    }

    session.scratch.name = Some(name.to_string());
    StepResult::advance(
        Step::AwaitingAge,
        vec![Outbound::new(catalog::text(Prompt::AskAge, session.language))],
    )
}

fn awaiting_age(session: &mut Session, input: &str) -> StepResult {
    match parse_age(input) {
        Some(age) => {
            session.scratch.age = Some(age);
            StepResult::advance(
                Step::AwaitingGender,
                vec![catalog::gender_picker(session.language)],
            )
        }
        None => StepResult::invalid(
            Step::AwaitingAge,
            ValidationError::Age,
            Outbound::new(catalog::text(Prompt::InvalidAge, session.language)),
        ),
    }
}

/// Accepts only a non-empty run of ASCII digits no larger than `i32::MAX`,
/// the range of the `age` column.
pub fn parse_age(input: &str) -> Option<u32> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let age: i32 = input.parse().ok()?;
    u32::try_from(age).ok()
}

fn commit_patch(scratch: &Scratch) -> Result<ApplicantPatch> {
    let missing = |field: &str| FlowError::ContextError(format!("{field} not found in scratch"));

    Ok(ApplicantPatch {
        full_name: Some(scratch.name.clone().ok_or_else(|| missing("name"))?),
        age: Some(scratch.age.ok_or_else(|| missing("age"))?),
        gender: Some(scratch.gender.clone().ok_or_else(|| missing("gender"))?),
        additional_benefits: Some(
            scratch
                .additional_benefits
                .clone()
                .ok_or_else(|| missing("additional_benefits"))?,
        ),
        quick_and_responsible: Some(
            scratch
                .quick_and_responsible
                .ok_or_else(|| missing("quick_and_responsible"))?,
        ),
        status: Some(ApplicationStatus::Pending),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applicant::InMemoryApplicantStore;
    use crate::step::ExecutionStatus;
    use crate::transport::RecordingTransport;

    const USER: Identity = Identity(100);
    const REVIEWER: Identity = Identity(1);

    fn flow() -> (ApplicationFlow, InMemoryApplicantStore, RecordingTransport) {
        let store = InMemoryApplicantStore::new();
        let transport = RecordingTransport::new();
        let flow = ApplicationFlow::new(
            Arc::new(store.clone()),
            Arc::new(transport.clone()),
            REVIEWER,
        );
        (flow, store, transport)
    }

    #[test]
    fn age_must_be_plain_digits() {
        assert_eq!(parse_age("29"), Some(29));
        assert_eq!(parse_age("0"), Some(0));
        assert_eq!(parse_age(""), None);
        assert_eq!(parse_age("abc"), None);
        assert_eq!(parse_age("-5"), None);
        assert_eq!(parse_age("+5"), None);
        assert_eq!(parse_age("2.5"), None);
        assert_eq!(parse_age(" 29"), None);
        assert_eq!(parse_age("٣"), None);
        assert_eq!(parse_age("99999999999"), None);
        assert_eq!(parse_age("2147483647"), Some(2147483647));
        assert_eq!(parse_age("3000000000"), None);
    }

    #[tokio::test]
    async fn entry_depends_only_on_stored_language() {
        let (flow, store, _) = flow();

        let (session, _) = flow.enter(&Inbound::new(USER, "/start")).await.unwrap();
        assert_eq!(session.step, Step::SelectLanguage);

        store
            .update_fields(
                USER,
                ApplicantPatch {
                    language: Some(Language::Uz),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let (session, result) = flow.enter(&Inbound::new(USER, "/start")).await.unwrap();
        assert_eq!(session.step, Step::MainMenu);
        assert_eq!(session.language, Language::Uz);
        assert_eq!(result.replies[0].text, catalog::text(Prompt::MainMenu, Language::Uz));
    }

    #[tokio::test]
    async fn entry_refreshes_display_name() {
        let (flow, store, _) = flow();
        let inbound = Inbound::new(USER, "/start").with_display_name("new_handle");

        flow.enter(&inbound).await.unwrap();

        let applicant = store.get(USER).await.unwrap();
        assert_eq!(applicant.display_name.as_deref(), Some("new_handle"));
    }

    #[tokio::test]
    async fn unrecognized_language_falls_back_to_english() {
        let (flow, store, _) = flow();
        let (mut session, _) = flow.enter(&Inbound::new(USER, "/start")).await.unwrap();

        let result = flow
            .execute_session(&mut session, &Inbound::new(USER, "Klingon"))
            .await
            .unwrap();

        assert_eq!(result.next_step, Step::MainMenu);
        assert_eq!(session.language, Language::En);
        assert_eq!(store.get(USER).await.unwrap().language, Some(Language::En));
    }

    #[tokio::test]
    async fn menu_contact_stays_and_unknown_reprompts() {
        let (flow, _, _) = flow();
        let mut session = Session::new(USER, Step::MainMenu, Language::Ru);

        let contact = flow
            .execute_session(&mut session, &Inbound::new(USER, "📞 Связаться с нами"))
            .await
            .unwrap();
        assert_eq!(contact.next_step, Step::MainMenu);
        assert_eq!(contact.replies[0].text, catalog::text(Prompt::ContactUs, Language::Ru));

        let unknown = flow
            .execute_session(&mut session, &Inbound::new(USER, "hello"))
            .await
            .unwrap();
        assert_eq!(unknown.next_step, Step::MainMenu);
        assert_eq!(unknown.replies[0].text, catalog::text(Prompt::MainMenu, Language::Ru));

        let change = flow
            .execute_session(&mut session, &Inbound::new(USER, "🌐 Язык"))
            .await
            .unwrap();
        assert_eq!(change.next_step, Step::SelectLanguage);
        assert_eq!(session.step, Step::SelectLanguage);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (flow, _, _) = flow();
        let mut session = Session::new(USER, Step::AwaitingName, Language::En);

        let result = flow
            .execute_session(&mut session, &Inbound::new(USER, "   "))
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::Invalid(ValidationError::Name));
        assert_eq!(session.step, Step::AwaitingName);
        assert_eq!(session.scratch.name, None);
    }

    #[tokio::test]
    async fn out_of_range_age_is_reprompted_at_age_step() {
        let (flow, _, _) = flow();
        let mut session = Session::new(USER, Step::AwaitingAge, Language::Uz);

        let result = flow
            .execute_session(&mut session, &Inbound::new(USER, "3000000000"))
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::Invalid(ValidationError::Age));
        assert_eq!(session.step, Step::AwaitingAge);
        assert_eq!(session.scratch.age, None);
    }

    #[tokio::test]
    async fn gender_and_benefits_are_persisted_eagerly() {
        let (flow, store, _) = flow();
        store.get_or_create(USER).await.unwrap();
        let mut session = Session::new(USER, Step::AwaitingGender, Language::En);

        flow.execute_session(&mut session, &Inbound::new(USER, "👩 Female"))
            .await
            .unwrap();
        assert_eq!(
            store.get(USER).await.unwrap().gender.as_deref(),
            Some("👩 Female")
        );
        assert_eq!(session.step, Step::AwaitingBenefits);

        flow.execute_session(&mut session, &Inbound::new(USER, "driving licence"))
            .await
            .unwrap();
        let applicant = store.get(USER).await.unwrap();
        assert_eq!(
            applicant.additional_benefits.as_deref(),
            Some("driving licence")
        );
        assert_eq!(applicant.full_name, None);
        assert_eq!(session.step, Step::AwaitingResponsibility);
    }

    #[tokio::test]
    async fn gender_is_not_checked_against_choices() {
        let (flow, store, _) = flow();
        store.get_or_create(USER).await.unwrap();
        let mut session = Session::new(USER, Step::AwaitingGender, Language::Uz);

        let result = flow
            .execute_session(&mut session, &Inbound::new(USER, "prefer not to say"))
            .await
            .unwrap();

        assert_eq!(result.next_step, Step::AwaitingBenefits);
        assert_eq!(session.scratch.gender.as_deref(), Some("prefer not to say"));
    }

    #[tokio::test]
    async fn commit_with_missing_scratch_is_a_context_error() {
        let (flow, store, transport) = flow();
        store.get_or_create(USER).await.unwrap();
        let mut session = Session::new(USER, Step::AwaitingResponsibility, Language::En);

        let err = flow
            .execute_session(&mut session, &Inbound::new(USER, "✅ Yes"))
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::ContextError(_)));
        assert!(transport.sent().is_empty());
    }
}
