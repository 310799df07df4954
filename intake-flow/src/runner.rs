//! FlowRunner – loads a user's session, executes exactly **one** step of the
//! application form and persists the updated session.
//!
//! Turns of the same identity are serialized with a per-identity async lock.
//! [`FlowRunner::reset_to_menu`] takes the same lock, so a reviewer decision
//! that lands while the user's turn is running is applied after that turn and
//! overwrites whatever it produced.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    applicant::Identity,
    catalog::{self, Language},
    error::Result,
    flow::ApplicationFlow,
    step::{ExecutionStatus, Inbound, Outbound, Step, StepResult},
    storage::{Session, SessionStorage},
    transport::deliver_best_effort,
};

/// Result of one turn
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub replies: Vec<Outbound>,
    /// Step the user waits in after the turn
    pub step: Step,
    pub status: ExecutionStatus,
}

impl From<StepResult> for ExecutionResult {
    fn from(result: StepResult) -> Self {
        Self {
            replies: result.replies,
            step: result.next_step,
            status: result.status,
        }
    }
}

/// High-level helper that orchestrates the _load → execute → save_ pattern.
#[derive(Clone)]
pub struct FlowRunner {
    flow: Arc<ApplicationFlow>,
    sessions: Arc<dyn SessionStorage>,
    locks: Arc<DashMap<Identity, Arc<Mutex<()>>>>,
}

impl FlowRunner {
    pub fn new(flow: Arc<ApplicationFlow>, sessions: Arc<dyn SessionStorage>) -> Self {
        Self {
            flow,
            sessions,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn flow(&self) -> &Arc<ApplicationFlow> {
        &self.flow
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStorage> {
        &self.sessions
    }

    /// Run `work` while holding the identity's turn lock. The lock entry is
    /// dropped again once no other turn is holding or waiting on it.
    async fn serialized<T>(&self, id: Identity, work: impl Future<Output = T>) -> T {
        let lock = self.locks.entry(id).or_default().clone();
        let output = {
            let _guard = lock.lock().await;
            work.await
        };
        drop(lock);
        self.locks.remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
        output
    }

    /// Execute one turn for the sender and persist the session. Replies are
    /// returned, not delivered.
    pub async fn run(&self, inbound: &Inbound) -> Result<ExecutionResult> {
        self.serialized(inbound.sender, self.run_locked(inbound)).await
    }

    /// Execute one turn and deliver the replies to the sender.
    pub async fn handle(&self, inbound: &Inbound) -> Result<ExecutionResult> {
        self.serialized(inbound.sender, self.handle_locked(inbound)).await
    }

    async fn handle_locked(&self, inbound: &Inbound) -> Result<ExecutionResult> {
        let result = self.run_locked(inbound).await?;
        deliver_best_effort(
            self.flow.transport().as_ref(),
            inbound.sender,
            result.replies.clone(),
        )
        .await;
        Ok(result)
    }

    async fn run_locked(&self, inbound: &Inbound) -> Result<ExecutionResult> {
        let existing = if inbound.is_start() {
            None
        } else {
            self.sessions.get(inbound.sender).await?
        };

        let (session, result) = match existing {
            Some(mut session) => {
                debug!(user_id = %inbound.sender, step = %session.step, "Resuming session");
                let result = self.flow.execute_session(&mut session, inbound).await?;
                (session, result)
            }
            None => self.flow.enter(inbound).await?,
        };

        self.sessions.save(session).await?;
        Ok(result.into())
    }

    /// Force the user's conversation back to the idle menu and show it to them.
    pub async fn reset_to_menu(&self, id: Identity, language: Language) -> Result<()> {
        self.serialized(id, self.reset_locked(id, language)).await
    }

    async fn reset_locked(&self, id: Identity, language: Language) -> Result<()> {
        let mut session = self
            .sessions
            .get(id)
            .await?
            .unwrap_or_else(|| Session::new(id, Step::MainMenu, language));
        if session.step != Step::MainMenu {
            info!(user_id = %id, step = %session.step, "Discarding in-progress form");
        }
        session.reset_to_menu(language);
        self.sessions.save(session).await?;

        deliver_best_effort(
            self.flow.transport().as_ref(),
            id,
            [catalog::main_menu(language)],
        )
        .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applicant::InMemoryApplicantStore;
    use crate::storage::InMemorySessionStorage;
    use crate::transport::RecordingTransport;

    const USER: Identity = Identity(42);

    fn runner() -> (FlowRunner, InMemorySessionStorage, RecordingTransport) {
        let sessions = InMemorySessionStorage::new();
        let transport = RecordingTransport::new();
        let flow = ApplicationFlow::new(
            Arc::new(InMemoryApplicantStore::new()),
            Arc::new(transport.clone()),
            Identity(1),
        );
        let runner = FlowRunner::new(Arc::new(flow), Arc::new(sessions.clone()));
        (runner, sessions, transport)
    }

    #[tokio::test]
    async fn message_without_session_is_first_contact() {
        let (runner, sessions, _) = runner();

        let result = runner.run(&Inbound::new(USER, "hi")).await.unwrap();

        assert_eq!(result.step, Step::SelectLanguage);
        let session = sessions.get(USER).await.unwrap().unwrap();
        assert_eq!(session.step, Step::SelectLanguage);
    }

    #[tokio::test]
    async fn start_restarts_from_any_step() {
        let (runner, sessions, _) = runner();
        runner.run(&Inbound::new(USER, "/start")).await.unwrap();
        runner.run(&Inbound::new(USER, "🇬🇧 English")).await.unwrap();
        runner.run(&Inbound::new(USER, "📝 Apply for a job")).await.unwrap();
        assert_eq!(
            sessions.get(USER).await.unwrap().unwrap().step,
            Step::AwaitingName
        );

        let result = runner.run(&Inbound::new(USER, "/start")).await.unwrap();

        assert_eq!(result.step, Step::MainMenu);
    }

    #[tokio::test]
    async fn handle_delivers_replies_in_order() {
        let (runner, _, transport) = runner();

        runner.handle(&Inbound::new(USER, "/start")).await.unwrap();
        runner.handle(&Inbound::new(USER, "🇺🇿 O'zbekcha")).await.unwrap();

        let sent = transport.sent_to(USER);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].text, catalog::text(catalog::Prompt::SelectLanguage, Language::En));
        assert_eq!(sent[1].text, catalog::text(catalog::Prompt::MainMenu, Language::Uz));
    }

    #[tokio::test]
    async fn reset_overwrites_in_progress_form() {
        let (runner, sessions, transport) = runner();
        let mut session = Session::new(USER, Step::AwaitingAge, Language::Ru);
        session.scratch.name = Some("Ivanov Ivan".to_string());
        sessions.save(session).await.unwrap();

        runner.reset_to_menu(USER, Language::Ru).await.unwrap();

        let session = sessions.get(USER).await.unwrap().unwrap();
        assert_eq!(session.step, Step::MainMenu);
        assert_eq!(session.scratch.name, None);
        assert_eq!(transport.sent_to(USER).len(), 1);
    }

    #[tokio::test]
    async fn lock_entries_are_released_after_turns() {
        let (runner, _, _) = runner();

        runner.handle(&Inbound::new(USER, "/start")).await.unwrap();
        runner.reset_to_menu(Identity(7), Language::En).await.unwrap();

        assert!(runner.locks.is_empty());
    }

    #[tokio::test]
    async fn failed_delivery_does_not_fail_the_turn() {
        let (runner, sessions, transport) = runner();
        transport.make_unreachable(USER);

        let result = runner.handle(&Inbound::new(USER, "/start")).await.unwrap();

        assert_eq!(result.step, Step::SelectLanguage);
        assert!(sessions.get(USER).await.unwrap().is_some());
        assert!(transport.sent().is_empty());
    }
}
