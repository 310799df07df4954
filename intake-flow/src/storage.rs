use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{applicant::Identity, catalog::Language, error::Result, step::Step};

/// Answers collected so far, not yet committed to the applicant record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scratch {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub additional_benefits: Option<String>,
    pub quick_and_responsible: Option<bool>,
}

/// Ephemeral conversation state of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Identity,
    pub step: Step,
    pub language: Language,
    pub scratch: Scratch,
}

impl Session {
    pub fn new(user_id: Identity, step: Step, language: Language) -> Self {
        Self {
            user_id,
            step,
            language,
            scratch: Scratch::default(),
        }
    }

    /// Back to the idle menu, dropping anything collected so far.
    pub fn reset_to_menu(&mut self, language: Language) {
        self.step = Step::MainMenu;
        self.language = language;
        self.scratch = Scratch::default();
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    async fn get(&self, id: Identity) -> Result<Option<Session>>;
}

/// In-memory implementation of SessionStorage
#[derive(Clone, Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<Identity, Session>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.user_id, session);
        Ok(())
    }

    async fn get(&self, id: Identity) -> Result<Option<Session>> {
        Ok(self.sessions.get(&id).map(|entry| entry.clone()))
    }
}
