use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::{
    catalog::Language,
    error::{FlowError, Result},
};

/// Stable user identity assigned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub i64);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identity {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(Identity)
    }
}

/// Review status of an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ApplicationStatus::Pending),
            "approved" => Some(ApplicationStatus::Approved),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

/// Durable applicant record, one per identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub user_id: Identity,
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    /// `None` until the user picks a language.
    pub language: Option<Language>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub additional_benefits: Option<String>,
    pub quick_and_responsible: Option<bool>,
    pub status: ApplicationStatus,
}

impl Applicant {
    pub fn new(user_id: Identity) -> Self {
        Self {
            user_id,
            display_name: None,
            full_name: None,
            language: None,
            age: None,
            gender: None,
            additional_benefits: None,
            quick_and_responsible: None,
            status: ApplicationStatus::Pending,
        }
    }

    /// Stored language, or the default when none was chosen.
    pub fn effective_language(&self) -> Language {
        self.language.unwrap_or_default()
    }
}

/// Partial update applied by [`ApplicantStore::update_fields`]. `None` leaves a
/// field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicantPatch {
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub language: Option<Language>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub additional_benefits: Option<String>,
    pub quick_and_responsible: Option<bool>,
    pub status: Option<ApplicationStatus>,
}

impl ApplicantPatch {
    pub fn apply(self, applicant: &mut Applicant) {
        if let Some(value) = self.display_name {
            applicant.display_name = Some(value);
        }
        if let Some(value) = self.full_name {
            applicant.full_name = Some(value);
        }
        if let Some(value) = self.language {
            applicant.language = Some(value);
        }
        if let Some(value) = self.age {
            applicant.age = Some(value);
        }
        if let Some(value) = self.gender {
            applicant.gender = Some(value);
        }
        if let Some(value) = self.additional_benefits {
            applicant.additional_benefits = Some(value);
        }
        if let Some(value) = self.quick_and_responsible {
            applicant.quick_and_responsible = Some(value);
        }
        if let Some(value) = self.status {
            applicant.status = value;
        }
    }
}

/// Access contract for the durable applicant records.
#[async_trait]
pub trait ApplicantStore: Send + Sync {
    /// Returns the record and whether it was created by this call.
    async fn get_or_create(&self, id: Identity) -> Result<(Applicant, bool)>;
    async fn get(&self, id: Identity) -> Result<Applicant>;
    async fn save(&self, applicant: &Applicant) -> Result<()>;
    async fn update_fields(&self, id: Identity, patch: ApplicantPatch) -> Result<Applicant>;
}

/// In-memory implementation of ApplicantStore
#[derive(Clone, Default)]
pub struct InMemoryApplicantStore {
    applicants: Arc<DashMap<Identity, Applicant>>,
}

impl InMemoryApplicantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApplicantStore for InMemoryApplicantStore {
    async fn get_or_create(&self, id: Identity) -> Result<(Applicant, bool)> {
        let mut created = false;
        let entry = self.applicants.entry(id).or_insert_with(|| {
            created = true;
            Applicant::new(id)
        });
        Ok((entry.value().clone(), created))
    }

    async fn get(&self, id: Identity) -> Result<Applicant> {
        self.applicants
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(FlowError::ApplicantNotFound(id))
    }

    async fn save(&self, applicant: &Applicant) -> Result<()> {
        self.applicants.insert(applicant.user_id, applicant.clone());
        Ok(())
    }

    async fn update_fields(&self, id: Identity, patch: ApplicantPatch) -> Result<Applicant> {
        let mut entry = self
            .applicants
            .get_mut(&id)
            .ok_or(FlowError::ApplicantNotFound(id))?;
        patch.apply(entry.value_mut());
        Ok(entry.value().clone())
    }
}
