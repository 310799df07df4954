use async_trait::async_trait;
use sqlx::{PgPool, Pool, Postgres, postgres::PgPoolOptions};

use crate::{
    applicant::{Applicant, ApplicantPatch, ApplicantStore, ApplicationStatus, Identity},
    catalog::Language,
    error::{FlowError, Result},
};

const COLUMNS: &str = "user_id, display_name, full_name, language, age, gender, \
                       additional_benefits, quick_and_responsible, status";

#[derive(sqlx::FromRow)]
struct ApplicantRow {
    user_id: i64,
    display_name: Option<String>,
    full_name: Option<String>,
    language: Option<String>,
    age: Option<i32>,
    gender: Option<String>,
    additional_benefits: Option<String>,
    quick_and_responsible: Option<bool>,
    status: String,
}

impl TryFrom<ApplicantRow> for Applicant {
    type Error = FlowError;

    fn try_from(row: ApplicantRow) -> Result<Self> {
        let language = match row.language.as_deref() {
            Some(code) => Some(Language::from_code(code).ok_or_else(|| {
                FlowError::StorageError(format!("unknown language code '{code}'"))
            })?),
            None => None,
        };
        let age = row
            .age
            .map(u32::try_from)
            .transpose()
            .map_err(|_| FlowError::StorageError("negative age stored".to_string()))?;
        let status = ApplicationStatus::parse(&row.status).ok_or_else(|| {
            FlowError::StorageError(format!("unknown status '{}'", row.status))
        })?;

        Ok(Applicant {
            user_id: Identity(row.user_id),
            display_name: row.display_name,
            full_name: row.full_name,
            language,
            age,
            gender: row.gender,
            additional_benefits: row.additional_benefits,
            quick_and_responsible: row.quick_and_responsible,
            status,
        })
    }
}

fn age_column(age: Option<u32>) -> Result<Option<i32>> {
    age.map(i32::try_from)
        .transpose()
        .map_err(|_| FlowError::StorageError("age out of range".to_string()))
}

/// PostgreSQL implementation of ApplicantStore
pub struct PostgresApplicantStore {
    pool: Pool<Postgres>,
}

impl PostgresApplicantStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS applicants (
                user_id BIGINT PRIMARY KEY,
                display_name TEXT,
                full_name TEXT,
                language VARCHAR(3),
                age INTEGER,
                gender TEXT,
                additional_benefits TEXT,
                quick_and_responsible BOOLEAN,
                status VARCHAR(20) NOT NULL DEFAULT 'pending'
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ApplicantStore for PostgresApplicantStore {
    async fn get_or_create(&self, id: Identity) -> Result<(Applicant, bool)> {
        let inserted: Option<ApplicantRow> = sqlx::query_as(&format!(
            "INSERT INTO applicants (user_id) VALUES ($1) \
             ON CONFLICT (user_id) DO NOTHING RETURNING {COLUMNS}"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok((row.try_into()?, true)),
            None => Ok((self.get(id).await?, false)),
        }
    }

    async fn get(&self, id: Identity) -> Result<Applicant> {
        let row: Option<ApplicantRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM applicants WHERE user_id = $1"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;

        row.ok_or(FlowError::ApplicantNotFound(id))?.try_into()
    }

    async fn save(&self, applicant: &Applicant) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO applicants (user_id, display_name, full_name, language, age, gender,
                                    additional_benefits, quick_and_responsible, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                full_name = EXCLUDED.full_name,
                language = EXCLUDED.language,
                age = EXCLUDED.age,
                gender = EXCLUDED.gender,
                additional_benefits = EXCLUDED.additional_benefits,
                quick_and_responsible = EXCLUDED.quick_and_responsible,
                status = EXCLUDED.status
            "#,
        )
        .bind(applicant.user_id.0)
        .bind(&applicant.display_name)
        .bind(&applicant.full_name)
        .bind(applicant.language.map(Language::code))
        .bind(age_column(applicant.age)?)
        .bind(&applicant.gender)
        .bind(&applicant.additional_benefits)
        .bind(applicant.quick_and_responsible)
        .bind(applicant.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_fields(&self, id: Identity, patch: ApplicantPatch) -> Result<Applicant> {
        let row: Option<ApplicantRow> = sqlx::query_as(&format!(
            "UPDATE applicants SET \
                 display_name = COALESCE($2, display_name), \
                 full_name = COALESCE($3, full_name), \
                 language = COALESCE($4, language), \
                 age = COALESCE($5, age), \
                 gender = COALESCE($6, gender), \
                 additional_benefits = COALESCE($7, additional_benefits), \
                 quick_and_responsible = COALESCE($8, quick_and_responsible), \
                 status = COALESCE($9, status) \
             WHERE user_id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id.0)
        .bind(patch.display_name)
        .bind(patch.full_name)
        .bind(patch.language.map(Language::code))
        .bind(age_column(patch.age)?)
        .bind(patch.gender)
        .bind(patch.additional_benefits)
        .bind(patch.quick_and_responsible)
        .bind(patch.status.map(ApplicationStatus::as_str))
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(FlowError::ApplicantNotFound(id))?.try_into()
    }
}
