use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use intake_flow::{
    ApplicantStore, ApplicationStatus, FlowError, Identity, Language, SessionStorage, Step,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct StatusState {
    pub applicants: Arc<dyn ApplicantStore>,
    pub sessions: Arc<dyn SessionStorage>,
}

#[derive(Debug, Serialize)]
struct ApplicantStatusView {
    user_id: Identity,
    status: ApplicationStatus,
    language: Option<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<Step>,
}

pub fn router(state: StatusState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/applicants/{user_id}", get(get_applicant))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn get_applicant(
    State(state): State<StatusState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApplicantStatusView>, StatusCode> {
    let id = Identity(user_id);

    let applicant = match state.applicants.get(id).await {
        Ok(applicant) => applicant,
        Err(FlowError::ApplicantNotFound(_)) => {
            info!(user_id = %id, "Applicant not found");
            return Err(StatusCode::NOT_FOUND);
        }
        Err(e) => {
            error!(user_id = %id, error = %e, "Failed to get applicant");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let step = match state.sessions.get(id).await {
        Ok(session) => session.map(|session| session.step),
        Err(e) => {
            error!(user_id = %id, error = %e, "Failed to get session");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    Ok(Json(ApplicantStatusView {
        user_id: applicant.user_id,
        status: applicant.status,
        language: applicant.language,
        step,
    }))
}
