mod config;
mod status;
mod telegram;

use intake_flow::{
    ApplicantStore, ApplicationFlow, FlowRunner, InMemoryApplicantStore, InMemorySessionStorage,
    PostgresApplicantStore, ReviewerDesk, SessionStorage,
};
use std::sync::Arc;
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{config::BotConfig, status::StatusState, telegram::TelegramTransport};

/// Initialize tracing; `LOG_FORMAT=pretty` for humans, JSON otherwise
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "intake_bot=debug,intake_flow=debug,tower_http=debug".into());

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

async fn create_applicant_store(database_url: Option<&str>) -> Arc<dyn ApplicantStore> {
    let Some(database_url) = database_url else {
        info!("Using in-memory applicant storage (set DATABASE_URL to use PostgreSQL)");
        return Arc::new(InMemoryApplicantStore::new());
    };

    info!("Using PostgreSQL applicant storage");
    match PostgresApplicantStore::connect(database_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(
                "Failed to connect to PostgreSQL: {}. Falling back to in-memory storage.",
                e
            );
            Arc::new(InMemoryApplicantStore::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = BotConfig::from_env()?;

    let applicants = create_applicant_store(config.database_url.as_deref()).await;
    let sessions: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());

    let bot = Bot::new(config.bot_token.clone());
    let flow = ApplicationFlow::new(
        applicants.clone(),
        Arc::new(TelegramTransport::new(bot.clone())),
        config.reviewer,
    )
    .with_reviewer_language(config.reviewer_language);
    let runner = FlowRunner::new(Arc::new(flow), sessions.clone());
    let desk = ReviewerDesk::new(runner.clone());

    let listener = tokio::net::TcpListener::bind(config.status_addr).await?;
    let app = status::router(StatusState {
        applicants,
        sessions,
    });
    info!("Status server running on http://{}", config.status_addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Status server stopped");
        }
    });

    info!(reviewer = %config.reviewer, "Starting Telegram polling");
    telegram::run(bot, runner, desk).await;

    Ok(())
}
