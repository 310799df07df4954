use intake_flow::{Identity, Language};
use std::env;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("ADMIN_ID must be an integer user id, got '{0}'")]
    InvalidReviewer(String),
    #[error("STATUS_PORT must be a valid u16")]
    InvalidPort,
    #[error("STATUS_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost(#[source] std::net::AddrParseError),
    #[error("REVIEWER_LANGUAGE must be one of en, ru, uz, got '{0}'")]
    InvalidLanguage(String),
}

/// Runtime settings read from the environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub reviewer: Identity,
    pub reviewer_language: Language,
    pub database_url: Option<String>,
    pub status_addr: SocketAddr,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bot_token = non_empty("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let raw_reviewer = non_empty("ADMIN_ID").ok_or(ConfigError::Missing("ADMIN_ID"))?;
        let reviewer = raw_reviewer
            .trim()
            .parse::<Identity>()
            .map_err(|_| ConfigError::InvalidReviewer(raw_reviewer.clone()))?;

        let reviewer_language = match non_empty("REVIEWER_LANGUAGE") {
            Some(code) => {
                Language::from_code(&code).ok_or(ConfigError::InvalidLanguage(code.clone()))?
            }
            None => Language::default(),
        };

        let database_url = non_empty("DATABASE_URL");

        let host = non_empty("STATUS_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = non_empty("STATUS_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let status_addr = socket_addr(&host, port)?;

        Ok(Self {
            bot_token,
            reviewer,
            reviewer_language,
            database_url,
            status_addr,
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    if host.eq_ignore_ascii_case("localhost") {
        return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), port));
    }
    let ip: IpAddr = host.parse().map_err(ConfigError::InvalidHost)?;
    Ok(SocketAddr::new(ip, port))
}
