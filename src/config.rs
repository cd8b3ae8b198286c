use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct CanvasConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
    pub per_page: u32,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub canvas: CanvasConfig,
    pub sync_interval: Duration,
    pub check_interval: Duration,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let base_url = lookup("CANVAS_BASE_URL")
            .ok_or_else(|| AppError::BadRequest("CANVAS_BASE_URL is not set".to_string()))?;

        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://offline_sync.db".to_string());

        let bind_addr = match lookup("BIND_ADDR") {
            Some(addr) => addr
                .parse()
                .map_err(|_| AppError::BadRequest(format!("Invalid BIND_ADDR: {}", addr)))?,
            None => SocketAddr::from(([127, 0, 0, 1], 3000)),
        };

        Ok(Self {
            database_url,
            bind_addr,
            canvas: CanvasConfig {
                base_url,
                api_token: lookup("CANVAS_TOKEN").filter(|t| !t.is_empty()),
                timeout: Duration::from_secs(parse_number(&lookup, "HTTP_TIMEOUT_SECS", 30)?),
                per_page: parse_number(&lookup, "PER_PAGE", 100)?,
            },
            sync_interval: Duration::from_secs(parse_number(&lookup, "SYNC_INTERVAL_SECS", 900)?),
            check_interval: Duration::from_secs(parse_number(
                &lookup,
                "CONNECTIVITY_CHECK_SECS",
                30,
            )?),
            user_id: lookup("CANVAS_USER_ID")
                .map(|id| {
                    id.parse()
                        .map_err(|_| AppError::BadRequest(format!("Invalid CANVAS_USER_ID: {}", id)))
                })
                .transpose()?,
            user_name: lookup("CANVAS_USER_NAME"),
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(key) {
        Some(value) => value
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", key, value))),
        None => Ok(default),
    }
}
