//! Service configuration from the environment

use crate::state_machine::DEFAULT_PROMPT_TIMEOUT;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_AIRPORT_API_URL: &str = "https://airlabs.co/api/v9/airports";
const DEFAULT_AIRPORT_API_KEY: &str = "demo";
const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Runtime settings for the planner service
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    /// Channel that receives dispatched flight plans
    pub dispatch_channel: Option<String>,
    pub airport_api_url: String,
    pub airport_api_key: String,
    pub lookup_timeout: Duration,
    pub prompt_timeout: Duration,
    pub idle_timeout: Duration,
    /// Users allowed to credit flights to loyalty accounts
    pub admin_ids: Vec<String>,
}

impl PlannerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values fall back to defaults
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let secs = |key: &str, default: u64| {
            Duration::from_secs(get(key).and_then(|v| v.parse().ok()).unwrap_or(default))
        };

        let db_path = get("FLIGHT_PLANNER_DB_PATH").map_or_else(
            || {
                let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.flight-planner/loyalty.db"))
            },
            PathBuf::from,
        );

        Self {
            port: get("FLIGHT_PLANNER_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            db_path,
            dispatch_channel: get("FLIGHT_PLANNER_DISPATCH_CHANNEL").filter(|c| !c.is_empty()),
            airport_api_url: get("AIRPORT_API_URL")
                .unwrap_or_else(|| DEFAULT_AIRPORT_API_URL.to_string()),
            airport_api_key: get("AIRPORT_API_KEY")
                .unwrap_or_else(|| DEFAULT_AIRPORT_API_KEY.to_string()),
            lookup_timeout: secs("AIRPORT_LOOKUP_TIMEOUT_SECS", DEFAULT_LOOKUP_TIMEOUT_SECS),
            prompt_timeout: secs("PROMPT_TIMEOUT_SECS", DEFAULT_PROMPT_TIMEOUT.as_secs()),
            idle_timeout: secs("SESSION_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS),
            admin_ids: get("FLIGHT_PLANNER_ADMIN_IDS")
                .map(|ids| {
                    ids.split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_ids.iter().any(|id| id == user_id)
    }
}
