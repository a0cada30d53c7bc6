use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::{AppError, Result};

pub const API_FOOTBALL_URL: &str = "https://v3.football.api-sports.io";
pub const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Default league set: (provider league id, display name), in scan order.
pub const DEFAULT_LEAGUES: &str = "39:Premier League,140:La Liga,2:England Championship";

/// Bookmaker whose home-win price feeds the evaluator (matched case-insensitively).
pub const BOOKMAKER: &str = "bet365";

/// Date format used in picks and as half of the durable-log key.
pub const PICK_DATE_FORMAT: &str = "%d-%b-%Y";

/// How many recent durable-log rows `GET /picks` returns by default.
pub const RECENT_PICKS_LIMIT: i64 = 50;

/// Pick filter thresholds.
pub mod filter {
    pub const MIN_HOME_SOT: u32 = 4;
    pub const MIN_AWAY_SOT: u32 = 1;
    pub const MIN_SOT_RATIO: f64 = 2.5;
    pub const MIN_HOME_ODDS: f64 = 2.0;
    pub const MAX_HOME_ODDS: f64 = 3.5;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct League {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Poll on the configured interval until shutdown.
    Loop,
    /// Run a single cycle and exit.
    Once,
    /// Generate and log picks without delivering or touching dedup state.
    Preview,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_football_url: String,
    pub api_football_key: String,
    pub discord_api_url: String,
    pub discord_token: String,
    pub discord_channel_id: String,
    /// Log notifications instead of posting them (DRY_RUN)
    pub dry_run: bool,
    pub check_interval: Duration,
    pub timezone: Tz,
    /// Leagues scanned each cycle, in configuration order (LEAGUE_IDS)
    pub leagues: Vec<League>,
    /// Season override; defaults to the target date's year (SEASON)
    pub season: Option<i32>,
    /// Days ahead of "today" in `timezone` to scan (TARGET_DAY_OFFSET)
    pub target_day_offset: i64,
    pub posted_store: PathBuf,
    pub pending_store: PathBuf,
    pub db_path: String,
    pub log_level: String,
    pub api_port: u16,
    pub http_timeout: Duration,
    /// Max in-flight per-fixture lookups against the provider (FETCH_CONCURRENCY)
    pub fetch_concurrency: usize,
    pub run_mode: RunMode,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let dry_run = env_flag("DRY_RUN");

        let api_football_key = required("API_FOOTBALL_KEY")?;
        let (discord_token, discord_channel_id) = if dry_run {
            (
                std::env::var("DISCORD_TOKEN").unwrap_or_default(),
                std::env::var("DISCORD_CHANNEL_ID").unwrap_or_default(),
            )
        } else {
            (required("DISCORD_TOKEN")?, required("DISCORD_CHANNEL_ID")?)
        };

        let timezone = std::env::var("TIMEZONE")
            .unwrap_or_else(|_| "Africa/Lagos".to_string())
            .parse::<Tz>()
            .map_err(|e| AppError::Config(format!("TIMEZONE: {e}")))?;

        let leagues = parse_leagues(
            &std::env::var("LEAGUE_IDS").unwrap_or_else(|_| DEFAULT_LEAGUES.to_string()),
        )?;

        let season = match std::env::var("SEASON") {
            Ok(s) if !s.trim().is_empty() => Some(
                s.trim()
                    .parse::<i32>()
                    .map_err(|_| AppError::Config("SEASON must be a year".to_string()))?,
            ),
            _ => None,
        };

        let posted_store = PathBuf::from(
            std::env::var("POSTED_STORE").unwrap_or_else(|_| "posted_picks.json".to_string()),
        );
        let pending_store = std::env::var("PENDING_LOG_STORE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| posted_store.with_extension("pending.json"));

        let run_mode = match std::env::var("RUN_MODE")
            .unwrap_or_else(|_| "loop".to_string())
            .to_lowercase()
            .as_str()
        {
            "loop" => RunMode::Loop,
            "once" => RunMode::Once,
            "preview" => RunMode::Preview,
            other => {
                return Err(AppError::Config(format!(
                    "RUN_MODE must be loop, once or preview (got {other})"
                )))
            }
        };

        let check_interval = parse_check_interval(
            &std::env::var("CHECK_INTERVAL_MINUTES").unwrap_or_else(|_| "5".to_string()),
        )?;
        let http_timeout = parse_http_timeout(
            &std::env::var("HTTP_TIMEOUT_SECS").unwrap_or_else(|_| "20".to_string()),
        )?;

        Ok(Self {
            api_football_url: std::env::var("API_FOOTBALL_URL")
                .unwrap_or_else(|_| API_FOOTBALL_URL.to_string()),
            api_football_key,
            discord_api_url: std::env::var("DISCORD_API_URL")
                .unwrap_or_else(|_| DISCORD_API_URL.to_string()),
            discord_token,
            discord_channel_id,
            dry_run,
            check_interval,
            timezone,
            leagues,
            season,
            target_day_offset: std::env::var("TARGET_DAY_OFFSET")
                .unwrap_or_else(|_| "1".to_string())
                .parse::<i64>()
                .unwrap_or(1),
            posted_store,
            pending_store,
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "picks.db".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            http_timeout,
            fetch_concurrency: std::env::var("FETCH_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse::<usize>()
                .unwrap_or(4)
                .max(1),
            run_mode,
        })
    }
}

/// `CHECK_INTERVAL_MINUTES`: whole minutes, at least 1.
fn parse_check_interval(raw: &str) -> Result<Duration> {
    let minutes = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| AppError::Config("CHECK_INTERVAL_MINUTES must be an integer".to_string()))?;
    if minutes == 0 {
        return Err(AppError::Config("CHECK_INTERVAL_MINUTES must be > 0".to_string()));
    }
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| AppError::Config("CHECK_INTERVAL_MINUTES is too large".to_string()))
}

/// `HTTP_TIMEOUT_SECS`: whole seconds, at least 1.
fn parse_http_timeout(raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(AppError::Config("HTTP_TIMEOUT_SECS must be > 0".to_string())),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(AppError::Config("HTTP_TIMEOUT_SECS must be an integer".to_string())),
    }
}

fn required(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AppError::Config(format!("{key} must be set"))),
    }
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Parse `LEAGUE_IDS`: comma-separated `id` or `id:Name` entries. Order is kept.
pub fn parse_leagues(raw: &str) -> Result<Vec<League>> {
    let mut leagues = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (id, name) = match entry.split_once(':') {
            Some((id, name)) => (id.trim(), name.trim().to_string()),
            None => (entry, format!("league {entry}")),
        };
        let id = id
            .parse::<u32>()
            .map_err(|_| AppError::Config(format!("invalid league id in LEAGUE_IDS: {entry}")))?;
        leagues.push(League { id, name });
    }
    if leagues.is_empty() {
        return Err(AppError::Config("LEAGUE_IDS must name at least one league".to_string()));
    }
    Ok(leagues)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_leagues_keep_configuration_order() {
        let leagues = parse_leagues(DEFAULT_LEAGUES).unwrap();
        let ids: Vec<u32> = leagues.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![39, 140, 2]);
        assert_eq!(leagues[0].name, "Premier League");
    }

    #[test]
    fn bare_ids_get_a_placeholder_name() {
        let leagues = parse_leagues(" 78 , 61:Ligue 1,").unwrap();
        assert_eq!(leagues.len(), 2);
        assert_eq!(leagues[0], League { id: 78, name: "league 78".to_string() });
        assert_eq!(leagues[1].name, "Ligue 1");
    }

    #[test]
    fn rejects_garbage_and_empty_sets() {
        assert!(parse_leagues("epl").is_err());
        assert!(parse_leagues(" , ").is_err());
    }

    #[test]
    fn check_interval_in_minutes_rejects_zero_and_overflow() {
        assert_eq!(parse_check_interval("5").unwrap(), Duration::from_secs(300));
        assert!(parse_check_interval("0").is_err());
        assert!(parse_check_interval("soon").is_err());
        assert!(matches!(
            parse_check_interval(&u64::MAX.to_string()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn http_timeout_must_be_positive() {
        assert_eq!(parse_http_timeout("20").unwrap(), Duration::from_secs(20));
        assert!(parse_http_timeout("0").is_err());
        assert!(parse_http_timeout("-1").is_err());
    }
}
