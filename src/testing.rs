//! In-memory collaborators shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::config::{parse_leagues, Config, RunMode};
use crate::db::pick_log::DurableLog;
use crate::error::{AppError, Result};
use crate::fetcher::FixtureSource;
use crate::notify::NotificationSink;
use crate::types::LogRow;

pub fn fixture_json(id: u64, home: &str, away: &str, b365h: Option<f64>) -> Value {
    let mut v = json!({
        "fixture": {"id": id, "date": "2026-10-20T15:00:00+00:00"},
        "teams": {"home": {"name": home}, "away": {"name": away}},
    });
    if let Some(odd) = b365h {
        v["bookmakers"] = json!([
            {"bookmaker": {"name": "Bet365"}, "bets": [{"name": "Match Winner", "values": [
                {"value": "Home", "odd": odd.to_string()},
                {"value": "Draw", "odd": "3.30"},
            ]}]},
        ]);
    }
    v
}

pub fn stats_json(home: &str, hst: u32, away: &str, ast: u32) -> Value {
    json!({"response": [
        {"team": {"name": home}, "statistics": [{"type": "Shots on Goal", "value": hst}]},
        {"team": {"name": away}, "statistics": [{"type": "Shots on Goal", "value": ast}]},
    ]})
}

/// Config with every external endpoint pointed at nothing; dry-run on.
/// Store paths are placeholders; tests that touch the stores override them
/// with paths inside a `TempDir`.
pub fn test_config() -> Config {
    Config {
        api_football_url: "http://127.0.0.1:9".to_string(),
        api_football_key: "test-key".to_string(),
        discord_api_url: "http://127.0.0.1:9".to_string(),
        discord_token: "test-token".to_string(),
        discord_channel_id: "1440507066799100024".to_string(),
        dry_run: true,
        check_interval: Duration::from_secs(300),
        timezone: chrono_tz::Tz::UTC,
        leagues: parse_leagues("39:Premier League,140:La Liga").unwrap(),
        season: None,
        target_day_offset: 1,
        posted_store: PathBuf::from("posted_picks.json"),
        pending_store: PathBuf::from("posted_picks.pending.json"),
        db_path: ":memory:".to_string(),
        log_level: "debug".to_string(),
        api_port: 0,
        http_timeout: Duration::from_secs(5),
        fetch_concurrency: 2,
        run_mode: RunMode::Once,
    }
}

// ---------------------------------------------------------------------------
// Fixture source
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeSource {
    leagues: HashMap<u32, Vec<Value>>,
    stats: HashMap<String, Value>,
    odds: HashMap<String, Value>,
    failing_leagues: HashSet<u32>,
    failing_stats: HashSet<String>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_league(mut self, league_id: u32, fixtures: Vec<Value>) -> Self {
        self.leagues.insert(league_id, fixtures);
        self
    }

    pub fn with_stats(mut self, fixture_id: u64, body: Value) -> Self {
        self.stats.insert(fixture_id.to_string(), body);
        self
    }

    pub fn with_odds(mut self, fixture_id: u64, body: Value) -> Self {
        self.odds.insert(fixture_id.to_string(), body);
        self
    }

    pub fn failing_league(mut self, league_id: u32) -> Self {
        self.failing_leagues.insert(league_id);
        self
    }

    pub fn failing_stats(mut self, fixture_id: u64) -> Self {
        self.failing_stats.insert(fixture_id.to_string());
        self
    }
}

#[async_trait]
impl FixtureSource for FakeSource {
    async fn list_fixtures(&self, league_id: u32, _date: NaiveDate) -> Result<Vec<Value>> {
        if self.failing_leagues.contains(&league_id) {
            return Err(AppError::Upstream(format!("league {league_id} unavailable")));
        }
        Ok(self.leagues.get(&league_id).cloned().unwrap_or_default())
    }

    async fn fixture_statistics(&self, fixture_id: &str) -> Result<Value> {
        if self.failing_stats.contains(fixture_id) {
            return Err(AppError::Upstream(format!("statistics for {fixture_id} timed out")));
        }
        Ok(self
            .stats
            .get(fixture_id)
            .cloned()
            .unwrap_or_else(|| json!({"response": []})))
    }

    async fn fixture_odds(&self, fixture_id: &str) -> Result<Value> {
        Ok(self
            .odds
            .get(fixture_id)
            .cloned()
            .unwrap_or_else(|| json!({"response": []})))
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Shared event journal so tests can assert cross-sink ordering.
#[derive(Default)]
pub struct Journal {
    events: Mutex<Vec<String>>,
}

impl Journal {
    pub fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

pub struct RecordingNotifier {
    journal: Arc<Journal>,
    /// Messages containing any of these substrings fail.
    fail_on: Vec<String>,
}

impl RecordingNotifier {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self { journal, fail_on: Vec::new() }
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on.push(needle.to_string());
        self
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let label = text
            .lines()
            .find_map(|l| l.strip_prefix("⚽ Match: "))
            .unwrap_or("?")
            .to_string();
        if self.fail_on.iter().any(|n| text.contains(n.as_str())) {
            self.journal.push(format!("notify_failed:{label}"));
            return Err(AppError::Notify("channel unavailable".to_string()));
        }
        self.journal.push(format!("notify:{label}"));
        Ok(())
    }
}

pub struct MemoryLog {
    journal: Option<Arc<Journal>>,
    rows: Mutex<Vec<LogRow>>,
    fail_query: bool,
    fail_append: Mutex<bool>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self {
            journal: None,
            rows: Mutex::new(Vec::new()),
            fail_query: false,
            fail_append: Mutex::new(false),
        }
    }

    pub fn journaled(journal: Arc<Journal>) -> Self {
        Self { journal: Some(journal), ..Self::new() }
    }

    pub fn with_row(self, row: LogRow) -> Self {
        self.rows.lock().unwrap().push(row);
        self
    }

    pub fn failing_query(mut self) -> Self {
        self.fail_query = true;
        self
    }

    pub fn set_failing_append(&self, fail: bool) {
        *self.fail_append.lock().unwrap() = fail;
    }

    pub fn rows(&self) -> Vec<LogRow> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl DurableLog for MemoryLog {
    async fn query_all(&self) -> Result<Vec<LogRow>> {
        if self.fail_query {
            return Err(AppError::Upstream("log read denied".to_string()));
        }
        Ok(self.rows())
    }

    async fn append(&self, row: &LogRow) -> Result<()> {
        if *self.fail_append.lock().unwrap() {
            if let Some(j) = &self.journal {
                j.push(format!("log_failed:{}", row.match_label));
            }
            return Err(AppError::Upstream("log write denied".to_string()));
        }
        if let Some(j) = &self.journal {
            j.push(format!("log:{}", row.match_label));
        }
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }
}
