use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate};
use chrono_tz::Tz;
use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{Config, League, BOOKMAKER};
use crate::error::{AppError, Result};
use crate::types::CanonicalFixture;

/// Raw fixture/statistics/odds provider. Payloads are returned untyped; every
/// shape decision lives in the parsers below.
#[async_trait]
pub trait FixtureSource: Send + Sync {
    /// Raw fixture objects for one league on one date.
    async fn list_fixtures(&self, league_id: u32, date: NaiveDate) -> Result<Vec<Value>>;

    /// Full statistics response body for one fixture.
    async fn fixture_statistics(&self, fixture_id: &str) -> Result<Value>;

    /// Full odds response body for one fixture.
    async fn fixture_odds(&self, fixture_id: &str) -> Result<Value>;
}

// ---------------------------------------------------------------------------
// API-Football client
// ---------------------------------------------------------------------------

pub struct ApiFootballClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    season: Option<i32>,
    timezone: Tz,
}

impl ApiFootballClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.http_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: cfg.api_football_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_football_key.clone(),
            season: cfg.season,
            timezone: cfg.timezone,
        })
    }

    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let body: Value = self
            .client
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(errors) = api_errors(&body) {
            return Err(AppError::Upstream(format!("{path} returned errors: {errors}")));
        }

        Ok(body)
    }
}

/// API-Football reports auth, quota and parameter problems with HTTP 200 and a
/// non-empty `errors` field (array or object). Returns that field rendered.
pub fn api_errors(body: &Value) -> Option<String> {
    match body.get("errors") {
        Some(e @ Value::Array(a)) if !a.is_empty() => Some(e.to_string()),
        Some(e @ Value::Object(o)) if !o.is_empty() => Some(e.to_string()),
        _ => None,
    }
}

#[async_trait]
impl FixtureSource for ApiFootballClient {
    async fn list_fixtures(&self, league_id: u32, date: NaiveDate) -> Result<Vec<Value>> {
        let season = self.season.unwrap_or_else(|| date.year());
        let body = self
            .get_json(
                "/fixtures",
                &[
                    ("league", league_id.to_string()),
                    ("season", season.to_string()),
                    ("date", date.format("%Y-%m-%d").to_string()),
                    ("timezone", self.timezone.name().to_string()),
                ],
            )
            .await?;

        Ok(body
            .get("response")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default())
    }

    async fn fixture_statistics(&self, fixture_id: &str) -> Result<Value> {
        self.get_json("/fixtures/statistics", &[("fixture", fixture_id.to_string())])
            .await
    }

    async fn fixture_odds(&self, fixture_id: &str) -> Result<Value> {
        self.get_json("/odds", &[("fixture", fixture_id.to_string())])
            .await
    }
}

// ---------------------------------------------------------------------------
// League scan
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchStats {
    pub listed: usize,
    pub skipped_no_id: usize,
    pub skipped_no_teams: usize,
    pub skipped_stats_error: usize,
    pub normalized: usize,
}

enum Skip {
    NoId,
    NoTeams,
    Stats(String, AppError),
}

/// Fetch and normalize every fixture of one league on `date`.
///
/// An `Err` means the league listing itself failed. Per-fixture failures are
/// logged and the fixture is dropped; provider order is preserved.
pub async fn fetch_candidates(
    source: &dyn FixtureSource,
    league: &League,
    date: NaiveDate,
    tz: Tz,
    concurrency: usize,
) -> Result<(Vec<CanonicalFixture>, FetchStats)> {
    let raw = source.list_fixtures(league.id, date).await?;

    let mut stats = FetchStats {
        listed: raw.len(),
        ..FetchStats::default()
    };

    let results: Vec<std::result::Result<CanonicalFixture, Skip>> = stream::iter(raw.iter())
        .map(|item| normalize_fixture(source, item, date, tz))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut fixtures = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(fixture) => fixtures.push(fixture),
            Err(Skip::NoId) => stats.skipped_no_id += 1,
            Err(Skip::NoTeams) => stats.skipped_no_teams += 1,
            Err(Skip::Stats(id, e)) => {
                stats.skipped_stats_error += 1;
                warn!(
                    league = %league.name,
                    fixture_id = %id,
                    "[FETCH] statistics lookup failed for fixture {id}, skipping: {e}"
                );
            }
        }
    }
    stats.normalized = fixtures.len();

    Ok((fixtures, stats))
}

async fn normalize_fixture(
    source: &dyn FixtureSource,
    raw: &Value,
    date: NaiveDate,
    tz: Tz,
) -> std::result::Result<CanonicalFixture, Skip> {
    let Some(id) = parse_fixture_id(raw).map(FixtureIdShape::into_id) else {
        debug!("[FETCH] fixture without an id, skipping");
        return Err(Skip::NoId);
    };
    let Some((home, away)) = parse_team_names(raw) else {
        debug!(fixture_id = %id, "[FETCH] fixture without team names, skipping");
        return Err(Skip::NoTeams);
    };
    let kickoff_date = parse_kickoff_date(raw, tz).unwrap_or(date);

    let stats_body = match source.fixture_statistics(&id).await {
        Ok(body) => body,
        Err(e) => return Err(Skip::Stats(id, e)),
    };
    let (home_sot, away_sot) = parse_shots_on_target(&stats_body, &home, &away);

    let mut odds = extract_home_odds(raw, BOOKMAKER);
    // Only spend a provider call on odds when the stats could still qualify.
    if odds.is_none() && home_sot.is_some() && away_sot.is_some() {
        match source.fixture_odds(&id).await {
            Ok(body) => odds = extract_home_odds_from_odds_response(&body, BOOKMAKER),
            Err(e) => warn!(fixture_id = %id, "[FETCH] odds lookup failed for fixture {id}: {e}"),
        }
    }

    Ok(CanonicalFixture {
        id,
        home,
        away,
        kickoff_date,
        home_shots_on_target: home_sot,
        away_shots_on_target: away_sot,
        home_win_odds: odds,
    })
}

// ---------------------------------------------------------------------------
// Shape parsers
// ---------------------------------------------------------------------------

/// Where the provider put the fixture identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureIdShape {
    /// `{"fixture": {"id": ...}}`
    Nested(String),
    /// `{"id": ...}`
    Flat(String),
}

impl FixtureIdShape {
    pub fn into_id(self) -> String {
        match self {
            FixtureIdShape::Nested(id) | FixtureIdShape::Flat(id) => id,
        }
    }
}

pub fn parse_fixture_id(v: &Value) -> Option<FixtureIdShape> {
    if let Some(id) = v.get("fixture").and_then(|f| f.get("id")).and_then(id_string) {
        return Some(FixtureIdShape::Nested(id));
    }
    v.get("id").and_then(id_string).map(FixtureIdShape::Flat)
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

pub fn parse_team_names(v: &Value) -> Option<(String, String)> {
    let teams = v.get("teams")?;
    let name = |side: &str| {
        teams
            .get(side)
            .and_then(|t| t.get("name"))
            .and_then(|n| n.as_str())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    };
    Some((name("home")?, name("away")?))
}

/// Kickoff date in `tz`, from `fixture.date` (RFC 3339).
pub fn parse_kickoff_date(v: &Value, tz: Tz) -> Option<NaiveDate> {
    let s = v.get("fixture")?.get("date")?.as_str()?;
    let dt = DateTime::parse_from_rfc3339(s).ok()?;
    Some(dt.with_timezone(&tz).date_naive())
}

/// Shots on target per side from a statistics response. Sides are assigned by
/// team name, never by array position.
pub fn parse_shots_on_target(body: &Value, home: &str, away: &str) -> (Option<u32>, Option<u32>) {
    let mut hst = None;
    let mut ast = None;

    let Some(teams) = body.get("response").and_then(|r| r.as_array()) else {
        return (None, None);
    };

    for team_stat in teams {
        let team_name = team_stat
            .get("team")
            .and_then(|t| t.get("name"))
            .and_then(|n| n.as_str())
            .map(str::trim)
            .unwrap_or("");
        let slot = if team_name == home.trim() {
            &mut hst
        } else if team_name == away.trim() {
            &mut ast
        } else {
            continue;
        };

        let items = team_stat
            .get("statistics")
            .and_then(|s| s.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        for item in items {
            let label = item
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("")
                .to_lowercase();
            if !(label.contains("shots on goal") || label.contains("shots on target")) {
                continue;
            }
            if let Some(n) = item.get("value").and_then(stat_count) {
                *slot = Some(n);
            }
        }
    }

    (hst, ast)
}

/// Non-negative integer count from a number or digit string.
fn stat_count(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u32::try_from(u).ok()
            } else {
                n.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
                    .map(|f| f as u32)
            }
        }
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Where a bookmaker list can sit on a fixture object, in lookup order.
const BOOKMAKER_KEYS: &[&str] = &["odds", "bookmakers", "bookmaker"];

/// Home-win odd for `bookmaker` from a fixture object carrying inline odds.
pub fn extract_home_odds(fixture: &Value, bookmaker: &str) -> Option<f64> {
    let list = BOOKMAKER_KEYS
        .iter()
        .filter_map(|k| fixture.get(*k))
        .find(|v| is_present(v))?;
    scan_bookmakers(list.as_array()?, bookmaker)
}

/// Home-win odd for `bookmaker` from an odds endpoint body:
/// `{"response": [{"bookmakers": [...]}]}`.
pub fn extract_home_odds_from_odds_response(body: &Value, bookmaker: &str) -> Option<f64> {
    body.get("response")?
        .as_array()?
        .iter()
        .filter_map(|entry| entry.get("bookmakers").and_then(|b| b.as_array()))
        .find_map(|list| scan_bookmakers(list, bookmaker))
}

fn is_present(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn scan_bookmakers(list: &[Value], bookmaker: &str) -> Option<f64> {
    let wanted = bookmaker.to_lowercase();
    list.iter()
        .filter(|bm| {
            bookmaker_name(bm)
                .map(|n| n.to_lowercase().contains(&wanted))
                .unwrap_or(false)
        })
        .filter_map(|bm| bm.get("bets").and_then(|b| b.as_array()))
        .flatten()
        .filter_map(|bet| bet.get("values").and_then(|v| v.as_array()))
        .flatten()
        .filter(|val| {
            matches!(
                val.get("value").and_then(|l| l.as_str()),
                Some("Home") | Some("1")
            )
        })
        .find_map(|val| val.get("odd").and_then(decimal_odd))
}

/// Bookmaker display name: nested `bookmaker.name`, then `title`, then `name`.
fn bookmaker_name(bm: &Value) -> Option<&str> {
    bm.get("bookmaker")
        .and_then(|b| b.get("name"))
        .and_then(|n| n.as_str())
        .filter(|n| !n.is_empty())
        .or_else(|| bm.get("title").and_then(|t| t.as_str()).filter(|n| !n.is_empty()))
        .or_else(|| bm.get("name").and_then(|n| n.as_str()).filter(|n| !n.is_empty()))
}

/// Decimal odd from a number or numeric string. Anything unparseable, or not
/// a valid decimal price (> 1.0), counts as absent.
fn decimal_odd(v: &Value) -> Option<f64> {
    let odd = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (odd.is_finite() && odd > 1.0).then_some(odd)
}
