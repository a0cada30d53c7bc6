use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::PICK_DATE_FORMAT;

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// Provider fixture normalized into the one shape the evaluator understands.
/// `None` means the provider did not give us a usable value; it is never a zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalFixture {
    pub id: String,
    pub home: String,
    pub away: String,
    /// Kickoff date in the configured timezone.
    pub kickoff_date: NaiveDate,
    pub home_shots_on_target: Option<u32>,
    pub away_shots_on_target: Option<u32>,
    /// Home-win decimal odds from the configured bookmaker.
    pub home_win_odds: Option<f64>,
}

impl CanonicalFixture {
    pub fn match_label(&self) -> String {
        format!("{} vs {}", self.home, self.away)
    }
}

// ---------------------------------------------------------------------------
// Pick
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    HomeWin,
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prediction::HomeWin => write!(f, "Home win"),
        }
    }
}

/// A fixture that passed the filter. Never mutated after the evaluator builds it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pick {
    pub fixture_id: String,
    /// `dd-Mon-YYYY`, half of the durable-log key.
    pub date: String,
    /// `"{home} vs {away}"`, the other half of the durable-log key.
    pub match_label: String,
    pub prediction: Prediction,
    pub confidence: u8,
    pub hst: u32,
    pub ast: u32,
    pub b365h: f64,
}

impl Pick {
    pub fn format_date(date: NaiveDate) -> String {
        date.format(PICK_DATE_FORMAT).to_string()
    }

    /// Text posted to the notification channel.
    pub fn message(&self) -> String {
        format!(
            "🏟 Strategy Pick (Auto)\n\
             📅 Date: {}\n\
             ⚽ Match: {}\n\
             🎯 Prediction: {}\n\
             🔥 Confidence: {}%\n\
             📊 HST: {}   AST: {}\n\
             💵 B365H: {}",
            self.date,
            self.match_label,
            self.prediction,
            self.confidence,
            self.hst,
            self.ast,
            self.b365h,
        )
    }

    pub fn log_row(&self) -> LogRow {
        LogRow {
            date: self.date.clone(),
            match_label: self.match_label.clone(),
            prediction: self.prediction.to_string(),
            confidence: i64::from(self.confidence),
            result: LogRow::PENDING.to_string(),
            fixture_id: Some(self.fixture_id.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Durable log row
// ---------------------------------------------------------------------------

/// One delivered pick as the durable log stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LogRow {
    pub date: String,
    pub match_label: String,
    pub prediction: String,
    pub confidence: i64,
    pub result: String,
    pub fixture_id: Option<String>,
}

impl LogRow {
    pub const PENDING: &'static str = "Pending";

    /// Remote-log dedup key comparison: trimmed date and match label.
    pub fn same_pick(&self, date: &str, match_label: &str) -> bool {
        self.date.trim() == date.trim() && self.match_label.trim() == match_label.trim()
    }
}

// ---------------------------------------------------------------------------
// Dedup verdicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Fixture id already in the local cache.
    SkipCached,
    /// Remote log already has (date, match); the id was added to the cache.
    SkipRemote,
    Deliver,
}

/// What happened to one DELIVER pick in the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Notified, logged, cached.
    Delivered,
    /// Notified and cached; the durable-log append failed and was queued for backfill.
    DeliveredLogPending,
    /// Notification failed; nothing else was touched.
    NotifyFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick() -> Pick {
        Pick {
            fixture_id: "1035".to_string(),
            date: "20-Oct-2026".to_string(),
            match_label: "Arsenal vs Fulham".to_string(),
            prediction: Prediction::HomeWin,
            confidence: 55,
            hst: 5,
            ast: 2,
            b365h: 2.5,
        }
    }

    #[test]
    fn date_uses_day_month_year() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        assert_eq!(Pick::format_date(d), "20-Oct-2026");
    }

    #[test]
    fn message_carries_every_field() {
        let msg = pick().message();
        assert!(msg.starts_with("🏟 Strategy Pick (Auto)"));
        assert!(msg.contains("📅 Date: 20-Oct-2026"));
        assert!(msg.contains("⚽ Match: Arsenal vs Fulham"));
        assert!(msg.contains("🎯 Prediction: Home win"));
        assert!(msg.contains("🔥 Confidence: 55%"));
        assert!(msg.contains("📊 HST: 5   AST: 2"));
        assert!(msg.contains("💵 B365H: 2.5"));
    }

    #[test]
    fn log_row_starts_pending() {
        let row = pick().log_row();
        assert_eq!(row.result, "Pending");
        assert_eq!(row.prediction, "Home win");
        assert_eq!(row.confidence, 55);
        assert_eq!(row.fixture_id.as_deref(), Some("1035"));
    }

    #[test]
    fn same_pick_trims_whitespace() {
        let row = pick().log_row();
        assert!(row.same_pick(" 20-Oct-2026 ", "Arsenal vs Fulham  "));
        assert!(!row.same_pick("20-Oct-2026", "Arsenal vs Chelsea"));
        assert!(!row.same_pick("21-Oct-2026", "Arsenal vs Fulham"));
    }
}
