/// Database row types for the `pick_log` table (migrations/0001_pick_log.sql).

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct PickLogRecord {
    pub id: i64,
    pub date: String,
    pub match_label: String,
    pub prediction: String,
    pub confidence: i64,
    pub result: String,
    pub fixture_id: Option<String>,
    /// Nanosecond UTC epoch of the append.
    pub logged_at: i64,
}
