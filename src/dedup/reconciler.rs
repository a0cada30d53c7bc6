use tracing::{debug, info, warn};

use crate::db::pick_log::DurableLog;
use crate::state::PostedStore;
use crate::types::{LogRow, Pick, Verdict};

/// Decides whether a candidate pick was already delivered, using two
/// independent oracles combined with OR:
///
/// 1. the local posted store, keyed by fixture id (fast path);
/// 2. the durable log, keyed by trimmed (date, match label).
///
/// The two keys differ. A fixture id can be rescheduled under a new date and a
/// (date, match) pair can repeat across distinct fixture ids, so the stores can
/// disagree in both directions.
///
/// Failure policy: if the durable log cannot be read, the remote oracle answers
/// "not seen" for the rest of the cycle. Availability wins over strict
/// duplicate prevention; a pick whose id is missing from the local store can be
/// delivered twice while the log is unreadable.
///
/// Built fresh for every cycle. The log is read at most once per cycle, on the
/// first pick that misses the local store.
pub struct Reconciler<'a> {
    remote: &'a dyn DurableLog,
    snapshot: Option<Vec<LogRow>>,
}

impl<'a> Reconciler<'a> {
    pub fn new(remote: &'a dyn DurableLog) -> Self {
        Self { remote, snapshot: None }
    }

    pub async fn classify(&mut self, posted: &mut PostedStore, pick: &Pick) -> Verdict {
        if posted.contains(&pick.fixture_id) {
            debug!(
                fixture_id = %pick.fixture_id,
                "[DEDUP] skip {} ({}): already posted", pick.match_label, pick.fixture_id
            );
            return Verdict::SkipCached;
        }

        if self.remote_has(&pick.date, &pick.match_label).await {
            // Self-heal: next cycle takes the fast path.
            if let Err(e) = posted.insert_and_persist(&pick.fixture_id).await {
                warn!(
                    fixture_id = %pick.fixture_id,
                    "[DEDUP] failed to record {} in posted store: {e}", pick.fixture_id
                );
            }
            info!(
                fixture_id = %pick.fixture_id,
                "[DEDUP] skip {}: durable log already has it, posted store repaired",
                pick.match_label
            );
            return Verdict::SkipRemote;
        }

        Verdict::Deliver
    }

    /// Whether the durable log holds a row for (date, match). Loads the
    /// snapshot on first use.
    pub async fn remote_has(&mut self, date: &str, match_label: &str) -> bool {
        self.rows()
            .await
            .iter()
            .any(|row| row.same_pick(date, match_label))
    }

    /// Make a row appended this cycle visible to later lookups in the same cycle.
    pub fn note_appended(&mut self, row: &LogRow) {
        if let Some(rows) = self.snapshot.as_mut() {
            rows.push(row.clone());
        }
    }

    async fn rows(&mut self) -> &[LogRow] {
        if self.snapshot.is_none() {
            let rows = match self.remote.query_all().await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!("[DEDUP] durable log unreadable, treating every pick as unseen this cycle: {e}");
                    Vec::new()
                }
            };
            self.snapshot = Some(rows);
        }
        self.snapshot.as_deref().unwrap_or_default()
    }
}
