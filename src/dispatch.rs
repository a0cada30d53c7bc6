use tracing::{error, info, warn};

use crate::db::pick_log::DurableLog;
use crate::dedup::Reconciler;
use crate::notify::NotificationSink;
use crate::state::{PendingLogStore, PostedStore};
use crate::types::{DeliveryOutcome, Pick};

/// Delivers one pick at a time: notification, then durable log, then the
/// posted store. Nothing here returns an error to the cycle.
pub struct Dispatcher<'a> {
    notifier: &'a dyn NotificationSink,
    log: &'a dyn DurableLog,
}

impl<'a> Dispatcher<'a> {
    pub fn new(notifier: &'a dyn NotificationSink, log: &'a dyn DurableLog) -> Self {
        Self { notifier, log }
    }

    /// Deliver a pick the reconciler classified as new.
    ///
    /// - Notification failure: stop here. No log row, no posted-store entry, so
    ///   the pick is retried next cycle.
    /// - Log failure after a successful notification: the user already has the
    ///   pick. The row is queued for backfill and the posted store is still
    ///   updated so the pick is not sent again.
    pub async fn deliver(
        &self,
        pick: &Pick,
        posted: &mut PostedStore,
        pending: &mut PendingLogStore,
        reconciler: &mut Reconciler<'_>,
    ) -> DeliveryOutcome {
        if let Err(e) = self.notifier.send(&pick.message()).await {
            warn!(
                fixture_id = %pick.fixture_id,
                "[DELIVER] failed to post {}: {e}", pick.match_label
            );
            return DeliveryOutcome::NotifyFailed;
        }

        let row = pick.log_row();
        let outcome = match self.log.append(&row).await {
            Ok(()) => {
                reconciler.note_appended(&row);
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    fixture_id = %pick.fixture_id,
                    "[DELIVER] posted {} but durable log append failed, queued for backfill: {e}",
                    pick.match_label
                );
                if let Err(e) = pending.push(row).await {
                    error!(
                        fixture_id = %pick.fixture_id,
                        "[DELIVER] could not queue log backfill for {}: {e}", pick.match_label
                    );
                }
                DeliveryOutcome::DeliveredLogPending
            }
        };

        if let Err(e) = posted.insert_and_persist(&pick.fixture_id).await {
            error!(
                fixture_id = %pick.fixture_id,
                "[DELIVER] posted {} but could not persist posted store; only the durable log guards a repost: {e}",
                pick.match_label
            );
        }

        info!(
            fixture_id = %pick.fixture_id,
            confidence = pick.confidence,
            "[DELIVER] posted {} ({}%)", pick.match_label, pick.confidence
        );
        outcome
    }

    /// Re-append rows whose earlier append failed. Rows the log already holds
    /// are dropped; rows that fail again stay queued. Returns rows appended.
    pub async fn backfill(
        &self,
        pending: &mut PendingLogStore,
        reconciler: &mut Reconciler<'_>,
    ) -> usize {
        if pending.is_empty() {
            return 0;
        }

        let mut appended = 0;
        let mut remaining = Vec::new();
        for row in pending.rows().to_vec() {
            if reconciler.remote_has(&row.date, &row.match_label).await {
                continue;
            }
            match self.log.append(&row).await {
                Ok(()) => {
                    reconciler.note_appended(&row);
                    appended += 1;
                }
                Err(e) => {
                    warn!("[BACKFILL] durable log append failed for {}: {e}", row.match_label);
                    remaining.push(row);
                }
            }
        }

        let still_pending = remaining.len();
        if let Err(e) = pending.replace(remaining).await {
            error!("[BACKFILL] could not persist pending log queue: {e}");
        }
        info!(
            appended,
            still_pending,
            "[BACKFILL] {appended} rows appended, {still_pending} still pending"
        );
        appended
    }
}
