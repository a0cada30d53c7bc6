use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::health::HealthState;
use crate::config::Config;
use crate::db::pick_log::DurableLog;
use crate::dedup::Reconciler;
use crate::dispatch::Dispatcher;
use crate::generator::PickGenerator;
use crate::notify::NotificationSink;
use crate::state::{PendingLogStore, PostedStore};
use crate::types::{DeliveryOutcome, Pick, Verdict};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub candidates: usize,
    pub skipped_cached: usize,
    pub skipped_remote: usize,
    pub delivered: usize,
    pub log_pending: usize,
    pub notify_failed: usize,
    pub backfilled: usize,
    pub backfill_pending: usize,
}

/// Drives the generate, reconcile and dispatch pass on a fixed interval.
///
/// Every cycle reloads the posted store from disk and builds its own
/// reconciler, so cycles share no in-memory dedup state.
pub struct PollLoop {
    cfg: Config,
    generator: PickGenerator,
    notifier: Arc<dyn NotificationSink>,
    log: Arc<dyn DurableLog>,
    health: Arc<HealthState>,
}

impl PollLoop {
    pub fn new(
        cfg: Config,
        generator: PickGenerator,
        notifier: Arc<dyn NotificationSink>,
        log: Arc<dyn DurableLog>,
        health: Arc<HealthState>,
    ) -> Self {
        Self { cfg, generator, notifier, log, health }
    }

    /// Run cycles until `shutdown` resolves. The first cycle starts
    /// immediately. A shutdown during a cycle drops it at the current await
    /// point; the posted store only ever holds fully delivered picks.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let mut ticker = interval(self.cfg.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("[CYCLE] shutdown requested, poll loop stopping");
                    return;
                }
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("[CYCLE] shutdown requested mid-cycle, abandoning current cycle");
                    self.health.set_cycle_running(false);
                    return;
                }
                _ = self.run_cycle() => {}
            }
        }
    }

    /// One full pass for the current target date. Never fails: every problem
    /// is logged and the affected unit skipped.
    pub async fn run_cycle(&self) -> CycleReport {
        self.health.set_cycle_running(true);
        let report = self.cycle(self.target_date()).await;
        self.health.set_cycle_running(false);
        self.health.record_cycle(&report, now_ns());

        info!(
            candidates = report.candidates,
            delivered = report.delivered + report.log_pending,
            skipped_cached = report.skipped_cached,
            skipped_remote = report.skipped_remote,
            notify_failed = report.notify_failed,
            backfilled = report.backfilled,
            backfill_pending = report.backfill_pending,
            "[CYCLE] done: {} candidates, {} delivered, {} skipped, {} failed",
            report.candidates,
            report.delivered + report.log_pending,
            report.skipped_cached + report.skipped_remote,
            report.notify_failed,
        );
        report
    }

    async fn cycle(&self, date: NaiveDate) -> CycleReport {
        let mut report = CycleReport::default();
        info!(target_date = %date, "[CYCLE] running strategy for {date}");

        // An unreadable store (I/O, not bad JSON) ends the cycle: delivering
        // blind would repost everything.
        let mut posted = match PostedStore::load(&self.cfg.posted_store).await {
            Ok(s) => s,
            Err(e) => {
                error!("[CYCLE] cannot read posted store {}: {e}", self.cfg.posted_store.display());
                return report;
            }
        };
        let mut pending = match PendingLogStore::load(&self.cfg.pending_store).await {
            Ok(s) => s,
            Err(e) => {
                error!("[CYCLE] cannot read pending log queue {}: {e}", self.cfg.pending_store.display());
                return report;
            }
        };

        debug!(
            posted = posted.len(),
            pending = pending.rows().len(),
            "[CYCLE] stores loaded"
        );

        let mut reconciler = Reconciler::new(self.log.as_ref());
        let dispatcher = Dispatcher::new(self.notifier.as_ref(), self.log.as_ref());

        report.backfilled = dispatcher.backfill(&mut pending, &mut reconciler).await;

        let (picks, _) = self.generator.generate(date).await;
        report.candidates = picks.len();
        if picks.is_empty() {
            info!("[CYCLE] no picks generated at this run");
            report.backfill_pending = pending.rows().len();
            return report;
        }

        for pick in &picks {
            match reconciler.classify(&mut posted, pick).await {
                Verdict::SkipCached => report.skipped_cached += 1,
                Verdict::SkipRemote => report.skipped_remote += 1,
                Verdict::Deliver => {
                    match dispatcher
                        .deliver(pick, &mut posted, &mut pending, &mut reconciler)
                        .await
                    {
                        DeliveryOutcome::Delivered => report.delivered += 1,
                        DeliveryOutcome::DeliveredLogPending => report.log_pending += 1,
                        DeliveryOutcome::NotifyFailed => report.notify_failed += 1,
                    }
                }
            }
        }

        report.backfill_pending = pending.rows().len();
        report
    }

    /// Generate and log picks for the target date without delivering them or
    /// touching either dedup store.
    pub async fn preview(&self) -> Vec<Pick> {
        let date = self.target_date();
        let (picks, report) = self.generator.generate(date).await;
        if picks.is_empty() {
            info!(target_date = %date, "[PREVIEW] no picks for {date}");
        }
        for pick in &picks {
            info!(
                fixture_id = %pick.fixture_id,
                confidence = pick.confidence,
                hst = pick.hst,
                ast = pick.ast,
                b365h = pick.b365h,
                "[PREVIEW] {} | {} | {} | {}%",
                pick.date,
                pick.match_label,
                pick.prediction,
                pick.confidence,
            );
        }
        info!(
            leagues_ok = report.leagues_ok,
            leagues_failed = report.leagues_failed,
            "[PREVIEW] {} picks from {} fixtures", report.picks, report.fixtures
        );
        picks
    }

    fn target_date(&self) -> NaiveDate {
        target_date(Utc::now(), self.cfg.timezone, self.cfg.target_day_offset)
    }
}

/// "Today" in `tz`, shifted by `offset_days`.
pub fn target_date(now: DateTime<Utc>, tz: Tz, offset_days: i64) -> NaiveDate {
    let today = now.with_timezone(&tz).date_naive();
    today
        .checked_add_signed(chrono::Duration::days(offset_days))
        .unwrap_or(today)
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
