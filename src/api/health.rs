//! Shared health state for the /health endpoint.
//! Updated by the poll loop after every cycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

use crate::poller::CycleReport;

#[derive(Default)]
pub struct HealthState {
    /// True while a cycle is in flight.
    pub cycle_running: AtomicBool,
    pub cycles_completed: AtomicU64,
    /// Nanosecond timestamp of the last finished cycle (0 = none).
    pub last_cycle_at_ns: AtomicU64,
    pub last_cycle_candidates: AtomicU64,
    pub picks_delivered: AtomicU64,
    pub picks_skipped: AtomicU64,
    pub notify_failures: AtomicU64,
    pub log_backfill_pending: AtomicU64,
}

#[derive(Debug, Serialize)]
pub struct HealthSnapshot {
    pub cycle_running: bool,
    pub cycles_completed: u64,
    pub last_cycle_at_ns: u64,
    pub last_cycle_candidates: u64,
    pub picks_delivered: u64,
    pub picks_skipped: u64,
    pub notify_failures: u64,
    pub log_backfill_pending: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cycle_running(&self, v: bool) {
        self.cycle_running.store(v, Ordering::Relaxed);
    }

    pub fn record_cycle(&self, report: &CycleReport, finished_at_ns: u64) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_at_ns.store(finished_at_ns, Ordering::Relaxed);
        self.last_cycle_candidates
            .store(report.candidates as u64, Ordering::Relaxed);
        self.picks_delivered
            .fetch_add((report.delivered + report.log_pending) as u64, Ordering::Relaxed);
        self.picks_skipped
            .fetch_add((report.skipped_cached + report.skipped_remote) as u64, Ordering::Relaxed);
        self.notify_failures
            .fetch_add(report.notify_failed as u64, Ordering::Relaxed);
        self.log_backfill_pending
            .store(report.backfill_pending as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            cycle_running: self.cycle_running.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            last_cycle_at_ns: self.last_cycle_at_ns.load(Ordering::Relaxed),
            last_cycle_candidates: self.last_cycle_candidates.load(Ordering::Relaxed),
            picks_delivered: self.picks_delivered.load(Ordering::Relaxed),
            picks_skipped: self.picks_skipped.load(Ordering::Relaxed),
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
            log_backfill_pending: self.log_backfill_pending.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_across_cycles() {
        let health = HealthState::new();
        let report = CycleReport {
            candidates: 3,
            delivered: 1,
            log_pending: 1,
            skipped_cached: 1,
            backfill_pending: 1,
            ..CycleReport::default()
        };
        health.record_cycle(&report, 42);
        health.record_cycle(&CycleReport { candidates: 1, skipped_remote: 1, ..CycleReport::default() }, 43);

        let snap = health.snapshot();
        assert_eq!(snap.cycles_completed, 2);
        assert_eq!(snap.last_cycle_at_ns, 43);
        assert_eq!(snap.last_cycle_candidates, 1);
        assert_eq!(snap.picks_delivered, 2);
        assert_eq!(snap.picks_skipped, 2);
        assert_eq!(snap.log_backfill_pending, 0);
    }
}
