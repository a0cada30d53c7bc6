use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::config::{Config, League};
use crate::fetcher::{fetch_candidates, FixtureSource};
use crate::scorer::evaluate;
use crate::types::Pick;

/// Runs the fixture source over every configured league and keeps the
/// fixtures that pass the filter.
pub struct PickGenerator {
    source: Arc<dyn FixtureSource>,
    leagues: Vec<League>,
    timezone: Tz,
    concurrency: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub leagues_ok: usize,
    pub leagues_failed: usize,
    pub fixtures: usize,
    pub picks: usize,
}

impl PickGenerator {
    pub fn new(cfg: &Config, source: Arc<dyn FixtureSource>) -> Self {
        Self {
            source,
            leagues: cfg.leagues.clone(),
            timezone: cfg.timezone,
            concurrency: cfg.fetch_concurrency,
        }
    }

    /// Picks for `date`, leagues in configuration order, each league's picks in
    /// provider order. A league that cannot be listed contributes nothing.
    /// No cross-league dedup here; the reconciler owns that.
    pub async fn generate(&self, date: NaiveDate) -> (Vec<Pick>, GenerateReport) {
        let mut picks = Vec::new();
        let mut report = GenerateReport::default();

        for league in &self.leagues {
            let (fixtures, stats) = match fetch_candidates(
                self.source.as_ref(),
                league,
                date,
                self.timezone,
                self.concurrency,
            )
            .await
            {
                Ok(r) => r,
                Err(e) => {
                    report.leagues_failed += 1;
                    warn!(
                        league_id = league.id,
                        "[GENERATE] failed to fetch fixtures for {} (id {}): {e}",
                        league.name,
                        league.id
                    );
                    continue;
                }
            };
            report.leagues_ok += 1;
            report.fixtures += fixtures.len();

            let before = picks.len();
            picks.extend(fixtures.iter().filter_map(evaluate));

            info!(
                league_id = league.id,
                listed = stats.listed,
                normalized = stats.normalized,
                picks = picks.len() - before,
                "[GENERATE] {}: {} fixtures listed, {} usable, {} picks",
                league.name,
                stats.listed,
                stats.normalized,
                picks.len() - before,
            );
        }

        report.picks = picks.len();
        (picks, report)
    }
}
