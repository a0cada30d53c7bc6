use crate::config::filter::{MAX_HOME_ODDS, MIN_AWAY_SOT, MIN_HOME_ODDS, MIN_HOME_SOT, MIN_SOT_RATIO};
use crate::types::{CanonicalFixture, Pick, Prediction};

pub const CONFIDENCE_MIN: u8 = 40;
pub const CONFIDENCE_MAX: u8 = 95;

/// Apply the home-dominance filter to one fixture. Pure: same fixture in,
/// same pick (including confidence) out.
///
/// Rejected when shots on target are missing on either side, away SOT < 1,
/// home SOT < 4, home/away SOT ratio < 2.5, or the bookmaker home price is
/// missing or outside [2.0, 3.5].
pub fn evaluate(fixture: &CanonicalFixture) -> Option<Pick> {
    let hst = fixture.home_shots_on_target?;
    let ast = fixture.away_shots_on_target?;
    let b365h = fixture.home_win_odds?;

    if ast < MIN_AWAY_SOT || hst < MIN_HOME_SOT {
        return None;
    }
    // ast >= 1 here, so the ratio is always defined.
    let ratio = f64::from(hst) / f64::from(ast);
    if ratio < MIN_SOT_RATIO {
        return None;
    }
    if !(MIN_HOME_ODDS..=MAX_HOME_ODDS).contains(&b365h) {
        return None;
    }

    Some(Pick {
        fixture_id: fixture.id.clone(),
        date: Pick::format_date(fixture.kickoff_date),
        match_label: fixture.match_label(),
        prediction: Prediction::HomeWin,
        confidence: confidence(hst, ratio, b365h),
        hst,
        ast,
        b365h,
    })
}

/// Heuristic confidence, not a probability.
///
/// 50, plus up to 20 for home SOT above 4, plus up to 20 for the ratio above
/// 2.5, plus `floor((3.25 - odds) * 3)` (negative for long prices). The sum is
/// clamped to [40, 95] and truncated.
pub fn confidence(hst: u32, ratio: f64, b365h: f64) -> u8 {
    let sot_bonus = ((f64::from(hst) - 4.0) * 3.0).clamp(0.0, 20.0);
    let ratio_bonus = ((ratio - MIN_SOT_RATIO) * 8.0).clamp(0.0, 20.0);
    let odds_adjustment = ((3.25 - b365h) * 3.0).floor();

    let raw = 50.0 + sot_bonus + ratio_bonus + odds_adjustment;
    raw.clamp(f64::from(CONFIDENCE_MIN), f64::from(CONFIDENCE_MAX)) as u8
}
