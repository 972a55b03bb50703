use serde::Serialize;

pub const DEFAULT_LOYALTY_CYCLE: i64 = 9;

/// Read-only view of an account's position in the reward cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyProgress {
    pub mixes_completed: i64,
    pub cycle_length: i64,
    pub cycle_progress: i64,
    pub percent: f64,
}

impl LoyaltyProgress {
    /// A missing loyalty row counts as zero mixes.
    pub fn new(mixes_completed: Option<i64>, cycle_length: i64) -> Self {
        let mixes_completed = mixes_completed.unwrap_or(0).max(0);
        let cycle_length = cycle_length.max(1);
        let cycle_progress = mixes_completed % cycle_length;
        let percent = (cycle_progress as f64 / cycle_length as f64 * 100.0).min(100.0);

        Self {
            mixes_completed,
            cycle_length,
            cycle_progress,
            percent,
        }
    }
}
