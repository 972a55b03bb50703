use chrono::{Months, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Referral {
    pub id: String,
    pub referrer_id: String,
    pub referred_email: String,
    pub referred_user_id: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct ReferralActivity {
    pub referral_id: String,
    pub referred_projects_completed: i32,
    pub last_project_completed_at: Option<NaiveDateTime>,
}

/// A referral joined with its activity, as read for eligibility checks.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ReferralStanding {
    pub referral_id: String,
    pub created_at: NaiveDateTime,
    pub referred_projects_completed: i32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReferral {
    pub referred_email: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReferredCompletion {
    pub count: i32,
}

/// Free-master reward rule: a full loyalty cycle plus at least one recent
/// referral whose referred account has completed enough projects.
#[derive(Clone, Debug)]
pub struct EligibilityRule {
    pub loyalty_threshold: i64,
    pub window_months: u32,
    pub completions_required: i32,
}

impl Default for EligibilityRule {
    fn default() -> Self {
        Self {
            loyalty_threshold: 9,
            window_months: 3,
            completions_required: 3,
        }
    }
}

impl EligibilityRule {
    /// Earliest referral creation time that still counts, in calendar months.
    pub fn window_start(&self, now: NaiveDateTime) -> NaiveDateTime {
        now.checked_sub_months(Months::new(self.window_months))
            .unwrap_or(NaiveDateTime::MIN)
    }

    pub fn meets_loyalty(&self, mixes_completed: Option<i64>) -> bool {
        mixes_completed.unwrap_or(0) >= self.loyalty_threshold
    }

    pub fn has_qualifying_referral(
        &self,
        referrals: &[ReferralStanding],
        now: NaiveDateTime,
    ) -> bool {
        let window_start = self.window_start(now);

        referrals.iter().any(|referral| {
            referral.created_at >= window_start
                && referral.referred_projects_completed >= self.completions_required
        })
    }

    pub fn is_eligible(
        &self,
        mixes_completed: Option<i64>,
        referrals: &[ReferralStanding],
        now: NaiveDateTime,
    ) -> bool {
        self.meets_loyalty(mixes_completed) && self.has_qualifying_referral(referrals, now)
    }
}
