//! Per-identity usage quota.
//!
//! The counter is a tiny state machine: it starts at zero, goes up by one per
//! consumed analysis, and (for daily policies) drops back to zero whenever the
//! evaluation date differs from the date of the last reset. Storage backends
//! apply the same rules atomically; this type is the reference behaviour.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::app_config::QuotaLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
}

impl Plan {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            other => Err(format!("unknown plan '{other}'")),
        }
    }
}

/// Who is asking: an authenticated user or an anonymous browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User { id: i64, plan: Plan },
    Guest { session_id: String },
}

impl Identity {
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Identity::User { id, .. } => Some(*id),
            Identity::Guest { .. } => None,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Identity::User { .. } => None,
            Identity::Guest { session_id } => Some(session_id),
        }
    }

    #[must_use]
    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest { .. })
    }

    #[must_use]
    pub fn plan(&self) -> Option<Plan> {
        match self {
            Identity::User { plan, .. } => Some(*plan),
            Identity::Guest { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub limit: u32,
    pub resets_daily: bool,
}

impl QuotaPolicy {
    #[must_use]
    pub fn for_identity(identity: &Identity, limits: &QuotaLimits) -> Self {
        match identity {
            Identity::User {
                plan: Plan::Free, ..
            } => Self {
                limit: limits.free_daily,
                resets_daily: true,
            },
            Identity::User { plan: Plan::Pro, .. } => Self {
                limit: limits.pro_daily,
                resets_daily: true,
            },
            Identity::Guest { .. } => Self {
                limit: limits.guest_lifetime,
                resets_daily: false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed { used: u32, limit: u32 },
    Denied { used: u32, limit: u32 },
}

impl QuotaDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub resets_daily: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaCounter {
    pub query_count: u32,
    pub last_reset: NaiveDate,
}

impl QuotaCounter {
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            query_count: 0,
            last_reset: today,
        }
    }

    /// Reset the count if the policy is daily and `today` is a different day.
    pub fn roll_over(&mut self, today: NaiveDate, policy: QuotaPolicy) {
        if policy.resets_daily && self.last_reset != today {
            self.query_count = 0;
            self.last_reset = today;
        }
    }

    /// Consume one unit if the limit has not been reached.
    pub fn try_consume(&mut self, today: NaiveDate, policy: QuotaPolicy) -> QuotaDecision {
        self.roll_over(today, policy);
        if self.query_count >= policy.limit {
            return QuotaDecision::Denied {
                used: self.query_count,
                limit: policy.limit,
            };
        }
        self.query_count += 1;
        QuotaDecision::Allowed {
            used: self.query_count,
            limit: policy.limit,
        }
    }

    /// Give back one unit after a failed analysis.
    pub fn refund(&mut self) {
        self.query_count = self.query_count.saturating_sub(1);
    }

    /// Usage as it would be evaluated on `today`, without mutating.
    #[must_use]
    pub fn usage(&self, today: NaiveDate, policy: QuotaPolicy) -> QuotaUsage {
        let mut view = *self;
        view.roll_over(today, policy);
        QuotaUsage {
            used: view.query_count,
            limit: policy.limit,
            remaining: policy.limit.saturating_sub(view.query_count),
            resets_daily: policy.resets_daily,
        }
    }
}
