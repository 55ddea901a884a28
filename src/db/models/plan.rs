use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Subscription tier. Controls how long an issued access code stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Monthly,
    Yearly,
    Lifetime,
}

impl Plan {
    /// Parse a plan name. Matching is exact: the stored and wire forms are lowercase.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(Plan::Monthly),
            "yearly" => Some(Plan::Yearly),
            "lifetime" => Some(Plan::Lifetime),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Monthly => "monthly",
            Plan::Yearly => "yearly",
            Plan::Lifetime => "lifetime",
        }
    }

    /// Expiration for a code issued at `issued_at`; `None` means it never expires.
    pub fn expires_at(self, issued_at: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Plan::Monthly => Some(issued_at + Duration::days(30)),
            Plan::Yearly => Some(issued_at + Duration::days(365)),
            Plan::Lifetime => None,
        }
    }
}

impl From<Plan> for String {
    fn from(plan: Plan) -> Self {
        plan.as_str().to_string()
    }
}

impl TryFrom<&str> for Plan {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value).ok_or_else(|| format!("Invalid plan: {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn issued() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn monthly_expires_after_thirty_days() {
        let t = issued();
        assert_eq!(Plan::Monthly.expires_at(t), Some(t + Duration::days(30)));
    }

    #[test]
    fn yearly_expires_after_a_year() {
        let t = issued();
        assert_eq!(Plan::Yearly.expires_at(t), Some(t + Duration::days(365)));
    }

    #[test]
    fn lifetime_never_expires() {
        assert_eq!(Plan::Lifetime.expires_at(issued()), None);
    }

    #[test]
    fn parses_only_known_plans() {
        assert_eq!(Plan::from_str("monthly"), Some(Plan::Monthly));
        assert_eq!(Plan::try_from("lifetime"), Ok(Plan::Lifetime));
        assert_eq!(Plan::from_str("instant"), None);
        assert_eq!(Plan::from_str("Monthly"), None);
        assert!(Plan::try_from("weekly").is_err());
    }
}
