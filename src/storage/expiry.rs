use chrono::{DateTime, Duration, Utc};
use std::{fmt, str::FromStr};

/// Lifetimes offered on the upload form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOption {
    ThreeHours,
    OneDay,
    OneWeek,
    /// Thirty days.
    OneMonth,
}

impl ExpiryOption {
    pub const ALL: [ExpiryOption; 4] = [
        ExpiryOption::ThreeHours,
        ExpiryOption::OneDay,
        ExpiryOption::OneWeek,
        ExpiryOption::OneMonth,
    ];

    /// Form value.
    pub fn as_str(self) -> &'static str {
        match self {
            ExpiryOption::ThreeHours => "3h",
            ExpiryOption::OneDay => "1d",
            ExpiryOption::OneWeek => "1w",
            ExpiryOption::OneMonth => "1m",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExpiryOption::ThreeHours => "3 heures",
            ExpiryOption::OneDay => "1 jour",
            ExpiryOption::OneWeek => "1 semaine",
            ExpiryOption::OneMonth => "1 mois",
        }
    }

    pub fn lifetime(self) -> Duration {
        match self {
            ExpiryOption::ThreeHours => Duration::hours(3),
            ExpiryOption::OneDay => Duration::days(1),
            ExpiryOption::OneWeek => Duration::weeks(1),
            ExpiryOption::OneMonth => Duration::days(30),
        }
    }

    pub fn deadline(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.lifetime()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownExpiry(pub String);

impl fmt::Display for UnknownExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown expiry option: {:?}", self.0)
    }
}

impl FromStr for ExpiryOption {
    type Err = UnknownExpiry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|opt| opt.as_str() == s.trim())
            .ok_or_else(|| UnknownExpiry(s.to_string()))
    }
}
