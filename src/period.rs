use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Calendar granularity used for range decomposition and bucket naming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

/// Granularities the rollup job can write aggregates for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RollupPeriod {
    Week,
    Month,
    Year,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown period '{value}', expected one of {expected}")]
pub struct UnknownPeriod {
    pub value: String,
    pub expected: &'static str,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Day, Period::Week, Period::Month, Period::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "DAY",
            Period::Week => "WEEK",
            Period::Month => "MONTH",
            Period::Year => "YEAR",
        }
    }
}

impl RollupPeriod {
    pub const ALL: [RollupPeriod; 3] = [RollupPeriod::Week, RollupPeriod::Month, RollupPeriod::Year];

    pub fn as_str(&self) -> &'static str {
        Period::from(*self).as_str()
    }
}

impl From<RollupPeriod> for Period {
    fn from(period: RollupPeriod) -> Self {
        match period {
            RollupPeriod::Week => Period::Week,
            RollupPeriod::Month => Period::Month,
            RollupPeriod::Year => Period::Year,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RollupPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = UnknownPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPeriod {
                value: s.to_string(),
                expected: "DAY, WEEK, MONTH, YEAR",
            })
    }
}

impl FromStr for RollupPeriod {
    type Err = UnknownPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RollupPeriod::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPeriod {
                value: s.to_string(),
                expected: "WEEK, MONTH, YEAR",
            })
    }
}
