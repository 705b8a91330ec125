use super::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Per-day counter names. The event vocabulary maps event types onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyMetric {
    Dials,
    Connects,
    #[serde(rename = "calls_under_30s")]
    CallsUnder30s,
    #[serde(rename = "calls_over_2min")]
    CallsOver2Min,
    Appointments,
    Shows,
    Deals,
    SmsEnrollments,
}

impl DailyMetric {
    pub const ALL: [Self; 8] = [
        Self::Dials,
        Self::Connects,
        Self::CallsUnder30s,
        Self::CallsOver2Min,
        Self::Appointments,
        Self::Shows,
        Self::Deals,
        Self::SmsEnrollments,
    ];

    /// Column name in `daily_metrics`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dials => "dials",
            Self::Connects => "connects",
            Self::CallsUnder30s => "calls_under_30s",
            Self::CallsOver2Min => "calls_over_2min",
            Self::Appointments => "appointments",
            Self::Shows => "shows",
            Self::Deals => "deals",
            Self::SmsEnrollments => "sms_enrollments",
        }
    }
}

impl fmt::Display for DailyMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DailyMetric {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("daily metric", s))
    }
}

/// Counters for one user on one day, or a sum over several days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub dials: u64,
    pub connects: u64,
    pub calls_under_30s: u64,
    pub calls_over_2min: u64,
    pub appointments: u64,
    pub shows: u64,
    pub deals: u64,
    pub sms_enrollments: u64,
}

impl DailyMetrics {
    #[must_use]
    pub const fn get(&self, metric: DailyMetric) -> u64 {
        match metric {
            DailyMetric::Dials => self.dials,
            DailyMetric::Connects => self.connects,
            DailyMetric::CallsUnder30s => self.calls_under_30s,
            DailyMetric::CallsOver2Min => self.calls_over_2min,
            DailyMetric::Appointments => self.appointments,
            DailyMetric::Shows => self.shows,
            DailyMetric::Deals => self.deals,
            DailyMetric::SmsEnrollments => self.sms_enrollments,
        }
    }

    /// Field-wise sum.
    #[must_use]
    pub const fn plus(self, other: &Self) -> Self {
        Self {
            dials: self.dials + other.dials,
            connects: self.connects + other.connects,
            calls_under_30s: self.calls_under_30s + other.calls_under_30s,
            calls_over_2min: self.calls_over_2min + other.calls_over_2min,
            appointments: self.appointments + other.appointments,
            shows: self.shows + other.shows,
            deals: self.deals + other.deals,
            sms_enrollments: self.sms_enrollments + other.sms_enrollments,
        }
    }
}

impl<'a> std::iter::Sum<&'a Self> for DailyMetrics {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, day| acc.plus(day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_round_trip() {
        for metric in DailyMetric::ALL {
            assert_eq!(metric.as_str().parse::<DailyMetric>().ok(), Some(metric));
            let json = serde_json::to_string(&metric).expect("serialize");
            assert_eq!(json, format!("\"{}\"", metric.as_str()));
        }
        assert!("calls".parse::<DailyMetric>().is_err());
    }

    #[test]
    fn sum_adds_field_wise() {
        let days = [
            DailyMetrics {
                dials: 40,
                connects: 10,
                ..DailyMetrics::default()
            },
            DailyMetrics {
                dials: 60,
                appointments: 2,
                ..DailyMetrics::default()
            },
        ];
        let total: DailyMetrics = days.iter().sum();
        assert_eq!(total.dials, 100);
        assert_eq!(total.get(DailyMetric::Connects), 10);
        assert_eq!(total.appointments, 2);
    }
}
