//! Efficiency rates over a window of daily metrics.
//!
//! Rates feed both the rank gate's efficiency requirement and badge
//! evaluation. Until a rep has logged enough dials the per-rate tiers read
//! `ramp` instead of pass/fail.

use crate::model::metrics::DailyMetrics;
use serde::Serialize;
use std::collections::BTreeMap;

pub const SUB_30S_DROP_RATE: &str = "sub_30s_drop_rate";
pub const CALL_TO_APPT_RATE: &str = "call_to_appt_rate";
pub const TWO_PLUS_MIN_RATE: &str = "two_plus_min_rate";
pub const SHOW_RATE: &str = "show_rate";
pub const SMS_ENROLLMENT_RATE: &str = "sms_enrollment_rate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EfficiencyTier {
    Ramp,
    Unsatisfactory,
    Satisfactory,
    Above,
    Elite,
}

impl EfficiencyTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ramp => "ramp",
            Self::Unsatisfactory => "unsatisfactory",
            Self::Satisfactory => "satisfactory",
            Self::Above => "above",
            Self::Elite => "elite",
        }
    }
}

/// Tier cut-offs for one rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateThresholds {
    pub elite: f64,
    pub above: f64,
    pub satisfactory: f64,
    pub lower_is_better: bool,
}

impl RateThresholds {
    #[must_use]
    pub fn tier(&self, value: f64) -> EfficiencyTier {
        let meets = |threshold: f64| {
            if self.lower_is_better {
                value <= threshold
            } else {
                value >= threshold
            }
        };
        if meets(self.elite) {
            EfficiencyTier::Elite
        } else if meets(self.above) {
            EfficiencyTier::Above
        } else if meets(self.satisfactory) {
            EfficiencyTier::Satisfactory
        } else {
            EfficiencyTier::Unsatisfactory
        }
    }
}

/// Built-in cut-offs, one entry per reported rate.
pub const RATE_THRESHOLDS: [(&str, RateThresholds); 5] = [
    (
        SUB_30S_DROP_RATE,
        RateThresholds { elite: 0.35, above: 0.50, satisfactory: 0.70, lower_is_better: true },
    ),
    (
        CALL_TO_APPT_RATE,
        RateThresholds { elite: 0.067, above: 0.05, satisfactory: 0.02, lower_is_better: false },
    ),
    (
        TWO_PLUS_MIN_RATE,
        RateThresholds { elite: 0.35, above: 0.26, satisfactory: 0.15, lower_is_better: false },
    ),
    (
        SHOW_RATE,
        RateThresholds { elite: 0.85, above: 0.76, satisfactory: 0.60, lower_is_better: false },
    ),
    (
        SMS_ENROLLMENT_RATE,
        RateThresholds { elite: 0.05, above: 0.03, satisfactory: 0.01, lower_is_better: false },
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyReport {
    pub window_days: u32,
    pub days_with_data: usize,
    pub totals: DailyMetrics,
    /// Empty when the window holds no data at all.
    pub rates: BTreeMap<String, f64>,
    pub tiers: BTreeMap<String, EfficiencyTier>,
    pub is_ramp_period: bool,
    /// Percent of the way to leaving the ramp period, capped at 100.
    pub ramp_progress: f64,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Fold a window of daily counters into rates and tiers.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn report(days: &[DailyMetrics], window_days: u32, ramp_min_dials: u64) -> EfficiencyReport {
    let totals: DailyMetrics = days.iter().sum();
    let is_ramp_period = totals.dials < ramp_min_dials;
    let ramp_progress = if ramp_min_dials == 0 {
        100.0
    } else {
        (totals.dials as f64 / ramp_min_dials as f64 * 100.0).min(100.0)
    };

    let mut rates = BTreeMap::new();
    let mut tiers = BTreeMap::new();
    if !days.is_empty() {
        rates.insert(SUB_30S_DROP_RATE.to_string(), ratio(totals.calls_under_30s, totals.connects));
        rates.insert(CALL_TO_APPT_RATE.to_string(), ratio(totals.appointments, totals.connects));
        rates.insert(TWO_PLUS_MIN_RATE.to_string(), ratio(totals.calls_over_2min, totals.connects));
        rates.insert(SHOW_RATE.to_string(), ratio(totals.shows, totals.appointments));
        rates.insert(SMS_ENROLLMENT_RATE.to_string(), ratio(totals.sms_enrollments, totals.connects));
    }
    for (name, thresholds) in RATE_THRESHOLDS {
        let tier = match rates.get(name) {
            Some(value) if !is_ramp_period => thresholds.tier(*value),
            _ => EfficiencyTier::Ramp,
        };
        tiers.insert(name.to_string(), tier);
    }

    EfficiencyReport {
        window_days,
        days_with_data: days.len(),
        totals,
        rates,
        tiers,
        is_ramp_period,
        ramp_progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week(dials: u64, connects: u64, under_30s: u64, appointments: u64, shows: u64) -> Vec<DailyMetrics> {
        vec![DailyMetrics {
            dials,
            connects,
            calls_under_30s: under_30s,
            appointments,
            shows,
            ..DailyMetrics::default()
        }]
    }

    #[test]
    fn empty_window_is_ramp_without_rates() {
        let report = report(&[], 7, 200);
        assert!(report.is_ramp_period);
        assert!(report.rates.is_empty());
        assert!((report.ramp_progress - 0.0).abs() < f64::EPSILON);
        assert!(report.tiers.values().all(|t| *t == EfficiencyTier::Ramp));
    }

    #[test]
    fn ramp_hides_tiers_but_keeps_rates() {
        let report = report(&week(100, 40, 10, 2, 2), 7, 200);
        assert!(report.is_ramp_period);
        assert!((report.ramp_progress - 50.0).abs() < 1e-9);
        assert!((report.rates[SUB_30S_DROP_RATE] - 0.25).abs() < 1e-9);
        assert_eq!(report.tiers[SUB_30S_DROP_RATE], EfficiencyTier::Ramp);
    }

    #[test]
    fn tiers_after_ramp() {
        let report = report(&week(400, 100, 30, 6, 5), 7, 200);
        assert!(!report.is_ramp_period);
        assert!((report.ramp_progress - 100.0).abs() < f64::EPSILON);
        assert_eq!(report.tiers[SUB_30S_DROP_RATE], EfficiencyTier::Elite);
        assert_eq!(report.tiers[CALL_TO_APPT_RATE], EfficiencyTier::Above);
        assert_eq!(report.tiers[SHOW_RATE], EfficiencyTier::Above);
        assert_eq!(report.tiers[TWO_PLUS_MIN_RATE], EfficiencyTier::Unsatisfactory);
    }

    #[test]
    fn zero_denominators_give_zero_rates() {
        let report = report(&week(300, 0, 0, 0, 0), 7, 200);
        assert!((report.rates[SHOW_RATE]).abs() < f64::EPSILON);
        assert!((report.rates[CALL_TO_APPT_RATE]).abs() < f64::EPSILON);
        assert_eq!(report.tiers[SUB_30S_DROP_RATE], EfficiencyTier::Elite);
    }

    #[test]
    fn lower_is_better_boundaries() {
        let (_, sub30) = RATE_THRESHOLDS[0];
        assert_eq!(sub30.tier(0.35), EfficiencyTier::Elite);
        assert_eq!(sub30.tier(0.50), EfficiencyTier::Above);
        assert_eq!(sub30.tier(0.70), EfficiencyTier::Satisfactory);
        assert_eq!(sub30.tier(0.71), EfficiencyTier::Unsatisfactory);
    }
}
