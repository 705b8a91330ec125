//! Cumulative XP to level mapping.
//!
//! A level table is an ascending list of XP thresholds starting at 0. Level
//! `n` is reached once total XP meets `thresholds[n - 1]`; the table length is
//! the maximum level.

use crate::config::CatalogError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    thresholds: Vec<i64>,
}

/// Where a total sits inside its current level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelProgress {
    pub level: u32,
    pub xp_progress: i64,
    pub xp_to_next_level: i64,
    pub percent: f64,
    pub is_max_level: bool,
}

impl LevelTable {
    /// Build a table, rejecting empty, non-zero-based or non-ascending input.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidThresholds`] describing the first
    /// violation found.
    pub fn new(thresholds: Vec<i64>) -> Result<Self, CatalogError> {
        match thresholds.first() {
            None => {
                return Err(CatalogError::InvalidThresholds(
                    "threshold table is empty".to_string(),
                ));
            }
            Some(&first) if first != 0 => {
                return Err(CatalogError::InvalidThresholds(format!(
                    "first threshold must be 0, got {first}"
                )));
            }
            Some(_) => {}
        }
        if let Some(pair) = thresholds.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(CatalogError::InvalidThresholds(format!(
                "thresholds must strictly ascend, found {} then {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self { thresholds })
    }

    #[must_use]
    pub fn thresholds(&self) -> &[i64] {
        &self.thresholds
    }

    #[must_use]
    pub fn max_level(&self) -> u32 {
        to_level(self.thresholds.len())
    }

    /// Level for a cumulative total. Totals below zero sit at level 1.
    #[must_use]
    pub fn level_for(&self, total_xp: i64) -> u32 {
        let reached = self.thresholds.partition_point(|&t| t <= total_xp);
        to_level(reached.max(1))
    }

    /// XP required to enter `level`; clamps to the table bounds.
    #[must_use]
    pub fn threshold_for(&self, level: u32) -> i64 {
        let idx = usize::try_from(level.saturating_sub(1)).unwrap_or(usize::MAX);
        let idx = idx.min(self.thresholds.len() - 1);
        self.thresholds[idx]
    }

    #[must_use]
    pub fn progress(&self, total_xp: i64) -> LevelProgress {
        let level = self.level_for(total_xp);
        let floor = self.threshold_for(level);
        let next = self.threshold_for(level.saturating_add(1));
        let xp_progress = total_xp - floor;
        let xp_to_next_level = next - floor;
        let is_max_level = level >= self.max_level();
        #[allow(clippy::cast_precision_loss)]
        let percent = if is_max_level || xp_to_next_level <= 0 {
            100.0
        } else {
            (xp_progress as f64 / xp_to_next_level as f64 * 100.0).clamp(0.0, 100.0)
        };
        LevelProgress {
            level,
            xp_progress,
            xp_to_next_level,
            percent,
            is_max_level,
        }
    }
}

fn to_level(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn short_table() -> LevelTable {
        LevelTable::new(vec![0, 100, 250, 500, 850]).expect("valid table")
    }

    #[test]
    fn levels_follow_thresholds() {
        let table = short_table();
        assert_eq!(table.level_for(0), 1);
        assert_eq!(table.level_for(99), 1);
        assert_eq!(table.level_for(100), 2);
        assert_eq!(table.level_for(500), 4);
        assert_eq!(table.level_for(610), 4);
        assert_eq!(table.level_for(850), 5);
        assert_eq!(table.level_for(1_000_000), 5);
    }

    #[test]
    fn negative_totals_clamp_to_level_one() {
        assert_eq!(short_table().level_for(-40), 1);
    }

    #[test]
    fn progress_inside_a_level() {
        let progress = short_table().progress(610);
        assert_eq!(progress.level, 4);
        assert_eq!(progress.xp_progress, 110);
        assert_eq!(progress.xp_to_next_level, 350);
        assert!((progress.percent - 110.0 / 350.0 * 100.0).abs() < 1e-9);
        assert!(!progress.is_max_level);
    }

    #[test]
    fn progress_is_full_at_max_level() {
        let progress = short_table().progress(900);
        assert_eq!(progress.level, 5);
        assert_eq!(progress.xp_progress, 50);
        assert_eq!(progress.xp_to_next_level, 0);
        assert!((progress.percent - 100.0).abs() < f64::EPSILON);
        assert!(progress.is_max_level);
    }

    #[test]
    fn rejects_bad_tables() {
        assert!(LevelTable::new(vec![]).is_err());
        assert!(LevelTable::new(vec![10, 100]).is_err());
        assert!(LevelTable::new(vec![0, 100, 100]).is_err());
        assert!(LevelTable::new(vec![0, 250, 100]).is_err());
    }

    proptest! {
        #[test]
        fn prop_level_is_monotonic(a in 0i64..200_000, b in 0i64..200_000) {
            let table = short_table();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(table.level_for(lo) <= table.level_for(hi));
        }

        #[test]
        fn prop_level_depends_only_on_total(parts in proptest::collection::vec(0i64..500, 1..10)) {
            let table = short_table();
            let total: i64 = parts.iter().sum();
            let mut running = 0;
            let mut level = table.level_for(running);
            for part in &parts {
                running += part;
                let next = table.level_for(running);
                prop_assert!(next >= level);
                level = next;
            }
            prop_assert_eq!(level, table.level_for(total));
        }

        #[test]
        fn prop_percent_in_range(total in -100i64..5_000) {
            let percent = short_table().progress(total).percent;
            prop_assert!((0.0..=100.0).contains(&percent));
        }
    }
}
