//! The public face of the progression core.
//!
//! [`ProgressionEngine`] owns the store, the catalog and the clock. Every
//! mutating call runs one store transaction and, after it commits, publishes
//! the queued notifications, refreshes watchers and re-arms the user's sync
//! timer. A missing aggregate turns every mutation into a no-op.

use crate::badges::{self, MetricSnapshot};
use crate::boss::{self, BossDefeat};
use crate::clock::{Clock, SystemClock};
use crate::config::{Catalog, EngineConfig};
use crate::db::{Committed, Mutation, ProgressionStore, query};
use crate::efficiency::{self, EfficiencyReport};
use crate::event::InboundEvent;
use crate::gate::{self, Eligibility, EligibilityInput};
use crate::ledger::{self, XpOutcome, XpRequest};
use crate::level::LevelProgress;
use crate::model::badge::BadgeKey;
use crate::model::humanize;
use crate::model::metrics::{DailyMetric, DailyMetrics};
use crate::model::progression::{ActivityLogEntry, BossHistoryEntry, UserProgression, XpEvent};
use crate::notify::{Notification, NotificationBus};
use crate::sync::{SyncBinder, SyncScheduler};
use anyhow::Result;
use chrono::{Days, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Calls shorter than this count as early drops.
pub const SHORT_CALL: Duration = Duration::from_secs(30);
/// Calls at least this long count as real conversations.
pub const LONG_CALL: Duration = Duration::from_secs(120);

/// Rank a rep graduates into from the SDR track.
const GRADUATION_RANK: &str = "operative";
const SDR_RANK_PREFIX: &str = "sdr";

/// Aggregate plus the derived views a dashboard needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionSnapshot {
    pub progression: UserProgression,
    pub level_progress: LevelProgress,
    pub rank_name: Option<String>,
}

type Watchers = HashMap<String, watch::Sender<Option<UserProgression>>>;

pub struct ProgressionEngine {
    store: ProgressionStore,
    catalog: Arc<Catalog>,
    settings: EngineConfig,
    clock: Arc<dyn Clock>,
    bus: NotificationBus,
    watchers: Mutex<Watchers>,
    sync: Option<SyncScheduler>,
}

impl std::fmt::Debug for ProgressionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionEngine")
            .field("settings", &self.settings)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}

impl ProgressionEngine {
    #[must_use]
    pub fn new(store: ProgressionStore, catalog: Arc<Catalog>, settings: EngineConfig) -> Self {
        Self {
            store,
            catalog,
            settings,
            clock: Arc::new(SystemClock),
            bus: NotificationBus::default(),
            watchers: Mutex::new(HashMap::new()),
            sync: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Push committed changes through `binder`, debounced by
    /// `sync_debounce_ms`. Timers run on `handle`.
    #[must_use]
    pub fn with_sync(mut self, binder: Arc<dyn SyncBinder>, handle: Handle) -> Self {
        let delay = Duration::from_millis(self.settings.sync_debounce_ms);
        self.sync = Some(SyncScheduler::new(binder, delay, handle));
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    /// Listen for level, rank, badge and boss notifications of every user.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.bus.subscribe()
    }

    /// Follow one user's aggregate. The receiver holds `None` until the user
    /// is initialized and the latest committed state afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the current aggregate cannot be loaded.
    pub fn watch(&self, user_id: &str) -> Result<watch::Receiver<Option<UserProgression>>> {
        // Held across the load so a commit either lands before it or
        // publishes to the new sender.
        let mut watchers = self.watchers();
        if let Some(sender) = watchers.get(user_id) {
            return Ok(sender.subscribe());
        }
        let current = self.progression(user_id)?;
        let sender = watchers
            .entry(user_id.to_string())
            .or_insert_with(|| watch::channel(current).0);
        Ok(sender.subscribe())
    }

    fn watchers(&self) -> MutexGuard<'_, Watchers> {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_state(&self, progression: &UserProgression) {
        if let Some(sender) = self.watchers().get(&progression.user_id) {
            sender.send_replace(Some(progression.clone()));
        }
    }

    fn schedule_sync(&self, user_id: &str) {
        if let Some(sync) = &self.sync {
            sync.schedule(user_id);
        }
    }

    /// Run one transaction and fan out its effects once it has committed.
    fn mutate<T>(
        &self,
        user_id: &str,
        apply: impl FnOnce(&mut Mutation<'_>) -> Result<T>,
    ) -> Result<Option<T>> {
        let Some(committed) = self.store.mutate(user_id, self.clock.now(), apply)? else {
            debug!(user_id, "no progression for user; mutation skipped");
            return Ok(None);
        };
        let Committed {
            value,
            progression,
            changed,
            notifications,
        } = committed;

        for notification in notifications {
            self.bus.publish(notification);
        }
        if changed {
            self.publish_state(&progression);
            self.schedule_sync(user_id);
        }
        Ok(Some(value))
    }

    /// Create the default aggregate for a user. Calling it again returns the
    /// stored aggregate untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn init_progression(&self, user_id: &str, display_name: &str) -> Result<UserProgression> {
        let fresh = UserProgression::new(
            user_id,
            display_name,
            self.catalog.first_rank().id.clone(),
            self.clock.now(),
        );
        let (stored, created) = self.store.init(&fresh)?;
        if created {
            info!(user_id, rank = %stored.rank, "progression initialized");
            self.publish_state(&stored);
            self.schedule_sync(user_id);
        }
        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns an error if the aggregate cannot be read or decoded.
    pub fn progression(&self, user_id: &str) -> Result<Option<UserProgression>> {
        self.store
            .read(|conn| query::load_progression(conn, user_id))
    }

    /// # Errors
    ///
    /// Returns an error if the aggregate cannot be read or decoded.
    pub fn snapshot(&self, user_id: &str) -> Result<Option<ProgressionSnapshot>> {
        Ok(self.progression(user_id)?.map(|progression| {
            let level_progress = self.level_progress(progression.total_xp);
            let rank_name = self.catalog.rank(&progression.rank).map(|r| r.name.clone());
            ProgressionSnapshot {
                progression,
                level_progress,
                rank_name,
            }
        }))
    }

    #[must_use]
    pub fn level_progress(&self, total_xp: i64) -> LevelProgress {
        self.catalog.levels().progress(total_xp)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_users(&self) -> Result<Vec<String>> {
        self.store.read(query::list_users)
    }

    /// Award XP for an inbound event and bump its daily counter.
    ///
    /// Unknown event types without an explicit amount are rejected here with
    /// a warning and a zero outcome; no transaction is opened.
    ///
    /// # Errors
    ///
    /// Returns an error if a multiplier is invalid (see
    /// [`InboundEvent::validate`]) or the store cannot be read or written.
    pub fn ingest(&self, event: &InboundEvent) -> Result<XpOutcome> {
        event.validate()?;
        let vocabulary = self.catalog.vocabulary();
        let daily_metric = match vocabulary.resolve(&event.event_type) {
            Ok(definition) => definition.daily_metric,
            Err(unknown) if event.amount.is_none() => {
                warn!(
                    user_id = %event.user_id,
                    code = unknown.code().code(),
                    "{unknown}; awarding 0 xp"
                );
                let current = self.progression(&event.user_id)?;
                return Ok(XpOutcome::zero(current.as_ref()));
            }
            Err(_) => None,
        };

        let occurred_at = event.occurred_at.unwrap_or_else(|| self.clock.now());
        let today = self.clock.local_date(occurred_at);
        let request = XpRequest {
            event_type: &event.event_type,
            amount: event.amount,
            multipliers: &event.multipliers,
            details: event.details.as_deref(),
            occurred_at,
            today,
        };

        let outcome = self.mutate(&event.user_id, |m| {
            let outcome = ledger::append_event(m, &self.catalog, &request)?;
            if let Some(metric) = daily_metric {
                m.increment_daily_metric(today, metric, 1)?;
            }
            Ok(outcome)
        })?;
        Ok(outcome.unwrap_or_else(|| XpOutcome::zero(None)))
    }

    /// Classify a finished call by length into the daily counters. Returns
    /// whether a counter moved; mid-length calls move none.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn record_call_metrics(&self, user_id: &str, duration: Duration) -> Result<bool> {
        let metric = if duration < SHORT_CALL {
            DailyMetric::CallsUnder30s
        } else if duration >= LONG_CALL {
            DailyMetric::CallsOver2Min
        } else {
            return Ok(false);
        };
        let today = self.clock.today();
        let recorded = self.mutate(user_id, |m| {
            m.increment_daily_metric(today, metric, 1)?;
            Ok(())
        })?;
        Ok(recorded.is_some())
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn increment_deals(&self, user_id: &str) -> Result<Option<u32>> {
        self.mutate(user_id, |m| {
            let progression = m.progression_mut();
            progression.closed_deals = progression.closed_deals.saturating_add(1);
            Ok(progression.closed_deals)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn add_mentee(&self, user_id: &str) -> Result<Option<u32>> {
        self.mutate(user_id, |m| {
            let progression = m.progression_mut();
            progression.mentee_count = progression.mentee_count.saturating_add(1);
            Ok(progression.mentee_count)
        })
    }

    /// Mark a training module complete. Returns `true` only the first time.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn complete_module(&self, user_id: &str, module_id: &str) -> Result<bool> {
        let now = self.clock.now();
        let added = self.mutate(user_id, |m| {
            if !m.progression_mut().completed_modules.insert(module_id.to_string()) {
                return Ok(false);
            }
            m.append_activity(
                "module_completed",
                &format!("Completed {}", humanize(module_id)),
                0,
                now,
            )?;
            Ok(true)
        })?;
        Ok(added.unwrap_or(false))
    }

    /// Record a passed exam. Returns `true` only the first time.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn pass_exam(&self, user_id: &str, exam_id: &str) -> Result<bool> {
        let now = self.clock.now();
        let added = self.mutate(user_id, |m| {
            if !m.progression_mut().passed_exams.insert(exam_id.to_string()) {
                return Ok(false);
            }
            info!(user_id, exam_id, "exam passed");
            m.append_activity(
                "exam_passed",
                &format!("Passed {}", humanize(exam_id)),
                0,
                now,
            )?;
            Ok(true)
        })?;
        Ok(added.unwrap_or(false))
    }

    /// Choose a specialization. Refused for unknown ids and, when
    /// `enforce_specialization_level` is set, below the unlock level.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_specialization(&self, user_id: &str, specialization_id: &str) -> Result<bool> {
        let Some(definition) = self.catalog.specialization(specialization_id) else {
            warn!(user_id, specialization_id, "unknown specialization");
            return Ok(false);
        };
        let enforce = self.settings.enforce_specialization_level;
        let levels = self.catalog.levels();
        let applied = self.mutate(user_id, |m| {
            let level = levels.level_for(m.progression().total_xp);
            if enforce && level < definition.unlock_level {
                info!(
                    user_id,
                    specialization_id,
                    level,
                    unlock_level = definition.unlock_level,
                    "specialization locked"
                );
                return Ok(false);
            }
            m.progression_mut().specialization = Some(definition.id.clone());
            Ok(true)
        })?;
        Ok(applied.unwrap_or(false))
    }

    /// Display one of the titles the rep already holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_active_title(&self, user_id: &str, title: &str) -> Result<bool> {
        let applied = self.mutate(user_id, |m| {
            if !m.progression().titles.contains(title) {
                warn!(user_id, title, "title not earned");
                return Ok(false);
            }
            m.progression_mut().active_title = Some(title.to_string());
            Ok(true)
        })?;
        Ok(applied.unwrap_or(false))
    }

    /// Grant one badge tier directly. Unknown badge ids are refused.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn add_badge(&self, user_id: &str, key: &BadgeKey) -> Result<bool> {
        if self.catalog.badge(&key.badge_id).is_none() {
            warn!(user_id, badge = %key, "unknown badge");
            return Ok(false);
        }
        let added = self.mutate(user_id, |m| {
            if !badges::award(&mut m.progression_mut().badges, key.clone()) {
                return Ok(false);
            }
            info!(user_id, badge = %key, "badge unlocked");
            m.notify(Notification::BadgeUnlock {
                user_id: user_id.to_string(),
                badge_id: key.clone(),
            });
            Ok(true)
        })?;
        Ok(added.unwrap_or(false))
    }

    /// Evaluate every badge against `metrics` and award newly satisfied
    /// tiers. The aggregate's streak, deal count and defeated bosses are
    /// merged in, as are the current efficiency rates the caller did not
    /// supply.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn evaluate_badges(&self, user_id: &str, metrics: &MetricSnapshot) -> Result<Vec<BadgeKey>> {
        let today = self.clock.today();
        let awarded = self.mutate(user_id, |m| {
            let report = self.efficiency_report(m.connection(), user_id, today)?;
            let mut snapshot = metrics.clone();
            for (rate, value) in &report.rates {
                if snapshot.get(rate).is_none() {
                    snapshot.set(rate.clone(), *value);
                }
            }
            let progression = m.progression();
            snapshot.set("streak_days", f64::from(progression.streak_days));
            snapshot.set("deals", f64::from(progression.closed_deals));
            for boss_id in progression.defeated_bosses.iter() {
                snapshot.mark_boss_defeated(boss_id.clone());
            }

            let added = badges::award_evaluated(
                &mut m.progression_mut().badges,
                self.catalog.badges(),
                &snapshot,
            );
            for key in &added {
                info!(user_id, badge = %key, "badge unlocked");
                m.notify(Notification::BadgeUnlock {
                    user_id: user_id.to_string(),
                    badge_id: key.clone(),
                });
            }
            Ok(added)
        })?;
        Ok(awarded.unwrap_or_default())
    }

    fn efficiency_report(
        &self,
        conn: &Connection,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<EfficiencyReport> {
        let window = self.settings.efficiency_window_days.max(1);
        let since = today
            .checked_sub_days(Days::new(u64::from(window - 1)))
            .unwrap_or(NaiveDate::MIN);
        let days: Vec<DailyMetrics> = query::daily_metrics_since(conn, user_id, since)?
            .into_iter()
            .map(|(_, metrics)| metrics)
            .collect();
        Ok(efficiency::report(&days, window, self.settings.ramp_min_dials))
    }

    /// Efficiency rates over the configured window ending today.
    ///
    /// # Errors
    ///
    /// Returns an error if the daily metrics cannot be read.
    pub fn efficiency(&self, user_id: &str) -> Result<EfficiencyReport> {
        let today = self.clock.today();
        self.store
            .read(|conn| self.efficiency_report(conn, user_id, today))
    }

    /// Diagnose promotion into the next rank, or `None` for an unknown user.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn check_eligibility(&self, user_id: &str) -> Result<Option<Eligibility>> {
        let today = self.clock.today();
        self.store.read(|conn| {
            let Some(progression) = query::load_progression(conn, user_id)? else {
                return Ok(None);
            };
            let report = self.efficiency_report(conn, user_id, today)?;
            let input = EligibilityInput::from_progression(&self.catalog, &progression, &report.rates);
            Ok(Some(gate::check_eligibility(&self.catalog, &input)))
        })
    }

    /// Advance exactly one rank if the gate passes right now.
    ///
    /// `target`, when given, must name the next rank; anything else is
    /// refused. Returns `false` without mutating when not eligible, at the
    /// terminal rank, or for an unknown user.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn promote_rank(&self, user_id: &str, target: Option<&str>) -> Result<bool> {
        let today = self.clock.today();
        let promoted = self.mutate(user_id, |m| {
            let report = self.efficiency_report(m.connection(), user_id, today)?;
            let eligibility = gate::check_eligibility(
                &self.catalog,
                &EligibilityInput::from_progression(&self.catalog, m.progression(), &report.rates),
            );
            if !eligibility.eligible {
                debug!(user_id, missing = eligibility.missing.len(), "promotion refused");
                return Ok(false);
            }
            let Some(next) = eligibility
                .next_rank
                .as_deref()
                .and_then(|id| self.catalog.rank(id))
            else {
                return Ok(false);
            };
            if target.is_some_and(|target| target != next.id) {
                warn!(user_id, ?target, next_rank = %next.id, "promotion target is not the next rank");
                return Ok(false);
            }

            let now = m.now();
            let progression = m.progression_mut();
            let graduating =
                progression.rank.starts_with(SDR_RANK_PREFIX) && next.id == GRADUATION_RANK;
            progression.rank = next.id.clone();
            if graduating {
                progression.graduation_date = Some(now);
            }

            info!(user_id, rank = %next.id, grade = %next.grade, "rank up");
            m.append_activity("rank_promoted", &format!("Promoted to {}", next.name), 0, now)?;
            m.notify(Notification::RankUp {
                user_id: user_id.to_string(),
                new_rank: next.id.clone(),
                rank_name: next.name.clone(),
                grade: next.grade.clone(),
            });
            Ok(true)
        })?;
        Ok(promoted.unwrap_or(false))
    }

    /// Record a boss victory; rewards are issued on the first one only.
    /// Returns `None` for an unknown user.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn defeat_boss(&self, user_id: &str, boss_id: &str) -> Result<Option<BossDefeat>> {
        let at = self.clock.now();
        let today = self.clock.local_date(at);
        self.mutate(user_id, |m| boss::defeat(m, &self.catalog, boss_id, at, today))
    }

    /// Record a lost boss attempt and return the running count.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn record_boss_attempt(&self, user_id: &str, boss_id: &str) -> Result<Option<u32>> {
        let at = self.clock.now();
        Ok(self
            .mutate(user_id, |m| boss::record_attempt(m, &self.catalog, boss_id, at))?
            .flatten())
    }

    /// # Errors
    ///
    /// Returns an error if the aggregate cannot be read.
    pub fn is_boss_unlocked(&self, user_id: &str, boss_id: &str) -> Result<bool> {
        Ok(self
            .progression(user_id)?
            .is_some_and(|p| boss::is_unlocked(&self.catalog, &p, boss_id)))
    }

    /// # Errors
    ///
    /// Returns an error if the aggregate cannot be read.
    pub fn is_boss_defeated(&self, user_id: &str, boss_id: &str) -> Result<bool> {
        Ok(self
            .progression(user_id)?
            .is_some_and(|p| p.defeated_bosses.contains(boss_id)))
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn recent_xp_events(&self, user_id: &str, limit: u32) -> Result<Vec<XpEvent>> {
        self.store
            .read(|conn| query::recent_xp_events(conn, user_id, limit))
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn recent_activity(&self, user_id: &str, limit: u32) -> Result<Vec<ActivityLogEntry>> {
        self.store
            .read(|conn| query::recent_activity(conn, user_id, limit))
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn boss_history(&self, user_id: &str, limit: u32) -> Result<Vec<BossHistoryEntry>> {
        self.store
            .read(|conn| query::boss_history(conn, user_id, limit))
    }

    /// Fire every pending sync now and wait for in-flight ones. Returns how
    /// many pending syncs were fired.
    pub async fn flush_sync(&self) -> usize {
        match &self.sync {
            Some(sync) => sync.flush_all().await,
            None => 0,
        }
    }
}
