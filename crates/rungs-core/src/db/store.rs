//! Transactional mutation surface over the progression tables.
//!
//! Every change to an aggregate goes through [`ProgressionStore::mutate`]:
//! begin an `IMMEDIATE` transaction, load the aggregate, let the caller edit
//! it and append log rows, write it back if it changed, commit. An error at
//! any step rolls the whole thing back.

use super::query;
use crate::model::boss::BossResult;
use crate::model::metrics::DailyMetric;
use crate::model::progression::UserProgression;
use crate::notify::Notification;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct ProgressionStore {
    conn: Mutex<Connection>,
    /// Read-only WAL connection for display queries. In-memory stores have
    /// no second connection and read through the writer.
    reader: Option<Mutex<Connection>>,
}

impl std::fmt::Debug for ProgressionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionStore").finish_non_exhaustive()
    }
}

/// In-flight edit of one aggregate inside an open transaction.
pub struct Mutation<'a> {
    conn: &'a Connection,
    progression: UserProgression,
    now: DateTime<Utc>,
    appended: bool,
    notifications: Vec<Notification>,
}

/// Result of a committed mutation.
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    /// The aggregate as committed.
    pub progression: UserProgression,
    /// Whether the aggregate or any log was written.
    pub changed: bool,
    /// Notifications queued during the mutation, ready to publish.
    pub notifications: Vec<Notification>,
}

impl ProgressionStore {
    /// Open a file-backed store, creating and migrating it as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = super::open_store(path)?;
        let reader = super::open_reader(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
            reader: Some(Mutex::new(reader)),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be migrated.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_connection(super::open_in_memory()?))
    }

    /// Wrap an already configured and migrated connection.
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            reader: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run read-only queries against the last committed state.
    ///
    /// File-backed stores answer from their reader connection, so a read
    /// never waits on an open mutation.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        match &self.reader {
            Some(reader) => {
                let conn = reader.lock().unwrap_or_else(PoisonError::into_inner);
                f(&conn)
            }
            None => {
                let conn = self.lock();
                f(&conn)
            }
        }
    }

    /// Insert `fresh` unless the user already exists; return the stored
    /// aggregate and whether it was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn init(&self, fresh: &UserProgression) -> Result<(UserProgression, bool)> {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("begin init transaction")?;
        let created = query::insert_progression(&tx, fresh)?;
        let stored = query::load_progression(&tx, &fresh.user_id)?
            .with_context(|| format!("progression for '{}' vanished after insert", fresh.user_id))?;
        tx.commit().context("commit init transaction")?;
        Ok((stored, created))
    }

    /// Apply `apply` to the user's aggregate atomically.
    ///
    /// Returns `Ok(None)` without calling `apply` when the user has no
    /// aggregate. The aggregate is written back only if `apply` changed it,
    /// and `updated_at` is stamped with `now` in that case.
    ///
    /// # Errors
    ///
    /// Returns the closure's error or any storage error; nothing is committed
    /// in either case.
    pub fn mutate<T>(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        apply: impl FnOnce(&mut Mutation<'_>) -> Result<T>,
    ) -> Result<Option<Committed<T>>> {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("begin mutation transaction")?;

        let Some(original) = query::load_progression(&tx, user_id)? else {
            return Ok(None);
        };

        let mut mutation = Mutation {
            conn: &tx,
            progression: original.clone(),
            now,
            appended: false,
            notifications: Vec::new(),
        };
        let value = apply(&mut mutation)?;
        let Mutation {
            progression: mut next,
            appended,
            notifications,
            ..
        } = mutation;

        let dirty = next != original;
        if dirty {
            next.updated_at = now;
            query::save_progression(&tx, &next)?;
        }
        tx.commit()
            .with_context(|| format!("commit mutation for '{user_id}'"))?;

        Ok(Some(Committed {
            value,
            progression: next,
            changed: dirty || appended,
            notifications,
        }))
    }
}

impl Mutation<'_> {
    #[must_use]
    pub const fn progression(&self) -> &UserProgression {
        &self.progression
    }

    pub const fn progression_mut(&mut self) -> &mut UserProgression {
        &mut self.progression
    }

    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// The open transaction, for reads that must see uncommitted rows.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        self.conn
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn append_xp_event(
        &mut self,
        event_type: &str,
        xp_amount: i64,
        multipliers: &BTreeMap<String, f64>,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        self.appended = true;
        query::append_xp_event(
            self.conn,
            &self.progression.user_id,
            event_type,
            xp_amount,
            multipliers,
            at,
        )
    }

    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn append_activity(
        &mut self,
        action: &str,
        details: &str,
        xp_earned: i64,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        self.appended = true;
        query::append_activity(
            self.conn,
            &self.progression.user_id,
            action,
            details,
            xp_earned,
            at,
        )
    }

    /// # Errors
    ///
    /// Returns an error if the insert fails, including a second victory.
    pub fn append_boss_history(
        &mut self,
        boss_id: &str,
        result: BossResult,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        self.appended = true;
        query::append_boss_history(self.conn, &self.progression.user_id, boss_id, result, at)
    }

    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn increment_daily_metric(
        &mut self,
        day: NaiveDate,
        metric: DailyMetric,
        by: u64,
    ) -> Result<()> {
        self.appended = true;
        query::increment_daily_metric(self.conn, &self.progression.user_id, day, metric, by)
    }
}
