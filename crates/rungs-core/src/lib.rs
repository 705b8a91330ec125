//! rungs-core library.
//!
//! Gamified progression for sales reps: an XP ledger with levels and streaks,
//! tiered badges, a multi-criteria rank gate, one-time boss rewards and
//! specialization multipliers, persisted in SQLite and pushed to an external
//! system of record through a debounced sync.
//!
//! # Conventions
//!
//! - **Errors**: storage and orchestration return `anyhow::Result`; domain
//!   no-ops are values, not errors.
//! - **Logging**: `tracing` macros with structured `user_id` fields.

pub mod badges;
pub mod boss;
pub mod clock;
pub mod config;
pub mod db;
pub mod efficiency;
pub mod engine;
pub mod error;
pub mod event;
pub mod gate;
pub mod ledger;
pub mod level;
pub mod model;
pub mod multiplier;
pub mod notify;
pub mod streak;
pub mod sync;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Catalog, EngineConfig};
pub use engine::{ProgressionEngine, ProgressionSnapshot};
pub use event::InboundEvent;
pub use ledger::XpOutcome;
pub use notify::Notification;
pub use sync::{ProgressionSync, SyncBinder};
