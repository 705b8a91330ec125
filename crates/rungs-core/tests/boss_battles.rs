//! Boss battles: one-time rewards, unlimited attempts, level unlocks.

use chrono::{TimeZone, Utc};
use rungs_core::boss::{BOSS_REWARD_EVENT, BossDefeat};
use rungs_core::db::ProgressionStore;
use rungs_core::model::badge::{BadgeKey, BadgeTier};
use rungs_core::model::boss::BossResult;
use rungs_core::{Catalog, EngineConfig, FixedClock, InboundEvent, Notification, ProgressionEngine};
use std::sync::Arc;

const REP: &str = "rep-1";

fn engine() -> ProgressionEngine {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0)
            .single()
            .expect("valid timestamp"),
    ));
    let engine = ProgressionEngine::new(
        ProgressionStore::in_memory().expect("open store"),
        Arc::new(Catalog::builtin().expect("built-in catalog")),
        EngineConfig::default(),
    )
    .with_clock(clock);
    engine.init_progression(REP, "Casey").expect("init");
    engine
}

#[test]
fn second_defeat_issues_nothing() {
    let engine = engine();
    let first = engine
        .defeat_boss(REP, "redhawk")
        .expect("defeat")
        .expect("aggregate exists");
    let BossDefeat::Rewarded { rewards, xp } = first else {
        panic!("first defeat should be rewarded, got {first:?}");
    };
    assert_eq!(rewards.xp, 1000);
    assert_eq!(xp.xp_earned, 1000);
    let after_first = engine.progression(REP).expect("read").expect("exists");

    let second = engine
        .defeat_boss(REP, "redhawk")
        .expect("defeat")
        .expect("aggregate exists");
    assert_eq!(second, BossDefeat::AlreadyDefeated);
    let after_second = engine.progression(REP).expect("read").expect("exists");
    assert_eq!(after_first, after_second);

    let rewards: Vec<_> = engine
        .recent_xp_events(REP, 50)
        .expect("events")
        .into_iter()
        .filter(|event| event.event_type == BOSS_REWARD_EVENT)
        .collect();
    assert_eq!(rewards.len(), 1);

    let victories: Vec<_> = engine
        .boss_history(REP, 50)
        .expect("history")
        .into_iter()
        .filter(|entry| entry.result == BossResult::Victory)
        .collect();
    assert_eq!(victories.len(), 1);
}

#[test]
fn racing_defeats_reward_exactly_once() {
    let engine = engine();

    let outcomes: Vec<BossDefeat> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    engine
                        .defeat_boss(REP, "redhawk")
                        .expect("defeat")
                        .expect("aggregate exists")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect()
    });

    let rewarded = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, BossDefeat::Rewarded { .. }))
        .count();
    assert_eq!(rewarded, 1);

    let reward_rows = engine
        .recent_xp_events(REP, 50)
        .expect("events")
        .into_iter()
        .filter(|event| event.event_type == BOSS_REWARD_EVENT)
        .count();
    assert_eq!(reward_rows, 1);
    let p = engine.progression(REP).expect("read").expect("exists");
    assert_eq!(p.total_xp, 1000);
}

#[test]
fn first_defeat_grants_badge_title_and_xp() {
    let engine = engine();
    engine.defeat_boss(REP, "redhawk").expect("defeat");

    let p = engine.progression(REP).expect("read").expect("exists");
    assert_eq!(p.total_xp, 1000);
    assert!(p.defeated_bosses.contains("redhawk"));
    assert!(p.has_badge(&BadgeKey::new("redhawk_slayer", BadgeTier::Gold)));
    assert_eq!(p.titles.as_slice(), ["RedHawk Conqueror".to_string()]);
    assert!(engine.is_boss_defeated(REP, "redhawk").expect("defeated"));

    let activity = engine.recent_activity(REP, 1).expect("activity");
    assert_eq!(activity[0].details, "Defeated REDHAWK");
}

#[test]
fn defeat_announces_badge_level_and_boss() {
    let engine = engine();
    let mut notifications = engine.subscribe();
    engine.defeat_boss(REP, "redhawk").expect("defeat");

    let mut kinds = Vec::new();
    while let Ok(notification) = notifications.try_recv() {
        kinds.push(match notification {
            Notification::BadgeUnlock { .. } => "badge",
            Notification::LevelUp { .. } => "level",
            Notification::BossDefeated { .. } => "boss",
            Notification::RankUp { .. } => "rank",
        });
    }
    assert_eq!(kinds, vec!["badge", "level", "boss"]);

    engine.defeat_boss(REP, "redhawk").expect("defeat");
    assert!(notifications.try_recv().is_err());
}

#[test]
fn attempts_are_unlimited_and_logged() {
    let engine = engine();
    for expected in 1..=4 {
        assert_eq!(
            engine.record_boss_attempt(REP, "redhawk").expect("attempt"),
            Some(expected)
        );
    }
    let p = engine.progression(REP).expect("read").expect("exists");
    assert_eq!(p.attempts_for("redhawk"), 4);
    assert!(p.defeated_bosses.is_empty());

    let history = engine.boss_history(REP, 10).expect("history");
    assert_eq!(history.len(), 4);
    assert!(history.iter().all(|entry| entry.result == BossResult::Defeat));

    // A loss never blocks a later win.
    assert!(matches!(
        engine.defeat_boss(REP, "redhawk").expect("defeat"),
        Some(BossDefeat::Rewarded { .. })
    ));
}

#[test]
fn unknown_boss_is_reported_not_raised() {
    let engine = engine();
    assert_eq!(
        engine.defeat_boss(REP, "kraken").expect("defeat"),
        Some(BossDefeat::UnknownBoss)
    );
    assert_eq!(engine.record_boss_attempt(REP, "kraken").expect("attempt"), None);
    assert!(!engine.is_boss_unlocked(REP, "kraken").expect("unlocked"));
    assert!(engine.boss_history(REP, 10).expect("history").is_empty());
}

#[test]
fn unlock_follows_level() {
    let engine = engine();
    assert!(!engine.is_boss_unlocked(REP, "redhawk").expect("unlocked"));

    // Level 12 starts at 9200 xp.
    engine
        .ingest(&InboundEvent::new(REP, "backfill").with_amount(9199))
        .expect("ingest");
    assert!(!engine.is_boss_unlocked(REP, "redhawk").expect("unlocked"));
    engine
        .ingest(&InboundEvent::new(REP, "backfill").with_amount(1))
        .expect("ingest");
    assert!(engine.is_boss_unlocked(REP, "redhawk").expect("unlocked"));
}
