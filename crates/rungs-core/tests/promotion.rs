//! Rank gate diagnostics and forward-only promotion.

use chrono::{DateTime, TimeZone, Utc};
use rungs_core::db::ProgressionStore;
use rungs_core::gate::MAX_RANK_REACHED;
use rungs_core::model::badge::{BadgeKey, BadgeTier};
use rungs_core::model::progression::UserProgression;
use rungs_core::{Catalog, EngineConfig, FixedClock, InboundEvent, Notification, ProgressionEngine};
use std::sync::Arc;

const REP: &str = "rep-1";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Build an engine over a store whose aggregate was prepared by `seed`.
fn engine_seeded(rank: &str, seed: impl FnOnce(&mut UserProgression)) -> ProgressionEngine {
    let store = ProgressionStore::in_memory().expect("open store");
    store
        .init(&UserProgression::new(REP, "Casey", rank, now()))
        .expect("init");
    store
        .mutate(REP, now(), |m| {
            seed(m.progression_mut());
            Ok(())
        })
        .expect("seed")
        .expect("aggregate exists");
    ProgressionEngine::new(
        store,
        Arc::new(Catalog::builtin().expect("built-in catalog")),
        EngineConfig::default(),
    )
    .with_clock(Arc::new(FixedClock::new(now())))
}

#[test]
fn gate_reports_every_unmet_requirement() {
    let engine = engine_seeded("sdr_1", |_| {});
    let eligibility = engine
        .check_eligibility(REP)
        .expect("check")
        .expect("aggregate exists");
    assert!(!eligibility.eligible);
    assert_eq!(eligibility.next_rank.as_deref(), Some("sdr_2"));
    assert_eq!(
        eligibility.missing,
        vec![
            "Reach Level 3 (currently 1)",
            "Close 2 deals (currently 0)",
            "Earn Bronze opener elite",
            "Complete module 0",
            "Complete module 1",
        ]
    );
}

#[test]
fn eligible_rep_moves_exactly_one_rank() {
    let engine = engine_seeded("sdr_1", |_| {});
    engine
        .ingest(&InboundEvent::new(REP, "backfill").with_amount(300))
        .expect("ingest");
    engine.increment_deals(REP).expect("deal");
    engine.increment_deals(REP).expect("deal");
    engine
        .add_badge(REP, &BadgeKey::new("opener_elite", BadgeTier::Silver))
        .expect("badge");
    engine.complete_module(REP, "module_0").expect("module");
    engine.complete_module(REP, "module_1").expect("module");

    let mut notifications = engine.subscribe();
    assert!(engine.promote_rank(REP, Some("sdr_2")).expect("promote"));
    let p = engine.progression(REP).expect("read").expect("exists");
    assert_eq!(p.rank, "sdr_2");
    assert_eq!(p.graduation_date, None);
    assert_eq!(
        notifications.try_recv().expect("rank up"),
        Notification::RankUp {
            user_id: REP.to_string(),
            new_rank: "sdr_2".to_string(),
            rank_name: "SDR II".to_string(),
            grade: "E-2".to_string(),
        }
    );

    // The next gate is far away; nothing moves, nothing is announced.
    assert!(!engine.promote_rank(REP, None).expect("promote"));
    assert_eq!(
        engine.progression(REP).expect("read").expect("exists").rank,
        "sdr_2"
    );
    assert!(notifications.try_recv().is_err());
}

#[test]
fn ineligible_promotion_leaves_aggregate_untouched() {
    let engine = engine_seeded("sdr_1", |p| p.closed_deals = 2);
    let before = engine.progression(REP).expect("read").expect("exists");
    assert!(!engine.promote_rank(REP, None).expect("promote"));
    assert_eq!(engine.progression(REP).expect("read"), Some(before));
}

#[test]
fn target_other_than_next_rank_is_refused() {
    let engine = engine_seeded("sdr_1", |p| {
        p.total_xp = 300;
        p.closed_deals = 2;
        p.badges
            .insert(BadgeKey::new("opener_elite", BadgeTier::Bronze));
        p.completed_modules.insert("module_0".to_string());
        p.completed_modules.insert("module_1".to_string());
    });
    assert!(!engine.promote_rank(REP, Some("sdr_3")).expect("promote"));
    assert!(!engine.promote_rank(REP, Some("sdr_1")).expect("promote"));
    assert!(engine.promote_rank(REP, Some("sdr_2")).expect("promote"));
}

#[test]
fn terminal_rank_is_a_no_op() {
    let engine = engine_seeded("manager", |p| p.total_xp = 200_000);
    let eligibility = engine
        .check_eligibility(REP)
        .expect("check")
        .expect("aggregate exists");
    assert!(!eligibility.eligible);
    assert_eq!(eligibility.next_rank, None);
    assert_eq!(eligibility.missing, vec![MAX_RANK_REACHED]);
    assert!(!engine.promote_rank(REP, None).expect("promote"));
}

#[test]
fn unknown_current_rank_is_diagnosed() {
    let engine = engine_seeded("intern", |_| {});
    let eligibility = engine
        .check_eligibility(REP)
        .expect("check")
        .expect("aggregate exists");
    assert_eq!(eligibility.missing, vec!["Unknown current rank 'intern'"]);
    assert!(!engine.promote_rank(REP, None).expect("promote"));
}

#[test]
fn leadership_certification_always_blocks() {
    let engine = engine_seeded("team_lead", |p| {
        p.total_xp = 200_000;
        p.closed_deals = 50;
        p.badges
            .insert(BadgeKey::new("conversion_champion", BadgeTier::Platinum));
        p.completed_modules.insert("module_6".to_string());
    });
    let eligibility = engine
        .check_eligibility(REP)
        .expect("check")
        .expect("aggregate exists");
    assert!(
        eligibility
            .missing
            .contains(&"Complete Leadership Certification".to_string())
    );
    assert!(!engine.promote_rank(REP, None).expect("promote"));
}

#[test]
fn graduating_into_operative_stamps_the_date() {
    let engine = engine_seeded("sdr_3", |p| {
        p.total_xp = 5200;
        p.closed_deals = 25;
        for badge in [
            BadgeKey::new("opener_elite", BadgeTier::Gold),
            BadgeKey::new("conversion_champion", BadgeTier::Silver),
            BadgeKey::new("appointment_setter", BadgeTier::Platinum),
        ] {
            p.badges.insert(badge);
        }
        for module in 0..=5 {
            p.completed_modules.insert(format!("module_{module}"));
        }
        p.passed_exams.insert("operative_certification".to_string());
    });

    // Without call data the drop-rate requirement is unmet.
    let eligibility = engine
        .check_eligibility(REP)
        .expect("check")
        .expect("aggregate exists");
    assert_eq!(
        eligibility.missing,
        vec!["Get sub 30s drop rate below 50%"]
    );

    for _ in 0..4 {
        engine
            .ingest(&InboundEvent::new(REP, "call_connected"))
            .expect("ingest");
    }
    engine
        .record_call_metrics(REP, std::time::Duration::from_secs(10))
        .expect("call");

    assert!(engine.promote_rank(REP, None).expect("promote"));
    let p = engine.progression(REP).expect("read").expect("exists");
    assert_eq!(p.rank, "operative");
    assert_eq!(p.graduation_date, Some(now()));
}
