//! End-to-end scheduler scenarios against the sample catalog.
//!
//! These tests drive the engine the way a host simulation would: one daily
//! tick at each midnight, one hourly tick per simulated hour, with the
//! snapshot describing camp conditions. Quiet days are switched off except
//! where a test exercises them, so the delivery patterns asserted here do
//! not depend on the seed.

use std::collections::HashMap;

use adjutant::{
    Adjutant, AdjutantConfig, DeferredKind, DeliveredDecision, FreeTimeRequest, MemorySaveStore,
    Notice,
};
use camp_events::fixtures::sample_catalog;
use camp_events::{
    CampClock, CampSnapshot, Catalog, DecisionEvent, EventCategory, Formation, NarrativeSource,
    SituationSignal, WindowClass,
};

/// Default configuration with quiet days switched off.
fn steady_config() -> AdjutantConfig {
    let mut config = AdjutantConfig::default();
    config.pacing.quiet_days_enabled = false;
    config
}

fn snapshot_at(day: u64, hour: u8) -> CampSnapshot {
    CampSnapshot::new(CampClock::from_day_hour(day, hour))
}

/// Runs full campaign days, collecting every delivery with its absolute
/// hour. `shape` adjusts each snapshot before it reaches the engine.
fn run_days<F>(
    engine: &mut Adjutant,
    catalog: &Catalog,
    days: std::ops::Range<u64>,
    mut shape: F,
) -> Vec<(u64, DeliveredDecision)>
where
    F: FnMut(&mut CampSnapshot),
{
    let mut delivered = Vec::new();
    for day in days {
        let mut midnight = snapshot_at(day, 0);
        shape(&mut midnight);
        engine.on_daily_tick(&midnight);
        for hour in 0..24u8 {
            let mut snapshot = snapshot_at(day, hour);
            shape(&mut snapshot);
            let report = engine.on_hourly_tick(catalog, &snapshot);
            if let Some(decision) = report.delivered {
                delivered.push((snapshot.clock.hour(), decision));
            }
        }
    }
    delivered
}

#[test]
fn test_campaign_respects_caps_spacing_and_limits() {
    let catalog = sample_catalog();
    let mut engine = Adjutant::new(steady_config(), 42);
    let delivered = run_days(&mut engine, &catalog, 0..28, |snapshot| {
        snapshot.player.tier = 3;
    });

    // The run must actually deliver; a silent month would pass the caps
    // vacuously.
    assert!(
        delivered.len() >= 6,
        "expected a lively month, got {} deliveries",
        delivered.len()
    );

    let mut per_day: HashMap<u64, u32> = HashMap::new();
    let mut per_week: HashMap<u64, u32> = HashMap::new();
    let mut ids_by_day: HashMap<u64, Vec<&str>> = HashMap::new();
    for (hour, decision) in &delivered {
        let day = hour / 24;
        *per_day.entry(day).or_default() += 1;
        *per_week.entry(day / 7).or_default() += 1;
        ids_by_day
            .entry(day)
            .or_default()
            .push(decision.event_id.as_str());
    }
    assert!(per_day.values().all(|&fires| fires <= 2));
    assert!(per_week.values().all(|&fires| fires <= 6));

    for pair in delivered.windows(2) {
        let gap = pair[1].0 - pair[0].0;
        assert!(gap >= 6, "deliveries only {gap}h apart");
    }

    // sergeant_inspection and latrine_duty declare each other exclusive.
    for ids in ids_by_day.values() {
        assert!(
            !(ids.contains(&"sergeant_inspection") && ids.contains(&"latrine_duty")),
            "mutually exclusive decisions delivered on the same day"
        );
    }

    let count = |id: &str| delivered.iter().filter(|(_, d)| d.event_id == id).count();
    assert!(count("quartermaster_audit") <= 1, "one-time event repeated");
    assert!(count("officer_commendation") <= 1, "one-time event repeated");
    // Three latrine shifts per term, and no new term starts in this run.
    assert!(count("latrine_duty") <= 3);
}

#[test]
fn test_deliveries_respect_min_spacing() {
    // Evaluation hours are 8, 13 and 19. With a delivery at 8 and a rich
    // candidate pool, hour 13 sits five hours out and must stay silent.
    let catalog = sample_catalog();
    let mut engine = Adjutant::new(steady_config(), 7);
    let delivered = run_days(&mut engine, &catalog, 0..1, |snapshot| {
        snapshot.player.tier = 3;
    });

    let hours: Vec<u64> = delivered.iter().map(|(hour, _)| *hour).collect();
    assert_eq!(hours, vec![8, 19]);
}

#[test]
fn test_daily_cap_exhausts_evaluation() {
    let mut config = steady_config();
    config.pacing.evaluation_hours = vec![8, 10, 12, 14];
    config.pacing.min_hours_between = 1;

    let catalog = sample_catalog();
    let mut engine = Adjutant::new(config, 7);
    let delivered = run_days(&mut engine, &catalog, 0..1, |snapshot| {
        snapshot.player.tier = 3;
    });

    let hours: Vec<u64> = delivered.iter().map(|(hour, _)| *hour).collect();
    assert_eq!(
        hours,
        vec![8, 10],
        "the daily cap of two must silence later evaluations"
    );
}

#[test]
fn test_certain_quiet_roll_suppresses_all_selection() {
    let mut config = AdjutantConfig::default();
    config.pacing.quiet_days_enabled = true;
    config.pacing.quiet_day_chance = 1.0;

    let catalog = sample_catalog();
    let mut engine = Adjutant::new(config, 42);
    let delivered = run_days(&mut engine, &catalog, 0..5, |snapshot| {
        snapshot.player.tier = 3;
    });
    assert!(delivered.is_empty());
}

#[test]
fn test_tier_gating_holds_back_ranked_sources() {
    let catalog = sample_catalog();

    // Tier 0 with the campfire tale suppressed: everything left on the
    // automatic roster comes from a ranked source, so nothing fires.
    let mut gated = Adjutant::new(steady_config(), 42);
    gated.set_flag("confined");
    let delivered = run_days(&mut gated, &catalog, 0..1, |_| {});
    assert!(delivered.is_empty());

    // Same situation with gating disabled: the ranked sources open up.
    let mut config = steady_config();
    config.tiers.gating_enabled = false;
    let mut open = Adjutant::new(config, 42);
    open.set_flag("confined");
    let delivered = run_days(&mut open, &catalog, 0..1, |_| {});
    assert_eq!(delivered.len(), 2);
    for (_, decision) in &delivered {
        assert!(
            [
                "sergeant_inspection",
                "audit_fallout",
                "officer_commendation"
            ]
            .contains(&decision.event_id.as_str()),
            "unexpected delivery {}",
            decision.event_id
        );
    }
}

#[test]
fn test_threat_unlocks_commander_council_at_tier_three() {
    let catalog = sample_catalog();
    let mut engine = Adjutant::new(steady_config(), 42);

    let mut snapshot = snapshot_at(0, 8);
    snapshot.player.tier = 3;
    snapshot.army.threat = 0.9;

    // Critical priority puts the council alone in the band.
    let report = engine.on_hourly_tick(&catalog, &snapshot);
    let delivered = report.delivered.expect("a delivery at the first evaluation");
    assert_eq!(delivered.event_id, "commander_council");
    assert!(!delivered.from_chain);
}

#[test]
fn test_one_time_event_survives_save_restore_and_term_rollover() {
    let catalog = sample_catalog();
    let mut engine = Adjutant::new(steady_config(), 42);

    let mut snapshot = snapshot_at(0, 8);
    snapshot.player.tier = 3;
    snapshot.army.threat = 0.9;
    let report = engine.on_hourly_tick(&catalog, &snapshot);
    assert_eq!(report.delivered.unwrap().event_id, "commander_council");

    let mut store = MemorySaveStore::new();
    engine.save(&mut store);

    let mut restored = Adjutant::restore(steady_config(), 42, &store);
    restored.begin_new_term();
    assert!(restored.state().one_time_spent("commander_council"));

    // The threat stays high all through the next day; the council would
    // repeat if the one-time mark were lost.
    let delivered = run_days(&mut restored, &catalog, 1..2, |snapshot| {
        snapshot.player.tier = 3;
        snapshot.army.threat = 0.9;
    });
    assert!(!delivered.is_empty());
    assert!(delivered
        .iter()
        .all(|(_, decision)| decision.event_id != "commander_council"));
}

#[test]
fn test_per_term_limit_reopens_on_new_term() {
    let drill = DecisionEvent::new(
        "bayonet_drill",
        "Bayonet Drill",
        EventCategory::Training,
        NarrativeSource::Veteran,
    )
    .with_cooldown_days(0)
    .with_max_per_term(2)
    .with_options(&["push_through", "ease_off"]);
    let catalog = Catalog::new(vec![drill]).unwrap();

    let mut config = steady_config();
    config.pacing.category_cooldown_days = 0;

    let mut engine = Adjutant::new(config, 42);
    let first_days = run_days(&mut engine, &catalog, 0..2, |_| {});
    let timeline: Vec<(u64, &str)> = first_days
        .iter()
        .map(|(hour, decision)| (*hour, decision.event_id.as_str()))
        .collect();

    // Two fires on day 0 hit the term limit; day 1 stays silent.
    assert_eq!(timeline, vec![(8, "bayonet_drill"), (19, "bayonet_drill")]);
    assert_eq!(engine.state().fired_this_term_count("bayonet_drill"), 2);

    engine.begin_new_term();
    let next = run_days(&mut engine, &catalog, 2..3, |_| {});
    assert_eq!(next.first().map(|(hour, _)| *hour), Some(48 + 8));
}

#[test]
fn test_chain_from_deferred_execution_delivers_when_category_clears() {
    let catalog = sample_catalog();
    let mut engine = Adjutant::new(steady_config(), 42);
    // Keeps the campfire tale off the roster for the whole scenario.
    engine.set_flag("confined");

    // Day 0, 07:00: the player queued the audit as a free-time action.
    let mut snapshot = snapshot_at(0, 7);
    snapshot.player.tier = 1;
    let eligible = engine
        .queue_free_time(
            FreeTimeRequest::new(
                DeferredKind::CatalogEvent,
                "quartermaster_audit",
                WindowClass::Unrestricted,
            ),
            &catalog,
            &snapshot,
        )
        .unwrap();
    assert_eq!(eligible, 7);

    let report = engine.on_hourly_tick(&catalog, &snapshot);
    let executed = report.executed.expect("queued audit executes at once");
    assert_eq!(executed.target_id, "quartermaster_audit");

    // Execution queues the unconditional fallout link six hours out.
    assert!(engine.state().due_chain_events(12).is_empty());
    assert_eq!(engine.state().due_chain_events(13), vec!["audit_fallout"]);

    let mut timeline = Vec::new();
    let mut record = |engine: &mut Adjutant, day: u64, hour: u8| {
        let mut snapshot = snapshot_at(day, hour);
        snapshot.player.tier = 1;
        if let Some(decision) = engine.on_hourly_tick(&catalog, &snapshot).delivered {
            timeline.push((snapshot.clock.hour(), decision.event_id, decision.from_chain));
        }
    };
    for hour in 8..24u8 {
        record(&mut engine, 0, hour);
    }
    for day in 1..3u64 {
        let mut midnight = snapshot_at(day, 0);
        midnight.player.tier = 1;
        engine.on_daily_tick(&midnight);
        for hour in 0..24u8 {
            record(&mut engine, day, hour);
        }
    }

    // Hour 13 of day 0: the fallout is due, but its category fired with
    // the audit this morning, so the inspection goes out instead and the
    // fallout waits in the chain queue. Day 1 is fully cooled down. On day
    // 2 the logistics cooldown clears and the chain bypasses banding.
    assert_eq!(
        timeline,
        vec![
            (13, "sergeant_inspection".to_string(), false),
            (56, "audit_fallout".to_string(), true),
        ]
    );
    assert!(engine.state().due_chain_events(u64::MAX).is_empty());
}

#[test]
fn test_deferred_action_waits_for_window_and_clear_ui() {
    let catalog = sample_catalog();
    let mut engine = Adjutant::new(steady_config(), 42);

    let night = snapshot_at(0, 2);
    let eligible = engine
        .queue_free_time(
            FreeTimeRequest::new(
                DeferredKind::CatalogEvent,
                "extra_drill",
                WindowClass::Training,
            ),
            &catalog,
            &night,
        )
        .unwrap();
    assert_eq!(eligible, 6);

    for hour in 3..6u8 {
        let report = engine.on_hourly_tick(&catalog, &snapshot_at(0, hour));
        assert!(report.executed.is_none(), "executed before the window");
    }

    // The window is open at six, but a skirmish holds the camp's attention.
    let mut busy = snapshot_at(0, 6);
    busy.ui.in_encounter = true;
    assert!(engine.on_hourly_tick(&catalog, &busy).executed.is_none());
    assert_eq!(engine.state().deferred().len(), 1);

    let report = engine.on_hourly_tick(&catalog, &snapshot_at(0, 7));
    let executed = report.executed.expect("drill runs at the next clear hour");
    assert_eq!(executed.target_id, "extra_drill");
    assert_eq!(executed.charged, 0);
    assert_eq!(
        engine.state().days_since_event_fired("extra_drill", 0),
        Some(0)
    );
    assert!(engine.state().deferred().is_empty());
}

#[test]
fn test_supply_signal_steers_selection() {
    let catalog = sample_catalog();

    // Full stores: the ration complaint's triggers fail and the campfire
    // tale is the only tier-zero candidate.
    let mut steady = Adjutant::new(steady_config(), 5);
    let report = steady.on_hourly_tick(&catalog, &snapshot_at(0, 8));
    assert_eq!(report.delivered.unwrap().event_id, "veteran_tale");

    // Four days of supply left: supply_low raises and the complaint
    // outranks the tale in the priority band.
    let mut hungry = Adjutant::new(steady_config(), 5);
    let mut snapshot = snapshot_at(0, 8);
    snapshot.army.supply_days = 4.0;
    let report = hungry.on_hourly_tick(&catalog, &snapshot);
    assert_eq!(report.delivered.unwrap().event_id, "ration_complaint");
    assert!(hungry.signals().contains(SituationSignal::SupplyLow));
    assert!(!hungry.signals().contains(SituationSignal::SupplyCritical));
}

#[test]
fn test_formation_restricted_event_needs_cavalry() {
    let catalog = sample_catalog();

    let mut infantry = Adjutant::new(steady_config(), 9);
    let report = infantry.on_hourly_tick(&catalog, &snapshot_at(0, 8));
    assert_eq!(report.delivered.unwrap().event_id, "veteran_tale");

    let mut cavalry = Adjutant::new(steady_config(), 9);
    let mut snapshot = snapshot_at(0, 8);
    snapshot.player.formation = Formation::Cavalry;
    let report = cavalry.on_hourly_tick(&catalog, &snapshot);
    assert_eq!(report.delivered.unwrap().event_id, "cavalry_remount");
}

#[test]
fn test_sentry_duty_summons_the_omen() {
    let catalog = sample_catalog();
    let mut engine = Adjutant::new(steady_config(), 9);

    let mut snapshot = snapshot_at(0, 8);
    snapshot.player.duty = Some("sentry".to_string());
    let report = engine.on_hourly_tick(&catalog, &snapshot);
    assert_eq!(report.delivered.unwrap().event_id, "night_watch_omen");
}

#[test]
fn test_pending_decision_outlasts_busy_day_then_drops() {
    let catalog = sample_catalog();
    let mut engine = Adjutant::new(steady_config(), 42);

    let busy_at = |day: u64, hour: u8| {
        let mut snapshot = snapshot_at(day, hour);
        snapshot.player.tier = 3;
        snapshot.ui.in_encounter = true;
        snapshot
    };

    // Selected at the morning evaluation, but the UI never clears.
    let report = engine.on_hourly_tick(&catalog, &busy_at(0, 8));
    assert!(report.delivered.is_none());
    let queued_id = engine
        .state()
        .pending()
        .expect("selection queued while busy")
        .event_id
        .clone();

    for hour in 9..24u8 {
        let report = engine.on_hourly_tick(&catalog, &busy_at(0, hour));
        assert!(report.delivered.is_none());
        assert!(report.notices.is_empty());
    }
    engine.on_daily_tick(&busy_at(1, 0));
    for hour in 0..8u8 {
        engine.on_hourly_tick(&catalog, &busy_at(1, hour));
    }
    assert_eq!(engine.state().pending().unwrap().queued_hour, 8);

    // Hour 32 is the 24-hour mark: the slot drops even though the UI is
    // still busy, and the morning evaluation queues a fresh candidate.
    let report = engine.on_hourly_tick(&catalog, &busy_at(1, 8));
    assert_eq!(
        report.notices,
        vec![Notice::PendingDropped {
            event_id: queued_id
        }]
    );
    assert!(report.delivered.is_none());
    assert_eq!(engine.state().pending().unwrap().queued_hour, 32);
}

#[test]
fn test_player_menu_lists_initiated_events_and_tracks_cooldowns() {
    let catalog = sample_catalog();
    let mut engine = Adjutant::new(steady_config(), 42);

    let snapshot = snapshot_at(0, 10);
    let ids: Vec<&str> = engine
        .available_player_decisions(&catalog, &snapshot)
        .iter()
        .map(|event| event.id.as_str())
        .collect();
    assert_eq!(ids, vec!["dice_game", "extra_drill", "write_letter"]);

    // A round of dice this morning puts the game on cooldown for the day.
    engine
        .queue_free_time(
            FreeTimeRequest::new(
                DeferredKind::CatalogEvent,
                "dice_game",
                WindowClass::Unrestricted,
            ),
            &catalog,
            &snapshot,
        )
        .unwrap();
    engine.on_hourly_tick(&catalog, &snapshot);

    let ids: Vec<&str> = engine
        .available_player_decisions(&catalog, &snapshot_at(0, 11))
        .iter()
        .map(|event| event.id.as_str())
        .collect();
    assert_eq!(ids, vec!["extra_drill", "write_letter"]);
}
