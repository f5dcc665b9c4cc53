//! Campaign Drill Harness
//!
//! Runs a scripted month against the decision engine and prints the
//! transcript: what the adjutant delivered, what the player queued for free
//! time, and the outcome log at the end. Useful for eyeballing pacing
//! changes without booting a full game.
//!
//! Run with: cargo run -p drill
//!
//! Examples:
//!   cargo run -p drill -- --days 30 --seed 42
//!   cargo run -p drill -- --config garrison.toml --catalog events.toml

use std::path::PathBuf;

use adjutant::{Adjutant, AdjutantConfig, DeferredKind, FreeTimeRequest, MemorySaveStore};
use camp_events::{ArmyPosture, CampClock, CampSnapshot, Catalog, WindowClass};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Catalog compiled into the binary, used when --catalog is not given.
const DEFAULT_CATALOG: &str = include_str!("../assets/catalog.toml");

/// Scripted campaign harness for the camp decision engine
#[derive(Parser, Debug)]
#[command(name = "drill")]
#[command(about = "Runs a scripted campaign against the adjutant and prints the transcript")]
struct Args {
    /// Number of campaign days to simulate
    #[arg(long, default_value_t = 30)]
    days: u64,

    /// Random seed for the engine
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Path to an adjutant configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a decision catalog; the built-in campaign catalog is used
    /// when omitted
    #[arg(long)]
    catalog: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drill=info,adjutant=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AdjutantConfig::load_or_default(path),
        None => AdjutantConfig::default(),
    };
    let catalog = match load_catalog(args.catalog.as_deref()) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, "failed to load catalog");
            std::process::exit(1);
        }
    };
    info!(events = catalog.len(), days = args.days, seed = args.seed, "drill starting");

    let mut engine = Adjutant::new(config.clone(), args.seed);
    let mut delivered_count = 0u32;
    let mut executed_count = 0u32;

    for day in 0..args.days {
        let midnight = scripted_snapshot(day, 0);
        let daily = engine.on_daily_tick(&midnight);
        for flag in &daily.expired_flags {
            info!(day, flag = %flag, "flag expired");
        }
        if day % 7 == 6 {
            engine.set_flag_with_ttl("pay_day", 1, &midnight.clock);
            println!("day {day:>2} 00:00  pay muster called");
        }

        for hour in 0..24u8 {
            let snapshot = scripted_snapshot(day, hour);

            // Early in the campaign the player sets aside time to mend kit,
            // paying the quartermaster on execution.
            if day == 2 && hour == 5 {
                let request = FreeTimeRequest::new(
                    DeferredKind::CatalogEvent,
                    "mend_kit",
                    WindowClass::Training,
                )
                .with_cost(0, 15);
                match engine.queue_free_time(request, &catalog, &snapshot) {
                    Ok(eligible) => {
                        println!("day {day:>2} {hour:02}:00  queued kit mending, eligible hour {eligible}")
                    }
                    Err(e) => warn!(error = %e, "could not queue free-time action"),
                }
            }

            let report = engine.on_hourly_tick(&catalog, &snapshot);
            if let Some(decision) = &report.delivered {
                delivered_count += 1;
                let chain_note = if decision.from_chain { " (chained)" } else { "" };
                println!(
                    "day {day:>2} {hour:02}:00  [{}] {}{}",
                    decision.event_id, decision.title, chain_note
                );
                // The drill picks the first option every time.
                if let Some(option) = decision.options.first() {
                    engine.resolve_decision(
                        &decision.event_id,
                        option,
                        "Taken in stride.",
                        &catalog,
                        &snapshot,
                    );
                    println!("               -> {option}");
                }
            }
            if let Some(executed) = &report.executed {
                executed_count += 1;
                println!(
                    "day {day:>2} {hour:02}:00  free time: {} ({} coin)",
                    executed.target_id, executed.charged
                );
            }
            for notice in &report.notices {
                info!(?notice, "notice");
            }
        }

        // Hand the campaign over through the save channel at the midpoint,
        // the way a host reloading a session would.
        if day + 1 == args.days / 2 {
            let mut store = MemorySaveStore::new();
            engine.save(&mut store);
            engine = Adjutant::restore(config.clone(), args.seed, &store);
            info!(day, keys = store.len(), "campaign saved and restored mid-run");
        }
    }

    println!();
    println!(
        "outcome log ({} of {} deliveries):",
        engine.state().outcomes().len(),
        delivered_count
    );
    for outcome in engine.state().outcomes().iter() {
        println!(
            "  day {:>2} {:02}:00  {} -> {}",
            outcome.day, outcome.hour, outcome.event_id, outcome.option_id
        );
    }
    println!("{delivered_count} delivered, {executed_count} executed");
}

fn load_catalog(path: Option<&std::path::Path>) -> Result<Catalog, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            Ok(Catalog::from_toml_str(&content)?)
        }
        None => Ok(Catalog::from_toml_str(DEFAULT_CATALOG)?),
    }
}

/// Campaign script: a month on the march.
///
/// Every sixth day the column moves; a battle breaks on the morning of day
/// 14 with the threat running high around it, and a tense standoff follows
/// around day 21. Supplies dwindle slowly; the player's standing climbs a
/// tier every six days.
fn scripted_snapshot(day: u64, hour: u8) -> CampSnapshot {
    let mut snapshot = CampSnapshot::new(CampClock::from_day_hour(day, hour));
    snapshot.player.tier = (day / 6).min(3) as u8;
    snapshot.player.activity = if (8..12).contains(&hour) {
        "drill".to_string()
    } else {
        "rest".to_string()
    };
    snapshot.player.funds = 120;
    snapshot.army.posture = if day % 6 == 4 {
        ArmyPosture::Marching
    } else {
        ArmyPosture::Encamped
    };
    snapshot.army.supply_days = (9.0 - 0.2 * day as f32).max(2.5);
    snapshot.army.threat = if (13..=15).contains(&day) || (20..=22).contains(&day) {
        0.85
    } else {
        0.25
    };
    let battle_hour = CampClock::from_day_hour(14, 6).hour();
    if snapshot.clock.hour() >= battle_hour {
        snapshot.army.hours_since_battle = Some(snapshot.clock.hour() - battle_hour);
    }
    snapshot
}
