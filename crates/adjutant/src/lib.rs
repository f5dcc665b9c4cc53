//! Adjutant: camp-life decision pacing and delivery.
//!
//! The Adjutant sits between the campaign simulation and the narrative
//! content layer. Hour by hour it decides whether a camp decision should be
//! offered to the player, which one, and when it is safe to present it —
//! think of it as the officer who keeps the duty roster, spacing out
//! inspections, disputes, and campfire scenes so camp life feels alive
//! without flooding the player.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   CampSnapshot + Catalog   ┌──────────┐    TickReport
//! │   host   │ ─────────────────────────▶ │ adjutant │ ──────────────────▶
//! └──────────┘       every sim hour       └──────────┘
//! ```
//!
//! # Modules
//!
//! - [`state`]: Pacing counters, cooldowns, flags, queues, outcome ring
//! - [`selector`]: Eligibility filters and weighted selection
//! - [`signals`]: Situation signals derived from the snapshot
//! - [`deferred`]: Player-queued free-time decisions
//! - [`config`]: Hierarchical TOML configuration
//! - [`persist`]: Key/value save-contract round-trip

pub mod config;
pub mod deferred;
pub mod persist;
pub mod selector;
pub mod signals;
pub mod state;

// Re-export config types
pub use config::{
    default_config_toml, AdjutantConfig, ConfigError, MenuConfig, PacingConfig, SignalConfig,
    TierConfig, WeightConfig,
};

// Re-export deferred queue types
pub use deferred::{DeferredKind, FreeTimeError, FreeTimeRequest, QueuedDecision};

// Re-export persistence types
pub use persist::{load_state, save_state, MemorySaveStore, SaveStore, SCHEMA_VERSION};

// Re-export selector types
pub use selector::{BlockReason, Selector};

// Re-export signal provider
pub use signals::SignalProvider;

// Re-export state types
pub use state::{
    truncate_summary, OutcomeLog, OutcomeRecord, PacingState, PendingSlot,
    DEFAULT_OUTCOME_CAPACITY, MAX_SUMMARY_CHARS,
};

use std::fmt;

use camp_events::{CampClock, CampSnapshot, Catalog, DecisionEvent, SignalSet};
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Hours a selected decision may wait for a safe moment before it drops.
pub const PENDING_TIMEOUT_HOURS: u64 = 24;

/// Hours a queued free-time decision may wait before it expires.
pub const DEFERRED_TIMEOUT_HOURS: u64 = 48;

/// An automatic decision handed to the player this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredDecision {
    pub event_id: String,
    pub title: String,
    /// Option ids the host should present.
    pub options: Vec<String>,
    /// Whether the decision came off the chain queue.
    pub from_chain: bool,
}

/// A queued free-time decision that executed this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedDecision {
    pub kind: DeferredKind,
    pub target_id: String,
    /// Remaining cost the host should debit from player funds.
    pub charged: u64,
}

/// Non-fatal incidents the host may want to surface or log.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A selected decision waited out its delivery window and was dropped.
    PendingDropped { event_id: String },
    /// A queued free-time decision expired unexecuted.
    DeferredExpired { target_id: String },
    /// A queued free-time decision was cancelled for lack of funds.
    DeferredUnaffordable { target_id: String, shortfall: u64 },
    /// A stored id no longer resolves in the catalog.
    UnknownEvent { event_id: String },
}

/// Everything that happened during one hourly tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub delivered: Option<DeliveredDecision>,
    pub executed: Option<ExecutedDecision>,
    pub notices: Vec<Notice>,
}

/// Everything that happened at the daily boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyReport {
    /// Flags whose TTL ran out this day, sorted.
    pub expired_flags: Vec<String>,
    pub week_rolled: bool,
}

/// Pushed to subscribers when the player resolves a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionResolved {
    pub event_id: String,
    pub option_id: String,
    /// Outcome text, truncated to [`MAX_SUMMARY_CHARS`].
    pub summary: String,
}

type ResolvedHook = Box<dyn FnMut(&DecisionResolved)>;

/// The decision scheduling engine.
///
/// Owns the pacing state, the RNG, and the derived signals; the catalog and
/// the camp snapshot arrive as arguments on every tick so the host stays in
/// control of both. It coordinates:
/// - Signal derivation (what the camp situation looks like)
/// - Weighted selection (which decision fits this moment)
/// - Safe delivery (wait for a clear UI, never forever)
/// - The deferred free-time queue (actions the player saved for later)
/// - Save-contract round-trips (resume mid-cycle without drift)
pub struct Adjutant {
    /// Configuration settings
    config: AdjutantConfig,
    /// Eligibility filters and weighting
    selector: Selector,
    /// Snapshot-to-signal thresholds
    signal_provider: SignalProvider,
    /// All persisted pacing state
    state: PacingState,
    /// Seeded selection RNG
    rng: SmallRng,
    /// Signals derived on the most recent tick
    signals: SignalSet,
    /// Resolution subscribers
    hooks: Vec<ResolvedHook>,
    /// Hour of the last accepted config reload
    last_config_apply_hour: Option<u64>,
}

impl Adjutant {
    /// Creates an engine with explicit configuration and RNG seed.
    pub fn new(config: AdjutantConfig, seed: u64) -> Self {
        let selector = Selector::new(&config);
        let signal_provider = SignalProvider::new(config.signals.clone());
        Self {
            config,
            selector,
            signal_provider,
            state: PacingState::new(),
            rng: SmallRng::seed_from_u64(seed),
            signals: SignalSet::new(),
            hooks: Vec::new(),
            last_config_apply_hour: None,
        }
    }

    /// Creates an engine from a configuration file.
    pub fn from_config_file(path: &std::path::Path, seed: u64) -> Result<Self, ConfigError> {
        Ok(Self::new(AdjutantConfig::from_file(path)?, seed))
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults(seed: u64) -> Self {
        Self::new(AdjutantConfig::default(), seed)
    }

    /// Rebuilds an engine from a saved campaign.
    ///
    /// The RNG restarts from the given seed; only the pacing state is
    /// persisted.
    pub fn restore(config: AdjutantConfig, seed: u64, store: &dyn SaveStore) -> Self {
        let mut adjutant = Self::new(config, seed);
        adjutant.state = persist::load_state(store);
        adjutant
    }

    /// Writes the pacing state into the host's save channel.
    pub fn save(&self, store: &mut dyn SaveStore) {
        persist::save_state(&self.state, store);
    }

    /// Processes one simulated hour.
    ///
    /// This is the main entry point. It:
    /// 1. Refreshes situation signals
    /// 2. Drains the deferred free-time queue (expiry, then one execution)
    /// 3. Services the pending slot (timeout, then delivery when safe)
    /// 4. Evaluates for a new decision at configured hours
    ///
    /// Steps 2 and 4 are mutually exclusive within a tick: an hour that
    /// executes a queued free-time decision never also evaluates, and at
    /// most one automatic decision is delivered.
    pub fn on_hourly_tick(&mut self, catalog: &Catalog, snapshot: &CampSnapshot) -> TickReport {
        let mut report = TickReport::default();
        let now = snapshot.clock.hour();

        // 1. Refresh signals
        self.signals = self.signal_provider.derive(snapshot);

        // 2. Deferred drain: expiry first, unconditionally.
        for entry in self
            .state
            .purge_timed_out_deferred(now, DEFERRED_TIMEOUT_HOURS)
        {
            tracing::warn!(target = %entry.target_id, "queued free-time decision expired");
            report.notices.push(Notice::DeferredExpired {
                target_id: entry.target_id,
            });
        }
        let mut missing = Vec::new();
        self.state.deferred.retain(|entry| {
            let gone =
                entry.kind == DeferredKind::CatalogEvent && !catalog.contains(&entry.target_id);
            if gone {
                missing.push(entry.target_id.clone());
            }
            !gone
        });
        for event_id in missing {
            tracing::warn!(event = %event_id, "queued decision no longer in catalog, dropping");
            report.notices.push(Notice::UnknownEvent { event_id });
        }

        if snapshot.ui.is_clear() {
            if let Some(index) = self.state.next_ready_deferred(&snapshot.clock) {
                let entry = self.state.take_deferred(index);
                let shortfall = entry.shortfall();
                if shortfall > 0
                    && snapshot.player.funds < i64::try_from(shortfall).unwrap_or(i64::MAX)
                {
                    tracing::warn!(
                        target = %entry.target_id,
                        shortfall,
                        "cannot afford queued decision, cancelling"
                    );
                    report.notices.push(Notice::DeferredUnaffordable {
                        target_id: entry.target_id,
                        shortfall,
                    });
                } else {
                    if entry.kind == DeferredKind::CatalogEvent {
                        if let Some(event) = catalog.get(&entry.target_id) {
                            self.state.record_event_fired(event, &snapshot.clock);
                            self.queue_unconditional_chains(event, now);
                        }
                    }
                    tracing::info!(target = %entry.target_id, "queued free-time decision executed");
                    report.executed = Some(ExecutedDecision {
                        kind: entry.kind,
                        target_id: entry.target_id,
                        charged: shortfall,
                    });
                    // Drain and evaluation are mutually exclusive.
                    return report;
                }
            }
        }

        // 3. Pending slot: timeout is checked before the safety gate, so a
        //    candidate drops at exactly the limit even while the UI is busy.
        let timed_out = self
            .state
            .pending
            .as_ref()
            .is_some_and(|slot| now.saturating_sub(slot.queued_hour) >= PENDING_TIMEOUT_HOURS);
        if timed_out {
            if let Some(slot) = self.state.pending.take() {
                tracing::warn!(event = %slot.event_id, "no safe moment found, dropping pending decision");
                report.notices.push(Notice::PendingDropped {
                    event_id: slot.event_id,
                });
            }
        } else if self.state.pending.is_some() && snapshot.ui.is_clear() {
            if self.deliver_pending(catalog, snapshot, &mut report) {
                return report;
            }
        }

        // 4. Evaluation, at most once per hour.
        let should_evaluate = self.config.enabled
            && self.state.pending.is_none()
            && self
                .config
                .pacing
                .evaluation_hours
                .contains(&snapshot.clock.hour_of_day())
            && self.state.last_evaluated_hour != Some(now);
        if should_evaluate {
            self.state.last_evaluated_hour = Some(now);
            let selected =
                self.selector
                    .select_event(catalog, &self.state, &self.signals, snapshot, &mut self.rng);
            if let Some(event) = selected {
                let from_chain = self
                    .state
                    .due_chain_events(now)
                    .iter()
                    .any(|id| *id == event.id);
                tracing::debug!(event = %event.id, from_chain, "decision queued for delivery");
                self.state.pending = Some(PendingSlot {
                    event_id: event.id.clone(),
                    queued_hour: now,
                    from_chain,
                });
                // Immediate delivery attempt in the same tick.
                if snapshot.ui.is_clear() {
                    self.deliver_pending(catalog, snapshot, &mut report);
                }
            }
        }

        report
    }

    /// Processes the daily boundary.
    ///
    /// Aligns the daily and weekly counters with the new day, expires
    /// flags, and refreshes signals in case the hourly tick was skipped.
    pub fn on_daily_tick(&mut self, snapshot: &CampSnapshot) -> DailyReport {
        let day = snapshot.clock.day();
        self.state.reset_daily_counter(day);
        let week_rolled = self.state.reset_weekly_counter(snapshot.clock.week());
        let expired_flags = self.state.expire_flags(day);
        self.signals = self.signal_provider.derive(snapshot);

        if !expired_flags.is_empty() {
            tracing::debug!(?expired_flags, day, "flags expired");
        }
        DailyReport {
            expired_flags,
            week_rolled,
        }
    }

    /// Starts a new service term. Per-term fire counts reset; cooldowns,
    /// one-time history, and flags all carry over.
    pub fn begin_new_term(&mut self) {
        self.state.reset_term_counters();
        tracing::debug!("per-term counters reset");
    }

    /// Queues a free-time decision for later execution; returns the
    /// absolute hour at which it first becomes eligible.
    pub fn queue_free_time(
        &mut self,
        request: FreeTimeRequest,
        catalog: &Catalog,
        snapshot: &CampSnapshot,
    ) -> Result<u64, FreeTimeError> {
        if request.kind == DeferredKind::CatalogEvent && !catalog.contains(&request.target_id) {
            return Err(FreeTimeError::UnknownEvent(request.target_id));
        }
        let entry = QueuedDecision::from_request(request, &snapshot.clock);
        let eligible_hour = entry.eligible_hour;
        tracing::debug!(target = %entry.target_id, eligible_hour, "free-time decision queued");
        self.state.push_deferred(entry);
        Ok(eligible_hour)
    }

    /// Player-initiated decisions currently available, best first.
    pub fn available_player_decisions<'a>(
        &self,
        catalog: &'a Catalog,
        snapshot: &CampSnapshot,
    ) -> Vec<&'a DecisionEvent> {
        let signals = self.signal_provider.derive(snapshot);
        self.selector
            .available_player_decisions(catalog, &self.state, &signals, snapshot)
    }

    /// Records the player's choice for a delivered decision.
    ///
    /// Pushes an outcome record, queues any chain links bound to the chosen
    /// option, and notifies subscribers.
    pub fn resolve_decision(
        &mut self,
        event_id: &str,
        option_id: &str,
        outcome: &str,
        catalog: &Catalog,
        snapshot: &CampSnapshot,
    ) {
        let summary = truncate_summary(outcome);
        self.state.push_outcome(OutcomeRecord {
            event_id: event_id.to_string(),
            option_id: option_id.to_string(),
            day: snapshot.clock.day(),
            hour: snapshot.clock.hour_of_day(),
            summary: summary.clone(),
        });

        match catalog.get(event_id) {
            Some(event) => {
                let now = snapshot.clock.hour();
                for link in &event.chain {
                    if link.option.as_deref() == Some(option_id) {
                        self.state
                            .queue_chain_event(link.event_id.as_str(), now + link.delay_hours);
                    }
                }
            }
            None => tracing::warn!(event = event_id, "resolved decision not in catalog"),
        }

        let resolved = DecisionResolved {
            event_id: event_id.to_string(),
            option_id: option_id.to_string(),
            summary,
        };
        tracing::info!(event = %resolved.event_id, option = %resolved.option_id, "decision resolved");
        for hook in &mut self.hooks {
            hook(&resolved);
        }
    }

    /// Subscribes to decision resolutions.
    pub fn on_decision_resolved<F>(&mut self, hook: F)
    where
        F: FnMut(&DecisionResolved) + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    /// Sets a narrative flag that never expires.
    pub fn set_flag(&mut self, name: impl Into<String>) {
        self.state.set_flag(name);
    }

    /// Sets a narrative flag expiring after `ttl_days` daily boundaries.
    pub fn set_flag_with_ttl(&mut self, name: impl Into<String>, ttl_days: u32, clock: &CampClock) {
        self.state.set_flag_with_ttl(name, ttl_days, clock.day());
    }

    pub fn clear_flag(&mut self, name: &str) -> bool {
        self.state.clear_flag(name)
    }

    /// Applies a new configuration, accepted at most once per simulated
    /// hour; excess calls within the same hour are ignored.
    pub fn apply_config(&mut self, config: AdjutantConfig, clock: &CampClock) {
        let now = clock.hour();
        if self.last_config_apply_hour == Some(now) {
            tracing::warn!(hour = now, "config already reloaded this hour, ignoring");
            return;
        }
        self.last_config_apply_hour = Some(now);
        self.selector = Selector::new(&config);
        self.signal_provider.set_config(config.signals.clone());
        self.config = config;
        tracing::info!(hour = now, "config reloaded");
    }

    /// Delivers the pending decision now. Returns false when the slot was
    /// empty or its id no longer resolves.
    fn deliver_pending(
        &mut self,
        catalog: &Catalog,
        snapshot: &CampSnapshot,
        report: &mut TickReport,
    ) -> bool {
        let Some(slot) = self.state.pending.take() else {
            return false;
        };
        let Some(event) = catalog.get(&slot.event_id) else {
            tracing::warn!(event = %slot.event_id, "pending decision no longer in catalog, dropping");
            report.notices.push(Notice::UnknownEvent {
                event_id: slot.event_id,
            });
            return false;
        };

        self.state.record_event_fired(event, &snapshot.clock);
        self.queue_unconditional_chains(event, snapshot.clock.hour());

        tracing::info!(event = %event.id, "decision delivered");
        report.delivered = Some(DeliveredDecision {
            event_id: event.id.clone(),
            title: event.title.clone(),
            options: event.options.clone(),
            from_chain: slot.from_chain,
        });
        true
    }

    /// Queues the follow-ups that fire regardless of which option the player
    /// picks. Option-bound links wait for [`Adjutant::resolve_decision`].
    fn queue_unconditional_chains(&mut self, event: &DecisionEvent, now: u64) {
        for link in &event.chain {
            if link.option.is_none() {
                self.state
                    .queue_chain_event(link.event_id.as_str(), now + link.delay_hours);
            }
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &AdjutantConfig {
        &self.config
    }

    /// Returns the pacing state for inspection.
    pub fn state(&self) -> &PacingState {
        &self.state
    }

    /// Signals derived on the most recent tick.
    pub fn signals(&self) -> &SignalSet {
        &self.signals
    }
}

impl fmt::Debug for Adjutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adjutant")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("signals", &self.signals)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}
