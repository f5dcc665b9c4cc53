//! Eligibility Filter & Weighted Selector
//!
//! Answers one question per evaluation: which automatic decision event, if
//! any, should be offered right now? The pipeline runs global pacing limits,
//! a quiet-moment roll, per-candidate filters, chain priority, priority
//! banding, integer weighting, and a cumulative-weight roulette draw, in
//! that order. Every rejection carries a [`BlockReason`] traced per
//! candidate so tuning sessions can see why the camp stayed quiet.

use camp_events::{ArmyPosture, CampSnapshot, Catalog, DecisionEvent, SignalSet};
use rand::rngs::SmallRng;
use rand::Rng;

use crate::config::{AdjutantConfig, MenuConfig, PacingConfig, TierConfig, WeightConfig};
use crate::state::PacingState;

/// Why a candidate was rejected by the per-candidate filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The event fired too recently.
    Cooldown,
    /// Another event of the same category fired too recently.
    CategoryCooldown,
    /// A one-time event that has already fired.
    OneTimeSpent,
    /// The per-term fire limit is exhausted.
    TermLimit,
    /// A mutually exclusive event fired this campaign day.
    MutualExclusion,
    /// A blocking `none` atom currently holds.
    Blocked,
    /// The player's tier is below the source's minimum.
    TierGated,
    /// The player serves in a different formation.
    WrongFormation,
    /// The positive trigger predicate is unmet.
    TriggersUnmet,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::Cooldown => "cooldown",
            BlockReason::CategoryCooldown => "category_cooldown",
            BlockReason::OneTimeSpent => "one_time_spent",
            BlockReason::TermLimit => "term_limit",
            BlockReason::MutualExclusion => "mutual_exclusion",
            BlockReason::Blocked => "blocked",
            BlockReason::TierGated => "tier_gated",
            BlockReason::WrongFormation => "wrong_formation",
            BlockReason::TriggersUnmet => "triggers_unmet",
        }
    }
}

/// A surviving candidate with its selection weight.
#[derive(Debug, Clone)]
struct WeightedCandidate<'a> {
    event: &'a DecisionEvent,
    weight: u64,
}

/// Stateless selection logic over catalog, pacing state, and snapshot.
#[derive(Debug, Clone)]
pub struct Selector {
    pacing: PacingConfig,
    weights: WeightConfig,
    menu: MenuConfig,
    tiers: TierConfig,
}

impl Selector {
    pub fn new(config: &AdjutantConfig) -> Self {
        Self {
            pacing: config.pacing.clone(),
            weights: config.weights.clone(),
            menu: config.menu.clone(),
            tiers: config.tiers.clone(),
        }
    }

    /// Picks the automatic decision event to offer now, if any.
    pub fn select_event<'a>(
        &self,
        catalog: &'a Catalog,
        state: &PacingState,
        signals: &SignalSet,
        snapshot: &CampSnapshot,
        rng: &mut SmallRng,
    ) -> Option<&'a DecisionEvent> {
        let clock = &snapshot.clock;
        let today = clock.day();

        // 1. Global pacing limits.
        if state.fired_today(today) >= self.pacing.max_per_day {
            tracing::trace!(day = today, "daily cap reached");
            return None;
        }
        if state.fired_this_week(clock.week()) >= self.pacing.max_per_week {
            tracing::trace!(week = clock.week(), "weekly cap reached");
            return None;
        }
        if let Some(hours) = state.hours_since_last_event(clock.hour()) {
            if hours < self.pacing.min_hours_between {
                tracing::trace!(hours, "too soon after the last event");
                return None;
            }
        }

        // 2. Quiet-moment roll. Some hours simply pass without incident.
        if self.pacing.quiet_days_enabled && rng.gen::<f32>() < self.pacing.quiet_day_chance {
            tracing::trace!("quiet roll, no selection this hour");
            return None;
        }

        // 3. Per-candidate filters.
        let candidates: Vec<&DecisionEvent> = catalog
            .automatic_decisions()
            .filter(|event| match self.block_reason(event, state, signals, snapshot) {
                None => true,
                Some(reason) => {
                    tracing::trace!(event = %event.id, reason = reason.as_str(), "candidate blocked");
                    false
                }
            })
            .collect();
        if candidates.is_empty() {
            return None;
        }

        // 4. Chain priority: a due follow-up that survived the filters wins
        //    outright, no banding or weighting.
        for chain_id in state.due_chain_events(clock.hour()) {
            if let Some(event) = candidates.iter().find(|e| e.id == chain_id) {
                tracing::debug!(event = %event.id, "due chain event selected");
                return Some(event);
            }
        }

        // 5. Priority banding: only candidates near the top priority compete.
        let max_priority = candidates
            .iter()
            .map(|e| e.priority_value())
            .max()
            .unwrap_or(0);
        let band_floor = max_priority.saturating_sub(u32::from(self.pacing.priority_band));
        let banded: Vec<&DecisionEvent> = candidates
            .into_iter()
            .filter(|e| e.priority_value() >= band_floor)
            .collect();

        // 6. Integer weights from base, activity match, and army posture.
        let weighted: Vec<WeightedCandidate> = banded
            .into_iter()
            .map(|event| WeightedCandidate {
                event,
                weight: self.candidate_weight(event, snapshot),
            })
            .collect();

        // 7. Roulette draw.
        let chosen = weighted_random_choice(rng, &weighted);
        tracing::debug!(event = %chosen.event.id, weight = chosen.weight, "event selected");
        Some(chosen.event)
    }

    /// Player-initiated decisions currently available, best first.
    ///
    /// Applies the per-candidate filters but none of the global pacing
    /// limits; a full day never locks the free-time menu. Sorted by
    /// priority descending with catalog order as the tiebreak, truncated
    /// to the configured menu size.
    pub fn available_player_decisions<'a>(
        &self,
        catalog: &'a Catalog,
        state: &PacingState,
        signals: &SignalSet,
        snapshot: &CampSnapshot,
    ) -> Vec<&'a DecisionEvent> {
        let mut available: Vec<&DecisionEvent> = catalog
            .player_decisions()
            .filter(|event| self.block_reason(event, state, signals, snapshot).is_none())
            .collect();
        available.sort_by(|a, b| b.priority_value().cmp(&a.priority_value()));
        available.truncate(self.menu.max_entries);
        available
    }

    /// Runs the per-candidate filters; `None` means the event is eligible.
    pub fn block_reason(
        &self,
        event: &DecisionEvent,
        state: &PacingState,
        signals: &SignalSet,
        snapshot: &CampSnapshot,
    ) -> Option<BlockReason> {
        let today = snapshot.clock.day();

        let cooldown_days = event
            .timing
            .cooldown_days
            .unwrap_or(self.pacing.default_cooldown_days);
        if let Some(days) = state.days_since_event_fired(&event.id, today) {
            if days < u64::from(cooldown_days) {
                return Some(BlockReason::Cooldown);
            }
        }

        if let Some(days) = state.days_since_category_fired(event.category, today) {
            if days < u64::from(self.pacing.category_cooldown_days) {
                return Some(BlockReason::CategoryCooldown);
            }
        }

        if event.timing.one_time && state.one_time_spent(&event.id) {
            return Some(BlockReason::OneTimeSpent);
        }

        if let Some(max) = event.timing.max_per_term {
            if state.fired_this_term_count(&event.id) >= max {
                return Some(BlockReason::TermLimit);
            }
        }

        let excluded_fired_today = event
            .timing
            .exclusive_with
            .iter()
            .any(|other| state.days_since_event_fired(other, today) == Some(0));
        if excluded_fired_today {
            return Some(BlockReason::MutualExclusion);
        }

        let blocked = event
            .triggers
            .none
            .iter()
            .any(|req| req.holds(state.flags(), signals, &snapshot.player));
        if blocked {
            return Some(BlockReason::Blocked);
        }

        if snapshot.player.tier < self.tiers.min_tier_for(event.source) {
            return Some(BlockReason::TierGated);
        }

        if let Some(formation) = event.formation {
            if formation != snapshot.player.formation {
                return Some(BlockReason::WrongFormation);
            }
        }

        if !event
            .triggers
            .satisfied(state.flags(), signals, &snapshot.player)
        {
            return Some(BlockReason::TriggersUnmet);
        }

        None
    }

    /// Selection weight for a filtered candidate, floored at one so a
    /// heavily penalized event stays drawable.
    fn candidate_weight(&self, event: &DecisionEvent, snapshot: &CampSnapshot) -> u64 {
        let mut weight = self.weights.base_weight as f32;
        if event.triggers.matches_current_activity(&snapshot.player) {
            weight *= self.weights.activity_match;
        }
        weight *= match snapshot.army.posture {
            ArmyPosture::Marching => self.weights.marching,
            ArmyPosture::Encamped => self.weights.encamped,
            ArmyPosture::Besieging | ArmyPosture::Besieged => self.weights.under_siege,
        };
        weight.max(1.0) as u64
    }
}

/// Perform weighted random selection from a list of candidates.
fn weighted_random_choice<'a, 'b, R: Rng>(
    rng: &mut R,
    candidates: &'a [WeightedCandidate<'b>],
) -> &'a WeightedCandidate<'b> {
    // Calculate total weight
    let total_weight: u64 = candidates.iter().map(|c| c.weight).sum();

    if total_weight == 0 {
        // Fallback to first candidate if weights are invalid
        return &candidates[0];
    }

    // Generate random value in [0, total_weight)
    let mut roll = rng.gen_range(0..total_weight);

    // Find the selected candidate
    for candidate in candidates {
        if roll < candidate.weight {
            return candidate;
        }
        roll -= candidate.weight;
    }

    // Fallback to last candidate (unreachable with positive weights)
    candidates.last().unwrap()
}
