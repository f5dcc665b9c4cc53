//! Pacing State Store
//!
//! Owns every counter, cooldown mark, flag, and queue the scheduler consults
//! between ticks. All reads are watermark-aware: queries take the current
//! day/week/hour number and return zero when the stored watermark belongs to
//! an earlier period, so a state restored mid-day answers the same as one
//! that lived through the rollover. Mutations update watermarks before
//! incrementing, never after.
//!
//! Nothing here touches the catalog or the RNG; the store is plain data that
//! the persistence layer round-trips as scalars.

use std::collections::{HashMap, HashSet};

use camp_events::{CampClock, DecisionEvent, EventCategory};
use serde::{Deserialize, Serialize};

use crate::deferred::QueuedDecision;

/// Longest summary text kept in an outcome record, in characters.
pub const MAX_SUMMARY_CHARS: usize = 160;

/// Default capacity of the outcome ring.
pub const DEFAULT_OUTCOME_CAPACITY: usize = 32;

/// One resolved decision, kept in the outcome ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub event_id: String,
    pub option_id: String,
    /// Campaign day the decision was resolved on.
    pub day: u64,
    /// Hour of day (0-23) of the resolution.
    pub hour: u8,
    /// Free-form outcome text, truncated to [`MAX_SUMMARY_CHARS`].
    pub summary: String,
}

/// Fixed-capacity ring of the most recent outcome records.
///
/// Newest overwrites oldest; `head` is the index of the oldest slot once the
/// ring is full, and 0 while it is still filling.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeLog {
    slots: Vec<OutcomeRecord>,
    head: usize,
    capacity: usize,
}

impl OutcomeLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            head: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Appends a record, evicting the oldest once the ring is full.
    pub fn push(&mut self, record: OutcomeRecord) {
        if self.slots.len() < self.capacity {
            self.slots.push(record);
        } else {
            self.slots[self.head] = record;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Records oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &OutcomeRecord> {
        let len = self.slots.len();
        (0..len).map(move |i| &self.slots[(self.head + i) % len.max(1)])
    }

    /// The most recently pushed record, if any.
    pub fn latest(&self) -> Option<&OutcomeRecord> {
        let len = self.slots.len();
        if len == 0 {
            return None;
        }
        let newest = (self.head + len - 1) % len;
        Some(&self.slots[newest])
    }

    pub(crate) fn head(&self) -> usize {
        self.head
    }

    /// Rebuilds the ring from persisted parts. Slots arrive in storage
    /// order, not age order.
    pub(crate) fn from_parts(capacity: usize, head: usize, slots: Vec<OutcomeRecord>) -> Self {
        let capacity = capacity.max(1);
        let mut slots = slots;
        slots.truncate(capacity);
        let head = if slots.len() < capacity { 0 } else { head % capacity };
        Self {
            slots,
            head,
            capacity,
        }
    }

    pub(crate) fn raw_slots(&self) -> &[OutcomeRecord] {
        &self.slots
    }
}

impl Default for OutcomeLog {
    fn default() -> Self {
        Self::new(DEFAULT_OUTCOME_CAPACITY)
    }
}

/// The candidate currently waiting for a safe moment to be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSlot {
    pub event_id: String,
    /// Absolute hour the candidate entered the slot, drives the timeout.
    pub queued_hour: u64,
    /// Whether the candidate came off the chain queue.
    pub from_chain: bool,
}

/// All mutable scheduling state, owned by the engine and persisted whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacingState {
    /// Last campaign day each event fired on.
    pub(crate) event_last_fired_day: HashMap<String, u64>,
    /// Last campaign day each category fired on.
    pub(crate) category_last_fired_day: HashMap<EventCategory, u64>,
    /// Ids of one-time events that have fired. Monotone, survives term resets.
    pub(crate) one_time_fired: HashSet<String>,
    /// Fire counts within the current service term.
    pub(crate) fired_this_term: HashMap<String, u32>,
    /// Fires on the watermark day.
    pub(crate) fired_today: u32,
    pub(crate) last_fired_day: u64,
    /// Fires in the watermark week.
    pub(crate) fired_this_week: u32,
    pub(crate) last_fired_week: u64,
    /// Absolute hour of the most recent fire, for minimum spacing.
    pub(crate) last_event_fired_hour: Option<u64>,
    /// Narrative flags currently set.
    pub(crate) active_flags: HashSet<String>,
    /// Expiry day per flag; flags without an entry never expire.
    pub(crate) flag_expiry_day: HashMap<String, u64>,
    /// Chained follow-up ids in queue order.
    pub(crate) chain_queue: Vec<String>,
    /// Absolute hour each queued chain id becomes due.
    pub(crate) chain_due_hour: HashMap<String, u64>,
    /// Player-queued free-time decisions, oldest first.
    pub(crate) deferred: Vec<QueuedDecision>,
    /// Recent resolution history.
    pub(crate) outcome_log: OutcomeLog,
    /// Candidate awaiting delivery, at most one.
    pub(crate) pending: Option<PendingSlot>,
    /// Absolute hour of the last evaluation pass, so a restored tick does
    /// not evaluate the same hour twice.
    pub(crate) last_evaluated_hour: Option<u64>,
}

impl PacingState {
    pub fn new() -> Self {
        Self::default()
    }

    // --- queries -----------------------------------------------------------

    /// Whole days since the event last fired, `None` if it never has.
    pub fn days_since_event_fired(&self, id: &str, today: u64) -> Option<u64> {
        self.event_last_fired_day
            .get(id)
            .map(|&day| today.saturating_sub(day))
    }

    /// Whole days since the category last fired, `None` if it never has.
    pub fn days_since_category_fired(&self, category: EventCategory, today: u64) -> Option<u64> {
        self.category_last_fired_day
            .get(&category)
            .map(|&day| today.saturating_sub(day))
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.active_flags.contains(name)
    }

    /// All currently active flags, for trigger evaluation.
    pub fn flags(&self) -> &HashSet<String> {
        &self.active_flags
    }

    /// Fire count for the event within the current term.
    pub fn fired_this_term_count(&self, id: &str) -> u32 {
        self.fired_this_term.get(id).copied().unwrap_or(0)
    }

    /// Hours since any event fired, `None` before the first fire.
    pub fn hours_since_last_event(&self, hour: u64) -> Option<u64> {
        self.last_event_fired_hour
            .map(|fired| hour.saturating_sub(fired))
    }

    /// Fires so far on the given day; zero if the watermark day is older.
    pub fn fired_today(&self, today: u64) -> u32 {
        if self.last_fired_day == today {
            self.fired_today
        } else {
            0
        }
    }

    /// Fires so far in the given week; zero if the watermark week is older.
    pub fn fired_this_week(&self, week: u64) -> u32 {
        if self.last_fired_week == week {
            self.fired_this_week
        } else {
            0
        }
    }

    pub fn one_time_spent(&self, id: &str) -> bool {
        self.one_time_fired.contains(id)
    }

    /// Queued chain ids whose due hour has arrived, in queue order.
    pub fn due_chain_events(&self, hour: u64) -> Vec<&str> {
        self.chain_queue
            .iter()
            .filter(|id| {
                self.chain_due_hour
                    .get(id.as_str())
                    .is_some_and(|&due| due <= hour)
            })
            .map(String::as_str)
            .collect()
    }

    pub fn pending(&self) -> Option<&PendingSlot> {
        self.pending.as_ref()
    }

    pub fn deferred(&self) -> &[QueuedDecision] {
        &self.deferred
    }

    pub fn outcomes(&self) -> &OutcomeLog {
        &self.outcome_log
    }

    // --- mutations ---------------------------------------------------------

    /// Marks an event as fired now. Updates cooldown marks, one-time
    /// membership, the per-term count, daily/weekly counters, and the
    /// global spacing hour; removes the id from the chain queue if present.
    pub fn record_event_fired(&mut self, event: &DecisionEvent, clock: &CampClock) {
        let today = clock.day();
        let week = clock.week();

        if self.last_fired_day != today {
            self.fired_today = 0;
            self.last_fired_day = today;
        }
        if self.last_fired_week != week {
            self.fired_this_week = 0;
            self.last_fired_week = week;
        }
        self.fired_today += 1;
        self.fired_this_week += 1;
        self.last_event_fired_hour = Some(clock.hour());

        self.event_last_fired_day.insert(event.id.clone(), today);
        self.category_last_fired_day.insert(event.category, today);
        if event.timing.one_time {
            self.one_time_fired.insert(event.id.clone());
        }
        *self.fired_this_term.entry(event.id.clone()).or_insert(0) += 1;

        self.remove_chain_event(&event.id);
    }

    /// Sets a flag that never expires.
    pub fn set_flag(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.flag_expiry_day.remove(&name);
        self.active_flags.insert(name);
    }

    /// Sets a flag expiring `ttl_days` daily boundaries from today. A TTL of
    /// zero behaves like [`PacingState::set_flag`].
    pub fn set_flag_with_ttl(&mut self, name: impl Into<String>, ttl_days: u32, today: u64) {
        let name = name.into();
        if ttl_days == 0 {
            self.flag_expiry_day.remove(&name);
        } else {
            self.flag_expiry_day
                .insert(name.clone(), today + u64::from(ttl_days));
        }
        self.active_flags.insert(name);
    }

    pub fn clear_flag(&mut self, name: &str) -> bool {
        self.flag_expiry_day.remove(name);
        self.active_flags.remove(name)
    }

    /// Removes flags whose expiry day has arrived; returns the expired
    /// names sorted. Called once per simulated day.
    pub fn expire_flags(&mut self, today: u64) -> Vec<String> {
        let mut expired: Vec<String> = self
            .flag_expiry_day
            .iter()
            .filter(|(_, &expiry)| expiry <= today)
            .map(|(name, _)| name.clone())
            .collect();
        expired.sort();
        for name in &expired {
            self.active_flags.remove(name);
            self.flag_expiry_day.remove(name);
        }
        expired
    }

    /// Queues a chained follow-up. A duplicate id keeps its queue position
    /// and only has its due hour replaced.
    pub fn queue_chain_event(&mut self, id: impl Into<String>, due_hour: u64) {
        let id = id.into();
        if !self.chain_due_hour.contains_key(&id) {
            self.chain_queue.push(id.clone());
        }
        self.chain_due_hour.insert(id, due_hour);
    }

    /// Drops a queued chain id; true if it was present.
    pub fn remove_chain_event(&mut self, id: &str) -> bool {
        if self.chain_due_hour.remove(id).is_some() {
            self.chain_queue.retain(|queued| queued != id);
            true
        } else {
            false
        }
    }

    pub fn push_outcome(&mut self, record: OutcomeRecord) {
        self.outcome_log.push(record);
    }

    /// Aligns the daily watermark with the new day, zeroing the counter if
    /// the day actually changed.
    pub fn reset_daily_counter(&mut self, day: u64) {
        if self.last_fired_day != day {
            self.fired_today = 0;
            self.last_fired_day = day;
        }
    }

    /// Aligns the weekly watermark; true if the week rolled.
    pub fn reset_weekly_counter(&mut self, week: u64) -> bool {
        if self.last_fired_week != week {
            self.fired_this_week = 0;
            self.last_fired_week = week;
            true
        } else {
            false
        }
    }

    /// Clears per-term fire counts only. Cooldowns, one-time history, and
    /// flags all survive a new term.
    pub fn reset_term_counters(&mut self) {
        self.fired_this_term.clear();
    }

    // --- deferred queue ----------------------------------------------------

    pub fn push_deferred(&mut self, decision: QueuedDecision) {
        self.deferred.push(decision);
    }

    /// Removes entries queued for `max_age_hours` or longer; returns them in
    /// queue order.
    pub fn purge_timed_out_deferred(
        &mut self,
        now_hour: u64,
        max_age_hours: u64,
    ) -> Vec<QueuedDecision> {
        let mut purged = Vec::new();
        self.deferred.retain(|entry| {
            if entry.is_timed_out(now_hour, max_age_hours) {
                purged.push(entry.clone());
                false
            } else {
                true
            }
        });
        purged
    }

    /// Index of the first deferred entry ready to execute at this clock.
    pub fn next_ready_deferred(&self, clock: &CampClock) -> Option<usize> {
        self.deferred
            .iter()
            .position(|entry| entry.is_ready_at(clock))
    }

    /// Removes and returns the entry at `index`, preserving queue order.
    pub fn take_deferred(&mut self, index: usize) -> QueuedDecision {
        self.deferred.remove(index)
    }
}

/// Truncates outcome text to [`MAX_SUMMARY_CHARS`] characters.
pub fn truncate_summary(text: &str) -> String {
    if text.chars().count() <= MAX_SUMMARY_CHARS {
        text.to_string()
    } else {
        text.chars().take(MAX_SUMMARY_CHARS).collect()
    }
}
