//! Deferred Free-Time Decisions
//!
//! A player can queue an action "for later" instead of taking it now; the
//! entry waits in the pacing state until the campaign clock enters its
//! time-of-day window, then the scheduler drains it. Draining is covered in
//! the crate root; this module holds the queue entry types.

use camp_events::{CampClock, WindowClass};
use serde::{Deserialize, Serialize};

/// What a queued free-time decision points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferredKind {
    /// A catalog decision event the player wants presented later.
    CatalogEvent,
    /// A local camp action outside the catalog, e.g. "extra rations".
    CampAction,
}

impl DeferredKind {
    /// Stable snake_case key, used when entries round-trip through saves.
    pub fn as_key(&self) -> &'static str {
        match self {
            DeferredKind::CatalogEvent => "catalog_event",
            DeferredKind::CampAction => "camp_action",
        }
    }

    /// Inverse of [`DeferredKind::as_key`].
    pub fn from_key(key: &str) -> Option<DeferredKind> {
        match key {
            "catalog_event" => Some(DeferredKind::CatalogEvent),
            "camp_action" => Some(DeferredKind::CampAction),
            _ => None,
        }
    }
}

/// A player request to queue an action for later.
///
/// `paid` is whatever the host already charged when the player queued the
/// action; the difference up to `min_cost` is charged at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeTimeRequest {
    /// Catalog event or local action.
    pub kind: DeferredKind,
    /// Event id or action name.
    pub target_id: String,
    /// Time-of-day window the action must execute in.
    pub window: WindowClass,
    /// Amount already charged at queue time.
    #[serde(default)]
    pub paid: u64,
    /// Minimum total cost the action requires at execution.
    #[serde(default)]
    pub min_cost: u64,
}

impl FreeTimeRequest {
    /// Creates a request with no cost attached.
    pub fn new(kind: DeferredKind, target_id: impl Into<String>, window: WindowClass) -> Self {
        Self {
            kind,
            target_id: target_id.into(),
            window,
            paid: 0,
            min_cost: 0,
        }
    }

    /// Attaches a cost: `paid` up front, `min_cost` total required.
    pub fn with_cost(mut self, paid: u64, min_cost: u64) -> Self {
        self.paid = paid;
        self.min_cost = min_cost;
        self
    }
}

/// A queued free-time decision waiting in the pacing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedDecision {
    /// Catalog event or local action.
    pub kind: DeferredKind,
    /// Event id or action name.
    pub target_id: String,
    /// Time-of-day window the action must execute in.
    pub window: WindowClass,
    /// Amount already charged at queue time.
    pub paid: u64,
    /// Minimum total cost the action requires at execution.
    pub min_cost: u64,
    /// Absolute hour at which the entry first becomes eligible.
    pub eligible_hour: u64,
    /// Absolute hour at which the entry was queued, drives the timeout.
    pub queued_hour: u64,
}

impl QueuedDecision {
    /// Builds the queue entry for a request at the given clock.
    ///
    /// The eligible hour is the next opening of the requested window: the
    /// current hour if the window is already open, otherwise the window's
    /// next start. A training action queued at hour 2 is eligible at hour 6
    /// of the same day.
    pub fn from_request(request: FreeTimeRequest, clock: &CampClock) -> Self {
        let eligible_hour = request.window.next_open_hour(clock);
        Self {
            kind: request.kind,
            target_id: request.target_id,
            window: request.window,
            paid: request.paid,
            min_cost: request.min_cost,
            eligible_hour,
            queued_hour: clock.hour(),
        }
    }

    /// Remaining cost to charge at execution time.
    pub fn shortfall(&self) -> u64 {
        self.min_cost.saturating_sub(self.paid)
    }

    /// True once the clock has reached the eligible hour and the window is
    /// open at the current hour of day.
    pub fn is_ready_at(&self, clock: &CampClock) -> bool {
        clock.hour() >= self.eligible_hour && self.window.is_open_at(clock.hour_of_day())
    }

    /// True once the entry has sat queued for `max_age_hours` or longer.
    pub fn is_timed_out(&self, now_hour: u64, max_age_hours: u64) -> bool {
        now_hour.saturating_sub(self.queued_hour) >= max_age_hours
    }
}

/// Errors surfaced when queueing a free-time decision.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FreeTimeError {
    /// The request names a catalog event that does not exist.
    #[error("unknown catalog event '{0}'")]
    UnknownEvent(String),
}
