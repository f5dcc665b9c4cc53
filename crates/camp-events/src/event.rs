//! Decision Event Definitions
//!
//! Read-only catalog data describing narrative decision events: what they
//! are, how they are delivered, and the conditions under which they may
//! fire. Definitions carry no mutable state; everything that changes at
//! runtime lives in the engine's pacing state.

use crate::context::{PlayerStatus, SignalSet, SituationSignal};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Content category a decision event belongs to.
///
/// Category cooldowns in the engine key off these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    CampLife,
    Training,
    Discipline,
    Command,
    Logistics,
    Battle,
}

impl EventCategory {
    /// Stable snake_case key, used for category cooldown bookkeeping.
    pub fn as_key(&self) -> &'static str {
        match self {
            EventCategory::CampLife => "camp_life",
            EventCategory::Training => "training",
            EventCategory::Discipline => "discipline",
            EventCategory::Command => "command",
            EventCategory::Logistics => "logistics",
            EventCategory::Battle => "battle",
        }
    }

    /// Returns all category variants.
    pub fn all() -> &'static [EventCategory] {
        &[
            EventCategory::CampLife,
            EventCategory::Training,
            EventCategory::Discipline,
            EventCategory::Command,
            EventCategory::Logistics,
            EventCategory::Battle,
        ]
    }

    /// Inverse of [`EventCategory::as_key`].
    pub fn from_key(key: &str) -> Option<EventCategory> {
        EventCategory::all()
            .iter()
            .find(|cat| cat.as_key() == key)
            .copied()
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// How an event reaches the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Pushed by the scheduler when pacing allows.
    #[default]
    Automatic,
    /// Pulled by the player from a camp menu.
    PlayerInitiated,
}

/// Who the event narratively comes from.
///
/// Tier gating keys off the source: higher-ranked sources only speak to
/// players who have progressed far enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    Comrade,
    Veteran,
    Sergeant,
    Quartermaster,
    Officer,
    Commander,
}

impl NarrativeSource {
    /// Stable snake_case key, used for per-source tier thresholds in config.
    pub fn as_key(&self) -> &'static str {
        match self {
            NarrativeSource::Comrade => "comrade",
            NarrativeSource::Veteran => "veteran",
            NarrativeSource::Sergeant => "sergeant",
            NarrativeSource::Quartermaster => "quartermaster",
            NarrativeSource::Officer => "officer",
            NarrativeSource::Commander => "commander",
        }
    }
}

impl fmt::Display for NarrativeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// Troop type the player serves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formation {
    Infantry,
    Archers,
    Cavalry,
    Scouts,
}

/// Scheduling priority of an event.
///
/// Selection keeps only candidates within a narrow band of the highest
/// present priority before weights are rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl PriorityTier {
    /// Numeric priority used for banding.
    pub fn value(&self) -> u32 {
        match self {
            PriorityTier::Critical => 100,
            PriorityTier::High => 75,
            PriorityTier::Normal => 50,
            PriorityTier::Low => 25,
        }
    }
}

/// Pacing limits attached to a single event definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventTiming {
    /// Days before this event may fire again. None uses the engine default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_days: Option<u32>,
    /// Fires at most once per campaign.
    #[serde(default)]
    pub one_time: bool,
    /// Fires at most this many times per service term.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_per_term: Option<u32>,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: PriorityTier,
    /// Event ids that must not fire on the same simulated day as this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusive_with: Vec<String>,
}

/// Follow-up queued when a decision resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainLink {
    /// Event to queue.
    pub event_id: String,
    /// Simulated hours between resolution and the follow-up becoming due.
    pub delay_hours: u64,
    /// When set, the link only queues if this option was chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
}

/// A single trigger condition.
///
/// Authored as `kind:value` strings, e.g. `flag:deserter_seen`,
/// `signal:supply_critical`, `activity:drill`, `duty:sentry`, `tier:2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// A story flag is active.
    Flag(String),
    /// A situation signal is currently derived.
    Signal(SituationSignal),
    /// The player's current activity matches.
    Activity(String),
    /// The player's assigned duty matches.
    Duty(String),
    /// The player's narrative tier is at least this value.
    MinTier(u8),
}

/// Error type for parsing a Requirement atom.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseRequirementError {
    #[error("requirement '{0}' has no 'kind:value' form")]
    MissingSeparator(String),
    #[error("unknown requirement kind '{0}'")]
    UnknownKind(String),
    #[error("unknown signal '{0}'")]
    UnknownSignal(String),
    #[error("invalid tier '{0}'")]
    InvalidTier(String),
    #[error("'not:' atoms are no longer supported, move '{0}' to the 'none' list")]
    NegationAtom(String),
}

impl Requirement {
    /// Evaluates the atom against current flags, signals and player status.
    pub fn holds(
        &self,
        flags: &HashSet<String>,
        signals: &SignalSet,
        player: &PlayerStatus,
    ) -> bool {
        match self {
            Requirement::Flag(name) => flags.contains(name),
            Requirement::Signal(signal) => signals.contains(*signal),
            Requirement::Activity(activity) => player.activity == *activity,
            Requirement::Duty(duty) => player.duty.as_deref() == Some(duty.as_str()),
            Requirement::MinTier(tier) => player.tier >= *tier,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Flag(name) => write!(f, "flag:{}", name),
            Requirement::Signal(signal) => write!(f, "signal:{}", signal),
            Requirement::Activity(activity) => write!(f, "activity:{}", activity),
            Requirement::Duty(duty) => write!(f, "duty:{}", duty),
            Requirement::MinTier(tier) => write!(f, "tier:{}", tier),
        }
    }
}

impl FromStr for Requirement {
    type Err = ParseRequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| ParseRequirementError::MissingSeparator(s.to_string()))?;
        match kind {
            "flag" => Ok(Requirement::Flag(value.to_string())),
            "signal" => value
                .parse::<SituationSignal>()
                .map(Requirement::Signal)
                .map_err(|_| ParseRequirementError::UnknownSignal(value.to_string())),
            "activity" => Ok(Requirement::Activity(value.to_string())),
            "duty" => Ok(Requirement::Duty(value.to_string())),
            "tier" => value
                .parse::<u8>()
                .map(Requirement::MinTier)
                .map_err(|_| ParseRequirementError::InvalidTier(value.to_string())),
            "not" => Err(ParseRequirementError::NegationAtom(value.to_string())),
            other => Err(ParseRequirementError::UnknownKind(other.to_string())),
        }
    }
}

// Requirements serialize as their authoring strings so catalogs read
// naturally in TOML.
impl Serialize for Requirement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Structured trigger predicate.
///
/// An event is trigger-eligible when every `all` atom holds, at least one
/// `any` atom holds (vacuously true when the list is empty), and no `none`
/// atom holds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TriggerSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<Requirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any: Vec<Requirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub none: Vec<Requirement>,
}

impl TriggerSet {
    /// Returns true if no atoms are present at all.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty() && self.none.is_empty()
    }

    /// Evaluates the full predicate.
    pub fn satisfied(
        &self,
        flags: &HashSet<String>,
        signals: &SignalSet,
        player: &PlayerStatus,
    ) -> bool {
        if !self.all.iter().all(|req| req.holds(flags, signals, player)) {
            return false;
        }
        if !self.any.is_empty() && !self.any.iter().any(|req| req.holds(flags, signals, player)) {
            return false;
        }
        self.none.iter().all(|req| !req.holds(flags, signals, player))
    }

    /// Returns true if any positive Activity or Duty atom matches the
    /// player's current activity or duty.
    ///
    /// Used by the selector to boost events that fit what the player is
    /// doing right now.
    pub fn matches_current_activity(&self, player: &PlayerStatus) -> bool {
        self.all.iter().chain(self.any.iter()).any(|req| match req {
            Requirement::Activity(activity) => player.activity == *activity,
            Requirement::Duty(duty) => player.duty.as_deref() == Some(duty.as_str()),
            _ => false,
        })
    }
}

/// A narrative decision event definition.
///
/// Ids are stable authored strings, globally unique within a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEvent {
    /// Unique stable id, e.g. "sergeant_inspection".
    pub id: String,
    /// Short human-readable title.
    pub title: String,
    /// Content category.
    pub category: EventCategory,
    /// Push or pull delivery.
    #[serde(default)]
    pub delivery: Delivery,
    /// Narrative source, drives tier gating.
    pub source: NarrativeSource,
    /// Pacing limits.
    #[serde(default)]
    pub timing: EventTiming,
    /// Trigger predicate.
    #[serde(default)]
    pub triggers: TriggerSet,
    /// When set, only players in this formation see the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formation: Option<Formation>,
    /// Option ids the player can pick from. Text lives outside the engine.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Follow-ups queued on resolution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<ChainLink>,
}

impl DecisionEvent {
    /// Creates a minimal automatic event. Builder methods fill in the rest.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: EventCategory,
        source: NarrativeSource,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category,
            delivery: Delivery::Automatic,
            source,
            timing: EventTiming::default(),
            triggers: TriggerSet::default(),
            formation: None,
            options: Vec::new(),
            chain: Vec::new(),
        }
    }

    /// Marks the event as player-initiated.
    pub fn player_initiated(mut self) -> Self {
        self.delivery = Delivery::PlayerInitiated;
        self
    }

    /// Sets the scheduling priority.
    pub fn with_priority(mut self, priority: PriorityTier) -> Self {
        self.timing.priority = priority;
        self
    }

    /// Sets a per-event cooldown in days.
    pub fn with_cooldown_days(mut self, days: u32) -> Self {
        self.timing.cooldown_days = Some(days);
        self
    }

    /// Marks the event as once per campaign.
    pub fn one_time(mut self) -> Self {
        self.timing.one_time = true;
        self
    }

    /// Limits how often the event fires per service term.
    pub fn with_max_per_term(mut self, count: u32) -> Self {
        self.timing.max_per_term = Some(count);
        self
    }

    /// Adds a mutual-exclusion partner.
    pub fn exclusive_with(mut self, id: impl Into<String>) -> Self {
        self.timing.exclusive_with.push(id.into());
        self
    }

    /// Adds a required trigger atom.
    pub fn require(mut self, req: Requirement) -> Self {
        self.triggers.all.push(req);
        self
    }

    /// Adds a blocking trigger atom.
    pub fn block_on(mut self, req: Requirement) -> Self {
        self.triggers.none.push(req);
        self
    }

    /// Restricts the event to one formation.
    pub fn with_formation(mut self, formation: Formation) -> Self {
        self.formation = Some(formation);
        self
    }

    /// Sets the option ids.
    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Adds a resolution follow-up.
    pub fn with_chain(mut self, event_id: impl Into<String>, delay_hours: u64) -> Self {
        self.chain.push(ChainLink {
            event_id: event_id.into(),
            delay_hours,
            option: None,
        });
        self
    }

    /// Numeric priority shortcut.
    pub fn priority_value(&self) -> u32 {
        self.timing.priority.value()
    }
}
