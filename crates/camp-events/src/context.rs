//! Context Snapshot Types
//!
//! Everything the host simulation hands the engine on each tick: the
//! campaign clock, the player's situation, the army's situation, and the
//! state of the UI. Snapshots are read-only input; the engine never writes
//! back through them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::clock::CampClock;
use crate::event::Formation;

/// The host simulation state visible to the engine for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampSnapshot {
    /// Campaign clock at the moment of the tick.
    pub clock: CampClock,
    /// The player's current situation.
    #[serde(default)]
    pub player: PlayerStatus,
    /// The army's current situation.
    #[serde(default)]
    pub army: ArmyStatus,
    /// UI and time-control state, drives the delivery safety gate.
    #[serde(default)]
    pub ui: UiStatus,
}

impl CampSnapshot {
    /// Creates a snapshot at the given clock with neutral defaults:
    /// resting infantry player, encamped army, clear UI.
    pub fn new(clock: CampClock) -> Self {
        Self {
            clock,
            player: PlayerStatus::default(),
            army: ArmyStatus::default(),
            ui: UiStatus::default(),
        }
    }
}

/// The player's situation within the company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatus {
    /// Currently scheduled activity, e.g. "drill" or "rest".
    pub activity: String,
    /// Assigned duty, if any, e.g. "sentry".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duty: Option<String>,
    /// Troop formation the player serves in.
    pub formation: Formation,
    /// Narrative progression tier, drives source gating.
    #[serde(default)]
    pub tier: u8,
    /// Which service term the player is on, starting at 0.
    #[serde(default)]
    pub term_index: u32,
    /// Spendable funds, consulted when deferred decisions charge a cost.
    #[serde(default)]
    pub funds: i64,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self {
            activity: "rest".to_string(),
            duty: None,
            formation: Formation::Infantry,
            tier: 0,
            term_index: 0,
            funds: 0,
        }
    }
}

/// Movement and engagement posture of the army.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmyPosture {
    /// Settled in camp.
    #[default]
    Encamped,
    /// Moving between positions.
    Marching,
    /// Laying siege to a position.
    Besieging,
    /// Under siege.
    Besieged,
}

/// The army's situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmyStatus {
    /// Current posture.
    pub posture: ArmyPosture,
    /// Days of supply remaining at current consumption.
    pub supply_days: f32,
    /// Perceived threat level, 0.0 to 1.0.
    pub threat: f32,
    /// Simulated hours since the last battle, if one has happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_since_battle: Option<u64>,
    /// The player is carrying a wound.
    #[serde(default)]
    pub wounded: bool,
}

impl Default for ArmyStatus {
    fn default() -> Self {
        Self {
            posture: ArmyPosture::Encamped,
            supply_days: 10.0,
            threat: 0.0,
            hours_since_battle: None,
            wounded: false,
        }
    }
}

/// Host time-control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMode {
    Paused,
    #[default]
    Normal,
    Fast,
    /// Host-forced fast-forward, e.g. while following an army.
    ForcedFast,
}

/// UI and time-control state.
///
/// Delivery of a queued decision waits until [`UiStatus::is_clear`] holds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UiStatus {
    /// A conversation is on screen.
    #[serde(default)]
    pub in_conversation: bool,
    /// An encounter or battle is in progress.
    #[serde(default)]
    pub in_encounter: bool,
    /// Another modal decision or menu is already open.
    #[serde(default)]
    pub modal_open: bool,
    /// Current time-control mode.
    #[serde(default)]
    pub time_mode: TimeMode,
}

impl UiStatus {
    /// The delivery safety gate: no conversation, no encounter, no other
    /// modal, and time running normally or fast (not paused, not forced).
    pub fn is_clear(&self) -> bool {
        !self.in_conversation
            && !self.in_encounter
            && !self.modal_open
            && matches!(self.time_mode, TimeMode::Normal | TimeMode::Fast)
    }
}

/// A boolean situation reading derived from the snapshot.
///
/// Signals are the shared vocabulary between the signal provider, which
/// derives them, and catalog triggers, which consume them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SituationSignal {
    /// Supplies below the low-water threshold.
    SupplyLow,
    /// Supplies nearly exhausted.
    SupplyCritical,
    /// Threat level above the high threshold.
    ThreatHigh,
    /// A battle happened within the recent-battle span.
    RecentBattle,
    /// The army is marching.
    OnTheMarch,
    /// The army is encamped.
    InCamp,
    /// The army is besieging or besieged.
    UnderSiege,
    /// The player is wounded.
    Wounded,
}

impl SituationSignal {
    /// Stable snake_case key, used in trigger atoms.
    pub fn as_key(&self) -> &'static str {
        match self {
            SituationSignal::SupplyLow => "supply_low",
            SituationSignal::SupplyCritical => "supply_critical",
            SituationSignal::ThreatHigh => "threat_high",
            SituationSignal::RecentBattle => "recent_battle",
            SituationSignal::OnTheMarch => "on_the_march",
            SituationSignal::InCamp => "in_camp",
            SituationSignal::UnderSiege => "under_siege",
            SituationSignal::Wounded => "wounded",
        }
    }

    /// Returns all signal variants.
    pub fn all() -> &'static [SituationSignal] {
        &[
            SituationSignal::SupplyLow,
            SituationSignal::SupplyCritical,
            SituationSignal::ThreatHigh,
            SituationSignal::RecentBattle,
            SituationSignal::OnTheMarch,
            SituationSignal::InCamp,
            SituationSignal::UnderSiege,
            SituationSignal::Wounded,
        ]
    }
}

impl fmt::Display for SituationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// Error type for parsing a SituationSignal from its key.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown situation signal '{0}'")]
pub struct ParseSignalError(pub String);

impl FromStr for SituationSignal {
    type Err = ParseSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SituationSignal::all()
            .iter()
            .find(|signal| signal.as_key() == s)
            .copied()
            .ok_or_else(|| ParseSignalError(s.to_string()))
    }
}

/// The set of signals currently derived from the simulation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalSet(HashSet<SituationSignal>);

impl SignalSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a signal. Returns true if it was not already present.
    pub fn insert(&mut self, signal: SituationSignal) -> bool {
        self.0.insert(signal)
    }

    /// Returns true if the signal is currently set.
    pub fn contains(&self, signal: SituationSignal) -> bool {
        self.0.contains(&signal)
    }

    /// Iterates over the set signals in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = SituationSignal> + '_ {
        self.0.iter().copied()
    }

    /// Number of signals set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no signals are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<SituationSignal> for SignalSet {
    fn from_iter<I: IntoIterator<Item = SituationSignal>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
