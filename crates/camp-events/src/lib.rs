//! Shared event types and catalog loading for the camp decision engine.
//!
//! This crate contains pure data structures with no engine logic.
//! It is a dependency for all other crates in the workspace.

pub mod catalog;
pub mod clock;
pub mod context;
pub mod event;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

// Re-export clock types
pub use clock::{
    CampClock, DayPhase, ParseClockError, WindowClass, DAYS_PER_WEEK, HOURS_PER_DAY,
};

// Re-export event definition types
pub use event::{
    ChainLink, DecisionEvent, Delivery, EventCategory, EventTiming, Formation, NarrativeSource,
    ParseRequirementError, PriorityTier, Requirement, TriggerSet,
};

// Re-export catalog types
pub use catalog::{Catalog, CatalogError};

// Re-export context types
pub use context::{
    ArmyPosture, ArmyStatus, CampSnapshot, ParseSignalError, PlayerStatus, SignalSet,
    SituationSignal, TimeMode, UiStatus,
};
