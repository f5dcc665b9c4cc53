//! Event Catalog
//!
//! Holds the full set of decision event definitions and validates them at
//! load time, so authoring mistakes (duplicate ids, exclusion or chain
//! references to events that do not exist) fail fast in tests instead of
//! silently never matching at runtime.
//!
//! Catalogs are authored in TOML as an `[[events]]` array; see
//! `tests/fixtures/sample_catalog.toml` for the format.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::event::{DecisionEvent, Delivery, EventCategory};

/// Errors that can occur while loading or validating a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// IO error reading a catalog file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error parsing catalog TOML (includes malformed trigger atoms).
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// An event id appears more than once.
    #[error("duplicate event id '{0}'")]
    DuplicateId(String),
    /// An event id is empty.
    #[error("event at index {0} has an empty id")]
    EmptyId(usize),
    /// An exclusion list names an id not present in the catalog.
    #[error("event '{event}' excludes unknown event '{target}'")]
    UnknownExclusion { event: String, target: String },
    /// A chain link names an id not present in the catalog.
    #[error("event '{event}' chains to unknown event '{target}'")]
    UnknownChainTarget { event: String, target: String },
}

/// TOML authoring wrapper: a file is an array of `[[events]]` tables.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    events: Vec<DecisionEvent>,
}

/// A validated, read-only set of decision event definitions.
#[derive(Debug, Clone)]
pub struct Catalog {
    events: Vec<DecisionEvent>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Builds a catalog from event definitions, validating as it goes.
    ///
    /// Validation: ids are unique and non-empty, and every id referenced by
    /// an `exclusive_with` list or a chain link resolves to an event in the
    /// same catalog.
    pub fn new(events: Vec<DecisionEvent>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(events.len());
        for (index, event) in events.iter().enumerate() {
            if event.id.is_empty() {
                return Err(CatalogError::EmptyId(index));
            }
            if by_id.insert(event.id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateId(event.id.clone()));
            }
        }

        for event in &events {
            for target in &event.timing.exclusive_with {
                if !by_id.contains_key(target) {
                    return Err(CatalogError::UnknownExclusion {
                        event: event.id.clone(),
                        target: target.clone(),
                    });
                }
            }
            for link in &event.chain {
                if !by_id.contains_key(&link.event_id) {
                    return Err(CatalogError::UnknownChainTarget {
                        event: event.id.clone(),
                        target: link.event_id.clone(),
                    });
                }
            }
        }

        Ok(Self { events, by_id })
    }

    /// Parses a catalog from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::new(file.events)
    }

    /// Loads a catalog from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Looks up an event by id.
    pub fn get(&self, id: &str) -> Option<&DecisionEvent> {
        self.by_id.get(id).map(|&index| &self.events[index])
    }

    /// Returns true if an event with the given id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Iterates over all events in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = &DecisionEvent> {
        self.events.iter()
    }

    /// Iterates over automatically delivered events, in authoring order.
    pub fn automatic_decisions(&self) -> impl Iterator<Item = &DecisionEvent> {
        self.events
            .iter()
            .filter(|e| e.delivery == Delivery::Automatic)
    }

    /// Iterates over player-initiated events, in authoring order.
    pub fn player_decisions(&self) -> impl Iterator<Item = &DecisionEvent> {
        self.events
            .iter()
            .filter(|e| e.delivery == Delivery::PlayerInitiated)
    }

    /// Iterates over events in one category, in authoring order.
    pub fn by_category(&self, category: EventCategory) -> impl Iterator<Item = &DecisionEvent> {
        self.events.iter().filter(move |e| e.category == category)
    }

    /// Number of events in the catalog.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the catalog holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
