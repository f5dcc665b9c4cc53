//! Sample catalog fixture for testing.
//!
//! Provides a ready-made decision catalog for other crates' tests. Enable
//! the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // camp-events = { path = "../camp-events", features = ["test-fixtures"] }
//!
//! use camp_events::fixtures;
//!
//! let catalog = fixtures::sample_catalog();
//! ```

use crate::catalog::Catalog;
use crate::event::DecisionEvent;

/// Returns the sample catalog from the fixtures file.
///
/// Contains 14 events exercising every authoring feature:
/// - 11 automatic decisions, 3 player-initiated
/// - cooldowns, one-time flags, a per-term limit
/// - one mutually exclusive pair (inspection / latrine duty)
/// - one chain (quartermaster audit -> fallout, 6 hour delay)
/// - a formation-restricted event (cavalry remount)
/// - signal, flag, activity and duty trigger atoms
/// - sources from comrade up to commander for tier gating
pub fn sample_catalog() -> Catalog {
    let toml = include_str!("../tests/fixtures/sample_catalog.toml");
    Catalog::from_toml_str(toml).expect("sample catalog fixture should parse")
}

/// Returns a specific event definition by id from the sample catalog.
pub fn sample_event(id: &str) -> Option<DecisionEvent> {
    sample_catalog().get(id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Delivery, EventCategory, PriorityTier};

    #[test]
    fn test_sample_catalog_loads() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 14, "Should have 14 sample events");
        assert_eq!(catalog.automatic_decisions().count(), 11);
        assert_eq!(catalog.player_decisions().count(), 3);
    }

    #[test]
    fn test_sample_catalog_covers_features() {
        let catalog = sample_catalog();

        let audit = catalog.get("quartermaster_audit").unwrap();
        assert!(audit.timing.one_time);
        assert_eq!(audit.chain[0].event_id, "audit_fallout");
        assert_eq!(audit.chain[0].delay_hours, 6);

        let latrine = catalog.get("latrine_duty").unwrap();
        assert_eq!(latrine.timing.max_per_term, Some(3));
        assert_eq!(latrine.timing.exclusive_with, vec!["sergeant_inspection"]);

        let council = catalog.get("commander_council").unwrap();
        assert_eq!(council.timing.priority, PriorityTier::Critical);
        assert!(!council.triggers.all.is_empty());

        let remount = catalog.get("cavalry_remount").unwrap();
        assert!(remount.formation.is_some());
    }

    #[test]
    fn test_sample_event_lookup() {
        let event = sample_event("dice_game").unwrap();
        assert_eq!(event.delivery, Delivery::PlayerInitiated);
        assert_eq!(event.category, EventCategory::CampLife);

        assert!(sample_event("missing").is_none());
    }
}
