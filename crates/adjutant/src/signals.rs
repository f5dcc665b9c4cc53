//! Situation Signal Provider
//!
//! Distils the raw camp snapshot into the coarse [`SituationSignal`]
//! vocabulary that event triggers are written against. The provider is
//! read-only: it owns nothing but thresholds and is re-run every hour and
//! again at the daily boundary.

use camp_events::{ArmyPosture, CampSnapshot, SignalSet, SituationSignal};

use crate::config::SignalConfig;

/// Derives the active [`SignalSet`] from a snapshot.
#[derive(Debug, Clone)]
pub struct SignalProvider {
    config: SignalConfig,
}

impl SignalProvider {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Replaces the thresholds, used on config hot reload.
    pub fn set_config(&mut self, config: SignalConfig) {
        self.config = config;
    }

    /// Computes the signals active for this snapshot.
    ///
    /// SupplyCritical implies SupplyLow, so triggers written against the
    /// milder signal keep holding as the situation worsens. RecentBattle
    /// holds strictly within `recent_battle_days` days of the last battle.
    pub fn derive(&self, snapshot: &CampSnapshot) -> SignalSet {
        let mut signals = SignalSet::new();

        if snapshot.army.supply_days <= self.config.supply_low_days {
            signals.insert(SituationSignal::SupplyLow);
        }
        if snapshot.army.supply_days <= self.config.supply_critical_days {
            signals.insert(SituationSignal::SupplyCritical);
        }
        if snapshot.army.threat >= self.config.threat_high {
            signals.insert(SituationSignal::ThreatHigh);
        }
        if let Some(hours) = snapshot.army.hours_since_battle {
            if hours < u64::from(self.config.recent_battle_days) * 24 {
                signals.insert(SituationSignal::RecentBattle);
            }
        }
        match snapshot.army.posture {
            ArmyPosture::Marching => {
                signals.insert(SituationSignal::OnTheMarch);
            }
            ArmyPosture::Encamped => {
                signals.insert(SituationSignal::InCamp);
            }
            ArmyPosture::Besieging | ArmyPosture::Besieged => {
                signals.insert(SituationSignal::UnderSiege);
            }
        }
        if snapshot.army.wounded {
            signals.insert(SituationSignal::Wounded);
        }

        signals
    }
}

impl Default for SignalProvider {
    fn default() -> Self {
        Self::new(SignalConfig::default())
    }
}
