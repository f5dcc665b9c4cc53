//! Configuration loading for the Adjutant.
//!
//! All engine settings are loaded from a TOML configuration file. Every
//! block has hand-tuned defaults, so a missing file or a partial file is
//! never fatal.

use std::collections::HashMap;
use std::path::Path;

use camp_events::NarrativeSource;
use serde::{Deserialize, Serialize};

/// Complete Adjutant configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjutantConfig {
    /// Master switch for automatic decision evaluation.
    pub enabled: bool,
    /// Daily/weekly caps, cooldowns, evaluation hours.
    pub pacing: PacingConfig,
    /// Selection weight multipliers.
    pub weights: WeightConfig,
    /// Player decision menu settings.
    pub menu: MenuConfig,
    /// Narrative tier gating.
    pub tiers: TierConfig,
    /// Situation signal thresholds.
    pub signals: SignalConfig,
}

impl Default for AdjutantConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pacing: PacingConfig::default(),
            weights: WeightConfig::default(),
            menu: MenuConfig::default(),
            tiers: TierConfig::default(),
            signals: SignalConfig::default(),
        }
    }
}

impl AdjutantConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads configuration from a file, falling back to defaults when the
    /// file is missing or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "using default config");
                Self::default()
            }
        }
    }
}

/// Pacing caps and evaluation cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Maximum automatic decisions per campaign day
    pub max_per_day: u32,
    /// Maximum automatic decisions per campaign week
    pub max_per_week: u32,
    /// Minimum hours between any two automatic decisions
    pub min_hours_between: u64,
    /// Cooldown applied to events that do not declare their own
    pub default_cooldown_days: u32,
    /// Cooldown shared by all events of one category
    pub category_cooldown_days: u32,
    /// Hours of day at which evaluation runs
    pub evaluation_hours: Vec<u8>,
    /// Whether some days roll quiet with no selection at all
    pub quiet_days_enabled: bool,
    /// Chance per evaluation that the quiet roll suppresses selection
    pub quiet_day_chance: f32,
    /// Candidates within this many priority points of the maximum compete
    pub priority_band: u8,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            max_per_day: 2,
            max_per_week: 6,
            min_hours_between: 6,
            default_cooldown_days: 5,
            category_cooldown_days: 2,
            evaluation_hours: vec![8, 13, 19],
            quiet_days_enabled: true,
            quiet_day_chance: 0.25,
            priority_band: 10,
        }
    }
}

/// Selection weight multipliers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    /// Starting integer weight per candidate
    pub base_weight: u32,
    /// Multiplier when a trigger matches the player's current activity or duty
    pub activity_match: f32,
    /// Posture multiplier while the army marches
    pub marching: f32,
    /// Posture multiplier while the army is encamped
    pub encamped: f32,
    /// Posture multiplier during a siege, on either side of the wall
    pub under_siege: f32,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            base_weight: 100,
            activity_match: 3.0,
            marching: 0.5,
            encamped: 1.25,
            under_siege: 0.5,
        }
    }
}

/// Player decision menu settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Maximum entries offered in the free-time menu
    pub max_entries: usize,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self { max_entries: 4 }
    }
}

/// Narrative tier gating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// When false, every source is available at tier 0
    pub gating_enabled: bool,
    /// Minimum player tier per narrative source key
    pub min_tier_by_source: HashMap<String, u8>,
}

impl TierConfig {
    /// Minimum tier required for events from the given source. Sources
    /// missing from the map are open at tier 0.
    pub fn min_tier_for(&self, source: NarrativeSource) -> u8 {
        if !self.gating_enabled {
            return 0;
        }
        self.min_tier_by_source
            .get(source.as_key())
            .copied()
            .unwrap_or(0)
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        let mut min_tier_by_source = HashMap::new();
        min_tier_by_source.insert("comrade".to_string(), 0);
        min_tier_by_source.insert("veteran".to_string(), 0);
        min_tier_by_source.insert("sergeant".to_string(), 1);
        min_tier_by_source.insert("quartermaster".to_string(), 1);
        min_tier_by_source.insert("officer".to_string(), 2);
        min_tier_by_source.insert("commander".to_string(), 3);
        Self {
            gating_enabled: true,
            min_tier_by_source,
        }
    }
}

/// Situation signal thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Supply at or below this many days raises SupplyLow
    pub supply_low_days: f32,
    /// Supply at or below this many days raises SupplyCritical as well
    pub supply_critical_days: f32,
    /// Threat at or above this raises ThreatHigh
    pub threat_high: f32,
    /// RecentBattle holds for this many days after a battle
    pub recent_battle_days: u32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            supply_low_days: 5.0,
            supply_critical_days: 2.0,
            threat_high: 0.7,
            recent_battle_days: 2,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Error parsing TOML config
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    /// Error serializing config back to TOML
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Adjutant Configuration

# Master switch for automatic decision evaluation.
enabled = true

[pacing]
max_per_day = 2
max_per_week = 6
min_hours_between = 6
default_cooldown_days = 5
category_cooldown_days = 2
evaluation_hours = [8, 13, 19]
quiet_days_enabled = true
quiet_day_chance = 0.25
priority_band = 10

[weights]
base_weight = 100
activity_match = 3.0
marching = 0.5
encamped = 1.25
under_siege = 0.5

[menu]
max_entries = 4

[tiers]
gating_enabled = true

[tiers.min_tier_by_source]
comrade = 0
veteran = 0
sergeant = 1
quartermaster = 1
officer = 2
commander = 3

[signals]
supply_low_days = 5.0
supply_critical_days = 2.0
threat_high = 0.7
recent_battle_days = 2
"#
    .to_string()
}
