//! Designer-tunable run configuration, loaded from `assets/config/run.json`.
//!
//! Every field has a default, so a partial (or missing) file still yields a
//! playable run. Invalid files are rejected by [`RunConfig::validate`] and
//! replaced by the defaults with a warning.

use std::fmt;
use std::path::Path;

use bevy::prelude::*;
use serde::Deserialize;

use crate::gameplay::abilities::AbilityKind;
use crate::gameplay::combat::weapon::Cadence;
use crate::gameplay::player::CharacterDef;
use crate::gameplay::progression::{UpgradeDef, UpgradeEffect};
use crate::gameplay::waves::Curve;

/// Location of the run configuration, relative to the working directory.
pub const CONFIG_PATH: &str = "assets/config/run.json";

// === Errors ===

/// Failure to load a [`RunConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Io(std::io::Error),
    /// The file is not valid JSON for a `RunConfig`.
    Parse(serde_json::Error),
    /// The file parsed but a value is out of range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read run config: {err}"),
            Self::Parse(err) => write!(f, "malformed run config: {err}"),
            Self::Invalid(reason) => write!(f, "invalid run config: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}

// === Sections ===

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub max_health: f32,
    /// Invulnerability window after each hit, in seconds.
    pub iframes: f32,
    pub move_speed: f32,
    pub acceleration: f32,
    pub pickup_radius: f32,
    pub radius: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            iframes: 0.3,
            move_speed: 168.0,
            acceleration: 480.0,
            pickup_radius: 84.0,
            radius: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    /// Shots per second.
    pub fire_rate: f32,
    pub damage: f32,
    pub range: f32,
    pub require_line_of_sight: bool,
    /// Impulse speed applied to targets with a physics body. 0 disables.
    pub knockback: f32,
    pub cadence: Cadence,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            fire_rate: 2.0,
            damage: 5.0,
            range: 360.0,
            require_line_of_sight: true,
            knockback: 0.0,
            cadence: Cadence::RetryOnMiss,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub max_health: f32,
    pub move_speed: f32,
    pub radius: f32,
    /// Chasers stop steering once this close to their target.
    pub stopping_distance: f32,
    pub melee: WeaponConfig,
    pub retarget_interval: f32,
    pub repath_interval: f32,
    pub max_chase_distance: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            max_health: 30.0,
            move_speed: 84.0,
            radius: 10.0,
            stopping_distance: 24.0,
            melee: WeaponConfig {
                fire_rate: 1.0,
                damage: 10.0,
                range: 30.0,
                require_line_of_sight: false,
                knockback: 0.0,
                cadence: Cadence::FixedInterval,
            },
            retarget_interval: 0.25,
            repath_interval: 0.25,
            max_chase_distance: 2400.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LootConfig {
    /// Total XP dropped by one enemy.
    pub total_value: u32,
    /// Number of orbs the total is split across.
    pub orbs: u32,
    /// Seconds between death and the drop.
    pub drop_delay: f32,
    /// Seconds the corpse stays after the drop.
    pub linger: f32,
    /// Wait for a `DropLootNow` signal instead of the delay (bounded by a timeout).
    pub drop_on_signal: bool,
    /// Orbs scatter within this radius of the corpse.
    pub spread: f32,
}

impl Default for LootConfig {
    fn default() -> Self {
        Self {
            total_value: 3,
            orbs: 3,
            drop_delay: 0.15,
            linger: 0.75,
            drop_on_signal: false,
            spread: 14.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrbConfig {
    pub attract_range: f32,
    pub attract_speed: f32,
    pub radius: f32,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            attract_range: 144.0,
            attract_speed: 192.0,
            radius: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Seconds between waves.
    pub interval: f32,
    /// Enemies per wave by run minute.
    pub count_curve: Curve,
    /// Enemy health multiplier by run minute.
    pub health_curve: Curve,
    /// Annulus around the player that enemies spawn in.
    pub spawn_radius: f32,
    pub min_spawn_distance: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            interval: 2.0,
            count_curve: Curve::linear(4.0, 35.0, 10.0),
            health_curve: Curve::linear(1.0, 3.0, 10.0),
            spawn_radius: 480.0,
            min_spawn_distance: 192.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObstacleConfig {
    pub center: [f32; 2],
    pub half_size: [f32; 2],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub half_extents: [f32; 2],
    pub obstacles: Vec<ObstacleConfig>,
    /// Designated enemy spawn locations. Empty means "spawn around the player".
    pub spawn_points: Vec<[f32; 2]>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        let pillar = |x: f32, y: f32| ObstacleConfig {
            center: [x, y],
            half_size: [48.0, 48.0],
        };
        Self {
            half_extents: [1200.0, 900.0],
            obstacles: vec![
                pillar(-360.0, 240.0),
                pillar(360.0, 240.0),
                pillar(-360.0, -240.0),
                pillar(360.0, -240.0),
                ObstacleConfig {
                    center: [0.0, 540.0],
                    half_size: [240.0, 24.0],
                },
            ],
            spawn_points: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    pub start_level: u32,
    pub xp_to_next: u32,
    pub growth: f32,
    pub flat_increment: u32,
    pub max_requirement: u32,
    /// Upgrades offered per level-up.
    pub choices: usize,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            start_level: 1,
            xp_to_next: 10,
            growth: 1.25,
            flat_increment: 2,
            max_requirement: u32::MAX,
            choices: 3,
        }
    }
}

/// Full run tuning.
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub player: PlayerConfig,
    pub weapon: WeaponConfig,
    pub enemy: EnemyConfig,
    pub loot: LootConfig,
    pub orbs: OrbConfig,
    pub waves: WaveConfig,
    pub arena: ArenaConfig,
    pub progression: ProgressionConfig,
    pub upgrades: Vec<UpgradeDef>,
    pub characters: Vec<CharacterDef>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            weapon: WeaponConfig::default(),
            enemy: EnemyConfig::default(),
            loot: LootConfig::default(),
            orbs: OrbConfig::default(),
            waves: WaveConfig::default(),
            arena: ArenaConfig::default(),
            progression: ProgressionConfig::default(),
            upgrades: default_upgrades(),
            characters: default_characters(),
        }
    }
}

fn upgrade(
    id: &str,
    title: &str,
    description: &str,
    max_stacks: u32,
    effect: UpgradeEffect,
) -> UpgradeDef {
    UpgradeDef {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        max_stacks,
        effect,
    }
}

fn default_upgrades() -> Vec<UpgradeDef> {
    vec![
        upgrade("fire_rate", "Fire Rate", "+0.5 shots per second", 5, UpgradeEffect::FireRate(0.5)),
        upgrade("damage", "Damage", "+2 weapon damage", 5, UpgradeEffect::Damage(2.0)),
        upgrade("range", "Range", "+48 weapon range", 3, UpgradeEffect::Range(48.0)),
        upgrade("vitality", "Vitality", "+20 max health", 5, UpgradeEffect::MaxHealth(20.0)),
        upgrade("haste", "Haste", "Ability cooldowns x0.9", 4, UpgradeEffect::CooldownMultiplier(0.9)),
        upgrade("magnet", "Magnet", "+36 pickup radius", 3, UpgradeEffect::PickupRadius(36.0)),
        upgrade("swiftness", "Swiftness", "+24 move speed", 3, UpgradeEffect::MoveSpeed(24.0)),
    ]
}

fn default_characters() -> Vec<CharacterDef> {
    vec![
        CharacterDef {
            name: "Vanguard".to_string(),
            max_health: Some(120.0),
            move_speed: Some(156.0),
            abilities: vec![AbilityKind::default_shockwave(), AbilityKind::default_dash()],
            passive: Some(UpgradeEffect::MaxHealth(20.0)),
        },
        CharacterDef {
            name: "Ranger".to_string(),
            max_health: Some(90.0),
            move_speed: Some(192.0),
            abilities: vec![AbilityKind::default_dash(), AbilityKind::default_shockwave()],
            passive: Some(UpgradeEffect::CooldownMultiplier(0.85)),
        },
    ]
}

impl RunConfig {
    /// Reads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses and validates a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make a loop misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| Err(ConfigError::Invalid(reason.to_string()));

        if self.waves.interval <= 0.0 {
            return invalid("waves.interval must be positive");
        }
        if !self.waves.count_curve.is_monotonic() || !self.waves.health_curve.is_monotonic() {
            return invalid("wave curves must be non-decreasing");
        }
        if self.weapon.fire_rate <= 0.0 || self.enemy.melee.fire_rate <= 0.0 {
            return invalid("fire_rate must be positive");
        }
        if self.progression.growth < 1.0 {
            return invalid("progression.growth must be at least 1");
        }
        if self.progression.xp_to_next == 0 || self.progression.max_requirement == 0 {
            return invalid("progression requirements must be at least 1");
        }
        if self.arena.half_extents.iter().any(|extent| *extent <= 0.0) {
            return invalid("arena.half_extents must be positive");
        }
        if let Some(def) = self.upgrades.iter().find(|def| def.max_stacks == 0) {
            return Err(ConfigError::Invalid(format!(
                "upgrade '{}' has max_stacks 0",
                def.id
            )));
        }
        Ok(())
    }
}

// === Systems ===

fn load_run_config(mut commands: Commands) {
    let config = match RunConfig::load(CONFIG_PATH) {
        Ok(config) => {
            info!("Loaded run config from {CONFIG_PATH}");
            config
        }
        Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("No run config at {CONFIG_PATH}, using defaults");
            RunConfig::default()
        }
        Err(err) => {
            warn!("{err}; using defaults");
            RunConfig::default()
        }
    };

    if config.upgrades.is_empty() {
        warn!("Upgrade catalog is empty; level-ups will not offer upgrades");
    }
    if config.characters.is_empty() {
        warn!("Character roster is empty; runs start with the base loadout");
    }
    commands.insert_resource(config);
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<RunConfig>();
    app.add_systems(PreStartup, load_run_config);
}
