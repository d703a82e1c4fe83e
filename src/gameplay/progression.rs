//! XP, levels and the upgrade loop.
//!
//! Collected XP feeds [`Progression`]. Each level gained queues one upgrade
//! offer; offers are shown one at a time while the run is paused with
//! `PauseReason::UpgradeChoice`, and picking one applies its effect to the
//! player and either chains the next offer or resumes the run.

use bevy::platform::collections::HashMap;
use bevy::prelude::*;
use rand::Rng;
use rand::seq::index::sample;
use serde::Deserialize;

use crate::config::{ProgressionConfig, RunConfig};
use crate::gameplay::abilities::AbilityLoadout;
use crate::gameplay::combat::weapon::Weapon;
use crate::gameplay::pickups::PickupRadius;
use crate::gameplay::player::Player;
use crate::gameplay::{Health, Movement};
use crate::run::{PauseReason, RunRequest, RunState, run_start_schedules};
use crate::{GameSet, gameplay_running};

// === Progression ===

/// XP requirement after one level-up: `clamp(round(current × max(1, growth) + flat), 1, max)`.
/// Rounds half away from zero.
#[must_use]
pub fn next_requirement(current: u32, growth: f32, flat_increment: u32, max_requirement: u32) -> u32 {
    let grown = f64::from(current) * f64::from(growth.max(1.0)) + f64::from(flat_increment);
    let max = max_requirement.max(1);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let next = grown.round().clamp(1.0, f64::from(max)) as u32;
    next
}

#[derive(Resource, Debug, Clone, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct Progression {
    pub level: u32,
    pub xp: u32,
    pub xp_to_next: u32,
    pub growth: f32,
    pub flat_increment: u32,
    pub max_requirement: u32,
}

impl Default for Progression {
    fn default() -> Self {
        Self::from_config(&ProgressionConfig::default())
    }
}

impl Progression {
    #[must_use]
    pub fn from_config(config: &ProgressionConfig) -> Self {
        Self {
            level: config.start_level.max(1),
            xp: 0,
            xp_to_next: config.xp_to_next.max(1),
            growth: config.growth,
            flat_increment: config.flat_increment,
            max_requirement: config.max_requirement,
        }
    }

    /// Adds XP and returns the number of levels gained.
    pub fn add_xp(&mut self, amount: u32) -> u32 {
        if amount == 0 {
            return 0;
        }
        self.xp = self.xp.saturating_add(amount);

        let mut gained = 0;
        while self.xp >= self.xp_to_next {
            self.xp -= self.xp_to_next;
            self.level += 1;
            gained += 1;
            self.xp_to_next = next_requirement(
                self.xp_to_next,
                self.growth,
                self.flat_increment,
                self.max_requirement,
            );
        }
        gained
    }

    /// Progress toward the next level, in 0..1.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let fraction = self.xp as f32 / self.xp_to_next.max(1) as f32;
        fraction.clamp(0.0, 1.0)
    }
}

// === Upgrades ===

/// Stat change applied by an upgrade or passive. Stacks by repeated application.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Reflect)]
#[serde(tag = "stat", content = "amount", rename_all = "snake_case")]
pub enum UpgradeEffect {
    /// Added to shots per second.
    FireRate(f32),
    Damage(f32),
    Range(f32),
    /// Raises max health and heals by the same amount.
    MaxHealth(f32),
    MoveSpeed(f32),
    /// Multiplies every ability cooldown.
    CooldownMultiplier(f32),
    PickupRadius(f32),
}

/// Mutable view of the player stats an upgrade can touch.
pub struct PlayerStats<'a> {
    pub weapon: &'a mut Weapon,
    pub health: &'a mut Health,
    pub movement: &'a mut Movement,
    pub abilities: &'a mut AbilityLoadout,
    pub pickup_radius: &'a mut PickupRadius,
}

impl UpgradeEffect {
    pub fn apply(&self, stats: &mut PlayerStats) {
        match *self {
            Self::FireRate(amount) => stats.weapon.fire_rate += amount,
            Self::Damage(amount) => stats.weapon.damage += amount,
            Self::Range(amount) => stats.weapon.range += amount,
            Self::MaxHealth(amount) => stats.health.raise_max(amount),
            Self::MoveSpeed(amount) => stats.movement.speed += amount,
            Self::CooldownMultiplier(factor) => stats.abilities.scale_cooldowns(factor),
            Self::PickupRadius(amount) => stats.pickup_radius.0 += amount,
        }
    }
}

const fn default_max_stacks() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize, Reflect)]
pub struct UpgradeDef {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_max_stacks")]
    pub max_stacks: u32,
    pub effect: UpgradeEffect,
}

/// Upgrades available this run, and how often each has been taken.
#[derive(Resource, Debug, Clone, Default, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct UpgradeCatalog {
    pub defs: Vec<UpgradeDef>,
    stacks: HashMap<String, u32>,
}

impl UpgradeCatalog {
    #[must_use]
    pub fn new(defs: Vec<UpgradeDef>) -> Self {
        Self {
            defs,
            stacks: HashMap::default(),
        }
    }

    #[must_use]
    pub fn stacks(&self, id: &str) -> u32 {
        self.stacks.get(id).copied().unwrap_or(0)
    }

    /// Up to `count` distinct upgrade indices, drawn among those below their stack ceiling.
    pub fn offer(&self, rng: &mut impl Rng, count: usize) -> Vec<usize> {
        let eligible: Vec<usize> = self
            .defs
            .iter()
            .enumerate()
            .filter(|(_, def)| self.stacks(&def.id) < def.max_stacks)
            .map(|(index, _)| index)
            .collect();
        let amount = count.min(eligible.len());
        sample(rng, eligible.len(), amount)
            .into_iter()
            .map(|pick| eligible[pick])
            .collect()
    }

    /// Records one application of `index`. Returns the effect, or `None` if the
    /// index is unknown or the upgrade is already at its ceiling.
    pub fn take(&mut self, index: usize) -> Option<UpgradeEffect> {
        let def = self.defs.get(index)?;
        let stacks = self.stacks.entry(def.id.clone()).or_insert(0);
        if *stacks >= def.max_stacks {
            return None;
        }
        *stacks += 1;
        Some(def.effect)
    }
}

/// Level-ups waiting for a choice, and the offer on screen (if any).
#[derive(Resource, Debug, Clone, Default, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct PendingUpgrades {
    pub queued: u32,
    pub current: Option<Vec<usize>>,
}

impl PendingUpgrades {
    /// Pops the next queued level into a fresh offer. Returns false when
    /// nothing is queued or nothing is left to offer.
    pub fn advance(&mut self, catalog: &UpgradeCatalog, rng: &mut impl Rng, choices: usize) -> bool {
        self.current = None;
        while self.queued > 0 {
            self.queued -= 1;
            let offer = catalog.offer(rng, choices);
            if !offer.is_empty() {
                self.current = Some(offer);
                return true;
            }
        }
        false
    }
}

// === Messages ===

/// XP picked up by the player.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpCollected(pub u32);

/// The player picked option `choice` (0-based) of the current offer.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChooseUpgrade(pub usize);

// === Systems ===

fn reset_progression(mut commands: Commands, config: Res<RunConfig>) {
    commands.insert_resource(Progression::from_config(&config.progression));
    commands.insert_resource(UpgradeCatalog::new(config.upgrades.clone()));
    commands.insert_resource(PendingUpgrades::default());
}

fn gain_xp(
    mut collected: MessageReader<XpCollected>,
    mut progression: ResMut<Progression>,
    mut pending: ResMut<PendingUpgrades>,
) {
    for XpCollected(amount) in collected.read() {
        let gained = progression.add_xp(*amount);
        if gained > 0 {
            info!("Level up: now level {}", progression.level);
            pending.queued += gained;
        }
    }
}

/// Opens the next upgrade offer and pauses the run for it.
///
/// Runs only while playing, so an offer that is already open here never got its
/// pause (another pause won the frame); ask again.
fn present_upgrade_offer(
    mut pending: ResMut<PendingUpgrades>,
    catalog: Res<UpgradeCatalog>,
    config: Res<RunConfig>,
    mut requests: MessageWriter<RunRequest>,
) {
    if pending.current.is_some() {
        requests.write(RunRequest::Pause(PauseReason::UpgradeChoice));
        return;
    }
    if pending.queued == 0 {
        return;
    }
    if pending.advance(&catalog, &mut rand::rng(), config.progression.choices) {
        requests.write(RunRequest::Pause(PauseReason::UpgradeChoice));
    } else {
        debug!("No upgrades left to offer");
    }
}

/// Applies the chosen upgrade, then chains the next offer or resumes.
/// Runs only while paused for an upgrade choice.
fn apply_upgrade_choice(
    mut choices: MessageReader<ChooseUpgrade>,
    mut pending: ResMut<PendingUpgrades>,
    mut catalog: ResMut<UpgradeCatalog>,
    config: Res<RunConfig>,
    mut players: Query<
        (
            &mut Weapon,
            &mut Health,
            &mut Movement,
            &mut AbilityLoadout,
            &mut PickupRadius,
        ),
        With<Player>,
    >,
    mut requests: MessageWriter<RunRequest>,
) {
    let Some(ChooseUpgrade(choice)) = choices.read().last().copied() else {
        return;
    };
    let Some(index) = pending
        .current
        .as_ref()
        .and_then(|offer| offer.get(choice).copied())
    else {
        return;
    };

    if let Some(effect) = catalog.take(index) {
        let title = &catalog.defs[index].title;
        info!("Upgrade chosen: {title}");
        for (mut weapon, mut health, mut movement, mut abilities, mut pickup_radius) in &mut players
        {
            effect.apply(&mut PlayerStats {
                weapon: &mut weapon,
                health: &mut health,
                movement: &mut movement,
                abilities: &mut abilities,
                pickup_radius: &mut pickup_radius,
            });
        }
    }

    if !pending.advance(&catalog, &mut rand::rng(), config.progression.choices) {
        requests.write(RunRequest::Resume);
    }
}

fn upgrade_choice_open(state: Res<State<RunState>>, reason: Res<PauseReason>) -> bool {
    *state.get() == RunState::Paused && *reason == PauseReason::UpgradeChoice
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.add_message::<XpCollected>()
        .add_message::<ChooseUpgrade>()
        .register_type::<Progression>()
        .register_type::<UpgradeCatalog>()
        .register_type::<PendingUpgrades>()
        .init_resource::<Progression>()
        .init_resource::<UpgradeCatalog>()
        .init_resource::<PendingUpgrades>();

    for schedule in run_start_schedules() {
        app.add_systems(schedule, reset_progression);
    }

    app.add_systems(
        Update,
        (gain_xp, present_upgrade_offer)
            .chain()
            .in_set(GameSet::Progression)
            .run_if(gameplay_running),
    );
    app.add_systems(
        Update,
        apply_upgrade_choice
            .in_set(GameSet::Input)
            .run_if(upgrade_choice_open),
    );
}
