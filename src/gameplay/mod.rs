//! Gameplay domain: actors, combat, abilities, waves, progression.
//!
//! Shared actor components live here; each submodule owns one loop and
//! registers its systems in a `GameSet`, gated on `gameplay_running`.

pub mod abilities;
pub mod arena;
pub mod combat;
pub mod cooldown;
pub mod death;
pub mod enemy;
pub mod hud;
pub mod pathfinding;
pub mod pickups;
pub mod player;
pub mod progression;
pub mod waves;

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::gameplay::abilities::Dashing;
use crate::gameplay::combat::Knockback;
use crate::{GameSet, gameplay_running};

// === Components ===

/// Which side an actor fights for. Weapons pick targets by faction.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
#[reflect(Component)]
pub enum Faction {
    Player,
    Enemy,
}

/// Result of a single [`Health::take_damage`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Actor already dead; nothing changed.
    Ignored,
    /// Health reduced, actor still alive.
    Damaged,
    /// This hit killed the actor. Reported once per life.
    Died,
}

/// Hit points. `alive` flips to false exactly once, on the killing hit.
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    alive: bool,
}

impl Health {
    #[must_use]
    pub const fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            alive: true,
        }
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Subtracts `max(0, amount)`. At zero or below, clamps to 0 and dies.
    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.alive {
            return DamageOutcome::Ignored;
        }
        self.current -= amount.max(0.0);
        if self.current <= 0.0 {
            self.current = 0.0;
            self.alive = false;
            return DamageOutcome::Died;
        }
        DamageOutcome::Damaged
    }

    /// Scales both max and current health. Used for wave scaling.
    pub fn apply_multiplier(&mut self, multiplier: f32) {
        self.max *= multiplier;
        self.current *= multiplier;
    }

    /// Raises max health and heals by the same amount.
    pub fn raise_max(&mut self, amount: f32) {
        if !self.alive {
            return;
        }
        self.max += amount;
        self.current = (self.current + amount).min(self.max);
    }

    /// Fraction of max health remaining, in 0..=1.
    #[must_use]
    pub fn ratio(&self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.current / self.max).clamp(0.0, 1.0)
    }
}

/// Damage immunity until a point in virtual time.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Invulnerability {
    /// Seconds granted after every damaging hit. 0 disables hit i-frames.
    pub on_hit: f32,
    until: f32,
}

impl Invulnerability {
    #[must_use]
    pub const fn new(on_hit: f32) -> Self {
        Self { on_hit, until: 0.0 }
    }

    #[must_use]
    pub fn is_active(&self, now: f32) -> bool {
        now < self.until
    }

    /// Extends immunity to at least `now + secs`.
    pub fn grant(&mut self, now: f32, secs: f32) {
        self.until = self.until.max(now + secs);
    }
}

/// Marker: actor has died. Dead actors are never targeted or moved.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Dead;

/// Top speed in pixels per second.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Movement {
    pub speed: f32,
}

/// Velocity an actor wants from its own control (input or AI), before knockback.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Steering(pub Vec2);

/// Moves `current` toward `target` by at most `max_delta`.
#[must_use]
pub fn move_towards(current: Vec2, target: Vec2, max_delta: f32) -> Vec2 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance <= f32::EPSILON {
        return target;
    }
    current + delta / distance * max_delta
}

// === Systems ===

/// Writes the physics velocity: steering plus knockback. Dashing bodies are
/// driven by `tick_dashes` instead; dead bodies stop.
/// Runs last in `GameSet::Movement`.
fn apply_steering(
    mut bodies: Query<
        (&Steering, Option<&Knockback>, &mut LinearVelocity, Has<Dead>),
        Without<Dashing>,
    >,
) {
    for (steering, knockback, mut velocity, dead) in &mut bodies {
        velocity.0 = if dead {
            Vec2::ZERO
        } else {
            steering.0 + knockback.map_or(Vec2::ZERO, |knockback| knockback.0)
        };
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Faction>()
        .register_type::<Health>()
        .register_type::<Invulnerability>()
        .register_type::<Dead>()
        .register_type::<Movement>()
        .register_type::<Steering>();

    app.add_systems(
        Update,
        apply_steering
            .in_set(GameSet::Movement)
            .after(player::steer_player)
            .after(enemy::steer_enemies)
            .run_if(gameplay_running),
    );

    app.add_plugins((
        arena::plugin,
        combat::plugin,
        abilities::plugin,
        death::plugin,
        player::plugin,
        enemy::plugin,
        pathfinding::plugin,
        pickups::plugin,
        waves::plugin,
        progression::plugin,
        hud::plugin,
    ));
}
