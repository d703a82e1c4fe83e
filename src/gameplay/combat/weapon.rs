//! Auto-firing weapons: the player's gun and enemy melee.
//!
//! Each tick a ready weapon picks the nearest visible candidate in range and
//! writes one `DamageEvent`. Cadence decides whether a miss costs a cycle.

use bevy::prelude::*;
use serde::Deserialize;

use super::{
    Candidate, DamageEvent, TargetQuery, gather_candidates, knockback_velocity, line_of_sight,
    nearest_target, obstacle_rects,
};
use crate::config::WeaponConfig;
use crate::gameplay::arena::Obstacle;
use crate::gameplay::cooldown::Cooldown;
use crate::gameplay::{Dead, Faction};
use crate::{GameSet, gameplay_running};

/// Lowest fire rate used to derive an interval. Keeps `1 / rate` finite.
pub const MIN_FIRE_RATE: f32 = 0.01;

/// When the fire cooldown restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Reflect)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Only a hit starts the cooldown. With nothing to shoot, retry next tick.
    #[default]
    RetryOnMiss,
    /// Every ready tick starts the cooldown, hit or miss.
    FixedInterval,
}

#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Weapon {
    /// Shots per second.
    pub fire_rate: f32,
    pub damage: f32,
    pub range: f32,
    pub target: Faction,
    pub require_line_of_sight: bool,
    pub knockback: f32,
    pub cadence: Cadence,
    cooldown: Cooldown,
}

impl Weapon {
    #[must_use]
    pub fn from_config(config: &WeaponConfig, target: Faction) -> Self {
        let mut weapon = Self {
            fire_rate: config.fire_rate,
            damage: config.damage,
            range: config.range,
            target,
            require_line_of_sight: config.require_line_of_sight,
            knockback: config.knockback,
            cadence: config.cadence,
            cooldown: Cooldown::new(0.0),
        };
        weapon.cooldown.duration = weapon.interval();
        weapon
    }

    /// Seconds between shots.
    #[must_use]
    pub fn interval(&self) -> f32 {
        1.0 / self.fire_rate.max(MIN_FIRE_RATE)
    }

    #[must_use]
    pub fn is_ready(&self, now: f32) -> bool {
        self.cooldown.is_ready(now)
    }

    /// Nearest candidate this weapon can see.
    #[must_use]
    pub fn select_target(
        &self,
        origin: Vec2,
        candidates: &[Candidate],
        obstacles: &[Rect],
    ) -> Option<Candidate> {
        if !self.require_line_of_sight {
            return nearest_target(origin, candidates);
        }
        let visible: Vec<Candidate> = candidates
            .iter()
            .filter(|candidate| line_of_sight(origin, candidate.position, obstacles))
            .copied()
            .collect();
        nearest_target(origin, &visible)
    }

    /// Fires if ready. Returns the target hit, if any.
    pub fn try_fire(
        &mut self,
        now: f32,
        origin: Vec2,
        candidates: &[Candidate],
        obstacles: &[Rect],
    ) -> Option<Candidate> {
        // Upgrades change fire_rate between shots.
        self.cooldown.duration = self.interval();
        if !self.cooldown.is_ready(now) {
            return None;
        }

        let hit = self.select_target(origin, candidates, obstacles);
        if hit.is_some() || self.cadence == Cadence::FixedInterval {
            self.cooldown.start(now);
        }
        hit
    }
}

// === Systems ===

/// Fires every ready weapon at its nearest valid target.
/// Runs in `GameSet::Combat`, before `apply_damage`.
pub(crate) fn fire_weapons(
    time: Res<Time>,
    mut weapons: Query<(Entity, &Transform, &mut Weapon), Without<Dead>>,
    actors: TargetQuery,
    obstacle_query: Query<(&Obstacle, &Transform)>,
    mut damage: MessageWriter<DamageEvent>,
) {
    let now = time.elapsed_secs();
    let obstacles = obstacle_rects(&obstacle_query);

    for (entity, transform, mut weapon) in &mut weapons {
        if !weapon.is_ready(now) {
            continue;
        }
        let origin = transform.translation.truncate();
        let candidates = gather_candidates(&actors, origin, weapon.range, weapon.target, entity);

        let Some(hit) = weapon.try_fire(now, origin, &candidates, &obstacles) else {
            continue;
        };

        let mut event = DamageEvent::new(weapon.damage, Some(entity), hit.entity);
        if weapon.knockback > 0.0 {
            event = event.with_knockback(knockback_velocity(
                origin,
                hit.position,
                weapon.knockback,
            ));
        }
        damage.write(event);
    }
}

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Weapon>();
    app.add_systems(
        Update,
        fire_weapons
            .in_set(GameSet::Combat)
            .run_if(gameplay_running),
    );
}
