//! Combat resolution: target selection, line of sight, damage and knockback.
//!
//! Weapons and abilities never touch `Health` directly. They write
//! [`DamageEvent`]s, and [`apply_damage`] (last in `GameSet::Combat`) is the
//! only system that mutates health, so every hit goes through the same
//! death and invulnerability rules.

mod health_bar;
pub mod weapon;

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::gameplay::arena::Obstacle;
use crate::gameplay::{DamageOutcome, Dead, Faction, Health, Invulnerability};
use crate::{GameSet, gameplay_running};

pub use health_bar::{HealthBarConfig, HealthBarFill};

// === Constants ===

/// Knockback velocity decay rate (1/s). Higher stops sooner.
const KNOCKBACK_DAMPING: f32 = 8.0;

/// Knockback below this speed (pixels/s) is dropped.
const KNOCKBACK_MIN_SPEED: f32 = 1.0;

// === Targeting ===

/// A potential target, snapshotted from the world for a single resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub entity: Entity,
    pub position: Vec2,
    /// Target has a physics body and can be knocked back.
    pub has_body: bool,
}

/// Nearest candidate to `origin`. On equal distance the earlier candidate wins.
#[must_use]
pub fn nearest_target(origin: Vec2, candidates: &[Candidate]) -> Option<Candidate> {
    let mut best: Option<(f32, Candidate)> = None;
    for candidate in candidates {
        let distance = origin.distance_squared(candidate.position);
        if best.is_none_or(|(best_distance, _)| distance < best_distance) {
            best = Some((distance, *candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// Whether the segment `from → to` intersects `rect` (slab test).
#[must_use]
pub fn segment_hits_rect(from: Vec2, to: Vec2, rect: Rect) -> bool {
    let delta = to - from;
    let mut t_min = 0.0_f32;
    let mut t_max = 1.0_f32;

    for axis in 0..2 {
        let (origin, direction, low, high) = if axis == 0 {
            (from.x, delta.x, rect.min.x, rect.max.x)
        } else {
            (from.y, delta.y, rect.min.y, rect.max.y)
        };

        if direction.abs() < f32::EPSILON {
            if origin < low || origin > high {
                return false;
            }
            continue;
        }

        let inverse = 1.0 / direction;
        let (t0, t1) = {
            let a = (low - origin) * inverse;
            let b = (high - origin) * inverse;
            if a <= b { (a, b) } else { (b, a) }
        };
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return false;
        }
    }
    true
}

/// True if no obstacle blocks the straight line between the two points.
#[must_use]
pub fn line_of_sight(from: Vec2, to: Vec2, obstacles: &[Rect]) -> bool {
    !obstacles
        .iter()
        .any(|rect| segment_hits_rect(from, to, *rect))
}

/// Impulse pushing `target` away from `source`. Zero when they overlap.
#[must_use]
pub fn knockback_velocity(source: Vec2, target: Vec2, strength: f32) -> Vec2 {
    (target - source).normalize_or_zero() * strength
}

/// Actor snapshot query shared by every targeting system.
pub type TargetQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static Faction,
        &'static Transform,
        &'static Health,
        Has<RigidBody>,
    ),
    Without<Dead>,
>;

/// Living actors of `faction` within `range` of `origin`, excluding `exclude`,
/// in entity order.
#[must_use]
pub fn gather_candidates(
    actors: &TargetQuery,
    origin: Vec2,
    range: f32,
    faction: Faction,
    exclude: Entity,
) -> Vec<Candidate> {
    let range_squared = range * range;
    let mut candidates: Vec<Candidate> = actors
        .iter()
        .filter(|(entity, actor_faction, _, health, _)| {
            *entity != exclude && **actor_faction == faction && health.is_alive()
        })
        .map(|(entity, _, transform, _, has_body)| Candidate {
            entity,
            position: transform.translation.truncate(),
            has_body,
        })
        .filter(|candidate| origin.distance_squared(candidate.position) <= range_squared)
        .collect();
    candidates.sort_by_key(|candidate| candidate.entity);
    candidates
}

/// World-space rectangles of every obstacle.
#[must_use]
pub fn obstacle_rects(obstacles: &Query<(&Obstacle, &Transform)>) -> Vec<Rect> {
    obstacles
        .iter()
        .map(|(obstacle, transform)| {
            Rect::from_center_half_size(transform.translation.truncate(), obstacle.half_size)
        })
        .collect()
}

// === Messages & Components ===

/// A single hit. Amount is clamped to non-negative on construction.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub amount: f32,
    pub source: Option<Entity>,
    pub target: Entity,
    /// Velocity added to the target if it has a physics body.
    pub knockback: Vec2,
}

impl DamageEvent {
    #[must_use]
    pub fn new(amount: f32, source: Option<Entity>, target: Entity) -> Self {
        Self {
            amount: amount.max(0.0),
            source,
            target,
            knockback: Vec2::ZERO,
        }
    }

    #[must_use]
    pub const fn with_knockback(mut self, knockback: Vec2) -> Self {
        self.knockback = knockback;
        self
    }
}

/// Written once per actor, on the hit that kills it.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct ActorDied {
    pub entity: Entity,
    pub faction: Faction,
    pub position: Vec2,
}

/// Decaying push velocity, added on top of an actor's own steering.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Knockback(pub Vec2);

impl Knockback {
    /// Exponential decay over `dt` seconds.
    pub fn decay(&mut self, dt: f32) {
        self.0 *= (-KNOCKBACK_DAMPING * dt).exp();
        if self.0.length() < KNOCKBACK_MIN_SPEED {
            self.0 = Vec2::ZERO;
        }
    }
}

// === Systems ===

/// Applies queued damage. Dead or invulnerable targets ignore hits.
/// Runs last in `GameSet::Combat`.
pub(crate) fn apply_damage(
    time: Res<Time>,
    mut damage: MessageReader<DamageEvent>,
    mut died: MessageWriter<ActorDied>,
    mut targets: Query<(
        &mut Health,
        &Faction,
        &Transform,
        Option<&mut Invulnerability>,
        Option<&mut Knockback>,
        Has<RigidBody>,
    )>,
) {
    let now = time.elapsed_secs();
    for event in damage.read() {
        let Ok((mut health, faction, transform, invulnerability, knockback, has_body)) =
            targets.get_mut(event.target)
        else {
            continue;
        };

        if invulnerability
            .as_ref()
            .is_some_and(|invulnerability| invulnerability.is_active(now))
        {
            continue;
        }

        let outcome = health.take_damage(event.amount);
        match outcome {
            DamageOutcome::Ignored => continue,
            DamageOutcome::Died => {
                died.write(ActorDied {
                    entity: event.target,
                    faction: *faction,
                    position: transform.translation.truncate(),
                });
            }
            DamageOutcome::Damaged => {
                if let Some(mut invulnerability) = invulnerability {
                    let window = invulnerability.on_hit;
                    invulnerability.grant(now, window);
                }
            }
        }

        if let Some(mut knockback) = knockback.filter(|_| has_body) {
            knockback.0 += event.knockback;
        }
    }
}

fn decay_knockback(time: Res<Time>, mut knockbacks: Query<&mut Knockback>) {
    let dt = time.delta_secs();
    for mut knockback in &mut knockbacks {
        if knockback.0 != Vec2::ZERO {
            knockback.decay(dt);
        }
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.add_message::<DamageEvent>()
        .add_message::<ActorDied>()
        .register_type::<Knockback>();

    app.add_systems(
        Update,
        (
            decay_knockback.in_set(GameSet::Movement),
            apply_damage.in_set(GameSet::Combat).after(weapon::fire_weapons),
        )
            .run_if(gameplay_running),
    );

    app.add_plugins((weapon::plugin, health_bar::plugin));
}
