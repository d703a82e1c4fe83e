//! Chasers: spawn bundle, target selection and steering.

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::config::{EnemyConfig, RunConfig};
use crate::gameplay::combat::weapon::Weapon;
use crate::gameplay::combat::{HealthBarConfig, Knockback};
use crate::gameplay::pathfinding::NavPath;
use crate::gameplay::player::Player;
use crate::gameplay::{Dead, Faction, Health, Movement, Steering};
use crate::run::{RunEntity, run_start_schedules};
use crate::theme::palette;
use crate::third_party::CollisionLayer;
use crate::{GameSet, Z_ACTOR, gameplay_running};

/// Within this distance of a waypoint the chaser moves on to the next one.
const WAYPOINT_REACHED_DISTANCE: f32 = 4.0;

// === Components ===

#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Enemy;

/// The player this enemy is chasing.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct ChaseTarget(pub Option<Entity>);

/// Distance at which a chaser stops closing in.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct StoppingDistance(pub f32);

/// Shared retarget cadence for enemies that already have a target.
#[derive(Resource, Debug, Reflect)]
#[reflect(Resource)]
pub struct RetargetTimer(pub Timer);

impl Default for RetargetTimer {
    fn default() -> Self {
        Self::new(RunConfig::default().enemy.retarget_interval)
    }
}

impl RetargetTimer {
    #[must_use]
    pub fn new(interval: f32) -> Self {
        Self(Timer::from_seconds(interval.max(0.01), TimerMode::Repeating))
    }
}

/// Everything one chaser needs. `health_multiplier` scales its max health.
pub fn enemy_bundle(config: &EnemyConfig, position: Vec2, health_multiplier: f32) -> impl Bundle {
    let mut health = Health::new(config.max_health);
    health.apply_multiplier(health_multiplier);
    (
        (
            Name::new("Enemy"),
            Enemy,
            Faction::Enemy,
            health,
            HealthBarConfig::for_radius(config.radius, false),
            Movement {
                speed: config.move_speed,
            },
            StoppingDistance(config.stopping_distance),
            Weapon::from_config(&config.melee, Faction::Player),
            ChaseTarget::default(),
            NavPath::default(),
        ),
        (
            Steering::default(),
            Knockback::default(),
            RigidBody::Dynamic,
            Collider::circle(config.radius),
            CollisionLayer::enemy(),
            LockedAxes::ROTATION_LOCKED,
            LinearVelocity::default(),
            Sprite::from_color(palette::ENEMY, Vec2::splat(config.radius * 2.0)),
            Transform::from_translation(position.extend(Z_ACTOR)),
            RunEntity,
        ),
    )
}

/// Nearest player within `max_distance`. Ties keep the first in input order.
#[must_use]
pub fn nearest_player(
    origin: Vec2,
    players: &[(Entity, Vec2)],
    max_distance: f32,
) -> Option<Entity> {
    let mut nearest: Option<(Entity, f32)> = None;
    for &(entity, position) in players {
        let distance = origin.distance(position);
        if distance > max_distance {
            continue;
        }
        if nearest.is_none_or(|(_, best)| distance < best) {
            nearest = Some((entity, distance));
        }
    }
    nearest.map(|(entity, _)| entity)
}

/// Steering velocity for one chaser: toward the next waypoint if the path has
/// one left, otherwise straight at the target. Zero inside `stopping_distance`.
pub fn chase_velocity(
    position: Vec2,
    target: Vec2,
    stopping_distance: f32,
    speed: f32,
    path: &mut NavPath,
) -> Vec2 {
    if position.distance(target) <= stopping_distance {
        return Vec2::ZERO;
    }

    let mut steer_toward = target;
    while let Some(waypoint) = path.current_waypoint() {
        if position.distance(waypoint) >= WAYPOINT_REACHED_DISTANCE {
            steer_toward = waypoint;
            break;
        }
        path.advance();
    }
    (steer_toward - position).normalize_or_zero() * speed
}

// === Systems ===

fn reset_retarget_timer(mut commands: Commands, config: Res<RunConfig>) {
    commands.insert_resource(RetargetTimer::new(config.enemy.retarget_interval));
}

/// Picks the nearest living player for each chaser. Enemies without a valid
/// target look every frame; the rest on `RetargetTimer`.
/// Runs in `GameSet::Ai`.
pub(crate) fn find_chase_targets(
    time: Res<Time>,
    config: Res<RunConfig>,
    mut timer: ResMut<RetargetTimer>,
    mut enemies: Query<(&Transform, &mut ChaseTarget), (With<Enemy>, Without<Dead>)>,
    players: Query<(Entity, &Transform), (With<Player>, Without<Dead>)>,
) {
    timer.0.tick(time.delta());
    let retarget_due = timer.0.just_finished();

    let players: Vec<(Entity, Vec2)> = players
        .iter()
        .map(|(entity, transform)| (entity, transform.translation.truncate()))
        .collect();

    for (transform, mut chase) in &mut enemies {
        let valid = chase
            .0
            .is_some_and(|target| players.iter().any(|(player, _)| *player == target));
        if valid && !retarget_due {
            continue;
        }
        let next = nearest_player(
            transform.translation.truncate(),
            &players,
            config.enemy.max_chase_distance,
        );
        chase.set_if_neq(ChaseTarget(next));
    }
}

/// Sets chaser `Steering` toward the target. Runs in `GameSet::Movement`.
pub(crate) fn steer_enemies(
    mut enemies: Query<
        (
            &ChaseTarget,
            &Movement,
            &StoppingDistance,
            &Transform,
            &mut NavPath,
            &mut Steering,
        ),
        (With<Enemy>, Without<Dead>),
    >,
    targets: Query<&Transform, Without<Enemy>>,
) {
    for (chase, movement, stopping, transform, mut path, mut steering) in &mut enemies {
        let Some(target) = chase.0.and_then(|target| targets.get(target).ok()) else {
            steering.0 = Vec2::ZERO;
            continue;
        };
        steering.0 = chase_velocity(
            transform.translation.truncate(),
            target.translation.truncate(),
            stopping.0,
            movement.speed,
            &mut path,
        );
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Enemy>()
        .register_type::<ChaseTarget>()
        .register_type::<StoppingDistance>()
        .register_type::<RetargetTimer>()
        .init_resource::<RetargetTimer>();

    for schedule in run_start_schedules() {
        app.add_systems(schedule, reset_retarget_timer);
    }

    app.add_systems(
        Update,
        (
            find_chase_targets.in_set(GameSet::Ai),
            steer_enemies.in_set(GameSet::Movement),
        )
            .run_if(gameplay_running),
    );
}
