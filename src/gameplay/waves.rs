//! Encounter director: spawns scaling waves of enemies on a fixed interval.
//!
//! Wave size and enemy toughness are read from designer curves sampled at the
//! current run minute. Enemies spawn at designated spawn points when the arena
//! has any, otherwise in an annulus around the player.

use bevy::prelude::*;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;

use crate::config::{RunConfig, WaveConfig};
use crate::gameplay::arena::{Arena, SpawnPoint};
use crate::gameplay::enemy::enemy_bundle;
use crate::gameplay::player::Player;
use crate::gameplay::Dead;
use crate::run::{RunClock, run_start_schedules};
use crate::{GameSet, gameplay_running};

/// Tries per placement strategy before a spawn is skipped.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 12;

/// Health multipliers at or below this are treated as 1.
const HEALTH_MULTIPLIER_THRESHOLD: f32 = 1.001;

// === Curve ===

/// Piecewise-linear curve through `(x, y)` points, clamped at both ends.
/// Deserializes from `[[x, y], ...]`; both `x` and `y` must be non-decreasing.
#[derive(Debug, Clone, PartialEq, Deserialize, Reflect)]
#[serde(try_from = "Vec<[f32; 2]>")]
pub struct Curve {
    points: Vec<Vec2>,
}

impl TryFrom<Vec<[f32; 2]>> for Curve {
    type Error = String;

    fn try_from(points: Vec<[f32; 2]>) -> Result<Self, Self::Error> {
        if points.is_empty() {
            return Err("curve needs at least one point".to_string());
        }
        if points.windows(2).any(|pair| pair[1][0] < pair[0][0]) {
            return Err("curve x values must be non-decreasing".to_string());
        }
        if points.windows(2).any(|pair| pair[1][1] < pair[0][1]) {
            return Err("curve y values must be non-decreasing".to_string());
        }
        Ok(Self {
            points: points.into_iter().map(Vec2::from).collect(),
        })
    }
}

impl Curve {
    /// Straight line from `start` at x = 0 to `end` at x = `over`.
    #[must_use]
    pub fn linear(start: f32, end: f32, over: f32) -> Self {
        Self {
            points: vec![Vec2::new(0.0, start), Vec2::new(over.max(0.0), end)],
        }
    }

    /// True when neither coordinate ever decreases along the points.
    #[must_use]
    pub fn is_monotonic(&self) -> bool {
        self.points
            .windows(2)
            .all(|pair| pair[1].x >= pair[0].x && pair[1].y >= pair[0].y)
    }

    #[must_use]
    pub fn sample(&self, x: f32) -> f32 {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return 0.0;
        };
        if x <= first.x {
            return first.y;
        }
        if x >= last.x {
            return last.y;
        }
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if x <= b.x {
                let span = b.x - a.x;
                if span <= f32::EPSILON {
                    return b.y;
                }
                return a.y + (b.y - a.y) * (x - a.x) / span;
            }
        }
        last.y
    }
}

// === Wave planning ===

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavePlan {
    pub count: u32,
    pub health_multiplier: f32,
}

/// Size and toughness of the wave at run minute `minutes`.
/// The count rounds half away from zero (19.5 → 20).
#[must_use]
pub fn wave_plan(minutes: f32, config: &WaveConfig) -> WavePlan {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = config.count_curve.sample(minutes).round().max(0.0) as u32;
    WavePlan {
        count,
        health_multiplier: config.health_curve.sample(minutes),
    }
}

/// Random point between `min_distance` and `spawn_radius` of `center` that the
/// arena accepts, or `None` after `MAX_PLACEMENT_ATTEMPTS` misses.
pub fn annulus_position(
    rng: &mut impl Rng,
    center: Vec2,
    min_distance: f32,
    spawn_radius: f32,
    arena: &Arena,
    clearance: f32,
) -> Option<Vec2> {
    let inner = min_distance.max(1.0);
    let outer = spawn_radius.max(min_distance + 1.0).max(inner + f32::EPSILON);
    (0..MAX_PLACEMENT_ATTEMPTS).find_map(|_| {
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        let distance = rng.random_range(inner..outer);
        let point = center + Vec2::from_angle(angle) * distance;
        arena.is_open(point, clearance).then_some(point)
    })
}

fn random_open_point(rng: &mut impl Rng, arena: &Arena, clearance: f32) -> Option<Vec2> {
    (0..MAX_PLACEMENT_ATTEMPTS).find_map(|_| {
        let point = arena.random_point(rng);
        arena.is_open(point, clearance).then_some(point)
    })
}

/// Where the next enemy goes. Spawn points win; otherwise around the player,
/// then anywhere open in the arena.
pub fn place_enemy(
    rng: &mut impl Rng,
    spawn_points: &[Vec2],
    player: Option<Vec2>,
    config: &WaveConfig,
    arena: &Arena,
    clearance: f32,
) -> Option<Vec2> {
    if let Some(point) = spawn_points.choose(rng) {
        return Some(*point);
    }
    let player = player?;
    annulus_position(
        rng,
        player,
        config.min_spawn_distance,
        config.spawn_radius,
        arena,
        clearance,
    )
    .or_else(|| random_open_point(rng, arena, clearance))
}

// === Director ===

#[derive(Resource, Debug, Clone, Reflect)]
#[reflect(Resource)]
pub struct WaveDirector {
    pub timer: Timer,
    pub waves_spawned: u32,
}

impl Default for WaveDirector {
    fn default() -> Self {
        Self::new(WaveConfig::default().interval)
    }
}

impl WaveDirector {
    #[must_use]
    pub fn new(interval: f32) -> Self {
        Self {
            timer: Timer::from_seconds(interval, TimerMode::Repeating),
            waves_spawned: 0,
        }
    }

    /// Advances the timer; true when a wave is due. The first wave is due at once.
    pub fn tick(&mut self, delta: std::time::Duration) -> bool {
        if self.waves_spawned == 0 {
            return true;
        }
        self.timer.tick(delta).just_finished()
    }
}

// === Systems ===

fn reset_wave_director(mut commands: Commands, config: Res<RunConfig>) {
    commands.insert_resource(WaveDirector::new(config.waves.interval));
}

fn spawn_waves(
    mut commands: Commands,
    time: Res<Time>,
    real_time: Res<Time<Real>>,
    clock: Res<RunClock>,
    config: Res<RunConfig>,
    arena: Res<Arena>,
    mut director: ResMut<WaveDirector>,
    players: Query<&Transform, (With<Player>, Without<Dead>)>,
    spawn_points: Query<&Transform, With<SpawnPoint>>,
) {
    if !director.tick(time.delta()) {
        return;
    }
    director.waves_spawned += 1;

    let spawn_points: Vec<Vec2> = spawn_points
        .iter()
        .map(|transform| transform.translation.truncate())
        .collect();
    let player = players
        .iter()
        .next()
        .map(|transform| transform.translation.truncate());
    if player.is_none() && spawn_points.is_empty() {
        warn!("No player and no spawn points; skipping wave");
        return;
    }

    #[allow(clippy::cast_possible_truncation)]
    let minutes = (clock.elapsed(real_time.elapsed_secs_f64()) / 60.0) as f32;
    let plan = wave_plan(minutes, &config.waves);
    let multiplier = if plan.health_multiplier > HEALTH_MULTIPLIER_THRESHOLD {
        plan.health_multiplier
    } else {
        1.0
    };

    let mut rng = rand::rng();
    let mut spawned = 0;
    for _ in 0..plan.count {
        let Some(position) = place_enemy(
            &mut rng,
            &spawn_points,
            player,
            &config.waves,
            &arena,
            config.enemy.radius,
        ) else {
            continue;
        };
        commands.spawn(enemy_bundle(&config.enemy, position, multiplier));
        spawned += 1;
    }
    debug!(
        "Wave {}: spawned {spawned}/{} at minute {minutes:.2} (health x{multiplier:.2})",
        director.waves_spawned, plan.count
    );
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<WaveDirector>()
        .init_resource::<WaveDirector>();

    for schedule in run_start_schedules() {
        app.add_systems(schedule, reset_wave_director);
    }

    app.add_systems(
        Update,
        spawn_waves
            .in_set(GameSet::Ai)
            .run_if(gameplay_running),
    );
}
