//! Arena layout: bounds, obstacles, spawn points and the navmesh.

use avian2d::prelude::*;
use bevy::prelude::*;
use rand::Rng;

use crate::config::{ArenaConfig, RunConfig};
use crate::run::{RunEntity, run_start_schedules};
use crate::theme::palette;
use crate::third_party::{CollisionLayer, NavObstacle, arena_navmesh};
use crate::Z_OBSTACLE;

/// Thickness of the boundary walls (pixels).
const WALL_THICKNESS: f32 = 32.0;

// === Components & Resources ===

/// Axis-aligned rectangle that blocks movement and line of sight.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Obstacle {
    pub half_size: Vec2,
}

/// Designated enemy spawn location. Preferred over placement around the player.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct SpawnPoint;

/// Playable area. Answers "can something stand here?" for the spawner.
#[derive(Resource, Debug, Clone, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct Arena {
    pub half_extents: Vec2,
    pub obstacles: Vec<Rect>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::from_config(&ArenaConfig::default())
    }
}

impl Arena {
    #[must_use]
    pub fn from_config(config: &ArenaConfig) -> Self {
        Self {
            half_extents: Vec2::from(config.half_extents),
            obstacles: config
                .obstacles
                .iter()
                .map(|obstacle| {
                    Rect::from_center_half_size(
                        Vec2::from(obstacle.center),
                        Vec2::from(obstacle.half_size),
                    )
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_center_half_size(Vec2::ZERO, self.half_extents)
    }

    /// True if a body of radius `clearance` fits at `point`: inside the bounds and
    /// clear of every obstacle.
    #[must_use]
    pub fn is_open(&self, point: Vec2, clearance: f32) -> bool {
        let inner = self.bounds().inflate(-clearance);
        if inner.is_empty() || !inner.contains(point) {
            return false;
        }
        !self
            .obstacles
            .iter()
            .any(|rect| rect.inflate(clearance).contains(point))
    }

    /// Uniform point inside the bounds. May land in an obstacle.
    pub fn random_point(&self, rng: &mut impl Rng) -> Vec2 {
        Vec2::new(
            rng.random_range(-self.half_extents.x..=self.half_extents.x),
            rng.random_range(-self.half_extents.y..=self.half_extents.y),
        )
    }
}

// === Systems ===

fn spawn_arena(mut commands: Commands, config: Res<RunConfig>) {
    let arena = Arena::from_config(&config.arena);
    let half = arena.half_extents;

    for rect in &arena.obstacles {
        let size = rect.size();
        commands.spawn((
            Name::new("Obstacle"),
            Obstacle {
                half_size: rect.half_size(),
            },
            NavObstacle,
            RigidBody::Static,
            Collider::rectangle(size.x, size.y),
            CollisionLayer::obstacle(),
            Sprite::from_color(palette::OBSTACLE, size),
            Transform::from_translation(rect.center().extend(Z_OBSTACLE)),
            RunEntity,
        ));
    }

    // Boundary walls sit just outside the bounds; the navmesh outer edge already excludes them.
    let offset = WALL_THICKNESS / 2.0;
    let horizontal = Vec2::new(2.0f32.mul_add(half.x, 2.0 * WALL_THICKNESS), WALL_THICKNESS);
    let vertical = Vec2::new(WALL_THICKNESS, 2.0 * half.y);
    let walls = [
        (Vec2::new(0.0, half.y + offset), horizontal),
        (Vec2::new(0.0, -half.y - offset), horizontal),
        (Vec2::new(half.x + offset, 0.0), vertical),
        (Vec2::new(-half.x - offset, 0.0), vertical),
    ];
    for (center, size) in walls {
        commands.spawn((
            Name::new("Arena Wall"),
            RigidBody::Static,
            Collider::rectangle(size.x, size.y),
            CollisionLayer::obstacle(),
            Sprite::from_color(palette::ARENA_WALL, size),
            Transform::from_translation(center.extend(Z_OBSTACLE)),
            RunEntity,
        ));
    }

    for point in &config.arena.spawn_points {
        commands.spawn((
            Name::new("Spawn Point"),
            SpawnPoint,
            Transform::from_translation(Vec2::from(*point).extend(Z_OBSTACLE)),
            RunEntity,
        ));
    }

    commands.spawn((arena_navmesh(half, config.enemy.radius), RunEntity));
    commands.insert_resource(arena);
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Obstacle>()
        .register_type::<SpawnPoint>()
        .register_type::<Arena>()
        .init_resource::<Arena>();

    for schedule in run_start_schedules() {
        app.add_systems(schedule, spawn_arena);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObstacleConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn test_arena() -> Arena {
        Arena::from_config(&ArenaConfig {
            half_extents: [100.0, 50.0],
            obstacles: vec![ObstacleConfig {
                center: [0.0, 0.0],
                half_size: [10.0, 10.0],
            }],
            spawn_points: Vec::new(),
        })
    }

    #[test]
    fn open_inside_bounds_outside_obstacles() {
        let arena = test_arena();
        assert!(arena.is_open(Vec2::new(50.0, 0.0), 0.0));
        assert!(!arena.is_open(Vec2::new(5.0, 5.0), 0.0));
        assert!(!arena.is_open(Vec2::new(150.0, 0.0), 0.0));
    }

    #[test]
    fn clearance_shrinks_open_space() {
        let arena = test_arena();
        assert!(arena.is_open(Vec2::new(95.0, 0.0), 0.0));
        assert!(!arena.is_open(Vec2::new(95.0, 0.0), 10.0));
        assert!(!arena.is_open(Vec2::new(15.0, 0.0), 10.0));
    }

    #[test]
    fn oversize_clearance_closes_everything() {
        let arena = test_arena();
        assert!(!arena.is_open(Vec2::ZERO, 500.0));
    }

    #[test]
    fn random_point_stays_in_bounds() {
        let arena = test_arena();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert!(arena.bounds().contains(arena.random_point(&mut rng)));
        }
    }
}
