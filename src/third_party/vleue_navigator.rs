//! `vleue_navigator` navmesh configuration for enemy pathfinding.

use avian2d::prelude::*;
use bevy::prelude::*;
use vleue_navigator::prelude::*;

use crate::RunState;

/// Marker: this entity's `Collider` is a navmesh obstacle.
/// Add to arena pillars and walls inside the bounds. Never to actors.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct NavObstacle;

/// Navmesh covering the arena rectangle, with obstacles carved out by
/// [`NavObstacle`] colliders. `agent_radius` keeps paths clear of corners.
#[must_use]
pub fn arena_navmesh(half_extents: Vec2, agent_radius: f32) -> impl Bundle {
    let (x, y) = (half_extents.x, half_extents.y);
    (
        Name::new("Arena NavMesh"),
        NavMeshSettings {
            fixed: Triangulation::from_outer_edges(&[
                Vec2::new(-x, -y),
                Vec2::new(x, -y),
                Vec2::new(x, y),
                Vec2::new(-x, y),
            ]),
            agent_radius,
            simplify: 4.0,
            merge_steps: 1,
            ..default()
        },
        NavMeshUpdateMode::Direct,
        ManagedNavMesh::single(),
        Transform::default(),
    )
}

/// Strip `NavObstacle` markers before run teardown despawns the arena.
/// Prevents `NavmeshUpdaterPlugin` from seeing obstacle removals and
/// kicking off a rebuild for a navmesh that is about to go away.
fn strip_nav_obstacles_before_despawn(
    mut commands: Commands,
    obstacles: Query<Entity, With<NavObstacle>>,
) {
    for entity in &obstacles {
        commands.entity(entity).remove::<NavObstacle>();
    }
}

pub(super) fn plugin(app: &mut App) {
    app.register_type::<NavObstacle>();
    app.add_plugins((
        VleueNavigatorPlugin,
        NavmeshUpdaterPlugin::<Collider, NavObstacle>::default(),
    ));

    app.add_systems(
        OnExit(RunState::GameOver),
        strip_nav_obstacles_before_despawn,
    )
    .add_systems(
        OnTransition {
            exited: RunState::Paused,
            entered: RunState::Menu,
        },
        strip_nav_obstacles_before_despawn,
    );
}
