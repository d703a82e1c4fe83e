//! `NavMesh` pathfinding for chasers: waypoint paths around arena obstacles.

use bevy::prelude::*;
use vleue_navigator::prelude::*;

use crate::config::RunConfig;
use crate::gameplay::Dead;
use crate::gameplay::enemy::{ChaseTarget, Enemy, find_chase_targets};
use crate::run::run_start_schedules;
use crate::{GameSet, gameplay_running};

/// Timer controlling periodic path refresh for all chasers.
/// Exposed as a resource so tests can manipulate it.
#[derive(Resource, Debug, Reflect)]
#[reflect(Resource)]
pub struct PathRefreshTimer(pub Timer);

impl Default for PathRefreshTimer {
    fn default() -> Self {
        Self::new(RunConfig::default().enemy.repath_interval)
    }
}

impl PathRefreshTimer {
    #[must_use]
    pub fn new(interval: f32) -> Self {
        Self(Timer::from_seconds(interval.max(0.01), TimerMode::Repeating))
    }
}

/// Waypoint path toward the chase target, computed from the `NavMesh`.
/// Empty means "steer straight at the target".
#[derive(Component, Debug, Clone, Reflect, Default)]
#[reflect(Component)]
pub struct NavPath {
    pub waypoints: Vec<Vec2>,
    /// Index of the next waypoint to steer toward.
    pub current_index: usize,
    /// Target the path was computed for.
    target: Option<Entity>,
}

impl NavPath {
    pub fn set(&mut self, waypoints: Vec<Vec2>, target: Option<Entity>) {
        self.waypoints = waypoints;
        self.current_index = 0;
        self.target = target;
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.current_index = 0;
        self.target = None;
    }

    #[must_use]
    pub fn current_waypoint(&self) -> Option<Vec2> {
        self.waypoints.get(self.current_index).copied()
    }

    /// Moves to the next waypoint. Returns true if any remain.
    pub fn advance(&mut self) -> bool {
        self.current_index += 1;
        self.current_index < self.waypoints.len()
    }

    #[must_use]
    pub fn needs_recompute(&self, target: Option<Entity>) -> bool {
        self.target != target
    }
}

fn reset_path_refresh(mut commands: Commands, config: Res<RunConfig>) {
    commands.insert_resource(PathRefreshTimer::new(config.enemy.repath_interval));
}

/// Recomputes paths for chasers whose target changed, and for all of them when
/// the refresh timer fires. Without a built navmesh, paths stay empty.
/// Runs in `GameSet::Ai` after `find_chase_targets`.
fn compute_paths(
    time: Res<Time>,
    mut refresh_timer: ResMut<PathRefreshTimer>,
    mut chasers: Query<(&ChaseTarget, &Transform, &mut NavPath), (With<Enemy>, Without<Dead>)>,
    targets: Query<&Transform>,
    navmeshes: Option<Res<Assets<NavMesh>>>,
    navmesh_query: Option<Single<(&ManagedNavMesh, &NavMeshStatus)>>,
) {
    let Some(navmeshes) = navmeshes else {
        return;
    };
    let Some(inner) = navmesh_query else {
        return;
    };
    let (managed, status) = *inner;
    if *status != NavMeshStatus::Built {
        return;
    }
    let Some(navmesh) = navmeshes.get(managed) else {
        return;
    };

    refresh_timer.0.tick(time.delta());
    let refresh_due = refresh_timer.0.just_finished();

    for (chase, transform, mut nav_path) in &mut chasers {
        if !nav_path.needs_recompute(chase.0) && !refresh_due {
            continue;
        }

        let Some(target_transform) = chase.0.and_then(|target| targets.get(target).ok()) else {
            nav_path.clear();
            continue;
        };

        let from = transform.translation.truncate();
        let to = target_transform.translation.truncate();
        match navmesh.path(from, to) {
            Some(path) => nav_path.set(path.path, chase.0),
            None => nav_path.set(Vec::new(), chase.0),
        }
    }
}

pub(super) fn plugin(app: &mut App) {
    app.register_type::<NavPath>()
        .register_type::<PathRefreshTimer>()
        .init_resource::<PathRefreshTimer>();

    for schedule in run_start_schedules() {
        app.add_systems(schedule, reset_path_refresh);
    }

    app.add_systems(
        Update,
        compute_paths
            .in_set(GameSet::Ai)
            .after(find_chase_targets)
            .run_if(gameplay_running),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_path_is_empty() {
        let path = NavPath::default();
        assert!(path.waypoints.is_empty());
        assert!(path.current_waypoint().is_none());
    }

    #[test]
    fn set_replaces_waypoints() {
        let mut path = NavPath::default();
        let entity = Entity::from_bits(42);
        path.set(vec![Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0)], Some(entity));

        assert_eq!(path.current_index, 0);
        assert_eq!(path.current_waypoint(), Some(Vec2::new(1.0, 2.0)));
        assert!(!path.needs_recompute(Some(entity)));
    }

    #[test]
    fn advance_walks_to_the_end() {
        let mut path = NavPath::default();
        path.set(vec![Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0)], None);

        assert!(path.advance());
        assert_eq!(path.current_waypoint(), Some(Vec2::new(3.0, 4.0)));
        assert!(!path.advance());
        assert!(path.current_waypoint().is_none());
    }

    #[test]
    fn target_change_needs_recompute() {
        let mut path = NavPath::default();
        path.set(vec![Vec2::ZERO], Some(Entity::from_bits(42)));

        assert!(path.needs_recompute(Some(Entity::from_bits(99))));
        assert!(path.needs_recompute(None));
        path.clear();
        assert!(!path.needs_recompute(None));
    }

    #[test]
    fn refresh_interval_is_floored() {
        let timer = PathRefreshTimer::new(0.0);
        assert!(timer.0.duration().as_secs_f32() > 0.0);
    }
}
