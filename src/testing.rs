//! Testing utilities for Bevy systems.

use std::time::Duration;

use bevy::ecs::query::QueryFilter;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;

use crate::config::RunConfig;
use crate::gameplay::combat::weapon::Weapon;
use crate::gameplay::enemy::Enemy;
use crate::gameplay::player::Player;
use crate::gameplay::{Faction, Health, Invulnerability, Movement};
use crate::run::{RunRequest, RunState};

/// Headless app with time, states, ordered `GameSet`s, the run state machine types
/// and a default config.
/// Gameplay plugins are added by each test as needed.
pub fn create_base_test_app() -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, StatesPlugin));
    crate::configure_game_sets(&mut app);
    app.init_state::<RunState>();
    app.add_message::<RunRequest>();
    app.init_resource::<RunConfig>();
    app
}

/// Moves the app from `Menu` into `Playing` and runs the transition schedules.
pub fn transition_to_playing(app: &mut App) {
    app.world_mut()
        .resource_mut::<NextState<RunState>>()
        .set(RunState::Playing);
    app.update();
}

/// Queues a run request for the next update.
pub fn send_run_request(app: &mut App, request: RunRequest) {
    app.world_mut().write_message(request);
}

/// Set elapsed to 1 nanosecond before the timer's duration so any positive
/// delta triggers `just_finished()`.
pub fn nearly_expire_timer(timer: &mut Timer) {
    let duration = timer.duration();
    timer.set_elapsed(duration.saturating_sub(Duration::from_nanos(1)));
}

/// Asserts the number of entities matching filter `F`.
pub fn assert_entity_count<F: QueryFilter>(app: &mut App, expected: usize) {
    let count = app
        .world_mut()
        .query_filtered::<(), F>()
        .iter(app.world())
        .count();
    assert_eq!(count, expected, "expected {expected} entities, found {count}");
}

/// Minimal player: faction, health, movement and a transform. No physics body.
pub fn spawn_test_player(world: &mut World, position: Vec2) -> Entity {
    world
        .spawn((
            Player,
            Faction::Player,
            Health::new(100.0),
            Invulnerability::default(),
            Movement { speed: 100.0 },
            Transform::from_translation(position.extend(0.0)),
        ))
        .id()
}

/// Minimal enemy with the given health and no weapon.
pub fn spawn_test_enemy(world: &mut World, position: Vec2, hp: f32) -> Entity {
    world
        .spawn((
            Enemy,
            Faction::Enemy,
            Health::new(hp),
            Movement { speed: 50.0 },
            Transform::from_translation(position.extend(0.0)),
        ))
        .id()
}

/// Attaches the default player weapon aimed at enemies.
pub fn arm_with_default_weapon(world: &mut World, entity: Entity) {
    let config = RunConfig::default();
    world
        .entity_mut(entity)
        .insert(Weapon::from_config(&config.weapon, Faction::Enemy));
}
