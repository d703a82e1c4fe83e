//! The player: character roster, spawning, and WASD movement.

use avian2d::prelude::*;
use bevy::prelude::*;
use serde::Deserialize;

use crate::config::RunConfig;
use crate::gameplay::abilities::{AbilityKind, AbilityLoadout, Dashing};
use crate::gameplay::combat::weapon::Weapon;
use crate::gameplay::combat::{HealthBarConfig, Knockback};
use crate::gameplay::pickups::PickupRadius;
use crate::gameplay::progression::{PlayerStats, UpgradeEffect};
use crate::gameplay::{Dead, Faction, Health, Invulnerability, Movement, Steering, move_towards};
use crate::run::{RunEntity, run_start_schedules};
use crate::theme::palette;
use crate::third_party::CollisionLayer;
use crate::{GameSet, Z_ACTOR, gameplay_running};

// === Characters ===

/// A playable character. Missing fields fall back to the base player config.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct CharacterDef {
    pub name: String,
    pub max_health: Option<f32>,
    pub move_speed: Option<f32>,
    /// Equipped in slot order.
    pub abilities: Vec<AbilityKind>,
    /// Applied once when the character spawns.
    pub passive: Option<UpgradeEffect>,
}

/// Index into `RunConfig::characters` chosen on the menu.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
#[reflect(Resource)]
pub struct SelectedCharacter(pub usize);

// === Components ===

#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Player;

/// Normalized movement input this frame (zero when idle).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MoveIntent(pub Vec2);

/// Last non-zero movement direction. Aims the dash when standing still.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Facing(pub Vec2);

impl Default for Facing {
    fn default() -> Self {
        Self(Vec2::Y)
    }
}

/// Units per second² the player accelerates toward the desired velocity.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Acceleration(pub f32);

/// Stats for a freshly spawned player, with the character and passive applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerLoadout {
    pub name: String,
    pub health: Health,
    pub movement: Movement,
    pub weapon: Weapon,
    pub abilities: AbilityLoadout,
    pub pickup_radius: PickupRadius,
}

impl PlayerLoadout {
    /// Builds the loadout for `character`, or the base config when `None`.
    #[must_use]
    pub fn build(config: &RunConfig, character: Option<&CharacterDef>) -> Self {
        let base = &config.player;
        let mut loadout = Self {
            name: character.map_or_else(|| "Survivor".to_string(), |c| c.name.clone()),
            health: Health::new(
                character
                    .and_then(|c| c.max_health)
                    .unwrap_or(base.max_health),
            ),
            movement: Movement {
                speed: character
                    .and_then(|c| c.move_speed)
                    .unwrap_or(base.move_speed),
            },
            weapon: Weapon::from_config(&config.weapon, Faction::Enemy),
            abilities: character.map_or_else(AbilityLoadout::default, |c| {
                AbilityLoadout::from_kinds(&c.abilities)
            }),
            pickup_radius: PickupRadius(base.pickup_radius),
        };

        if let Some(passive) = character.and_then(|c| c.passive.as_ref()) {
            passive.apply(&mut PlayerStats {
                weapon: &mut loadout.weapon,
                health: &mut loadout.health,
                movement: &mut loadout.movement,
                abilities: &mut loadout.abilities,
                pickup_radius: &mut loadout.pickup_radius,
            });
        }
        loadout
    }
}

// === Systems ===

fn spawn_player(
    mut commands: Commands,
    config: Res<RunConfig>,
    selected: Res<SelectedCharacter>,
) {
    let character = config.characters.get(selected.0);
    if character.is_none() && !config.characters.is_empty() {
        warn!(
            "Character {} not in roster of {}; using base stats",
            selected.0,
            config.characters.len()
        );
    }
    let loadout = PlayerLoadout::build(&config, character);
    let radius = config.player.radius;
    info!("Spawning {}", loadout.name);

    commands.spawn((
        (
            Name::new(loadout.name),
            Player,
            Faction::Player,
            loadout.health,
            HealthBarConfig::for_radius(radius, true),
            Invulnerability::new(config.player.iframes),
            loadout.movement,
            Acceleration(config.player.acceleration),
            loadout.weapon,
            loadout.abilities,
            loadout.pickup_radius,
        ),
        (
            MoveIntent::default(),
            Facing::default(),
            Steering::default(),
            Knockback::default(),
            RigidBody::Dynamic,
            Collider::circle(radius),
            CollisionLayer::player(),
            LockedAxes::ROTATION_LOCKED,
            LinearVelocity::default(),
            Sprite::from_color(palette::PLAYER, Vec2::splat(radius * 2.0)),
            Transform::from_xyz(0.0, 0.0, Z_ACTOR),
            RunEntity,
        ),
    ));
}

/// Maps WASD / arrow keys to a normalized direction.
#[must_use]
pub fn direction_from_keys(keyboard: &ButtonInput<KeyCode>) -> Vec2 {
    let mut direction = Vec2::ZERO;
    if keyboard.any_pressed([KeyCode::KeyW, KeyCode::ArrowUp]) {
        direction.y += 1.0;
    }
    if keyboard.any_pressed([KeyCode::KeyS, KeyCode::ArrowDown]) {
        direction.y -= 1.0;
    }
    if keyboard.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]) {
        direction.x += 1.0;
    }
    if keyboard.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]) {
        direction.x -= 1.0;
    }
    direction.normalize_or_zero()
}

fn read_movement_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut players: Query<(&mut MoveIntent, &mut Facing), (With<Player>, Without<Dead>)>,
) {
    let direction = direction_from_keys(&keyboard);
    for (mut intent, mut facing) in &mut players {
        intent.0 = direction;
        if direction != Vec2::ZERO {
            facing.0 = direction;
        }
    }
}

/// Accelerates the player's steering toward `intent × speed`.
/// Runs in `GameSet::Movement`.
pub(crate) fn steer_player(
    time: Res<Time>,
    mut players: Query<
        (&MoveIntent, &Movement, &Acceleration, &mut Steering),
        (With<Player>, Without<Dead>, Without<Dashing>),
    >,
) {
    let dt = time.delta_secs();
    for (intent, movement, acceleration, mut steering) in &mut players {
        let desired = intent.0 * movement.speed;
        steering.0 = move_towards(steering.0, desired, acceleration.0 * dt);
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Player>()
        .register_type::<MoveIntent>()
        .register_type::<Facing>()
        .register_type::<Acceleration>()
        .register_type::<SelectedCharacter>()
        .init_resource::<SelectedCharacter>();

    for schedule in run_start_schedules() {
        app.add_systems(schedule, spawn_player);
    }

    app.add_systems(
        Update,
        (
            read_movement_input.in_set(GameSet::Input),
            steer_player.in_set(GameSet::Movement),
        )
            .run_if(gameplay_running),
    );
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::testing::{assert_entity_count, create_base_test_app, transition_to_playing};
    use pretty_assertions::assert_eq;

    fn create_player_test_app() -> App {
        let mut app = create_base_test_app();
        app.init_resource::<ButtonInput<KeyCode>>();
        plugin(&mut app);
        transition_to_playing(&mut app);
        app
    }

    fn player_entity(app: &mut App) -> Entity {
        let mut query = app.world_mut().query_filtered::<Entity, With<Player>>();
        query.single(app.world()).unwrap()
    }

    #[test]
    fn run_start_spawns_selected_character() {
        let mut app = create_base_test_app();
        app.init_resource::<ButtonInput<KeyCode>>();
        app.insert_resource(SelectedCharacter(1));
        plugin(&mut app);
        transition_to_playing(&mut app);

        assert_entity_count::<With<Player>>(&mut app, 1);
        let player = player_entity(&mut app);
        let expected = RunConfig::default().characters[1].name.clone();
        assert_eq!(
            app.world().get::<Name>(player).unwrap().as_str(),
            expected
        );
        assert!(app.world().get::<RunEntity>(player).is_some());
    }

    #[test]
    fn unknown_character_falls_back_to_base_stats() {
        let mut app = create_base_test_app();
        app.init_resource::<ButtonInput<KeyCode>>();
        app.insert_resource(SelectedCharacter(42));
        plugin(&mut app);
        transition_to_playing(&mut app);

        let player = player_entity(&mut app);
        assert_eq!(
            app.world().get::<Health>(player).unwrap().max,
            RunConfig::default().player.max_health
        );
    }

    #[test]
    fn input_accelerates_toward_desired_velocity() {
        let mut app = create_player_test_app();
        let player = player_entity(&mut app);

        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyD);
        app.update();

        assert_eq!(app.world().get::<MoveIntent>(player).unwrap().0, Vec2::X);
        assert_eq!(app.world().get::<Facing>(player).unwrap().0, Vec2::X);
        let steering = app.world().get::<Steering>(player).unwrap().0;
        let speed = app.world().get::<Movement>(player).unwrap().speed;
        assert!(steering.x >= 0.0 && steering.x <= speed);
        assert_eq!(steering.y, 0.0);
    }

    #[test]
    fn releasing_keys_keeps_facing() {
        let mut app = create_player_test_app();
        let player = player_entity(&mut app);

        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyA);
        app.update();
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .release(KeyCode::KeyA);
        app.update();

        assert_eq!(app.world().get::<MoveIntent>(player).unwrap().0, Vec2::ZERO);
        assert_eq!(app.world().get::<Facing>(player).unwrap().0, -Vec2::X);
    }
}
