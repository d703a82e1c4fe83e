//! Development tools, only included with `cargo run --features dev`.
//!
//! Debug keys: E spawns enemies near the player, X grants XP.
//! This module is stripped from release builds.

use bevy::prelude::*;

use crate::config::RunConfig;
use crate::gameplay::enemy::enemy_bundle;
use crate::gameplay::player::Player;
use crate::gameplay::progression::XpCollected;
use crate::{GameSet, gameplay_running};

/// Number of enemies spawned per E key press.
const ENEMIES_PER_SPAWN: u32 = 3;

/// Distance from the player at which debug enemies appear.
const DEBUG_SPAWN_DISTANCE: f32 = 160.0;

/// XP granted per X key press.
const DEBUG_XP: u32 = 10;

fn debug_spawn_enemies(
    keyboard: Res<ButtonInput<KeyCode>>,
    config: Res<RunConfig>,
    player: Option<Single<&Transform, With<Player>>>,
    mut commands: Commands,
) {
    if !keyboard.just_pressed(KeyCode::KeyE) {
        return;
    }
    let center = player.map_or(Vec2::ZERO, |player| player.translation.truncate());

    for i in 0..ENEMIES_PER_SPAWN {
        #[allow(clippy::cast_precision_loss)]
        let angle = i as f32 / ENEMIES_PER_SPAWN as f32 * std::f32::consts::TAU;
        let position = center + Vec2::from_angle(angle) * DEBUG_SPAWN_DISTANCE;
        commands.spawn(enemy_bundle(&config.enemy, position, 1.0));
    }
    debug!("Spawned {ENEMIES_PER_SPAWN} debug enemies");
}

fn debug_grant_xp(keyboard: Res<ButtonInput<KeyCode>>, mut xp: MessageWriter<XpCollected>) {
    if keyboard.just_pressed(KeyCode::KeyX) {
        xp.write(XpCollected(DEBUG_XP));
    }
}

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        Update,
        (debug_spawn_enemies, debug_grant_xp)
            .in_set(GameSet::Input)
            .run_if(gameplay_running),
    );
}
