//! The game camera: one persistent `Camera2d` that tracks the player.

use bevy::prelude::*;

use crate::gameplay::player::Player;
use crate::theme::palette;
use crate::{GameSet, gameplay_running};

/// Higher is snappier. Fraction of the gap closed per second is `1 - e^-k`.
const FOLLOW_SHARPNESS: f32 = 8.0;

/// Marker for the main camera. Also renders UI.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct MainCamera;

/// Camera position after one frame of exponential smoothing toward `target`.
#[must_use]
pub fn follow_step(camera: Vec2, target: Vec2, dt: f32) -> Vec2 {
    let t = 1.0 - (-FOLLOW_SHARPNESS * dt).exp();
    camera + (target - camera) * t
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((Name::new("Main Camera"), MainCamera, Camera2d));
}

fn follow_player(
    time: Res<Time>,
    player: Option<Single<&Transform, (With<Player>, Without<MainCamera>)>>,
    mut camera: Single<&mut Transform, With<MainCamera>>,
) {
    let Some(player) = player else {
        return;
    };
    let next = follow_step(
        camera.translation.truncate(),
        player.translation.truncate(),
        time.delta_secs(),
    );
    camera.translation.x = next.x;
    camera.translation.y = next.y;
}

pub fn plugin(app: &mut App) {
    app.register_type::<MainCamera>()
        .insert_resource(ClearColor(palette::BACKGROUND));

    app.add_systems(Startup, spawn_camera);
    app.add_systems(
        Update,
        follow_player.in_set(GameSet::Ui).run_if(gameplay_running),
    );
}
