//! Horde survival game entry point.

use bevy::prelude::*;

fn main() {
    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Horde Survival".to_string(),
                    resolution: (1600, 900).into(),
                    resizable: true,
                    ..default()
                }),
                ..default()
            })
            .set(ImagePlugin::default_nearest()),
    )
    .add_plugins((
        horde_survival::third_party::plugin,
        horde_survival::camera::plugin,
        horde_survival::plugin,
    ));

    #[cfg(feature = "dev")]
    app.add_plugins(avian2d::prelude::PhysicsDebugPlugin::default());

    app.run();
}
