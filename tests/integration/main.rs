//! Whole-plugin tests: the run lifecycle as a player would drive it.

mod run_lifecycle;
mod state_transitions;

use bevy::prelude::*;
use bevy::state::app::StatesPlugin;

/// Headless app with the full game plugin (no window, physics or navmesh).
/// Keyboard state is driven by hand through [`tap`].
pub fn create_game_app() -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, StatesPlugin));
    app.init_resource::<ButtonInput<KeyCode>>();
    app.add_plugins(horde_survival::plugin);
    app.update();
    app
}

/// Presses `key` for exactly one update.
pub fn tap(app: &mut App, key: KeyCode) {
    app.world_mut()
        .resource_mut::<ButtonInput<KeyCode>>()
        .press(key);
    app.update();
    let mut keyboard = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
    keyboard.release(key);
    keyboard.clear();
}

/// Runs enough updates for a request to be applied and the transition to happen.
pub fn settle(app: &mut App) {
    app.update();
    app.update();
}

pub fn state(app: &App) -> horde_survival::RunState {
    *app.world().resource::<State<horde_survival::RunState>>().get()
}
