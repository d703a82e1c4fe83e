//! Horde survival game library.
//!
//! A top-down survival run: an auto-firing player, cooldown-gated abilities,
//! time-scaled enemy waves and an XP/upgrade loop. `plugin` wires the
//! simulation; `main.rs` adds the windowed engine pieces on top.

pub mod camera;
pub mod config;
#[cfg(feature = "dev")]
mod dev_tools;
pub mod gameplay;
pub mod run;
mod theme;
pub mod third_party;

#[cfg(test)]
pub mod testing;

use bevy::prelude::*;

pub use run::RunState;

// === Z Layers ===

/// Z layer for arena obstacles.
pub const Z_OBSTACLE: f32 = 0.0;

/// Z layer for pickups (XP orbs).
pub const Z_PICKUP: f32 = 1.0;

/// Z layer for actors (player and enemies).
pub const Z_ACTOR: f32 = 2.0;

// === System Ordering ===

/// Per-frame ordering of gameplay systems. Configured as a chain in `plugin`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameSet {
    /// Keyboard reads and run-state requests.
    Input,
    /// Wave spawning, target selection and path planning.
    Ai,
    /// Velocities, dashes, orb attraction.
    Movement,
    /// Weapons, abilities, damage application.
    Combat,
    /// Death handling and death sequences.
    Death,
    /// Level-ups and upgrade offers.
    Progression,
    /// HUD and health bars.
    Ui,
}

/// Run condition shared by every gameplay system: true only while a run is live.
#[must_use]
pub fn gameplay_running(state: Option<Res<State<RunState>>>) -> bool {
    state.is_some_and(|state| *state.get() == RunState::Playing)
}

pub(crate) fn configure_game_sets(app: &mut App) {
    app.configure_sets(
        Update,
        (
            GameSet::Input,
            GameSet::Ai,
            GameSet::Movement,
            GameSet::Combat,
            GameSet::Death,
            GameSet::Progression,
            GameSet::Ui,
        )
            .chain(),
    );
}

/// Core game plugin: run state, configuration and all gameplay systems.
///
/// Physics and navigation live in [`third_party::plugin`] and the camera in
/// [`camera::plugin`]; the binary adds those alongside `DefaultPlugins`.
pub fn plugin(app: &mut App) {
    configure_game_sets(app);

    app.add_plugins((config::plugin, run::plugin, gameplay::plugin));

    #[cfg(feature = "dev")]
    app.add_plugins(dev_tools::plugin);
}
