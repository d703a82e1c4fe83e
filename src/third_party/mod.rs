//! Third-party plugin isolation.

mod avian;
mod vleue_navigator;

pub use avian::{CollisionLayer, PIXELS_PER_METER};
pub use self::vleue_navigator::{NavObstacle, arena_navmesh};

/// Physics and navigation. Added by the binary; headless tests leave it out.
pub fn plugin(app: &mut bevy::prelude::App) {
    app.add_plugins((avian::plugin, vleue_navigator::plugin));
}
