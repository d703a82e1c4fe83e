//! Avian2d physics configuration for top-down gameplay.

use avian2d::prelude::*;
use bevy::prelude::*;

/// Pixels per physics meter. Tunes avian's internal tolerances to our pixel scale.
pub const PIXELS_PER_METER: f32 = 24.0;

// === Collision Layers ===

/// Physics collision layers.
///
/// - **Obstacle**: Arena walls and pillars. Static, block everything.
/// - **Player**: The player body.
/// - **Enemy**: Enemy bodies. Enemies shove each other and the player.
#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum CollisionLayer {
    #[default]
    Obstacle,
    Player,
    Enemy,
}

impl CollisionLayer {
    /// Layers for a static arena obstacle.
    #[must_use]
    pub fn obstacle() -> CollisionLayers {
        CollisionLayers::new(Self::Obstacle, [Self::Player, Self::Enemy])
    }

    /// Layers for the player body.
    #[must_use]
    pub fn player() -> CollisionLayers {
        CollisionLayers::new(Self::Player, [Self::Obstacle, Self::Enemy])
    }

    /// Layers for an enemy body.
    #[must_use]
    pub fn enemy() -> CollisionLayers {
        CollisionLayers::new(Self::Enemy, [Self::Obstacle, Self::Player, Self::Enemy])
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.add_plugins(PhysicsPlugins::default().with_length_unit(PIXELS_PER_METER));
    app.insert_resource(Gravity::ZERO);
}
