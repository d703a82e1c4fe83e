//! Health bars over actors. Hidden at full health and after death.

use bevy::prelude::*;

use crate::gameplay::{Dead, Health};
use crate::theme::palette;
use crate::{GameSet, gameplay_running};

// === Components ===

/// Marker: background bar (full width, shows missing HP).
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct HealthBarBackground;

/// Marker: foreground bar (scales with current/max HP).
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct HealthBarFill;

/// Health bar sizing. Actors with `Health` but no config get no bar.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct HealthBarConfig {
    pub width: f32,
    pub height: f32,
    pub y_offset: f32,
    /// Show the bar even when at full health (the player's bar).
    pub always_visible: bool,
}

impl HealthBarConfig {
    /// Bar sized for an actor of the given radius.
    #[must_use]
    pub fn for_radius(radius: f32, always_visible: bool) -> Self {
        Self {
            width: radius * 2.0,
            height: 3.0,
            y_offset: radius + 6.0,
            always_visible,
        }
    }
}

// === Systems ===

/// Spawns bar children when `Health` is added to an entity with `HealthBarConfig`.
fn spawn_health_bars(
    add: On<Add, Health>,
    configs: Query<&HealthBarConfig>,
    mut commands: Commands,
) {
    let Ok(config) = configs.get(add.entity) else {
        return;
    };
    let size = Vec2::new(config.width, config.height);
    let visibility = if config.always_visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    commands.entity(add.entity).with_children(|parent| {
        parent.spawn((
            Name::new("Health Bar BG"),
            Sprite::from_color(palette::HEALTH_BAR_BG, size),
            Transform::from_xyz(0.0, config.y_offset, 1.0),
            visibility,
            HealthBarBackground,
        ));
        parent.spawn((
            Name::new("Health Bar Fill"),
            Sprite::from_color(palette::HEALTH_BAR_FILL, size),
            Transform::from_xyz(0.0, config.y_offset, 1.1),
            visibility,
            HealthBarFill,
        ));
    });
}

/// Scales the fill to the health ratio, left-aligned. Runs in `GameSet::Ui`.
fn update_health_bars(
    actors: Query<(&Health, &Children, &HealthBarConfig, Has<Dead>), Changed<Health>>,
    mut fills: Query<&mut Transform, With<HealthBarFill>>,
    mut visibilities: Query<
        &mut Visibility,
        Or<(With<HealthBarFill>, With<HealthBarBackground>)>,
    >,
) {
    for (health, children, config, dead) in &actors {
        let ratio = health.ratio();
        let visible = !dead && (config.always_visible || ratio < 1.0);

        for child in children.iter() {
            if let Ok(mut transform) = fills.get_mut(child) {
                transform.scale.x = ratio;
                transform.translation.x = -config.width * (1.0 - ratio) / 2.0;
            }
            if let Ok(mut visibility) = visibilities.get_mut(child) {
                visibility.set_if_neq(if visible {
                    Visibility::Inherited
                } else {
                    Visibility::Hidden
                });
            }
        }
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<HealthBarBackground>()
        .register_type::<HealthBarFill>()
        .register_type::<HealthBarConfig>();

    app.add_observer(spawn_health_bars);

    app.add_systems(
        Update,
        update_health_bars
            .in_set(GameSet::Ui)
            .run_if(gameplay_running),
    );
}
