//! XP orbs: dropped as loot, drawn toward the player, collected for XP.

use bevy::prelude::*;

use crate::config::{OrbConfig, RunConfig};
use crate::gameplay::player::Player;
use crate::gameplay::progression::XpCollected;
use crate::gameplay::{Dead, move_towards};
use crate::run::RunEntity;
use crate::theme::palette;
use crate::{GameSet, Z_PICKUP, gameplay_running};

// === Components ===

/// Orbs within this distance of the player are collected.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct PickupRadius(pub f32);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct XpOrb {
    pub value: u32,
}

/// Bundle for one orb lying at `position`.
pub fn xp_orb(value: u32, position: Vec2, config: &OrbConfig) -> impl Bundle {
    (
        Name::new("XP Orb"),
        XpOrb { value },
        Sprite::from_color(palette::XP_ORB, Vec2::splat(config.radius * 2.0)),
        Transform::from_translation(position.extend(Z_PICKUP)),
        RunEntity,
    )
}

/// Where an orb ends up after one frame of attraction toward `player`.
/// Orbs farther than `attract_range` stay put.
#[must_use]
pub fn attract_step(orb: Vec2, player: Vec2, attract_range: f32, speed: f32, dt: f32) -> Vec2 {
    if orb.distance(player) > attract_range {
        return orb;
    }
    move_towards(orb, player, speed * dt)
}

fn nearest_player(position: Vec2, players: &[(Vec2, f32)]) -> Option<(Vec2, f32)> {
    players.iter().copied().min_by(|(a, _), (b, _)| {
        a.distance_squared(position)
            .total_cmp(&b.distance_squared(position))
    })
}

// === Systems ===

fn attract_orbs(
    time: Res<Time>,
    config: Res<RunConfig>,
    players: Query<(&Transform, &PickupRadius), (With<Player>, Without<Dead>)>,
    mut orbs: Query<&mut Transform, (With<XpOrb>, Without<Player>)>,
) {
    let players: Vec<(Vec2, f32)> = players
        .iter()
        .map(|(transform, radius)| (transform.translation.truncate(), radius.0))
        .collect();
    if players.is_empty() {
        return;
    }
    let dt = time.delta_secs();

    for mut transform in &mut orbs {
        let position = transform.translation.truncate();
        let Some((player, _)) = nearest_player(position, &players) else {
            continue;
        };
        let next = attract_step(
            position,
            player,
            config.orbs.attract_range,
            config.orbs.attract_speed,
            dt,
        );
        transform.translation.x = next.x;
        transform.translation.y = next.y;
    }
}

/// Despawns orbs inside a living player's pickup radius and reports their XP.
fn collect_orbs(
    mut commands: Commands,
    players: Query<(&Transform, &PickupRadius), (With<Player>, Without<Dead>)>,
    orbs: Query<(Entity, &XpOrb, &Transform), Without<Player>>,
    mut collected: MessageWriter<XpCollected>,
) {
    for (entity, orb, transform) in &orbs {
        let position = transform.translation.truncate();
        let in_reach = players.iter().any(|(player, radius)| {
            player.translation.truncate().distance(position) <= radius.0
        });
        if in_reach {
            commands.entity(entity).despawn();
            collected.write(XpCollected(orb.value));
        }
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<PickupRadius>().register_type::<XpOrb>();

    app.add_systems(
        Update,
        (attract_orbs, collect_orbs)
            .chain()
            .in_set(GameSet::Movement)
            .run_if(gameplay_running),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn orb_outside_range_stays() {
        let orb = Vec2::new(200.0, 0.0);
        assert_eq!(attract_step(orb, Vec2::ZERO, 100.0, 50.0, 0.1), orb);
    }

    #[test]
    fn orb_inside_range_moves_at_speed() {
        let next = attract_step(Vec2::new(80.0, 0.0), Vec2::ZERO, 100.0, 50.0, 0.1);
        assert_eq!(next, Vec2::new(75.0, 0.0));
    }

    #[test]
    fn orb_does_not_overshoot() {
        let next = attract_step(Vec2::new(2.0, 0.0), Vec2::ZERO, 100.0, 50.0, 1.0);
        assert_eq!(next, Vec2::ZERO);
    }

    #[test]
    fn nearest_player_wins() {
        let players = [(Vec2::new(100.0, 0.0), 10.0), (Vec2::new(-5.0, 0.0), 20.0)];
        assert_eq!(nearest_player(Vec2::ZERO, &players), Some(players[1]));
        assert_eq!(nearest_player(Vec2::ZERO, &[]), None);
    }
}
