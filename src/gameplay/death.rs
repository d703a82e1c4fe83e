//! What happens after the killing hit.
//!
//! Player death ends the run. A dead enemy stops acting, drops its XP after a
//! short delay (or on a `DropLootNow` signal), lingers, then despawns.

use avian2d::prelude::*;
use bevy::prelude::*;
use rand::Rng;

use crate::config::{LootConfig, RunConfig};
use crate::gameplay::combat::ActorDied;
use crate::gameplay::combat::weapon::Weapon;
use crate::gameplay::enemy::ChaseTarget;
use crate::gameplay::pathfinding::NavPath;
use crate::gameplay::pickups::xp_orb;
use crate::gameplay::{Dead, Faction};
use crate::run::{RunRequest, run_start_schedules};
use crate::{GameSet, gameplay_running};

/// Lower bound of the signal wait before the delay-based timeout applies.
const MIN_SIGNAL_WAIT_SECS: f32 = 0.25;

/// Extra grace on top of the signal wait before dropping anyway.
const SIGNAL_GRACE_SECS: f32 = 2.0;

// === Loot ===

/// Splits `total` into at most `units` values as even as possible.
/// The remainder goes one each to the first values; zero values are omitted.
#[must_use]
pub fn split_loot(total: u32, units: u32) -> Vec<u32> {
    if units == 0 {
        return Vec::new();
    }
    let base = total / units;
    let remainder = total % units;
    (0..units)
        .map(|index| base + u32::from(index < remainder))
        .filter(|value| *value > 0)
        .collect()
}

/// Longest a corpse waits for `DropLootNow` before dropping on its own.
#[must_use]
pub fn signal_timeout(drop_delay: f32) -> f32 {
    drop_delay.max(MIN_SIGNAL_WAIT_SECS) + SIGNAL_GRACE_SECS
}

// === Death sequence ===

/// Per-corpse state machine. Only enemies get one.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub enum DeathSequence {
    AwaitingDrop { elapsed: f32 },
    Lingering { elapsed: f32 },
}

impl Default for DeathSequence {
    fn default() -> Self {
        Self::AwaitingDrop { elapsed: 0.0 }
    }
}

/// What a corpse should do this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathStep {
    Wait,
    DropLoot,
    Despawn,
}

impl DeathSequence {
    /// Advances by `dt`. `signaled` is true when a `DropLootNow` arrived for this corpse.
    pub fn advance(&mut self, dt: f32, signaled: bool, loot: &LootConfig) -> DeathStep {
        match self {
            Self::AwaitingDrop { elapsed } => {
                *elapsed += dt;
                let due = if loot.drop_on_signal {
                    signaled || *elapsed >= signal_timeout(loot.drop_delay)
                } else {
                    *elapsed >= loot.drop_delay
                };
                if due {
                    *self = Self::Lingering { elapsed: 0.0 };
                    DeathStep::DropLoot
                } else {
                    DeathStep::Wait
                }
            }
            Self::Lingering { elapsed } => {
                *elapsed += dt;
                if *elapsed >= loot.linger {
                    DeathStep::Despawn
                } else {
                    DeathStep::Wait
                }
            }
        }
    }
}

/// External trigger: drop this corpse's loot now (used with `drop_on_signal`).
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropLootNow(pub Entity);

/// Per-run tallies shown on the HUD and game-over screen.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq, Reflect)]
#[reflect(Resource)]
pub struct RunStats {
    pub kills: u32,
}

// === Systems ===

fn reset_run_stats(mut commands: Commands) {
    commands.insert_resource(RunStats::default());
}

/// Marks the fallen as `Dead`. Player death requests game over; enemies stop
/// acting and start their death sequence.
fn handle_deaths(
    mut commands: Commands,
    mut died: MessageReader<ActorDied>,
    mut requests: MessageWriter<RunRequest>,
    mut stats: ResMut<RunStats>,
) {
    for death in died.read() {
        let Ok(mut entity) = commands.get_entity(death.entity) else {
            continue;
        };
        entity.insert(Dead);

        match death.faction {
            Faction::Player => {
                info!("Player died");
                requests.write(RunRequest::GameOver);
            }
            Faction::Enemy => {
                stats.kills += 1;
                entity
                    .remove::<(Weapon, ChaseTarget, NavPath, RigidBody, Collider)>()
                    .insert(DeathSequence::default());
            }
        }
    }
}

fn tick_death_sequences(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<RunConfig>,
    mut signals: MessageReader<DropLootNow>,
    mut corpses: Query<(Entity, &Transform, &mut DeathSequence)>,
) {
    let signaled: Vec<Entity> = signals.read().map(|DropLootNow(entity)| *entity).collect();
    let dt = time.delta_secs();
    let mut rng = rand::rng();

    for (entity, transform, mut sequence) in &mut corpses {
        match sequence.advance(dt, signaled.contains(&entity), &config.loot) {
            DeathStep::Wait => {}
            DeathStep::DropLoot => {
                let origin = transform.translation.truncate();
                for value in split_loot(config.loot.total_value, config.loot.orbs) {
                    let offset = if config.loot.spread > 0.0 {
                        Vec2::from_angle(rng.random_range(0.0..std::f32::consts::TAU))
                            * rng.random_range(0.0..config.loot.spread)
                    } else {
                        Vec2::ZERO
                    };
                    commands.spawn(xp_orb(value, origin + offset, &config.orbs));
                }
            }
            DeathStep::Despawn => commands.entity(entity).despawn(),
        }
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.add_message::<DropLootNow>()
        .register_type::<DeathSequence>()
        .register_type::<RunStats>()
        .init_resource::<RunStats>();

    for schedule in run_start_schedules() {
        app.add_systems(schedule, reset_run_stats);
    }

    app.add_systems(
        Update,
        (handle_deaths, tick_death_sequences)
            .chain()
            .in_set(GameSet::Death)
            .run_if(gameplay_running),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loot(drop_on_signal: bool) -> LootConfig {
        LootConfig {
            drop_delay: 0.5,
            linger: 1.0,
            drop_on_signal,
            ..default()
        }
    }

    #[test]
    fn split_is_even_with_remainder_first() {
        assert_eq!(split_loot(10, 3), vec![4, 3, 3]);
        assert_eq!(split_loot(9, 3), vec![3, 3, 3]);
        assert_eq!(split_loot(5, 1), vec![5]);
    }

    #[test]
    fn split_omits_zero_units() {
        assert_eq!(split_loot(2, 5), vec![1, 1]);
        assert!(split_loot(0, 3).is_empty());
        assert!(split_loot(7, 0).is_empty());
    }

    #[test]
    fn split_preserves_total() {
        for total in 0..40 {
            for units in 1..8 {
                assert_eq!(split_loot(total, units).iter().sum::<u32>(), total);
            }
        }
    }

    #[test]
    fn timeout_has_floor() {
        assert!((signal_timeout(0.0) - 2.25).abs() < 1e-6);
        assert!((signal_timeout(1.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn drops_after_delay_then_despawns_after_linger() {
        let loot = loot(false);
        let mut sequence = DeathSequence::default();

        assert_eq!(sequence.advance(0.3, false, &loot), DeathStep::Wait);
        assert_eq!(sequence.advance(0.3, false, &loot), DeathStep::DropLoot);
        assert_eq!(sequence, DeathSequence::Lingering { elapsed: 0.0 });
        assert_eq!(sequence.advance(0.6, false, &loot), DeathStep::Wait);
        assert_eq!(sequence.advance(0.6, false, &loot), DeathStep::Despawn);
    }

    #[test]
    fn signal_mode_ignores_delay() {
        let loot = loot(true);
        let mut sequence = DeathSequence::default();

        assert_eq!(sequence.advance(1.0, false, &loot), DeathStep::Wait);
        assert_eq!(sequence.advance(0.0, true, &loot), DeathStep::DropLoot);
    }

    #[test]
    fn signal_mode_times_out() {
        let loot = loot(true);
        let mut sequence = DeathSequence::default();

        assert_eq!(sequence.advance(2.4, false, &loot), DeathStep::Wait);
        assert_eq!(sequence.advance(0.2, false, &loot), DeathStep::DropLoot);
    }

    #[test]
    fn signal_ignored_when_not_configured() {
        let loot = loot(false);
        let mut sequence = DeathSequence::default();
        assert_eq!(sequence.advance(0.0, true, &loot), DeathStep::Wait);
    }
}
