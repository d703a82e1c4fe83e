//! Player abilities behind a shared cooldown gate.
//!
//! Every ability implements [`Castable`]: given a [`CastContext`] snapshot it
//! either returns a [`CastEffect`] or vetoes with `None`. The cooldown is only
//! consumed by a successful cast (see [`Cooldown::try_cast`]).

use avian2d::prelude::*;
use bevy::prelude::*;
use serde::Deserialize;

use crate::gameplay::arena::Obstacle;
use crate::gameplay::combat::{
    Candidate, DamageEvent, TargetQuery, apply_damage, gather_candidates, knockback_velocity,
    line_of_sight, obstacle_rects,
};
use crate::gameplay::cooldown::{COOLDOWN_MULTIPLIER_EPSILON, Cooldown};
use crate::gameplay::player::{Facing, MoveIntent, Player};
use crate::gameplay::{Dead, Faction, Invulnerability};
use crate::{GameSet, gameplay_running};

/// Number of ability slots on a loadout.
pub const ABILITY_SLOTS: usize = 4;

/// Slot keys, in slot order.
const SLOT_KEYS: [KeyCode; ABILITY_SLOTS] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
];

/// Dedicated dash key. Casts the first dash in the loadout.
const DASH_KEY: KeyCode = KeyCode::ShiftLeft;

// === Casting ===

/// World snapshot an ability resolves against.
#[derive(Debug, Clone, Copy)]
pub struct CastContext<'a> {
    pub caster: Entity,
    pub origin: Vec2,
    /// Unit aim direction, if the caster has one.
    pub aim: Option<Vec2>,
    /// Hostile actors within the ability's reach, in entity order.
    pub candidates: &'a [Candidate],
    pub obstacles: &'a [Rect],
}

/// Movement started by a dash.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashMotion {
    pub velocity: Vec2,
    pub duration: f32,
    pub invulnerable_secs: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CastEffect {
    Hits(Vec<DamageEvent>),
    Dash(DashMotion),
}

/// Single entry point for ability effects.
pub trait Castable {
    /// Base cooldown in seconds.
    fn cooldown(&self) -> f32;

    /// How far from the caster to gather candidates. 0 for self-only abilities.
    fn reach(&self) -> f32 {
        0.0
    }

    /// Resolves the effect, or vetoes with `None`.
    fn cast(&self, ctx: &CastContext) -> Option<CastEffect>;
}

/// Radial blast: damages every valid candidate in radius and knocks bodies back.
#[derive(Debug, Clone, PartialEq, Deserialize, Reflect)]
#[serde(default)]
pub struct Shockwave {
    pub cooldown: f32,
    pub radius: f32,
    pub damage: f32,
    pub knockback: f32,
    pub require_line_of_sight: bool,
}

impl Default for Shockwave {
    fn default() -> Self {
        Self {
            cooldown: 3.0,
            radius: 120.0,
            damage: 20.0,
            knockback: 144.0,
            require_line_of_sight: false,
        }
    }
}

impl Castable for Shockwave {
    fn cooldown(&self) -> f32 {
        self.cooldown
    }

    fn reach(&self) -> f32 {
        self.radius
    }

    fn cast(&self, ctx: &CastContext) -> Option<CastEffect> {
        let radius_squared = self.radius * self.radius;
        let hits: Vec<DamageEvent> = ctx
            .candidates
            .iter()
            .filter(|candidate| ctx.origin.distance_squared(candidate.position) <= radius_squared)
            .filter(|candidate| {
                !self.require_line_of_sight
                    || line_of_sight(ctx.origin, candidate.position, ctx.obstacles)
            })
            .map(|candidate| {
                let event = DamageEvent::new(self.damage, Some(ctx.caster), candidate.entity);
                if candidate.has_body && self.knockback > 0.0 {
                    event.with_knockback(knockback_velocity(
                        ctx.origin,
                        candidate.position,
                        self.knockback,
                    ))
                } else {
                    event
                }
            })
            .collect();

        if hits.is_empty() {
            debug!("Shockwave found no targets");
            return None;
        }
        Some(CastEffect::Hits(hits))
    }
}

/// Short burst of movement along the aim direction, with i-frames.
#[derive(Debug, Clone, PartialEq, Deserialize, Reflect)]
#[serde(default)]
pub struct Dash {
    pub cooldown: f32,
    pub distance: f32,
    pub duration: f32,
    pub invulnerable_secs: f32,
}

impl Default for Dash {
    fn default() -> Self {
        Self {
            cooldown: 0.6,
            distance: 144.0,
            duration: 0.12,
            invulnerable_secs: 0.15,
        }
    }
}

/// Shortest dash duration. Keeps the dash velocity finite.
const MIN_DASH_DURATION: f32 = 0.01;

impl Castable for Dash {
    fn cooldown(&self) -> f32 {
        self.cooldown
    }

    fn cast(&self, ctx: &CastContext) -> Option<CastEffect> {
        let direction = ctx.aim?.try_normalize()?;
        let duration = self.duration.max(MIN_DASH_DURATION);
        Some(CastEffect::Dash(DashMotion {
            velocity: direction * (self.distance.max(0.0) / duration),
            duration,
            invulnerable_secs: self.invulnerable_secs.max(0.0),
        }))
    }
}

/// Every ability a character can equip. Tagged by `kind` in config files.
#[derive(Debug, Clone, PartialEq, Deserialize, Reflect)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbilityKind {
    Shockwave(Shockwave),
    Dash(Dash),
}

impl AbilityKind {
    #[must_use]
    pub fn default_shockwave() -> Self {
        Self::Shockwave(Shockwave::default())
    }

    #[must_use]
    pub fn default_dash() -> Self {
        Self::Dash(Dash::default())
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Shockwave(_) => "Shockwave",
            Self::Dash(_) => "Dash",
        }
    }

    fn as_castable(&self) -> &dyn Castable {
        match self {
            Self::Shockwave(shockwave) => shockwave,
            Self::Dash(dash) => dash,
        }
    }
}

impl Castable for AbilityKind {
    fn cooldown(&self) -> f32 {
        self.as_castable().cooldown()
    }

    fn reach(&self) -> f32 {
        self.as_castable().reach()
    }

    fn cast(&self, ctx: &CastContext) -> Option<CastEffect> {
        self.as_castable().cast(ctx)
    }
}

/// An equipped ability and its cooldown gate.
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct Ability {
    pub kind: AbilityKind,
    pub cooldown: Cooldown,
}

impl Ability {
    #[must_use]
    pub fn new(kind: AbilityKind) -> Self {
        let cooldown = Cooldown::new(kind.cooldown());
        Self { kind, cooldown }
    }

    /// Casts through the cooldown gate.
    pub fn try_cast(&mut self, now: f32, ctx: &CastContext) -> Option<CastEffect> {
        let kind = &self.kind;
        self.cooldown.try_cast(now, || kind.cast(ctx))
    }
}

/// The player's ability slots.
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct AbilityLoadout {
    pub slots: [Option<Ability>; ABILITY_SLOTS],
    cooldown_multiplier: f32,
}

impl Default for AbilityLoadout {
    fn default() -> Self {
        Self {
            slots: [None, None, None, None],
            cooldown_multiplier: 1.0,
        }
    }
}

impl AbilityLoadout {
    /// Fills slots in order. Abilities beyond the slot count are dropped.
    #[must_use]
    pub fn from_kinds(kinds: &[AbilityKind]) -> Self {
        if kinds.len() > ABILITY_SLOTS {
            warn!(
                "Loadout has {} abilities, only the first {ABILITY_SLOTS} are equipped",
                kinds.len()
            );
        }
        let mut loadout = Self::default();
        for (slot, kind) in loadout.slots.iter_mut().zip(kinds) {
            *slot = Some(Ability::new(kind.clone()));
        }
        loadout
    }

    #[must_use]
    pub const fn cooldown_multiplier(&self) -> f32 {
        self.cooldown_multiplier
    }

    /// Scales every slot's cooldown by `factor` (stacking multiplicatively).
    pub fn scale_cooldowns(&mut self, factor: f32) {
        self.cooldown_multiplier =
            (self.cooldown_multiplier * factor).max(COOLDOWN_MULTIPLIER_EPSILON);
        for ability in self.slots.iter_mut().flatten() {
            ability.cooldown.multiplier = self.cooldown_multiplier;
        }
    }

    /// Index of the first dash slot.
    #[must_use]
    pub fn dash_slot(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(Ability { kind: AbilityKind::Dash(_), .. })))
    }
}

// === Messages & Components ===

/// Request to cast the ability in `slot`.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastAbility {
    pub caster: Entity,
    pub slot: usize,
}

/// Active dash. Overrides the caster's own steering until it runs out.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Dashing {
    pub velocity: Vec2,
    pub remaining: f32,
}

// === Systems ===

/// Maps slot keys to cast requests for every living player.
fn read_ability_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    players: Query<(Entity, &AbilityLoadout), (With<Player>, Without<Dead>)>,
    mut requests: MessageWriter<CastAbility>,
) {
    for (caster, loadout) in &players {
        for (slot, key) in SLOT_KEYS.iter().enumerate() {
            if keyboard.just_pressed(*key) {
                requests.write(CastAbility { caster, slot });
            }
        }
        if keyboard.just_pressed(DASH_KEY) {
            if let Some(slot) = loadout.dash_slot() {
                requests.write(CastAbility { caster, slot });
            }
        }
    }
}

/// Resolves cast requests. Hits go to `apply_damage`; dashes start movement.
/// Runs in `GameSet::Combat`, before `apply_damage`.
fn cast_abilities(
    time: Res<Time>,
    mut requests: MessageReader<CastAbility>,
    mut casters: Query<
        (
            &Transform,
            &Faction,
            &mut AbilityLoadout,
            Option<&MoveIntent>,
            Option<&Facing>,
            Option<&mut Invulnerability>,
        ),
        Without<Dead>,
    >,
    actors: TargetQuery,
    obstacle_query: Query<(&Obstacle, &Transform)>,
    mut damage: MessageWriter<DamageEvent>,
    mut commands: Commands,
) {
    let now = time.elapsed_secs();
    let mut obstacles: Option<Vec<Rect>> = None;

    for request in requests.read() {
        let Ok((transform, faction, mut loadout, intent, facing, invulnerability)) =
            casters.get_mut(request.caster)
        else {
            continue;
        };
        let Some(ability) = loadout.slots.get_mut(request.slot).and_then(Option::as_mut) else {
            continue;
        };

        let origin = transform.translation.truncate();
        let aim = intent
            .map(|intent| intent.0)
            .filter(|direction| *direction != Vec2::ZERO)
            .or_else(|| facing.map(|facing| facing.0));
        let hostile = match faction {
            Faction::Player => Faction::Enemy,
            Faction::Enemy => Faction::Player,
        };
        let reach = ability.kind.reach();
        let candidates = if reach > 0.0 {
            gather_candidates(&actors, origin, reach, hostile, request.caster)
        } else {
            Vec::new()
        };
        let obstacles = obstacles.get_or_insert_with(|| obstacle_rects(&obstacle_query));

        let ctx = CastContext {
            caster: request.caster,
            origin,
            aim,
            candidates: &candidates,
            obstacles,
        };

        match ability.try_cast(now, &ctx) {
            Some(CastEffect::Hits(hits)) => {
                info!("{} hit {} target(s)", ability.kind.name(), hits.len());
                damage.write_batch(hits);
            }
            Some(CastEffect::Dash(motion)) => {
                commands.entity(request.caster).insert(Dashing {
                    velocity: motion.velocity,
                    remaining: motion.duration,
                });
                if let Some(mut invulnerability) = invulnerability {
                    invulnerability.grant(now, motion.invulnerable_secs);
                }
            }
            None => {}
        }
    }
}

/// Drives dashing bodies and ends the dash when its time runs out.
fn tick_dashes(
    time: Res<Time>,
    mut dashers: Query<(Entity, &mut Dashing, Option<&mut LinearVelocity>)>,
    mut commands: Commands,
) {
    let dt = time.delta_secs();
    for (entity, mut dashing, velocity) in &mut dashers {
        if let Some(mut velocity) = velocity {
            velocity.0 = dashing.velocity;
        }
        dashing.remaining -= dt;
        if dashing.remaining <= 0.0 {
            commands.entity(entity).remove::<Dashing>();
        }
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.add_message::<CastAbility>()
        .register_type::<AbilityLoadout>()
        .register_type::<Dashing>();

    app.add_systems(
        Update,
        (
            read_ability_input.in_set(GameSet::Input),
            tick_dashes.in_set(GameSet::Movement),
            cast_abilities.in_set(GameSet::Combat).before(apply_damage),
        )
            .run_if(gameplay_running),
    );
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::gameplay::Health;
    use crate::gameplay::combat::ActorDied;
    use crate::testing::{spawn_test_enemy, spawn_test_player};
    use pretty_assertions::assert_eq;

    fn create_ability_test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.init_resource::<ButtonInput<KeyCode>>();
        app.add_message::<CastAbility>()
            .add_message::<DamageEvent>()
            .add_message::<ActorDied>();
        app.add_systems(
            Update,
            (read_ability_input, cast_abilities, apply_damage, tick_dashes).chain(),
        );
        app.update();
        app
    }

    fn press(app: &mut App, key: KeyCode) {
        let mut keyboard = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
        keyboard.release_all();
        keyboard.clear();
        keyboard.press(key);
    }

    fn spawn_caster(app: &mut App) -> Entity {
        let player = spawn_test_player(app.world_mut(), Vec2::ZERO);
        app.world_mut().entity_mut(player).insert((
            AbilityLoadout::from_kinds(&[
                AbilityKind::default_shockwave(),
                AbilityKind::default_dash(),
            ]),
            MoveIntent(Vec2::X),
            LinearVelocity::default(),
        ));
        player
    }

    #[test]
    fn shockwave_key_damages_nearby_enemies() {
        let mut app = create_ability_test_app();
        spawn_caster(&mut app);
        let near = spawn_test_enemy(app.world_mut(), Vec2::new(40.0, 0.0), 30.0);
        let far = spawn_test_enemy(app.world_mut(), Vec2::new(400.0, 0.0), 30.0);

        press(&mut app, KeyCode::Digit1);
        app.update();

        assert_eq!(app.world().get::<Health>(near).unwrap().current, 10.0);
        assert_eq!(app.world().get::<Health>(far).unwrap().current, 30.0);
    }

    #[test]
    fn second_press_inside_cooldown_does_nothing() {
        let mut app = create_ability_test_app();
        spawn_caster(&mut app);
        let enemy = spawn_test_enemy(app.world_mut(), Vec2::new(40.0, 0.0), 100.0);

        press(&mut app, KeyCode::Digit1);
        app.update();
        press(&mut app, KeyCode::Digit1);
        app.update();

        assert_eq!(app.world().get::<Health>(enemy).unwrap().current, 80.0);
    }

    #[test]
    fn dash_key_starts_dash_with_iframes() {
        let mut app = create_ability_test_app();
        let player = spawn_caster(&mut app);

        press(&mut app, DASH_KEY);
        app.update();

        let dashing = app.world().get::<Dashing>(player).copied();
        assert!(dashing.is_some_and(|d| d.velocity.x > 0.0));
        assert!(
            app.world()
                .get::<Invulnerability>(player)
                .unwrap()
                .is_active(app.world().resource::<Time>().elapsed_secs())
        );
    }

    #[test]
    fn empty_slot_is_ignored() {
        let mut app = create_ability_test_app();
        let player = spawn_caster(&mut app);

        press(&mut app, KeyCode::Digit4);
        app.update();

        assert!(app.world().get::<Dashing>(player).is_none());
    }

    #[test]
    fn dash_sets_velocity_then_ends() {
        let mut app = create_ability_test_app();
        let player = spawn_caster(&mut app);
        app.world_mut().entity_mut(player).insert(Dashing {
            velocity: Vec2::new(500.0, 0.0),
            remaining: 0.0,
        });
        app.update();

        assert_eq!(
            app.world().get::<LinearVelocity>(player).unwrap().0,
            Vec2::new(500.0, 0.0)
        );
        assert!(app.world().get::<Dashing>(player).is_none());
    }
}
