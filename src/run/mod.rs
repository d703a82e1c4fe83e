//! Run state machine: Menu → Playing ⇄ Paused → GameOver → Menu.
//!
//! Every gameplay system is gated on `RunState::Playing` (see
//! [`crate::gameplay_running`]). State changes are requested through
//! [`RunRequest`] messages and validated by [`resolve_request`], so illegal
//! transitions are dropped instead of reaching `NextState`.

mod overlays;

use bevy::prelude::*;

/// Global run state.
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
#[states(scoped_entities)]
pub enum RunState {
    /// Character select / title screen.
    #[default]
    Menu,
    /// A run is live.
    Playing,
    /// Run frozen (player pause or upgrade choice).
    Paused,
    /// Player died; world frozen until restart.
    GameOver,
}

/// Why the run is paused. Decides which overlay and inputs are active.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
#[reflect(Resource)]
pub enum PauseReason {
    #[default]
    Player,
    UpgradeChoice,
}

/// Requested run transition.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunRequest {
    Start,
    Pause(PauseReason),
    Resume,
    GameOver,
    Restart,
}

/// Returns the state a request leads to from `current`, or `None` if the request is a no-op there.
#[must_use]
pub const fn resolve_request(current: RunState, request: RunRequest) -> Option<RunState> {
    match (current, request) {
        (RunState::Menu | RunState::GameOver, RunRequest::Start)
        | (RunState::Paused, RunRequest::Resume) => Some(RunState::Playing),
        (RunState::Playing, RunRequest::Pause(_)) => Some(RunState::Paused),
        (RunState::Playing | RunState::Paused, RunRequest::GameOver) => Some(RunState::GameOver),
        (RunState::GameOver | RunState::Paused, RunRequest::Restart) => Some(RunState::Menu),
        _ => None,
    }
}

/// Marker for entities owned by a run. Despawned when the run is torn down.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct RunEntity;

/// Live run time, excluding time spent paused.
///
/// Driven by a monotonic clock passed in as `now` (seconds). Outside a run
/// `elapsed` is 0; while paused it stays at the value captured when the
/// pause began.
#[derive(Resource, Debug, Clone, Default, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct RunClock {
    started_at: Option<f64>,
    paused_at: Option<f64>,
    paused_total: f64,
    /// Elapsed seconds of the last finished run, kept for the game-over screen.
    pub last_run_secs: f64,
}

impl RunClock {
    pub fn start(&mut self, now: f64) {
        self.started_at = Some(now);
        self.paused_at = None;
        self.paused_total = 0.0;
    }

    pub fn pause(&mut self, now: f64) {
        if self.started_at.is_some() && self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: f64) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += (now - paused_at).max(0.0);
        }
    }

    /// Ends the run, remembering its length.
    pub fn stop(&mut self, now: f64) {
        self.last_run_secs = self.elapsed(now);
        self.started_at = None;
        self.paused_at = None;
        self.paused_total = 0.0;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    #[must_use]
    pub fn elapsed(&self, now: f64) -> f64 {
        let Some(started_at) = self.started_at else {
            return 0.0;
        };
        let end = self.paused_at.unwrap_or(now);
        (end - started_at - self.paused_total).max(0.0)
    }
}

/// The two transitions that begin a fresh run. Systems that build run state
/// (player, arena, progression) register on both.
#[must_use]
pub const fn run_start_schedules() -> [OnTransition<RunState>; 2] {
    [
        OnTransition {
            exited: RunState::Menu,
            entered: RunState::Playing,
        },
        OnTransition {
            exited: RunState::GameOver,
            entered: RunState::Playing,
        },
    ]
}

// === Systems ===

/// Applies queued run requests in order, keeping `RunClock` in step.
///
/// A `Start` ends the frame's batch: the run-start transition has to run
/// before anything else can act on the new run.
fn apply_run_requests(
    mut requests: MessageReader<RunRequest>,
    state: Res<State<RunState>>,
    mut next_state: ResMut<NextState<RunState>>,
    mut clock: ResMut<RunClock>,
    mut pause_reason: ResMut<PauseReason>,
    real_time: Res<Time<Real>>,
) {
    let now = real_time.elapsed_secs_f64();
    let mut current = *state.get();

    let mut started = false;
    for &request in requests.read() {
        if started {
            debug!("Ignoring {request:?} queued behind Start");
            continue;
        }
        let Some(next) = resolve_request(current, request) else {
            debug!("Ignoring {request:?} in {current:?}");
            continue;
        };

        match request {
            RunRequest::Start => {
                clock.start(now);
                started = true;
                info!("Run started");
            }
            RunRequest::Pause(reason) => {
                clock.pause(now);
                *pause_reason = reason;
            }
            RunRequest::Resume => clock.resume(now),
            RunRequest::GameOver => {
                clock.stop(now);
                info!("Game over after {:.1}s", clock.last_run_secs);
            }
            RunRequest::Restart => clock.stop(now),
        }

        current = next;
        next_state.set(next);
    }
}

fn pause_virtual_time(mut time: ResMut<Time<Virtual>>) {
    time.pause();
}

fn unpause_virtual_time(mut time: ResMut<Time<Virtual>>) {
    time.unpause();
}

/// Despawns all entities with the given marker.
pub fn cleanup_entities<T: Component>(mut commands: Commands, query: Query<Entity, With<T>>) {
    for entity in &query {
        commands.entity(entity).despawn();
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.init_state::<RunState>()
        .init_resource::<RunClock>()
        .init_resource::<PauseReason>()
        .add_message::<RunRequest>()
        .register_type::<RunClock>()
        .register_type::<PauseReason>()
        .register_type::<RunEntity>();

    app.add_systems(
        Update,
        apply_run_requests.after(crate::GameSet::Ui),
    );

    // Frozen world while paused or dead: cooldowns, waves and death timers all read virtual time.
    app.add_systems(OnEnter(RunState::Paused), pause_virtual_time)
        .add_systems(OnExit(RunState::Paused), unpause_virtual_time)
        .add_systems(OnEnter(RunState::GameOver), pause_virtual_time)
        .add_systems(OnExit(RunState::GameOver), unpause_virtual_time);

    // Tear down the previous run before a new one is built.
    app.add_systems(OnEnter(RunState::Menu), cleanup_entities::<RunEntity>)
        .add_systems(OnExit(RunState::GameOver), cleanup_entities::<RunEntity>);

    overlays::plugin(app);
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::config::WeaponConfig;
    use crate::gameplay::combat::weapon::{Weapon, fire_weapons};
    use crate::gameplay::combat::{ActorDied, DamageEvent, apply_damage};
    use crate::gameplay::{Faction, Health};
    use crate::testing::{create_base_test_app, send_run_request, spawn_test_enemy, spawn_test_player};
    use crate::{GameSet, gameplay_running};
    use bevy::time::TimeUpdateStrategy;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn create_run_test_app() -> App {
        let mut app = create_base_test_app();
        app.init_resource::<RunClock>().init_resource::<PauseReason>();
        app.add_systems(Update, apply_run_requests);
        app.add_systems(OnEnter(RunState::Paused), pause_virtual_time)
            .add_systems(OnExit(RunState::Paused), unpause_virtual_time)
            .add_systems(OnEnter(RunState::Menu), cleanup_entities::<RunEntity>);
        app.update();
        app
    }

    fn current_state(app: &App) -> RunState {
        *app.world().resource::<State<RunState>>().get()
    }

    #[test]
    fn start_request_enters_playing_and_starts_clock() {
        let mut app = create_run_test_app();
        send_run_request(&mut app, RunRequest::Start);
        app.update();

        assert_eq!(current_state(&app), RunState::Playing);
        assert!(app.world().resource::<RunClock>().is_running());
    }

    #[test]
    fn illegal_request_is_ignored() {
        let mut app = create_run_test_app();
        send_run_request(&mut app, RunRequest::Resume);
        app.update();

        assert_eq!(current_state(&app), RunState::Menu);
    }

    #[test]
    fn pause_freezes_virtual_time_and_records_reason() {
        let mut app = create_run_test_app();
        send_run_request(&mut app, RunRequest::Start);
        app.update();
        send_run_request(&mut app, RunRequest::Pause(PauseReason::UpgradeChoice));
        app.update();

        assert_eq!(current_state(&app), RunState::Paused);
        assert!(app.world().resource::<Time<Virtual>>().is_paused());
        assert_eq!(
            *app.world().resource::<PauseReason>(),
            PauseReason::UpgradeChoice
        );

        send_run_request(&mut app, RunRequest::Resume);
        app.update();
        assert_eq!(current_state(&app), RunState::Playing);
        assert!(!app.world().resource::<Time<Virtual>>().is_paused());
    }

    #[test]
    fn requests_in_one_frame_apply_in_order() {
        let mut app = create_run_test_app();
        send_run_request(&mut app, RunRequest::Start);
        app.update();
        send_run_request(&mut app, RunRequest::Pause(PauseReason::UpgradeChoice));
        send_run_request(&mut app, RunRequest::GameOver);
        app.update();

        assert_eq!(current_state(&app), RunState::GameOver);
    }

    #[test]
    fn start_ends_the_batch() {
        let mut app = create_run_test_app();
        send_run_request(&mut app, RunRequest::Start);
        send_run_request(&mut app, RunRequest::Pause(PauseReason::Player));
        app.update();

        assert_eq!(current_state(&app), RunState::Playing);
    }

    #[test]
    fn restart_despawns_run_entities() {
        let mut app = create_run_test_app();
        send_run_request(&mut app, RunRequest::Start);
        app.update();
        let entity = app.world_mut().spawn(RunEntity).id();

        send_run_request(&mut app, RunRequest::GameOver);
        app.update();
        assert!(app.world().get_entity(entity).is_ok());

        send_run_request(&mut app, RunRequest::Restart);
        app.update();
        assert_eq!(current_state(&app), RunState::Menu);
        assert!(app.world().get_entity(entity).is_err());
    }

    #[test]
    fn pause_does_not_let_a_weapon_cooldown_expire() {
        let mut app = create_run_test_app();
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)))
            .add_message::<DamageEvent>()
            .add_message::<ActorDied>()
            .add_systems(
                Update,
                (fire_weapons, apply_damage)
                    .chain()
                    .in_set(GameSet::Combat)
                    .run_if(gameplay_running),
            );

        let config = WeaponConfig {
            fire_rate: 1.0,
            ..default()
        };
        let player = spawn_test_player(app.world_mut(), Vec2::ZERO);
        app.world_mut()
            .entity_mut(player)
            .insert(Weapon::from_config(&config, Faction::Enemy));
        let enemy = spawn_test_enemy(app.world_mut(), Vec2::new(20.0, 0.0), 1000.0);

        send_run_request(&mut app, RunRequest::Start);
        app.update();
        app.update();
        assert_eq!(current_state(&app), RunState::Playing);
        let after_first_shot = 1000.0 - config.damage;
        assert_eq!(app.world().get::<Health>(enemy).unwrap().current, after_first_shot);

        send_run_request(&mut app, RunRequest::Pause(PauseReason::Player));
        app.update();
        // Three seconds of wall time, three times the one-second cooldown.
        for _ in 0..30 {
            app.update();
        }
        assert_eq!(current_state(&app), RunState::Paused);

        send_run_request(&mut app, RunRequest::Resume);
        app.update();
        app.update();
        assert_eq!(current_state(&app), RunState::Playing);

        let now = app.world().resource::<Time<Virtual>>().elapsed_secs();
        let weapon = app.world().get::<Weapon>(player).unwrap();
        assert!(!weapon.is_ready(now), "cooldown expired during the pause at {now}s");
        assert_eq!(app.world().get::<Health>(enemy).unwrap().current, after_first_shot);
    }
}
