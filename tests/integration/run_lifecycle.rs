//! A run from the menu to game over and back, through keyboard input.

use bevy::prelude::*;
use horde_survival::RunState;
use horde_survival::gameplay::combat::{ActorDied, DamageEvent};
use horde_survival::gameplay::enemy::Enemy;
use horde_survival::gameplay::player::{Player, SelectedCharacter};
use horde_survival::gameplay::progression::{PendingUpgrades, Progression, XpCollected};
use horde_survival::gameplay::{Dead, Faction};
use horde_survival::run::{PauseReason, RunEntity, RunRequest};
use pretty_assertions::assert_eq;

use crate::{create_game_app, settle, state, tap};

fn count<F: bevy::ecs::query::QueryFilter>(app: &mut App) -> usize {
    app.world_mut()
        .query_filtered::<(), F>()
        .iter(app.world())
        .count()
}

fn player(app: &mut App) -> Entity {
    app.world_mut()
        .query_filtered::<Entity, With<Player>>()
        .single(app.world())
        .unwrap()
}

fn start_run(app: &mut App, key: KeyCode) {
    tap(app, key);
    settle(app);
    assert_eq!(state(app), RunState::Playing);
}

#[test]
fn number_key_starts_run_with_that_character() {
    let mut app = create_game_app();
    start_run(&mut app, KeyCode::Digit2);

    assert_eq!(app.world().resource::<SelectedCharacter>().0, 1);
    assert_eq!(count::<With<Player>>(&mut app), 1);
    let player = player(&mut app);
    assert_eq!(app.world().get::<Name>(player).unwrap().as_str(), "Ranger");
}

#[test]
fn first_wave_arrives_with_the_run() {
    let mut app = create_game_app();
    start_run(&mut app, KeyCode::Enter);

    assert!(count::<With<Enemy>>(&mut app) > 0);
}

#[test]
fn escape_pauses_and_resumes() {
    let mut app = create_game_app();
    start_run(&mut app, KeyCode::Enter);

    tap(&mut app, KeyCode::Escape);
    settle(&mut app);
    assert_eq!(state(&app), RunState::Paused);
    assert_eq!(*app.world().resource::<PauseReason>(), PauseReason::Player);

    tap(&mut app, KeyCode::Escape);
    settle(&mut app);
    assert_eq!(state(&app), RunState::Playing);
}

#[test]
fn level_up_pauses_for_a_choice_and_choosing_resumes() {
    let mut app = create_game_app();
    start_run(&mut app, KeyCode::Enter);

    app.world_mut().write_message(XpCollected(10));
    settle(&mut app);
    settle(&mut app);
    assert_eq!(state(&app), RunState::Paused);
    assert_eq!(
        *app.world().resource::<PauseReason>(),
        PauseReason::UpgradeChoice
    );
    assert_eq!(app.world().resource::<Progression>().level, 2);

    tap(&mut app, KeyCode::Digit1);
    settle(&mut app);
    settle(&mut app);
    assert_eq!(state(&app), RunState::Playing);
    assert!(app.world().resource::<PendingUpgrades>().current.is_none());
}

#[test]
fn level_up_during_player_pause_is_offered_after_resume() {
    let mut app = create_game_app();
    start_run(&mut app, KeyCode::Enter);

    app.world_mut()
        .write_message(RunRequest::Pause(PauseReason::Player));
    app.world_mut().write_message(XpCollected(10));
    settle(&mut app);
    assert_eq!(state(&app), RunState::Paused);
    assert_eq!(*app.world().resource::<PauseReason>(), PauseReason::Player);

    app.world_mut().write_message(RunRequest::Resume);
    settle(&mut app);
    settle(&mut app);
    assert_eq!(state(&app), RunState::Paused);
    assert_eq!(
        *app.world().resource::<PauseReason>(),
        PauseReason::UpgradeChoice
    );
    assert!(app.world().resource::<PendingUpgrades>().current.is_some());

    tap(&mut app, KeyCode::Digit1);
    settle(&mut app);
    settle(&mut app);
    assert_eq!(state(&app), RunState::Playing);
}

#[test]
fn player_death_ends_run_and_restart_clears_it() {
    let mut app = create_game_app();
    start_run(&mut app, KeyCode::Enter);
    let player = player(&mut app);

    app.world_mut()
        .write_message(DamageEvent::new(100_000.0, None, player));
    settle(&mut app);
    settle(&mut app);
    assert_eq!(state(&app), RunState::GameOver);
    assert!(app.world().get::<Dead>(player).is_some());

    tap(&mut app, KeyCode::KeyR);
    settle(&mut app);
    assert_eq!(state(&app), RunState::Menu);
    assert_eq!(count::<With<RunEntity>>(&mut app), 0);
}

#[test]
fn retry_from_game_over_starts_fresh() {
    let mut app = create_game_app();
    start_run(&mut app, KeyCode::Enter);
    let first = player(&mut app);
    app.world_mut().write_message(ActorDied {
        entity: first,
        faction: Faction::Player,
        position: Vec2::ZERO,
    });
    settle(&mut app);
    settle(&mut app);
    assert_eq!(state(&app), RunState::GameOver);

    tap(&mut app, KeyCode::Enter);
    settle(&mut app);
    assert_eq!(state(&app), RunState::Playing);
    assert_eq!(count::<With<Player>>(&mut app), 1);
    assert_ne!(player(&mut app), first);
}
