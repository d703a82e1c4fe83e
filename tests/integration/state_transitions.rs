//! Run state machine driven through `RunRequest` messages.

use bevy::prelude::*;
use horde_survival::RunState;
use horde_survival::run::{PauseReason, RunClock, RunRequest};
use pretty_assertions::assert_eq;

use crate::{create_game_app, settle, state};

fn request(app: &mut App, request: RunRequest) {
    app.world_mut().write_message(request);
    settle(app);
}

#[test]
fn game_starts_in_menu() {
    let app = create_game_app();
    assert_eq!(state(&app), RunState::Menu);
    assert!(!app.world().resource::<RunClock>().is_running());
}

#[test]
fn start_pause_resume() {
    let mut app = create_game_app();

    request(&mut app, RunRequest::Start);
    assert_eq!(state(&app), RunState::Playing);
    assert!(app.world().resource::<RunClock>().is_running());

    request(&mut app, RunRequest::Pause(PauseReason::Player));
    assert_eq!(state(&app), RunState::Paused);
    assert!(app.world().resource::<Time<Virtual>>().is_paused());

    request(&mut app, RunRequest::Resume);
    assert_eq!(state(&app), RunState::Playing);
    assert!(!app.world().resource::<Time<Virtual>>().is_paused());
}

#[test]
fn illegal_requests_are_ignored() {
    let mut app = create_game_app();

    request(&mut app, RunRequest::Pause(PauseReason::Player));
    assert_eq!(state(&app), RunState::Menu);

    request(&mut app, RunRequest::Resume);
    assert_eq!(state(&app), RunState::Menu);
}

#[test]
fn game_over_then_restart_returns_to_menu() {
    let mut app = create_game_app();
    request(&mut app, RunRequest::Start);

    request(&mut app, RunRequest::GameOver);
    assert_eq!(state(&app), RunState::GameOver);
    assert!(!app.world().resource::<RunClock>().is_running());

    request(&mut app, RunRequest::Restart);
    assert_eq!(state(&app), RunState::Menu);
}
