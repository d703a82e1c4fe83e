//! Keyboard-driven text overlays for the menu, pause, upgrade choice and game over.
//!
//! Each overlay is spawned on entering its state and tagged `DespawnOnExit`.
//! Input systems only write `RunRequest`s (and `ChooseUpgrade`); the state
//! machine decides what actually happens.

use bevy::prelude::*;

use super::{PauseReason, RunClock, RunRequest, RunState};
use crate::GameSet;
use crate::config::RunConfig;
use crate::gameplay::death::RunStats;
use crate::gameplay::hud::format_clock;
use crate::gameplay::player::SelectedCharacter;
use crate::gameplay::progression::{ChooseUpgrade, PendingUpgrades, Progression, UpgradeCatalog};
use crate::theme::palette;
use crate::theme::widget::{header, hint, label, overlay_root};

/// Number keys for picking a character or upgrade, in order.
pub const CHOICE_KEYS: [KeyCode; 9] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

/// Marker for the upgrade offer overlay. Rebuilt whenever the offer changes.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct UpgradeOverlay;

/// First choice key pressed this frame, as a 0-based index below `count`.
#[must_use]
pub fn pressed_choice(keyboard: &ButtonInput<KeyCode>, count: usize) -> Option<usize> {
    CHOICE_KEYS
        .iter()
        .take(count)
        .position(|key| keyboard.just_pressed(*key))
}

// === Menu ===

fn spawn_menu(mut commands: Commands, config: Res<RunConfig>, selected: Res<SelectedCharacter>) {
    let mut lines: Vec<String> = config
        .characters
        .iter()
        .take(CHOICE_KEYS.len())
        .enumerate()
        .map(|(index, character)| {
            let marker = if index == selected.0 { ">" } else { " " };
            format!("{marker} [{}] {}", index + 1, character.name)
        })
        .collect();
    if lines.is_empty() {
        lines.push("No characters configured: base stats".to_string());
    }

    commands
        .spawn((overlay_root("Main Menu"), DespawnOnExit(RunState::Menu)))
        .with_children(|parent| {
            parent.spawn(header("Horde Survival"));
            for line in lines {
                parent.spawn(label(line, palette::HEADER_TEXT));
            }
            parent.spawn(hint("Number key: pick and start    Enter: start"));
        });
}

fn menu_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    config: Res<RunConfig>,
    mut selected: ResMut<SelectedCharacter>,
    mut requests: MessageWriter<RunRequest>,
) {
    if let Some(index) = pressed_choice(&keyboard, config.characters.len()) {
        selected.0 = index;
        requests.write(RunRequest::Start);
    } else if keyboard.just_pressed(KeyCode::Enter) {
        requests.write(RunRequest::Start);
    }
}

// === Playing / Paused ===

fn playing_input(keyboard: Res<ButtonInput<KeyCode>>, mut requests: MessageWriter<RunRequest>) {
    if keyboard.just_pressed(KeyCode::Escape) {
        requests.write(RunRequest::Pause(PauseReason::Player));
    }
}

fn spawn_pause_overlay(mut commands: Commands, reason: Res<PauseReason>) {
    if *reason != PauseReason::Player {
        return;
    }
    commands.spawn((
        overlay_root("Pause Overlay"),
        DespawnOnExit(RunState::Paused),
        children![
            header("Paused"),
            hint("Esc: resume    Q: quit to menu"),
        ],
    ));
}

fn pause_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    reason: Res<PauseReason>,
    mut requests: MessageWriter<RunRequest>,
) {
    if *reason != PauseReason::Player {
        return;
    }
    if keyboard.just_pressed(KeyCode::Escape) {
        requests.write(RunRequest::Resume);
    } else if keyboard.just_pressed(KeyCode::KeyQ) {
        requests.write(RunRequest::Restart);
    }
}

// === Upgrade choice ===

/// Rebuilds the upgrade overlay when a new offer is on the table.
fn refresh_upgrade_overlay(
    mut commands: Commands,
    reason: Res<PauseReason>,
    pending: Res<PendingUpgrades>,
    catalog: Res<UpgradeCatalog>,
    progression: Res<Progression>,
    overlays: Query<Entity, With<UpgradeOverlay>>,
) {
    if *reason != PauseReason::UpgradeChoice {
        return;
    }
    if !pending.is_changed() && !overlays.is_empty() {
        return;
    }
    for entity in &overlays {
        commands.entity(entity).despawn();
    }
    let Some(offer) = pending.current.as_ref() else {
        return;
    };

    let options: Vec<(String, String)> = offer
        .iter()
        .enumerate()
        .filter_map(|(choice, &index)| {
            let def = catalog.defs.get(index)?;
            Some((
                format!(
                    "[{}] {}  ({}/{})",
                    choice + 1,
                    def.title,
                    catalog.stacks(&def.id) + 1,
                    def.max_stacks
                ),
                def.description.clone(),
            ))
        })
        .collect();

    commands
        .spawn((
            overlay_root("Upgrade Overlay"),
            UpgradeOverlay,
            DespawnOnExit(RunState::Paused),
        ))
        .with_children(|parent| {
            parent.spawn(header(format!("Level {}", progression.level)));
            for (title, description) in options {
                parent.spawn(label(title, palette::ACCENT_TEXT));
                if !description.is_empty() {
                    parent.spawn(hint(description));
                }
            }
            parent.spawn(hint("Press a number to choose"));
        });
}

fn upgrade_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    reason: Res<PauseReason>,
    pending: Res<PendingUpgrades>,
    mut choices: MessageWriter<ChooseUpgrade>,
) {
    if *reason != PauseReason::UpgradeChoice {
        return;
    }
    let count = pending.current.as_ref().map_or(0, Vec::len);
    if let Some(choice) = pressed_choice(&keyboard, count) {
        choices.write(ChooseUpgrade(choice));
    }
}

// === Game over ===

fn spawn_game_over(
    mut commands: Commands,
    clock: Res<RunClock>,
    progression: Res<Progression>,
    stats: Res<RunStats>,
) {
    let summary = format!(
        "Survived {}    Level {}    Kills {}",
        format_clock(clock.last_run_secs),
        progression.level,
        stats.kills
    );
    commands.spawn((
        overlay_root("Game Over"),
        DespawnOnExit(RunState::GameOver),
        children![
            header("Game Over"),
            label(summary, palette::HEADER_TEXT),
            hint("Enter: retry    R: back to menu"),
        ],
    ));
}

fn game_over_input(keyboard: Res<ButtonInput<KeyCode>>, mut requests: MessageWriter<RunRequest>) {
    if keyboard.just_pressed(KeyCode::Enter) {
        requests.write(RunRequest::Start);
    } else if keyboard.just_pressed(KeyCode::KeyR) {
        requests.write(RunRequest::Restart);
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<UpgradeOverlay>();

    app.add_systems(OnEnter(RunState::Menu), spawn_menu)
        .add_systems(OnEnter(RunState::Paused), spawn_pause_overlay)
        .add_systems(OnEnter(RunState::GameOver), spawn_game_over);

    app.add_systems(
        Update,
        (
            menu_input.run_if(in_state(RunState::Menu)),
            playing_input.run_if(in_state(RunState::Playing)),
            (pause_input, upgrade_input, refresh_upgrade_overlay)
                .run_if(in_state(RunState::Paused)),
            game_over_input.run_if(in_state(RunState::GameOver)),
        )
            .in_set(GameSet::Input),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn choice_keys_map_to_indices() {
        let mut keyboard = ButtonInput::<KeyCode>::default();
        keyboard.press(KeyCode::Digit2);
        assert_eq!(pressed_choice(&keyboard, 3), Some(1));
    }

    #[test]
    fn keys_beyond_count_are_ignored() {
        let mut keyboard = ButtonInput::<KeyCode>::default();
        keyboard.press(KeyCode::Digit4);
        assert_eq!(pressed_choice(&keyboard, 3), None);
        assert_eq!(pressed_choice(&keyboard, 0), None);
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::testing::{assert_entity_count, create_base_test_app, transition_to_playing};
    use pretty_assertions::assert_eq;

    fn create_overlay_test_app() -> App {
        let mut app = create_base_test_app();
        app.init_resource::<ButtonInput<KeyCode>>()
            .init_resource::<PauseReason>()
            .init_resource::<RunClock>()
            .init_resource::<SelectedCharacter>()
            .init_resource::<Progression>()
            .init_resource::<PendingUpgrades>()
            .init_resource::<UpgradeCatalog>()
            .init_resource::<RunStats>()
            .add_message::<ChooseUpgrade>();
        plugin(&mut app);
        app.update();
        app
    }

    fn press(app: &mut App, key: KeyCode) {
        let mut keyboard = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
        keyboard.release_all();
        keyboard.clear();
        keyboard.press(key);
    }

    fn run_requests(app: &App) -> Vec<RunRequest> {
        let messages = app.world().resource::<Messages<RunRequest>>();
        messages.get_cursor().read(messages).copied().collect()
    }

    #[test]
    fn menu_overlay_spawns_and_digit_starts() {
        let mut app = create_overlay_test_app();
        assert_entity_count::<With<DespawnOnExit<RunState>>>(&mut app, 1);

        press(&mut app, KeyCode::Digit2);
        app.update();

        assert_eq!(app.world().resource::<SelectedCharacter>().0, 1);
        assert_eq!(run_requests(&app), vec![RunRequest::Start]);
    }

    #[test]
    fn escape_requests_pause_while_playing() {
        let mut app = create_overlay_test_app();
        transition_to_playing(&mut app);

        press(&mut app, KeyCode::Escape);
        app.update();

        assert!(run_requests(&app).contains(&RunRequest::Pause(PauseReason::Player)));
    }

    #[test]
    fn upgrade_overlay_lists_offer_and_digit_chooses() {
        let mut app = create_overlay_test_app();
        let defs = RunConfig::default().upgrades;
        *app.world_mut().resource_mut::<UpgradeCatalog>() = UpgradeCatalog::new(defs);
        app.world_mut().resource_mut::<PendingUpgrades>().current = Some(vec![0, 2]);
        *app.world_mut().resource_mut::<PauseReason>() = PauseReason::UpgradeChoice;
        app.world_mut()
            .resource_mut::<NextState<RunState>>()
            .set(RunState::Paused);
        app.update();
        assert_entity_count::<With<UpgradeOverlay>>(&mut app, 1);

        press(&mut app, KeyCode::Digit2);
        app.update();

        let messages = app.world().resource::<Messages<ChooseUpgrade>>();
        let chosen: Vec<ChooseUpgrade> = messages.get_cursor().read(messages).copied().collect();
        assert_eq!(chosen, vec![ChooseUpgrade(1)]);
    }

    #[test]
    fn game_over_keys_map_to_requests() {
        let mut app = create_overlay_test_app();
        app.world_mut()
            .resource_mut::<NextState<RunState>>()
            .set(RunState::GameOver);
        app.update();

        press(&mut app, KeyCode::KeyR);
        app.update();

        assert_eq!(run_requests(&app), vec![RunRequest::Restart]);
    }
}
