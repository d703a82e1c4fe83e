//! In-run HUD: run clock, level and XP, kill count, ability cooldowns.

use bevy::prelude::*;

use crate::gameplay::abilities::AbilityLoadout;
use crate::gameplay::death::RunStats;
use crate::gameplay::player::Player;
use crate::gameplay::progression::Progression;
use crate::run::{RunClock, RunEntity, run_start_schedules};
use crate::theme::palette;
use crate::{GameSet, gameplay_running};

const HUD_PADDING: f32 = 12.0;

#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct RunClockText;

#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct LevelText;

#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct KillsText;

#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct AbilitiesText;

/// `mm:ss`, truncating partial seconds.
#[must_use]
pub fn format_clock(secs: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = secs.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// One entry per filled slot: `[1] Dash ready` or `[2] Shockwave 1.4s`.
#[must_use]
pub fn format_abilities(loadout: &AbilityLoadout, now: f32) -> String {
    loadout
        .slots
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| slot.as_ref().map(|ability| (index, ability)))
        .map(|(index, ability)| {
            let remaining = ability.cooldown.remaining(now);
            if remaining > 0.0 {
                format!("[{}] {} {remaining:.1}s", index + 1, ability.kind.name())
            } else {
                format!("[{}] {} ready", index + 1, ability.kind.name())
            }
        })
        .collect::<Vec<_>>()
        .join("   ")
}

fn hud_text(text: impl Into<String>, color: Color) -> (Text, TextFont, TextColor) {
    (
        Text::new(text),
        TextFont::from_font_size(palette::FONT_SIZE_HUD),
        TextColor(color),
    )
}

fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        Name::new("HUD"),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(HUD_PADDING),
            left: Val::Px(HUD_PADDING),
            flex_direction: FlexDirection::Column,
            row_gap: Val::Px(4.0),
            ..default()
        },
        RunEntity,
        children![
            (Name::new("Run Clock"), RunClockText, hud_text("00:00", palette::HEADER_TEXT)),
            (Name::new("Level"), LevelText, hud_text("", palette::XP_TEXT)),
            (Name::new("Kills"), KillsText, hud_text("", palette::BODY_TEXT)),
            (Name::new("Abilities"), AbilitiesText, hud_text("", palette::BODY_TEXT)),
        ],
    ));
}

fn update_hud(
    real_time: Res<Time<Real>>,
    time: Res<Time>,
    clock: Res<RunClock>,
    progression: Res<Progression>,
    stats: Res<RunStats>,
    loadouts: Query<&AbilityLoadout, With<Player>>,
    mut clock_text: Query<
        &mut Text,
        (With<RunClockText>, Without<LevelText>, Without<KillsText>, Without<AbilitiesText>),
    >,
    mut level_text: Query<&mut Text, (With<LevelText>, Without<KillsText>, Without<AbilitiesText>)>,
    mut kills_text: Query<&mut Text, (With<KillsText>, Without<AbilitiesText>)>,
    mut abilities_text: Query<&mut Text, With<AbilitiesText>>,
) {
    for mut text in &mut clock_text {
        **text = format_clock(clock.elapsed(real_time.elapsed_secs_f64()));
    }
    for mut text in &mut level_text {
        **text = format!(
            "Lv {}  XP {}/{}",
            progression.level, progression.xp, progression.xp_to_next
        );
    }
    for mut text in &mut kills_text {
        **text = format!("Kills {}", stats.kills);
    }
    let now = time.elapsed_secs();
    for mut text in &mut abilities_text {
        **text = loadouts
            .iter()
            .next()
            .map(|loadout| format_abilities(loadout, now))
            .unwrap_or_default();
    }
}

pub(super) fn plugin(app: &mut App) {
    app.register_type::<RunClockText>()
        .register_type::<LevelText>()
        .register_type::<KillsText>()
        .register_type::<AbilitiesText>();

    for schedule in run_start_schedules() {
        app.add_systems(schedule, spawn_hud);
    }

    app.add_systems(
        Update,
        update_hud.in_set(GameSet::Ui).run_if(gameplay_running),
    );
}
