//! Reusable UI widget constructors.

use bevy::prelude::*;

use super::palette;

/// Full-screen flex container that centers its children over a dimmed backdrop.
/// Use as root for menus and overlays.
pub fn overlay_root(name: impl Into<std::borrow::Cow<'static, str>>) -> impl Bundle {
    (
        Name::new(name),
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            align_items: AlignItems::Center,
            justify_content: JustifyContent::Center,
            flex_direction: FlexDirection::Column,
            row_gap: Val::Px(16.0),
            ..default()
        },
        BackgroundColor(palette::OVERLAY_BACKGROUND),
        GlobalZIndex(1),
    )
}

/// Large header text (header size, white).
pub fn header(text: impl Into<String>) -> impl Bundle {
    (
        Text::new(text),
        TextFont::from_font_size(palette::FONT_SIZE_HEADER),
        TextColor(palette::HEADER_TEXT),
    )
}

/// Medium label text in the given color.
pub fn label(text: impl Into<String>, color: Color) -> impl Bundle {
    (
        Text::new(text),
        TextFont::from_font_size(palette::FONT_SIZE_LABEL),
        TextColor(color),
    )
}

/// Small body text (gray). Key hints and descriptions.
pub fn hint(text: impl Into<String>) -> impl Bundle {
    (
        Text::new(text),
        TextFont::from_font_size(palette::FONT_SIZE_BODY),
        TextColor(palette::BODY_TEXT),
    )
}
