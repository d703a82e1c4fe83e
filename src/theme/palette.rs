//! Color constants and font size tokens.

use bevy::prelude::*;

// === Text Colors ===

/// Header/title text color (white).
pub const HEADER_TEXT: Color = Color::WHITE;

/// Body/subtitle text color (light gray).
pub const BODY_TEXT: Color = Color::srgb(0.7, 0.7, 0.7);

/// Level and XP readout.
pub const XP_TEXT: Color = Color::srgb(0.55, 0.85, 1.0);

/// Highlighted choice text (upgrade titles, selected character).
pub const ACCENT_TEXT: Color = Color::srgb(1.0, 0.85, 0.0);

// === UI Backgrounds ===

/// Semi-transparent dark overlay for pause/modal screens.
pub const OVERLAY_BACKGROUND: Color = Color::srgba(0.0, 0.0, 0.0, 0.7);

// === Arena Colors ===

pub const BACKGROUND: Color = Color::srgb(0.1, 0.1, 0.12);
pub const OBSTACLE: Color = Color::srgb(0.35, 0.33, 0.3);
pub const ARENA_WALL: Color = Color::srgb(0.22, 0.22, 0.26);

// === Entity Colors ===

pub const PLAYER: Color = Color::srgb(0.2, 0.8, 0.2);
pub const ENEMY: Color = Color::srgb(0.8, 0.2, 0.2);
pub const XP_ORB: Color = Color::srgb(0.3, 0.75, 1.0);

// === Health Bar Colors ===

pub const HEALTH_BAR_BG: Color = Color::srgb(0.8, 0.1, 0.1);
pub const HEALTH_BAR_FILL: Color = Color::srgb(0.1, 0.9, 0.1);

// === Font Size Tokens ===

pub const FONT_SIZE_HEADER: f32 = 64.0;
pub const FONT_SIZE_LABEL: f32 = 32.0;
pub const FONT_SIZE_HUD: f32 = 22.0;
pub const FONT_SIZE_BODY: f32 = 18.0;
