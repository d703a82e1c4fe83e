//! Cooldown gate shared by weapons and abilities.
//!
//! A cast is allowed once `now >= next_ready`. The effect may veto itself
//! (no target, no direction); a veto leaves the gate untouched so the next
//! frame can try again. Times are seconds of `Time<Virtual>`, which stops
//! while the run is paused.

use bevy::prelude::*;

/// Floor for cooldown multipliers. Keeps a zero multiplier from meaning "fire every frame".
pub const COOLDOWN_MULTIPLIER_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct Cooldown {
    /// Base cooldown in seconds.
    pub duration: f32,
    /// Per-caster scalar on `duration`, clamped to [`COOLDOWN_MULTIPLIER_EPSILON`].
    pub multiplier: f32,
    next_ready: f32,
}

impl Cooldown {
    #[must_use]
    pub const fn new(duration: f32) -> Self {
        Self {
            duration,
            multiplier: 1.0,
            next_ready: 0.0,
        }
    }

    /// Cooldown length after applying the clamped multiplier.
    #[must_use]
    pub fn effective_duration(&self) -> f32 {
        self.duration * self.multiplier.max(COOLDOWN_MULTIPLIER_EPSILON)
    }

    #[must_use]
    pub fn is_ready(&self, now: f32) -> bool {
        now >= self.next_ready
    }

    /// Marks the gate as used at `now`.
    pub fn start(&mut self, now: f32) {
        self.next_ready = now + self.effective_duration();
    }

    /// Runs `effect` if the gate is open. Only a `Some` result consumes the cooldown.
    pub fn try_cast<T>(&mut self, now: f32, effect: impl FnOnce() -> Option<T>) -> Option<T> {
        if !self.is_ready(now) {
            return None;
        }
        let outcome = effect()?;
        self.start(now);
        Some(outcome)
    }

    /// Seconds until the gate opens again.
    #[must_use]
    pub fn remaining(&self, now: f32) -> f32 {
        (self.next_ready - now).max(0.0)
    }

    /// 0.0 when ready, 1.0 right after a cast.
    #[must_use]
    pub fn fraction(&self, now: f32) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (self.remaining(now) / self.effective_duration()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn second_cast_inside_cooldown_is_rejected() {
        let mut cooldown = Cooldown::new(5.0);
        assert_eq!(cooldown.try_cast(0.0, || Some(())), Some(()));
        assert_eq!(cooldown.try_cast(4.99, || Some(())), None);
        assert_eq!(cooldown.try_cast(5.0, || Some(())), Some(()));
    }

    #[test]
    fn vetoed_cast_does_not_consume_cooldown() {
        let mut cooldown = Cooldown::new(5.0);
        assert_eq!(cooldown.try_cast::<()>(0.0, || None), None);
        assert_eq!(cooldown.try_cast(0.01, || Some(())), Some(()));
    }

    #[test]
    fn effect_not_run_while_cooling_down() {
        let mut cooldown = Cooldown::new(1.0);
        cooldown.start(0.0);
        let mut ran = false;
        let _ = cooldown.try_cast(0.5, || {
            ran = true;
            Some(())
        });
        assert!(!ran);
    }

    #[test]
    fn multiplier_scales_duration() {
        let mut cooldown = Cooldown::new(4.0);
        cooldown.multiplier = 0.5;
        cooldown.start(10.0);
        assert!(!cooldown.is_ready(11.9));
        assert!(cooldown.is_ready(12.0));
    }

    #[test]
    fn zero_multiplier_is_clamped() {
        let mut cooldown = Cooldown::new(2.0);
        cooldown.multiplier = 0.0;
        cooldown.start(0.0);
        assert!((cooldown.effective_duration() - 0.02).abs() < 1e-6);
        assert!(!cooldown.is_ready(0.01));
    }

    #[test]
    fn remaining_and_fraction_are_derived() {
        let mut cooldown = Cooldown::new(4.0);
        assert_eq!(cooldown.remaining(0.0), 0.0);
        assert_eq!(cooldown.fraction(0.0), 0.0);

        cooldown.start(0.0);
        assert_eq!(cooldown.fraction(0.0), 1.0);
        assert!((cooldown.remaining(1.0) - 3.0).abs() < 1e-6);
        assert!((cooldown.fraction(3.0) - 0.25).abs() < 1e-6);
        assert_eq!(cooldown.fraction(9.0), 0.0);
    }

    #[test]
    fn zero_duration_reports_ready() {
        let cooldown = Cooldown::new(0.0);
        assert_eq!(cooldown.fraction(0.0), 0.0);
        assert!(cooldown.is_ready(0.0));
    }
}
