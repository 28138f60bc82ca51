use tilewalk_engine::{InputAction, InputSnapshot, Rect, TransitionTarget};
use tracing::info;

use super::setup::World;

pub(crate) const TINT_OPAQUE: f32 = 255.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TintMode {
    Tinting,
    Untinting,
}

/// Full-screen fade. `progress` is the overlay opacity in `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TintOverlay {
    mode: TintMode,
    progress: f32,
    speed: f32,
}

impl TintOverlay {
    pub(crate) fn new(speed: f32) -> Self {
        Self {
            mode: TintMode::Untinting,
            progress: 0.0,
            speed,
        }
    }

    pub(crate) fn mode(&self) -> TintMode {
        self.mode
    }

    pub(crate) fn progress(&self) -> f32 {
        self.progress
    }

    pub(crate) fn alpha(&self) -> u8 {
        self.progress.round().clamp(0.0, TINT_OPAQUE) as u8
    }

    fn set_mode(&mut self, mode: TintMode) {
        self.mode = mode;
    }

    /// Moves `progress` toward the end of the current mode.
    fn tick(&mut self, dt: f32) {
        let step = self.speed * dt.max(0.0);
        let next = match self.mode {
            TintMode::Tinting => self.progress + step,
            TintMode::Untinting => self.progress - step,
        };
        self.progress = next.clamp(0.0, TINT_OPAQUE);
    }

    fn is_opaque(&self) -> bool {
        self.progress >= TINT_OPAQUE
    }

    fn is_clear(&self) -> bool {
        self.progress <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TransitionPhase {
    Idle,
    AwaitingConfirmation {
        area: Rect,
        target: TransitionTarget,
    },
    /// `target` is taken exactly once, when the fade turns opaque.
    Tinting { target: Option<TransitionTarget> },
    Untinting,
}

/// Zone prompt, fade out, map swap and fade in.
#[derive(Debug, Clone)]
pub(crate) struct TransitionMachine {
    phase: TransitionPhase,
    tint: TintOverlay,
    /// Zone the player declined or arrived in; ignored until they leave it.
    latched: Option<Rect>,
}

impl TransitionMachine {
    pub(crate) fn new(tint_speed: f32) -> Self {
        Self {
            phase: TransitionPhase::Idle,
            tint: TintOverlay::new(tint_speed),
            latched: None,
        }
    }

    pub(crate) fn phase(&self) -> &TransitionPhase {
        &self.phase
    }

    pub(crate) fn tint(&self) -> &TintOverlay {
        &self.tint
    }

    pub(crate) fn is_awaiting_confirmation(&self) -> bool {
        matches!(self.phase, TransitionPhase::AwaitingConfirmation { .. })
    }

    /// Zone detection and the confirm/decline decision. Runs before the
    /// player moves so a prompt blocks movement on the same tick.
    pub(crate) fn check(&mut self, input: &InputSnapshot, world: &mut World) {
        let Some(hitbox) = world.player_hitbox() else {
            return;
        };
        if self
            .latched
            .is_some_and(|area| !area.intersects(&hitbox))
        {
            self.latched = None;
        }

        match &self.phase {
            TransitionPhase::Idle => {
                if world.player.is_blocked() {
                    return;
                }
                let Some(zone) = world.collisions.transition_zone_at(&hitbox) else {
                    return;
                };
                let (area, target) = (zone.area, zone.target.clone());
                if self.latched == Some(area) {
                    // A declined door still takes confirm while the player stands in it.
                    if input.was_pressed(InputAction::Confirm) {
                        world.player.block();
                        self.start(target);
                    }
                    return;
                }
                info!(
                    map = %world.map_name,
                    target_map = %target.map,
                    target_spawn = %target.spawn,
                    "transition_prompted"
                );
                self.phase = TransitionPhase::AwaitingConfirmation { area, target };
                world.player.block();
            }
            TransitionPhase::AwaitingConfirmation { area, target } => {
                if input.was_pressed(InputAction::Confirm) {
                    let target = target.clone();
                    self.start(target);
                } else if input.any_directional_pressed() {
                    info!(target_map = %target.map, "transition_declined");
                    self.latched = Some(*area);
                    self.phase = TransitionPhase::Idle;
                    world.player.unblock();
                }
            }
            TransitionPhase::Tinting { .. } | TransitionPhase::Untinting => {}
        }
    }

    fn start(&mut self, target: TransitionTarget) {
        info!(
            target_map = %target.map,
            target_spawn = %target.spawn,
            "transition_started"
        );
        self.latched = None;
        self.phase = TransitionPhase::Tinting {
            target: Some(target),
        };
        self.tint.set_mode(TintMode::Tinting);
    }

    /// Advances the fade. Returns the destination once, on the tick the
    /// overlay becomes opaque.
    pub(crate) fn tick(&mut self, dt: f32) -> Option<TransitionTarget> {
        match &mut self.phase {
            TransitionPhase::Tinting { target } => {
                self.tint.tick(dt);
                if self.tint.is_opaque() {
                    target.take()
                } else {
                    None
                }
            }
            TransitionPhase::Untinting => {
                self.tint.tick(dt);
                if self.tint.is_clear() {
                    self.phase = TransitionPhase::Idle;
                }
                None
            }
            TransitionPhase::Idle | TransitionPhase::AwaitingConfirmation { .. } => None,
        }
    }

    /// Called once the destination world has been swapped in. `arrival` is
    /// the zone the new player stands in, if any, so it does not prompt
    /// straight away.
    pub(crate) fn complete_reload(&mut self, arrival: Option<Rect>) {
        self.phase = TransitionPhase::Untinting;
        self.tint.set_mode(TintMode::Untinting);
        self.latched = arrival;
    }
}
