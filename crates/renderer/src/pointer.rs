//! Pointer position, smoothed speed, and the press/release transition.

use std::time::{Duration, Instant};

use glam::Vec2;

use crate::scene::{PerspectiveCamera, Ray, Raycaster};
use crate::tween::{Ease, TweenedValue};

pub const DEFAULT_SPEED_SMOOTHING: f32 = 0.1;
pub const DEFAULT_TRANSITION: Duration = Duration::from_millis(500);

/// Which way the press transition last moved; mirrored into the `direction` uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionDirection {
    /// Pointer went down; progress heads to 1.
    #[default]
    Press,
    /// Pointer went up; progress heads back to 0.
    Release,
}

impl TransitionDirection {
    pub fn as_uniform(self) -> f32 {
        match self {
            TransitionDirection::Press => 0.0,
            TransitionDirection::Release => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSettings {
    pub speed_smoothing: f32,
    pub transition: Duration,
    pub ease: Ease,
}

impl Default for PointerSettings {
    fn default() -> Self {
        Self {
            speed_smoothing: DEFAULT_SPEED_SMOOTHING,
            transition: DEFAULT_TRANSITION,
            ease: Ease::Power1Out,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    /// Normalised position, origin bottom-left.
    pub current: Vec2,
    pub previous: Vec2,
    pub speed: f32,
    pub smoothed_speed: f32,
}

#[derive(Debug, Clone)]
pub struct PointerTracker {
    settings: PointerSettings,
    state: PointerState,
    viewport: Vec2,
    ndc: Vec2,
    raycaster: Raycaster,
    direction: TransitionDirection,
    progress: TweenedValue,
    touches: Vec<u64>,
}

impl PointerTracker {
    pub fn new(settings: PointerSettings) -> Self {
        Self {
            settings,
            state: PointerState::default(),
            viewport: Vec2::ZERO,
            ndc: Vec2::ZERO,
            raycaster: Raycaster::default(),
            direction: TransitionDirection::default(),
            progress: TweenedValue::new(0.0, settings.ease),
            touches: Vec::new(),
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width as f32, height as f32);
    }

    /// `x`/`y` are physical pixels relative to the window's top-left corner.
    pub fn on_move(&mut self, x: f64, y: f64, camera: &PerspectiveCamera) {
        if self.viewport.x <= 0.0 || self.viewport.y <= 0.0 {
            tracing::trace!(x, y, "pointer move before first resize ignored");
            return;
        }
        let x = x as f32;
        let y = y as f32;
        self.state.current = Vec2::new(x / self.viewport.x, 1.0 - y / self.viewport.y);
        self.ndc = Vec2::new(
            2.0 * x / self.viewport.x - 1.0,
            -2.0 * y / self.viewport.y + 1.0,
        );
        self.raycaster.set_from_camera(self.ndc, camera);
    }

    /// Runs once per frame: exponential moving average of distance travelled.
    pub fn compute_speed(&mut self) -> f32 {
        let state = &mut self.state;
        state.speed = state.current.distance(state.previous);
        state.smoothed_speed += self.settings.speed_smoothing * (state.speed - state.smoothed_speed);
        state.previous = state.current;
        state.smoothed_speed
    }

    pub fn press(&mut self, now: Instant) {
        self.direction = TransitionDirection::Press;
        let interrupted = self.progress.is_animating();
        self.progress.tween_to(1.0, self.settings.transition, now);
        tracing::trace!(
            from = self.progress.value(),
            to = self.progress.target(),
            interrupted,
            "pointer pressed"
        );
    }

    pub fn release(&mut self, now: Instant) {
        self.direction = TransitionDirection::Release;
        let interrupted = self.progress.is_animating();
        self.progress.tween_to(0.0, self.settings.transition, now);
        tracing::trace!(
            from = self.progress.value(),
            to = self.progress.target(),
            interrupted,
            "pointer released"
        );
    }

    pub fn touch_started(&mut self, id: u64) {
        if !self.touches.contains(&id) {
            self.touches.push(id);
        }
    }

    pub fn touch_ended(&mut self, id: u64) {
        self.touches.retain(|active| *active != id);
    }

    pub fn active_touches(&self) -> usize {
        self.touches.len()
    }

    /// Only the oldest active touch drives the pointer position.
    pub fn is_primary_touch(&self, id: u64) -> bool {
        self.touches.first() == Some(&id)
    }

    pub fn progress(&mut self, now: Instant) -> f32 {
        self.progress.sample(now)
    }

    pub fn direction(&self) -> TransitionDirection {
        self.direction
    }

    pub fn state(&self) -> &PointerState {
        &self.state
    }

    pub fn position(&self) -> Vec2 {
        self.state.current
    }

    pub fn ndc(&self) -> Vec2 {
        self.ndc
    }

    pub fn ray(&self) -> Option<Ray> {
        self.raycaster.ray()
    }
}
