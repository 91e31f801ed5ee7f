use std::time::{Duration, Instant};

/// Easing curve applied to the normalised progress of a tween.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ease {
    Linear,
    Smoothstep,
    EaseInOut,
    /// Quadratic ease-out; fast start, gentle landing.
    #[default]
    Power1Out,
}

impl Ease {
    pub fn sample(self, t: f32) -> f32 {
        let clamped = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => clamped,
            Ease::Smoothstep => clamped * clamped * (3.0 - 2.0 * clamped),
            Ease::EaseInOut => {
                if clamped < 0.5 {
                    2.0 * clamped * clamped
                } else {
                    -1.0 + (4.0 - 2.0 * clamped) * clamped
                }
            }
            Ease::Power1Out => {
                let inverse = 1.0 - clamped;
                1.0 - inverse * inverse
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Tween {
    from: f32,
    to: f32,
    start: Instant,
    duration: Duration,
    ease: Ease,
}

impl Tween {
    fn sample(&self, now: Instant) -> (f32, bool) {
        let elapsed = now.saturating_duration_since(self.start);
        let progress = elapsed.as_secs_f32() / self.duration.as_secs_f32().max(f32::EPSILON);
        let mix = self.ease.sample(progress);
        let value = self.from + (self.to - self.from) * mix;
        (value, progress >= 1.0)
    }
}

/// A scalar that moves toward its target over wall-clock time.
///
/// Only one tween is ever in flight: retargeting replaces the active tween and
/// starts the new one from wherever the value currently is.
#[derive(Debug, Clone)]
pub struct TweenedValue {
    value: f32,
    ease: Ease,
    active: Option<Tween>,
}

impl TweenedValue {
    pub fn new(value: f32, ease: Ease) -> Self {
        Self {
            value,
            ease,
            active: None,
        }
    }

    pub fn tween_to(&mut self, target: f32, duration: Duration, now: Instant) {
        let from = self.sample(now);
        if duration.is_zero() {
            self.value = target;
            self.active = None;
            return;
        }
        self.active = Some(Tween {
            from,
            to: target,
            start: now,
            duration,
            ease: self.ease,
        });
    }

    /// Advances the active tween to `now` and returns the current value.
    pub fn sample(&mut self, now: Instant) -> f32 {
        if let Some(tween) = self.active {
            let (value, finished) = tween.sample(now);
            self.value = value;
            if finished {
                self.value = tween.to;
                self.active = None;
            }
        }
        self.value
    }

    /// Last sampled value; does not advance time.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Value the tween settles on once finished.
    pub fn target(&self) -> f32 {
        self.active.map(|tween| tween.to).unwrap_or(self.value)
    }

    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }
}
