/// Default time added per rendered frame.
pub const DEFAULT_TIME_STEP: f64 = 0.05;

/// Asks the host to deliver one more frame callback.
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Paused,
}

/// Fixed-step frame clock with a pause gate.
///
/// Time advances by a constant step per rendered frame regardless of wall
/// clock, so frames that never ran are never caught up.
#[derive(Debug, Clone)]
pub struct AnimationLoop {
    state: LoopState,
    time: f64,
    time_step: f64,
    frames: u64,
    frame_pending: bool,
}

impl AnimationLoop {
    pub fn new(time_step: f64) -> Self {
        Self {
            state: LoopState::Running,
            time: 0.0,
            time_step,
            frames: 0,
            frame_pending: false,
        }
    }

    /// Kicks off the frame chain.
    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.state == LoopState::Running {
            self.request(scheduler);
        }
    }

    /// Returns `true` when the state actually changed.
    pub fn pause(&mut self) -> bool {
        if self.state == LoopState::Paused {
            return false;
        }
        self.state = LoopState::Paused;
        tracing::debug!(time = self.time, frames = self.frames, "animation paused");
        true
    }

    /// Resumes and re-arms the frame chain unless a frame is already queued.
    pub fn play(&mut self, scheduler: &mut dyn FrameScheduler) -> bool {
        if self.state == LoopState::Running {
            return false;
        }
        self.state = LoopState::Running;
        tracing::debug!(time = self.time, "animation resumed");
        self.request(scheduler);
        true
    }

    /// Consumes the pending frame. Returns the new time, or `None` when paused.
    pub fn begin_frame(&mut self) -> Option<f64> {
        self.frame_pending = false;
        if self.state == LoopState::Paused {
            return None;
        }
        self.time += self.time_step;
        self.frames += 1;
        Some(self.time)
    }

    pub fn schedule_next(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.state == LoopState::Running {
            self.request(scheduler);
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_frame_pending(&self) -> bool {
        self.frame_pending
    }

    fn request(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.frame_pending {
            return;
        }
        self.frame_pending = true;
        scheduler.request_frame();
    }
}

impl Default for AnimationLoop {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_STEP)
    }
}

/// Scheduler that only counts requests; the caller decides when frames run.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    requests: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one outstanding request, if any.
    pub fn take(&mut self) -> bool {
        if self.requests == 0 {
            return false;
        }
        self.requests -= 1;
        true
    }

    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) {
        self.requests += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frames(animation: &mut AnimationLoop, scheduler: &mut ManualScheduler, n: usize) {
        for _ in 0..n {
            assert!(scheduler.take(), "frame chain broke");
            animation.begin_frame();
            animation.schedule_next(scheduler);
        }
    }

    #[test]
    fn time_advances_by_fixed_step() {
        let mut scheduler = ManualScheduler::new();
        let mut animation = AnimationLoop::default();
        animation.start(&mut scheduler);
        run_frames(&mut animation, &mut scheduler, 3);

        assert!((animation.time() - 0.15).abs() < 1e-6);
        assert_eq!(animation.frames(), 3);
        assert_eq!(scheduler.requests(), 1);
    }

    #[test]
    fn paused_frame_does_not_reschedule() {
        let mut scheduler = ManualScheduler::new();
        let mut animation = AnimationLoop::default();
        animation.start(&mut scheduler);
        run_frames(&mut animation, &mut scheduler, 2);

        assert!(animation.pause());
        assert!(!animation.pause());
        assert!(scheduler.take());
        assert_eq!(animation.begin_frame(), None);
        animation.schedule_next(&mut scheduler);
        assert_eq!(scheduler.requests(), 0);
        assert!((animation.time() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn play_restarts_chain_without_catch_up() {
        let mut scheduler = ManualScheduler::new();
        let mut animation = AnimationLoop::default();
        animation.start(&mut scheduler);
        run_frames(&mut animation, &mut scheduler, 2);

        animation.pause();
        scheduler.take();
        animation.begin_frame();
        assert!(animation.play(&mut scheduler));
        assert_eq!(scheduler.requests(), 1);

        run_frames(&mut animation, &mut scheduler, 1);
        assert!((animation.time() - 0.15).abs() < 1e-6);
    }

    #[test]
    fn play_with_pending_frame_does_not_double_request() {
        let mut scheduler = ManualScheduler::new();
        let mut animation = AnimationLoop::default();
        animation.start(&mut scheduler);
        animation.pause();
        animation.play(&mut scheduler);
        assert_eq!(scheduler.requests(), 1);
        assert!(animation.is_frame_pending());
    }

    #[test]
    fn step_stays_exact_over_a_day_of_frames() {
        let mut animation = AnimationLoop::default();
        let frames = 24 * 60 * 60 * 60;
        let mut previous = 0.0;
        let mut last_step = 0.0;
        for _ in 0..frames {
            let time = animation.begin_frame().unwrap();
            last_step = time - previous;
            previous = time;
        }

        let expected = frames as f64 * DEFAULT_TIME_STEP;
        assert!((last_step - DEFAULT_TIME_STEP).abs() < 1e-9, "{last_step}");
        assert!((animation.time() - expected).abs() / expected < 1e-9);
        assert_eq!(animation.frames(), frames);
    }

    #[test]
    fn play_while_running_is_a_no_op() {
        let mut scheduler = ManualScheduler::new();
        let mut animation = AnimationLoop::new(0.1);
        assert!(!animation.play(&mut scheduler));
        assert_eq!(scheduler.requests(), 0);
    }
}
