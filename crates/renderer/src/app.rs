//! Application context wiring viewport, pointer, animation and scene together.
//!
//! The window runtime owns one [`AppContext`] and forwards events to it; the
//! GPU layer is reached only through [`DrawTarget`].

use std::time::Instant;

use glam::Vec2;
use winit::event::TouchPhase;

use crate::animation::{AnimationLoop, FrameScheduler, LoopState};
use crate::assets::{AssetLoad, LoadError};
use crate::pointer::PointerTracker;
use crate::scene::{OrbitControls, Scene, SceneComposer, SceneError};
use crate::types::AnimationSettings;
use crate::uniforms::ShaderUniformState;
use crate::viewport::{ViewportController, ViewportError, ViewportState};

/// Where composed frames end up.
pub trait DrawTarget {
    fn resize(&mut self, width: u32, height: u32);
    fn draw(&mut self, scene: &Scene) -> Result<(), DrawError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrawError {
    #[error("rendering context lost: {0}")]
    ContextLost(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    /// The loop is paused; nothing was drawn or scheduled.
    Skipped,
}

pub struct AppContext {
    viewport: ViewportController,
    pointer: PointerTracker,
    animation: AnimationLoop,
    orbit: OrbitControls,
    cursor: Option<Vec2>,
    dragging: bool,
    scene: Scene,
}

impl AppContext {
    /// Applies the initial sizing; `width`/`height` are the surface size in pixels.
    pub fn new(
        scene: Scene,
        settings: &AnimationSettings,
        width: u32,
        height: u32,
    ) -> Result<Self, ViewportError> {
        let mut context = Self {
            viewport: ViewportController::new(scene.camera.distance()),
            pointer: PointerTracker::new(settings.pointer_settings()),
            animation: AnimationLoop::new(settings.time_step),
            orbit: OrbitControls::from_camera(&scene.camera),
            cursor: None,
            dragging: false,
            scene,
        };
        let state = context.resize_viewport(width, height)?;
        tracing::info!(
            width,
            height,
            fov = state.fov_degrees,
            cover_x = state.cover.scale_x,
            cover_y = state.cover.scale_y,
            "scene ready"
        );
        Ok(context)
    }

    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler) {
        self.animation.start(scheduler);
    }

    pub fn handle_resize(
        &mut self,
        width: u32,
        height: u32,
        target: &mut dyn DrawTarget,
    ) -> Result<(), ViewportError> {
        self.resize_viewport(width, height)?;
        target.resize(width, height);
        Ok(())
    }

    /// Updates the `mouse` uniform and, while a button is held, orbits the camera.
    pub fn handle_pointer_move(&mut self, x: f64, y: f64) {
        let cursor = Vec2::new(x as f32, y as f32);
        if let (true, Some(previous)) = (self.dragging, self.cursor) {
            self.orbit_by(cursor - previous);
        }
        self.cursor = Some(cursor);

        self.pointer.on_move(x, y, &self.scene.camera);
        self.scene.uniforms_mut().mouse = self.pointer.position();
        if let Some(uv) = self
            .pointer
            .ray()
            .and_then(|ray| ray.intersect_plane(&self.scene.mesh))
        {
            tracing::trace!(u = uv.x, v = uv.y, "pointer over plane");
        }
    }

    pub fn handle_pointer_down(&mut self, now: Instant) {
        self.dragging = true;
        self.pointer.press(now);
        self.scene.uniforms_mut().direction = self.pointer.direction().as_uniform();
    }

    pub fn handle_pointer_up(&mut self, now: Instant) {
        self.dragging = false;
        self.pointer.release(now);
        self.scene.uniforms_mut().direction = self.pointer.direction().as_uniform();
    }

    pub fn handle_touch(&mut self, id: u64, phase: TouchPhase, x: f64, y: f64, now: Instant) {
        match phase {
            TouchPhase::Started => {
                if self.pointer.active_touches() == 0 {
                    self.cursor = Some(Vec2::new(x as f32, y as f32));
                }
                self.pointer.touch_started(id);
                self.handle_pointer_down(now);
            }
            TouchPhase::Moved => {
                if self.pointer.is_primary_touch(id) {
                    self.handle_pointer_move(x, y);
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.pointer.touch_ended(id);
                self.handle_pointer_up(now);
            }
        }
    }

    pub fn handle_visibility(&mut self, visible: bool, scheduler: &mut dyn FrameScheduler) {
        if visible {
            self.animation.play(scheduler);
        } else {
            self.animation.pause();
        }
    }

    /// One tick of the frame chain.
    pub fn frame(
        &mut self,
        now: Instant,
        target: &mut dyn DrawTarget,
        scheduler: &mut dyn FrameScheduler,
    ) -> Result<FrameOutcome, DrawError> {
        let Some(time) = self.animation.begin_frame() else {
            return Ok(FrameOutcome::Skipped);
        };

        let speed = self.pointer.compute_speed();
        let progress = self.pointer.progress(now);
        let direction = self.pointer.direction().as_uniform();
        let mouse = self.pointer.position();

        let uniforms = self.scene.uniforms_mut();
        uniforms.time = time as f32;
        uniforms.mouse_speed = speed;
        uniforms.set_progress(progress);
        uniforms.direction = direction;
        uniforms.mouse = mouse;

        target.draw(&self.scene)?;
        self.animation.schedule_next(scheduler);
        Ok(FrameOutcome::Rendered)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn uniforms(&self) -> &ShaderUniformState {
        self.scene.uniforms()
    }

    pub fn pointer(&self) -> &PointerTracker {
        &self.pointer
    }

    pub fn animation(&self) -> &AnimationLoop {
        &self.animation
    }

    pub fn loop_state(&self) -> LoopState {
        self.animation.state()
    }

    pub fn viewport(&self) -> Option<&ViewportState> {
        self.viewport.current()
    }

    pub fn orbit(&self) -> &OrbitControls {
        &self.orbit
    }

    fn orbit_by(&mut self, delta: Vec2) {
        let Some(height) = self.viewport.current().map(|state| state.height as f32) else {
            return;
        };
        self.orbit.rotate(delta, height);
        self.orbit.apply(&mut self.scene.camera);
        tracing::trace!(
            azimuth = self.orbit.azimuth(),
            polar = self.orbit.polar(),
            "camera orbited"
        );
    }

    fn resize_viewport(&mut self, width: u32, height: u32) -> Result<ViewportState, ViewportError> {
        let image_aspect = self.scene.uniforms().texture.aspect();
        let state = self.viewport.resize(width, height, image_aspect)?;
        self.scene.camera.apply_viewport(&state);
        self.scene.mesh.scale = state.plane_scale.extend(1.0);
        self.scene.uniforms_mut().resolution = state.resolution().into();
        self.pointer.set_viewport(width, height);
        let visible = self.scene.camera.view_size();
        tracing::debug!(
            width,
            height,
            visible_width = visible.x,
            visible_height = visible.y,
            "viewport resized"
        );
        Ok(state)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Holds scene construction back until every asset has loaded.
pub struct StartupGate {
    load: Option<AssetLoad>,
    composer: SceneComposer,
}

impl StartupGate {
    pub fn new(load: AssetLoad, composer: SceneComposer) -> Self {
        Self {
            load: Some(load),
            composer,
        }
    }

    /// Yields the composed scene once; a failed load never composes anything.
    pub fn poll(&mut self) -> Result<Option<Scene>, StartupError> {
        let Some(load) = self.load.as_mut() else {
            return Ok(None);
        };
        let polled = load.poll();
        let assets = match polled {
            Ok(Some(assets)) => assets,
            Ok(None) => return Ok(None),
            Err(err) => {
                self.load = None;
                return Err(err.into());
            }
        };
        self.load = None;
        Ok(Some(self.composer.compose(&assets)?))
    }

    /// Loading progress in `[0, 1]`; 1 once the gate has opened.
    pub fn progress(&self) -> f32 {
        self.load.as_ref().map(AssetLoad::fraction).unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use crossbeam_channel::{unbounded, Sender};

    use super::*;
    use crate::animation::ManualScheduler;
    use crate::assets::{AssetManifest, LoadEvent, LoadedImage};
    use crate::scene::{CameraSettings, ShaderSources};

    #[derive(Default)]
    struct RecordingTarget {
        draws: Vec<f32>,
        resizes: Vec<(u32, u32)>,
        fail_with: Option<DrawError>,
    }

    impl DrawTarget for RecordingTarget {
        fn resize(&mut self, width: u32, height: u32) {
            self.resizes.push((width, height));
        }

        fn draw(&mut self, scene: &Scene) -> Result<(), DrawError> {
            if let Some(err) = self.fail_with.clone() {
                return Err(err);
            }
            self.draws.push(scene.uniforms().time);
            Ok(())
        }
    }

    fn composer() -> SceneComposer {
        SceneComposer::new(
            ShaderSources {
                vertex: String::new(),
                fragment: String::new(),
            },
            CameraSettings::default(),
        )
    }

    fn gate(manifest: &AssetManifest) -> (StartupGate, Sender<LoadEvent>) {
        let (tx, rx) = unbounded();
        (StartupGate::new(AssetLoad::new(manifest, rx), composer()), tx)
    }

    fn hobbiton() -> LoadedImage {
        LoadedImage::from_rgba(16, 9, vec![0; 16 * 9 * 4])
    }

    fn context(width: u32, height: u32) -> AppContext {
        let manifest = AssetManifest::new().with_image("hobbiton", "hobbiton.jpg");
        let (mut gate, tx) = gate(&manifest);
        tx.send(LoadEvent::Loaded {
            key: "hobbiton".into(),
            image: hobbiton(),
        })
        .unwrap();
        let scene = gate.poll().unwrap().expect("scene composed");
        AppContext::new(scene, &AnimationSettings::default(), width, height).unwrap()
    }

    fn tick(
        app: &mut AppContext,
        target: &mut RecordingTarget,
        scheduler: &mut ManualScheduler,
        now: Instant,
    ) -> FrameOutcome {
        assert!(scheduler.take(), "no frame was requested");
        app.frame(now, target, scheduler).unwrap()
    }

    #[test]
    fn gate_waits_for_every_asset() {
        let manifest = AssetManifest::new()
            .with_image("a", "a.png")
            .with_image("b", "b.png");
        let (mut gate, tx) = gate(&manifest);
        tx.send(LoadEvent::Loaded {
            key: "a".into(),
            image: hobbiton(),
        })
        .unwrap();
        assert!(gate.poll().unwrap().is_none());
        assert_eq!(gate.progress(), 0.5);

        tx.send(LoadEvent::Loaded {
            key: "b".into(),
            image: hobbiton(),
        })
        .unwrap();
        assert!(gate.poll().unwrap().is_some());
        assert_eq!(gate.progress(), 1.0);
        assert!(gate.poll().unwrap().is_none());
    }

    #[test]
    fn failed_load_never_composes_a_scene() {
        let manifest = AssetManifest::new().with_image("hobbiton", "missing.jpg");
        let (mut gate, tx) = gate(&manifest);
        tx.send(LoadEvent::Failed {
            locator: PathBuf::from("missing.jpg"),
            reason: "No such file".into(),
        })
        .unwrap();

        match gate.poll() {
            Err(StartupError::Load(err)) => {
                assert!(err.to_string().contains("missing.jpg"));
            }
            other => panic!("expected load error, got {other:?}"),
        }
        assert!(gate.poll().unwrap().is_none());
    }

    #[test]
    fn initial_sizing_applies_cover_fit() {
        let app = context(800, 600);
        let resolution = app.uniforms().resolution;
        assert_eq!(resolution.x, 800.0);
        assert_eq!(resolution.y, 600.0);
        assert!((resolution.z - 0.75).abs() < 1e-5);
        assert_eq!(resolution.w, 1.0);
        assert!((app.scene().mesh.scale.x - 800.0 / 600.0).abs() < 1e-5);
        assert_eq!(app.scene().mesh.scale.y, 1.0);
    }

    #[test]
    fn resize_reaches_draw_target() {
        let mut app = context(800, 600);
        let mut target = RecordingTarget::default();
        app.handle_resize(600, 1200, &mut target).unwrap();
        assert_eq!(target.resizes, vec![(600, 1200)]);
        assert_eq!(app.scene().mesh.scale.x, 1.0);
        assert!((app.scene().mesh.scale.y - 2.0).abs() < 1e-5);

        assert!(app.handle_resize(0, 600, &mut target).is_err());
        assert_eq!(target.resizes.len(), 1);
    }

    #[test]
    fn frames_push_time_and_speed() {
        let mut app = context(800, 600);
        let mut target = RecordingTarget::default();
        let mut scheduler = ManualScheduler::new();
        let now = Instant::now();
        app.start(&mut scheduler);

        app.handle_pointer_move(800.0, 0.0);
        tick(&mut app, &mut target, &mut scheduler, now);
        tick(&mut app, &mut target, &mut scheduler, now);

        assert_eq!(target.draws.len(), 2);
        assert!((target.draws[1] - 0.1).abs() < 1e-6);
        let expected = 0.1 * 2.0_f32.sqrt() * 0.9;
        assert!((app.uniforms().mouse_speed - expected).abs() < 1e-6);
        assert_eq!(app.uniforms().mouse, glam::Vec2::new(1.0, 1.0));
    }

    #[test]
    fn hidden_then_visible_resumes_without_catch_up() {
        let mut app = context(800, 600);
        let mut target = RecordingTarget::default();
        let mut scheduler = ManualScheduler::new();
        let now = Instant::now();
        app.start(&mut scheduler);

        for _ in 0..3 {
            tick(&mut app, &mut target, &mut scheduler, now);
        }
        app.handle_visibility(false, &mut scheduler);
        assert_eq!(
            tick(&mut app, &mut target, &mut scheduler, now),
            FrameOutcome::Skipped
        );
        assert_eq!(scheduler.requests(), 0);
        assert_eq!(app.loop_state(), LoopState::Paused);

        app.handle_visibility(true, &mut scheduler);
        tick(&mut app, &mut target, &mut scheduler, now);

        assert_eq!(target.draws.len(), 4);
        assert!((app.uniforms().time - 0.2).abs() < 1e-6);
    }

    #[test]
    fn press_then_release_settles_at_zero() {
        let mut app = context(800, 600);
        let mut target = RecordingTarget::default();
        let mut scheduler = ManualScheduler::new();
        let start = Instant::now();
        app.start(&mut scheduler);

        app.handle_pointer_down(start);
        assert_eq!(app.uniforms().direction, 0.0);
        app.handle_pointer_up(start + Duration::from_millis(100));
        assert_eq!(app.uniforms().direction, 1.0);

        tick(&mut app, &mut target, &mut scheduler, start + Duration::from_secs(1));
        assert_eq!(app.uniforms().progress(), 0.0);
        assert_eq!(app.uniforms().direction, 1.0);
    }

    #[test]
    fn touch_lifecycle_maps_to_pointer_events() {
        let mut app = context(800, 600);
        let now = Instant::now();

        app.handle_touch(1, TouchPhase::Started, 400.0, 300.0, now);
        assert_eq!(app.uniforms().direction, 0.0);
        app.handle_touch(1, TouchPhase::Moved, 400.0, 300.0, now);
        assert_eq!(app.pointer().position(), glam::Vec2::new(0.5, 0.5));
        app.handle_touch(2, TouchPhase::Started, 0.0, 0.0, now);
        app.handle_touch(2, TouchPhase::Moved, 0.0, 0.0, now);
        assert_eq!(app.pointer().position(), glam::Vec2::new(0.5, 0.5));

        app.handle_touch(1, TouchPhase::Cancelled, 400.0, 300.0, now);
        assert_eq!(app.uniforms().direction, 1.0);
    }

    #[test]
    fn drag_orbits_camera_at_fixed_distance() {
        let mut app = context(800, 600);
        let now = Instant::now();
        let start = app.scene().camera.position();
        let fov = app.scene().camera.fov_degrees();

        app.handle_pointer_move(400.0, 300.0);
        app.handle_pointer_move(450.0, 320.0);
        assert_eq!(app.scene().camera.position(), start);

        app.handle_pointer_down(now);
        app.handle_pointer_move(550.0, 320.0);
        app.handle_pointer_up(now);
        let orbited = app.scene().camera.position();
        assert!((orbited - start).length() > 0.1, "{orbited:?}");
        assert!((app.scene().camera.distance() - 2.0).abs() < 1e-4);

        app.handle_pointer_move(700.0, 100.0);
        assert_eq!(app.scene().camera.position(), orbited);

        let mut target = RecordingTarget::default();
        app.handle_resize(1024, 768, &mut target).unwrap();
        assert_eq!(app.scene().camera.position(), orbited);
        assert_eq!(app.scene().camera.fov_degrees(), fov);
    }

    #[test]
    fn touch_drag_starts_from_the_touch_point() {
        let mut app = context(800, 600);
        let now = Instant::now();
        app.handle_pointer_move(0.0, 0.0);
        let azimuth = app.orbit().azimuth();
        let polar = app.orbit().polar();

        app.handle_touch(7, TouchPhase::Started, 400.0, 300.0, now);
        app.handle_touch(7, TouchPhase::Moved, 400.0, 360.0, now);

        assert_eq!(app.orbit().azimuth(), azimuth);
        assert!(app.orbit().polar() < polar);
        assert!((app.scene().camera.distance() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn draw_failure_halts_the_chain() {
        let mut app = context(800, 600);
        let mut target = RecordingTarget {
            fail_with: Some(DrawError::ContextLost("device removed".into())),
            ..RecordingTarget::default()
        };
        let mut scheduler = ManualScheduler::new();
        app.start(&mut scheduler);
        assert!(scheduler.take());

        let err = app
            .frame(Instant::now(), &mut target, &mut scheduler)
            .unwrap_err();
        assert_eq!(err, DrawError::ContextLost("device removed".into()));
        assert_eq!(scheduler.requests(), 0);
    }
}
