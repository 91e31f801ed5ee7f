use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::animation::FrameScheduler;
use crate::app::{AppContext, StartupGate};
use crate::assets::AssetLoader;
use crate::gpu::GpuState;
use crate::scene::{Scene, SceneComposer, ShaderSources};
use crate::types::RendererConfig;

/// How often the loading gate is polled while assets decode.
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Frame requests become winit redraw requests.
struct WindowScheduler {
    window: Arc<Window>,
}

impl FrameScheduler for WindowScheduler {
    fn request_frame(&mut self) {
        self.window.request_redraw();
    }
}

enum Phase {
    Loading { gate: StartupGate, shown_percent: u32 },
    Running { app: AppContext, gpu: GpuState },
}

pub(crate) fn run_window(
    config: &RendererConfig,
    shaders: ShaderSources,
    loader: &dyn AssetLoader,
) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(loading_title(&config.title, 0))
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let composer = SceneComposer::new(shaders, config.camera)
        .with_clear_color(config.clear_color)
        .with_texture_key(config.texture_key.clone());
    let mut phase = Phase::Loading {
        gate: StartupGate::new(loader.load(&config.assets), composer),
        shown_percent: 0,
    };
    let mut scheduler = WindowScheduler {
        window: window.clone(),
    };
    let mut failure: Option<anyhow::Error> = None;

    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => {
            if matches!(event, WindowEvent::CloseRequested | WindowEvent::Destroyed) {
                info!("window closed");
                elwt.exit();
                return;
            }
            if let Phase::Running { app, gpu } = &mut phase {
                if let Err(err) = handle_window_event(app, gpu, &mut scheduler, event) {
                    failure = Some(err);
                    elwt.exit();
                }
            }
        }
        Event::AboutToWait => {
            let polled = match &mut phase {
                Phase::Loading {
                    gate,
                    shown_percent,
                } => {
                    let polled = gate.poll();
                    let percent = (gate.progress() * 100.0).round() as u32;
                    if percent != *shown_percent {
                        *shown_percent = percent;
                        debug!(percent, "asset loading progress");
                        window.set_title(&loading_title(&config.title, percent));
                    }
                    Some(polled)
                }
                Phase::Running { .. } => None,
            };

            match polled {
                Some(Ok(Some(scene))) => match start_scene(&window, scene, config, &mut scheduler) {
                    Ok(running) => {
                        phase = running;
                        window.set_title(&config.title);
                        elwt.set_control_flow(ControlFlow::Wait);
                    }
                    Err(err) => {
                        failure = Some(err);
                        elwt.exit();
                    }
                },
                Some(Ok(None)) => {
                    elwt.set_control_flow(ControlFlow::WaitUntil(Instant::now() + LOAD_POLL_INTERVAL));
                }
                Some(Err(err)) => {
                    failure = Some(anyhow::Error::new(err).context("failed to prepare scene"));
                    elwt.exit();
                }
                None => elwt.set_control_flow(ControlFlow::Wait),
            }
        }
        _ => {}
    });

    if let Some(err) = failure {
        return Err(err);
    }
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

fn start_scene(
    window: &Arc<Window>,
    scene: Scene,
    config: &RendererConfig,
    scheduler: &mut WindowScheduler,
) -> Result<Phase> {
    let gpu = GpuState::new(
        window.as_ref(),
        window.inner_size(),
        &scene,
        config.antialiasing,
        config.color_space,
        config.power_preference,
    )
    .context("failed to initialise GPU renderer")?;

    let profile = gpu.adapter_profile();
    if profile.is_software() {
        warn!(
            adapter = %profile.name,
            backend = ?profile.backend,
            "software rasterizer detected; expect a low frame rate"
        );
    }

    let size = gpu.size();
    let mut app = AppContext::new(scene, &config.animation, size.width, size.height)
        .context("failed to size the scene")?;
    app.start(scheduler);
    Ok(Phase::Running { app, gpu })
}

fn handle_window_event(
    app: &mut AppContext,
    gpu: &mut GpuState,
    scheduler: &mut WindowScheduler,
    event: WindowEvent,
) -> Result<()> {
    match event {
        WindowEvent::Resized(size) => {
            if let Err(err) = app.handle_resize(size.width, size.height, gpu) {
                debug!(%err, "skipping resize");
            }
        }
        WindowEvent::CursorMoved { position, .. } => {
            app.handle_pointer_move(position.x, position.y);
        }
        WindowEvent::MouseInput { state, .. } => match state {
            ElementState::Pressed => app.handle_pointer_down(Instant::now()),
            ElementState::Released => app.handle_pointer_up(Instant::now()),
        },
        WindowEvent::Touch(touch) => {
            app.handle_touch(
                touch.id,
                touch.phase,
                touch.location.x,
                touch.location.y,
                Instant::now(),
            );
        }
        WindowEvent::Occluded(occluded) => {
            debug!(occluded, "window visibility changed");
            app.handle_visibility(!occluded, scheduler);
        }
        WindowEvent::RedrawRequested => {
            app.frame(Instant::now(), gpu, scheduler)
                .context("rendering stopped")?;
        }
        _ => {}
    }
    Ok(())
}

fn loading_title(title: &str, percent: u32) -> String {
    format!("{title} (loading {percent}%)")
}
