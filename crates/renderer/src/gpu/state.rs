use std::time::{Duration, Instant};

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::app::{DrawError, DrawTarget};
use crate::scene::Scene;
use crate::types::{AdapterProfile, Antialiasing, ColorSpaceMode, GpuPowerPreference};

use super::context::{GpuContext, SurfaceColorSpace};
use super::pipeline::PlanePipeline;
use super::texture::{upload_plane_texture, PlaneTexture};
use super::uniforms::PlaneUniforms;

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

struct FrameStats {
    last_update: Instant,
    frames_since_update: u32,
    frames_per_second: f32,
    total_frames: u64,
}

impl FrameStats {
    fn new(now: Instant) -> Self {
        Self {
            last_update: now,
            frames_since_update: 0,
            frames_per_second: 0.0,
            total_frames: 0,
        }
    }

    fn record(&mut self, now: Instant, time: f32) {
        self.frames_since_update += 1;
        self.total_frames += 1;
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed >= Duration::from_secs(1) {
            self.frames_per_second = self.frames_since_update as f32 / elapsed.as_secs_f32();
            self.frames_since_update = 0;
            self.last_update = now;
            debug!(
                fps = self.frames_per_second.round(),
                frames = self.total_frames,
                time,
                "render stats"
            );
        }
    }
}

pub(crate) struct GpuState {
    context: GpuContext,
    pipeline: PlanePipeline,
    _texture: PlaneTexture,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    multisample_target: Option<MultisampleTarget>,
    clear_color: wgpu::Color,
    stats: FrameStats,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        scene: &Scene,
        antialiasing: Antialiasing,
        color_space: ColorSpaceMode,
        gpu_power: GpuPowerPreference,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, antialiasing, color_space, gpu_power)?;
        let device = &context.device;

        let texture = upload_plane_texture(
            device,
            &context.queue,
            &scene.uniforms().texture,
            context.color_space,
        )?;
        let pipeline = PlanePipeline::new(
            device,
            context.surface_format,
            context.sample_count,
            &scene.mesh.material,
            &texture,
        )?;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("plane uniform buffer"),
            contents: bytemuck::bytes_of(&PlaneUniforms::from_scene(scene)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("plane uniform bind group"),
            layout: &pipeline.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let geometry = &scene.mesh.geometry;
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("plane vertices"),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("plane indices"),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });
        let clear_color = clear_color(scene.clear_color, context.color_space);

        Ok(Self {
            index_count: geometry.indices.len() as u32,
            context,
            pipeline,
            _texture: texture,
            uniform_buffer,
            uniform_bind_group,
            vertex_buffer,
            index_buffer,
            multisample_target,
            clear_color,
            stats: FrameStats::new(Instant::now()),
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    fn rebuild_multisample_target(&mut self) {
        if self.context.sample_count > 1 {
            self.multisample_target = Some(MultisampleTarget::new(
                &self.context.device,
                self.context.surface_format,
                self.context.size,
                self.context.sample_count,
            ));
        }
    }

    fn acquire_frame(&mut self) -> Result<Option<wgpu::SurfaceTexture>, DrawError> {
        match self.context.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost or outdated; reconfiguring and skipping frame");
                self.context.reconfigure();
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; skipping frame");
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                Err(DrawError::ContextLost("GPU is out of memory".into()))
            }
            Err(other) => Err(DrawError::ContextLost(other.to_string())),
        }
    }
}

impl DrawTarget for GpuState {
    fn resize(&mut self, width: u32, height: u32) {
        let size = PhysicalSize::new(width, height);
        if size == self.context.size {
            return;
        }
        self.context.resize(size);
        self.rebuild_multisample_target();
    }

    fn draw(&mut self, scene: &Scene) -> Result<(), DrawError> {
        let Some(frame) = self.acquire_frame()? else {
            return Ok(());
        };
        self.stats.record(Instant::now(), scene.uniforms().time);

        let uniforms = PlaneUniforms::from_scene(scene);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("plane encoder"),
                });

        {
            let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
                Some(msaa) => (&msaa.view, Some(&view)),
                None => (&view, None),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("plane pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_bind_group(1, &self.pipeline.texture_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.index_count, 0, 0..1);
        }

        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

/// Clear values are written as-is, so sRGB surfaces need the colour decoded first.
fn clear_color(rgba: [f32; 4], color_space: SurfaceColorSpace) -> wgpu::Color {
    let channel = |value: f32| -> f64 {
        let value = f64::from(value.clamp(0.0, 1.0));
        match color_space {
            SurfaceColorSpace::Gamma => value,
            SurfaceColorSpace::Linear => srgb_to_linear(value),
        }
    };
    wgpu::Color {
        r: channel(rgba[0]),
        g: channel(rgba[1]),
        b: channel(rgba[2]),
        a: f64::from(rgba[3].clamp(0.0, 1.0)),
    }
}

fn srgb_to_linear(value: f64) -> f64 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}
