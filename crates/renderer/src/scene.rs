//! The one-object scene: a subdivided unit plane, its shader material and a
//! perspective camera looking straight at it.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::assets::LoadedAssets;
use crate::uniforms::{ShaderUniformState, TextureHandle};
use crate::viewport::ViewportState;

pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.933, 0.933, 0.933, 1.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub distance: f32,
    pub near: f32,
    pub far: f32,
    pub initial_fov_degrees: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            distance: 2.0,
            near: 0.001,
            far: 10_000.0,
            initial_fov_degrees: 45.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
    position: Vec3,
}

impl PerspectiveCamera {
    /// Places the camera on the +Z axis at `settings.distance`, looking at the origin.
    pub fn new(settings: &CameraSettings, aspect: f32) -> Self {
        Self {
            fov_degrees: settings.initial_fov_degrees,
            aspect,
            near: settings.near,
            far: settings.far,
            position: Vec3::new(0.0, 0.0, settings.distance),
        }
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn distance(&self) -> f32 {
        self.position.length()
    }

    pub fn apply_viewport(&mut self, state: &ViewportState) {
        self.fov_degrees = state.fov_degrees;
        self.aspect = state.camera_aspect;
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y)
    }

    /// World-space width and height visible in the plane at the origin.
    pub fn view_size(&self) -> Vec2 {
        let height = 2.0 * self.distance() * (self.fov_degrees.to_radians() / 2.0).tan();
        Vec2::new(height * self.aspect, height)
    }
}

/// Keeps the orbit away from the poles, where `look_at` has no stable up vector.
const POLAR_MARGIN: f32 = 1e-3;

/// Drag-to-rotate camera controls around the origin.
///
/// Only rotation is supported: the orbit radius is taken from the camera once
/// and never changes, so the viewport's field-of-view formula stays valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitControls {
    radius: f32,
    azimuth: f32,
    polar: f32,
    pub rotate_speed: f32,
}

impl OrbitControls {
    pub fn from_camera(camera: &PerspectiveCamera) -> Self {
        let position = camera.position();
        let radius = position.length();
        let (azimuth, polar) = if radius > 0.0 {
            (
                position.x.atan2(position.z),
                (position.y / radius).clamp(-1.0, 1.0).acos(),
            )
        } else {
            (0.0, FRAC_PI_2)
        };
        Self {
            radius,
            azimuth,
            polar: polar.clamp(POLAR_MARGIN, PI - POLAR_MARGIN),
            rotate_speed: 1.0,
        }
    }

    /// `delta` is the pointer travel in pixels. Dragging across the full
    /// viewport height turns the camera one full revolution.
    pub fn rotate(&mut self, delta: Vec2, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let scale = TAU * self.rotate_speed / viewport_height;
        self.azimuth = (self.azimuth - delta.x * scale).rem_euclid(TAU);
        self.polar = (self.polar - delta.y * scale).clamp(POLAR_MARGIN, PI - POLAR_MARGIN);
    }

    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    pub fn polar(&self) -> f32 {
        self.polar
    }

    pub fn position(&self) -> Vec3 {
        let ring = self.radius * self.polar.sin();
        Vec3::new(
            ring * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            ring * self.azimuth.cos(),
        )
    }

    /// Moves `camera` onto the orbit; it keeps looking at the origin.
    pub fn apply(&self, camera: &mut PerspectiveCamera) {
        camera.position = self.position();
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PlaneVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone)]
pub struct PlaneGeometry {
    pub width: f32,
    pub height: f32,
    pub vertices: Vec<PlaneVertex>,
    pub indices: Vec<u32>,
}

impl PlaneGeometry {
    /// Grid in the XY plane centred on the origin. UV (0, 0) is the bottom-left corner.
    pub fn new(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let columns = width_segments.max(1);
        let rows = height_segments.max(1);
        let segment_width = width / columns as f32;
        let segment_height = height / rows as f32;

        let mut vertices = Vec::with_capacity(((columns + 1) * (rows + 1)) as usize);
        for iy in 0..=rows {
            let y = height / 2.0 - iy as f32 * segment_height;
            for ix in 0..=columns {
                let x = ix as f32 * segment_width - width / 2.0;
                vertices.push(PlaneVertex {
                    position: [x, y, 0.0],
                    uv: [ix as f32 / columns as f32, 1.0 - iy as f32 / rows as f32],
                });
            }
        }

        let stride = columns + 1;
        let mut indices = Vec::with_capacity((columns * rows * 6) as usize);
        for iy in 0..rows {
            for ix in 0..columns {
                let a = ix + stride * iy;
                let b = ix + stride * (iy + 1);
                let c = ix + 1 + stride * (iy + 1);
                let d = ix + 1 + stride * iy;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self {
            width,
            height,
            vertices,
            indices,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

#[derive(Debug, Clone)]
pub struct ShaderMaterial {
    pub sources: ShaderSources,
    pub uniforms: ShaderUniformState,
    pub double_sided: bool,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: PlaneGeometry,
    pub material: ShaderMaterial,
    pub scale: Vec3,
}

impl Mesh {
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale(self.scale)
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: PerspectiveCamera,
    pub mesh: Mesh,
    pub clear_color: [f32; 4],
}

impl Scene {
    pub fn uniforms(&self) -> &ShaderUniformState {
        &self.mesh.material.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut ShaderUniformState {
        &mut self.mesh.material.uniforms
    }

    pub fn model_view_matrix(&self) -> Mat4 {
        self.camera.view_matrix() * self.mesh.model_matrix()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("no loaded image asset named `{0}`")]
    MissingTexture(String),
    #[error("the asset manifest contains no image to texture the plane")]
    NoImage,
}

/// Builds the scene once the asset gate has resolved.
#[derive(Debug, Clone)]
pub struct SceneComposer {
    shaders: ShaderSources,
    camera: CameraSettings,
    clear_color: [f32; 4],
    texture_key: Option<String>,
}

impl SceneComposer {
    pub fn new(shaders: ShaderSources, camera: CameraSettings) -> Self {
        Self {
            shaders,
            camera,
            clear_color: DEFAULT_CLEAR_COLOR,
            texture_key: None,
        }
    }

    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    /// Picks a specific image asset; otherwise the first image in key order is used.
    pub fn with_texture_key(mut self, key: Option<String>) -> Self {
        self.texture_key = key;
        self
    }

    pub fn compose(&self, assets: &LoadedAssets) -> Result<Scene, SceneError> {
        let texture = match &self.texture_key {
            Some(key) => TextureHandle {
                key: key.clone(),
                image: assets
                    .image(key)
                    .ok_or_else(|| SceneError::MissingTexture(key.clone()))?,
            },
            None => {
                let (key, image) = assets.first_image().ok_or(SceneError::NoImage)?;
                TextureHandle {
                    key: key.to_string(),
                    image,
                }
            }
        };

        tracing::info!(
            texture = %texture.key,
            width = texture.width(),
            height = texture.height(),
            "composing scene"
        );

        let mesh = Mesh {
            geometry: PlaneGeometry::new(1.0, 1.0, 10, 10),
            material: ShaderMaterial {
                sources: self.shaders.clone(),
                uniforms: ShaderUniformState::new(texture),
                double_sided: true,
            },
            scale: Vec3::ONE,
        };

        Ok(Scene {
            camera: PerspectiveCamera::new(&self.camera, 1.0),
            mesh,
            clear_color: self.clear_color,
        })
    }
}

/// Ray in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Intersects the mesh's plane (z = 0 before scaling) and returns the hit UV.
    pub fn intersect_plane(&self, mesh: &Mesh) -> Option<Vec2> {
        if self.direction.z.abs() <= f32::EPSILON {
            return None;
        }
        let t = -self.origin.z / self.direction.z;
        if t < 0.0 {
            return None;
        }
        let hit = self.origin + self.direction * t;
        let local = Vec2::new(
            hit.x / (mesh.scale.x * mesh.geometry.width),
            hit.y / (mesh.scale.y * mesh.geometry.height),
        );
        if local.x.abs() > 0.5 || local.y.abs() > 0.5 {
            return None;
        }
        Some(local + Vec2::splat(0.5))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Raycaster {
    ray: Option<Ray>,
}

impl Raycaster {
    /// `ndc` is in `[-1, 1]` with +Y up.
    pub fn set_from_camera(&mut self, ndc: Vec2, camera: &PerspectiveCamera) -> Ray {
        let half_height = (camera.fov_degrees().to_radians() / 2.0).tan();
        let view_direction = Vec3::new(
            ndc.x * half_height * camera.aspect(),
            ndc.y * half_height,
            -1.0,
        );
        let world = camera.view_matrix().inverse();
        let ray = Ray {
            origin: camera.position(),
            direction: world.transform_vector3(view_direction).normalize(),
        };
        self.ray = Some(ray);
        ray
    }

    pub fn ray(&self) -> Option<Ray> {
        self.ray
    }
}
