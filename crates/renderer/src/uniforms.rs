use std::sync::Arc;

use glam::{Vec2, Vec4};

use crate::assets::LoadedImage;

/// Names the shaders see; order matches the GPU block after the matrices.
pub const UNIFORM_NAMES: [&str; 7] = [
    "time",
    "progress",
    "direction",
    "mouseSpeed",
    "mouse",
    "texture",
    "resolution",
];

/// Decoded image bound to the `texture` uniform.
#[derive(Debug, Clone)]
pub struct TextureHandle {
    pub key: String,
    pub image: Arc<LoadedImage>,
}

impl TextureHandle {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Height over width.
    pub fn aspect(&self) -> f32 {
        self.image.aspect()
    }
}

/// Values pushed to the shader every frame.
#[derive(Debug, Clone)]
pub struct ShaderUniformState {
    pub time: f32,
    progress: f32,
    pub direction: f32,
    pub mouse_speed: f32,
    pub mouse: Vec2,
    pub texture: TextureHandle,
    /// `(width, height, cover_x, cover_y)`.
    pub resolution: Vec4,
}

impl ShaderUniformState {
    pub fn new(texture: TextureHandle) -> Self {
        Self {
            time: 0.0,
            progress: 0.0,
            direction: 0.0,
            mouse_speed: 0.0,
            mouse: Vec2::ZERO,
            texture,
            resolution: Vec4::new(1.0, 1.0, 1.0, 1.0),
        }
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn set_progress(&mut self, value: f32) {
        self.progress = value.clamp(0.0, 1.0);
    }
}
