use bytemuck::{Pod, Zeroable};

use crate::scene::Scene;

#[repr(C, align(8))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Std140Vec2 {
    value: [f32; 2],
}

unsafe impl Zeroable for Std140Vec2 {}
unsafe impl Pod for Std140Vec2 {}

/// CPU mirror of the `PlaneParams` block declared by the shader prelude.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub(crate) struct PlaneUniforms {
    pub projection_matrix: [[f32; 4]; 4],
    pub model_view_matrix: [[f32; 4]; 4],
    pub resolution: [f32; 4],
    pub mouse: Std140Vec2,
    pub time: f32,
    pub progress: f32,
    pub direction: f32,
    pub mouse_speed: f32,
    pub padding0: Std140Vec2,
}

unsafe impl Zeroable for PlaneUniforms {}
unsafe impl Pod for PlaneUniforms {}

impl PlaneUniforms {
    pub fn from_scene(scene: &Scene) -> Self {
        let uniforms = scene.uniforms();
        Self {
            projection_matrix: scene.camera.projection_matrix().to_cols_array_2d(),
            model_view_matrix: scene.model_view_matrix().to_cols_array_2d(),
            resolution: uniforms.resolution.to_array(),
            mouse: Std140Vec2 {
                value: uniforms.mouse.to_array(),
            },
            time: uniforms.time,
            progress: uniforms.progress(),
            direction: uniforms.direction,
            mouse_speed: uniforms.mouse_speed,
            padding0: Std140Vec2 { value: [0.0; 2] },
        }
    }
}
