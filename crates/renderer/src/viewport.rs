//! Resize handling: camera FOV, plane scale, and cover-fit UV correction.
//!
//! Everything here is recomputed from scratch on each resize; nothing is
//! carried over from the previous viewport.

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ViewportError {
    #[error("viewport {width}x{height} is degenerate; both dimensions must be positive")]
    Degenerate { width: u32, height: u32 },
    #[error("image aspect {0} must be finite and positive")]
    InvalidImageAspect(f32),
}

/// UV scale factors that make the image cover the plane without distortion.
///
/// Exactly one factor is 1; the other lies in `(0, 1]` and crops the
/// overflowing dimension around the centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    pub scale_x: f32,
    pub scale_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
    pub camera_aspect: f32,
    pub fov_degrees: f32,
    pub plane_scale: Vec2,
    pub cover: CoverFit,
}

impl ViewportState {
    /// Packs the state into the `resolution` uniform layout.
    pub fn resolution(&self) -> [f32; 4] {
        [
            self.width as f32,
            self.height as f32,
            self.cover.scale_x,
            self.cover.scale_y,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    distance: f32,
    current: Option<ViewportState>,
}

impl ViewportController {
    /// `distance` is the camera's fixed distance from the plane.
    pub fn new(distance: f32) -> Self {
        Self {
            distance,
            current: None,
        }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn current(&self) -> Option<&ViewportState> {
        self.current.as_ref()
    }

    /// `image_aspect` is image height divided by image width.
    pub fn resize(
        &mut self,
        width: u32,
        height: u32,
        image_aspect: f32,
    ) -> Result<ViewportState, ViewportError> {
        if width == 0 || height == 0 {
            return Err(ViewportError::Degenerate { width, height });
        }
        if !image_aspect.is_finite() || image_aspect <= 0.0 {
            return Err(ViewportError::InvalidImageAspect(image_aspect));
        }

        let camera_aspect = width as f32 / height as f32;
        let state = ViewportState {
            width,
            height,
            camera_aspect,
            fov_degrees: fov_for_unit_height(self.distance),
            plane_scale: plane_scale(camera_aspect),
            cover: cover_fit(width, height, image_aspect),
        };
        tracing::trace!(
            width,
            height,
            aspect = camera_aspect,
            fov = state.fov_degrees,
            cover_x = state.cover.scale_x,
            cover_y = state.cover.scale_y,
            "viewport resized"
        );
        self.current = Some(state);
        Ok(state)
    }
}

/// Vertical field of view (degrees) that makes exactly one world unit visible
/// at `distance`.
pub fn fov_for_unit_height(distance: f32) -> f32 {
    2.0 * (180.0 / std::f32::consts::PI) * (1.0 / (2.0 * distance)).atan()
}

pub fn cover_fit(width: u32, height: u32, image_aspect: f32) -> CoverFit {
    let container_ratio = height as f32 / width as f32;
    if container_ratio > image_aspect {
        CoverFit {
            scale_x: (width as f32 / height as f32) * image_aspect,
            scale_y: 1.0,
        }
    } else {
        CoverFit {
            scale_x: 1.0,
            scale_y: container_ratio / image_aspect,
        }
    }
}

/// Stretches the unit plane so it fills the frustum for either orientation.
pub fn plane_scale(camera_aspect: f32) -> Vec2 {
    if camera_aspect > 1.0 {
        Vec2::new(camera_aspect, 1.0)
    } else {
        Vec2::new(1.0, 1.0 / camera_aspect)
    }
}
