use anyhow::{anyhow, Result};
use image::imageops::flip_vertical_in_place;
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::uniforms::TextureHandle;

use super::context::SurfaceColorSpace;

pub(crate) struct PlaneTexture {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Uploads the decoded image with its rows flipped so UV (0, 0) samples the
/// bottom-left pixel, matching the plane's UV layout.
pub(crate) fn upload_plane_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    handle: &TextureHandle,
    color_space: SurfaceColorSpace,
) -> Result<PlaneTexture> {
    let (width, height) = (handle.width(), handle.height());
    let max_dimension = device.limits().max_texture_dimension_2d;
    if width > max_dimension || height > max_dimension {
        anyhow::bail!(
            "image `{}` is {width}x{height} but the GPU allows at most {max_dimension} per side",
            handle.key
        );
    }

    let mut rgba = image::RgbaImage::from_raw(width, height, handle.image.pixels().to_vec())
        .ok_or_else(|| anyhow!("image `{}` pixel buffer does not match {width}x{height}", handle.key))?;
    flip_vertical_in_place(&mut rgba);

    let texture_format = match color_space {
        SurfaceColorSpace::Gamma => wgpu::TextureFormat::Rgba8Unorm,
        SurfaceColorSpace::Linear => wgpu::TextureFormat::Rgba8UnormSrgb,
    };
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(&format!("plane texture `{}`", handle.key)),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        rgba.as_raw(),
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("plane sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    tracing::debug!(key = %handle.key, width, height, ?texture_format, "uploaded plane texture");

    Ok(PlaneTexture {
        _texture: texture,
        view,
        sampler,
    })
}
