use anyhow::{anyhow, bail, Result};
use glam::UVec2;
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::backend::TextureFormat;

use super::pipeline::TARGET_FORMAT;

pub(crate) struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: UVec2,
    pub format: TextureFormat,
}

fn extent(size: UVec2) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.x,
        height: size.y,
        depth_or_array_layers: 1,
    }
}

fn wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::R8 => wgpu::TextureFormat::R8Unorm,
        TextureFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
    }
}

pub(crate) fn create_sampled_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    size: UVec2,
    format: TextureFormat,
    pixels: &[u8],
) -> Result<GpuTexture> {
    if pixels.len() != format.byte_len(size) {
        bail!(
            "texture '{label}' expects {} bytes, got {}",
            format.byte_len(size),
            pixels.len()
        );
    }
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu_format(format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        pixels,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok(GpuTexture {
        texture,
        view,
        size,
        format,
    })
}

pub(crate) fn write_sampled_texture(queue: &wgpu::Queue, target: &GpuTexture, pixels: &[u8]) -> Result<()> {
    if pixels.len() != target.format.byte_len(target.size) {
        bail!(
            "texture update expects {} bytes, got {}",
            target.format.byte_len(target.size),
            pixels.len()
        );
    }
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(target.size.x * target.format.bytes_per_pixel()),
            rows_per_image: Some(target.size.y),
        },
        extent(target.size),
    );
    Ok(())
}

pub(crate) fn create_render_texture(device: &wgpu::Device, label: &str, size: UVec2) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent(size),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        texture,
        view,
        size,
        format: TextureFormat::Rgba8,
    }
}

/// Row pitch of a texture-to-buffer copy, padded to wgpu's alignment.
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    (width * 4).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Copies an RGBA8 render texture back to the CPU.
pub(crate) fn read_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &GpuTexture,
) -> Result<image::RgbaImage> {
    let UVec2 {
        x: width,
        y: height,
    } = source.size;
    let padded_row = padded_bytes_per_row(width);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("target readback"),
        size: u64::from(padded_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &source.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        extent(source.size),
    );
    queue.submit(Some(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|err| anyhow!("wgpu poll failed: {err:?}"))?;
    rx.recv()
        .map_err(|_| anyhow!("readback channel closed"))?
        .map_err(|err| anyhow!("readback map failed: {err:?}"))?;

    let mapped = slice.get_mapped_range();
    let row_bytes = width as usize * 4;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * padded_row as usize;
        pixels.extend_from_slice(&mapped[start..start + row_bytes]);
    }
    drop(mapped);
    buffer.unmap();

    image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("readback produced a short image buffer"))
}
