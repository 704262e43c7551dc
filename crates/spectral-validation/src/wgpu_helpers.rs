//! wgpu utility functions for the comparison backend
//!
//! This module provides helper functions for creating the textures and buffers
//! a validation dispatch needs and for reading results back to the host.

use crate::error::{Result, ValidationError};
use crate::image::Image;

/// Texture usage flags for input images
///
/// Read by the kernel through `textureLoad` and filled with `write_texture`
pub const TEXTURE_USAGE_INPUT: wgpu::TextureUsages = wgpu::TextureUsages::TEXTURE_BINDING.union(wgpu::TextureUsages::COPY_DST);

/// Buffer usage flags for the device-side counter block
pub const BUFFER_USAGE_COUNTERS: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE.union(wgpu::BufferUsages::COPY_SRC).union(wgpu::BufferUsages::COPY_DST);

/// Buffer usage flags for the host-visible readback copy
pub const BUFFER_USAGE_READBACK: wgpu::BufferUsages = wgpu::BufferUsages::MAP_READ.union(wgpu::BufferUsages::COPY_DST);

/// Creates a 2D texture with the specified parameters
///
/// # Arguments
/// * `device` - The wgpu device to create the texture on
/// * `label` - Debug label
/// * `width` - Texture width in pixels
/// * `height` - Texture height in pixels
/// * `format` - Texture format
/// * `usage` - Texture usage flags
///
/// # Returns
/// A configured texture
pub fn create_texture(device: &wgpu::Device, label: &str, width: u32, height: u32, format: wgpu::TextureFormat, usage: wgpu::TextureUsages) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1, // 2D texture, single layer
        },
        mip_level_count: 1, // No mipmapping
        sample_count: 1,    // No multisampling
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

/// Uploads an image into a new `Rgba32Float` texture
///
/// # Arguments
/// * `device` - The wgpu device
/// * `queue` - The wgpu command queue
/// * `label` - Debug label for the texture
/// * `image` - The source image
///
/// # Returns
/// The texture, or an error when the image exceeds the device's texture limits
pub fn upload_image_texture(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, image: &Image) -> Result<wgpu::Texture> {
    let (width, height) = image.dimensions();
    let max_dimension = device.limits().max_texture_dimension_2d;
    if width > max_dimension || height > max_dimension {
        return Err(ValidationError::Device(format!("{label} is {width}x{height}, device supports at most {max_dimension}x{max_dimension}")));
    }

    let texture = create_texture(device, label, width, height, wgpu::TextureFormat::Rgba32Float, TEXTURE_USAGE_INPUT);

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(image.as_rgba()),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4 * 4), // 4 components * 4 bytes per f32
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    Ok(texture)
}

/// Creates an unmapped buffer of the given size and usage
pub fn create_buffer(device: &wgpu::Device, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage,
        mapped_at_creation: false,
    })
}

/// Maps a readback buffer and copies its contents out as `u32` words
///
/// Blocks until the device has finished all submitted work.
///
/// # Arguments
/// * `device` - The wgpu device
/// * `buffer` - A buffer created with [`BUFFER_USAGE_READBACK`]
///
/// # Returns
/// The buffer contents
pub fn read_buffer_u32(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Result<Vec<u32>> {
    // Map the buffer for reading (async operation)
    let buffer_slice = buffer.slice(..);
    let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |v| {
        // The receiver outlives the poll below, so a failed send means nobody is listening anymore
        let _ = sender.send(v);
    });

    // Wait for the mapping operation to complete
    device.poll(wgpu::PollType::Wait)?;
    pollster::block_on(receiver.receive()).ok_or_else(|| ValidationError::Device("buffer mapping callback was dropped".to_string()))??;

    let words = {
        let data = buffer_slice.get_mapped_range();
        bytemuck::cast_slice::<u8, u32>(&data).to_vec()
    };
    buffer.unmap();

    Ok(words)
}
