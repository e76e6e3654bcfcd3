//! Copy RGBA8 textures back to the CPU.

use super::render_context::RenderContext;
use crate::error::PostFxError;

/// Read a 4-byte-per-pixel texture into a tightly packed `Vec<u8>`.
///
/// Blocks until the GPU has finished all submitted work.
///
/// # Errors
///
/// [`PostFxError::Readback`] if the format is not 4 bytes per pixel or the
/// staging buffer cannot be mapped.
pub fn read_rgba8(
    context: &RenderContext,
    texture: &wgpu::Texture,
) -> Result<Vec<u8>, PostFxError> {
    if texture.format().block_copy_size(None) != Some(4) {
        return Err(PostFxError::Readback(format!(
            "unsupported readback format {:?}",
            texture.format()
        )));
    }
    let width = texture.width();
    let height = texture.height();
    let row_bytes = width * 4;
    let padded_row_bytes = row_bytes.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

    let staging = context.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging"),
        size: u64::from(padded_row_bytes) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = context.create_encoder();
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row_bytes),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    context.submit(encoder);

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = context
        .device
        .poll(wgpu::PollType::Wait)
        .map_err(|e| PostFxError::Readback(e.to_string()))?;
    rx.recv()
        .map_err(|e| PostFxError::Readback(e.to_string()))?
        .map_err(|e| PostFxError::Readback(e.to_string()))?;

    let data = slice.get_mapped_range();
    let mut out = Vec::with_capacity((row_bytes * height) as usize);
    for row in 0..height as usize {
        let start = row * padded_row_bytes as usize;
        out.extend_from_slice(&data[start..start + row_bytes as usize]);
    }
    drop(data);
    staging.unmap();
    Ok(out)
}
