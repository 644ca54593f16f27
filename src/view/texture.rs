//! Globe surface texture: decode, upload, and the black stand-in used until
//! (or instead of) a loaded map.

use std::path::Path;

use crate::error::GlobeError;

pub struct GlobeTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

/// Decode encoded image bytes (JPEG or PNG) to tightly packed RGBA8.
pub fn decode_rgba(bytes: &[u8]) -> Result<image::RgbaImage, GlobeError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Read and decode an image file.
pub fn read_rgba(path: &Path) -> Result<image::RgbaImage, GlobeError> {
    let bytes = std::fs::read(path).map_err(|source| GlobeError::TextureRead {
        path: path.to_path_buf(),
        source,
    })?;
    decode_rgba(&bytes)
}

impl GlobeTexture {
    pub fn from_rgba(device: &wgpu::Device, queue: &wgpu::Queue, rgba: &image::RgbaImage, label: &str) -> Self {
        let (width, height) = rgba.dimensions();
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("globe_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self { texture, view, sampler, width, height }
    }

    /// 1x1 opaque black: what the globe shows while the map is missing.
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let black = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]));
        Self::from_rgba(device, queue, &black, "globe_placeholder")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_png_to_rgba() {
        let src = image::RgbImage::from_fn(4, 2, |x, _| image::Rgb([x as u8 * 60, 10, 200]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(src)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let rgba = decode_rgba(&bytes).unwrap();
        assert_eq!(rgba.dimensions(), (4, 2));
        assert_eq!(rgba.get_pixel(3, 1).0, [180, 10, 200, 255]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_rgba(b"definitely not an image").unwrap_err();
        assert!(matches!(err, GlobeError::TextureDecode(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_rgba(&dir.path().join("map.jpeg")).unwrap_err();
        assert!(matches!(err, GlobeError::TextureRead { .. }));
    }
}
