use crate::controller::FrameLoopContext;
use crate::error::GlobeError;
use crate::view::RenderBackend;

/// Output surface size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: u32,
    height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Result<Self, GlobeError> {
        if width == 0 || height == 0 {
            return Err(GlobeError::DegenerateViewport { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Drawing-buffer scale for a device pixel ratio: 2 on any high-density
/// display, 1 otherwise, never above `max_ratio`.
pub fn effective_pixel_ratio(device_pixel_ratio: f64, max_ratio: f64) -> f64 {
    let ratio: f64 = if device_pixel_ratio > 1.0 { 2.0 } else { 1.0 };
    ratio.min(max_ratio.max(1.0))
}

/// Handle a resize: new aspect, new projection, resized surface and one
/// immediate redraw so the stretched previous frame is never shown.
///
/// A zero-sized viewport is rejected and leaves the previous one in effect.
pub fn on_resize<B: RenderBackend>(
    ctx: &mut FrameLoopContext,
    backend: &mut B,
    width: u32,
    height: u32,
) -> Result<(), GlobeError> {
    let viewport = match Viewport::new(width, height) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("rejecting resize: {}", e);
            return Err(e);
        }
    };
    if ctx.viewport != viewport {
        tracing::debug!("resize to {}x{}", width, height);
    }

    ctx.viewport = viewport;
    ctx.camera.set_aspect(width, height);
    backend.resize(width, height);
    backend.draw(&ctx.scene, &ctx.camera, &ctx.stats())
}
