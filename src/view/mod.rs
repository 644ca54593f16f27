// VIEW: Rendering and graphics
pub mod gpu_init;
pub mod render;
pub mod texture;

pub use gpu_init::GpuContext;
pub use render::RenderState;
pub use texture::{decode_rgba, read_rgba, GlobeTexture};

use crate::controller::FrameStats;
use crate::error::GlobeError;
use crate::model::{Camera, SceneState};

/// What the frame loop needs from a renderer.
pub trait RenderBackend {
    /// Match the drawable area to the new viewport size in device pixels.
    fn resize(&mut self, width: u32, height: u32);

    /// Draw one frame of the current scene.
    fn draw(&mut self, scene: &SceneState, camera: &Camera, stats: &FrameStats) -> Result<(), GlobeError>;
}
