// MODEL: Scene data and camera
pub mod camera;
pub mod orientation;
pub mod scene;

pub use camera::Camera;
pub use orientation::{Orientation, PointerPosition, TargetMapping};
pub use scene::{SceneState, Starfield};
