// CONTROLLER: Input, animation, and update loop
pub mod animator;
pub mod frame_loop;
pub mod pointer;
pub mod viewport;

pub use animator::OrientationAnimator;
pub use frame_loop::{FrameClock, FrameLoopContext, FrameStats};
pub use pointer::PointerTracker;
pub use viewport::{effective_pixel_ratio, on_resize, Viewport};
