use crate::model::{Orientation, PointerPosition, TargetMapping};

/// Last-known pointer position, written by the pointer-move handler and read
/// once per frame by the animator.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    position: Option<PointerPosition>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self { position: None }
    }

    /// Normalize and store a screen-space pointer position.
    pub fn on_pointer_move(&mut self, raw_x: f64, raw_y: f64, viewport_width: f64, viewport_height: f64) {
        match PointerPosition::from_screen(raw_x, raw_y, viewport_width, viewport_height) {
            Some(position) => self.position = Some(position),
            None => tracing::debug!(
                "ignoring pointer move on empty viewport {}x{}",
                viewport_width,
                viewport_height
            ),
        }
    }

    /// `None` until the first pointer-move event.
    pub fn position(&self) -> Option<PointerPosition> {
        self.position
    }

    /// Where the globe should head. Without a pointer the target is `current`,
    /// which makes the ease a no-op.
    pub fn target_orientation(&self, mapping: &TargetMapping, current: Orientation) -> Orientation {
        self.position.map_or(current, |p| mapping.target_for(p))
    }
}
