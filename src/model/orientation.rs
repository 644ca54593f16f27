/// Pitch/yaw of the globe group in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    /// Rotation around the x axis.
    pub pitch: f32,
    /// Rotation around the y axis.
    pub yaw: f32,
}

impl Orientation {
    pub const ZERO: Self = Self { pitch: 0.0, yaw: 0.0 };

    pub fn new(pitch: f32, yaw: f32) -> Self {
        Self { pitch, yaw }
    }

    /// Largest per-axis distance to `other`.
    pub fn distance(&self, other: &Orientation) -> f32 {
        (self.pitch - other.pitch).abs().max((self.yaw - other.yaw).abs())
    }
}

/// Pointer coordinates normalized to [-1, 1], y up, (0, 0) at the viewport center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPosition {
    pub x: f32,
    pub y: f32,
}

impl PointerPosition {
    /// Normalize a screen-space position (origin top-left, y down).
    ///
    /// Returns `None` for an empty viewport. Positions outside the viewport are
    /// clamped to the edge.
    pub fn from_screen(raw_x: f64, raw_y: f64, width: f64, height: f64) -> Option<Self> {
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let x = (raw_x / width) * 2.0 - 1.0;
        let y = -(raw_y / height) * 2.0 + 1.0;
        Some(Self {
            x: (x as f32).clamp(-1.0, 1.0),
            y: (y as f32).clamp(-1.0, 1.0),
        })
    }
}

/// Maps a pointer position to the orientation the globe should ease toward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetMapping {
    pub pitch_scale: f32,
    pub yaw_scale: f32,
}

impl Default for TargetMapping {
    fn default() -> Self {
        Self { pitch_scale: 0.3, yaw_scale: 0.5 }
    }
}

impl TargetMapping {
    pub fn target_for(&self, pointer: PointerPosition) -> Orientation {
        Orientation {
            pitch: -pointer.y * self.pitch_scale,
            yaw: pointer.x * self.yaw_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_maps_to_origin() {
        let p = PointerPosition::from_screen(400.0, 300.0, 800.0, 600.0).unwrap();
        assert_eq!(p, PointerPosition { x: 0.0, y: 0.0 });
    }

    #[test]
    fn corners_map_to_unit_square() {
        let top_left = PointerPosition::from_screen(0.0, 0.0, 800.0, 600.0).unwrap();
        assert_eq!((top_left.x, top_left.y), (-1.0, 1.0));

        let bottom_right = PointerPosition::from_screen(800.0, 600.0, 800.0, 600.0).unwrap();
        assert_eq!((bottom_right.x, bottom_right.y), (1.0, -1.0));
    }

    #[test]
    fn stays_in_range_inside_viewport() {
        for raw_x in (0..=1024).step_by(37) {
            for raw_y in (0..=768).step_by(29) {
                let p = PointerPosition::from_screen(raw_x as f64, raw_y as f64, 1024.0, 768.0).unwrap();
                assert!((-1.0..=1.0).contains(&p.x), "x out of range: {}", p.x);
                assert!((-1.0..=1.0).contains(&p.y), "y out of range: {}", p.y);
            }
        }
    }

    #[test]
    fn outside_positions_are_clamped() {
        let p = PointerPosition::from_screen(-50.0, 900.0, 800.0, 600.0).unwrap();
        assert_eq!((p.x, p.y), (-1.0, -1.0));
    }

    #[test]
    fn empty_viewport_has_no_position() {
        assert!(PointerPosition::from_screen(10.0, 10.0, 0.0, 600.0).is_none());
        assert!(PointerPosition::from_screen(10.0, 10.0, 800.0, 0.0).is_none());
    }

    #[test]
    fn target_uses_pitch_and_yaw_scales() {
        let mapping = TargetMapping::default();
        let target = mapping.target_for(PointerPosition { x: 1.0, y: 1.0 });
        assert_eq!(target, Orientation::new(-0.3, 0.5));

        let target = mapping.target_for(PointerPosition { x: -0.5, y: -1.0 });
        assert_eq!(target, Orientation::new(0.3, -0.25));
    }
}
