use crate::model::Orientation;

/// Eases the group orientation toward a target.
///
/// Every tick acts as a fresh tween from the current value to the target over
/// `duration` seconds, sampled `dt` seconds in on an ease-out quad curve. Chained
/// ticks decay the remaining distance geometrically, so a moving target is
/// picked up on the next frame without a jump.
#[derive(Debug, Clone, Copy)]
pub struct OrientationAnimator {
    duration: f32,
}

impl Default for OrientationAnimator {
    fn default() -> Self {
        Self { duration: 2.0 }
    }
}

impl OrientationAnimator {
    pub fn new(duration: f32) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Fraction of the remaining distance covered in `dt` seconds, in [0, 1].
    pub fn step_fraction(&self, dt: f32) -> f32 {
        let p = (dt / self.duration).clamp(0.0, 1.0);
        1.0 - (1.0 - p) * (1.0 - p)
    }

    pub fn tick(&self, current: Orientation, target: Orientation, dt: f32) -> Orientation {
        let k = self.step_fraction(dt);
        Orientation {
            pitch: current.pitch + (target.pitch - current.pitch) * k,
            yaw: current.yaw + (target.yaw - current.yaw) * k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn idempotent_at_target() {
        let animator = OrientationAnimator::default();
        let o = Orientation::new(0.123, -0.456);
        assert_eq!(animator.tick(o, o, DT), o);
        assert_eq!(animator.tick(o, o, 5.0), o);
    }

    #[test]
    fn converges_monotonically_without_overshoot() {
        let animator = OrientationAnimator::default();
        let target = Orientation::new(-0.3, 0.5);
        let mut current = Orientation::ZERO;
        let mut last_distance = current.distance(&target);

        // five multiples of the nominal duration
        let frames = (5.0 * animator.duration() / DT) as usize;
        for _ in 0..frames {
            current = animator.tick(current, target, DT);
            let distance = current.distance(&target);
            assert!(distance <= last_distance, "distance grew: {} -> {}", last_distance, distance);
            assert!(current.pitch >= target.pitch && current.pitch <= 0.0, "pitch overshot: {}", current.pitch);
            assert!(current.yaw <= target.yaw && current.yaw >= 0.0, "yaw overshot: {}", current.yaw);
            last_distance = distance;
        }
        assert!(last_distance < 1e-3, "did not converge: {}", last_distance);
    }

    #[test]
    fn long_frames_land_exactly() {
        let animator = OrientationAnimator::default();
        let target = Orientation::new(0.2, 0.2);
        assert_eq!(animator.tick(Orientation::ZERO, target, 3.0), target);
    }

    #[test]
    fn framerate_independent_enough() {
        let animator = OrientationAnimator::default();
        let target = Orientation::new(0.0, 0.5);

        let mut at_60 = Orientation::ZERO;
        for _ in 0..60 {
            at_60 = animator.tick(at_60, target, 1.0 / 60.0);
        }
        let mut at_144 = Orientation::ZERO;
        for _ in 0..144 {
            at_144 = animator.tick(at_144, target, 1.0 / 144.0);
        }
        assert!((at_60.yaw - at_144.yaw).abs() < 0.01);
    }

    #[test]
    fn retargets_without_jump() {
        let animator = OrientationAnimator::default();
        let mut current = Orientation::ZERO;
        for _ in 0..30 {
            current = animator.tick(current, Orientation::new(0.0, 0.5), DT);
        }
        let before = current;
        let after = animator.tick(current, Orientation::new(0.0, -0.5), DT);
        // one frame can only cover a small fraction of the new gap
        assert!((after.yaw - before.yaw).abs() <= animator.step_fraction(DT) * 1.0 + 1e-6);
        assert!(after.yaw < before.yaw);
    }
}
