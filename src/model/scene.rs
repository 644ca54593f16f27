use std::f32::consts::TAU;

use glam::{EulerRot, Mat4, Vec3};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use crate::config::{GlobeConfig, StarfieldConfig};
use crate::model::Orientation;

/// Textured sphere. Spins around its own vertical axis inside the group.
#[derive(Debug, Clone)]
pub struct GlobeMesh {
    radius: f32,
    /// Own-axis rotation in [0, 2π).
    spin: f32,
}

/// The pointer-driven rotation applied on top of the globe's spin.
#[derive(Debug, Clone, Default)]
pub struct GlobeGroup {
    orientation: Orientation,
}

/// Back-face shell around the globe. Never rotates.
#[derive(Debug, Clone)]
pub struct Atmosphere {
    scale: f32,
}

/// Background points, fixed after generation.
#[derive(Debug, Clone)]
pub struct Starfield {
    positions: Vec<[f32; 3]>,
}

impl Starfield {
    /// Scatter `count` points uniformly over x, y in [-spread/2, spread/2] and
    /// z in [-depth, 0].
    pub fn generate(config: &StarfieldConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let positions = (0..config.count)
            .map(|_| {
                let x = (rng.random::<f32>() - 0.5) * config.spread;
                let y = (rng.random::<f32>() - 0.5) * config.spread;
                let z = -rng.random::<f32>() * config.depth;
                [x, y, z]
            })
            .collect();
        Self { positions }
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Fixed scene graph: camera-independent state of everything drawn.
///
/// Topology is set once in [`SceneState::new`]; afterwards only the group
/// orientation and the globe spin change.
#[derive(Debug, Clone)]
pub struct SceneState {
    globe: GlobeMesh,
    group: GlobeGroup,
    atmosphere: Atmosphere,
    stars: Starfield,
}

impl SceneState {
    pub fn new(config: &GlobeConfig, star_seed: u64) -> Self {
        Self {
            globe: GlobeMesh { radius: config.globe.radius, spin: 0.0 },
            group: GlobeGroup::default(),
            atmosphere: Atmosphere { scale: config.globe.atmosphere_scale },
            stars: Starfield::generate(&config.stars, star_seed),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.group.orientation
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.group.orientation = orientation;
    }

    pub fn spin(&self) -> f32 {
        self.globe.spin
    }

    /// Advance the own-axis spin, wrapping into [0, 2π).
    pub fn advance_spin(&mut self, delta: f32) {
        self.globe.spin = (self.globe.spin + delta).rem_euclid(TAU);
    }

    pub fn globe_radius(&self) -> f32 {
        self.globe.radius
    }

    pub fn atmosphere_scale(&self) -> f32 {
        self.atmosphere.scale
    }

    pub fn stars(&self) -> &Starfield {
        &self.stars
    }

    /// Group rotation (pitch about x, then yaw about y) applied after the spin.
    pub fn group_matrix(&self) -> Mat4 {
        let o = self.group.orientation;
        Mat4::from_euler(EulerRot::XYZ, o.pitch, o.yaw, 0.0)
    }

    pub fn globe_model(&self) -> Mat4 {
        self.group_matrix() * Mat4::from_rotation_y(self.globe.spin)
    }

    pub fn atmosphere_model(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(self.atmosphere.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> SceneState {
        SceneState::new(&GlobeConfig::default(), 42)
    }

    #[test]
    fn starfield_has_configured_count_and_bounds() {
        let scene = scene();
        let stars = scene.stars();
        assert_eq!(stars.len(), 10_000);
        for p in stars.positions() {
            assert!(p[0] >= -1000.0 && p[0] <= 1000.0);
            assert!(p[1] >= -1000.0 && p[1] <= 1000.0);
            assert!(p[2] <= 0.0 && p[2] >= -3000.0);
        }
    }

    #[test]
    fn same_seed_same_field() {
        let config = StarfieldConfig::default();
        let a = Starfield::generate(&config, 9);
        let b = Starfield::generate(&config, 9);
        let c = Starfield::generate(&config, 10);
        assert_eq!(a.positions(), b.positions());
        assert_ne!(a.positions(), c.positions());
    }

    #[test]
    fn spin_wraps_into_full_turn() {
        let mut scene = scene();
        scene.advance_spin(TAU - 0.01);
        scene.advance_spin(0.02);
        assert!(scene.spin() >= 0.0 && scene.spin() < TAU);
        assert!((scene.spin() - 0.01).abs() < 1e-4);
    }

    #[test]
    fn atmosphere_is_scaled_and_unrotated() {
        let mut scene = scene();
        scene.set_orientation(Orientation::new(0.2, -0.4));
        scene.advance_spin(1.0);
        let m = scene.atmosphere_model();
        assert_eq!(m, Mat4::from_scale(Vec3::splat(1.1)));
        assert_eq!(scene.atmosphere_scale(), 1.1);
    }

    #[test]
    fn globe_model_combines_group_and_spin() {
        let mut scene = scene();
        assert_eq!(scene.globe_model(), Mat4::IDENTITY);

        scene.set_orientation(Orientation::new(0.0, 0.5));
        scene.advance_spin(0.25);
        let expected = Mat4::from_rotation_y(0.75);
        assert!(scene.globe_model().abs_diff_eq(expected, 1e-6));
    }
}
