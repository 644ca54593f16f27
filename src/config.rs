//! Runtime settings for the globe scene, loaded from an optional RON file.
//!
//! Every section carries `#[serde(default)]`, so a file only has to name the
//! keys it wants to change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::GlobeError;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GLOBE_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "globe.ron";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobeConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub globe: GlobeMeshConfig,
    pub stars: StarfieldConfig,
    pub motion: MotionConfig,
    pub render: RenderConfig,
}

/// Native window settings. Ignored on the web, where the canvas is sized to the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    /// Initial inner size in logical pixels.
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub eye: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobeMeshConfig {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    /// Atmosphere shell scale relative to the globe geometry.
    pub atmosphere_scale: f32,
    /// File path natively, URL on the web.
    pub texture_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StarfieldConfig {
    pub count: usize,
    /// Extent of the field along x and y, centered on the origin.
    pub spread: f32,
    /// How far behind the origin (along -z) the field reaches.
    pub depth: f32,
    /// Fixed seed for a reproducible field; time-seeded when `None`.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    /// Radians of pitch per unit of vertical pointer offset.
    pub pitch_scale: f32,
    /// Radians of yaw per unit of horizontal pointer offset.
    pub yaw_scale: f32,
    /// Seconds the orientation tween takes to reach a static target.
    pub ease_duration: f32,
    /// Own-axis spin of the globe mesh in radians per second.
    pub spin_rate: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// MSAA sample count (1 or 4).
    pub msaa_samples: u32,
    /// Upper bound on the device pixel ratio used for the drawing buffer.
    pub max_pixel_ratio: f64,
    /// Draw the egui debug overlay.
    pub show_hud: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Globe".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 75.0,
            z_near: 0.1,
            z_far: 1000.0,
            eye: [0.0, 1.0, 18.0],
        }
    }
}

impl Default for GlobeMeshConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            width_segments: 50,
            height_segments: 50,
            atmosphere_scale: 1.1,
            texture_path: "assets/map.jpeg".to_string(),
        }
    }
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            count: 10_000,
            spread: 2000.0,
            depth: 3000.0,
            seed: None,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            pitch_scale: 0.3,
            yaw_scale: 0.5,
            ease_duration: 2.0,
            spin_rate: 0.06,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            msaa_samples: 4,
            max_pixel_ratio: 2.0,
            show_hud: false,
        }
    }
}

impl GlobeConfig {
    /// Parse a RON document and validate it.
    pub fn from_ron_str(src: &str) -> Result<Self, GlobeError> {
        let config: GlobeConfig = ron::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, GlobeError> {
        let src = std::fs::read_to_string(path).map_err(|source| GlobeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&src)
    }

    /// Resolve the config for a native run: `$GLOBE_CONFIG`, then `./globe.ron`,
    /// then built-in defaults.
    pub fn load() -> Result<Self, GlobeError> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match explicit {
            Some(path) => Self::load_from(&path),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::load_from(local)
                } else {
                    tracing::info!("no {} found, using default config", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject values that would divide by zero or build an empty scene.
    pub fn validate(&self) -> Result<(), GlobeError> {
        let invalid = |msg: String| Err(GlobeError::InvalidConfig(msg));

        if self.window.width == 0 || self.window.height == 0 {
            return invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            ));
        }
        let cam = &self.camera;
        if !(cam.fov_y_degrees > 0.0 && cam.fov_y_degrees < 180.0) {
            return invalid(format!("camera.fov_y_degrees must be in (0, 180), got {}", cam.fov_y_degrees));
        }
        if !(cam.z_near > 0.0 && cam.z_near < cam.z_far) {
            return invalid(format!(
                "camera planes must satisfy 0 < z_near < z_far, got {} / {}",
                cam.z_near, cam.z_far
            ));
        }
        let globe = &self.globe;
        if globe.radius <= 0.0 {
            return invalid(format!("globe.radius must be positive, got {}", globe.radius));
        }
        if globe.width_segments < 3 || globe.height_segments < 2 {
            return invalid(format!(
                "globe needs at least 3x2 segments, got {}x{}",
                globe.width_segments, globe.height_segments
            ));
        }
        if globe.atmosphere_scale <= 1.0 {
            return invalid(format!(
                "globe.atmosphere_scale must be greater than 1, got {}",
                globe.atmosphere_scale
            ));
        }
        if self.stars.spread <= 0.0 || self.stars.depth <= 0.0 {
            return invalid("stars.spread and stars.depth must be positive".to_string());
        }
        if self.motion.ease_duration <= 0.0 {
            return invalid(format!(
                "motion.ease_duration must be positive, got {}",
                self.motion.ease_duration
            ));
        }
        if self.motion.spin_rate < 0.0 {
            return invalid(format!("motion.spin_rate must not be negative, got {}", self.motion.spin_rate));
        }
        if !matches!(self.render.msaa_samples, 1 | 4) {
            return invalid(format!("render.msaa_samples must be 1 or 4, got {}", self.render.msaa_samples));
        }
        if self.render.max_pixel_ratio < 1.0 {
            return invalid(format!(
                "render.max_pixel_ratio must be at least 1, got {}",
                self.render.max_pixel_ratio
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = GlobeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stars.count, 10_000);
        assert_eq!(config.globe.atmosphere_scale, 1.1);
        assert_eq!(config.motion.pitch_scale, 0.3);
        assert_eq!(config.motion.yaw_scale, 0.5);
        assert_eq!(config.motion.ease_duration, 2.0);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = GlobeConfig::from_ron_str("(stars: (count: 250, seed: Some(7)), render: (show_hud: true))")
            .expect("partial config should parse");
        assert_eq!(config.stars.count, 250);
        assert_eq!(config.stars.seed, Some(7));
        assert_eq!(config.stars.spread, 2000.0);
        assert!(config.render.show_hud);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = GlobeConfig::default();
        config.camera.z_near = 2000.0;
        assert!(matches!(config.validate(), Err(GlobeError::InvalidConfig(_))));

        let mut config = GlobeConfig::default();
        config.render.msaa_samples = 2;
        assert!(config.validate().is_err());

        let mut config = GlobeConfig::default();
        config.globe.atmosphere_scale = 0.9;
        assert!(config.validate().is_err());

        assert!(GlobeConfig::from_ron_str("(motion: (ease_duration: 0.0))").is_err());
    }

    #[test]
    fn malformed_ron_is_a_parse_error() {
        let err = GlobeConfig::from_ron_str("(stars: (count: \"many\"))").unwrap_err();
        assert!(matches!(err, GlobeError::ConfigParse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(camera: (fov_y_degrees: 60.0), window: (title: \"Earth\"))").unwrap();

        let config = GlobeConfig::load_from(file.path()).unwrap();
        assert_eq!(config.camera.fov_y_degrees, 60.0);
        assert_eq!(config.window.title, "Earth");

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            GlobeConfig::load_from(&missing),
            Err(GlobeError::ConfigRead { .. })
        ));
    }
}
