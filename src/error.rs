use std::path::PathBuf;

/// Everything that can go wrong between startup and a drawn frame.
#[derive(Debug, thiserror::Error)]
pub enum GlobeError {
    /// A resize or pointer event reported a zero-sized viewport.
    #[error("viewport must be non-empty, got {width}x{height}")]
    DegenerateViewport { width: u32, height: u32 },

    /// Config values that would produce a broken scene.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    #[error("failed to read texture {path}: {source}")]
    TextureRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode texture: {0}")]
    TextureDecode(#[from] image::ImageError),

    #[error("surface creation failed: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// Failures reported by the browser (DOM lookups, fetch, RAF).
    #[error("host error: {0}")]
    Host(String),
}

impl From<GlobeError> for wasm_bindgen::JsValue {
    fn from(err: GlobeError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
