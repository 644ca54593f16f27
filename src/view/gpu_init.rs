use wgpu::Device;
use std::sync::Arc;

use crate::error::GlobeError;

/// GPU context - unified for both WASM and native
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: Arc<Device>,
    pub queue: Arc<wgpu::Queue>,
    pub surface: wgpu::Surface<'static>,
    pub format: wgpu::TextureFormat,
    pub config: wgpu::SurfaceConfiguration,
}

/// Shared GPU initialization helper
async fn init_device_and_queue(
    adapter: &wgpu::Adapter,
) -> Result<(Arc<Device>, Arc<wgpu::Queue>), GlobeError> {
    let adapter_limits = adapter.limits();
    let limits = wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter_limits);

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::default(),
            },
        )
        .await?;

    Ok((Arc::new(device), Arc::new(queue)))
}

/// Shared surface configuration helper
fn configure_surface(
    device: &Device,
    adapter: &wgpu::Adapter,
    surface: &wgpu::Surface,
    width: u32,
    height: u32,
) -> (wgpu::TextureFormat, wgpu::SurfaceConfiguration) {
    let caps = surface.get_capabilities(adapter);
    let format = caps
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .unwrap_or(caps.formats[0]);

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width,
        height,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(device, &config);

    (format, config)
}

async fn finish_init(
    instance: &wgpu::Instance,
    surface: wgpu::Surface<'static>,
    width: u32,
    height: u32,
) -> Result<GpuContext, GlobeError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await?;

    let info = adapter.get_info();
    tracing::info!("using adapter {} ({:?})", info.name, info.backend);

    let (device, queue) = init_device_and_queue(&adapter).await?;
    let (format, config) = configure_surface(&device, &adapter, &surface, width, height);
    tracing::info!("surface {}x{} format {:?}", width, height, format);

    Ok(GpuContext {
        adapter,
        device,
        queue,
        surface,
        format,
        config,
    })
}

#[cfg(target_arch = "wasm32")]
impl GpuContext {
    /// Initialize GPU for a given canvas surface (WASM)
    pub async fn new(
        canvas: &web_sys::HtmlCanvasElement,
        width: u32,
        height: u32,
    ) -> Result<Self, GlobeError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;

        finish_init(&instance, surface, width, height).await
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl GpuContext {
    /// Initialize GPU for a window surface created from `instance` (Native)
    pub async fn new_native(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<Self, GlobeError> {
        finish_init(instance, surface, width, height).await
    }
}
