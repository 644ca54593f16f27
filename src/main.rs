use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

// Import from the library crate
use globe::{
    config::GlobeConfig,
    controller::{on_resize, FrameLoopContext},
    error::GlobeError,
    logging,
    view::{read_rgba, GpuContext, RenderState},
};

/// Everything that exists once the window is up.
struct Globe {
    window: Arc<Window>,
    ctx: FrameLoopContext,
    renderer: RenderState,
}

impl Globe {
    fn new(event_loop: &ActiveEventLoop, config: &GlobeConfig) -> Result<Self, GlobeError> {
        let attrs = Window::default_attributes()
            .with_title(&config.window.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.window.width, config.window.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| GlobeError::Host(format!("failed to create window: {e}")))?,
        );
        let size = window.inner_size();

        // Initialize wgpu
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let gpu = pollster::block_on(GpuContext::new_native(&instance, surface, size.width, size.height))?;

        let star_seed = config.stars.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default()
        });
        let ctx = FrameLoopContext::new(config, size.width, size.height, star_seed)?;
        let mut renderer = RenderState::new(gpu, &ctx.scene, config);
        renderer.pixels_per_point = window.scale_factor() as f32;

        let texture_path = Path::new(&config.globe.texture_path);
        match read_rgba(texture_path) {
            Ok(rgba) => renderer.set_texture(&rgba),
            Err(e) => tracing::warn!("globe texture unavailable, drawing without it: {}", e),
        }

        tracing::info!(
            "globe started at {}x{} with {} stars (seed {})",
            size.width,
            size.height,
            ctx.scene.stars().len(),
            star_seed
        );
        Ok(Self { window, ctx, renderer })
    }
}

struct App {
    config: GlobeConfig,
    started: Instant,
    globe: Option<Globe>,
}

impl App {
    fn new(config: GlobeConfig) -> Self {
        Self {
            config,
            started: Instant::now(),
            globe: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.globe.is_some() {
            return;
        }

        match Globe::new(event_loop, &self.config) {
            Ok(globe) => {
                globe.window.request_redraw();
                self.globe = Some(globe);
            }
            Err(e) => {
                tracing::error!("failed to start globe: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(globe) = self.globe.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                globe.ctx.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Err(e) = on_resize(&mut globe.ctx, &mut globe.renderer, size.width, size.height) {
                    tracing::debug!("resize skipped: {}", e);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                globe.renderer.pixels_per_point = scale_factor as f32;
            }
            WindowEvent::CursorMoved { position, .. } => {
                let size = globe.window.inner_size();
                globe
                    .ctx
                    .pointer
                    .on_pointer_move(position.x, position.y, size.width as f64, size.height as f64);
            }
            WindowEvent::RedrawRequested => {
                let now = self.started.elapsed().as_secs_f64();
                if let Err(e) = globe.ctx.on_frame(now, &mut globe.renderer) {
                    tracing::error!("render error: {}", e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(globe) = &self.globe {
            if globe.ctx.is_running() {
                globe.window.request_redraw();
            }
        }
    }
}

fn main() {
    logging::init();

    let config = match GlobeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            tracing::error!("failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };

    let mut app = App::new(config);
    if let Err(e) = event_loop.run_app(&mut app) {
        tracing::error!("event loop error: {}", e);
        std::process::exit(1);
    }
}
