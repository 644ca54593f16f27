// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod logging;
pub mod utils;
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
pub use web::{start, stop_globe, GlobeHandle};

/// Id of the canvas the web build draws into. Created if the page lacks one.
pub const CANVAS_ID: &str = "globe-canvas";

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Event, HtmlCanvasElement, MouseEvent, Response, Window};

    use crate::config::GlobeConfig;
    use crate::controller::{effective_pixel_ratio, on_resize, FrameLoopContext};
    use crate::view::{decode_rgba, GpuContext, RenderState};
    use crate::{logging, CANVAS_ID};

    thread_local! {
        static MOUNTED: RefCell<Option<GlobeHandle>> = const { RefCell::new(None) };
    }

    #[wasm_bindgen(start)]
    pub async fn start() -> Result<(), JsValue> {
        logging::init();

        let handle = mount(GlobeConfig::default()).await?;
        MOUNTED.with(|m| *m.borrow_mut() = Some(handle));
        Ok(())
    }

    /// Tear down the globe mounted by `start`, if any.
    #[wasm_bindgen]
    pub fn stop_globe() {
        if let Some(handle) = MOUNTED.with(|m| m.borrow_mut().take()) {
            handle.stop();
        }
    }

    /// Running globe: the frame loop plus the window listeners feeding it.
    #[wasm_bindgen]
    pub struct GlobeHandle {
        window: Window,
        ctx: Rc<RefCell<FrameLoopContext>>,
        animation: AnimationLoop,
        listeners: Vec<(&'static str, Closure<dyn FnMut(Event)>)>,
    }

    #[wasm_bindgen]
    impl GlobeHandle {
        /// Stop the loop, cancel the pending frame and detach all listeners.
        pub fn stop(mut self) {
            self.ctx.borrow_mut().stop();
            self.animation.cancel();
            for (event, listener) in self.listeners.drain(..) {
                if let Err(e) = self
                    .window
                    .remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref())
                {
                    tracing::warn!("failed to remove {} listener: {:?}", event, e);
                }
            }
        }
    }

    async fn mount(config: GlobeConfig) -> Result<GlobeHandle, JsValue> {
        let window = web_sys::window().ok_or_else(|| js_error("no global `window`"))?;
        let (width, height) = window_pixel_size(&window, config.render.max_pixel_ratio)?;
        let canvas = init_canvas(&window, width, height)?;

        let gpu = GpuContext::new(&canvas, width, height).await?;

        let star_seed = config.stars.seed.unwrap_or_else(|| js_sys::Date::now() as u64);
        let ctx = FrameLoopContext::new(&config, width, height, star_seed)?;
        let renderer = RenderState::new(gpu, &ctx.scene, &config);

        let ctx = Rc::new(RefCell::new(ctx));
        let renderer = Rc::new(RefCell::new(renderer));

        spawn_texture_load(window.clone(), config.globe.texture_path.clone(), renderer.clone());

        let listeners = setup_listeners(&window, &canvas, &config, ctx.clone(), renderer.clone())?;

        let animation = AnimationLoop::new(window.clone());
        {
            let ctx = ctx.clone();
            animation.start(move |timestamp| {
                let mut ctx = ctx.borrow_mut();
                if let Err(e) = ctx.on_frame(timestamp / 1000.0, &mut *renderer.borrow_mut()) {
                    tracing::error!("frame failed: {}", e);
                }
                ctx.is_running()
            })?;
        }

        tracing::info!("globe mounted at {}x{}", width, height);
        Ok(GlobeHandle { window, ctx, animation, listeners })
    }

    /// Window inner size in device pixels, after the pixel ratio cap.
    fn window_pixel_size(window: &Window, max_pixel_ratio: f64) -> Result<(u32, u32), JsValue> {
        let ratio = effective_pixel_ratio(window.device_pixel_ratio(), max_pixel_ratio);
        let css_w = window.inner_width()?.as_f64().unwrap_or(0.0);
        let css_h = window.inner_height()?.as_f64().unwrap_or(0.0);
        Ok(((css_w * ratio) as u32, (css_h * ratio) as u32))
    }

    fn init_canvas(window: &Window, width: u32, height: u32) -> Result<HtmlCanvasElement, JsValue> {
        let document = window.document().ok_or_else(|| js_error("no document on window"))?;

        let canvas = match document.get_element_by_id(CANVAS_ID) {
            Some(el) => el
                .dyn_into::<HtmlCanvasElement>()
                .map_err(|_| js_error(format!("#{} is not a canvas", CANVAS_ID)))?,
            None => {
                let body = document.body().ok_or_else(|| js_error("no body on document"))?;
                let el = document
                    .create_element("canvas")?
                    .dyn_into::<HtmlCanvasElement>()
                    .map_err(|_| js_error("failed to create canvas"))?;
                el.set_id(CANVAS_ID);
                el.set_attribute("style", "display:block;width:100vw;height:100vh")?;
                body.append_child(&el)?;
                el
            }
        };
        canvas.set_width(width);
        canvas.set_height(height);
        Ok(canvas)
    }

    fn spawn_texture_load(window: Window, url: String, renderer: Rc<RefCell<RenderState>>) {
        wasm_bindgen_futures::spawn_local(async move {
            let bytes = match fetch_bytes(&window, &url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("could not fetch globe texture {}: {:?}", url, e);
                    return;
                }
            };
            match decode_rgba(&bytes) {
                Ok(rgba) => renderer.borrow_mut().set_texture(&rgba),
                Err(e) => tracing::warn!("could not decode globe texture {}: {}", url, e),
            }
        });
    }

    async fn fetch_bytes(window: &Window, url: &str) -> Result<Vec<u8>, JsValue> {
        let response: Response = JsFuture::from(window.fetch_with_str(url)).await?.dyn_into()?;
        if !response.ok() {
            return Err(js_error(format!("HTTP {}", response.status())));
        }
        let buffer = JsFuture::from(response.array_buffer()?).await?;
        Ok(js_sys::Uint8Array::new(&buffer).to_vec())
    }

    fn setup_listeners(
        window: &Window,
        canvas: &HtmlCanvasElement,
        config: &GlobeConfig,
        ctx: Rc<RefCell<FrameLoopContext>>,
        renderer: Rc<RefCell<RenderState>>,
    ) -> Result<Vec<(&'static str, Closure<dyn FnMut(Event)>)>, JsValue> {
        let mut listeners = Vec::new();

        // Pointer position over the whole window
        {
            let ctx = ctx.clone();
            let window_mm = window.clone();
            let mm = Closure::wrap(Box::new(move |e: Event| {
                let Some(e) = e.dyn_ref::<MouseEvent>() else { return };
                let w = window_mm.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
                let h = window_mm.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
                ctx.borrow_mut()
                    .pointer
                    .on_pointer_move(e.client_x() as f64, e.client_y() as f64, w, h);
            }) as Box<dyn FnMut(Event)>);
            window.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
            listeners.push(("mousemove", mm));
        }

        // Resize: new canvas size, new projection, immediate redraw
        {
            let window_rs = window.clone();
            let canvas = canvas.clone();
            let max_pixel_ratio = config.render.max_pixel_ratio;
            let resize = Closure::wrap(Box::new(move |_e: Event| {
                let (width, height) = match window_pixel_size(&window_rs, max_pixel_ratio) {
                    Ok(size) => size,
                    Err(e) => {
                        tracing::warn!("could not read window size: {:?}", e);
                        return;
                    }
                };
                let mut ctx = ctx.borrow_mut();
                if !ctx.is_running() {
                    return;
                }
                if width > 0 && height > 0 {
                    canvas.set_width(width);
                    canvas.set_height(height);
                }
                if let Err(e) = on_resize(&mut ctx, &mut *renderer.borrow_mut(), width, height) {
                    tracing::warn!("resize failed: {}", e);
                }
            }) as Box<dyn FnMut(Event)>);
            window.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())?;
            listeners.push(("resize", resize));
        }

        Ok(listeners)
    }

    /// requestAnimationFrame loop that re-arms itself while the frame callback
    /// returns true, and can be cancelled from outside.
    struct AnimationLoop {
        window: Window,
        callback: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
        pending: Rc<Cell<Option<i32>>>,
    }

    impl AnimationLoop {
        fn new(window: Window) -> Self {
            Self {
                window,
                callback: Rc::new(RefCell::new(None)),
                pending: Rc::new(Cell::new(None)),
            }
        }

        fn start(&self, mut frame: impl FnMut(f64) -> bool + 'static) -> Result<(), JsValue> {
            let window = self.window.clone();
            let callback = self.callback.clone();
            let pending = self.pending.clone();

            *self.callback.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
                pending.set(None);
                if !frame(timestamp) {
                    return;
                }

                // Schedule next frame
                let cb_ref = callback.borrow();
                let Some(cb) = cb_ref.as_ref() else { return };
                match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    Ok(id) => pending.set(Some(id)),
                    Err(e) => tracing::error!("requestAnimationFrame failed: {:?}", e),
                }
            }) as Box<dyn FnMut(f64)>));

            let cb_ref = self.callback.borrow();
            if let Some(cb) = cb_ref.as_ref() {
                let id = self.window.request_animation_frame(cb.as_ref().unchecked_ref())?;
                self.pending.set(Some(id));
            }
            Ok(())
        }

        fn cancel(&self) {
            if let Some(id) = self.pending.take() {
                if let Err(e) = self.window.cancel_animation_frame(id) {
                    tracing::warn!("cancelAnimationFrame failed: {:?}", e);
                }
            }
            // Breaks the closure's reference cycle through `callback`
            self.callback.borrow_mut().take();
        }
    }

    fn js_error<E: Into<String>>(msg: E) -> JsValue {
        JsValue::from_str(&msg.into())
    }
}
