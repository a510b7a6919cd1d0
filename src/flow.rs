//! Host integration and the application event loop.
//!
//! [`run`] owns the winit event loop. Once the window and the wgpu
//! [`Context`] exist it builds the user's scene, wraps everything into a
//! [`FrameLoop`] and drives it from window events:
//!
//! - `RedrawRequested` runs one frame when the loop asked for one
//! - `Resized` queues a logical resize for the next frame
//! - `ScaleFactorChanged` updates the pixel density
//! - pointer and wheel events feed the orbit controls
//! - `CloseRequested` stops the loop and leaves the event loop
//!
//! Natively the context is created with a blocking call on the tokio runtime;
//! on the web it is created in `spawn_local` and handed back through a user
//! event, since the browser never lets us block.

use std::{fmt::Debug, sync::Arc};

use log::{error, info};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    clock::Clock,
    config::EngineConfig,
    context::Context,
    frame::{FrameLoop, FrameOutcome, FrameRequest, FrameScheduler},
    resources::texture::TextureLoader,
    scene::Composition,
    viewport::{Surface, ViewportController},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Builds the scene once the host is ready. Asset loads started here finish in the background.
pub type SceneConstructor = Box<dyn FnOnce(&TextureLoader) -> Composition>;

type HostLoop = FrameLoop<Context, WindowScheduler, Clock>;

/// Maps frame requests onto `Window::request_redraw`.
///
/// Only the latest request is due; redraws the platform issues on its own are ignored.
pub struct WindowScheduler {
    window: Arc<Window>,
    next: u64,
    due: Option<FrameRequest>,
}

impl WindowScheduler {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next: 0,
            due: None,
        }
    }

    /// Consumes the outstanding request, if any.
    pub fn take_due(&mut self) -> bool {
        self.due.take().is_some()
    }
}

impl FrameScheduler for WindowScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        self.next += 1;
        let request = FrameRequest(self.next);
        self.due = Some(request);
        self.window.request_redraw();
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.due == Some(request) {
            self.due = None;
        }
    }
}

pub(crate) enum HostEvent {
    #[allow(dead_code)]
    Initialized(anyhow::Result<Context>),
}

impl Debug for HostEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(Ok(_)) => f.write_str("Initialized(Ok(Context))"),
            Self::Initialized(Err(e)) => f.debug_tuple("Initialized").field(e).finish(),
        }
    }
}

struct App {
    config: EngineConfig,
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: winit::event_loop::EventLoopProxy<HostEvent>,
    constructor: Option<SceneConstructor>,
    window_requested: bool,
    frame_loop: Option<HostLoop>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(
        event_loop: &EventLoop<HostEvent>,
        config: EngineConfig,
        constructor: SceneConstructor,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            constructor: Some(constructor),
            window_requested: false,
            frame_loop: None,
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        if let Some(frame_loop) = self.frame_loop.as_mut() {
            frame_loop.stop();
        }
        self.error = Some(err);
        event_loop.exit();
    }

    fn window_attributes(&self) -> anyhow::Result<winit::window::WindowAttributes> {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(self.config.title.clone());

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(&self.config.canvas_id))
                .ok_or_else(|| {
                    anyhow::anyhow!("No element with id {:?} in the page", self.config.canvas_id)
                })?;
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        Ok(window_attributes)
    }

    /// Builds the scene and starts the frame loop on a ready context.
    fn install(&mut self, event_loop: &ActiveEventLoop, context: Context) {
        let Some(constructor) = self.constructor.take() else {
            return;
        };

        #[cfg(not(target_arch = "wasm32"))]
        let loader = TextureLoader::new(self.async_runtime.handle().clone());
        #[cfg(target_arch = "wasm32")]
        let loader = TextureLoader::new();
        let Composition { scene, camera } = constructor(&loader);

        let window = context.window().clone();
        let scale_factor = window.scale_factor();
        let logical = window.inner_size().to_logical::<u32>(scale_factor);
        let viewport = ViewportController::new(
            camera,
            Surface {
                width: logical.width,
                height: logical.height,
                pixel_density: scale_factor,
            },
            self.config.max_pixel_density,
        );

        let mut frame_loop = FrameLoop::new(
            scene,
            viewport,
            context,
            WindowScheduler::new(window),
            Clock::start(),
        );
        frame_loop.on_resize(logical.width, logical.height);
        if let Err(err) = frame_loop.start() {
            self.fail(event_loop, err.into());
            return;
        }
        info!(
            "Scene with {} objects running at {}x{}",
            frame_loop.scene().objects.len(),
            logical.width,
            logical.height
        );
        self.frame_loop = Some(frame_loop);
    }
}

impl ApplicationHandler<HostEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Resumed fires again after suspension; the surface outlives it.
        if self.window_requested {
            return;
        }
        self.window_requested = true;

        let window = match self
            .window_attributes()
            .and_then(|attributes| Ok(event_loop.create_window(attributes)?))
        {
            Ok(window) => Arc::new(window),
            Err(err) => return self.fail(event_loop, err),
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(Context::new(window)) {
                Ok(context) => self.install(event_loop, context),
                Err(err) => self.fail(event_loop, err),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let context = Context::new(window).await;
                if proxy.send_event(HostEvent::Initialized(context)).is_err() {
                    log::warn!("The event loop closed before the renderer was ready");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: HostEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            HostEvent::Initialized(Ok(context)) => self.install(event_loop, context),
            HostEvent::Initialized(Err(err)) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let frame_loop = match &mut self.frame_loop {
            Some(frame_loop) => frame_loop,
            None => return,
        };

        frame_loop.controls_mut().handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                frame_loop.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let scale_factor = frame_loop.renderer().window().scale_factor();
                let logical = size.to_logical::<u32>(scale_factor);
                frame_loop.on_resize(logical.width, logical.height);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                frame_loop.set_pixel_density(scale_factor);
            }
            WindowEvent::RedrawRequested => {
                if !frame_loop.scheduler_mut().take_due() {
                    return;
                }
                match frame_loop.on_frame() {
                    Ok(FrameOutcome::Presented) => {
                        if let Some(limit) = self.config.exit_after_frames {
                            if frame_loop.frame_count() >= limit {
                                info!("Presented {} frames, exiting", limit);
                                frame_loop.stop();
                                event_loop.exit();
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(err) => self.fail(event_loop, err.into()),
                }
            }
            _ => {}
        }
    }
}

fn init_logging(level: log::LevelFilter) {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(level).parse_default_env();
        if let Err(e) = builder.try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Some(level) = level.to_level() {
            // A second run on the same page keeps the first logger.
            let _ = console_log::init_with_level(level);
        }
    }
}

/// Opens the window (or attaches to the canvas), builds the scene with
/// `constructor` and runs the frame loop until the window closes.
pub fn run(config: EngineConfig, constructor: SceneConstructor) -> anyhow::Result<()> {
    init_logging(config.log_level);

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<HostEvent> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<HostEvent> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    let event_loop: EventLoop<HostEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, config, constructor)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Browser entry point: the haunted house on the page's `#canvas`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    let config = EngineConfig::default().with_title("Haunted House");
    run(config, Box::new(crate::scenes::haunted_house)).map_err(|e| JsValue::from_str(&e.to_string()))
}
