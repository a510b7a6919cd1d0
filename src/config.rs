//! Host configuration for [`flow::run`](crate::flow::run).

/// How the host window, logging and frame loop are set up.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Window title on native targets.
    pub title: String,
    /// Id of the canvas element the surface attaches to on the web.
    pub canvas_id: String,
    /// Upper bound on the device pixel density the renderer is sized with.
    pub max_pixel_density: f64,
    /// Default log level; `RUST_LOG` still overrides it natively.
    pub log_level: log::LevelFilter,
    /// Close the window after this many presented frames.
    pub exit_after_frames: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "haunt-ngin".to_string(),
            canvas_id: "canvas".to_string(),
            max_pixel_density: 2.0,
            log_level: log::LevelFilter::Info,
            exit_after_frames: None,
        }
    }
}

impl EngineConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_canvas_id(mut self, canvas_id: impl Into<String>) -> Self {
        self.canvas_id = canvas_id.into();
        self
    }

    pub fn with_max_pixel_density(mut self, max_pixel_density: f64) -> Self {
        self.max_pixel_density = max_pixel_density;
        self
    }

    pub fn with_log_level(mut self, log_level: log::LevelFilter) -> Self {
        self.log_level = log_level;
        self
    }

    pub fn exit_after(mut self, frames: u64) -> Self {
        self.exit_after_frames = Some(frames);
        self
    }
}
