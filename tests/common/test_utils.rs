use std::collections::VecDeque;

use haunt_ngin::{
    camera::Camera,
    clock::ManualClock,
    frame::{FrameLoop, FrameRequest, FrameScheduler},
    render::{RenderError, Renderer, collect_render_list},
    scene::{Composition, Scene},
    viewport::{Surface, ViewportController},
};

/// Records what the frame loop asks of a renderer and fails on demand.
#[derive(Default)]
pub struct RecordingRenderer {
    failures: VecDeque<Option<RenderError>>,
    resizes: Vec<(u32, u32, f64)>,
    frames: u32,
    instances_per_frame: Vec<usize>,
    aspects: Vec<f32>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next frames return these results in order; later frames succeed.
    pub fn failing_with(mut self, results: impl IntoIterator<Item = Option<RenderError>>) -> Self {
        self.failures.extend(results);
        self
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn resizes(&self) -> &[(u32, u32, f64)] {
        &self.resizes
    }

    pub fn instances_per_frame(&self) -> &[usize] {
        &self.instances_per_frame
    }

    pub fn aspects(&self) -> &[f32] {
        &self.aspects
    }
}

impl Renderer for RecordingRenderer {
    fn resize(&mut self, width: u32, height: u32, pixel_density: f64) {
        self.resizes.push((width, height, pixel_density));
    }

    fn draw_frame(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        self.frames += 1;
        self.aspects.push(camera.aspect);
        if let Some(Some(err)) = self.failures.pop_front() {
            return Err(err);
        }
        self.instances_per_frame
            .push(collect_render_list(&scene.objects).instance_count());
        Ok(())
    }
}

/// A frame scheduler that only counts.
#[derive(Default)]
pub struct ManualScheduler {
    requested: u64,
    cancelled: u64,
    outstanding: Option<FrameRequest>,
}

impl ManualScheduler {
    pub fn requested(&self) -> u64 {
        self.requested
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }

    pub fn outstanding(&self) -> Option<FrameRequest> {
        self.outstanding
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        self.requested += 1;
        let request = FrameRequest(self.requested);
        self.outstanding = Some(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.outstanding == Some(request) {
            self.outstanding = None;
        }
        self.cancelled += 1;
    }
}

pub type TestLoop = FrameLoop<RecordingRenderer, ManualScheduler, ManualClock>;

/// A frame loop over `composition` on an 800x600 surface at density 1, plus its clock.
pub fn test_loop(composition: Composition, renderer: RecordingRenderer) -> (TestLoop, ManualClock) {
    let Composition { scene, camera } = composition;
    let viewport = ViewportController::new(
        camera,
        Surface {
            width: 800,
            height: 600,
            pixel_density: 1.0,
        },
        2.0,
    );
    let clock = ManualClock::new();
    let frame_loop = FrameLoop::new(
        scene,
        viewport,
        renderer,
        ManualScheduler::default(),
        clock.clone(),
    );
    (frame_loop, clock)
}
