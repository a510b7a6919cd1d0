//! The frame loop: the single process that advances and draws a scene.
//!
//! A [`FrameLoop`] owns everything a frame touches: the [`Scene`], the
//! [`ViewportController`], a [`Renderer`], a [`FrameScheduler`] standing in for
//! the host's "next paint" primitive and a [`TimeSource`]. It is driven from the
//! outside: the host calls [`FrameLoop::on_frame`] whenever a requested frame
//! becomes due.
//!
//! # Lifecycle
//!
//! `Idle --start--> Running --stop--> Stopped`. `stop` is terminal and cancels
//! the outstanding frame request; a fatal renderer error stops the loop too.
//!
//! # One frame
//!
//! 1. apply a queued viewport resize
//! 2. read the clock once
//! 3. move the camera by the orbit controls
//! 4. sync debug-control bindings, run the animation driver, update world transforms
//! 5. draw
//! 6. request the next frame

use std::time::Duration;

use log::{debug, error, warn};

use crate::{
    camera::OrbitControls,
    clock::TimeSource,
    render::{RenderError, Renderer},
    scene::Scene,
    viewport::ViewportController,
};

/// Handle of one outstanding "next paint" request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// The host's next-paint primitive: one callback per request, cancelable.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// What happened to one scheduled frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    Presented,
    /// The loop was not running; nothing was touched.
    Skipped,
    /// The frame was lost to a recoverable renderer error; the next one is scheduled.
    Dropped(RenderError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("the frame loop was stopped and cannot be restarted")]
    Stopped,
    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),
}

pub struct FrameLoop<R, S, C> {
    scene: Scene,
    viewport: ViewportController,
    controls: OrbitControls,
    renderer: R,
    scheduler: S,
    clock: C,
    state: LoopState,
    pending: Option<FrameRequest>,
    frames: u64,
    last_elapsed: Duration,
}

impl<R, S, C> FrameLoop<R, S, C>
where
    R: Renderer,
    S: FrameScheduler,
    C: TimeSource,
{
    pub fn new(
        scene: Scene,
        viewport: ViewportController,
        renderer: R,
        scheduler: S,
        clock: C,
    ) -> Self {
        Self {
            scene,
            viewport,
            controls: OrbitControls::default(),
            renderer,
            scheduler,
            clock,
            state: LoopState::Idle,
            pending: None,
            frames: 0,
            last_elapsed: Duration::ZERO,
        }
    }

    pub fn with_controls(mut self, controls: OrbitControls) -> Self {
        self.controls = controls;
        self
    }

    /// Schedules the first frame. Starting a running loop does nothing.
    pub fn start(&mut self) -> Result<(), FrameError> {
        match self.state {
            LoopState::Idle => {
                self.state = LoopState::Running;
                self.last_elapsed = self.clock.elapsed();
                self.schedule();
                Ok(())
            }
            LoopState::Running => Ok(()),
            LoopState::Stopped => Err(FrameError::Stopped),
        }
    }

    /// Terminal: cancels the outstanding request, later frames are skipped.
    pub fn stop(&mut self) {
        if let Some(request) = self.pending.take() {
            self.scheduler.cancel_frame(request);
        }
        if self.state != LoopState::Stopped {
            debug!("Frame loop stopped after {} frames", self.frames);
        }
        self.state = LoopState::Stopped;
    }

    /// The scheduled callback.
    pub fn on_frame(&mut self) -> Result<FrameOutcome, FrameError> {
        if self.state != LoopState::Running {
            return Ok(FrameOutcome::Skipped);
        }
        self.pending = None;

        self.viewport.apply_pending(&mut self.renderer);

        let elapsed = self.clock.elapsed();
        let dt = elapsed.saturating_sub(self.last_elapsed);
        self.last_elapsed = elapsed;

        self.controls.update(self.viewport.camera_mut(), dt);
        self.scene.advance(elapsed.as_secs_f32());

        match self
            .renderer
            .draw_frame(&self.scene, self.viewport.camera())
        {
            Ok(()) => {
                self.frames += 1;
                self.schedule();
                Ok(FrameOutcome::Presented)
            }
            Err(err) if err.needs_reconfigure() => {
                warn!("Dropping frame: {}. Reconfiguring the surface", err);
                self.viewport.reconfigure(&mut self.renderer);
                self.schedule();
                Ok(FrameOutcome::Dropped(err))
            }
            Err(err) if !err.is_fatal() => {
                warn!("Dropping frame: {}", err);
                self.schedule();
                Ok(FrameOutcome::Dropped(err))
            }
            Err(err) => {
                error!("Stopping the frame loop: {}", err);
                self.state = LoopState::Stopped;
                Err(FrameError::Render(err))
            }
        }
    }

    /// Queues a logical resize for the start of the next frame.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.viewport.request_resize(width, height);
    }

    pub fn set_pixel_density(&mut self, density: f64) {
        self.viewport.set_pixel_density(density, &mut self.renderer);
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Frames presented so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn pending_request(&self) -> Option<FrameRequest> {
        self.pending
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    fn schedule(&mut self) {
        self.pending = Some(self.scheduler.request_frame());
    }
}
