//! Output surface sizing and camera aspect.
//!
//! [`ViewportController`] is the only writer of the [`Surface`] and of the
//! camera's aspect ratio. Every resize recomputes both from scratch, so
//! repeating an event changes nothing. Degenerate sizes (a zero width or
//! height) are remembered but never reach the projection or the renderer.

use log::debug;

use crate::{camera::Camera, render::Renderer};

/// Logical size of the drawing surface and the device pixel density.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub pixel_density: f64,
}

impl Surface {
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug)]
pub struct ViewportController {
    surface: Surface,
    camera: Camera,
    max_pixel_density: f64,
    pending: Option<(u32, u32)>,
}

impl ViewportController {
    pub fn new(camera: Camera, surface: Surface, max_pixel_density: f64) -> Self {
        let mut viewport = Self {
            surface: Surface {
                pixel_density: sanitize_density(surface.pixel_density),
                ..surface
            },
            camera,
            max_pixel_density: sanitize_density(max_pixel_density),
            pending: None,
        };
        viewport.update_aspect();
        viewport
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// For orbit controls; the aspect ratio is overwritten on the next positive resize.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Density handed to the renderer: the device density capped by configuration.
    pub fn effective_pixel_density(&self) -> f64 {
        self.surface.pixel_density.min(self.max_pixel_density)
    }

    /// Apply a new logical size right away.
    pub fn on_resize<R: Renderer + ?Sized>(&mut self, width: u32, height: u32, renderer: &mut R) {
        self.pending = None;
        self.surface.width = width;
        self.surface.height = height;
        if self.surface.is_degenerate() {
            debug!("Ignoring degenerate surface size {}x{}", width, height);
            return;
        }
        self.update_aspect();
        renderer.resize(width, height, self.effective_pixel_density());
    }

    /// Queue a size to be applied by [`apply_pending`](Self::apply_pending); the last request wins.
    pub fn request_resize(&mut self, width: u32, height: u32) {
        self.pending = Some((width, height));
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns true if a queued resize was applied.
    pub fn apply_pending<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> bool {
        match self.pending.take() {
            Some((width, height)) => {
                self.on_resize(width, height, renderer);
                true
            }
            None => false,
        }
    }

    /// Non-finite or non-positive densities are treated as 1.
    pub fn set_pixel_density<R: Renderer + ?Sized>(&mut self, density: f64, renderer: &mut R) {
        self.surface.pixel_density = sanitize_density(density);
        self.reconfigure(renderer);
    }

    /// Re-emit the current size, e.g. after the output surface was lost.
    /// A queued resize takes precedence over the current size.
    pub fn reconfigure<R: Renderer + ?Sized>(&mut self, renderer: &mut R) {
        let (width, height) = self
            .pending
            .take()
            .unwrap_or((self.surface.width, self.surface.height));
        self.on_resize(width, height, renderer);
    }

    fn update_aspect(&mut self) {
        if !self.surface.is_degenerate() {
            self.camera.aspect = self.surface.width as f32 / self.surface.height as f32;
        }
    }
}

fn sanitize_density(density: f64) -> f64 {
    if density.is_finite() && density > 0.0 {
        density
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{render::RenderError, scene::Scene};

    #[derive(Default)]
    struct Resizes(Vec<(u32, u32, f64)>);

    impl Renderer for Resizes {
        fn resize(&mut self, width: u32, height: u32, pixel_density: f64) {
            self.0.push((width, height, pixel_density));
        }

        fn draw_frame(&mut self, _: &Scene, _: &Camera) -> Result<(), RenderError> {
            Ok(())
        }
    }

    fn viewport(density: f64) -> ViewportController {
        ViewportController::new(
            Camera::new(75.0, 1.0, 0.1, 100.0),
            Surface {
                width: 0,
                height: 0,
                pixel_density: density,
            },
            2.0,
        )
    }

    #[test]
    fn resize_is_idempotent() {
        let mut vp = viewport(1.0);
        let mut renderer = Resizes::default();
        vp.on_resize(800, 600, &mut renderer);
        vp.on_resize(800, 600, &mut renderer);
        assert_relative_eq!(vp.camera().aspect, 800.0 / 600.0);
        assert_eq!(renderer.0, vec![(800, 600, 1.0), (800, 600, 1.0)]);
    }

    #[test]
    fn zero_height_keeps_the_last_aspect() {
        let mut vp = viewport(1.0);
        let mut renderer = Resizes::default();
        vp.on_resize(800, 600, &mut renderer);
        vp.on_resize(800, 0, &mut renderer);
        assert!(vp.camera().aspect.is_finite());
        assert_relative_eq!(vp.camera().aspect, 800.0 / 600.0);
        assert_eq!(renderer.0.len(), 1);
        assert_eq!(vp.surface().height, 0);
    }

    #[test]
    fn pixel_density_is_capped() {
        let mut vp = viewport(3.0);
        let mut renderer = Resizes::default();
        vp.on_resize(1024, 768, &mut renderer);
        assert_eq!(renderer.0, vec![(1024, 768, 2.0)]);
        assert_eq!(vp.surface().pixel_density, 3.0);
    }

    #[test]
    fn broken_densities_fall_back_to_one() {
        let mut vp = viewport(1.0);
        let mut renderer = Resizes::default();
        vp.on_resize(640, 480, &mut renderer);
        vp.set_pixel_density(f64::NAN, &mut renderer);
        vp.set_pixel_density(-2.0, &mut renderer);
        vp.set_pixel_density(1.5, &mut renderer);
        let densities: Vec<f64> = renderer.0.iter().map(|r| r.2).collect();
        assert_eq!(densities, vec![1.0, 1.0, 1.0, 1.5]);
    }

    #[test]
    fn density_change_keeps_a_queued_resize() {
        let mut vp = viewport(1.0);
        let mut renderer = Resizes::default();
        vp.on_resize(800, 600, &mut renderer);
        vp.request_resize(1000, 500);
        vp.set_pixel_density(1.5, &mut renderer);
        assert!(!vp.has_pending());
        assert_eq!(vp.surface().width, 1000);
        assert_relative_eq!(vp.camera().aspect, 2.0);
        assert_eq!(renderer.0.last(), Some(&(1000, 500, 1.5)));
    }

    #[test]
    fn queued_resizes_apply_once_and_last_wins() {
        let mut vp = viewport(1.0);
        let mut renderer = Resizes::default();
        vp.request_resize(300, 300);
        vp.request_resize(400, 200);
        assert!(vp.has_pending());
        assert!(vp.apply_pending(&mut renderer));
        assert!(!vp.apply_pending(&mut renderer));
        assert_eq!(renderer.0, vec![(400, 200, 1.0)]);
        assert_relative_eq!(vp.camera().aspect, 2.0);
    }
}
