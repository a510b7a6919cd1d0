//! Perspective camera, its GPU uniform, and orbit controls.
//!
//! The camera looks from `position` at `target`. [`OrbitControls`] turns mouse
//! drags and wheel input into rotation and zoom around that target, eased by a
//! damping factor every frame.

use std::{f32::consts::PI, time::Duration};

use cgmath::{Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix, Vector3};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Converts OpenGL clip space (z in -1..1) to WGPU clip space (z in 0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Deg<f32>,
    /// Only ever written by the viewport controller after a positive resize.
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(fovy: f32, aspect: f32, znear: f32, zfar: f32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 1.0),
            target: Point3::origin(),
            up: Vector3::unit_y(),
            fovy: Deg(fovy),
            aspect,
            znear,
            zfar,
        }
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Point3::new(x, y, z);
        self
    }

    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = camera.view_proj().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotates and zooms a [`Camera`] around its target.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    /// Radians per dragged pixel.
    pub rotate_speed: f32,
    /// Fraction of the distance per wheel line.
    pub zoom_speed: f32,
    /// Share of the pending motion kept after one 60 Hz frame; 0 applies input instantly.
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar: f32,
    pub max_polar: f32,
    pub enabled: bool,

    dragging: bool,
    last_cursor: Option<(f64, f64)>,
    pending_azimuth: f32,
    pending_polar: f32,
    pending_zoom: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            damping: 0.9,
            min_distance: 0.5,
            max_distance: 50.0,
            min_polar: 0.01,
            max_polar: PI - 0.01,
            enabled: true,
            dragging: false,
            last_cursor: None,
            pending_azimuth: 0.0,
            pending_polar: 0.0,
            pending_zoom: 0.0,
        }
    }
}

impl OrbitControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the event was consumed.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.handle_mouse_button(*state == ElementState::Pressed);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor(position.x, position.y);
                self.dragging
            }
            WindowEvent::CursorLeft { .. } => {
                self.last_cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / 100.0) as f32,
                };
                self.handle_scroll(lines);
                true
            }
            _ => false,
        }
    }

    pub fn handle_mouse_button(&mut self, pressed: bool) {
        self.dragging = pressed;
    }

    pub fn handle_cursor(&mut self, x: f64, y: f64) {
        if let Some((last_x, last_y)) = self.last_cursor {
            if self.dragging && self.enabled {
                self.pending_azimuth -= (x - last_x) as f32 * self.rotate_speed;
                self.pending_polar -= (y - last_y) as f32 * self.rotate_speed;
            }
        }
        self.last_cursor = Some((x, y));
    }

    /// Positive lines zoom in.
    pub fn handle_scroll(&mut self, lines: f32) {
        if self.enabled {
            self.pending_zoom -= lines * self.zoom_speed;
        }
    }

    /// Moves the camera by the share of pending input that `dt` releases.
    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        let share = if self.damping <= 0.0 {
            1.0
        } else {
            1.0 - self.damping.clamp(0.0, 0.999).powf(dt.as_secs_f32() * 60.0)
        };
        let azimuth_step = self.pending_azimuth * share;
        let polar_step = self.pending_polar * share;
        let zoom_step = self.pending_zoom * share;
        self.pending_azimuth -= azimuth_step;
        self.pending_polar -= polar_step;
        self.pending_zoom -= zoom_step;

        let offset = camera.position - camera.target;
        let distance = offset.magnitude();
        if distance <= f32::EPSILON {
            return;
        }
        let azimuth = offset.x.atan2(offset.z) + azimuth_step;
        let polar = ((offset.y / distance).clamp(-1.0, 1.0).acos() + polar_step)
            .clamp(self.min_polar, self.max_polar);
        let distance =
            (distance * zoom_step.exp()).clamp(self.min_distance, self.max_distance);

        let direction = Vector3::new(
            polar.sin() * azimuth.sin(),
            polar.cos(),
            polar.sin() * azimuth.cos(),
        );
        camera.position = camera.target + direction * distance;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{MetricSpace, Vector4};

    use super::*;

    fn camera() -> Camera {
        Camera::new(75.0, 800.0 / 600.0, 0.1, 100.0).at(4.0, 2.0, 5.0)
    }

    #[test]
    fn target_projects_to_the_centre() {
        let cam = camera();
        let clip = cam.view_proj() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
        let depth = clip.z / clip.w;
        assert!((0.0..=1.0).contains(&depth), "{depth}");
    }

    #[test]
    fn idle_controls_leave_the_camera_alone() {
        let mut cam = camera();
        let before = cam.position;
        OrbitControls::new().update(&mut cam, Duration::from_millis(16));
        assert_relative_eq!(cam.position.x, before.x, epsilon = 1e-4);
        assert_relative_eq!(cam.position.y, before.y, epsilon = 1e-4);
        assert_relative_eq!(cam.position.z, before.z, epsilon = 1e-4);
    }

    #[test]
    fn dragging_orbits_at_constant_distance() {
        let mut cam = camera();
        let distance = cam.position.distance(cam.target);
        let mut controls = OrbitControls {
            damping: 0.0,
            ..OrbitControls::default()
        };
        controls.handle_mouse_button(true);
        controls.handle_cursor(100.0, 100.0);
        controls.handle_cursor(160.0, 120.0);
        controls.update(&mut cam, Duration::from_millis(16));
        assert!(cam.position.distance(Point3::new(4.0, 2.0, 5.0)) > 0.1);
        assert_relative_eq!(cam.position.distance(cam.target), distance, epsilon = 1e-4);
    }

    #[test]
    fn moving_without_a_button_does_nothing() {
        let mut cam = camera();
        let mut controls = OrbitControls::default();
        controls.handle_cursor(0.0, 0.0);
        controls.handle_cursor(300.0, 300.0);
        controls.update(&mut cam, Duration::from_secs(1));
        assert_relative_eq!(cam.position.x, 4.0, epsilon = 1e-4);
    }

    #[test]
    fn damping_spreads_input_over_frames() {
        let mut cam = camera();
        let mut controls = OrbitControls::default();
        controls.handle_scroll(3.0);
        let start = cam.position.distance(cam.target);
        controls.update(&mut cam, Duration::from_millis(16));
        let first = cam.position.distance(cam.target);
        for _ in 0..200 {
            controls.update(&mut cam, Duration::from_millis(16));
        }
        let settled = cam.position.distance(cam.target);
        assert!(first < start && settled < first);
        assert_relative_eq!(settled, start * (-0.3f32).exp(), epsilon = 1e-3);
    }

    #[test]
    fn zoom_and_polar_angle_are_clamped() {
        let mut cam = camera();
        let mut controls = OrbitControls {
            damping: 0.0,
            ..OrbitControls::default()
        };
        controls.handle_scroll(100.0);
        controls.handle_mouse_button(true);
        controls.handle_cursor(0.0, 0.0);
        controls.handle_cursor(0.0, 10_000.0);
        controls.update(&mut cam, Duration::from_millis(16));
        assert_relative_eq!(cam.position.distance(cam.target), controls.min_distance, epsilon = 1e-4);
        let offset = (cam.position - cam.target).normalize();
        assert!(offset.y.acos() >= controls.min_polar - 1e-4);
        assert!(offset.y.acos() <= controls.max_polar + 1e-4);
    }
}
