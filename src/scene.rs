//! Everything one frame draws and updates, bundled as a single owned value.

use crate::{
    animation::AnimationDriver,
    binding::ControlPanel,
    camera::Camera,
    data_structures::{entity::Color, scene_graph::SceneObjectRegistry},
};

/// Linear fog between `near` and `far` (world units from the camera).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fog {
    pub colour: Color,
    pub near: f32,
    pub far: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Environment {
    pub clear_colour: Color,
    pub fog: Option<Fog>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            clear_colour: Color::BLACK,
            fog: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    pub objects: SceneObjectRegistry,
    pub animations: AnimationDriver,
    pub controls: ControlPanel,
    pub environment: Environment,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fog that also sets the clear colour, so the horizon blends into the background.
    pub fn with_fog(mut self, colour: Color, near: f32, far: f32) -> Self {
        self.environment = Environment {
            clear_colour: colour,
            fog: Some(Fog { colour, near, far }),
        };
        self
    }

    /// One simulation step at `t` seconds: bindings, animation, then world transforms.
    pub fn advance(&mut self, t: f32) {
        self.controls.sync(&mut self.objects);
        self.animations.apply(t, &mut self.objects);
        self.objects.update_world_transforms();
    }
}

/// A scene together with the camera it is first viewed through.
#[derive(Debug)]
pub struct Composition {
    pub scene: Scene,
    pub camera: Camera,
}
