//! The rendering seam and the batching that feeds it.
//!
//! [`Renderer`] is everything the frame loop and the viewport need from a back
//! end. [`collect_render_list`] flattens a [`SceneObjectRegistry`] into what a
//! GPU renderer draws: one [`Batch`] per distinct geometry and colour map, with
//! per-instance world matrices and colours, plus the [`LightSet`].
//!
//! Batching is pure so it can be tested without a device.

use std::collections::HashMap;

use cgmath::{InnerSpace, Vector3};
use log::warn;

use crate::{
    camera::Camera,
    data_structures::{
        entity::{Color, EntityKind, Geometry, GeometryKey, LightKind},
        scene_graph::SceneObjectRegistry,
        transform::InstanceRaw,
    },
    resources::texture::TextureRef,
    scene::Scene,
};

/// Point lights beyond this count are not shaded.
pub const MAX_POINT_LIGHTS: usize = 8;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("the output surface was lost")]
    Lost,
    #[error("the output surface is outdated")]
    Outdated,
    #[error("timed out waiting for the next surface texture")]
    Timeout,
    #[error("renderer failure: {0}")]
    Fatal(String),
}

impl RenderError {
    /// Lost and outdated surfaces come back after reconfiguring.
    pub fn needs_reconfigure(&self) -> bool {
        matches!(self, RenderError::Lost | RenderError::Outdated)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::Fatal(_))
    }
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(err: wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost => RenderError::Lost,
            wgpu::SurfaceError::Outdated => RenderError::Outdated,
            wgpu::SurfaceError::Timeout => RenderError::Timeout,
            other => RenderError::Fatal(other.to_string()),
        }
    }
}

/// A drawing back end.
pub trait Renderer {
    /// `width` and `height` are logical pixels; the back buffer is `round(logical * pixel_density)`.
    fn resize(&mut self, width: u32, height: u32, pixel_density: f64);

    fn draw_frame(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn resize(&mut self, width: u32, height: u32, pixel_density: f64) {
        (**self).resize(width, height, pixel_density)
    }

    fn draw_frame(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        (**self).draw_frame(scene, camera)
    }
}

/// Visible meshes sharing a geometry and colour map.
#[derive(Debug, Clone)]
pub struct Batch {
    pub geometry: Geometry,
    pub map: Option<TextureRef>,
    pub instances: Vec<InstanceRaw>,
}

impl Batch {
    pub fn key(&self) -> (GeometryKey, Option<&str>) {
        (self.geometry.key(), self.map.as_ref().map(|m| m.path()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Unit vector the light travels along.
    pub direction: Vector3<f32>,
    pub colour: Color,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vector3<f32>,
    pub colour: Color,
    pub intensity: f32,
    pub distance: f32,
    pub decay: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightSet {
    /// Sum of all ambient lights, linear RGB premultiplied by intensity.
    pub ambient: [f32; 3],
    pub directional: Option<DirectionalLight>,
    pub points: Vec<PointLight>,
}

#[derive(Debug, Clone, Default)]
pub struct RenderList {
    pub batches: Vec<Batch>,
    pub lights: LightSet,
}

impl RenderList {
    pub fn instance_count(&self) -> usize {
        self.batches.iter().map(|b| b.instances.len()).sum()
    }
}

/// Uses world transforms and visibility from the last
/// [`update_world_transforms`](SceneObjectRegistry::update_world_transforms).
pub fn collect_render_list(registry: &SceneObjectRegistry) -> RenderList {
    let mut list = RenderList::default();
    let mut batch_index: HashMap<(GeometryKey, Option<String>), usize> = HashMap::new();
    let mut dropped_points = 0;
    let mut extra_directionals = 0;

    for (id, entity) in registry.all() {
        if !registry.is_visible(id) {
            continue;
        }
        let Some(world) = registry.world_transform(id) else {
            continue;
        };
        match &entity.kind {
            EntityKind::Mesh { geometry, material } => {
                let key = (
                    geometry.key(),
                    material.map.as_ref().map(|m| m.path().to_string()),
                );
                let idx = *batch_index.entry(key).or_insert_with(|| {
                    list.batches.push(Batch {
                        geometry: *geometry,
                        map: material.map.clone(),
                        instances: Vec::new(),
                    });
                    list.batches.len() - 1
                });
                list.batches[idx]
                    .instances
                    .push(world.to_raw(material.colour));
            }
            EntityKind::Light(light) => match light.kind {
                LightKind::Ambient => {
                    let linear = light.colour.to_linear();
                    for (sum, c) in list.lights.ambient.iter_mut().zip(linear) {
                        *sum += c * light.intensity;
                    }
                }
                LightKind::Directional => {
                    if list.lights.directional.is_some() {
                        extra_directionals += 1;
                        continue;
                    }
                    let towards_origin = -world.position;
                    let direction = if towards_origin.magnitude2() > f32::EPSILON {
                        towards_origin.normalize()
                    } else {
                        -Vector3::unit_y()
                    };
                    list.lights.directional = Some(DirectionalLight {
                        direction,
                        colour: light.colour,
                        intensity: light.intensity,
                    });
                }
                LightKind::Point { distance, decay } => {
                    if list.lights.points.len() == MAX_POINT_LIGHTS {
                        dropped_points += 1;
                        continue;
                    }
                    list.lights.points.push(PointLight {
                        position: world.position,
                        colour: light.colour,
                        intensity: light.intensity,
                        distance,
                        decay,
                    });
                }
            },
            EntityKind::Group => {}
        }
    }

    if dropped_points > 0 {
        warn!(
            "{} point lights exceed the limit of {} and are not shaded",
            dropped_points, MAX_POINT_LIGHTS
        );
    }
    if extra_directionals > 0 {
        warn!(
            "Only one directional light is shaded, ignoring {} more",
            extra_directionals
        );
    }
    list
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::data_structures::{
        entity::{Entity, Light, Material},
        scene_graph::EntityId,
    };

    fn grey_cube() -> Entity {
        Entity::mesh(Geometry::cube(1.0), Material::coloured(Color::hex(0x999999)))
    }

    #[test]
    fn equal_geometry_shares_a_batch() {
        let mut registry = SceneObjectRegistry::new();
        registry.add_to_root(grey_cube().at(1.0, 0.0, 0.0));
        registry.add_to_root(grey_cube().at(-1.0, 0.0, 0.0));
        registry.add_to_root(Entity::mesh(
            Geometry::cube(2.0),
            Material::coloured(Color::WHITE),
        ));
        registry.update_world_transforms();

        let list = collect_render_list(&registry);
        assert_eq!(list.batches.len(), 2);
        assert_eq!(list.batches[0].instances.len(), 2);
        assert_eq!(list.batches[0].instances[1].model()[3][0], -1.0);
        assert_eq!(list.instance_count(), 3);
    }

    #[test]
    fn colour_maps_split_batches() {
        let mut registry = SceneObjectRegistry::new();
        let bricks = TextureRef::pending("bricks/color.jpg");
        registry.add_to_root(grey_cube());
        registry.add_to_root(Entity::mesh(
            Geometry::cube(1.0),
            Material::coloured(Color::WHITE).with_map(bricks.clone()),
        ));
        registry.add_to_root(Entity::mesh(
            Geometry::cube(1.0),
            Material::coloured(Color::WHITE).with_map(bricks),
        ));
        registry.update_world_transforms();

        let list = collect_render_list(&registry);
        assert_eq!(list.batches.len(), 2);
        assert_eq!(list.batches[1].key().1, Some("bricks/color.jpg"));
        assert_eq!(list.batches[1].instances.len(), 2);
    }

    #[test]
    fn hidden_groups_hide_meshes_and_lights() {
        let mut registry = SceneObjectRegistry::new();
        let mut hidden = Entity::group();
        hidden.visible = false;
        let group = registry.add_to_root(hidden);
        registry.add(grey_cube(), group).unwrap();
        registry
            .add(Entity::light(Light::point(Color::WHITE, 1.0, 3.0)), group)
            .unwrap();
        registry.update_world_transforms();

        let list = collect_render_list(&registry);
        assert!(list.batches.is_empty());
        assert!(list.lights.points.is_empty());
    }

    #[test]
    fn lights_are_gathered_in_world_space() {
        let mut registry = SceneObjectRegistry::new();
        registry.add_to_root(Entity::light(Light::ambient(Color::WHITE, 0.25)));
        registry.add_to_root(Entity::light(Light::ambient(Color::WHITE, 0.5)));
        registry.add_to_root(Entity::light(Light::directional(Color::WHITE, 1.0)).at(0.0, 5.0, 0.0));
        let group = registry.add_to_root(Entity::group().at(0.0, 1.0, 0.0));
        registry
            .add(
                Entity::light(Light::point(Color::hex(0xff7d46), 1.0, 7.0)).at(0.0, 2.2, 2.7),
                group,
            )
            .unwrap();
        registry.update_world_transforms();

        let lights = collect_render_list(&registry).lights;
        assert_relative_eq!(lights.ambient[0], 0.75);
        let directional = lights.directional.unwrap();
        assert_relative_eq!(directional.direction.y, -1.0);
        assert_eq!(lights.points.len(), 1);
        assert_relative_eq!(lights.points[0].position.y, 3.2, epsilon = 1e-5);
        assert_eq!(lights.points[0].distance, 7.0);
    }

    #[test]
    fn point_lights_are_capped() {
        let mut registry = SceneObjectRegistry::new();
        let ids: Vec<EntityId> = (0..MAX_POINT_LIGHTS + 3)
            .map(|i| {
                registry.add_to_root(
                    Entity::light(Light::point(Color::WHITE, 1.0, 0.0)).at(i as f32, 0.0, 0.0),
                )
            })
            .collect();
        registry.update_world_transforms();

        let lights = collect_render_list(&registry).lights;
        assert_eq!(ids.len(), 11);
        assert_eq!(lights.points.len(), MAX_POINT_LIGHTS);
        // first come, first served
        assert_eq!(lights.points[7].position.x, 7.0);
    }

    #[test]
    fn surface_errors_map_to_render_errors() {
        assert_eq!(RenderError::from(wgpu::SurfaceError::Lost), RenderError::Lost);
        assert!(RenderError::from(wgpu::SurfaceError::Outdated).needs_reconfigure());
        assert!(!RenderError::Timeout.is_fatal());
        assert!(RenderError::from(wgpu::SurfaceError::OutOfMemory).is_fatal());
    }
}
