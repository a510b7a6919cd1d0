//! Ready-made scenes.
//!
//! [`default_cube`] is the starter scene: one grey cube looked at from above.
//! [`haunted_house`] is the full haunted house with its graveyard, moon light
//! debug controls and three ghost lights circling the house.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

use cgmath::Point3;
use log::warn;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    animation::{OrbitPath, SineTerm},
    binding::{BindingError, NumberProperty},
    camera::Camera,
    data_structures::{
        entity::{Color, Entity, Geometry, Light, Material},
        scene_graph::EntityId,
    },
    resources::texture::TextureLoader,
    scene::{Composition, Scene},
};

pub const GRAVE_COUNT: usize = 50;
const GRAVE_SEED: u64 = 0x6861_756e_74;

pub const FOG_COLOUR: Color = Color::hex(0x262837);
const MOON_COLOUR: Color = Color::hex(0xb9d5ff);

/// One grey unit cube; a full white ambient light leaves its colour unshaded.
pub fn default_cube() -> Composition {
    let mut scene = Scene::new();
    scene
        .objects
        .add_to_root(Entity::mesh(Geometry::cube(1.0), Material::coloured(Color::hex(0x999999))).named("cube"));
    scene
        .objects
        .add_to_root(Entity::light(Light::ambient(Color::WHITE, 1.0)).named("ambient"));

    let mut camera = Camera::new(75.0, 1.0, 0.1, 100.0).at(3.0, 3.0, -3.0);
    camera.look_at(Point3::new(0.0, 0.0, 0.0));

    Composition { scene, camera }
}

pub fn haunted_house(loader: &TextureLoader) -> Composition {
    let mut scene = Scene::new().with_fog(FOG_COLOUR, 1.0, 15.0);
    let objects = &mut scene.objects;

    objects.add_to_root(
        Entity::mesh(
            Geometry::Plane {
                width: 20.0,
                height: 20.0,
            },
            Material::coloured(Color::hex(0xa9c388)),
        )
        .named("floor")
        .rotated_x(-FRAC_PI_2),
    );

    let house = objects.add_to_root(Entity::group().named("house"));
    let parts = [
        Entity::mesh(
            Geometry::Box {
                width: 4.0,
                height: 2.5,
                depth: 4.0,
            },
            Material::coloured(Color::hex(0xac8e82)),
        )
        .named("walls")
        .at(0.0, 1.25, 0.0),
        Entity::mesh(
            Geometry::Cone {
                radius: 3.5,
                height: 1.0,
                radial_segments: 4,
            },
            Material::coloured(Color::hex(0xb35f45)),
        )
        .named("roof")
        .at(0.0, 3.0, 0.0)
        .rotated_y(FRAC_PI_4),
        Entity::mesh(
            Geometry::Plane {
                width: 2.2,
                height: 2.2,
            },
            Material::coloured(Color::hex(0xaa7b7b)).with_map(loader.load("textures/door/color.jpg")),
        )
        .named("door")
        .at(0.0, 1.0, 2.01),
    ];
    let bushes = [
        ((0.8, 0.2, 2.2), 0.5),
        ((1.4, 0.1, 2.1), 0.25),
        ((-0.8, 0.1, 2.2), 0.4),
        ((-1.0, 0.05, 2.6), 0.15),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, ((x, y, z), scale))| {
        Entity::mesh(
            Geometry::Sphere {
                radius: 1.0,
                width_segments: 16,
                height_segments: 16,
            },
            Material::coloured(Color::hex(0x89c854)),
        )
        .named(format!("bush {}", i + 1))
        .at(x, y, z)
        .scaled(scale)
    });
    for part in parts.into_iter().chain(bushes) {
        if let Err(err) = objects.add(part, house) {
            warn!("Skipping house part: {}", err);
        }
    }

    let graves = objects.add_to_root(Entity::group().named("graves"));
    let mut rng = StdRng::seed_from_u64(GRAVE_SEED);
    for i in 0..GRAVE_COUNT {
        let angle = rng.gen_range(0.0..1.0) * TAU;
        let radius = 3.0 + rng.gen_range(0.0..1.0) * 6.0;
        let tilt_z = (rng.gen_range(0.0..1.0) - 0.5) * 0.4;
        let tilt_y = (rng.gen_range(0.0..1.0) - 0.5) * 0.4;
        let grave = Entity::mesh(
            Geometry::Box {
                width: 0.6,
                height: 0.8,
                depth: 0.2,
            },
            Material::coloured(Color::hex(0xb2b6b1)),
        )
        .named(format!("grave {}", i + 1))
        .at(angle.sin() * radius, 0.3, angle.cos() * radius)
        .rotated_y(tilt_y)
        .rotated_z(tilt_z);
        if let Err(err) = objects.add(grave, graves) {
            warn!("Skipping grave {}: {}", i + 1, err);
        }
    }

    objects.add_to_root(Entity::light(Light::ambient(MOON_COLOUR, 0.12)).named("ambient light"));
    let moon = objects.add_to_root(
        Entity::light(Light::directional(MOON_COLOUR, 0.12))
            .named("moon light")
            .at(4.0, 5.0, -2.0),
    );
    objects.add_to_root(
        Entity::light(Light::point(Color::hex(0xff7d46), 1.0, 7.0))
            .named("door light")
            .at(0.0, 2.2, 2.7),
    );

    let ghosts = [
        (Color::hex(0xff00ff), OrbitPath::circle(0.5, 4.0).bobbing(1.0, 3.0)),
        (
            Color::hex(0x00ffff),
            OrbitPath::circle(-0.32, 5.0)
                .bobbing(1.0, 4.0)
                .bobbing(1.0, 2.5),
        ),
        (
            Color::hex(0xffff00),
            OrbitPath::circle(-0.18, 7.0)
                .wobbling(SineTerm::new(1.0, 0.32), SineTerm::new(1.0, 0.5))
                .bobbing(1.0, 4.0)
                .bobbing(1.0, 2.5),
        ),
    ];
    for (i, (colour, path)) in ghosts.into_iter().enumerate() {
        let ghost =
            objects.add_to_root(Entity::light(Light::point(colour, 2.0, 3.0)).named(format!("ghost {}", i + 1)));
        scene.animations.animate(ghost, path);
    }

    if let Err(err) = moon_controls(&mut scene, moon) {
        warn!("Moon light controls unavailable: {}", err);
    }
    scene.objects.update_world_transforms();

    let camera = Camera::new(75.0, 1.0, 0.1, 100.0).at(4.0, 2.0, 5.0);
    Composition { scene, camera }
}

fn moon_controls(scene: &mut Scene, moon: EntityId) -> Result<(), BindingError> {
    let Scene {
        objects, controls, ..
    } = scene;
    controls.slider(
        "moon intensity",
        moon,
        NumberProperty::Intensity,
        (0.0, 1.0, 0.001),
        objects,
    )?;
    for (name, property) in [
        ("moon x", NumberProperty::PositionX),
        ("moon y", NumberProperty::PositionY),
        ("moon z", NumberProperty::PositionZ),
    ] {
        controls.slider(name, moon, property, (-5.0, 5.0, 0.001), objects)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        data_structures::entity::{EntityKind, LightKind},
        render::collect_render_list,
    };

    fn loader() -> TextureLoader {
        TextureLoader::new(tokio::runtime::Handle::current())
    }

    #[test]
    fn default_cube_looks_at_the_cube() {
        let Composition { scene, camera } = default_cube();
        let cube = scene.objects.find_by_name("cube").unwrap();
        assert_eq!(scene.objects.get(cube).unwrap().transform.position, cgmath::Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(camera.position, Point3::new(3.0, 3.0, -3.0));
        assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(camera.fovy, cgmath::Deg(75.0));
        assert_eq!((camera.znear, camera.zfar), (0.1, 100.0));
    }

    #[tokio::test]
    async fn haunted_house_has_its_parts() {
        let Composition { scene, .. } = haunted_house(&loader());
        let objects = &scene.objects;

        let house = objects.find_by_name("house").unwrap();
        assert_eq!(objects.children(house).len(), 3 + 4);
        let graves = objects.find_by_name("graves").unwrap();
        assert_eq!(objects.children(graves).len(), GRAVE_COUNT);

        let roof = objects.find_by_name("roof").unwrap();
        assert_relative_eq!(objects.world_transform(roof).unwrap().position.y, 3.0);

        assert_eq!(scene.animations.len(), 3);
        assert_eq!(scene.controls.len(), 4);
        assert_eq!(scene.environment.fog.unwrap().far, 15.0);
        assert_eq!(scene.environment.clear_colour, FOG_COLOUR);
    }

    #[tokio::test]
    async fn graves_are_reproducible_and_in_the_ring() {
        let first = haunted_house(&loader()).scene;
        let second = haunted_house(&loader()).scene;
        let graves = first.objects.find_by_name("graves").unwrap();
        for &grave in first.objects.children(graves) {
            let name = &first.objects.get(grave).unwrap().name;
            let a = first.objects.get(grave).unwrap().transform.position;
            let b = second
                .objects
                .get(second.objects.find_by_name(name).unwrap())
                .unwrap()
                .transform
                .position;
            assert_eq!(a, b);
            let radius = (a.x * a.x + a.z * a.z).sqrt();
            assert!((3.0..=9.0 + 1e-4).contains(&radius), "{} at {}", name, radius);
            assert_relative_eq!(a.y, 0.3);
        }
    }

    #[tokio::test]
    async fn lights_match_the_scene_setup() {
        let scene = haunted_house(&loader()).scene;
        let list = collect_render_list(&scene.objects);
        assert!(list.lights.directional.is_some());
        assert_eq!(list.lights.points.len(), 4);

        let door_light = scene.objects.find_by_name("door light").unwrap();
        match &scene.objects.get(door_light).unwrap().kind {
            EntityKind::Light(light) => {
                assert_eq!(light.kind, LightKind::Point { distance: 7.0, decay: 1.0 });
                assert_eq!(light.intensity, 1.0);
            }
            other => panic!("door light is {:?}", other),
        }
    }

    #[tokio::test]
    async fn moon_sliders_drive_the_light() {
        let mut scene = haunted_house(&loader()).scene;
        assert!(scene.controls.set("moon intensity", 0.5));
        assert!(scene.controls.set("moon y", 2.0));
        scene.advance(0.0);

        let moon = scene.objects.find_by_name("moon light").unwrap();
        let entity = scene.objects.get(moon).unwrap();
        assert_eq!(entity.light_params().unwrap().intensity, 0.5);
        assert_eq!(entity.transform.position.y, 2.0);
    }
}
