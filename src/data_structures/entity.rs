//! Entities: everything that can be placed in the scene graph.
//!
//! An [`Entity`] is a mesh, a light or a plain group. Meshes reference a
//! [`Geometry`] description and a [`Material`]; the GPU resources behind them
//! are created lazily by the renderer, so entities stay cheap to clone and easy
//! to test.

use cgmath::Rotation3;

use crate::{data_structures::transform::Transform, resources::texture::TextureRef};

/// An sRGB colour with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// `Color::hex(0xb9d5ff)`
    pub const fn hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    /// Parses `#rgb` and `#rrggbb` (the leading `#` is optional).
    pub fn parse(css: &str) -> Option<Self> {
        let digits = css.strip_prefix('#').unwrap_or(css);
        match digits.len() {
            6 => u32::from_str_radix(digits, 16).ok().map(Self::hex),
            3 => {
                let short = u32::from_str_radix(digits, 16).ok()?;
                let expand = |nibble: u32| (nibble << 4) | nibble;
                let r = expand((short >> 8) & 0xf);
                let g = expand((short >> 4) & 0xf);
                let b = expand(short & 0xf);
                Some(Self::hex((r << 16) | (g << 8) | b))
            }
            _ => None,
        }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::rgb(self.r * factor, self.g * factor, self.b * factor)
    }

    /// Converts to linear space for shading into an sRGB surface.
    pub fn to_linear(self) -> [f32; 3] {
        fn channel(c: f32) -> f32 {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        [channel(self.r), channel(self.g), channel(self.b)]
    }

    pub fn to_linear_rgba(self) -> [f32; 4] {
        let [r, g, b] = self.to_linear();
        [r, g, b, 1.0]
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        let [r, g, b] = self.to_linear();
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Shape descriptions. The renderer turns each distinct one into a GPU mesh once.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Geometry {
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    /// A plane in the local XY plane facing +z.
    Plane { width: f32, height: f32 },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    /// A cone standing on the XZ plane, centred on its half height.
    Cone {
        radius: f32,
        height: f32,
        radial_segments: u32,
    },
}

/// Bitwise identity of a [`Geometry`], usable as a cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryKey(u8, [u32; 3]);

impl Geometry {
    pub fn cube(size: f32) -> Self {
        Geometry::Box {
            width: size,
            height: size,
            depth: size,
        }
    }

    pub fn key(&self) -> GeometryKey {
        match *self {
            Geometry::Box {
                width,
                height,
                depth,
            } => GeometryKey(0, [width.to_bits(), height.to_bits(), depth.to_bits()]),
            Geometry::Plane { width, height } => {
                GeometryKey(1, [width.to_bits(), height.to_bits(), 0])
            }
            Geometry::Sphere {
                radius,
                width_segments,
                height_segments,
            } => GeometryKey(2, [radius.to_bits(), width_segments, height_segments]),
            Geometry::Cone {
                radius,
                height,
                radial_segments,
            } => GeometryKey(3, [radius.to_bits(), height.to_bits(), radial_segments]),
        }
    }
}

/// Surface parameters of a mesh.
#[derive(Clone, Debug, Default)]
pub struct Material {
    pub colour: Color,
    /// Multiplied with `colour`. Renders as plain `colour` until the texture is ready.
    pub map: Option<TextureRef>,
}

impl Material {
    pub fn coloured(colour: Color) -> Self {
        Self { colour, map: None }
    }

    pub fn with_map(mut self, map: TextureRef) -> Self {
        self.map = Some(map);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    Ambient,
    /// Shines from its world position towards the origin.
    Directional,
    /// `distance == 0.0` means no cut-off.
    Point { distance: f32, decay: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub colour: Color,
    pub intensity: f32,
}

impl Light {
    pub fn ambient(colour: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            colour,
            intensity,
        }
    }

    pub fn directional(colour: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            colour,
            intensity,
        }
    }

    pub fn point(colour: Color, intensity: f32, distance: f32) -> Self {
        Self {
            kind: LightKind::Point {
                distance,
                decay: 1.0,
            },
            colour,
            intensity,
        }
    }
}

#[derive(Clone, Debug)]
pub enum EntityKind {
    Mesh {
        geometry: Geometry,
        material: Material,
    },
    Light(Light),
    Group,
}

/// A positioned, renderable or light-emitting object.
#[derive(Clone, Debug)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    pub transform: Transform,
    /// Hiding an entity hides its descendants as well.
    pub visible: bool,
}

impl Entity {
    fn with_kind(kind: EntityKind) -> Self {
        Self {
            name: String::new(),
            kind,
            transform: Transform::new(),
            visible: true,
        }
    }

    pub fn mesh(geometry: Geometry, material: Material) -> Self {
        Self::with_kind(EntityKind::Mesh { geometry, material })
    }

    pub fn light(light: Light) -> Self {
        Self::with_kind(EntityKind::Light(light))
    }

    pub fn group() -> Self {
        Self::with_kind(EntityKind::Group)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.position = cgmath::Vector3::new(x, y, z);
        self
    }

    pub fn rotated_x(mut self, angle: f32) -> Self {
        self.transform.rotation =
            self.transform.rotation * cgmath::Quaternion::from_angle_x(cgmath::Rad(angle));
        self
    }

    pub fn rotated_y(mut self, angle: f32) -> Self {
        self.transform.rotation =
            self.transform.rotation * cgmath::Quaternion::from_angle_y(cgmath::Rad(angle));
        self
    }

    pub fn rotated_z(mut self, angle: f32) -> Self {
        self.transform.rotation =
            self.transform.rotation * cgmath::Quaternion::from_angle_z(cgmath::Rad(angle));
        self
    }

    pub fn scaled(mut self, factor: f32) -> Self {
        self.transform.scale = cgmath::Vector3::new(factor, factor, factor);
        self
    }

    pub fn light_params(&self) -> Option<&Light> {
        match &self.kind {
            EntityKind::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn light_params_mut(&mut self) -> Option<&mut Light> {
        match &mut self.kind {
            EntityKind::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, EntityKind::Group)
    }
}
