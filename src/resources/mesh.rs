use std::f32::consts::{PI, TAU};

use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::{entity::Geometry, model};

/// Vertices and triangle indices of a [`Geometry`], counter-clockwise front faces.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<model::ModelVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn build(geometry: &Geometry) -> Self {
        match *geometry {
            Geometry::Box {
                width,
                height,
                depth,
            } => box_mesh(width, height, depth),
            Geometry::Plane { width, height } => plane_mesh(width, height),
            Geometry::Sphere {
                radius,
                width_segments,
                height_segments,
            } => sphere_mesh(radius, width_segments.max(3), height_segments.max(2)),
            Geometry::Cone {
                radius,
                height,
                radial_segments,
            } => cone_mesh(radius, height, radial_segments.max(3)),
        }
    }

    fn push_quad(&mut self, corners: [model::ModelVertex; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&corners);
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// Upload the generated mesh of `geometry`.
pub fn upload(device: &wgpu::Device, geometry: &Geometry) -> model::Mesh {
    let data = MeshData::build(geometry);
    let name = format!("{:?}", geometry);

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} Vertex Buffer", name)),
        contents: bytemuck::cast_slice(&data.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} Index Buffer", name)),
        contents: bytemuck::cast_slice(&data.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    model::Mesh {
        name,
        vertex_buffer,
        index_buffer,
        num_elements: data.indices.len() as u32,
    }
}

fn vertex(position: Vector3<f32>, tex_coords: [f32; 2], normal: Vector3<f32>) -> model::ModelVertex {
    model::ModelVertex {
        position: position.into(),
        tex_coords,
        normal: normal.into(),
    }
}

/// One face of an axis-aligned box: the outward normal and two in-plane axes with `u x v == normal`.
fn face(
    mesh: &mut MeshData,
    half: Vector3<f32>,
    normal: Vector3<f32>,
    u: Vector3<f32>,
    v: Vector3<f32>,
) {
    let corner = |su: f32, sv: f32| {
        let p = normal + u * su + v * sv;
        let position = Vector3::new(p.x * half.x, p.y * half.y, p.z * half.z);
        vertex(position, [(su + 1.0) / 2.0, (1.0 - sv) / 2.0], normal)
    };
    mesh.push_quad([
        corner(-1.0, -1.0),
        corner(1.0, -1.0),
        corner(1.0, 1.0),
        corner(-1.0, 1.0),
    ]);
}

fn box_mesh(width: f32, height: f32, depth: f32) -> MeshData {
    let half = Vector3::new(width, height, depth) / 2.0;
    let (x, y, z) = (Vector3::unit_x(), Vector3::unit_y(), Vector3::unit_z());
    let mut mesh = MeshData::default();
    face(&mut mesh, half, x, -z, y);
    face(&mut mesh, half, -x, z, y);
    face(&mut mesh, half, y, x, -z);
    face(&mut mesh, half, -y, x, z);
    face(&mut mesh, half, z, x, y);
    face(&mut mesh, half, -z, -x, y);
    mesh
}

fn plane_mesh(width: f32, height: f32) -> MeshData {
    let mut mesh = MeshData::default();
    let (w, h) = (width / 2.0, height / 2.0);
    let n = Vector3::unit_z();
    mesh.push_quad([
        vertex(Vector3::new(-w, -h, 0.0), [0.0, 1.0], n),
        vertex(Vector3::new(w, -h, 0.0), [1.0, 1.0], n),
        vertex(Vector3::new(w, h, 0.0), [1.0, 0.0], n),
        vertex(Vector3::new(-w, h, 0.0), [0.0, 0.0], n),
    ]);
    mesh
}

fn sphere_mesh(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let mut mesh = MeshData::default();
    let row = width_segments + 1;

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let theta = v * PI;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * TAU;
            let normal = Vector3::new(
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            );
            mesh.vertices
                .push(vertex(normal * radius, [u, v], normal.normalize()));
        }
    }

    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            // The pole rows collapse to single triangles.
            if iy != 0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    mesh
}

fn cone_mesh(radius: f32, height: f32, radial_segments: u32) -> MeshData {
    let mut mesh = MeshData::default();
    let half = height / 2.0;
    let slope = if height > 0.0 { radius / height } else { 0.0 };
    let ring = |i: u32| {
        let theta = i as f32 / radial_segments as f32 * TAU;
        (theta.sin(), theta.cos())
    };

    // Sides: one apex vertex per segment so every face gets its own normal.
    for i in 0..radial_segments {
        let (s0, c0) = ring(i);
        let (s1, c1) = ring(i + 1);
        let mid = (i as f32 + 0.5) / radial_segments as f32 * TAU;
        let base = mesh.vertices.len() as u32;
        let u0 = i as f32 / radial_segments as f32;
        let u1 = (i + 1) as f32 / radial_segments as f32;
        mesh.vertices.extend_from_slice(&[
            vertex(
                Vector3::new(0.0, half, 0.0),
                [(u0 + u1) / 2.0, 0.0],
                Vector3::new(mid.sin(), slope, mid.cos()).normalize(),
            ),
            vertex(
                Vector3::new(radius * s0, -half, radius * c0),
                [u0, 1.0],
                Vector3::new(s0, slope, c0).normalize(),
            ),
            vertex(
                Vector3::new(radius * s1, -half, radius * c1),
                [u1, 1.0],
                Vector3::new(s1, slope, c1).normalize(),
            ),
        ]);
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    // Bottom cap
    let down = -Vector3::unit_y();
    let centre = mesh.vertices.len() as u32;
    mesh.vertices
        .push(vertex(Vector3::new(0.0, -half, 0.0), [0.5, 0.5], down));
    for i in 0..=radial_segments {
        let (s, c) = ring(i);
        mesh.vertices.push(vertex(
            Vector3::new(radius * s, -half, radius * c),
            [(s + 1.0) / 2.0, (c + 1.0) / 2.0],
            down,
        ));
    }
    for i in 0..radial_segments {
        let current = centre + 1 + i;
        mesh.indices
            .extend_from_slice(&[centre, current + 1, current]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn check_well_formed(mesh: &MeshData) {
        assert_eq!(mesh.indices.len() % 3, 0);
        let n = mesh.vertices.len() as u32;
        assert!(mesh.indices.iter().all(|i| *i < n));
        for v in &mesh.vertices {
            assert_relative_eq!(Vector3::from(v.normal).magnitude(), 1.0, epsilon = 1e-5);
        }
    }

    /// Each triangle's winding must agree with the stored vertex normals.
    fn check_outward_winding(mesh: &MeshData) {
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
            let e1 = Vector3::from(b.position) - Vector3::from(a.position);
            let e2 = Vector3::from(c.position) - Vector3::from(a.position);
            let face_normal = e1.cross(e2);
            let stored = Vector3::from(a.normal) + Vector3::from(b.normal) + Vector3::from(c.normal);
            assert!(face_normal.dot(stored) > 0.0, "triangle {:?} winds inwards", tri);
        }
    }

    #[test]
    fn box_has_six_quads() {
        let mesh = MeshData::build(&Geometry::Box {
            width: 4.0,
            height: 2.5,
            depth: 4.0,
        });
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        check_well_formed(&mesh);
        check_outward_winding(&mesh);
        let top = mesh.vertices.iter().map(|v| v.position[1]).fold(f32::MIN, f32::max);
        assert_relative_eq!(top, 1.25);
    }

    #[test]
    fn plane_faces_positive_z() {
        let mesh = MeshData::build(&Geometry::Plane {
            width: 20.0,
            height: 20.0,
        });
        check_well_formed(&mesh);
        check_outward_winding(&mesh);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn sphere_vertices_sit_on_the_radius() {
        let mesh = MeshData::build(&Geometry::Sphere {
            radius: 0.5,
            width_segments: 16,
            height_segments: 16,
        });
        check_well_formed(&mesh);
        check_outward_winding(&mesh);
        for v in &mesh.vertices {
            assert_relative_eq!(Vector3::from(v.position).magnitude(), 0.5, epsilon = 1e-5);
        }
        // Two pole rows of single triangles plus full quads in between.
        assert_eq!(mesh.indices.len(), (16 * 2 + 16 * 14 * 2) * 3);
    }

    #[test]
    fn four_sided_cone_is_a_pyramid() {
        let mesh = MeshData::build(&Geometry::Cone {
            radius: 3.5,
            height: 1.0,
            radial_segments: 4,
        });
        check_well_formed(&mesh);
        check_outward_winding(&mesh);
        assert_eq!(mesh.indices.len(), (4 + 4) * 3);
    }

    #[test]
    fn degenerate_segment_counts_are_raised() {
        let mesh = MeshData::build(&Geometry::Cone {
            radius: 1.0,
            height: 1.0,
            radial_segments: 0,
        });
        check_well_formed(&mesh);
        assert_eq!(mesh.indices.len(), (3 + 3) * 3);
    }
}
