use wgpu::util::DeviceExt;

use crate::{
    render::{LightSet, MAX_POINT_LIGHTS, PointLight},
    scene::Environment,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightRaw {
    position: [f32; 3],
    intensity: f32,
    colour: [f32; 3],
    distance: f32,
    decay: f32,
    // Uniform array elements are 16 byte aligned
    _padding: [f32; 3],
}

impl From<&PointLight> for PointLightRaw {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.into(),
            intensity: light.intensity,
            colour: light.colour.to_linear(),
            distance: light.distance,
            decay: light.decay,
            _padding: [0.0; 3],
        }
    }
}

/// Everything the scene shader needs besides the camera: lights and fog.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    ambient: [f32; 4],
    directional_direction: [f32; 4],
    /// Linear colour premultiplied by intensity; black when there is no directional light.
    directional_colour: [f32; 4],
    fog_colour: [f32; 4],
    /// near, far, enabled (0 or 1), unused
    fog_range: [f32; 4],
    point_count: u32,
    _padding: [u32; 3],
    points: [PointLightRaw; MAX_POINT_LIGHTS],
}

impl LightsUniform {
    pub fn new(lights: &LightSet, environment: &Environment) -> Self {
        let [r, g, b] = lights.ambient;
        let (directional_direction, directional_colour) = match &lights.directional {
            Some(light) => {
                let [r, g, b] = light.colour.to_linear();
                let i = light.intensity;
                (light.direction.extend(0.0).into(), [r * i, g * i, b * i, 1.0])
            }
            None => ([0.0, -1.0, 0.0, 0.0], [0.0; 4]),
        };
        let (fog_colour, fog_range) = match &environment.fog {
            Some(fog) => (fog.colour.to_linear_rgba(), [fog.near, fog.far, 1.0, 0.0]),
            None => ([0.0; 4], [0.0; 4]),
        };
        let mut points = [PointLightRaw::default(); MAX_POINT_LIGHTS];
        for (raw, light) in points.iter_mut().zip(&lights.points) {
            *raw = light.into();
        }
        Self {
            ambient: [r, g, b, 1.0],
            directional_direction,
            directional_colour,
            fog_colour,
            fog_range,
            point_count: lights.points.len().min(MAX_POINT_LIGHTS) as u32,
            _padding: [0; 3],
            points,
        }
    }

    pub fn point_count(&self) -> u32 {
        self.point_count
    }
}

impl Default for LightsUniform {
    fn default() -> Self {
        Self::new(&LightSet::default(), &Environment::default())
    }
}

pub struct LightResources {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = mk_buffer(device, LightsUniform::default());
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniform: &LightsUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[*uniform]));
    }
}

pub fn mk_buffer(device: &wgpu::Device, lights_uniform: LightsUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Lights Uniform Buffer"),
        contents: bytemuck::cast_slice(&[lights_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("lights_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    lights_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: lights_buffer.as_entire_binding(),
        }],
        label: Some("lights_bind_group"),
    })
}
