use std::{collections::HashMap, sync::Arc};

use log::{debug, info};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraUniform},
    data_structures::{
        entity::GeometryKey,
        model::{DrawModel, Mesh},
        texture::{self, Texture},
        transform::InstanceRaw,
    },
    pipelines::{
        basic::mk_scene_pipeline,
        light::{LightResources, LightsUniform},
    },
    render::{Batch, RenderError, Renderer, collect_render_list},
    resources::mesh,
    scene::Scene,
};

const INITIAL_INSTANCE_CAPACITY: usize = 64;

/// The wgpu [`Renderer`]: one surface, one lit scene pipeline, meshes and
/// colour maps uploaded lazily the first time a batch needs them.
pub struct Context {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    is_surface_configured: bool,
    depth_texture: Texture,
    pipeline: wgpu::RenderPipeline,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    light: LightResources,
    colour_map_layout: wgpu::BindGroupLayout,
    default_sampler: wgpu::Sampler,
    white_bind_group: wgpu::BindGroup,
    meshes: HashMap<GeometryKey, Mesh>,
    colour_maps: HashMap<String, wgpu::BindGroup>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        debug!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No graphics adapter is compatible with the surface"))?;
        info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    // WebGL doesn't support all of wgpu's features
                    required_limits: if cfg!(target_arch = "wasm32") {
                        wgpu::Limits::downlevel_webgl2_defaults()
                    } else {
                        wgpu::Limits::default()
                    },
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colours and relies on an sRGB target.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("The surface reports no texture formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group_layout =
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
                label: Some("camera_bind_group_layout"),
            });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let light = LightResources::new(&device);
        let colour_map_layout = texture::colour_map_layout(&device);
        let default_sampler = texture::create_default_sampler(&device);
        let white_bind_group = Texture::create_white(&device, &queue).bind_group(
            &device,
            &colour_map_layout,
            &default_sampler,
            "white_colour_map_bind_group",
        );

        let pipeline = mk_scene_pipeline(
            &device,
            &config,
            &camera_bind_group_layout,
            &light.bind_group_layout,
            &colour_map_layout,
        );

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");
        let instance_buffer = mk_instance_buffer(&device, INITIAL_INSTANCE_CAPACITY);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            is_surface_configured: false,
            depth_texture,
            pipeline,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            light,
            colour_map_layout,
            default_sampler,
            white_bind_group,
            meshes: HashMap::new(),
            colour_maps: HashMap::new(),
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    fn ensure_meshes(&mut self, batches: &[Batch]) {
        for batch in batches {
            let device = &self.device;
            self.meshes
                .entry(batch.geometry.key())
                .or_insert_with(|| mesh::upload(device, &batch.geometry));
        }
    }

    /// Uploads colour maps whose images finished loading since the last frame.
    fn ensure_colour_maps(&mut self, batches: &[Batch]) {
        for map in batches.iter().filter_map(|b| b.map.as_ref()) {
            if self.colour_maps.contains_key(map.path()) {
                continue;
            }
            if let Some(image) = map.image() {
                let texture = Texture::from_rgba(&self.device, &self.queue, &image, map.path());
                let bind_group = texture.bind_group(
                    &self.device,
                    &self.colour_map_layout,
                    &self.default_sampler,
                    map.path(),
                );
                debug!("Uploaded colour map {}", map.path());
                self.colour_maps.insert(map.path().to_string(), bind_group);
            }
        }
    }

    /// Writes all batches' instances back to back; returns each batch's range.
    fn write_instances(&mut self, batches: &[Batch]) -> Vec<std::ops::Range<u32>> {
        let instances: Vec<InstanceRaw> = batches
            .iter()
            .flat_map(|b| b.instances.iter().copied())
            .collect();
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            debug!("Growing instance buffer to {}", self.instance_capacity);
            self.instance_buffer = mk_instance_buffer(&self.device, self.instance_capacity);
        }
        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let mut start = 0;
        batches
            .iter()
            .map(|b| {
                let end = start + b.instances.len() as u32;
                let range = start..end;
                start = end;
                range
            })
            .collect()
    }
}

fn mk_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl Renderer for Context {
    fn resize(&mut self, width: u32, height: u32, pixel_density: f64) {
        let width = (width as f64 * pixel_density).round() as u32;
        let height = (height as f64 * pixel_density).round() as u32;
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.is_surface_configured = true;
    }

    fn draw_frame(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        if !self.is_surface_configured {
            return Ok(());
        }

        let list = collect_render_list(&scene.objects);

        self.camera_uniform.update_view_proj(camera);
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
        self.light
            .write(&self.queue, &LightsUniform::new(&list.lights, &scene.environment));

        self.ensure_meshes(&list.batches);
        self.ensure_colour_maps(&list.batches);
        let ranges = self.write_instances(&list.batches);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(scene.environment.clear_colour.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for (batch, range) in list.batches.iter().zip(ranges) {
                let Some(mesh) = self.meshes.get(&batch.geometry.key()) else {
                    continue;
                };
                let colour_map = batch
                    .map
                    .as_ref()
                    .and_then(|map| self.colour_maps.get(map.path()))
                    .unwrap_or(&self.white_bind_group);
                render_pass.draw_mesh_instanced(
                    mesh,
                    range,
                    &self.camera_bind_group,
                    &self.light.bind_group,
                    colour_map,
                );
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
