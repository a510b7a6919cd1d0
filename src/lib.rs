//! haunt-ngin
//!
//! A small cross-platform scene-composition engine with native and WASM
//! support. A scene is a registry of meshes, lights and groups; a frame loop
//! advances its animations and debug bindings from one clock reading per
//! frame and hands it to a wgpu renderer that batches identical geometry into
//! instanced draws.
//!
//! High-level modules
//! - `animation`: time-parameterised orbit paths and the driver applying them
//! - `binding`: observable values and the debug control panel
//! - `camera`: perspective camera, uniforms and orbit controls
//! - `clock`: monotonic and manual time sources
//! - `config`: host configuration
//! - `context`: the wgpu renderer owning device, queue and pipeline
//! - `data_structures`: entities, transforms, the scene graph and GPU meshes/textures
//! - `flow`: the winit host and its event loop
//! - `frame`: the frame loop state machine
//! - `pipelines`: the lit scene pipeline and its light/fog uniforms
//! - `render`: the renderer seam and batching
//! - `resources`: mesh generation and asynchronous texture loading
//! - `scene`: the scene bundle and its environment
//! - `scenes`: ready-made scenes
//! - `viewport`: surface sizing and camera aspect
//!

pub mod animation;
pub mod binding;
pub mod camera;
pub mod clock;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod frame;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod scenes;
pub mod viewport;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use config::EngineConfig;
pub use flow::{SceneConstructor, run};
pub use scene::{Composition, Scene};
pub use winit::event::WindowEvent;
