//! Engine data structures: entities, transforms, the scene graph and GPU resources.
//!
//! - `entity` holds colours, geometry descriptions, materials, lights and the entity type
//! - `transform` holds local/world transforms and per-instance GPU data
//! - `scene_graph` is the registry that owns entities and their hierarchy
//! - `model` contains GPU meshes and the vertex layout
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod entity;
pub mod model;
pub mod scene_graph;
pub mod texture;
pub mod transform;
