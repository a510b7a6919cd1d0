//! Assets: procedural meshes for [`Geometry`](crate::data_structures::entity::Geometry)
//! descriptions and asynchronously fetched textures.
//!
//! Native builds read from `./assets`, WASM builds fetch from `<origin>/assets/`.

pub mod mesh;
pub mod texture;

pub use texture::{AssetState, TextureLoader, TextureRef};
